//! ZIP archive probe.
//!
//! The fast path reads only the central directory: member names, sizes and
//! the CRC32 each local header already carries. Slow mode decompresses
//! members so MD5/SHA1 can be computed and inner headers parsed.

use std::io::Read;

use rom_scout_core::{IdentifyError, ReadSeek};

/// A member described by the ZIP central directory.
#[derive(Debug, Clone)]
pub struct ZipMember {
    pub name: String,
    /// Uncompressed size.
    pub size: u64,
    /// CRC32 from the directory entry (lowercase hex).
    pub crc32: String,
}

/// An opened ZIP archive.
pub struct ZipProbe<R: ReadSeek> {
    archive: zip::ZipArchive<R>,
}

impl<R: ReadSeek> ZipProbe<R> {
    /// Open the archive by reading its central directory only.
    pub fn open(reader: R) -> Result<Self, IdentifyError> {
        let archive = zip::ZipArchive::new(reader)
            .map_err(|e| IdentifyError::archive(format!("Failed to open ZIP: {e}")))?;
        Ok(Self { archive })
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.archive.len()
    }

    pub fn is_empty(&self) -> bool {
        self.archive.len() == 0
    }

    /// Enumerate members without reading any payload bytes.
    pub fn members(&mut self) -> Result<Vec<ZipMember>, IdentifyError> {
        let mut members = Vec::with_capacity(self.archive.len());
        for i in 0..self.archive.len() {
            let file = self
                .archive
                .by_index_raw(i)
                .map_err(|e| IdentifyError::archive(format!("Failed to read ZIP entry {i}: {e}")))?;
            if file.is_dir() {
                continue;
            }
            members.push(ZipMember {
                name: file.name().to_string(),
                size: file.size(),
                crc32: format!("{:08x}", file.crc32()),
            });
        }
        Ok(members)
    }

    /// Decompress a member fully (slow mode only).
    pub fn read_member(&mut self, name: &str) -> Result<Vec<u8>, IdentifyError> {
        let mut file = self
            .archive
            .by_name(name)
            .map_err(|e| IdentifyError::archive(format!("Failed to open ZIP member '{name}': {e}")))?;
        let mut data = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut data)
            .map_err(|e| IdentifyError::archive(format!("Failed to decompress '{name}': {e}")))?;
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use zip::write::SimpleFileOptions;

    pub(crate) fn make_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        let mut writer = zip::ZipWriter::new(&mut cursor);
        for (name, data) in entries {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap();
        cursor.into_inner()
    }

    #[test]
    fn members_report_size_and_crc() {
        let archive = make_zip(&[("game.md", b"SEGA DATA"), ("readme.txt", b"hello")]);
        let mut probe = ZipProbe::open(Cursor::new(archive)).unwrap();
        let members = probe.members().unwrap();
        assert_eq!(members.len(), 2);
        assert_eq!(members[0].name, "game.md");
        assert_eq!(members[0].size, 9);
        assert_eq!(members[0].crc32.len(), 8);
    }

    #[test]
    fn empty_archive_is_not_an_error() {
        let archive = make_zip(&[]);
        let mut probe = ZipProbe::open(Cursor::new(archive)).unwrap();
        assert!(probe.members().unwrap().is_empty());
    }

    #[test]
    fn read_member_round_trips() {
        let archive = make_zip(&[("inner.bin", b"payload bytes")]);
        let mut probe = ZipProbe::open(Cursor::new(archive)).unwrap();
        assert_eq!(probe.read_member("inner.bin").unwrap(), b"payload bytes");
    }

    #[test]
    fn garbage_is_an_archive_error() {
        let result = ZipProbe::open(Cursor::new(vec![0u8; 64]));
        assert!(result.is_err());
    }
}
