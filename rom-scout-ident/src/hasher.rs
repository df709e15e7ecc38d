//! Streaming hash engine.
//!
//! Computes CRC32, MD5 and SHA1 in one pass over the input, reading fixed
//! 64 KiB blocks. Files beyond the configured size limit are skipped
//! entirely rather than partially hashed.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use sha1::Digest;

use rom_scout_core::{HashKind, IdentifyError};

const CHUNK_SIZE: usize = 64 * 1024; // 64 KB

/// Which hash algorithms to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashSelection {
    pub crc32: bool,
    pub md5: bool,
    pub sha1: bool,
}

impl HashSelection {
    /// All three algorithms (the metadata service wants the full bundle).
    pub fn all() -> Self {
        Self {
            crc32: true,
            md5: true,
            sha1: true,
        }
    }

    /// CRC32 only (what a ZIP central directory already provides).
    pub fn crc32_only() -> Self {
        Self {
            crc32: true,
            md5: false,
            sha1: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.crc32 && !self.md5 && !self.sha1
    }

    pub fn contains(&self, kind: HashKind) -> bool {
        match kind {
            HashKind::Crc32 => self.crc32,
            HashKind::Md5 => self.md5,
            HashKind::Sha1 => self.sha1,
        }
    }
}

/// Hash a file on disk.
///
/// When `limit` is set and the file is larger, no hashes are computed and an
/// empty map is returned — the caller treats the file as skipped for
/// hashing. Fails only on I/O errors.
pub fn hash_file(
    path: &Path,
    wanted: HashSelection,
    limit: Option<u64>,
) -> Result<BTreeMap<HashKind, String>, IdentifyError> {
    let metadata = std::fs::metadata(path).map_err(|e| IdentifyError::io(path, e))?;
    if let Some(limit) = limit {
        if metadata.len() > limit {
            return Ok(BTreeMap::new());
        }
    }

    let file = std::fs::File::open(path).map_err(|e| IdentifyError::io(path, e))?;
    hash_reader(std::io::BufReader::new(file), wanted).map_err(|e| IdentifyError::io(path, e))
}

/// Hash a stream to completion, computing all requested digests in one pass.
pub fn hash_reader<R: Read>(
    mut reader: R,
    wanted: HashSelection,
) -> std::io::Result<BTreeMap<HashKind, String>> {
    let mut out = BTreeMap::new();
    if wanted.is_empty() {
        return Ok(out);
    }

    let mut crc = wanted.crc32.then(crc32fast::Hasher::new);
    let mut sha = wanted.sha1.then(sha1::Sha1::new);
    let mut md5_ctx = wanted.md5.then(md5::Context::new);
    let mut buf = vec![0u8; CHUNK_SIZE];

    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        if let Some(ref mut h) = crc {
            h.update(&buf[..n]);
        }
        if let Some(ref mut h) = sha {
            h.update(&buf[..n]);
        }
        if let Some(ref mut h) = md5_ctx {
            h.consume(&buf[..n]);
        }
    }

    if let Some(h) = crc {
        out.insert(HashKind::Crc32, format!("{:08x}", h.finalize()));
    }
    if let Some(h) = md5_ctx {
        out.insert(HashKind::Md5, format!("{:x}", h.compute()));
    }
    if let Some(h) = sha {
        out.insert(HashKind::Sha1, format!("{:x}", h.finalize()));
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::io::Write;

    #[test]
    fn all_digests_in_one_pass() {
        let hashes = hash_reader(Cursor::new(b"Hello, World!"), HashSelection::all()).unwrap();
        assert_eq!(hashes[&HashKind::Crc32], "ec4ac3d0");
        assert_eq!(hashes[&HashKind::Md5], "65a8e27d8879283831b664bd8b7f0ad4");
        assert_eq!(
            hashes[&HashKind::Sha1],
            "0a0a9f2a6772942557ab5355d76af442f8f65e01"
        );
    }

    #[test]
    fn selection_limits_output() {
        let hashes = hash_reader(Cursor::new(b"data"), HashSelection::crc32_only()).unwrap();
        assert_eq!(hashes.len(), 1);
        assert!(hashes.contains_key(&HashKind::Crc32));
    }

    #[test]
    fn file_at_limit_is_hashed() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(&[0x42u8; 1024]).unwrap();
        let hashes = hash_file(tmp.path(), HashSelection::all(), Some(1024)).unwrap();
        assert_eq!(hashes.len(), 3);
    }

    #[test]
    fn file_over_limit_is_skipped() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(&[0x42u8; 1025]).unwrap();
        let hashes = hash_file(tmp.path(), HashSelection::all(), Some(1024)).unwrap();
        assert!(hashes.is_empty());
    }

    #[test]
    fn missing_file_reports_path() {
        let err = hash_file(Path::new("/nonexistent/rom.bin"), HashSelection::all(), None)
            .unwrap_err();
        assert!(err.to_string().contains("/nonexistent/rom.bin"));
    }
}
