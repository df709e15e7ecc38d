//! Minimal ISO-9660 reading shared by the disc-based platform parsers.
//!
//! Supports cooked (2048-byte sector) and raw (2352-byte sector) images.
//! Only the pieces the header parsers need are implemented: locating the
//! primary volume descriptor and reading small files out of the root
//! directory. All reads are bounded; no full-image scans.

use std::io::{Read, Seek, SeekFrom};

use crate::ReadSeek;

/// Logical sector payload size.
pub const LOGICAL_SECTOR_SIZE: usize = 2048;

/// Raw CD sector size (sync + header + payload + EDC/ECC).
pub const RAW_SECTOR_SIZE: usize = 2352;

/// Sector number of the primary volume descriptor.
pub const PVD_SECTOR: u64 = 16;

/// Raw sector sync pattern: 00 followed by ten FF bytes and a 00.
const RAW_SYNC: [u8; 12] = [
    0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x00,
];

/// Physical layout of the disc image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectorFormat {
    /// 2048-byte user-data sectors (plain .iso).
    Cooked,
    /// 2352-byte raw sectors, MODE1 (user data at offset 16).
    RawMode1,
    /// 2352-byte raw sectors, MODE2 Form 1 (user data at offset 24).
    RawMode2,
}

impl SectorFormat {
    /// Bytes per physical sector.
    pub fn sector_size(&self) -> usize {
        match self {
            Self::Cooked => LOGICAL_SECTOR_SIZE,
            Self::RawMode1 | Self::RawMode2 => RAW_SECTOR_SIZE,
        }
    }

    /// Offset of the 2048-byte user data inside a physical sector.
    pub fn data_offset(&self) -> usize {
        match self {
            Self::Cooked => 0,
            Self::RawMode1 => 16,
            Self::RawMode2 => 24,
        }
    }
}

/// Detect the sector format by inspecting the first sector.
///
/// Returns `None` when the file is too small to hold even one sector.
pub fn detect_sector_format(reader: &mut dyn ReadSeek) -> std::io::Result<Option<SectorFormat>> {
    let file_size = reader.seek(SeekFrom::End(0))?;
    if file_size < LOGICAL_SECTOR_SIZE as u64 {
        return Ok(None);
    }

    reader.seek(SeekFrom::Start(0))?;
    let mut head = [0u8; 16];
    reader.read_exact(&mut head)?;

    if file_size >= RAW_SECTOR_SIZE as u64 && head[..12] == RAW_SYNC {
        // Mode byte follows the 3-byte MSF address.
        let format = if head[15] == 2 {
            SectorFormat::RawMode2
        } else {
            SectorFormat::RawMode1
        };
        return Ok(Some(format));
    }

    Ok(Some(SectorFormat::Cooked))
}

/// Read the 2048 bytes of user data from a logical sector.
pub fn read_sector(
    reader: &mut dyn ReadSeek,
    format: SectorFormat,
    sector: u64,
) -> std::io::Result<[u8; LOGICAL_SECTOR_SIZE]> {
    let offset = sector * format.sector_size() as u64 + format.data_offset() as u64;
    reader.seek(SeekFrom::Start(offset))?;
    let mut buf = [0u8; LOGICAL_SECTOR_SIZE];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

/// A parsed ISO-9660 directory record.
#[derive(Debug, Clone)]
pub struct DirectoryRecord {
    /// Identifier with any `;1` version suffix retained.
    pub identifier: String,
    /// First logical sector of the file extent.
    pub extent_lba: u32,
    /// File size in bytes.
    pub data_len: u32,
    /// True for subdirectories.
    pub is_directory: bool,
}

impl DirectoryRecord {
    /// Identifier with the `;version` suffix stripped, uppercased.
    pub fn base_identifier(&self) -> String {
        self.identifier
            .split(';')
            .next()
            .unwrap_or(&self.identifier)
            .to_uppercase()
    }
}

/// Parse a single directory record from a byte slice.
///
/// Returns `None` for records that are truncated or have an empty identifier
/// (the terminating padding of a directory sector).
pub fn parse_directory_record(record: &[u8]) -> Option<DirectoryRecord> {
    if record.len() < 34 {
        return None;
    }
    let id_len = record[32] as usize;
    if id_len == 0 || 33 + id_len > record.len() {
        return None;
    }

    let extent_lba = u32::from_le_bytes([record[2], record[3], record[4], record[5]]);
    let data_len = u32::from_le_bytes([record[10], record[11], record[12], record[13]]);
    let flags = record[25];
    let identifier = String::from_utf8_lossy(&record[33..33 + id_len]).to_string();

    Some(DirectoryRecord {
        identifier,
        extent_lba,
        data_len,
        is_directory: flags & 0x02 != 0,
    })
}

/// The primary volume descriptor fields the parsers care about.
#[derive(Debug, Clone)]
pub struct PrimaryVolume {
    /// System identifier (e.g. "PLAYSTATION").
    pub system_id: String,
    /// Volume identifier.
    pub volume_id: String,
    /// Root directory record.
    pub root: DirectoryRecord,
}

/// Read and validate the primary volume descriptor at sector 16.
///
/// Returns `None` when the sector does not contain a valid PVD (`CD001`
/// check fails) — the caller treats that as a parser miss.
pub fn read_pvd(
    reader: &mut dyn ReadSeek,
    format: SectorFormat,
) -> std::io::Result<Option<PrimaryVolume>> {
    let sector = match read_sector(reader, format, PVD_SECTOR) {
        Ok(s) => s,
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    };

    if sector[0] != 0x01 || &sector[1..6] != b"CD001" {
        return Ok(None);
    }

    let system_id = read_str_a(&sector[8..40]);
    let volume_id = read_str_a(&sector[40..72]);
    let root = match parse_directory_record(&sector[156..190]) {
        Some(r) => r,
        None => return Ok(None),
    };

    Ok(Some(PrimaryVolume {
        system_id,
        volume_id,
        root,
    }))
}

/// Find a file by name in the root directory (case-insensitive, `;1`
/// version suffixes ignored).
pub fn find_in_root(
    reader: &mut dyn ReadSeek,
    format: SectorFormat,
    root: &DirectoryRecord,
    name: &str,
) -> std::io::Result<Option<DirectoryRecord>> {
    let wanted = name.to_uppercase();
    let dir_sectors = (root.data_len as u64).div_ceil(LOGICAL_SECTOR_SIZE as u64);

    for sector_offset in 0..dir_sectors {
        let sector = match read_sector(reader, format, root.extent_lba as u64 + sector_offset) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e),
        };

        let mut pos = 0usize;
        while pos < LOGICAL_SECTOR_SIZE {
            let record_len = sector[pos] as usize;
            if record_len == 0 || pos + record_len > LOGICAL_SECTOR_SIZE {
                break;
            }
            if let Some(record) = parse_directory_record(&sector[pos..pos + record_len]) {
                if !record.is_directory && record.base_identifier() == wanted {
                    return Ok(Some(record));
                }
            }
            pos += record_len;
        }
    }

    Ok(None)
}

/// Read a file's contents, capped at `limit` bytes.
pub fn read_file(
    reader: &mut dyn ReadSeek,
    format: SectorFormat,
    record: &DirectoryRecord,
    limit: usize,
) -> std::io::Result<Vec<u8>> {
    let len = (record.data_len as usize).min(limit);
    let mut out = Vec::with_capacity(len);
    let sectors = (len as u64).div_ceil(LOGICAL_SECTOR_SIZE as u64);

    for sector_offset in 0..sectors {
        let sector = read_sector(reader, format, record.extent_lba as u64 + sector_offset)?;
        let remaining = len - out.len();
        out.extend_from_slice(&sector[..remaining.min(LOGICAL_SECTOR_SIZE)]);
    }

    Ok(out)
}

/// Decode an ISO-9660 a-characters field, trimming padding.
pub fn read_str_a(buf: &[u8]) -> String {
    let s: String = buf
        .iter()
        .map(|&b| if (0x20..0x7F).contains(&b) { b as char } else { ' ' })
        .collect();
    s.trim().to_string()
}
