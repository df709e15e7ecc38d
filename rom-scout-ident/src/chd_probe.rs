//! MAME CHD container probe.
//!
//! CHD headers store a SHA1 of the uncompressed logical image, so disc
//! images of any size can be identified from the first 124 bytes without
//! decompressing a single hunk. Only the fixed header is read; the field
//! layouts below follow MAME's chd.h header-format notes.
//!
//! v4 header (120 bytes), all integers big-endian:
//!
//! ```text
//! [  0] tag[8]            'MComprHD'
//! [  8] length u32        header length
//! [ 12] version u32       4
//! [ 16] flags u32
//! [ 20] compression u32
//! [ 24] hunkbytes u32
//! [ 28] totalhunks u32
//! [ 32] logicalbytes u64
//! [ 40] metaoffset u64
//! [ 48] md5[16]
//! [ 64] parentmd5[16]
//! [ 80] sha1[20]
//! [100] parentsha1[20]
//! ```
//!
//! v5 header (124 bytes):
//!
//! ```text
//! [  0] tag[8]            'MComprHD'
//! [  8] length u32        header length
//! [ 12] version u32       5
//! [ 16] compressors[4] u32
//! [ 32] logicalbytes u64
//! [ 40] mapoffset u64
//! [ 48] metaoffset u64
//! [ 56] hunkbytes u32
//! [ 60] unitbytes u32
//! [ 64] rawsha1[20]
//! [ 84] sha1[20]
//! [104] parentsha1[20]
//! ```

use std::io::{Read, Seek, SeekFrom};

use rom_scout_core::{IdentifyError, ReadSeek};

/// Container magic.
const CHD_MAGIC: &[u8; 8] = b"MComprHD";

/// Largest header across supported versions (v5).
const MAX_HEADER_SIZE: usize = 124;

/// Offsets of the combined data+metadata SHA1 field, per the layouts above.
const V4_SHA1_OFFSET: usize = 80;
const V5_SHA1_OFFSET: usize = 84;

/// Stored SHA1 extracted from a CHD header.
#[derive(Debug, Clone)]
pub struct ChdInfo {
    pub version: u32,
    /// SHA1 of the uncompressed data + metadata (lowercase hex).
    pub sha1: String,
}

/// Parse the CHD header and extract the stored SHA1.
///
/// Supports header versions 4 and 5 (everything MAME has produced since
/// 2008). Never reads past the fixed-size header.
pub fn probe(reader: &mut dyn ReadSeek) -> Result<ChdInfo, IdentifyError> {
    reader.seek(SeekFrom::Start(0)).map_err(io_err)?;
    let mut header = [0u8; MAX_HEADER_SIZE];
    reader.read_exact(&mut header).map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            IdentifyError::corrupted_header("CHD file shorter than its header")
        } else {
            io_err(e)
        }
    })?;

    if &header[..8] != CHD_MAGIC {
        return Err(IdentifyError::invalid_format(
            "Not a CHD file (missing MComprHD magic)",
        ));
    }

    let version = u32::from_be_bytes([header[12], header[13], header[14], header[15]]);
    let sha1_offset = match version {
        4 => V4_SHA1_OFFSET,
        5 => V5_SHA1_OFFSET,
        other => {
            return Err(IdentifyError::corrupted_header(format!(
                "Unsupported CHD header version {other}"
            )));
        }
    };

    let sha1_bytes = &header[sha1_offset..sha1_offset + 20];
    if sha1_bytes.iter().all(|&b| b == 0) {
        return Err(IdentifyError::corrupted_header(
            "CHD header has no stored SHA1",
        ));
    }

    let sha1 = sha1_bytes.iter().map(|b| format!("{:02x}", b)).collect();
    Ok(ChdInfo { version, sha1 })
}

fn io_err(e: std::io::Error) -> IdentifyError {
    IdentifyError::CorruptedHeader(format!("CHD read failed: {e}"))
}
