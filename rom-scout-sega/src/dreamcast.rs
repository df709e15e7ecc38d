//! Sega Dreamcast disc header (IP.BIN) parser.

use std::io::{Seek, SeekFrom};

use rom_scout_core::platform::Platform;
use rom_scout_core::{PlatformFacts, ReadSeek, read_ascii};

use crate::read_exact_or_miss;

/// Hardware identifier at the start of the system area.
const DC_MAGIC: &[u8; 16] = b"SEGA SEGAKATANA ";

/// Bytes of IP.BIN covering all fields we read.
const HEADER_SIZE: usize = 0x100;

// Field offsets within IP.BIN.
const OFF_PRODUCT: usize = 0x40;
const OFF_VERSION: usize = 0x4A;
const OFF_TITLE: usize = 0x80;

/// Candidate offsets of the system area within the image file.
const PROBE_OFFSETS: [u64; 2] = [0, 16];

/// Parse the Dreamcast IP.BIN header.
pub fn parse(reader: &mut dyn ReadSeek) -> std::io::Result<Option<PlatformFacts>> {
    for offset in PROBE_OFFSETS {
        reader.seek(SeekFrom::Start(offset))?;
        let mut header = [0u8; HEADER_SIZE];
        if read_exact_or_miss(reader, &mut header)?.is_none() {
            continue;
        }
        if &header[..16] != DC_MAGIC {
            continue;
        }

        let serial = read_ascii(&header[OFF_PRODUCT..OFF_PRODUCT + 10]);
        let version = read_ascii(&header[OFF_VERSION..OFF_VERSION + 6]);
        let title = read_ascii(&header[OFF_TITLE..]);

        return Ok(Some(PlatformFacts::Disc {
            system: Platform::Dreamcast,
            serial: if serial.is_empty() { None } else { Some(serial) },
            title: if title.is_empty() { None } else { Some(title) },
            version: if version.is_empty() { None } else { Some(version) },
            disc_no: None,
        }));
    }

    Ok(None)
}
