//! Sega Saturn disc header (IP.BIN) parser.
//!
//! The system area of a Saturn disc starts with a fixed hardware
//! identifier. Raw 2352-byte sector images place it at offset 16, cooked
//! images at offset 0; both are probed.

use std::io::{Seek, SeekFrom};

use rom_scout_core::platform::Platform;
use rom_scout_core::{PlatformFacts, ReadSeek, read_ascii};

use crate::read_exact_or_miss;

/// Hardware identifier at the start of the system area.
const SATURN_MAGIC: &[u8; 16] = b"SEGA SEGASATURN ";

/// Bytes of IP.BIN covering all fields we read.
const HEADER_SIZE: usize = 0xD0;

// Field offsets within IP.BIN.
const OFF_PRODUCT: usize = 0x20;
const OFF_VERSION: usize = 0x2A;
const OFF_DEVICE: usize = 0x38;
const OFF_TITLE: usize = 0x60;

/// Candidate offsets of the system area within the image file.
const PROBE_OFFSETS: [u64; 2] = [0, 16];

/// Parse the Saturn IP.BIN header.
pub fn parse(reader: &mut dyn ReadSeek) -> std::io::Result<Option<PlatformFacts>> {
    for offset in PROBE_OFFSETS {
        reader.seek(SeekFrom::Start(offset))?;
        let mut header = [0u8; HEADER_SIZE];
        if read_exact_or_miss(reader, &mut header)?.is_none() {
            continue;
        }
        if &header[..16] != SATURN_MAGIC {
            continue;
        }

        let serial = read_ascii(&header[OFF_PRODUCT..OFF_PRODUCT + 10]);
        let version = read_ascii(&header[OFF_VERSION..OFF_VERSION + 6]);
        let device = read_ascii(&header[OFF_DEVICE..OFF_DEVICE + 8]);
        let title = read_ascii(&header[OFF_TITLE..OFF_TITLE + 0x70]);

        return Ok(Some(PlatformFacts::Disc {
            system: Platform::Saturn,
            serial: if serial.is_empty() { None } else { Some(serial) },
            title: if title.is_empty() { None } else { Some(title) },
            version: if version.is_empty() { None } else { Some(version) },
            disc_no: parse_disc_number(&device),
        }));
    }

    Ok(None)
}

/// Extract the disc number from the device field (e.g. "CD-2/3").
fn parse_disc_number(device: &str) -> Option<u8> {
    let rest = device.strip_prefix("CD-")?;
    rest.split('/').next()?.parse().ok()
}
