//! Nintendo 64 header parser with byte-order normalization.
//!
//! N64 ROMs circulate in three byte orders, distinguishable from the first
//! word. The header is normalized to big-endian before field extraction.

use std::io::{Seek, SeekFrom};

use rom_scout_core::facts::N64Format;
use rom_scout_core::{PlatformFacts, ReadSeek, Region, read_ascii};

use crate::nes::read_exact_or_miss;

/// Magic words for each byte order.
const MAGIC_Z64: [u8; 4] = [0x80, 0x37, 0x12, 0x40];
const MAGIC_V64: [u8; 4] = [0x37, 0x80, 0x40, 0x12];
const MAGIC_N64: [u8; 4] = [0x40, 0x12, 0x37, 0x80];

/// Bytes of header needed for all fields (title + game code + version).
const HEADER_SIZE: usize = 0x40;

/// Internal title offset and length.
const OFF_TITLE: usize = 0x20;
const TITLE_LEN: usize = 20;

/// 4-character game code (category, 2-char id, region).
const OFF_GAME_CODE: usize = 0x3B;

/// ROM version byte.
const OFF_VERSION: usize = 0x3F;

/// Detect the byte order from the first 4 bytes of a ROM.
pub fn detect_format(magic: &[u8]) -> Option<N64Format> {
    if magic.len() < 4 {
        return None;
    }
    match [magic[0], magic[1], magic[2], magic[3]] {
        MAGIC_Z64 => Some(N64Format::Z64),
        MAGIC_V64 => Some(N64Format::V64),
        MAGIC_N64 => Some(N64Format::N64),
        _ => None,
    }
}

/// Normalize a buffer of ROM data to big-endian (.z64) byte order.
///
/// V64 swaps byte pairs; N64 reverses 4-byte groups; Z64 is untouched.
pub fn normalize_to_big_endian(data: &mut [u8], format: N64Format) {
    match format {
        N64Format::Z64 => {}
        N64Format::V64 => {
            for i in (0..data.len().saturating_sub(1)).step_by(2) {
                data.swap(i, i + 1);
            }
        }
        N64Format::N64 => {
            for chunk in data.chunks_exact_mut(4) {
                chunk.reverse();
            }
        }
    }
}

/// Parse the N64 ROM header.
pub fn parse(reader: &mut dyn ReadSeek) -> std::io::Result<Option<PlatformFacts>> {
    reader.seek(SeekFrom::Start(0))?;
    let mut header = [0u8; HEADER_SIZE];
    if read_exact_or_miss(reader, &mut header)?.is_none() {
        return Ok(None);
    }

    let format = match detect_format(&header[..4]) {
        Some(f) => f,
        None => return Ok(None),
    };
    normalize_to_big_endian(&mut header, format);

    let title = read_ascii(&header[OFF_TITLE..OFF_TITLE + TITLE_LEN]);
    let game_code = read_ascii(&header[OFF_GAME_CODE..OFF_GAME_CODE + 4]);
    let region = decode_region(header[OFF_GAME_CODE + 3] as char);

    Ok(Some(PlatformFacts::N64 {
        title,
        game_code,
        region,
        version: header[OFF_VERSION],
        format,
    }))
}

/// Decode the region character of the game code.
///
/// The shared serial-code table covers the common letters ('E' for USA,
/// 'J', 'P', ...); only the codes N64 assigns differently are handled
/// here: the per-language PAL variants and 'U' for Australia.
fn decode_region(c: char) -> Option<Region> {
    match c {
        'D' | 'F' | 'I' | 'S' | 'X' | 'Y' => Some(Region::Europe),
        'U' => Some(Region::Australia),
        _ => Region::from_code_char(c),
    }
}
