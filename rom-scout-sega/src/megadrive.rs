//! Sega Mega Drive / Genesis header parser.
//!
//! The ROM header lives at 0x100, after the 68000 interrupt vectors. SMD
//! dumps carry a 512-byte copier header and store each 16 KiB block with
//! even and odd bytes split; those are detected and de-interleaved before
//! the header is read.

use std::io::{Seek, SeekFrom};

use rom_scout_core::{PlatformFacts, ReadSeek, Region, read_ascii};

use crate::read_exact_or_miss;

/// The system type field at 0x100 always contains "SEGA" (sometimes after a
/// leading space).
const SEGA_MAGIC: &[u8; 4] = b"SEGA";

/// Offset of the header after the interrupt vectors.
const HEADER_OFFSET: u64 = 0x100;

/// Header length (0x100..0x200).
const HEADER_SIZE: usize = 0x100;

/// SMD copier header size.
const SMD_HEADER_SIZE: usize = 512;

/// SMD interleave block size.
const SMD_BLOCK_SIZE: usize = 16 * 1024;

/// Parsed fields of the 0x100..0x200 header.
struct Header {
    domestic_title: String,
    overseas_title: String,
    serial_number: String,
    region_codes: String,
}

fn parse_header(buf: &[u8; HEADER_SIZE]) -> Header {
    Header {
        domestic_title: read_ascii(&buf[0x20..0x50]),
        overseas_title: read_ascii(&buf[0x50..0x80]),
        serial_number: read_ascii(&buf[0x80..0x8E]),
        region_codes: read_ascii(&buf[0xF0..0xF3]),
    }
}

/// The magic may start at byte 0 or 1 of the system-type field ("SEGA
/// MEGA DRIVE" vs " SEGA MEGA DRIVE").
fn has_sega_magic(buf: &[u8]) -> bool {
    buf.len() >= 5 && (&buf[0..4] == SEGA_MAGIC || &buf[1..5] == SEGA_MAGIC)
}

/// Decode region codes from the header's region field.
///
/// Old-style headers use letters (J/U/E); late headers use a single hex
/// digit bitmask (bit 0 Japan, bit 2 USA, bit 3 Europe). 'E' always means
/// Europe, never the hex digit.
fn decode_regions(region_codes: &str) -> Vec<Region> {
    let chars: Vec<char> = region_codes.chars().collect();

    if chars.len() == 1 {
        let c = chars[0];
        if matches!(c, '0'..='9' | 'A'..='D' | 'F') {
            let bits = c.to_digit(16).unwrap_or(0);
            let mut regions = Vec::new();
            if bits & 0x1 != 0 {
                regions.push(Region::Japan);
            }
            if bits & 0x4 != 0 {
                regions.push(Region::Usa);
            }
            if bits & 0x8 != 0 {
                regions.push(Region::Europe);
            }
            if !regions.is_empty() {
                return regions;
            }
        }
    }

    let mut regions = Vec::new();
    for c in region_codes.chars() {
        let region = match c.to_ascii_uppercase() {
            'J' => Region::Japan,
            'U' => Region::Usa,
            'E' => Region::Europe,
            // 'A' in Mega Drive context means Asia; Japan is the closest match
            'A' => Region::Japan,
            _ => continue,
        };
        if !regions.contains(&region) {
            regions.push(region);
        }
    }
    regions
}

/// De-interleave one SMD block: the first half of each 16 KiB block holds
/// the odd-addressed bytes, the second half the even-addressed ones.
fn deinterleave_smd_block(block: &[u8], out: &mut [u8]) {
    let half = SMD_BLOCK_SIZE / 2;
    for i in 0..half {
        out[i * 2 + 1] = block[i];
        out[i * 2] = block[half + i];
    }
}

/// Try to read the header from an SMD-interleaved dump.
///
/// The header at 0x100 lands entirely inside the first de-interleaved
/// block, so one block is enough.
fn try_smd(reader: &mut dyn ReadSeek, file_size: u64) -> std::io::Result<Option<Header>> {
    if file_size < (SMD_HEADER_SIZE + SMD_BLOCK_SIZE) as u64 {
        return Ok(None);
    }
    // SMD payload is a whole number of 16 KiB blocks after the 512-byte header.
    if (file_size - SMD_HEADER_SIZE as u64) % SMD_BLOCK_SIZE as u64 != 0 {
        return Ok(None);
    }

    reader.seek(SeekFrom::Start(SMD_HEADER_SIZE as u64))?;
    let mut block = vec![0u8; SMD_BLOCK_SIZE];
    if read_exact_or_miss(reader, &mut block)?.is_none() {
        return Ok(None);
    }

    let mut decoded = vec![0u8; SMD_BLOCK_SIZE];
    deinterleave_smd_block(&block, &mut decoded);

    let header_buf: &[u8] = &decoded[HEADER_OFFSET as usize..HEADER_OFFSET as usize + HEADER_SIZE];
    if !has_sega_magic(header_buf) {
        return Ok(None);
    }

    let mut fixed = [0u8; HEADER_SIZE];
    fixed.copy_from_slice(header_buf);
    Ok(Some(parse_header(&fixed)))
}

/// Parse the Mega Drive ROM header, de-interleaving SMD dumps as needed.
pub fn parse(reader: &mut dyn ReadSeek) -> std::io::Result<Option<PlatformFacts>> {
    let file_size = reader.seek(SeekFrom::End(0))?;
    if file_size < HEADER_OFFSET + HEADER_SIZE as u64 {
        return Ok(None);
    }

    // Plain dump first
    reader.seek(SeekFrom::Start(HEADER_OFFSET))?;
    let mut header_buf = [0u8; HEADER_SIZE];
    if read_exact_or_miss(reader, &mut header_buf)?.is_none() {
        return Ok(None);
    }

    let (header, interleaved) = if has_sega_magic(&header_buf) {
        (parse_header(&header_buf), false)
    } else {
        match try_smd(reader, file_size)? {
            Some(h) => (h, true),
            None => return Ok(None),
        }
    };

    Ok(Some(PlatformFacts::MegaDrive {
        domestic_title: header.domestic_title,
        overseas_title: header.overseas_title,
        serial: header.serial_number,
        regions: decode_regions(&header.region_codes),
        interleaved,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Build a 256 KiB ROM with a valid header.
    fn make_md_rom(domestic: &str, overseas: &str, serial: &str, regions: &str) -> Vec<u8> {
        let mut rom = vec![0u8; 256 * 1024];
        let b = HEADER_OFFSET as usize;
        rom[b..b + 0x10].fill(b' ');
        rom[b..b + 15].copy_from_slice(b"SEGA MEGA DRIVE");
        write_field(&mut rom, b + 0x20, 0x30, domestic);
        write_field(&mut rom, b + 0x50, 0x30, overseas);
        write_field(&mut rom, b + 0x80, 0x0E, serial);
        write_field(&mut rom, b + 0xF0, 0x03, regions);
        rom
    }

    fn write_field(rom: &mut [u8], offset: usize, len: usize, value: &str) {
        rom[offset..offset + len].fill(b' ');
        rom[offset..offset + value.len()].copy_from_slice(value.as_bytes());
    }

    /// Interleave a plain ROM into SMD format.
    fn interleave_smd(rom: &[u8]) -> Vec<u8> {
        let mut out = vec![0u8; SMD_HEADER_SIZE];
        for block in rom.chunks(SMD_BLOCK_SIZE) {
            let half = SMD_BLOCK_SIZE / 2;
            let mut encoded = vec![0u8; SMD_BLOCK_SIZE];
            for i in 0..half {
                encoded[i] = block[i * 2 + 1];
                encoded[half + i] = block[i * 2];
            }
            out.extend_from_slice(&encoded);
        }
        out
    }

    #[test]
    fn parses_plain_header() {
        let rom = make_md_rom("SONIC JP", "SONIC THE HEDGEHOG", "GM 00001009-00", "JUE");
        let facts = parse(&mut Cursor::new(rom)).unwrap().unwrap();
        match facts {
            PlatformFacts::MegaDrive { domestic_title, overseas_title, serial, regions, interleaved } => {
                assert_eq!(domestic_title, "SONIC JP");
                assert_eq!(overseas_title, "SONIC THE HEDGEHOG");
                assert_eq!(serial, "GM 00001009-00");
                assert_eq!(regions, vec![Region::Japan, Region::Usa, Region::Europe]);
                assert!(!interleaved);
            }
            other => panic!("unexpected facts: {:?}", other),
        }
    }

    #[test]
    fn leading_space_magic_accepted() {
        let mut rom = make_md_rom("A", "B", "GM 1", "U");
        let b = HEADER_OFFSET as usize;
        rom[b..b + 0x10].fill(b' ');
        rom[b + 1..b + 1 + 4].copy_from_slice(b"SEGA");
        let facts = parse(&mut Cursor::new(rom)).unwrap();
        assert!(facts.is_some());
    }

    #[test]
    fn smd_dump_is_deinterleaved() {
        let plain = make_md_rom("SONIC JP", "SONIC THE HEDGEHOG", "GM 00001009-00", "JUE");
        let smd = interleave_smd(&plain);
        let facts = parse(&mut Cursor::new(smd)).unwrap().unwrap();
        match facts {
            PlatformFacts::MegaDrive { overseas_title, serial, interleaved, .. } => {
                assert_eq!(overseas_title, "SONIC THE HEDGEHOG");
                assert_eq!(serial, "GM 00001009-00");
                assert!(interleaved);
            }
            other => panic!("unexpected facts: {:?}", other),
        }
    }

    #[test]
    fn hex_digit_region_mask() {
        let rom = make_md_rom("A", "B", "GM 1", "4");
        let facts = parse(&mut Cursor::new(rom)).unwrap().unwrap();
        assert_eq!(facts.region(), Some(Region::Usa));
    }

    #[test]
    fn non_sega_file_is_a_miss() {
        let rom = vec![0u8; 64 * 1024];
        assert!(parse(&mut Cursor::new(rom)).unwrap().is_none());
    }
}
