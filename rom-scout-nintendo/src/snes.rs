//! SNES / Super Famicom header parser.
//!
//! The SNES has no magic bytes; the internal header lives at 0x7FC0 (LoROM)
//! or 0xFFC0 (HiROM) and is located by checking that the checksum and its
//! complement sum to 0xFFFF. Copier headers (512 leading bytes from old
//! dumping hardware) are detected by file size modulo and skipped.

use std::io::{Seek, SeekFrom};

use rom_scout_core::{PlatformFacts, ReadSeek, Region, read_ascii};

use crate::nes::read_exact_or_miss;

/// LoROM internal header location.
const LOROM_HEADER_BASE: u64 = 0x7FC0;

/// HiROM internal header location.
const HIROM_HEADER_BASE: u64 = 0xFFC0;

/// Size of the copier header some dumps carry.
const COPIER_HEADER_SIZE: u64 = 512;

/// Bytes read per header candidate: extended header + internal header.
const HEADER_READ: usize = 0x30;

// Offsets within the 32-byte internal header.
const OFF_TITLE: usize = 0x00;
const OFF_MAP_MODE: usize = 0x15;
const OFF_COUNTRY: usize = 0x19;
const OFF_DEVELOPER_ID: usize = 0x1A;
const OFF_VERSION: usize = 0x1B;
const OFF_COMPLEMENT: usize = 0x1C;
const OFF_CHECKSUM: usize = 0x1E;

/// Parse the SNES internal header.
pub fn parse(reader: &mut dyn ReadSeek) -> std::io::Result<Option<PlatformFacts>> {
    let file_size = reader.seek(SeekFrom::End(0))?;

    let copier_offset = if file_size % 1024 == COPIER_HEADER_SIZE {
        COPIER_HEADER_SIZE
    } else {
        0
    };

    for base in [LOROM_HEADER_BASE, HIROM_HEADER_BASE] {
        let start = copier_offset + base - 0x10; // include the extended header
        if start + HEADER_READ as u64 > file_size {
            continue;
        }

        reader.seek(SeekFrom::Start(start))?;
        let mut buf = [0u8; HEADER_READ];
        if read_exact_or_miss(reader, &mut buf)?.is_none() {
            continue;
        }

        let header = &buf[0x10..];
        let complement = u16::from_le_bytes([header[OFF_COMPLEMENT], header[OFF_COMPLEMENT + 1]]);
        let checksum = u16::from_le_bytes([header[OFF_CHECKSUM], header[OFF_CHECKSUM + 1]]);
        if complement ^ checksum != 0xFFFF {
            continue;
        }

        let title = read_ascii(&header[OFF_TITLE..OFF_TITLE + 21]);
        if title.is_empty() {
            continue;
        }

        let developer_id = header[OFF_DEVELOPER_ID];
        let maker_code = if developer_id == 0x33 {
            // Extended header: 2-character maker code right before the
            // internal header.
            let code = read_ascii(&buf[0x00..0x02]);
            if code.len() == 2 { Some(code) } else { None }
        } else {
            Some(format!("{:02X}", developer_id))
        };

        return Ok(Some(PlatformFacts::Snes {
            title,
            region: decode_country(header[OFF_COUNTRY]),
            maker_code,
            map_mode: header[OFF_MAP_MODE],
            version: header[OFF_VERSION],
        }));
    }

    Ok(None)
}

/// Decode the destination-country byte into a region.
fn decode_country(country: u8) -> Option<Region> {
    match country {
        0x00 => Some(Region::Japan),
        0x01 => Some(Region::Usa),
        0x02..=0x0A => Some(Region::Europe),
        0x0B => Some(Region::China),
        0x0D => Some(Region::Korea),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Build a synthetic ROM with a valid header at the given base.
    fn make_snes_rom(size: usize, base: u64, title: &str, country: u8, dev_id: u8) -> Vec<u8> {
        let mut rom = vec![0u8; size];
        let b = base as usize;

        let title_bytes = title.as_bytes();
        rom[b..b + 21].fill(b' ');
        rom[b..b + title_bytes.len()].copy_from_slice(title_bytes);
        rom[b + OFF_MAP_MODE] = if base == HIROM_HEADER_BASE { 0x21 } else { 0x20 };
        rom[b + OFF_COUNTRY] = country;
        rom[b + OFF_DEVELOPER_ID] = dev_id;
        rom[b + OFF_VERSION] = 1;

        // Any complement/checksum pair summing to 0xFFFF validates.
        rom[b + OFF_COMPLEMENT..b + OFF_COMPLEMENT + 2].copy_from_slice(&0x1234u16.to_le_bytes());
        rom[b + OFF_CHECKSUM..b + OFF_CHECKSUM + 2].copy_from_slice(&0xEDCBu16.to_le_bytes());
        rom
    }

    #[test]
    fn parses_lorom_header() {
        let rom = make_snes_rom(256 * 1024, LOROM_HEADER_BASE, "TEST ROM", 0x01, 0x01);
        let mut cursor = Cursor::new(rom);
        let facts = parse(&mut cursor).unwrap().unwrap();
        match facts {
            PlatformFacts::Snes { title, region, map_mode, version, maker_code } => {
                assert_eq!(title, "TEST ROM");
                assert_eq!(region, Some(Region::Usa));
                assert_eq!(map_mode & 0x01, 0);
                assert_eq!(version, 1);
                assert_eq!(maker_code.as_deref(), Some("01"));
            }
            other => panic!("unexpected facts: {:?}", other),
        }
    }

    #[test]
    fn parses_hirom_header() {
        let rom = make_snes_rom(1024 * 1024, HIROM_HEADER_BASE, "HIROM TEST", 0x00, 0xC3);
        let mut cursor = Cursor::new(rom);
        let facts = parse(&mut cursor).unwrap().unwrap();
        match facts {
            PlatformFacts::Snes { title, region, map_mode, .. } => {
                assert_eq!(title, "HIROM TEST");
                assert_eq!(region, Some(Region::Japan));
                assert_eq!(map_mode & 0x01, 1);
            }
            other => panic!("unexpected facts: {:?}", other),
        }
    }

    #[test]
    fn copier_header_is_skipped() {
        let bare = make_snes_rom(256 * 1024, LOROM_HEADER_BASE, "COPIER", 0x02, 0x01);
        let mut rom = vec![0u8; COPIER_HEADER_SIZE as usize];
        rom.extend_from_slice(&bare);
        let mut cursor = Cursor::new(rom);
        let facts = parse(&mut cursor).unwrap().unwrap();
        assert_eq!(facts.title(), Some("COPIER"));
        assert_eq!(facts.region(), Some(Region::Europe));
    }

    #[test]
    fn extended_maker_code() {
        let mut rom = make_snes_rom(256 * 1024, LOROM_HEADER_BASE, "EXT", 0x01, 0x33);
        let ext = (LOROM_HEADER_BASE - 0x10) as usize;
        rom[ext..ext + 2].copy_from_slice(b"B4");
        let mut cursor = Cursor::new(rom);
        let facts = parse(&mut cursor).unwrap().unwrap();
        assert_eq!(facts.maker(), Some("B4"));
    }

    #[test]
    fn invalid_complement_is_a_miss() {
        let mut rom = make_snes_rom(256 * 1024, LOROM_HEADER_BASE, "BAD", 0x01, 0x01);
        let b = LOROM_HEADER_BASE as usize;
        rom[b + OFF_CHECKSUM] ^= 0xFF; // break the complement relationship
        let mut cursor = Cursor::new(rom);
        assert!(parse(&mut cursor).unwrap().is_none());
    }

    #[test]
    fn tiny_file_is_a_miss() {
        let mut cursor = Cursor::new(vec![0u8; 1024]);
        assert!(parse(&mut cursor).unwrap().is_none());
    }
}
