//! Nintendo DS header parser.
//!
//! The DS cartridge header starts at byte 0. The stored CRC16 of the
//! Nintendo logo is constant on every licensed cartridge and serves as the
//! magic check.

use std::io::{Seek, SeekFrom};

use rom_scout_core::{PlatformFacts, ReadSeek, read_ascii};

use crate::licensee;
use crate::nes::read_exact_or_miss;

/// Header span that covers all fields we read.
const HEADER_SIZE: usize = 0x160;

// Field offsets.
const OFF_TITLE: usize = 0x00;
const OFF_GAME_CODE: usize = 0x0C;
const OFF_MAKER_CODE: usize = 0x10;
const OFF_LOGO_CRC: usize = 0x15C;

/// CRC16 of the standard Nintendo logo, stored little-endian.
const LOGO_CRC: u16 = 0xCF56;

/// Parse the DS cartridge header.
pub fn parse(reader: &mut dyn ReadSeek) -> std::io::Result<Option<PlatformFacts>> {
    reader.seek(SeekFrom::Start(0))?;
    let mut header = [0u8; HEADER_SIZE];
    if read_exact_or_miss(reader, &mut header)?.is_none() {
        return Ok(None);
    }

    let logo_crc = u16::from_le_bytes([header[OFF_LOGO_CRC], header[OFF_LOGO_CRC + 1]]);
    if logo_crc != LOGO_CRC {
        return Ok(None);
    }

    let title = read_ascii(&header[OFF_TITLE..OFF_TITLE + 12]);
    let game_code = read_ascii(&header[OFF_GAME_CODE..OFF_GAME_CODE + 4]);
    let maker_code = read_ascii(&header[OFF_MAKER_CODE..OFF_MAKER_CODE + 2]);
    let maker = licensee::maker_code_name(&maker_code)
        .map(str::to_string)
        .or(if maker_code.is_empty() { None } else { Some(maker_code) });

    Ok(Some(PlatformFacts::Ds { title, game_code, maker }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn make_ds_rom(title: &str, code: &str, maker: &str) -> Vec<u8> {
        let mut rom = vec![0u8; 0x1000];
        rom[OFF_TITLE..OFF_TITLE + title.len()].copy_from_slice(title.as_bytes());
        rom[OFF_GAME_CODE..OFF_GAME_CODE + 4].copy_from_slice(code.as_bytes());
        rom[OFF_MAKER_CODE..OFF_MAKER_CODE + 2].copy_from_slice(maker.as_bytes());
        rom[OFF_LOGO_CRC..OFF_LOGO_CRC + 2].copy_from_slice(&LOGO_CRC.to_le_bytes());
        rom
    }

    #[test]
    fn parses_header() {
        let rom = make_ds_rom("MARIOKART DS", "AMCE", "01");
        let facts = parse(&mut Cursor::new(rom)).unwrap().unwrap();
        match facts {
            PlatformFacts::Ds { title, game_code, maker } => {
                assert_eq!(title, "MARIOKART DS");
                assert_eq!(game_code, "AMCE");
                assert_eq!(maker.as_deref(), Some("Nintendo"));
            }
            other => panic!("unexpected facts: {:?}", other),
        }
    }

    #[test]
    fn wrong_logo_crc_is_a_miss() {
        let mut rom = make_ds_rom("BAD", "XXXX", "01");
        rom[OFF_LOGO_CRC] = 0;
        assert!(parse(&mut Cursor::new(rom)).unwrap().is_none());
    }

    #[test]
    fn short_file_is_a_miss() {
        let mut cursor = Cursor::new(vec![0u8; 0x100]);
        assert!(parse(&mut cursor).unwrap().is_none());
    }
}
