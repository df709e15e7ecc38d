//! Game Boy Advance header parser.
//!
//! The cartridge header occupies the first 0xC0 bytes; the identifying
//! fields start at 0xA0. The fixed value 0x96 at 0xB2 serves as the magic.

use std::io::{Seek, SeekFrom};

use rom_scout_core::{PlatformFacts, ReadSeek, read_ascii};

use crate::licensee;
use crate::nes::read_exact_or_miss;

/// Full header size.
const HEADER_SIZE: usize = 0xC0;

// Field offsets.
const OFF_TITLE: usize = 0xA0;
const OFF_GAME_CODE: usize = 0xAC;
const OFF_MAKER_CODE: usize = 0xB0;
const OFF_FIXED: usize = 0xB2;
const OFF_VERSION: usize = 0xBC;

/// Fixed byte required by the BIOS at 0xB2.
const FIXED_VALUE: u8 = 0x96;

/// Parse the GBA cartridge header.
pub fn parse(reader: &mut dyn ReadSeek) -> std::io::Result<Option<PlatformFacts>> {
    reader.seek(SeekFrom::Start(0))?;
    let mut header = [0u8; HEADER_SIZE];
    if read_exact_or_miss(reader, &mut header)?.is_none() {
        return Ok(None);
    }

    if header[OFF_FIXED] != FIXED_VALUE {
        return Ok(None);
    }

    let title = read_ascii(&header[OFF_TITLE..OFF_TITLE + 12]);
    let game_code = read_ascii(&header[OFF_GAME_CODE..OFF_GAME_CODE + 4]);
    let maker_code = read_ascii(&header[OFF_MAKER_CODE..OFF_MAKER_CODE + 2]);
    let maker = licensee::maker_code_name(&maker_code)
        .map(str::to_string)
        .or(if maker_code.is_empty() { None } else { Some(maker_code) });

    Ok(Some(PlatformFacts::Gba {
        title,
        game_code,
        maker,
        version: header[OFF_VERSION],
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn make_gba_rom(title: &str, code: &str, maker: &str, version: u8) -> Vec<u8> {
        let mut rom = vec![0u8; 0x1000];
        rom[OFF_TITLE..OFF_TITLE + title.len()].copy_from_slice(title.as_bytes());
        rom[OFF_GAME_CODE..OFF_GAME_CODE + 4].copy_from_slice(code.as_bytes());
        rom[OFF_MAKER_CODE..OFF_MAKER_CODE + 2].copy_from_slice(maker.as_bytes());
        rom[OFF_FIXED] = FIXED_VALUE;
        rom[OFF_VERSION] = version;
        rom
    }

    #[test]
    fn parses_header() {
        let rom = make_gba_rom("METROID4USA", "AMTE", "01", 0);
        let facts = parse(&mut Cursor::new(rom)).unwrap().unwrap();
        match facts {
            PlatformFacts::Gba { title, game_code, maker, version } => {
                assert_eq!(title, "METROID4USA");
                assert_eq!(game_code, "AMTE");
                assert_eq!(maker.as_deref(), Some("Nintendo"));
                assert_eq!(version, 0);
            }
            other => panic!("unexpected facts: {:?}", other),
        }
    }

    #[test]
    fn serial_accessor_returns_game_code() {
        let rom = make_gba_rom("GOLDEN SUN", "AGSE", "01", 1);
        let facts = parse(&mut Cursor::new(rom)).unwrap().unwrap();
        assert_eq!(facts.serial(), Some("AGSE"));
        assert_eq!(facts.version().as_deref(), Some("1.1"));
    }

    #[test]
    fn missing_fixed_byte_is_a_miss() {
        let mut rom = make_gba_rom("BAD", "XXXX", "01", 0);
        rom[OFF_FIXED] = 0;
        assert!(parse(&mut Cursor::new(rom)).unwrap().is_none());
    }
}
