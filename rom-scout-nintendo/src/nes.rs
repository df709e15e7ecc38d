//! NES / Famicom header parser (iNES and NES 2.0).

use std::io::{Read, Seek, SeekFrom};

use rom_scout_core::{PlatformFacts, ReadSeek};

/// iNES magic: "NES" followed by MS-DOS EOF.
const INES_MAGIC: &[u8; 4] = b"NES\x1A";

/// PRG ROM bank size (16 KiB).
const PRG_BANK: u32 = 16 * 1024;

/// CHR ROM bank size (8 KiB).
const CHR_BANK: u32 = 8 * 1024;

/// Parse an iNES / NES 2.0 header.
///
/// The format carries no title or serial; PRG/CHR sizes and the mapper
/// number are the identifying facts.
pub fn parse(reader: &mut dyn ReadSeek) -> std::io::Result<Option<PlatformFacts>> {
    reader.seek(SeekFrom::Start(0))?;
    let mut header = [0u8; 16];
    if read_exact_or_miss(reader, &mut header)?.is_none() {
        return Ok(None);
    }

    if &header[0..4] != INES_MAGIC {
        return Ok(None);
    }

    let nes2 = header[7] & 0x0C == 0x08;

    let mut prg_banks = header[4] as u32;
    let mut chr_banks = header[5] as u32;
    let mut mapper = ((header[6] >> 4) | (header[7] & 0xF0)) as u16;

    if nes2 {
        // NES 2.0 extends the mapper to 12 bits and the bank counts to
        // 12 bits via the MSB nibbles in bytes 8-9.
        mapper |= ((header[8] & 0x0F) as u16) << 8;
        prg_banks |= ((header[9] & 0x0F) as u32) << 8;
        chr_banks |= ((header[9] >> 4) as u32) << 8;
    }

    Ok(Some(PlatformFacts::Nes {
        prg_rom_size: prg_banks * PRG_BANK,
        chr_rom_size: chr_banks * CHR_BANK,
        mapper,
        nes2,
    }))
}

/// Read exactly `buf.len()` bytes, mapping a short file to a miss.
pub(crate) fn read_exact_or_miss(
    reader: &mut dyn ReadSeek,
    buf: &mut [u8],
) -> std::io::Result<Option<()>> {
    match reader.read_exact(buf) {
        Ok(()) => Ok(Some(())),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(None),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn make_ines_header(prg: u8, chr: u8, flags6: u8, flags7: u8) -> Vec<u8> {
        let mut rom = vec![0u8; 16 + 1024];
        rom[0..4].copy_from_slice(INES_MAGIC);
        rom[4] = prg;
        rom[5] = chr;
        rom[6] = flags6;
        rom[7] = flags7;
        rom
    }

    #[test]
    fn parses_plain_ines() {
        let rom = make_ines_header(8, 1, 0x40, 0x00); // mapper 4 (MMC3)
        let mut cursor = Cursor::new(rom);
        let facts = parse(&mut cursor).unwrap().unwrap();
        match facts {
            PlatformFacts::Nes { prg_rom_size, chr_rom_size, mapper, nes2 } => {
                assert_eq!(prg_rom_size, 8 * PRG_BANK);
                assert_eq!(chr_rom_size, CHR_BANK);
                assert_eq!(mapper, 4);
                assert!(!nes2);
            }
            other => panic!("unexpected facts: {:?}", other),
        }
    }

    #[test]
    fn parses_nes2_extended_mapper() {
        let mut rom = make_ines_header(2, 0, 0x00, 0x08);
        rom[8] = 0x01; // mapper bits 8-11
        let mut cursor = Cursor::new(rom);
        let facts = parse(&mut cursor).unwrap().unwrap();
        match facts {
            PlatformFacts::Nes { mapper, nes2, .. } => {
                assert_eq!(mapper, 256);
                assert!(nes2);
            }
            other => panic!("unexpected facts: {:?}", other),
        }
    }

    #[test]
    fn wrong_magic_is_a_miss() {
        let mut cursor = Cursor::new(vec![0u8; 64]);
        assert!(parse(&mut cursor).unwrap().is_none());
    }

    #[test]
    fn short_file_is_a_miss() {
        let mut cursor = Cursor::new(b"NES".to_vec());
        assert!(parse(&mut cursor).unwrap().is_none());
    }
}
