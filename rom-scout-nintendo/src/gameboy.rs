//! Game Boy / Game Boy Color header parser.
//!
//! The cartridge header lives at 0x100. Validation uses the first bytes of
//! the Nintendo logo bitmap, which the boot ROM checks and every licensed
//! cartridge therefore carries.

use std::io::{Seek, SeekFrom};

use rom_scout_core::facts::CgbSupport;
use rom_scout_core::{PlatformFacts, ReadSeek, read_ascii};

use crate::licensee;
use crate::nes::read_exact_or_miss;

/// Header span read: 0x100..0x150.
const HEADER_START: u64 = 0x100;
const HEADER_SIZE: usize = 0x50;

/// First 8 bytes of the Nintendo logo bitmap at 0x104.
const LOGO_PREFIX: [u8; 8] = [0xCE, 0xED, 0x66, 0x66, 0xCC, 0x0D, 0x00, 0x0B];

// Offsets relative to HEADER_START.
const OFF_LOGO: usize = 0x04;
const OFF_TITLE: usize = 0x34;
const OFF_NEW_LICENSEE: usize = 0x44;
const OFF_CGB_FLAG: usize = 0x43;
const OFF_OLD_LICENSEE: usize = 0x4B;

/// Parse the Game Boy cartridge header.
pub fn parse(reader: &mut dyn ReadSeek) -> std::io::Result<Option<PlatformFacts>> {
    reader.seek(SeekFrom::Start(HEADER_START))?;
    let mut header = [0u8; HEADER_SIZE];
    if read_exact_or_miss(reader, &mut header)?.is_none() {
        return Ok(None);
    }

    if header[OFF_LOGO..OFF_LOGO + 8] != LOGO_PREFIX {
        return Ok(None);
    }

    let cgb = match header[OFF_CGB_FLAG] {
        0x80 => CgbSupport::Enhanced,
        0xC0 => CgbSupport::Required,
        _ => CgbSupport::None,
    };

    // CGB cartridges shorten the title field to make room for the
    // manufacturer code and CGB flag.
    let title_len = if cgb == CgbSupport::None { 16 } else { 15 };
    let title = read_ascii(&header[OFF_TITLE..OFF_TITLE + title_len]);

    let old_code = header[OFF_OLD_LICENSEE];
    let licensee = if old_code == 0x33 {
        let code = read_ascii(&header[OFF_NEW_LICENSEE..OFF_NEW_LICENSEE + 2]);
        licensee::maker_code_name(&code)
            .map(str::to_string)
            .or(if code.is_empty() { None } else { Some(code) })
    } else {
        licensee::old_licensee_name(old_code)
            .map(str::to_string)
            .or_else(|| Some(format!("{:02X}", old_code)))
    };

    Ok(Some(PlatformFacts::GameBoy { title, licensee, cgb }))
}
