//! PlayStation family disc parser.
//!
//! All three platforms are ISO-9660 discs; they are told apart by what the
//! root directory contains:
//!
//! - PS1: `SYSTEM.CNF` with a `BOOT = cdrom:\...` line
//! - PS2: `SYSTEM.CNF` with a `BOOT2 = cdrom0:\...` line
//! - PSP: `UMD_DATA.BIN` carrying the product serial

use rom_scout_core::iso9660::{self, SectorFormat};
use rom_scout_core::platform::Platform;
use rom_scout_core::{PlatformFacts, ReadSeek};

/// Upper bound on SYSTEM.CNF / UMD_DATA.BIN reads.
const CNF_READ_LIMIT: usize = 2048;

/// Parse a PlayStation-family disc image.
pub fn parse(reader: &mut dyn ReadSeek) -> std::io::Result<Option<PlatformFacts>> {
    let format = match iso9660::detect_sector_format(reader)? {
        Some(f) => f,
        None => return Ok(None),
    };

    let pvd = match iso9660::read_pvd(reader, format)? {
        Some(p) => p,
        None => return Ok(None),
    };

    // SYSTEM.CNF identifies PS1 and PS2 discs.
    if let Some(record) = iso9660::find_in_root(reader, format, &pvd.root, "SYSTEM.CNF")? {
        let data = iso9660::read_file(reader, format, &record, CNF_READ_LIMIT)?;
        let text = String::from_utf8_lossy(&data);
        if let Some(facts) = parse_system_cnf(&text) {
            return Ok(Some(facts));
        }
    }

    // UMD_DATA.BIN identifies PSP discs.
    if let Some(record) = iso9660::find_in_root(reader, format, &pvd.root, "UMD_DATA.BIN")? {
        let data = iso9660::read_file(reader, format, &record, CNF_READ_LIMIT)?;
        let text = String::from_utf8_lossy(&data);
        let serial = text.split('|').next().map(str::trim).filter(|s| !s.is_empty());
        let title = volume_title(&pvd.volume_id);
        return Ok(Some(PlatformFacts::Disc {
            system: Platform::Psp,
            serial: serial.map(str::to_string),
            title,
            version: None,
            disc_no: None,
        }));
    }

    // A PLAYSTATION system id without SYSTEM.CNF still identifies the
    // family (audio/demo discs); default to PS1 with no serial.
    if pvd.system_id.starts_with("PLAYSTATION") {
        return Ok(Some(PlatformFacts::Disc {
            system: Platform::Ps1,
            serial: None,
            title: volume_title(&pvd.volume_id),
            version: None,
            disc_no: None,
        }));
    }

    Ok(None)
}

/// Parse SYSTEM.CNF content into disc facts.
fn parse_system_cnf(text: &str) -> Option<PlatformFacts> {
    let mut boot_path: Option<(&str, Platform)> = None;
    let mut version: Option<String> = None;

    for line in text.lines() {
        let line = line.trim();
        if let Some((key, value)) = line.split_once('=') {
            let key = key.trim();
            let value = value.trim();
            match key {
                "BOOT2" => boot_path = Some((value, Platform::Ps2)),
                "BOOT" if boot_path.is_none() => boot_path = Some((value, Platform::Ps1)),
                "VER" => version = Some(value.to_string()),
                _ => {}
            }
        }
    }

    let (path, system) = boot_path?;
    Some(PlatformFacts::Disc {
        system,
        serial: serial_from_boot_path(path),
        title: None,
        version,
        disc_no: None,
    })
}

/// Normalize a boot executable path into the canonical serial form:
/// `cdrom:\SLUS_005.94;1` → `SLUS-00594`.
fn serial_from_boot_path(path: &str) -> Option<String> {
    let file = path
        .rsplit(['\\', '/', ':'])
        .next()?
        .split(';')
        .next()?
        .trim();
    if file.is_empty() {
        return None;
    }

    let cleaned: String = file
        .chars()
        .filter(|c| *c != '.')
        .map(|c| if c == '_' { '-' } else { c.to_ascii_uppercase() })
        .collect();

    // Expect the LLLL-NNNNN shape; anything else is returned as-is so odd
    // homebrew boot names still surface.
    Some(cleaned)
}

/// Volume identifiers use underscores for spaces.
fn volume_title(volume_id: &str) -> Option<String> {
    let title = volume_id.replace('_', " ").trim().to_string();
    if title.is_empty() { None } else { Some(title) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rom_scout_core::iso9660::LOGICAL_SECTOR_SIZE;
    use std::io::Cursor;

    /// Build a cooked single-file ISO image (PVD at 16, root dir at 20,
    /// file at 21). Mirrors the core iso9660 test builder.
    fn make_iso(system_id: &str, volume_id: &str, file_name: &str, contents: &[u8]) -> Vec<u8> {
        let mut image = vec![0u8; LOGICAL_SECTOR_SIZE * 22];
        let pvd = LOGICAL_SECTOR_SIZE * 16;
        image[pvd] = 0x01;
        image[pvd + 1..pvd + 6].copy_from_slice(b"CD001");
        for b in &mut image[pvd + 8..pvd + 72] {
            *b = b' ';
        }
        image[pvd + 8..pvd + 8 + system_id.len()].copy_from_slice(system_id.as_bytes());
        image[pvd + 40..pvd + 40 + volume_id.len()].copy_from_slice(volume_id.as_bytes());

        let root = pvd + 156;
        image[root] = 34;
        image[root + 2..root + 6].copy_from_slice(&20u32.to_le_bytes());
        image[root + 10..root + 14].copy_from_slice(&(LOGICAL_SECTOR_SIZE as u32).to_le_bytes());
        image[root + 25] = 0x02;
        image[root + 32] = 1;

        let dir = LOGICAL_SECTOR_SIZE * 20;
        let id = format!("{};1", file_name);
        image[dir] = (33 + id.len()) as u8;
        image[dir + 2..dir + 6].copy_from_slice(&21u32.to_le_bytes());
        image[dir + 10..dir + 14].copy_from_slice(&(contents.len() as u32).to_le_bytes());
        image[dir + 32] = id.len() as u8;
        image[dir + 33..dir + 33 + id.len()].copy_from_slice(id.as_bytes());

        let data = LOGICAL_SECTOR_SIZE * 21;
        image[data..data + contents.len()].copy_from_slice(contents);
        image
    }

    #[test]
    fn parses_ps1_disc() {
        let cnf = b"BOOT = cdrom:\\SLUS_005.94;1\r\nTCB = 4\r\nEVENT = 10\r\n";
        let image = make_iso("PLAYSTATION", "CASTLEVANIA", "SYSTEM.CNF", cnf);
        let facts = parse(&mut Cursor::new(image)).unwrap().unwrap();
        match facts {
            PlatformFacts::Disc { system, serial, .. } => {
                assert_eq!(system, Platform::Ps1);
                assert_eq!(serial.as_deref(), Some("SLUS-00594"));
            }
            other => panic!("unexpected facts: {:?}", other),
        }
    }

    #[test]
    fn parses_ps2_disc_with_version() {
        let cnf = b"BOOT2 = cdrom0:\\SLUS_203.12;1\r\nVER = 1.01\r\nVMODE = NTSC\r\n";
        let image = make_iso("PLAYSTATION", "GTA3", "SYSTEM.CNF", cnf);
        let facts = parse(&mut Cursor::new(image)).unwrap().unwrap();
        match facts {
            PlatformFacts::Disc { system, serial, version, .. } => {
                assert_eq!(system, Platform::Ps2);
                assert_eq!(serial.as_deref(), Some("SLUS-20312"));
                assert_eq!(version.as_deref(), Some("1.01"));
            }
            other => panic!("unexpected facts: {:?}", other),
        }
    }

    #[test]
    fn parses_psp_umd() {
        let umd = b"ULUS-10041|1234567890123456|0001|G";
        let image = make_iso("PSP GAME", "LUMINES", "UMD_DATA.BIN", umd);
        let facts = parse(&mut Cursor::new(image)).unwrap().unwrap();
        match facts {
            PlatformFacts::Disc { system, serial, title, .. } => {
                assert_eq!(system, Platform::Psp);
                assert_eq!(serial.as_deref(), Some("ULUS-10041"));
                assert_eq!(title.as_deref(), Some("LUMINES"));
            }
            other => panic!("unexpected facts: {:?}", other),
        }
    }

    #[test]
    fn playstation_disc_without_cnf_defaults_to_ps1() {
        let image = make_iso("PLAYSTATION", "AUDIO_DISC", "README.TXT", b"hi");
        let facts = parse(&mut Cursor::new(image)).unwrap().unwrap();
        assert_eq!(facts.platform(), Platform::Ps1);
        assert_eq!(facts.serial(), None);
        assert_eq!(facts.title(), Some("AUDIO DISC"));
    }

    #[test]
    fn non_playstation_disc_is_a_miss() {
        let image = make_iso("SOMETHING ELSE", "DATA", "README.TXT", b"hi");
        assert!(parse(&mut Cursor::new(image)).unwrap().is_none());
    }

    #[test]
    fn serial_normalization() {
        assert_eq!(
            serial_from_boot_path("cdrom:\\SLUS_005.94;1").as_deref(),
            Some("SLUS-00594")
        );
        assert_eq!(
            serial_from_boot_path("cdrom0:\\SCES_123.45;1").as_deref(),
            Some("SCES-12345")
        );
        assert_eq!(serial_from_boot_path("cdrom:\\;1"), None);
    }
}
