//! Original Xbox executable (XBE) header parser.
//!
//! The XBE header stores a pointer to a certificate section containing the
//! title id and a UTF-16 title name. Addresses in the header are virtual;
//! subtracting the declared base address yields file offsets.

use std::io::{Read, Seek, SeekFrom};

use rom_scout_core::{PlatformFacts, ReadSeek};

/// XBE magic.
const XBE_MAGIC: &[u8; 4] = b"XBEH";

/// Header fields (virtual addresses, little-endian).
const OFF_BASE_ADDR: u64 = 0x104;
const OFF_CERT_ADDR: u64 = 0x118;

/// Certificate fields relative to the certificate start.
const CERT_OFF_TITLE_ID: usize = 0x08;
const CERT_OFF_TITLE_NAME: usize = 0x0C;

/// Title name length in UTF-16 code units.
const TITLE_NAME_UNITS: usize = 40;

/// Certificate bytes needed for the fields we read.
const CERT_READ: usize = CERT_OFF_TITLE_NAME + TITLE_NAME_UNITS * 2;

/// Parse an XBE executable header.
pub fn parse(reader: &mut dyn ReadSeek) -> std::io::Result<Option<PlatformFacts>> {
    let file_size = reader.seek(SeekFrom::End(0))?;
    reader.seek(SeekFrom::Start(0))?;

    let mut magic = [0u8; 4];
    if read_exact_or_miss(reader, &mut magic)?.is_none() || &magic != XBE_MAGIC {
        return Ok(None);
    }

    let base_addr = read_u32_at(reader, OFF_BASE_ADDR)?;
    let cert_addr = read_u32_at(reader, OFF_CERT_ADDR)?;
    let cert_offset = match cert_addr.checked_sub(base_addr) {
        Some(off) => off as u64,
        None => return Ok(None),
    };
    if cert_offset + CERT_READ as u64 > file_size {
        return Ok(None);
    }

    reader.seek(SeekFrom::Start(cert_offset))?;
    let mut cert = [0u8; CERT_READ];
    if read_exact_or_miss(reader, &mut cert)?.is_none() {
        return Ok(None);
    }

    let title_id = u32::from_le_bytes([
        cert[CERT_OFF_TITLE_ID],
        cert[CERT_OFF_TITLE_ID + 1],
        cert[CERT_OFF_TITLE_ID + 2],
        cert[CERT_OFF_TITLE_ID + 3],
    ]);

    let units: Vec<u16> = cert[CERT_OFF_TITLE_NAME..]
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .take_while(|&u| u != 0)
        .collect();
    let title = String::from_utf16_lossy(&units).trim().to_string();

    Ok(Some(PlatformFacts::Xbox { title, title_id }))
}

fn read_u32_at(reader: &mut dyn ReadSeek, offset: u64) -> std::io::Result<u32> {
    reader.seek(SeekFrom::Start(offset))?;
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_exact_or_miss(
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

    fn make_xbe(title: &str, title_id: u32) -> Vec<u8> {
        let base: u32 = 0x0001_0000;
        let cert_offset: usize = 0x400;
        let mut xbe = vec![0u8; 0x800];
        xbe[..4].copy_from_slice(XBE_MAGIC);
        xbe[OFF_BASE_ADDR as usize..OFF_BASE_ADDR as usize + 4]
            .copy_from_slice(&base.to_le_bytes());
        xbe[OFF_CERT_ADDR as usize..OFF_CERT_ADDR as usize + 4]
            .copy_from_slice(&(base + cert_offset as u32).to_le_bytes());

        let cert = cert_offset;
        xbe[cert + CERT_OFF_TITLE_ID..cert + CERT_OFF_TITLE_ID + 4]
            .copy_from_slice(&title_id.to_le_bytes());
        for (i, u) in title.encode_utf16().enumerate().take(TITLE_NAME_UNITS) {
            let at = cert + CERT_OFF_TITLE_NAME + i * 2;
            xbe[at..at + 2].copy_from_slice(&u.to_le_bytes());
        }
        xbe
    }

    #[test]
    fn parses_certificate() {
        let xbe = make_xbe("Halo", 0x4D53_0004);
        let facts = parse(&mut Cursor::new(xbe)).unwrap().unwrap();
        match facts {
            PlatformFacts::Xbox { title, title_id } => {
                assert_eq!(title, "Halo");
                assert_eq!(title_id, 0x4D53_0004);
            }
            other => panic!("unexpected facts: {:?}", other),
        }
    }

    #[test]
    fn wrong_magic_is_a_miss() {
        assert!(parse(&mut Cursor::new(vec![0u8; 0x800])).unwrap().is_none());
    }

    #[test]
    fn certificate_out_of_bounds_is_a_miss() {
        let mut xbe = make_xbe("Halo", 1);
        // Point the certificate past the end of the file.
        xbe[OFF_CERT_ADDR as usize..OFF_CERT_ADDR as usize + 4]
            .copy_from_slice(&0xFFFF_0000u32.to_le_bytes());
        assert!(parse(&mut Cursor::new(xbe)).unwrap().is_none());
    }
}
