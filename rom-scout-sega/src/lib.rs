//! Sega header parsers: Mega Drive cartridges (including SMD-interleaved
//! dumps) and the IP.BIN boot headers of Saturn and Dreamcast disc images.

use std::io::Read;

pub mod dreamcast;
pub mod megadrive;
pub mod saturn;

/// Read exactly `buf.len()` bytes, mapping a short file to a miss.
pub(crate) fn read_exact_or_miss(
    reader: &mut dyn rom_scout_core::ReadSeek,
    buf: &mut [u8],
) -> std::io::Result<Option<()>> {
    match reader.read_exact(buf) {
        Ok(()) => Ok(Some(())),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(None),
        Err(e) => Err(e),
    }
}
