//! Nintendo cartridge header parsers.
//!
//! Each module exposes a `parse` function that reads a bounded amount of
//! header data from a reader positioned at byte 0 and returns
//! `Ok(Some(PlatformFacts))` on a match, `Ok(None)` on a magic/validation
//! miss, and `Err` only for real I/O failures.

pub mod ds;
pub mod gameboy;
pub mod gba;
pub(crate) mod licensee;
pub mod n64;
pub mod nes;
pub mod snes;
