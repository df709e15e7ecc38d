use std::io::{Read, Seek};

pub mod error;
pub mod facts;
pub mod iso9660;
pub mod platform;
pub mod region;

pub use error::IdentifyError;
pub use facts::PlatformFacts;
pub use platform::{Platform, PlatformParseError};
pub use region::Region;

use serde::{Deserialize, Serialize};

/// A reader that implements both Read and Seek.
pub trait ReadSeek: Read + Seek {}
impl<T: Read + Seek> ReadSeek for T {}

/// Content hash algorithms used for ROM identification and API lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashKind {
    Crc32,
    Md5,
    Sha1,
}

impl HashKind {
    /// All hash kinds, in display order.
    pub fn all() -> &'static [HashKind] {
        &[HashKind::Crc32, HashKind::Md5, HashKind::Sha1]
    }

    /// Lowercase name used in JSON output and API parameters.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Crc32 => "crc32",
            Self::Md5 => "md5",
            Self::Sha1 => "sha1",
        }
    }

    /// Length of the lowercase hex digest for this algorithm.
    pub fn hex_len(&self) -> usize {
        match self {
            Self::Crc32 => 8,
            Self::Md5 => 32,
            Self::Sha1 => 40,
        }
    }
}

impl std::fmt::Display for HashKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Read a fixed-size ASCII field, mapping non-printable bytes to spaces and
/// trimming the result. Shared by the cartridge header parsers.
pub fn read_ascii(buf: &[u8]) -> String {
    let s: String = buf
        .iter()
        .map(|&b| if (0x20..0x7F).contains(&b) { b as char } else { ' ' })
        .collect();
    s.trim().to_string()
}
