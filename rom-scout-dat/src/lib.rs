//! Logiqx-XML ROM manifest parsing.

pub mod error;
pub mod manifest;

pub use error::ManifestError;
pub use manifest::{Game, Manifest, ManifestHeader, Rom, RomStatus, parse_manifest, parse_manifest_file};
