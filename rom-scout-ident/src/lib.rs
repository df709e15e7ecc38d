//! ROM identification: streaming hashes, archive/disc probes and the
//! per-platform header parse dispatch.

pub mod chd_probe;
pub mod hasher;
pub mod identify;
pub mod zip_probe;

pub use hasher::{HashSelection, hash_file, hash_reader};
pub use identify::{HashMode, IdentifyItem, IdentifyOptions, IdentifyResult, identify};
pub use rom_scout_core::IdentifyError;
