//! ES-DE catalog and media tree generation.

pub mod error;
pub mod esde;
pub mod media_types;

pub use error::FrontendError;
pub use esde::{EsDeGenerator, GamelistEntry, MediaWriteOutcome, normalize_base_name, read_gamelist};
pub use media_types::MediaKind;
