use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during ROM identification.
#[derive(Debug, Error)]
pub enum IdentifyError {
    /// I/O error while reading a file, with the offending path.
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file format is not recognized or is invalid.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// A container header is corrupted or incomplete.
    #[error("Corrupted header: {0}")]
    CorruptedHeader(String),

    /// The file is too small to contain valid data.
    #[error("File too small: expected at least {expected} bytes, got {actual}")]
    TooSmall { expected: u64, actual: u64 },

    /// An archive member could not be read.
    #[error("Archive error: {0}")]
    Archive(String),
}

impl IdentifyError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn invalid_format(msg: impl Into<String>) -> Self {
        Self::InvalidFormat(msg.into())
    }

    pub fn corrupted_header(msg: impl Into<String>) -> Self {
        Self::CorruptedHeader(msg.into())
    }

    pub fn archive(msg: impl Into<String>) -> Self {
        Self::Archive(msg.into())
    }
}
