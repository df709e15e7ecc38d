use thiserror::Error;

/// Errors raised while reading or writing frontend output.
#[derive(Debug, Error)]
pub enum FrontendError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Invalid gamelist: {0}")]
    Invalid(String),
}

impl FrontendError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::Invalid(msg.into())
    }
}
