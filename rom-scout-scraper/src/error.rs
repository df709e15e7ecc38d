use thiserror::Error;

/// Errors that can occur during scraping operations.
///
/// Variants map one-to-one onto the orchestrator's routing policy: some are
/// per-entry outcomes, some trigger retries, some abort the whole run.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Game not found in the metadata service")]
    NotFound,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("Daily quota exceeded ({used}/{max} requests)")]
    QuotaExceeded { used: u32, max: u32 },

    #[error("Software or user is blacklisted by the metadata service")]
    Blacklisted,

    #[error("Metadata API is locked: {0}")]
    ApiLocked(String),

    #[error("Rate limited by the metadata service")]
    RateLimited,

    #[error("Metadata service is busy: {0}")]
    ServerBusy(String),

    #[error("Transient error: {0}")]
    Transient(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Frontend error: {0}")]
    Frontend(#[from] rom_scout_frontend::FrontendError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Operation cancelled")]
    Cancelled,
}

impl ScrapeError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn transient(msg: impl Into<String>) -> Self {
        Self::Transient(msg.into())
    }

    /// Errors that end the entire run, not just one entry.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::InvalidCredentials(_)
                | Self::QuotaExceeded { .. }
                | Self::Blacklisted
                | Self::ApiLocked(_)
                | Self::Config(_)
        )
    }

    /// Errors worth retrying with backoff.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited | Self::ServerBusy(_) | Self::Transient(_) => true,
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            _ => false,
        }
    }
}
