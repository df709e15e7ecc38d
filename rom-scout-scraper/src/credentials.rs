//! Metadata service credentials.
//!
//! Loaded from the environment. Developer credentials identify this
//! software to the service and are required; user credentials raise the
//! account's thread and quota limits and are optional.

use crate::error::ScrapeError;

/// Environment variable names.
pub const ENV_DEV_ID: &str = "SCREENSCRAPER_DEVID";
pub const ENV_DEV_PASSWORD: &str = "SCREENSCRAPER_DEVPASSWORD";
pub const ENV_USER_ID: &str = "SCREENSCRAPER_SSID";
pub const ENV_USER_PASSWORD: &str = "SCREENSCRAPER_SSPASSWORD";

/// Credentials for authenticating with the metadata service.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub dev_id: String,
    pub dev_password: String,
    pub soft_name: String,
    pub user_id: Option<String>,
    pub user_password: Option<String>,
}

impl Credentials {
    /// Load credentials from the environment. Missing developer
    /// credentials are fatal; user credentials are optional.
    pub fn load() -> Result<Self, ScrapeError> {
        let dev_id = std::env::var(ENV_DEV_ID).map_err(|_| {
            ScrapeError::config(format!("Missing developer id: set {ENV_DEV_ID}"))
        })?;
        let dev_password = std::env::var(ENV_DEV_PASSWORD).map_err(|_| {
            ScrapeError::config(format!("Missing developer secret: set {ENV_DEV_PASSWORD}"))
        })?;

        Ok(Self {
            dev_id,
            dev_password,
            soft_name: "rom-scout".to_string(),
            user_id: std::env::var(ENV_USER_ID).ok(),
            user_password: std::env::var(ENV_USER_PASSWORD).ok(),
        })
    }

    /// True when user credentials are present.
    pub fn has_user(&self) -> bool {
        self.user_id.is_some() && self.user_password.is_some()
    }
}
