//! Gateway configuration and upstream credentials
//!
//! The Schiphol public flight API authenticates with two static headers
//! issued on the developer portal. Credentials are read from the environment;
//! gateway tuning (TTL, timeouts, background refresh) has sensible defaults.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable holding the application id header value
const APP_ID_VAR: &str = "SCHIPHOL_APP_ID";

/// Environment variable holding the application key header value
const APP_KEY_VAR: &str = "SCHIPHOL_APP_KEY";

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable is not set
    #[error("missing environment variable: {0}")]
    MissingVar(&'static str),
}

/// Static credentials for the Schiphol public flight API
///
/// Sent with every request as the `app_id` and `app_key` headers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiCredentials {
    /// Application id issued by the developer portal
    pub app_id: String,
    /// Application key issued by the developer portal
    pub app_key: String,
}

impl ApiCredentials {
    /// Creates credentials from explicit values
    pub fn new(app_id: impl Into<String>, app_key: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            app_key: app_key.into(),
        }
    }

    /// Reads credentials from `SCHIPHOL_APP_ID` and `SCHIPHOL_APP_KEY`
    ///
    /// # Returns
    /// * `Ok(ApiCredentials)` when both variables are set
    /// * `Err(ConfigError::MissingVar)` naming the first missing variable
    pub fn from_env() -> Result<Self, ConfigError> {
        let app_id = std::env::var(APP_ID_VAR).map_err(|_| ConfigError::MissingVar(APP_ID_VAR))?;
        let app_key =
            std::env::var(APP_KEY_VAR).map_err(|_| ConfigError::MissingVar(APP_KEY_VAR))?;
        Ok(Self { app_id, app_key })
    }
}

/// Tuning knobs for the fetch-and-cache gateway
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// How long a cache entry is considered fresh
    pub ttl: Duration,
    /// Timeout applied to each upstream page request
    pub request_timeout: Duration,
    /// Whether `ensure_warmed` is allowed to schedule background fetches
    pub background_refresh: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(300), // 5 minutes
            request_timeout: Duration::from_secs(15),
            background_refresh: true,
        }
    }
}
