//! Run configuration.
//!
//! Credentials are passed explicitly to the session provider. [`HarvestConfig::from_env`]
//! reads them from the process environment (after loading `.env`) and fails
//! fast on the first missing value.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

pub const CLIENT_ID_VAR: &str = "REDDIT_CLIENT_ID";
pub const CLIENT_SECRET_VAR: &str = "REDDIT_CLIENT_SECRET";
pub const USER_AGENT_VAR: &str = "USER_AGENT";
pub const USERNAME_VAR: &str = "REDDIT_USERNAME";
pub const PASSWORD_VAR: &str = "REDDIT_PASSWORD";
pub const CONCURRENCY_VAR: &str = "HARVEST_CONCURRENCY";
pub const OUTPUT_DIR_VAR: &str = "HARVEST_OUTPUT_DIR";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required configuration: {0}")]
    Missing(&'static str),
    #[error("Invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Account and application credentials for the platform's OAuth endpoint.
#[derive(Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub user_agent: String,
    pub username: String,
    pub password: String,
}

// Secrets stay out of logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("user_agent", &self.user_agent)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct HarvestConfig {
    pub credentials: Credentials,

    /// Maximum number of posts extracted at once
    pub concurrency: usize,

    /// Directory receiving the snapshot files
    pub output_dir: PathBuf,
}

impl HarvestConfig {
    /// Loads `.env` (if present) and reads the configuration from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] for the first absent or empty credential
    /// and [`ConfigError::Invalid`] for a concurrency that is not a positive integer.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |var: &'static str| {
            lookup(var)
                .filter(|value| !value.trim().is_empty())
                .ok_or(ConfigError::Missing(var))
        };

        let credentials = Credentials {
            client_id: required(CLIENT_ID_VAR)?,
            client_secret: required(CLIENT_SECRET_VAR)?,
            user_agent: required(USER_AGENT_VAR)?,
            username: required(USERNAME_VAR)?,
            password: required(PASSWORD_VAR)?,
        };

        let concurrency = match lookup(CONCURRENCY_VAR) {
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                Ok(_) => {
                    return Err(ConfigError::Invalid {
                        var: CONCURRENCY_VAR,
                        reason: "must be at least 1".to_string(),
                    })
                }
                Err(e) => {
                    return Err(ConfigError::Invalid {
                        var: CONCURRENCY_VAR,
                        reason: e.to_string(),
                    })
                }
            },
            None => default_concurrency(),
        };

        let output_dir = lookup(OUTPUT_DIR_VAR)
            .filter(|dir| !dir.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(Self {
            credentials,
            concurrency,
            output_dir,
        })
    }

    pub fn log_summary(&self) {
        tracing::info!(
            user_agent = %self.credentials.user_agent,
            username = %self.credentials.username,
            concurrency = self.concurrency,
            output_dir = %self.output_dir.display(),
            "Config loaded"
        );
    }
}

/// Worker count used when none is configured: available cores plus four, at most 32.
pub fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .saturating_add(4)
        .min(32)
}
