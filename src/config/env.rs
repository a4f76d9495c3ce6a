//! Environment-driven configuration
//!
//! Every variable is optional. Unset or empty values keep the builder
//! default; malformed values are a configuration error rather than a silent
//! fallback.

use std::path::PathBuf;
use std::str::FromStr;

use super::builder::{ScrapeConfigBuilder, WithDataDir};
use super::types::{Credentials, ScrapeConfig};
use crate::scrape_engine::ScrapeError;

pub const ENV_DATA_DIR: &str = "TAGSCRAPE_DATA_DIR";
pub const ENV_AUTH_STATE: &str = "TAGSCRAPE_AUTH_STATE";
pub const ENV_USERNAME: &str = "TAGSCRAPE_USERNAME";
pub const ENV_PASSWORD: &str = "TAGSCRAPE_PASSWORD";
pub const ENV_HASHTAGS: &str = "TAGSCRAPE_HASHTAGS";
pub const ENV_DEFAULT_LIMIT: &str = "TAGSCRAPE_DEFAULT_LIMIT";
pub const ENV_RATE_RPS: &str = "TAGSCRAPE_RATE_RPS";
pub const ENV_BATCH_SIZE: &str = "TAGSCRAPE_BATCH_SIZE";
pub const ENV_HEADLESS: &str = "TAGSCRAPE_HEADLESS";

/// Data directory used when `TAGSCRAPE_DATA_DIR` is unset
#[must_use]
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("kodegen-tagscrape")
}

fn parse<T: FromStr>(name: &str, raw: &str) -> Result<T, ScrapeError>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| ScrapeError::Config(format!("{name}={raw:?} is not valid: {e}")))
}

fn parse_bool(name: &str, raw: &str) -> Result<bool, ScrapeError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ScrapeError::Config(format!(
            "{name}={raw:?} is not a boolean"
        ))),
    }
}

impl ScrapeConfig {
    /// Build from the process environment
    pub fn from_env() -> Result<Self, ScrapeError> {
        Self::env_builder(|name| std::env::var(name).ok())?.build()
    }

    /// Build from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ScrapeError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::env_builder(lookup)?.build()
    }

    /// Builder pre-filled from a variable source, for further overrides
    pub fn env_builder<F>(lookup: F) -> Result<ScrapeConfigBuilder<WithDataDir>, ScrapeError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let data_dir = get(ENV_DATA_DIR).map_or_else(default_data_dir, PathBuf::from);
        let mut builder = ScrapeConfig::builder().data_dir(data_dir);

        if let Some(path) = get(ENV_AUTH_STATE) {
            builder = builder.auth_state_path(path);
        }
        match (get(ENV_USERNAME), get(ENV_PASSWORD)) {
            (Some(username), Some(password)) => {
                builder = builder.credentials(Credentials::new(username, password));
            }
            (None, None) => {}
            _ => {
                return Err(ScrapeError::Config(format!(
                    "{ENV_USERNAME} and {ENV_PASSWORD} must be set together"
                )));
            }
        }
        if let Some(raw) = get(ENV_HASHTAGS) {
            builder = builder.default_hashtags(raw.split(','));
        }
        if let Some(raw) = get(ENV_DEFAULT_LIMIT) {
            builder = builder.default_limit(parse(ENV_DEFAULT_LIMIT, &raw)?);
        }
        if let Some(raw) = get(ENV_RATE_RPS) {
            let capacity = builder.rate_capacity;
            builder = builder.rate(parse(ENV_RATE_RPS, &raw)?, capacity);
        }
        if let Some(raw) = get(ENV_BATCH_SIZE) {
            builder = builder.batch_size(parse(ENV_BATCH_SIZE, &raw)?);
        }
        if let Some(raw) = get(ENV_HEADLESS) {
            builder = builder.headless(parse_bool(ENV_HEADLESS, &raw)?);
        }
        Ok(builder)
    }
}
