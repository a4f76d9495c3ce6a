//! Core configuration types for hashtag scraping
//!
//! This module contains the main `ScrapeConfig` struct and the login
//! `Credentials` it optionally carries.

use std::fmt;
use std::path::PathBuf;

use crate::browsing::SiteProfile;

/// Platform login credentials
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Main configuration struct for scrape runs and jobs
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    /// Root for output partitions and, by default, the auth-state slot
    pub(crate) data_dir: PathBuf,
    /// Defaults to `<data_dir>/auth_state.json`
    pub(crate) auth_state_path: Option<PathBuf>,
    pub(crate) credentials: Option<Credentials>,
    pub(crate) site: SiteProfile,
    pub(crate) headless: bool,

    pub(crate) default_hashtags: Vec<String>,
    pub(crate) default_limit: usize,
    pub(crate) min_limit: usize,
    pub(crate) max_limit: usize,
    pub(crate) language: String,

    pub(crate) batch_size: usize,
    pub(crate) extraction_permits: usize,
    pub(crate) stagnation_threshold: u32,
    pub(crate) scroll_step: i64,
    pub(crate) settle_delay_ms: u64,

    pub(crate) navigation_timeout_secs: u64,
    pub(crate) content_wait_timeout_secs: u64,
    pub(crate) extraction_timeout_secs: u64,
    pub(crate) probe_timeout_secs: u64,
    pub(crate) identity_step_timeout_secs: u64,
    pub(crate) reconfirm_step_timeout_secs: u64,
    pub(crate) landmark_timeout_secs: u64,

    /// Tokens per second; zero disables throttling
    pub(crate) rate_rps: f64,
    pub(crate) rate_capacity: u32,

    pub(crate) window_hours: i64,
    pub(crate) window_lookahead_minutes: i64,
    pub(crate) job_retention_secs: u64,
    pub(crate) compress_output: bool,
}
