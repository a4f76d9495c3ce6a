//! Type-safe builder for `ScrapeConfig` using the typestate pattern
//!
//! `build()` only exists once the data directory has been set.

use std::marker::PhantomData;
use std::path::PathBuf;

use super::types::{Credentials, ScrapeConfig};
use crate::browsing::SiteProfile;
use crate::scrape_engine::ScrapeError;
use crate::utils::constants::{
    DEFAULT_BATCH_SIZE, DEFAULT_CONTENT_WAIT_TIMEOUT_SECS, DEFAULT_EXTRACTION_PERMITS,
    DEFAULT_EXTRACTION_TIMEOUT_SECS, DEFAULT_HASHTAGS, DEFAULT_IDENTITY_STEP_TIMEOUT_SECS,
    DEFAULT_JOB_RETENTION_SECS, DEFAULT_LANDMARK_TIMEOUT_SECS, DEFAULT_LANGUAGE, DEFAULT_LIMIT,
    DEFAULT_NAVIGATION_TIMEOUT_SECS, DEFAULT_PROBE_TIMEOUT_SECS, DEFAULT_RATE_CAPACITY,
    DEFAULT_RATE_RPS, DEFAULT_RECONFIRM_STEP_TIMEOUT_SECS, DEFAULT_SCROLL_STEP,
    DEFAULT_SETTLE_DELAY_MS, DEFAULT_STAGNATION_THRESHOLD, DEFAULT_WINDOW_HOURS,
    DEFAULT_WINDOW_LOOKAHEAD_MINUTES, MAX_LIMIT, MIN_LIMIT, MIN_RATE_RPS,
};
use crate::utils::normalize_hashtags;

// Type states for the builder
pub struct WithDataDir;

pub struct ScrapeConfigBuilder<State = ()> {
    pub(crate) data_dir: Option<PathBuf>,
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
    pub(crate) rate_rps: f64,
    pub(crate) rate_capacity: u32,
    pub(crate) window_hours: i64,
    pub(crate) window_lookahead_minutes: i64,
    pub(crate) job_retention_secs: u64,
    pub(crate) compress_output: bool,
    pub(crate) _phantom: PhantomData<State>,
}

impl Default for ScrapeConfigBuilder<()> {
    fn default() -> Self {
        Self {
            data_dir: None,
            auth_state_path: None,
            credentials: None,
            site: SiteProfile::default(),
            headless: true,
            default_hashtags: normalize_hashtags(DEFAULT_HASHTAGS.iter().copied()),
            default_limit: DEFAULT_LIMIT,
            min_limit: MIN_LIMIT,
            max_limit: MAX_LIMIT,
            language: DEFAULT_LANGUAGE.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            extraction_permits: DEFAULT_EXTRACTION_PERMITS,
            stagnation_threshold: DEFAULT_STAGNATION_THRESHOLD,
            scroll_step: DEFAULT_SCROLL_STEP,
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
            navigation_timeout_secs: DEFAULT_NAVIGATION_TIMEOUT_SECS,
            content_wait_timeout_secs: DEFAULT_CONTENT_WAIT_TIMEOUT_SECS,
            extraction_timeout_secs: DEFAULT_EXTRACTION_TIMEOUT_SECS,
            probe_timeout_secs: DEFAULT_PROBE_TIMEOUT_SECS,
            identity_step_timeout_secs: DEFAULT_IDENTITY_STEP_TIMEOUT_SECS,
            reconfirm_step_timeout_secs: DEFAULT_RECONFIRM_STEP_TIMEOUT_SECS,
            landmark_timeout_secs: DEFAULT_LANDMARK_TIMEOUT_SECS,
            rate_rps: DEFAULT_RATE_RPS,
            rate_capacity: DEFAULT_RATE_CAPACITY,
            window_hours: DEFAULT_WINDOW_HOURS,
            window_lookahead_minutes: DEFAULT_WINDOW_LOOKAHEAD_MINUTES,
            job_retention_secs: DEFAULT_JOB_RETENTION_SECS,
            compress_output: false,
            _phantom: PhantomData,
        }
    }
}

impl ScrapeConfig {
    /// Create a builder for configuring a `ScrapeConfig` with a fluent interface
    #[must_use]
    pub fn builder() -> ScrapeConfigBuilder<()> {
        ScrapeConfigBuilder::default()
    }
}

impl ScrapeConfigBuilder<()> {
    pub fn data_dir(self, dir: impl Into<PathBuf>) -> ScrapeConfigBuilder<WithDataDir> {
        ScrapeConfigBuilder {
            data_dir: Some(dir.into()),
            auth_state_path: self.auth_state_path,
            credentials: self.credentials,
            site: self.site,
            headless: self.headless,
            default_hashtags: self.default_hashtags,
            default_limit: self.default_limit,
            min_limit: self.min_limit,
            max_limit: self.max_limit,
            language: self.language,
            batch_size: self.batch_size,
            extraction_permits: self.extraction_permits,
            stagnation_threshold: self.stagnation_threshold,
            scroll_step: self.scroll_step,
            settle_delay_ms: self.settle_delay_ms,
            navigation_timeout_secs: self.navigation_timeout_secs,
            content_wait_timeout_secs: self.content_wait_timeout_secs,
            extraction_timeout_secs: self.extraction_timeout_secs,
            probe_timeout_secs: self.probe_timeout_secs,
            identity_step_timeout_secs: self.identity_step_timeout_secs,
            reconfirm_step_timeout_secs: self.reconfirm_step_timeout_secs,
            landmark_timeout_secs: self.landmark_timeout_secs,
            rate_rps: self.rate_rps,
            rate_capacity: self.rate_capacity,
            window_hours: self.window_hours,
            window_lookahead_minutes: self.window_lookahead_minutes,
            job_retention_secs: self.job_retention_secs,
            compress_output: self.compress_output,
            _phantom: PhantomData,
        }
    }
}

// Build method only available when all required fields are set
impl ScrapeConfigBuilder<WithDataDir> {
    pub fn build(self) -> Result<ScrapeConfig, ScrapeError> {
        let data_dir = self
            .data_dir
            .ok_or_else(|| ScrapeError::Config("data_dir is required".to_string()))?;

        if self.min_limit == 0 || self.min_limit > self.max_limit {
            return Err(ScrapeError::Config(format!(
                "invalid limit range {}..={}",
                self.min_limit, self.max_limit
            )));
        }
        if !(self.min_limit..=self.max_limit).contains(&self.default_limit) {
            return Err(ScrapeError::Config(format!(
                "default limit {} outside {}..={}",
                self.default_limit, self.min_limit, self.max_limit
            )));
        }
        if self.batch_size == 0 {
            return Err(ScrapeError::Config("batch size must be at least 1".to_string()));
        }
        if self.extraction_permits == 0 {
            return Err(ScrapeError::Config(
                "extraction permits must be at least 1".to_string(),
            ));
        }
        if !self.rate_rps.is_finite() || self.rate_rps < 0.0 {
            return Err(ScrapeError::Config(format!(
                "rate must be a non-negative number, got {}",
                self.rate_rps
            )));
        }
        if self.rate_rps > 0.0 && self.rate_rps < MIN_RATE_RPS {
            return Err(ScrapeError::Config(format!(
                "rate {} is below the minimum of {MIN_RATE_RPS} (use 0 to disable limiting)",
                self.rate_rps
            )));
        }
        if self.window_hours <= 0 {
            return Err(ScrapeError::Config("window span must be positive".to_string()));
        }

        Ok(ScrapeConfig {
            data_dir,
            auth_state_path: self.auth_state_path,
            credentials: self.credentials,
            site: self.site,
            headless: self.headless,
            default_hashtags: self.default_hashtags,
            default_limit: self.default_limit,
            min_limit: self.min_limit,
            max_limit: self.max_limit,
            language: self.language,
            batch_size: self.batch_size,
            extraction_permits: self.extraction_permits,
            stagnation_threshold: self.stagnation_threshold.max(1),
            scroll_step: self.scroll_step,
            settle_delay_ms: self.settle_delay_ms,
            navigation_timeout_secs: self.navigation_timeout_secs,
            content_wait_timeout_secs: self.content_wait_timeout_secs,
            extraction_timeout_secs: self.extraction_timeout_secs,
            probe_timeout_secs: self.probe_timeout_secs,
            identity_step_timeout_secs: self.identity_step_timeout_secs,
            reconfirm_step_timeout_secs: self.reconfirm_step_timeout_secs,
            landmark_timeout_secs: self.landmark_timeout_secs,
            rate_rps: self.rate_rps,
            rate_capacity: self.rate_capacity.max(1),
            window_hours: self.window_hours,
            window_lookahead_minutes: self.window_lookahead_minutes,
            job_retention_secs: self.job_retention_secs,
            compress_output: self.compress_output,
        })
    }
}
