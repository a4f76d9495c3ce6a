//! Builder methods available for all states
//!
//! This module contains methods that can be called on the builder
//! regardless of its current type state.

use std::path::PathBuf;

use super::builder::ScrapeConfigBuilder;
use super::types::Credentials;
use crate::browsing::SiteProfile;
use crate::utils::normalize_hashtags;

impl<State> ScrapeConfigBuilder<State> {
    /// Override where the authentication state is persisted
    ///
    /// Defaults to `<data_dir>/auth_state.json`.
    #[must_use]
    pub fn auth_state_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.auth_state_path = Some(path.into());
        self
    }

    /// Credentials used when no valid persisted session exists
    #[must_use]
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    #[must_use]
    pub fn site_profile(mut self, site: SiteProfile) -> Self {
        self.site = site;
        self
    }

    /// Set browser headless mode
    ///
    /// Headed mode is useful for watching a login or debugging selectors; runs
    /// in containers need the default.
    #[must_use]
    pub fn headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Hashtags used when a request names none; normalized on the way in
    #[must_use]
    pub fn default_hashtags<I, S>(mut self, hashtags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.default_hashtags = normalize_hashtags(hashtags);
        self
    }

    #[must_use]
    pub fn default_limit(mut self, limit: usize) -> Self {
        self.default_limit = limit;
        self
    }

    /// Inclusive bounds accepted for a request's limit
    #[must_use]
    pub fn limit_range(mut self, min: usize, max: usize) -> Self {
        self.min_limit = min;
        self.max_limit = max;
        self
    }

    /// Language constraint appended to each search; empty disables it
    #[must_use]
    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Number of targets scraped concurrently
    #[must_use]
    pub fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    /// Concurrent card extractions within one target
    #[must_use]
    pub fn extraction_permits(mut self, permits: usize) -> Self {
        self.extraction_permits = permits;
        self
    }

    /// Consecutive no-progress iterations before a target is exhausted
    #[must_use]
    pub fn stagnation_threshold(mut self, iterations: u32) -> Self {
        self.stagnation_threshold = iterations;
        self
    }

    #[must_use]
    pub fn scroll_step(mut self, pixels: i64) -> Self {
        self.scroll_step = pixels;
        self
    }

    #[must_use]
    pub fn settle_delay_ms(mut self, ms: u64) -> Self {
        self.settle_delay_ms = ms;
        self
    }

    #[must_use]
    pub fn navigation_timeout_secs(mut self, secs: u64) -> Self {
        self.navigation_timeout_secs = secs;
        self
    }

    #[must_use]
    pub fn content_wait_timeout_secs(mut self, secs: u64) -> Self {
        self.content_wait_timeout_secs = secs;
        self
    }

    #[must_use]
    pub fn extraction_timeout_secs(mut self, secs: u64) -> Self {
        self.extraction_timeout_secs = secs;
        self
    }

    /// Bound on the persisted-session validity probe
    #[must_use]
    pub fn probe_timeout_secs(mut self, secs: u64) -> Self {
        self.probe_timeout_secs = secs;
        self
    }

    /// Login step bounds: password prompt, prompt after re-confirmation, landmark
    #[must_use]
    pub fn login_step_timeouts_secs(mut self, identity: u64, reconfirm: u64, landmark: u64) -> Self {
        self.identity_step_timeout_secs = identity;
        self.reconfirm_step_timeout_secs = reconfirm;
        self.landmark_timeout_secs = landmark;
        self
    }

    /// Token bucket refill rate and burst size; a rate of 0 disables throttling
    #[must_use]
    pub fn rate(mut self, rps: f64, capacity: u32) -> Self {
        self.rate_rps = rps;
        self.rate_capacity = capacity;
        self
    }

    /// Rolling window span and the lookahead added to its upper bound
    #[must_use]
    pub fn window(mut self, hours: i64, lookahead_minutes: i64) -> Self {
        self.window_hours = hours;
        self.window_lookahead_minutes = lookahead_minutes;
        self
    }

    #[must_use]
    pub fn job_retention_secs(mut self, secs: u64) -> Self {
        self.job_retention_secs = secs;
        self
    }

    /// Gzip the per-job output files
    #[must_use]
    pub fn compress_output(mut self, compress: bool) -> Self {
        self.compress_output = compress;
        self
    }
}
