//! Getter methods for `ScrapeConfig`
//!
//! Plain accessors plus the derived settings handed to the engine, the
//! session manager and the job orchestrator.

use chrono::Duration as ChronoDuration;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::types::{Credentials, ScrapeConfig};
use crate::browsing::SiteProfile;
use crate::scrape_engine::{CollectorSettings, RateLimiter};
use crate::session::SessionTimeouts;
use crate::window::RollingWindow;

/// File name of the auth-state slot inside the data directory
pub const AUTH_STATE_FILE: &str = "auth_state.json";

impl ScrapeConfig {
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    #[must_use]
    pub fn auth_state_path(&self) -> PathBuf {
        self.auth_state_path
            .clone()
            .unwrap_or_else(|| self.data_dir.join(AUTH_STATE_FILE))
    }

    #[must_use]
    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    #[must_use]
    pub fn site_profile(&self) -> &SiteProfile {
        &self.site
    }

    #[must_use]
    pub fn headless(&self) -> bool {
        self.headless
    }

    #[must_use]
    pub fn default_hashtags(&self) -> &[String] {
        &self.default_hashtags
    }

    #[must_use]
    pub fn default_limit(&self) -> usize {
        self.default_limit
    }

    #[must_use]
    pub fn min_limit(&self) -> usize {
        self.min_limit
    }

    #[must_use]
    pub fn max_limit(&self) -> usize {
        self.max_limit
    }

    #[must_use]
    pub fn language(&self) -> &str {
        &self.language
    }

    #[must_use]
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    #[must_use]
    pub fn rate_rps(&self) -> f64 {
        self.rate_rps
    }

    #[must_use]
    pub fn rate_capacity(&self) -> u32 {
        self.rate_capacity
    }

    #[must_use]
    pub fn job_retention(&self) -> Duration {
        Duration::from_secs(self.job_retention_secs)
    }

    #[must_use]
    pub fn compress_output(&self) -> bool {
        self.compress_output
    }

    /// Fresh token bucket for one run
    #[must_use]
    pub fn rate_limiter(&self) -> RateLimiter {
        RateLimiter::new(self.rate_rps, self.rate_capacity)
    }

    /// Collector knobs for a run with the given per-target limit
    #[must_use]
    pub fn collector_settings(&self, per_target_limit: usize) -> CollectorSettings {
        CollectorSettings {
            per_target_limit,
            language: self.language.clone(),
            extraction_permits: self.extraction_permits,
            stagnation_threshold: self.stagnation_threshold,
            scroll_step: self.scroll_step,
            settle_delay: Duration::from_millis(self.settle_delay_ms),
            navigation_timeout: Duration::from_secs(self.navigation_timeout_secs),
            content_wait_timeout: Duration::from_secs(self.content_wait_timeout_secs),
            extraction_timeout: Duration::from_secs(self.extraction_timeout_secs),
        }
    }

    #[must_use]
    pub fn session_timeouts(&self) -> SessionTimeouts {
        SessionTimeouts {
            navigation: Duration::from_secs(self.navigation_timeout_secs),
            probe: Duration::from_secs(self.probe_timeout_secs),
            identity_step: Duration::from_secs(self.identity_step_timeout_secs),
            reconfirm_step: Duration::from_secs(self.reconfirm_step_timeout_secs),
            landmark: Duration::from_secs(self.landmark_timeout_secs),
        }
    }

    /// Rolling window ending `lookahead` after now
    #[must_use]
    pub fn rolling_window(&self) -> RollingWindow {
        RollingWindow::new(
            ChronoDuration::hours(self.window_hours),
            ChronoDuration::minutes(self.window_lookahead_minutes),
        )
    }
}
