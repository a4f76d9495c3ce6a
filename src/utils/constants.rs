//! Shared configuration constants for tagscrape
//!
//! Default values used by the config builder, the scrape engine and the
//! session manager, kept in one place to avoid magic numbers.

/// Default outbound interaction rate: 2 tokens per second
///
/// Every navigation and extraction step takes one token. The platform starts
/// throttling search pages well before this rate is sustained across targets.
pub const DEFAULT_RATE_RPS: f64 = 2.0;

/// Slowest positive rate the config accepts (one token every ~17 minutes)
pub const MIN_RATE_RPS: f64 = 0.001;

/// Burst capacity of the shared token bucket
pub const DEFAULT_RATE_CAPACITY: u32 = 4;

/// Targets scraped concurrently per batch (one browsing surface each)
pub const DEFAULT_BATCH_SIZE: usize = 3;

/// Concurrent card extractions allowed within one target
pub const DEFAULT_EXTRACTION_PERMITS: usize = 20;

/// Consecutive no-progress scroll iterations before a target is exhausted
pub const DEFAULT_STAGNATION_THRESHOLD: u32 = 3;

/// Pixels scrolled per pagination step
pub const DEFAULT_SCROLL_STEP: i64 = 1200;

/// Settle delay after each scroll, in milliseconds
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 2500;

/// Timeout for `navigate()` calls, in seconds
pub const DEFAULT_NAVIGATION_TIMEOUT_SECS: u64 = 60;

/// Timeout for waiting on renderable cards, in seconds
pub const DEFAULT_CONTENT_WAIT_TIMEOUT_SECS: u64 = 15;

/// Timeout for one extraction step over all visible cards, in seconds
pub const DEFAULT_EXTRACTION_TIMEOUT_SECS: u64 = 30;

/// Timeout for the persisted-session validity probe, in seconds
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 15;

/// Login step timeouts, in seconds
pub const DEFAULT_IDENTITY_STEP_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_RECONFIRM_STEP_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_LANDMARK_TIMEOUT_SECS: u64 = 20;

/// Inclusive bounds for a requested item limit
pub const MIN_LIMIT: usize = 100;
pub const MAX_LIMIT: usize = 20_000;

/// Limit used when a caller does not ask for one
pub const DEFAULT_LIMIT: usize = 2000;

/// Hashtags scraped when a caller does not name any
pub const DEFAULT_HASHTAGS: &[&str] = &["#nifty50", "#sensex", "#intraday", "#banknifty"];

/// Rolling window length in hours
pub const DEFAULT_WINDOW_HOURS: i64 = 24;

/// Added to "now" when closing the window, absorbs clock skew with the platform
pub const DEFAULT_WINDOW_LOOKAHEAD_MINUTES: i64 = 10;

/// Search language constraint
pub const DEFAULT_LANGUAGE: &str = "en";

/// Terminal jobs older than this are evicted by the cleanup task
pub const DEFAULT_JOB_RETENTION_SECS: u64 = 30 * 60;

/// Chrome user agent string for stealth mode
///
/// Updated: 2025-01-29 to Chrome 132 (current stable)
/// Next update: 2025-04-29 (quarterly schedule)
pub const CHROME_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.6834.160 Safari/537.36";
