//! Scrape Engine Module
//!
//! This module contains the hashtag collection core: the per-target
//! `Collector`, the `ScrapeEngine` that fans collectors out in batches, and
//! the rate limiting and deduplication they share.

// Sub-modules
pub mod collector;
pub mod dedup;
pub mod orchestrator;
pub mod page_timeout;
pub mod rate_limiter;
pub mod scrape_types;

// Re-exports for public API
pub use orchestrator::{ScrapeEngine, ScrapeRunner};

pub use collector::{Collector, CollectorDeps, CollectorSettings};

// Re-export rate limiter types
pub use rate_limiter::{RateLimitDecision, RateLimiter};

// Re-export dedup types
pub use dedup::{Deduplicator, Fingerprint, dedupe_items};

pub use page_timeout::{StepKind, with_step_timeout};

// Re-export scrape types
pub use scrape_types::{
    CardRecord, DedupStats, Item, RunOutcome, ScrapeError, TargetFailure, TargetOutcome,
    TargetSummary, TargetYield, Termination, TimeWindow,
};
