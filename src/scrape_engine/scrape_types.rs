//! Core types for hashtag scraping.
//!
//! This module contains the error taxonomy, the normalized `Item`, the raw
//! `CardRecord` produced by the extraction capability, and the per-target and
//! per-run result types the engine aggregates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Error type for every scrape-side operation
///
/// Variants follow the failure taxonomy of a run: configuration and
/// authentication failures abort the run, everything else is scoped to a
/// single target or a single item.
#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    /// Missing credentials or an unusable setting
    #[error("Configuration error: {0}")]
    Config(String),

    /// The platform asked for a challenge we cannot answer (second factor, code)
    #[error("Unsupported authentication challenge: {0}")]
    AuthChallengeUnsupported(String),

    /// A login step did not complete in time
    #[error("Authentication timed out while waiting for {step}")]
    AuthTimeout { step: String },

    /// The session was bounced to the login flow mid-run
    #[error("Session expired")]
    SessionExpired,

    /// Navigation or waiting for renderable content took too long
    #[error("{what} timeout after {secs} seconds")]
    NavigationTimeout { what: String, secs: u64 },

    /// An extraction step took too long
    #[error("Extraction timeout after {secs} seconds")]
    ExtractionTimeout { secs: u64 },

    /// A collaborator returned something unusable (malformed card, bad record)
    #[error("Collaborator error: {0}")]
    Collaborator(String),

    /// Browser or automation failure
    #[error("Browser error: {0}")]
    Browser(String),

    /// Inbound request rejected before a job was created
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ScrapeError {
    /// Run-level failures: the whole job errors out
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Config(_) | Self::AuthChallengeUnsupported(_) | Self::AuthTimeout { .. }
        )
    }

    /// Failures that only degrade one target's yield
    #[must_use]
    pub const fn is_target_local(&self) -> bool {
        matches!(
            self,
            Self::SessionExpired
                | Self::NavigationTimeout { .. }
                | Self::ExtractionTimeout { .. }
                | Self::Collaborator(_)
                | Self::Browser(_)
        )
    }

    /// Whether this error is one of the step timeouts
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::NavigationTimeout { .. } | Self::ExtractionTimeout { .. }
        )
    }
}

impl From<anyhow::Error> for ScrapeError {
    fn from(err: anyhow::Error) -> Self {
        // {:#} keeps the context chain
        Self::Browser(format!("{err:#}"))
    }
}

/// Structured record returned by the extraction capability for one card
///
/// Kept independent of the automation technology: a backend fills these
/// fields however it reads the card.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardRecord {
    pub content: String,
    pub permalink: Option<String>,
    /// Href of the first profile link on the card
    pub author: Option<String>,
    /// Post time when the card exposes one
    pub posted_at: Option<DateTime<Utc>>,
}

/// A normalized, collected post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub author: String,
    pub timestamp: DateTime<Utc>,
    pub content: String,
    #[serde(default)]
    pub mentions: Vec<String>,
    #[serde(default)]
    pub hashtags: Vec<String>,
}

/// Closed time window a run collects within
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub since: DateTime<Utc>,
    pub until: DateTime<Utc>,
}

impl TimeWindow {
    #[must_use]
    pub const fn new(since: DateTime<Utc>, until: DateTime<Utc>) -> Self {
        Self { since, until }
    }

    /// Inclusive on both ends
    #[must_use]
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.since <= at && at <= self.until
    }
}

/// How a collector stopped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Termination {
    /// Reached the per-target limit
    Success,
    /// Stopped making progress before reaching the limit
    Exhausted,
    /// A navigation/content/extraction step timed out; results are partial
    Timeout { reason: String },
    /// The surface failed mid-loop; results are partial
    Failed { reason: String },
}

impl Termination {
    /// Reason the target stopped early, if it did
    #[must_use]
    pub fn failure_reason(&self) -> Option<&str> {
        match self {
            Self::Failed { reason } => Some(reason),
            _ => None,
        }
    }
}

/// Items yielded by one target
#[derive(Debug, Clone)]
pub struct TargetYield {
    pub hashtag: String,
    pub items: Vec<Item>,
    pub termination: Termination,
    pub iterations: u32,
}

/// A target that produced nothing usable
#[derive(Debug)]
pub struct TargetFailure {
    pub hashtag: String,
    pub reason: ScrapeError,
}

/// Per-target result collected into the batch result list
pub type TargetOutcome = Result<TargetYield, TargetFailure>;

/// Observability summary for one target, stored on the job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSummary {
    pub hashtag: String,
    pub collected: usize,
    pub termination: Option<Termination>,
    pub error: Option<String>,
}

impl From<&TargetOutcome> for TargetSummary {
    fn from(outcome: &TargetOutcome) -> Self {
        match outcome {
            Ok(target) => Self {
                hashtag: target.hashtag.clone(),
                collected: target.items.len(),
                termination: Some(target.termination.clone()),
                error: target.termination.failure_reason().map(str::to_string),
            },
            Err(failure) => Self {
                hashtag: failure.hashtag.clone(),
                collected: 0,
                termination: None,
                error: Some(failure.reason.to_string()),
            },
        }
    }
}

/// Counts of items dropped at each deduplication stage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DedupStats {
    pub by_id: usize,
    pub by_fingerprint: usize,
}

/// Result of one engine run
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Deduplicated items, truncated to the requested limit
    pub items: Vec<Item>,
    /// Items collected across all targets before deduplication, capped at the limit
    pub raw_count: usize,
    /// Every target's items in merge order, before deduplication
    pub raw_items: Vec<Item>,
    pub dedup: DedupStats,
    pub targets: Vec<TargetSummary>,
}

impl RunOutcome {
    #[must_use]
    pub fn unique_count(&self) -> usize {
        self.items.len()
    }
}
