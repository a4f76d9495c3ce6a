//! Browsing-session capability consumed by the session manager and collectors
//!
//! Three layers mirror how a real browser is driven:
//! - `BrowserBackend` opens a context, optionally seeded with persisted auth state
//! - `BrowsingContext` is the shared, authenticated session; it hands out surfaces
//! - `BrowsingSurface` is one page: navigate, wait, type, read cards, scroll
//!
//! Nothing here names a concrete automation technology. `ChromiumBackend`
//! implements it with chromiumoxide; tests implement it in memory.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

use crate::scrape_engine::{CardRecord, ScrapeError};

/// Poll interval used by the default landmark wait
pub const LANDMARK_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Opaque authentication artifact
///
/// The backend decides what `payload` holds (cookies for Chromium); everyone
/// else only stores and hands it back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthState {
    pub payload: serde_json::Value,
    pub captured_at: DateTime<Utc>,
}

impl AuthState {
    #[must_use]
    pub fn new(payload: serde_json::Value) -> Self {
        Self {
            payload,
            captured_at: Utc::now(),
        }
    }
}

/// Opens browsing contexts
pub trait BrowserBackend: Send + Sync + 'static {
    type Context: BrowsingContext;

    /// Open a context, restoring `state` into it when given
    fn open(
        &self,
        state: Option<&AuthState>,
    ) -> impl Future<Output = Result<Self::Context, ScrapeError>> + Send;
}

/// One browsing session shared by every surface opened from it
pub trait BrowsingContext: Send + Sync + 'static {
    type Surface: BrowsingSurface;

    /// Allocate a fresh surface (page) in this context
    fn new_surface(&self) -> impl Future<Output = Result<Self::Surface, ScrapeError>> + Send;

    /// Snapshot the context's authentication state for persistence
    fn capture_state(&self) -> impl Future<Output = Result<AuthState, ScrapeError>> + Send;

    /// Tear the context down
    fn close(self) -> impl Future<Output = ()> + Send;
}

/// A single page within a context
pub trait BrowsingSurface: Send + Sync + 'static {
    /// Handle to one candidate card on the page
    type Card: Send + Sync + 'static;

    /// Navigate and wait for the load to settle
    fn navigate(
        &self,
        url: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<(), ScrapeError>> + Send;

    /// Whether `selector` currently matches anything
    fn has_element(&self, selector: &str) -> impl Future<Output = bool> + Send;

    /// Wait until `selector` matches, or fail with a navigation timeout
    fn wait_for_landmark(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<(), ScrapeError>> + Send {
        async move {
            let deadline = tokio::time::Instant::now() + timeout;
            loop {
                if self.has_element(selector).await {
                    return Ok(());
                }
                if tokio::time::Instant::now() >= deadline {
                    return Err(ScrapeError::NavigationTimeout {
                        what: format!("landmark '{selector}'"),
                        secs: timeout.as_secs(),
                    });
                }
                tokio::time::sleep(LANDMARK_POLL_INTERVAL).await;
            }
        }
    }

    /// Type `text` into the first element matching `selector`, pressing Enter when `submit`
    fn type_into(
        &self,
        selector: &str,
        text: &str,
        submit: bool,
    ) -> impl Future<Output = Result<(), ScrapeError>> + Send;

    /// Currently rendered candidate cards, in page order
    fn find_cards(
        &self,
        selector: &str,
    ) -> impl Future<Output = Result<Vec<Self::Card>, ScrapeError>> + Send;

    /// Read the structured record out of one card
    fn extract(
        &self,
        card: &Self::Card,
    ) -> impl Future<Output = Result<CardRecord, ScrapeError>> + Send;

    /// Scroll the page by `delta` pixels
    fn scroll(&self, delta: i64) -> impl Future<Output = Result<(), ScrapeError>> + Send;

    /// Page-state signature used for stagnation detection (content extent)
    fn page_extent(&self) -> impl Future<Output = Result<u64, ScrapeError>> + Send;

    /// Where the surface currently is; `about:blank` when unknown
    fn current_location(&self) -> impl Future<Output = String> + Send;

    /// Release the surface
    fn close(self) -> impl Future<Output = ()> + Send;
}
