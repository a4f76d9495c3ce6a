pub mod browsing;
pub mod config;
pub mod jobs;
pub mod normalize;
pub mod scrape_engine;
pub mod session;
pub mod storage;
pub mod utils;
pub mod window;

pub use browsing::{
    AuthState, BrowserBackend, BrowsingContext, BrowsingSurface, ChromiumBackend, SiteProfile,
};
pub use config::{Credentials, ScrapeConfig};
pub use jobs::{Job, JobOrchestrator, JobStatus, JobSummary};
pub use normalize::{Entities, Normalizer, TextNormalizer};
pub use scrape_engine::{
    CardRecord, Deduplicator, Item, RateLimiter, RunOutcome, ScrapeEngine, ScrapeError,
    ScrapeRunner, Termination, TimeWindow,
};
pub use session::{AuthStateStore, SessionManager, SessionState};
pub use storage::{ItemSink, JsonlStore};
pub use window::{FixedWindow, RollingWindow, WindowClock};

/// Collect `hashtags` over the configured rolling window with a Chromium backend
pub async fn scrape(
    config: ScrapeConfig,
    hashtags: &[String],
    limit: usize,
) -> Result<RunOutcome, ScrapeError> {
    let window = config.rolling_window().current();
    let backend = ChromiumBackend::new(
        config.headless(),
        config.data_dir().join("profiles"),
        config.site_profile().clone(),
    );
    let engine = ScrapeEngine::new(backend, std::sync::Arc::new(config));
    engine.run(hashtags, window, limit).await
}
