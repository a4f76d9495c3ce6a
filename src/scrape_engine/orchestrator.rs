//! Batch fan-out of collectors over one authenticated session
//!
//! Targets run in fixed-size batches; every target in a batch gets its own
//! surface and task, the batch is joined in submission order, then the next
//! batch starts. Per-target failures become `Err` entries in the outcome list
//! and never stop siblings or later batches.

use log::{debug, info, warn};
use std::future::Future;
use std::sync::Arc;

use super::collector::{Collector, CollectorDeps, CollectorSettings};
use super::dedup::Deduplicator;
use super::rate_limiter::RateLimiter;
use super::scrape_types::{
    Item, RunOutcome, ScrapeError, TargetFailure, TargetOutcome, TargetSummary, TargetYield, TimeWindow,
};
use crate::browsing::{BrowserBackend, BrowsingContext, BrowsingSurface, SiteProfile};
use crate::config::ScrapeConfig;
use crate::normalize::{Normalizer, TextNormalizer};
use crate::session::{ActiveSession, AuthStateStore, SessionManager};

/// Something that can turn (hashtags, window, limit) into a run outcome
///
/// The job orchestrator depends on this rather than on a concrete engine.
pub trait ScrapeRunner: Send + Sync + 'static {
    fn scrape(
        &self,
        hashtags: Vec<String>,
        window: TimeWindow,
        total_limit: usize,
    ) -> impl Future<Output = Result<RunOutcome, ScrapeError>> + Send;
}

pub struct ScrapeEngine<B: BrowserBackend> {
    backend: Arc<B>,
    config: Arc<ScrapeConfig>,
    site: Arc<SiteProfile>,
    normalizer: Arc<dyn Normalizer>,
}

impl<B: BrowserBackend> ScrapeEngine<B> {
    pub fn new(backend: B, config: Arc<ScrapeConfig>) -> Self {
        let site = Arc::new(config.site_profile().clone());
        Self {
            backend: Arc::new(backend),
            config,
            site,
            normalizer: Arc::new(TextNormalizer),
        }
    }

    #[must_use]
    pub fn with_normalizer(mut self, normalizer: Arc<dyn Normalizer>) -> Self {
        self.normalizer = normalizer;
        self
    }

    #[must_use]
    pub fn config(&self) -> &ScrapeConfig {
        &self.config
    }

    /// Session manager bound to this engine's backend and persisted auth slot
    pub fn session_manager(&self) -> SessionManager<B> {
        SessionManager::new(
            Arc::clone(&self.backend),
            AuthStateStore::new(self.config.auth_state_path()),
            self.config.credentials().cloned(),
            Arc::clone(&self.site),
            self.config.session_timeouts(),
        )
    }

    /// Collect up to `total_limit` unique items for `hashtags` within `window`
    ///
    /// Only run-level failures (configuration, authentication) are errors.
    pub async fn run(
        &self,
        hashtags: &[String],
        window: TimeWindow,
        total_limit: usize,
    ) -> Result<RunOutcome, ScrapeError> {
        if hashtags.is_empty() || total_limit == 0 {
            return Ok(RunOutcome {
                items: Vec::new(),
                raw_count: 0,
                raw_items: Vec::new(),
                dedup: Default::default(),
                targets: Vec::new(),
            });
        }

        let session = Arc::new(self.session_manager());
        let result = self.run_with_session(&session, hashtags, window, total_limit).await;
        session.shutdown().await;
        result
    }

    async fn run_with_session(
        &self,
        session: &Arc<SessionManager<B>>,
        hashtags: &[String],
        window: TimeWindow,
        total_limit: usize,
    ) -> Result<RunOutcome, ScrapeError> {
        let active = session.acquire().await?;

        let per_target = (total_limit / hashtags.len()).max(1);
        let batch_size = self.config.batch_size().max(1);
        let settings = Arc::new(self.config.collector_settings(per_target));
        let limiter = Arc::new(self.config.rate_limiter());
        info!(
            "Scraping {} hashtag(s) in batches of {batch_size}, {per_target} per target, window {} .. {}",
            hashtags.len(),
            window.since,
            window.until
        );

        let mut outcomes: Vec<TargetOutcome> = Vec::with_capacity(hashtags.len());
        for (batch_index, batch) in hashtags.chunks(batch_size).enumerate() {
            debug!("Starting batch {} ({:?})", batch_index + 1, batch);
            let handles: Vec<_> = batch
                .iter()
                .map(|hashtag| {
                    let task = TargetTask {
                        hashtag: hashtag.clone(),
                        window,
                        session: Arc::clone(session),
                        active: active.clone(),
                        site: Arc::clone(&self.site),
                        limiter: Arc::clone(&limiter),
                        normalizer: Arc::clone(&self.normalizer),
                        settings: Arc::clone(&settings),
                    };
                    (hashtag.clone(), tokio::spawn(task.run()))
                })
                .collect();

            // Join in submission order so merge order is deterministic
            for (hashtag, handle) in handles {
                let outcome = handle.await.unwrap_or_else(|e| {
                    Err(TargetFailure {
                        hashtag,
                        reason: ScrapeError::Collaborator(format!("collector task failed: {e}")),
                    })
                });
                if let Err(failure) = &outcome {
                    warn!("Target #{} failed: {}", failure.hashtag, failure.reason);
                }
                outcomes.push(outcome);
            }

            if let Some(pos) = outcomes
                .iter()
                .position(|o| o.as_ref().is_err_and(|f| f.reason.is_fatal()))
                && let Err(failure) = outcomes.swap_remove(pos)
            {
                return Err(failure.reason);
            }
        }

        Ok(merge_outcomes(outcomes, total_limit))
    }
}

impl<B: BrowserBackend> ScrapeRunner for ScrapeEngine<B> {
    async fn scrape(
        &self,
        hashtags: Vec<String>,
        window: TimeWindow,
        total_limit: usize,
    ) -> Result<RunOutcome, ScrapeError> {
        self.run(&hashtags, window, total_limit).await
    }
}

/// Deduplicate across targets in batch order and cap at `total_limit`
fn merge_outcomes(outcomes: Vec<TargetOutcome>, total_limit: usize) -> RunOutcome {
    let targets: Vec<TargetSummary> = outcomes.iter().map(TargetSummary::from).collect();
    let raw_count = outcomes
        .iter()
        .filter_map(|o| o.as_ref().ok())
        .map(|t| t.items.len())
        .sum::<usize>()
        .min(total_limit);

    let raw_items: Vec<Item> = outcomes
        .iter()
        .filter_map(|o| o.as_ref().ok())
        .flat_map(|t| t.items.iter().cloned())
        .collect();

    let mut dedup = Deduplicator::new();
    let items = dedup.merge(
        outcomes.into_iter().filter_map(Result::ok).map(|t| t.items),
        total_limit,
    );
    let stats = dedup.stats();
    info!(
        "Merged {} unique item(s) from {raw_count} raw ({} duplicate id, {} duplicate fingerprint)",
        dedup.emitted(),
        stats.by_id,
        stats.by_fingerprint
    );

    RunOutcome {
        items,
        raw_count,
        raw_items,
        dedup: stats,
        targets,
    }
}

/// Everything one spawned collector owns
struct TargetTask<B: BrowserBackend> {
    hashtag: String,
    window: TimeWindow,
    session: Arc<SessionManager<B>>,
    active: ActiveSession<B::Context>,
    site: Arc<SiteProfile>,
    limiter: Arc<RateLimiter>,
    normalizer: Arc<dyn Normalizer>,
    settings: Arc<CollectorSettings>,
}

impl<B: BrowserBackend> TargetTask<B> {
    /// Collect once, renewing the session and retrying once on expiry
    async fn run(self) -> TargetOutcome {
        let mut active = self.active.clone();
        let mut renewed = false;
        loop {
            match self.collect(&active.context).await {
                Ok(target) => return Ok(target),
                Err(ScrapeError::SessionExpired) if !renewed => {
                    renewed = true;
                    match self.session.renew(active.generation).await {
                        Ok(fresh) => active = fresh,
                        Err(reason) => return Err(self.failure(reason)),
                    }
                }
                Err(reason) => return Err(self.failure(reason)),
            }
        }
    }

    async fn collect(&self, context: &B::Context) -> Result<TargetYield, ScrapeError> {
        let surface = context.new_surface().await?;
        let deps = CollectorDeps {
            surface: &surface,
            site: &self.site,
            limiter: &self.limiter,
            normalizer: self.normalizer.as_ref(),
            settings: &self.settings,
        };
        let result = Collector::new(deps, &self.hashtag, self.window).run().await;
        surface.close().await;
        result
    }

    fn failure(&self, reason: ScrapeError) -> TargetFailure {
        TargetFailure {
            hashtag: self.hashtag.clone(),
            reason,
        }
    }
}
