//! Per-target pagination loop
//!
//! One `Collector` drives one surface for one hashtag:
//! `Loading -> Extracting -> ScrollCheck -> {Loading | Terminated}`.
//! It owns the target's local seen-id set, the last page-extent signature and
//! the stagnation counter, all of which die with it.

use chrono::Utc;
use futures::future::join_all;
use log::{debug, info, warn};
use std::collections::HashSet;
use std::time::Duration;
use tokio::sync::Semaphore;

use super::page_timeout::{StepKind, with_step_timeout};
use super::rate_limiter::RateLimiter;
use super::scrape_types::{CardRecord, Item, ScrapeError, Termination, TargetYield, TimeWindow};
use crate::browsing::{BrowsingSurface, SiteProfile};
use crate::normalize::Normalizer;
use crate::utils::{
    author_from_href, is_login_redirect, safe_truncate_chars, search_url, status_id_from_permalink,
};

/// Knobs for one target's pagination loop
#[derive(Debug, Clone)]
pub struct CollectorSettings {
    pub per_target_limit: usize,
    pub language: String,
    pub extraction_permits: usize,
    pub stagnation_threshold: u32,
    pub scroll_step: i64,
    pub settle_delay: Duration,
    pub navigation_timeout: Duration,
    pub content_wait_timeout: Duration,
    pub extraction_timeout: Duration,
}

/// Borrowed collaborators a collector needs
pub struct CollectorDeps<'a, S: BrowsingSurface> {
    pub surface: &'a S,
    pub site: &'a SiteProfile,
    pub limiter: &'a RateLimiter,
    pub normalizer: &'a dyn Normalizer,
    pub settings: &'a CollectorSettings,
}

/// How one extraction pass went
#[derive(Debug, Default, Clone, Copy)]
struct ExtractionPass {
    cards: usize,
    fresh: usize,
    outside_window: usize,
    skipped: usize,
}

pub struct Collector<'a, S: BrowsingSurface> {
    deps: CollectorDeps<'a, S>,
    hashtag: String,
    window: TimeWindow,
    seen: HashSet<String>,
    items: Vec<Item>,
    last_extent: Option<u64>,
    stagnation: u32,
    iterations: u32,
    loaded: bool,
}

impl<'a, S: BrowsingSurface> Collector<'a, S> {
    #[must_use]
    pub fn new(deps: CollectorDeps<'a, S>, hashtag: &str, window: TimeWindow) -> Self {
        Self {
            deps,
            hashtag: hashtag.trim().trim_start_matches('#').to_string(),
            window,
            seen: HashSet::new(),
            items: Vec::new(),
            last_extent: None,
            stagnation: 0,
            iterations: 0,
            loaded: false,
        }
    }

    /// Run the loop to termination
    ///
    /// Step timeouts and surface failures end the target early and keep
    /// whatever was collected. Only session expiry and run-level failures
    /// are returned as errors.
    pub async fn run(mut self) -> Result<TargetYield, ScrapeError> {
        let settings = self.deps.settings;
        let url = search_url(self.deps.site, &self.hashtag, &settings.language)?;

        loop {
            self.iterations += 1;

            if let Err(e) = self.load(&url).await {
                return self.stop_early(e);
            }

            let extraction = with_step_timeout(
                self.extract_visible(),
                settings.extraction_timeout,
                StepKind::Extraction,
                "extraction",
            )
            .await;
            let pass = match extraction {
                Ok(pass) => pass,
                Err(e) => return self.stop_early(e),
            };
            debug!(
                "#{} iteration {}: {} cards, {} new, {} outside window, {} skipped",
                self.hashtag,
                self.iterations,
                pass.cards,
                pass.fresh,
                pass.outside_window,
                pass.skipped
            );

            if self.items.len() >= settings.per_target_limit {
                return Ok(self.finish(Termination::Success));
            }

            if let Err(e) = self.deps.surface.scroll(settings.scroll_step).await {
                return self.stop_early(e);
            }
            tokio::time::sleep(settings.settle_delay).await;
            let extent = match self.deps.surface.page_extent().await {
                Ok(extent) => extent,
                Err(e) => return self.stop_early(e),
            };

            if self.no_progress(extent, pass.fresh) {
                self.stagnation += 1;
                debug!(
                    "#{}: no new items ({}/{})",
                    self.hashtag, self.stagnation, settings.stagnation_threshold
                );
                if self.stagnation >= settings.stagnation_threshold {
                    return Ok(self.finish(Termination::Exhausted));
                }
            } else {
                self.stagnation = 0;
            }
            self.last_extent = Some(extent);
        }
    }

    /// An iteration made progress only if it produced new items
    ///
    /// Extent growth alone is not progress: feeds keep growing with cards we
    /// have already seen or that fall outside the window.
    fn no_progress(&self, extent: u64, fresh: usize) -> bool {
        if fresh > 0 {
            return false;
        }
        if self.last_extent == Some(extent) {
            debug!("#{}: page extent unchanged at {extent}", self.hashtag);
        }
        true
    }

    /// Navigate on the first pass, then wait for renderable cards
    async fn load(&mut self, url: &str) -> Result<(), ScrapeError> {
        let deps = &self.deps;
        deps.limiter.take(1).await;

        if !self.loaded {
            info!("Navigating to {url}");
            with_step_timeout(
                deps.surface.navigate(url, deps.settings.navigation_timeout),
                deps.settings.navigation_timeout,
                StepKind::Navigation,
                "navigation",
            )
            .await?;

            let location = deps.surface.current_location().await;
            if is_login_redirect(&location, &deps.site.login_redirect_markers) {
                warn!("#{}: redirected to login at {location}", self.hashtag);
                return Err(ScrapeError::SessionExpired);
            }
            self.loaded = true;
        }

        with_step_timeout(
            deps.surface
                .wait_for_landmark(&deps.site.card_selector, deps.settings.content_wait_timeout),
            deps.settings.content_wait_timeout,
            StepKind::ContentWait,
            "content wait",
        )
        .await
    }

    async fn extract_visible(&mut self) -> Result<ExtractionPass, ScrapeError> {
        let deps = &self.deps;
        deps.limiter.take(1).await;

        let cards = deps.surface.find_cards(&deps.site.card_selector).await?;
        let permits = Semaphore::new(deps.settings.extraction_permits.max(1));
        let (permits, surface) = (&permits, deps.surface);
        let records = join_all(cards.iter().map(|card| async move {
            let _permit = permits
                .acquire()
                .await
                .map_err(|e| ScrapeError::Collaborator(e.to_string()))?;
            surface.extract(card).await
        }))
        .await;

        let mut pass = ExtractionPass {
            cards: cards.len(),
            ..ExtractionPass::default()
        };
        for record in records {
            let record = match record {
                Ok(record) => record,
                Err(e) => {
                    debug!("#{}: skipping card: {e}", self.hashtag);
                    pass.skipped += 1;
                    continue;
                }
            };
            let Some(item) = self.to_item(record) else {
                pass.skipped += 1;
                continue;
            };
            if !self.seen.insert(item.id.clone()) {
                continue;
            }
            if !self.window.contains(item.timestamp) {
                pass.outside_window += 1;
                continue;
            }
            self.items.push(item);
            pass.fresh += 1;
        }
        Ok(pass)
    }

    /// Empty content or an unresolvable id drops the card
    fn to_item(&self, record: CardRecord) -> Option<Item> {
        let normalizer = self.deps.normalizer;
        let content = normalizer.clean(&record.content);
        if content.is_empty() {
            return None;
        }
        let Some(id) = record.permalink.as_deref().and_then(status_id_from_permalink) else {
            debug!(
                "#{}: card without a status id: {:?}",
                self.hashtag,
                safe_truncate_chars(&content, 60)
            );
            return None;
        };
        let author = record
            .author
            .as_deref()
            .map(author_from_href)
            .unwrap_or_default();

        let mut entities = normalizer.extract_entities(&record.content);
        let target = self.hashtag.to_lowercase();
        if !entities.hashtags.contains(&target) {
            entities.hashtags.push(target);
        }

        Some(Item {
            id,
            author,
            timestamp: record.posted_at.unwrap_or_else(Utc::now),
            content,
            mentions: entities.mentions,
            hashtags: entities.hashtags,
        })
    }

    fn stop_early(self, err: ScrapeError) -> Result<TargetYield, ScrapeError> {
        if err.is_fatal() || matches!(err, ScrapeError::SessionExpired) {
            return Err(err);
        }
        warn!(
            "#{}: {err}; keeping {} partial item(s)",
            self.hashtag,
            self.items.len()
        );
        let reason = err.to_string();
        let termination = if err.is_timeout() {
            Termination::Timeout { reason }
        } else {
            Termination::Failed { reason }
        };
        Ok(self.finish(termination))
    }

    fn finish(mut self, termination: Termination) -> TargetYield {
        self.items.truncate(self.deps.settings.per_target_limit);
        info!(
            "#{} terminated {:?} with {} item(s) after {} iteration(s)",
            self.hashtag,
            termination,
            self.items.len(),
            self.iterations
        );
        TargetYield {
            hashtag: self.hashtag,
            items: self.items,
            termination,
            iterations: self.iterations,
        }
    }
}
