//! Authenticated browsing context for one engine run
//!
//! States cycle `NoState -> Authenticating -> Authenticated -> Expired ->
//! Authenticating`. The slot sits behind one async mutex, so concurrent
//! `acquire()` calls queue behind the first and share its context, and a
//! mid-run renewal happens at most once no matter how many collectors notice
//! the expiry together.

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::auth_store::AuthStateStore;
use super::login::{LoginFlow, SessionTimeouts};
use crate::browsing::{BrowserBackend, BrowsingContext, BrowsingSurface, SiteProfile};
use crate::config::Credentials;
use crate::scrape_engine::ScrapeError;
use crate::utils::is_login_redirect;

/// Re-logins allowed per run after the first acquisition
pub const MAX_RELOGINS_PER_RUN: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    NoState,
    Authenticating,
    Authenticated,
    Expired,
}

/// Handle on the current context
///
/// `generation` identifies which login produced the context; pass it back to
/// `renew` so a stale handle never triggers a second renewal.
pub struct ActiveSession<C> {
    pub context: Arc<C>,
    pub generation: u64,
}

impl<C> Clone for ActiveSession<C> {
    fn clone(&self) -> Self {
        Self {
            context: Arc::clone(&self.context),
            generation: self.generation,
        }
    }
}

struct SessionSlot<C> {
    state: SessionState,
    context: Option<Arc<C>>,
    /// Contexts replaced by a renewal; closed at shutdown once collectors drop them
    retired: Vec<Arc<C>>,
    relogins: u32,
    generation: u64,
}

impl<C> SessionSlot<C> {
    fn active(&self) -> Option<ActiveSession<C>> {
        match (self.state, &self.context) {
            (SessionState::Authenticated, Some(context)) => Some(ActiveSession {
                context: Arc::clone(context),
                generation: self.generation,
            }),
            _ => None,
        }
    }

    fn install(&mut self, context: C) -> ActiveSession<C> {
        if let Some(old) = self.context.take() {
            self.retired.push(old);
        }
        let context = Arc::new(context);
        self.generation += 1;
        self.state = SessionState::Authenticated;
        self.context = Some(Arc::clone(&context));
        ActiveSession {
            context,
            generation: self.generation,
        }
    }
}

pub struct SessionManager<B: BrowserBackend> {
    backend: Arc<B>,
    store: AuthStateStore,
    credentials: Option<Credentials>,
    site: Arc<SiteProfile>,
    timeouts: SessionTimeouts,
    slot: Mutex<SessionSlot<B::Context>>,
}

impl<B: BrowserBackend> SessionManager<B> {
    pub fn new(
        backend: Arc<B>,
        store: AuthStateStore,
        credentials: Option<Credentials>,
        site: Arc<SiteProfile>,
        timeouts: SessionTimeouts,
    ) -> Self {
        Self {
            backend,
            store,
            credentials,
            site,
            timeouts,
            slot: Mutex::new(SessionSlot {
                state: SessionState::NoState,
                context: None,
                retired: Vec::new(),
                relogins: 0,
                generation: 0,
            }),
        }
    }

    pub async fn state(&self) -> SessionState {
        self.slot.lock().await.state
    }

    /// Return the run's authenticated context, establishing it on first call
    ///
    /// Restores persisted state when present and probes it; a failed probe
    /// falls back to the login flow. Errors here are run-level.
    pub async fn acquire(&self) -> Result<ActiveSession<B::Context>, ScrapeError> {
        let mut slot = self.slot.lock().await;
        if let Some(active) = slot.active() {
            return Ok(active);
        }

        let previous = slot.state;
        slot.state = SessionState::Authenticating;
        match self.establish().await {
            Ok(context) => Ok(slot.install(context)),
            Err(e) => {
                slot.state = previous;
                Err(e)
            }
        }
    }

    /// Replace an expired context with a fresh login
    ///
    /// If another caller already renewed past `stale_generation`, the newer
    /// context is returned without logging in again.
    pub async fn renew(&self, stale_generation: u64) -> Result<ActiveSession<B::Context>, ScrapeError> {
        let mut slot = self.slot.lock().await;
        if slot.generation != stale_generation
            && let Some(active) = slot.active()
        {
            debug!("Session already renewed to generation {}", slot.generation);
            return Ok(active);
        }
        if slot.relogins >= MAX_RELOGINS_PER_RUN {
            warn!("Session expired again; re-login budget for this run is spent");
            slot.state = SessionState::Expired;
            return Err(ScrapeError::SessionExpired);
        }

        info!("Session expired mid-run, logging in again");
        slot.state = SessionState::Authenticating;
        slot.relogins += 1;
        match self.login().await {
            Ok(context) => Ok(slot.install(context)),
            Err(e) => {
                slot.state = SessionState::Expired;
                Err(e)
            }
        }
    }

    /// Close every context this manager opened
    ///
    /// Contexts still referenced elsewhere are left to their drop.
    pub async fn shutdown(&self) {
        let contexts: Vec<Arc<B::Context>> = {
            let mut slot = self.slot.lock().await;
            slot.state = SessionState::NoState;
            slot.context.take().into_iter().chain(slot.retired.drain(..)).collect()
        };
        for context in contexts {
            match Arc::try_unwrap(context) {
                Ok(context) => context.close().await,
                Err(arc) => warn!(
                    "Browsing context still has {} strong references, cleanup will happen on drop",
                    Arc::strong_count(&arc)
                ),
            }
        }
    }

    async fn establish(&self) -> Result<B::Context, ScrapeError> {
        if let Some(state) = self.store.load()? {
            info!("Restoring persisted session from {}", state.captured_at);
            match self.backend.open(Some(&state)).await {
                Ok(context) => {
                    if self.probe(&context).await {
                        info!("Persisted session is valid");
                        return Ok(context);
                    }
                    info!("Persisted session failed the validity probe, logging in fresh");
                    context.close().await;
                }
                Err(e) => warn!("Could not open context from persisted state: {e}"),
            }
        } else {
            info!("No persisted session, logging in fresh");
        }
        self.login().await
    }

    /// Reach the authenticated-only page and look for the landmark
    async fn probe(&self, context: &B::Context) -> bool {
        let surface = match context.new_surface().await {
            Ok(surface) => surface,
            Err(e) => {
                warn!("Probe could not open a surface: {e}");
                return false;
            }
        };
        let valid = self.probe_surface(&surface).await;
        surface.close().await;
        valid
    }

    async fn probe_surface(&self, surface: &<B::Context as BrowsingContext>::Surface) -> bool {
        if let Err(e) = surface.navigate(&self.site.home_url, self.timeouts.probe).await {
            debug!("Probe navigation failed: {e}");
            return false;
        }
        let location = surface.current_location().await;
        if is_login_redirect(&location, &self.site.login_redirect_markers) {
            debug!("Probe redirected to {location}");
            return false;
        }
        surface
            .wait_for_landmark(&self.site.landmark_selector, self.timeouts.probe)
            .await
            .is_ok()
    }

    /// Fresh context plus the login state machine; persists state on success
    async fn login(&self) -> Result<B::Context, ScrapeError> {
        let credentials = self.credentials.as_ref().ok_or_else(|| {
            ScrapeError::Config(
                "login required but no credentials are configured (TAGSCRAPE_USERNAME / TAGSCRAPE_PASSWORD)"
                    .to_string(),
            )
        })?;

        let context = self.backend.open(None).await?;
        let attempt = async {
            let surface = context.new_surface().await?;
            let outcome = LoginFlow::new(&surface, &self.site, credentials, self.timeouts)
                .run()
                .await;
            surface.close().await;
            outcome?.into_result()?;
            let state = context.capture_state().await?;
            match self.store.save(&state) {
                Ok(()) => info!("Session state saved to {}", self.store.path().display()),
                Err(e) => warn!(
                    "Could not persist session state to {}: {e}",
                    self.store.path().display()
                ),
            }
            Ok::<_, ScrapeError>(())
        }
        .await;

        match attempt {
            Ok(()) => Ok(context),
            Err(e) => {
                context.close().await;
                Err(e)
            }
        }
    }
}
