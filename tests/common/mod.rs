//! Shared fixtures: an in-memory browser, a memory sink and config helpers
#![allow(dead_code)]

use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use kodegen_tools_tagscrape::browsing::{
    AuthState, BrowserBackend, BrowsingContext, BrowsingSurface, SiteProfile,
};
use kodegen_tools_tagscrape::config::{Credentials, ScrapeConfig};
use kodegen_tools_tagscrape::scrape_engine::{CardRecord, Item, ScrapeError, TimeWindow};
use kodegen_tools_tagscrape::storage::ItemSink;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub const USERNAME: &str = "trader";
pub const PASSWORD: &str = "hunter2";

/// Card content that makes `extract` fail
pub const BROKEN_CARD: &str = "<broken>";

/// How the fake login page reacts after identity is submitted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginScript {
    /// Password prompt right away
    Direct,
    /// Ask for identity once more, then the password prompt
    Reconfirm,
    /// Verification code prompt
    Challenge,
    /// Nothing ever appears
    Stuck,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoginStage {
    Identity,
    Reconfirm,
    Password,
    Challenge,
    Stuck,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Page {
    Blank,
    Login(LoginStage),
    Home,
    Search(String),
}

struct WorldState {
    feeds: HashMap<String, Vec<CardRecord>>,
    page_size: usize,
    script: LoginScript,
    valid_tokens: HashSet<u64>,
    next_token: u64,
    failing: HashSet<String>,
    hanging: HashSet<String>,
    expire_on_visit: HashSet<String>,
    scroll_budget: HashMap<String, usize>,
    extract_delay: Duration,
    open_surfaces: usize,
    peak_surfaces: usize,
    extracting: usize,
    peak_extracting: usize,
    logins: usize,
    opened: usize,
    closed: usize,
    visits: Vec<String>,
}

/// Scripted platform shared by every context the fake backend opens
pub struct FakeWorld {
    pub site: SiteProfile,
    state: Mutex<WorldState>,
}

impl FakeWorld {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            site: SiteProfile::default(),
            state: Mutex::new(WorldState {
                feeds: HashMap::new(),
                page_size: 3,
                script: LoginScript::Direct,
                valid_tokens: HashSet::new(),
                next_token: 1,
                failing: HashSet::new(),
                hanging: HashSet::new(),
                expire_on_visit: HashSet::new(),
                scroll_budget: HashMap::new(),
                extract_delay: Duration::ZERO,
                open_surfaces: 0,
                peak_surfaces: 0,
                extracting: 0,
                peak_extracting: 0,
                logins: 0,
                opened: 0,
                closed: 0,
                visits: Vec::new(),
            }),
        })
    }

    pub fn set_feed(&self, hashtag: &str, cards: Vec<CardRecord>) {
        self.state.lock().feeds.insert(hashtag.to_lowercase(), cards);
    }

    /// Cards revealed per scroll
    pub fn set_page_size(&self, size: usize) {
        self.state.lock().page_size = size;
    }

    pub fn set_login_script(&self, script: LoginScript) {
        self.state.lock().script = script;
    }

    /// `find_cards` fails for this hashtag
    pub fn fail(&self, hashtag: &str) {
        self.state.lock().failing.insert(hashtag.to_lowercase());
    }

    /// Navigation to this hashtag never completes
    pub fn hang(&self, hashtag: &str) {
        self.state.lock().hanging.insert(hashtag.to_lowercase());
    }

    /// The first visit to this hashtag invalidates the current session
    pub fn expire_on_visit(&self, hashtag: &str) {
        self.state.lock().expire_on_visit.insert(hashtag.to_lowercase());
    }

    /// Scrolling this hashtag fails once `scrolls` scrolls have succeeded
    pub fn fail_scroll_after(&self, hashtag: &str, scrolls: usize) {
        self.state.lock().scroll_budget.insert(hashtag.to_lowercase(), scrolls);
    }

    /// Every `extract` call takes this long
    pub fn slow_extract(&self, delay: Duration) {
        self.state.lock().extract_delay = delay;
    }

    /// Most surfaces ever open at the same time
    pub fn peak_surfaces(&self) -> usize {
        self.state.lock().peak_surfaces
    }

    /// Most `extract` calls ever in flight at the same time
    pub fn peak_extracting(&self) -> usize {
        self.state.lock().peak_extracting
    }

    /// Auth state the platform accepts
    pub fn valid_state(&self) -> AuthState {
        let mut state = self.state.lock();
        let token = state.next_token;
        state.next_token += 1;
        state.valid_tokens.insert(token);
        AuthState::new(serde_json::json!({ "token": token }))
    }

    /// Auth state the platform rejects
    pub fn stale_state(&self) -> AuthState {
        AuthState::new(serde_json::json!({ "token": 0 }))
    }

    pub fn logins(&self) -> usize {
        self.state.lock().logins
    }

    pub fn opened(&self) -> usize {
        self.state.lock().opened
    }

    pub fn closed(&self) -> usize {
        self.state.lock().closed
    }

    /// Hashtags in the order their search pages were requested
    pub fn visits(&self) -> Vec<String> {
        self.state.lock().visits.clone()
    }

    fn is_valid(&self, token: Option<u64>) -> bool {
        token.is_some_and(|t| self.state.lock().valid_tokens.contains(&t))
    }
}

#[derive(Clone)]
pub struct FakeBackend {
    pub world: Arc<FakeWorld>,
}

impl FakeBackend {
    pub fn new(world: &Arc<FakeWorld>) -> Self {
        Self {
            world: Arc::clone(world),
        }
    }
}

impl BrowserBackend for FakeBackend {
    type Context = FakeContext;

    async fn open(&self, state: Option<&AuthState>) -> Result<FakeContext, ScrapeError> {
        self.world.state.lock().opened += 1;
        let token = state
            .and_then(|s| s.payload.get("token"))
            .and_then(serde_json::Value::as_u64);
        Ok(FakeContext {
            world: Arc::clone(&self.world),
            token: Arc::new(Mutex::new(token)),
        })
    }
}

pub struct FakeContext {
    world: Arc<FakeWorld>,
    token: Arc<Mutex<Option<u64>>>,
}

impl FakeContext {
    /// A context that is already logged in, for driving a collector directly
    pub fn authenticated(world: &Arc<FakeWorld>) -> Self {
        let token = world.valid_state().payload["token"].as_u64();
        Self {
            world: Arc::clone(world),
            token: Arc::new(Mutex::new(token)),
        }
    }
}

impl BrowsingContext for FakeContext {
    type Surface = FakeSurface;

    async fn new_surface(&self) -> Result<FakeSurface, ScrapeError> {
        {
            let mut state = self.world.state.lock();
            state.open_surfaces += 1;
            state.peak_surfaces = state.peak_surfaces.max(state.open_surfaces);
        }
        Ok(FakeSurface {
            world: Arc::clone(&self.world),
            token: Arc::clone(&self.token),
            page: Mutex::new(PageState {
                page: Page::Blank,
                location: "about:blank".to_string(),
                scrolls: 0,
            }),
        })
    }

    async fn capture_state(&self) -> Result<AuthState, ScrapeError> {
        let token = *self.token.lock();
        match token {
            Some(token) if self.world.is_valid(Some(token)) => {
                Ok(AuthState::new(serde_json::json!({ "token": token })))
            }
            _ => Err(ScrapeError::Browser("context is not authenticated".to_string())),
        }
    }

    async fn close(self) {
        self.world.state.lock().closed += 1;
    }
}

struct PageState {
    page: Page,
    location: String,
    scrolls: usize,
}

pub struct FakeSurface {
    world: Arc<FakeWorld>,
    token: Arc<Mutex<Option<u64>>>,
    page: Mutex<PageState>,
}

impl FakeSurface {
    fn authenticated(&self) -> bool {
        let token = *self.token.lock();
        self.world.is_valid(token)
    }

    fn show_login(&self) {
        let mut page = self.page.lock();
        page.page = Page::Login(LoginStage::Identity);
        page.location = self.world.site.login_url.clone();
    }

    fn complete_login(&self) {
        let token = {
            let mut state = self.world.state.lock();
            let token = state.next_token;
            state.next_token += 1;
            state.valid_tokens.insert(token);
            state.logins += 1;
            token
        };
        *self.token.lock() = Some(token);
        let mut page = self.page.lock();
        page.page = Page::Home;
        page.location = self.world.site.home_url.clone();
    }

    fn invalidate_session(&self) {
        let token = *self.token.lock();
        if let Some(token) = token {
            self.world.state.lock().valid_tokens.remove(&token);
        }
    }
}

/// Hashtag from a search URL's `q` parameter (`#tag lang:xx`)
fn hashtag_of(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let (_, query) = parsed.query_pairs().find(|(k, _)| k == "q")?;
    let tag = query.split_whitespace().next()?;
    Some(tag.trim_start_matches('#').to_lowercase())
}

impl BrowsingSurface for FakeSurface {
    type Card = CardRecord;

    async fn navigate(&self, url: &str, _timeout: Duration) -> Result<(), ScrapeError> {
        let site = &self.world.site;
        if url.starts_with(&site.login_url) {
            self.show_login();
            return Ok(());
        }
        if url.starts_with(&site.home_url) {
            if self.authenticated() {
                let mut page = self.page.lock();
                page.page = Page::Home;
                page.location = url.to_string();
            } else {
                self.show_login();
            }
            return Ok(());
        }
        if url.starts_with(&site.search_url) {
            let tag = hashtag_of(url)
                .ok_or_else(|| ScrapeError::Browser(format!("no query in {url}")))?;
            let (hang, expire) = {
                let mut state = self.world.state.lock();
                state.visits.push(tag.clone());
                (state.hanging.contains(&tag), state.expire_on_visit.remove(&tag))
            };
            if hang {
                futures::future::pending::<()>().await;
            }
            if expire {
                self.invalidate_session();
            }
            if !self.authenticated() {
                self.show_login();
                return Ok(());
            }
            let mut page = self.page.lock();
            page.page = Page::Search(tag);
            page.location = url.to_string();
            page.scrolls = 0;
            return Ok(());
        }
        Err(ScrapeError::Browser(format!("unknown url {url}")))
    }

    async fn has_element(&self, selector: &str) -> bool {
        let site = &self.world.site;
        let page = self.page.lock().page.clone();
        match page {
            Page::Blank => false,
            Page::Home => selector == site.landmark_selector,
            Page::Search(tag) => {
                if selector == site.landmark_selector {
                    return true;
                }
                selector == site.card_selector
                    && self
                        .world
                        .state
                        .lock()
                        .feeds
                        .get(&tag)
                        .is_some_and(|feed| !feed.is_empty())
            }
            Page::Login(stage) => match stage {
                LoginStage::Identity | LoginStage::Reconfirm => selector == site.identity_input,
                LoginStage::Password => selector == site.password_input,
                LoginStage::Challenge => site.challenge_inputs.iter().any(|c| c == selector),
                LoginStage::Stuck => false,
            },
        }
    }

    async fn type_into(&self, selector: &str, text: &str, _submit: bool) -> Result<(), ScrapeError> {
        let site = &self.world.site;
        let page = self.page.lock().page.clone();
        let Page::Login(stage) = page else {
            return Err(ScrapeError::Browser(format!("no input '{selector}'")));
        };
        let script = self.world.state.lock().script;
        let next = match stage {
            LoginStage::Identity if selector == site.identity_input => match script {
                LoginScript::Direct => LoginStage::Password,
                LoginScript::Reconfirm => LoginStage::Reconfirm,
                LoginScript::Challenge => LoginStage::Challenge,
                LoginScript::Stuck => LoginStage::Stuck,
            },
            LoginStage::Reconfirm if selector == site.identity_input => LoginStage::Password,
            LoginStage::Password if selector == site.password_input => {
                if text == PASSWORD {
                    self.complete_login();
                    return Ok(());
                }
                LoginStage::Stuck
            }
            _ => return Err(ScrapeError::Browser(format!("no input '{selector}'"))),
        };
        self.page.lock().page = Page::Login(next);
        Ok(())
    }

    async fn find_cards(&self, _selector: &str) -> Result<Vec<CardRecord>, ScrapeError> {
        let (page, scrolls) = {
            let page = self.page.lock();
            (page.page.clone(), page.scrolls)
        };
        let Page::Search(tag) = page else {
            return Ok(Vec::new());
        };
        let state = self.world.state.lock();
        if state.failing.contains(&tag) {
            return Err(ScrapeError::Browser(format!("renderer crashed on #{tag}")));
        }
        let visible = state.page_size * (scrolls + 1);
        Ok(state
            .feeds
            .get(&tag)
            .map(|feed| feed.iter().take(visible).cloned().collect())
            .unwrap_or_default())
    }

    async fn extract(&self, card: &CardRecord) -> Result<CardRecord, ScrapeError> {
        let delay = {
            let mut state = self.world.state.lock();
            state.extracting += 1;
            state.peak_extracting = state.peak_extracting.max(state.extracting);
            state.extract_delay
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.world.state.lock().extracting -= 1;

        if card.content == BROKEN_CARD {
            return Err(ScrapeError::Collaborator("card has no body".to_string()));
        }
        Ok(card.clone())
    }

    async fn scroll(&self, _delta: i64) -> Result<(), ScrapeError> {
        let mut page = self.page.lock();
        if let Page::Search(tag) = &page.page
            && let Some(&budget) = self.world.state.lock().scroll_budget.get(tag)
            && page.scrolls >= budget
        {
            return Err(ScrapeError::Browser(format!("renderer crashed on #{tag}")));
        }
        page.scrolls += 1;
        Ok(())
    }

    /// Keeps growing so only item progress can reset stagnation
    async fn page_extent(&self) -> Result<u64, ScrapeError> {
        let scrolls = self.page.lock().scrolls as u64;
        Ok((scrolls + 1) * 1000)
    }

    async fn current_location(&self) -> String {
        self.page.lock().location.clone()
    }

    async fn close(self) {
        self.world.state.lock().open_surfaces -= 1;
    }
}

/// Fixed reference instant for card timestamps
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 30, 12, 0, 0).single().unwrap()
}

/// 24h window ending just after `base_time`
pub fn test_window() -> TimeWindow {
    let until = base_time() + ChronoDuration::minutes(10);
    TimeWindow::new(until - ChronoDuration::hours(24), until)
}

pub fn card(id: u64, author: &str, content: &str, posted_at: DateTime<Utc>) -> CardRecord {
    CardRecord {
        content: content.to_string(),
        permalink: Some(format!("/{author}/status/{id}")),
        author: Some(format!("/{author}")),
        posted_at: Some(posted_at),
    }
}

/// `count` distinct in-window cards with ids starting at `first_id`
pub fn feed(first_id: u64, count: u64, author: &str) -> Vec<CardRecord> {
    (0..count)
        .map(|i| {
            card(
                first_id + i,
                author,
                &format!("post {} about the market", first_id + i),
                base_time() - ChronoDuration::minutes(i as i64),
            )
        })
        .collect()
}

pub fn item(id: &str, author: &str, content: &str, timestamp: DateTime<Utc>) -> Item {
    Item {
        id: id.to_string(),
        author: author.to_string(),
        timestamp,
        content: content.to_string(),
        mentions: Vec::new(),
        hashtags: Vec::new(),
    }
}

/// Config with short delays and no throttling, rooted at `dir`
pub fn test_config(dir: &Path, with_credentials: bool) -> ScrapeConfig {
    let builder = ScrapeConfig::builder()
        .data_dir(dir)
        .limit_range(1, 20_000)
        .rate(0.0, 1)
        .settle_delay_ms(10)
        .navigation_timeout_secs(5)
        .content_wait_timeout_secs(2)
        .extraction_timeout_secs(5)
        .probe_timeout_secs(2)
        .login_step_timeouts_secs(2, 2, 2);
    let builder = if with_credentials {
        builder.credentials(Credentials::new(USERNAME, PASSWORD))
    } else {
        builder
    };
    builder.build().unwrap()
}

/// Sink that keeps everything in memory
#[derive(Clone, Default)]
pub struct MemorySink {
    pub batches: Arc<Mutex<Vec<(String, Vec<Item>)>>>,
    pub raw: Arc<Mutex<Vec<(String, Vec<Item>)>>>,
}

impl ItemSink for MemorySink {
    async fn persist(&self, job_id: &str, items: &[Item]) -> Result<Option<String>, ScrapeError> {
        if items.is_empty() {
            return Ok(None);
        }
        self.batches.lock().push((job_id.to_string(), items.to_vec()));
        Ok(Some(format!("memory://{job_id}")))
    }

    async fn persist_raw(&self, job_id: &str, items: &[Item]) -> Result<Option<String>, ScrapeError> {
        if items.is_empty() {
            return Ok(None);
        }
        self.raw.lock().push((job_id.to_string(), items.to_vec()));
        Ok(Some(format!("memory://raw/{job_id}")))
    }
}
