//! chromiumoxide implementation of the browsing capability
//!
//! Authentication state is the browser's cookie jar serialized as JSON.

use anyhow::Context as _;
use chromiumoxide::cdp::browser_protocol::network::{Cookie, CookieParam, TimeSinceEpoch};
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::{Browser, Element, Page};
use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use super::capability::{AuthState, BrowserBackend, BrowsingContext, BrowsingSurface};
use super::launch::{STEALTH_SCRIPT, launch_browser};
use super::profile::{BrowserProfile, PROFILE_PREFIX};
use super::site::SiteProfile;
use crate::scrape_engine::{CardRecord, ScrapeError};

#[derive(Debug, Serialize, Deserialize)]
struct CookieJar {
    cookies: Vec<Cookie>,
}

fn to_cookie_params(jar: CookieJar) -> Vec<CookieParam> {
    jar.cookies
        .into_iter()
        .filter_map(|cookie| {
            let mut builder = CookieParam::builder()
                .name(cookie.name)
                .value(cookie.value)
                .domain(cookie.domain)
                .path(cookie.path)
                .secure(cookie.secure)
                .http_only(cookie.http_only);
            if !cookie.session && cookie.expires > 0.0 {
                builder = builder.expires(TimeSinceEpoch::new(cookie.expires));
            }
            match builder.build() {
                Ok(param) => Some(param),
                Err(e) => {
                    warn!(target: "tagscrape::browser", "Skipping unusable cookie: {e}");
                    None
                }
            }
        })
        .collect()
}

/// Non-empty node texts joined by single spaces; `None` if every node was empty
fn join_text_nodes<I>(parts: I) -> Option<String>
where
    I: IntoIterator<Item = Option<String>>,
{
    let joined = parts
        .into_iter()
        .flatten()
        .map(|part| part.trim().to_string())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    (!joined.is_empty()).then_some(joined)
}

/// Launches one Chrome per context
#[derive(Debug, Clone)]
pub struct ChromiumBackend {
    headless: bool,
    profile_root: PathBuf,
    site: Arc<SiteProfile>,
}

impl ChromiumBackend {
    #[must_use]
    pub fn new(headless: bool, profile_root: PathBuf, site: SiteProfile) -> Self {
        Self {
            headless,
            profile_root,
            site: Arc::new(site),
        }
    }
}

impl BrowserBackend for ChromiumBackend {
    type Context = ChromiumContext;

    async fn open(&self, state: Option<&AuthState>) -> Result<ChromiumContext, ScrapeError> {
        let profile = BrowserProfile::create_in(&self.profile_root, PROFILE_PREFIX)?;
        let (browser, handler) = launch_browser(self.headless, profile.path()).await?;

        if let Some(state) = state {
            match serde_json::from_value::<CookieJar>(state.payload.clone()) {
                Ok(jar) => {
                    let params = to_cookie_params(jar);
                    debug!(target: "tagscrape::browser", "Restoring {} cookies", params.len());
                    browser
                        .set_cookies(params)
                        .await
                        .context("Failed to restore cookies")?;
                }
                Err(e) => {
                    warn!(target: "tagscrape::browser", "Ignoring unreadable auth state: {e}");
                }
            }
        }

        Ok(ChromiumContext {
            browser,
            handler,
            profile,
            site: Arc::clone(&self.site),
        })
    }
}

/// A running browser and its throwaway profile
pub struct ChromiumContext {
    browser: Browser,
    handler: JoinHandle<()>,
    profile: BrowserProfile,
    site: Arc<SiteProfile>,
}

impl BrowsingContext for ChromiumContext {
    type Surface = ChromiumSurface;

    async fn new_surface(&self) -> Result<ChromiumSurface, ScrapeError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .context("Failed to open page")?;
        if let Err(e) = page
            .evaluate_on_new_document(AddScriptToEvaluateOnNewDocumentParams::new(
                STEALTH_SCRIPT,
            ))
            .await
        {
            warn!(target: "tagscrape::browser", "Stealth injection failed: {e}");
        }
        Ok(ChromiumSurface {
            page,
            site: Arc::clone(&self.site),
        })
    }

    async fn capture_state(&self) -> Result<AuthState, ScrapeError> {
        let cookies = self
            .browser
            .get_cookies()
            .await
            .context("Failed to read cookies")?;
        let payload = serde_json::to_value(CookieJar { cookies })?;
        Ok(AuthState::new(payload))
    }

    async fn close(self) {
        let Self {
            mut browser,
            handler,
            profile,
            ..
        } = self;

        // Close before aborting the handler so CDP stays connected for the shutdown
        if let Err(e) = browser.close().await {
            warn!(target: "tagscrape::browser", "Failed to close browser: {e}");
        }
        if let Err(e) = browser.wait().await {
            warn!(target: "tagscrape::browser", "Failed to wait for browser exit: {e}");
        }
        handler.abort();
        drop(profile);
    }
}

/// One page of a `ChromiumContext`
pub struct ChromiumSurface {
    page: Page,
    site: Arc<SiteProfile>,
}

impl ChromiumSurface {
    /// Text of every node matching `selector`, space-joined (quoted posts carry a second node)
    async fn card_text(card: &Element, selector: &str) -> Option<String> {
        let nodes = card.find_elements(selector).await.ok()?;
        let mut parts = Vec::with_capacity(nodes.len());
        for node in &nodes {
            parts.push(node.inner_text().await.ok().flatten());
        }
        join_text_nodes(parts)
    }

    async fn card_attribute(card: &Element, selector: &str, name: &str) -> Option<String> {
        card.find_element(selector)
            .await
            .ok()?
            .attribute(name)
            .await
            .ok()
            .flatten()
    }
}

impl BrowsingSurface for ChromiumSurface {
    type Card = Element;

    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), ScrapeError> {
        let load = async {
            self.page.goto(url).await.context("Navigation failed")?;
            self.page
                .wait_for_navigation()
                .await
                .context("Failed waiting for page load")?;
            Ok::<_, anyhow::Error>(())
        };
        match tokio::time::timeout(timeout, load).await {
            Ok(result) => result.map_err(ScrapeError::from),
            Err(_) => Err(ScrapeError::NavigationTimeout {
                what: format!("navigation to {url}"),
                secs: timeout.as_secs(),
            }),
        }
    }

    async fn has_element(&self, selector: &str) -> bool {
        self.page.find_element(selector).await.is_ok()
    }

    async fn type_into(&self, selector: &str, text: &str, submit: bool) -> Result<(), ScrapeError> {
        let input = self
            .page
            .find_element(selector)
            .await
            .with_context(|| format!("Input '{selector}' not found"))?;
        input.click().await.context("Failed to focus input")?;
        input.type_str(text).await.context("Failed to type")?;
        if submit {
            input.press_key("Enter").await.context("Failed to submit")?;
        }
        Ok(())
    }

    async fn find_cards(&self, selector: &str) -> Result<Vec<Element>, ScrapeError> {
        // No match is an empty page, not an error
        Ok(self.page.find_elements(selector).await.unwrap_or_default())
    }

    async fn extract(&self, card: &Element) -> Result<CardRecord, ScrapeError> {
        let site = &self.site;
        let content = Self::card_text(card, &site.content_selector)
            .await
            .unwrap_or_default();
        let permalink = Self::card_attribute(card, &site.permalink_selector, "href").await;
        let author = Self::card_attribute(card, &site.author_selector, "href").await;
        let posted_at = Self::card_attribute(card, &site.time_selector, "datetime")
            .await
            .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok())
            .map(|at| at.with_timezone(&Utc));

        Ok(CardRecord {
            content,
            permalink,
            author,
            posted_at,
        })
    }

    async fn scroll(&self, delta: i64) -> Result<(), ScrapeError> {
        self.page
            .evaluate(format!("window.scrollBy(0, {delta})"))
            .await
            .context("Scroll failed")?;
        Ok(())
    }

    async fn page_extent(&self) -> Result<u64, ScrapeError> {
        let height: f64 = self
            .page
            .evaluate("document.body ? document.body.scrollHeight : 0")
            .await
            .context("Failed to read page extent")?
            .into_value()
            .context("Page extent was not a number")?;
        Ok(height.max(0.0) as u64)
    }

    async fn current_location(&self) -> String {
        self.page
            .url()
            .await
            .ok()
            .flatten()
            .unwrap_or_else(|| "about:blank".to_string())
    }

    async fn close(self) {
        if let Err(e) = self.page.close().await {
            debug!(target: "tagscrape::browser", "Page close failed: {e}");
        }
    }
}
