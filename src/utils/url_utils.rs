//! URL helpers for the search surface and card permalinks.

use url::Url;

use crate::browsing::SiteProfile;
use crate::scrape_engine::ScrapeError;

/// Build the live (recency-ordered), language-constrained search URL for a hashtag.
///
/// The query is `#<tag> lang:<language>`; encoding is left to `Url`.
pub fn search_url(profile: &SiteProfile, hashtag: &str, language: &str) -> Result<String, ScrapeError> {
    let mut url = Url::parse(&profile.search_url).map_err(|e| {
        ScrapeError::Config(format!("invalid search url '{}': {e}", profile.search_url))
    })?;
    let tag = hashtag.trim().trim_start_matches('#');
    let query = if language.is_empty() {
        format!("#{tag}")
    } else {
        format!("#{tag} lang:{language}")
    };
    url.query_pairs_mut()
        .append_pair("q", &query)
        .append_pair("src", "typed_query")
        .append_pair("f", "live");
    Ok(url.into())
}

/// Extract the status id from a permalink such as `/someone/status/1234?s=20`.
///
/// Returns `None` when the permalink carries no id.
#[must_use]
pub fn status_id_from_permalink(permalink: &str) -> Option<String> {
    let (_, tail) = permalink.split_once("/status/")?;
    let id: &str = tail.split(['?', '/', '#']).next().unwrap_or_default();
    if id.is_empty() {
        None
    } else {
        Some(id.to_string())
    }
}

/// Resolve an author handle from a profile link (`/handle`).
///
/// Links with more than one path segment are not profile links and yield an
/// empty handle, matching what the card exposes for promoted or quoted posts.
#[must_use]
pub fn author_from_href(href: &str) -> String {
    let trimmed = href.trim();
    if trimmed.starts_with('/') && trimmed.matches('/').count() == 1 {
        trimmed.trim_matches('/').to_string()
    } else {
        String::new()
    }
}

/// Whether a location shows that the platform bounced us to its login flow.
#[must_use]
pub fn is_login_redirect(location: &str, markers: &[String]) -> bool {
    markers.iter().any(|marker| location.contains(marker.as_str()))
}
