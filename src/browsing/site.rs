//! Platform URLs and selectors
//!
//! Everything the session manager and the Chromium surface need to know about
//! the platform's markup lives here, so a markup change is a data change.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteProfile {
    pub login_url: String,
    /// Authenticated-only page used to probe a restored session
    pub home_url: String,
    /// Search endpoint; the query string is appended per target
    pub search_url: String,
    /// Location fragments that mean "bounced to login"
    pub login_redirect_markers: Vec<String>,

    /// Element present only when authenticated
    pub landmark_selector: String,
    pub identity_input: String,
    pub password_input: String,
    /// Inputs for challenges we do not support (verification code, second factor)
    pub challenge_inputs: Vec<String>,

    pub card_selector: String,
    pub content_selector: String,
    pub permalink_selector: String,
    pub author_selector: String,
    pub time_selector: String,
}

impl Default for SiteProfile {
    fn default() -> Self {
        Self {
            login_url: "https://x.com/login".to_string(),
            home_url: "https://x.com/home".to_string(),
            search_url: "https://x.com/search".to_string(),
            login_redirect_markers: vec!["/login".to_string(), "/i/flow/login".to_string()],
            landmark_selector: r#"nav[role="navigation"]"#.to_string(),
            identity_input: r#"input[name="text"]"#.to_string(),
            password_input: r#"input[name="password"]"#.to_string(),
            challenge_inputs: vec![
                r#"input[name="verification_code"]"#.to_string(),
                r#"input[autocomplete="one-time-code"]"#.to_string(),
            ],
            card_selector: "article".to_string(),
            content_selector: r#"div[data-testid="tweetText"]"#.to_string(),
            permalink_selector: r#"a[href*="/status/"]"#.to_string(),
            author_selector: r#"a[href^="/"]"#.to_string(),
            time_selector: "time".to_string(),
        }
    }
}
