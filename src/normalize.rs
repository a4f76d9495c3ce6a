//! Text cleaning and entity extraction for collected posts

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use unicode_normalization::UnicodeNormalization;

static URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"https?://\S+|www\.\S+").expect("Invalid URL regex"));
static SPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("Invalid whitespace regex"));
static MENTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|\s)@([A-Za-z0-9_]{1,15})").expect("Invalid mention regex"));
static HASHTAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|\s)#(\w+)").expect("Invalid hashtag regex"));

/// Mentions and hashtags found in a post, lower-cased, first-seen order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Entities {
    pub mentions: Vec<String>,
    pub hashtags: Vec<String>,
}

/// Pure text functions applied to every extracted card
pub trait Normalizer: Send + Sync {
    fn clean(&self, text: &str) -> String;
    fn extract_entities(&self, text: &str) -> Entities;
}

/// Default `Normalizer`: NFC, strip links, fold whitespace, regex entities
#[derive(Debug, Clone, Copy, Default)]
pub struct TextNormalizer;

fn unique_captures(re: &Regex, text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    re.captures_iter(text)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().to_lowercase())
        .filter(|tag| seen.insert(tag.clone()))
        .collect()
}

impl Normalizer for TextNormalizer {
    fn clean(&self, text: &str) -> String {
        let composed: String = text.nfc().collect();
        let without_links = URL_RE.replace_all(&composed, " ");
        SPACE_RE.replace_all(&without_links, " ").trim().to_string()
    }

    fn extract_entities(&self, text: &str) -> Entities {
        let composed: String = text.nfc().collect();
        Entities {
            mentions: unique_captures(&MENTION_RE, &composed),
            hashtags: unique_captures(&HASHTAG_RE, &composed),
        }
    }
}
