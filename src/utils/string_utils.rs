//! UTF-8-safe string helpers and hashtag normalization

/// Safely truncate a string to a maximum number of CHARACTERS (not bytes).
///
/// Used for log previews of collected content, which routinely contains
/// emoji and other multi-byte characters.
///
/// # Examples
/// ```
/// # use kodegen_tools_tagscrape::utils::string_utils::safe_truncate_chars;
/// assert_eq!(safe_truncate_chars("Hello, World!", 5), "Hello");
/// assert_eq!(safe_truncate_chars("🎉🎊🎈", 2), "🎉🎊");
/// assert_eq!(safe_truncate_chars("Hi", 100), "Hi");
/// ```
#[inline]
pub fn safe_truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        None => s,
        Some((byte_idx, _)) => &s[..byte_idx],
    }
}

/// Normalize caller-supplied hashtags
///
/// Trims whitespace, strips leading `#`, drops empties and removes repeats
/// (case-insensitively) while keeping first-seen order. The original casing of
/// the first occurrence is preserved.
///
/// # Examples
/// ```
/// # use kodegen_tools_tagscrape::utils::normalize_hashtags;
/// let tags = normalize_hashtags(["#Nifty50", " sensex ", "", "#nifty50", "##"]);
/// assert_eq!(tags, vec!["Nifty50".to_string(), "sensex".to_string()]);
/// ```
pub fn normalize_hashtags<I, S>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for tag in raw {
        let tag = tag.as_ref().trim().trim_start_matches('#').trim();
        if tag.is_empty() {
            continue;
        }
        if out.iter().any(|seen| seen.eq_ignore_ascii_case(tag)) {
            continue;
        }
        out.push(tag.to_string());
    }
    out
}
