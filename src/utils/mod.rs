pub mod constants;
pub mod string_utils;
pub mod url_utils;

pub use constants::*;
pub use string_utils::{normalize_hashtags, safe_truncate_chars};
pub use url_utils::{author_from_href, is_login_redirect, search_url, status_id_from_permalink};
