//! Configuration module for hashtag scraping
//!
//! This module provides the `ScrapeConfig` struct, its type-safe builder and
//! environment loading, with validation and sensible defaults.

// Sub-modules
pub mod builder;
pub mod env;
pub mod getters;
pub mod methods;
pub mod types;

// Re-exports for public API
pub use builder::{ScrapeConfigBuilder, WithDataDir};
pub use getters::AUTH_STATE_FILE;
pub use types::{Credentials, ScrapeConfig};
