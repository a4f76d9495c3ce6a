//! Browser capability: traits, platform profile and the Chromium backend

pub mod capability;
pub mod chromium;
pub mod launch;
pub mod profile;
pub mod site;

pub use capability::{AuthState, BrowserBackend, BrowsingContext, BrowsingSurface};
pub use chromium::{ChromiumBackend, ChromiumContext, ChromiumSurface};
pub use site::SiteProfile;
