//! Session acquisition, login and auth-state persistence

pub mod auth_store;
pub mod login;
pub mod manager;

pub use auth_store::AuthStateStore;
pub use login::{LoginFlow, LoginOutcome, LoginStep, SessionTimeouts};
pub use manager::{ActiveSession, MAX_RELOGINS_PER_RUN, SessionManager, SessionState};
