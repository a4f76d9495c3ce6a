//! Job lifecycle: submit, run in the background, report status

pub mod manager;
pub mod types;

pub use manager::{CLEANUP_INTERVAL, JobOrchestrator};
pub use types::{Job, JobStatus, JobSummary};
