//! Timeout utilities for surface operations
//!
//! Wraps navigation, content waits and extraction in `tokio::time::timeout`
//! so a stuck page can only ever cost its own target.

use std::future::Future;
use std::time::Duration;

use super::scrape_types::ScrapeError;

/// Which kind of step a timeout belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    Navigation,
    ContentWait,
    Extraction,
}

/// Run `operation` with an explicit timeout
///
/// # Arguments
/// * `operation` - The surface call to bound
/// * `timeout` - Maximum time to wait
/// * `kind` - Selects the timeout error variant
/// * `operation_name` - Human-readable name for error messages
///
/// # Returns
/// * `Ok(T)` - Operation completed successfully
/// * `Err` - The operation failed, or the timeout elapsed
pub async fn with_step_timeout<F, T>(
    operation: F,
    timeout: Duration,
    kind: StepKind,
    operation_name: &str,
) -> Result<T, ScrapeError>
where
    F: Future<Output = Result<T, ScrapeError>>,
{
    match tokio::time::timeout(timeout, operation).await {
        Ok(result) => result,
        Err(_) => Err(match kind {
            StepKind::Navigation | StepKind::ContentWait => ScrapeError::NavigationTimeout {
                what: operation_name.to_string(),
                secs: timeout.as_secs(),
            },
            StepKind::Extraction => ScrapeError::ExtractionTimeout {
                secs: timeout.as_secs(),
            },
        }),
    }
}
