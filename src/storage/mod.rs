//! JSON-lines item storage partitioned by UTC day

pub mod loader;
pub mod writer;

use std::future::Future;

use crate::scrape_engine::{Item, ScrapeError};

pub use writer::{ITEMS_DIR, JsonlStore, LATEST_BATCH_FILE, RAW_DIR};

/// Durable destination for a job's items
pub trait ItemSink: Send + Sync + 'static {
    /// Persist `items`, returning where they went
    ///
    /// Empty input writes nothing and returns `None`.
    fn persist(
        &self,
        job_id: &str,
        items: &[Item],
    ) -> impl Future<Output = Result<Option<String>, ScrapeError>> + Send;

    /// Keep the pre-merge items of a job for auditing
    ///
    /// Empty input writes nothing and returns `None`.
    fn persist_raw(
        &self,
        job_id: &str,
        items: &[Item],
    ) -> impl Future<Output = Result<Option<String>, ScrapeError>> + Send;
}
