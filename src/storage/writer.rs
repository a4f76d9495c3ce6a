//! Partitioned JSON-lines writer
//!
//! Layout under the data directory:
//! ```text
//! items/
//!   _latest_batch.jsonl
//!   date=2025-01-30/items-<job_id>.jsonl[.gz]
//! raw/
//!   raw-<job_id>.jsonl[.gz]
//! ```
//! Every file is written to a temp file in its target directory and renamed
//! into place, so readers never observe a partial file.

use chrono::NaiveDate;
use flate2::Compression;
use flate2::write::GzEncoder;
use log::{debug, info};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use super::ItemSink;
use crate::scrape_engine::{Item, ScrapeError};

pub const ITEMS_DIR: &str = "items";
pub const LATEST_BATCH_FILE: &str = "_latest_batch.jsonl";
pub const RAW_DIR: &str = "raw";

/// Items store rooted at a data directory
#[derive(Debug, Clone)]
pub struct JsonlStore {
    root: PathBuf,
    raw_root: PathBuf,
    compress: bool,
}

impl JsonlStore {
    pub fn new(data_dir: impl AsRef<Path>, compress: bool) -> Self {
        Self {
            root: data_dir.as_ref().join(ITEMS_DIR),
            raw_root: data_dir.as_ref().join(RAW_DIR),
            compress,
        }
    }

    /// Directory holding the partitions
    #[must_use]
    pub fn items_root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the per-job pre-merge dumps
    #[must_use]
    pub fn raw_root(&self) -> &Path {
        &self.raw_root
    }

    #[must_use]
    pub fn raw_path(&self, job_id: &str) -> PathBuf {
        let ext = if self.compress { "jsonl.gz" } else { "jsonl" };
        self.raw_root.join(format!("raw-{job_id}.{ext}"))
    }

    #[must_use]
    pub fn partition_dir(&self, day: NaiveDate) -> PathBuf {
        self.root.join(format!("date={}", day.format("%Y-%m-%d")))
    }

    fn file_name(&self, job_id: &str) -> String {
        if self.compress {
            format!("items-{job_id}.jsonl.gz")
        } else {
            format!("items-{job_id}.jsonl")
        }
    }

    /// Write all items synchronously; callers run this off the async runtime
    fn write_blocking(
        root: &Path,
        latest: Vec<u8>,
        partitions: Vec<(PathBuf, Vec<u8>)>,
        compress: bool,
    ) -> Result<(), ScrapeError> {
        std::fs::create_dir_all(root)?;
        write_atomic(&root.join(LATEST_BATCH_FILE), &latest, false)?;
        for (path, body) in partitions {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            write_atomic(&path, &body, compress)?;
            debug!("Wrote {}", path.display());
        }
        Ok(())
    }
}

fn write_atomic(path: &Path, body: &[u8], compress: bool) -> Result<(), ScrapeError> {
    let parent = path
        .parent()
        .ok_or_else(|| ScrapeError::Collaborator(format!("{} has no parent", path.display())))?;
    let temp_file = NamedTempFile::new_in(parent)?;
    let temp_file = if compress {
        let mut gz = GzEncoder::new(temp_file, Compression::new(3));
        gz.write_all(body)?;
        gz.finish()?
    } else {
        let mut temp_file = temp_file;
        temp_file.write_all(body)?;
        temp_file
    };
    temp_file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

fn to_jsonl<'a, I>(items: I) -> Result<Vec<u8>, ScrapeError>
where
    I: IntoIterator<Item = &'a Item>,
{
    let mut out = Vec::new();
    for item in items {
        serde_json::to_writer(&mut out, item)?;
        out.push(b'\n');
    }
    Ok(out)
}

impl ItemSink for JsonlStore {
    async fn persist(&self, job_id: &str, items: &[Item]) -> Result<Option<String>, ScrapeError> {
        if items.is_empty() {
            debug!("Job {job_id}: nothing to persist");
            return Ok(None);
        }

        let mut by_day: BTreeMap<NaiveDate, Vec<&Item>> = BTreeMap::new();
        for item in items {
            by_day.entry(item.timestamp.date_naive()).or_default().push(item);
        }

        let latest = to_jsonl(items)?;
        let name = self.file_name(job_id);
        let partitions = by_day
            .into_iter()
            .map(|(day, day_items)| Ok((self.partition_dir(day).join(&name), to_jsonl(day_items)?)))
            .collect::<Result<Vec<_>, ScrapeError>>()?;
        let partition_count = partitions.len();

        let root = self.root.clone();
        let compress = self.compress;
        tokio::task::spawn_blocking(move || Self::write_blocking(&root, latest, partitions, compress))
            .await
            .map_err(|e| ScrapeError::Collaborator(format!("storage task failed: {e}")))??;

        info!(
            "Job {job_id}: persisted {} item(s) across {partition_count} partition(s) under {}",
            items.len(),
            self.root.display()
        );
        Ok(Some(self.root.display().to_string()))
    }

    async fn persist_raw(&self, job_id: &str, items: &[Item]) -> Result<Option<String>, ScrapeError> {
        if items.is_empty() {
            return Ok(None);
        }
        let body = to_jsonl(items)?;
        let path = self.raw_path(job_id);
        let target = path.clone();
        let compress = self.compress;
        tokio::task::spawn_blocking(move || -> Result<(), ScrapeError> {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            write_atomic(&target, &body, compress)
        })
        .await
        .map_err(|e| ScrapeError::Collaborator(format!("storage task failed: {e}")))??;

        debug!("Job {job_id}: {} raw item(s) in {}", items.len(), path.display());
        Ok(Some(path.display().to_string()))
    }
}
