//! Read a time window back out of the partitioned store

use chrono::{Days, NaiveDate};
use flate2::read::GzDecoder;
use log::{debug, warn};
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use super::writer::JsonlStore;
use crate::scrape_engine::{Item, ScrapeError, TimeWindow, dedupe_items};

/// Days whose partitions can hold items in `window`, oldest first
fn partition_days(window: &TimeWindow) -> Vec<NaiveDate> {
    let first = window.since.date_naive();
    let last = window.until.date_naive();
    let mut days = Vec::new();
    let mut day = first;
    while day <= last {
        days.push(day);
        match day.checked_add_days(Days::new(1)) {
            Some(next) => day = next,
            None => break,
        }
    }
    days
}

fn partition_files(dir: &Path) -> Result<Vec<PathBuf>, ScrapeError> {
    let mut files: Vec<PathBuf> = match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(Result::ok)
            .map(|e| e.path())
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.ends_with(".jsonl") || n.ends_with(".jsonl.gz"))
            })
            .collect(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    files.sort();
    Ok(files)
}

fn read_items(path: &Path, out: &mut Vec<Item>) -> Result<(), ScrapeError> {
    let file = std::fs::File::open(path)?;
    let reader: Box<dyn Read> = if path.extension().is_some_and(|ext| ext == "gz") {
        Box::new(GzDecoder::new(file))
    } else {
        Box::new(file)
    };
    for (line_no, line) in BufReader::new(reader).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Item>(&line) {
            Ok(item) => out.push(item),
            Err(e) => warn!("{}:{}: skipping malformed item: {e}", path.display(), line_no + 1),
        }
    }
    Ok(())
}

impl JsonlStore {
    /// Items inside `window`, de-duplicated, in partition then file order
    ///
    /// Only the day partitions the window touches are read.
    pub async fn load_window(&self, window: TimeWindow) -> Result<Vec<Item>, ScrapeError> {
        let dirs: Vec<PathBuf> = partition_days(&window)
            .into_iter()
            .map(|day| self.partition_dir(day))
            .collect();

        let items = tokio::task::spawn_blocking(move || {
            let mut items = Vec::new();
            for dir in dirs {
                for file in partition_files(&dir)? {
                    debug!("Reading {}", file.display());
                    read_items(&file, &mut items)?;
                }
            }
            Ok::<_, ScrapeError>(items)
        })
        .await
        .map_err(|e| ScrapeError::Collaborator(format!("storage task failed: {e}")))??;

        let in_window = items
            .into_iter()
            .filter(|item| window.contains(item.timestamp));
        Ok(dedupe_items(in_window.collect()))
    }
}
