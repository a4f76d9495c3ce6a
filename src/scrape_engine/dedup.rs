//! Two-stage uniqueness filter for collected items
//!
//! Stage 1 drops any item whose id was already emitted. Stage 2 drops items
//! whose content fingerprint was already emitted, catching reposts that carry
//! a new id. First occurrence wins and output order is first-seen order.

use log::trace;
use std::collections::HashSet;
use xxhash_rust::xxh3::xxh3_128;

use super::scrape_types::{DedupStats, Item};

/// 128-bit digest of (author, timestamp at second granularity, cleaned content)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint(u128);

impl Fingerprint {
    /// Compute the fingerprint of an item
    ///
    /// Content is expected to be cleaned already; only surrounding whitespace
    /// is trimmed here. Sub-second precision is discarded so two renderings of
    /// the same post stamped a few milliseconds apart still collide.
    #[must_use]
    pub fn of(item: &Item) -> Self {
        let key = format!(
            "{}\u{1f}{}\u{1f}{}",
            item.author,
            item.timestamp.timestamp(),
            item.content.trim()
        );
        Self(xxh3_128(key.as_bytes()))
    }

    #[must_use]
    pub fn to_hex(self) -> String {
        format!("{:032x}", self.0)
    }
}

/// Uniqueness filter for one run
///
/// Feed items in merge order; `admit` says whether each one should be kept.
#[derive(Debug, Default)]
pub struct Deduplicator {
    seen_ids: HashSet<String>,
    seen_fingerprints: HashSet<Fingerprint>,
    stats: DedupStats,
}

impl Deduplicator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide whether `item` is new, recording it if so
    ///
    /// Ids and fingerprints are only recorded for emitted items.
    pub fn admit(&mut self, item: &Item) -> bool {
        if self.seen_ids.contains(&item.id) {
            self.stats.by_id += 1;
            return false;
        }
        let fingerprint = Fingerprint::of(item);
        if self.seen_fingerprints.contains(&fingerprint) {
            trace!("Dropping {} as a repost ({})", item.id, fingerprint.to_hex());
            self.stats.by_fingerprint += 1;
            return false;
        }
        self.seen_ids.insert(item.id.clone());
        self.seen_fingerprints.insert(fingerprint);
        true
    }

    /// Filter a sequence, keeping first-seen order
    pub fn filter<I>(&mut self, items: I) -> Vec<Item>
    where
        I: IntoIterator<Item = Item>,
    {
        items.into_iter().filter(|item| self.admit(item)).collect()
    }

    /// Merge per-target item lists in order and stop once `limit` items are kept
    pub fn merge<I>(&mut self, batches: I, limit: usize) -> Vec<Item>
    where
        I: IntoIterator<Item = Vec<Item>>,
    {
        let mut out = Vec::new();
        for batch in batches {
            for item in batch {
                if out.len() >= limit {
                    return out;
                }
                if self.admit(&item) {
                    out.push(item);
                }
            }
        }
        out
    }

    #[must_use]
    pub fn stats(&self) -> DedupStats {
        self.stats
    }

    /// Number of items emitted so far
    #[must_use]
    pub fn emitted(&self) -> usize {
        self.seen_ids.len()
    }
}

/// One-shot convenience over `Deduplicator::filter`
#[must_use]
pub fn dedupe_items(items: Vec<Item>) -> Vec<Item> {
    Deduplicator::new().filter(items)
}
