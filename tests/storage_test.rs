//! Partitioned JSON-lines store

use chrono::Duration as ChronoDuration;
use kodegen_tools_tagscrape::scrape_engine::{Item, TimeWindow};
use kodegen_tools_tagscrape::storage::{ItemSink, JsonlStore, LATEST_BATCH_FILE, RAW_DIR};
use tempfile::TempDir;

mod common;
use common::{base_time, item};

#[tokio::test]
async fn test_items_are_partitioned_by_day_and_read_back() {
    let dir = TempDir::new().unwrap();
    let store = JsonlStore::new(dir.path(), false);
    let today = base_time();
    let yesterday = today - ChronoDuration::days(1);
    let items = vec![
        item("1", "alice", "today one", today),
        item("2", "bob", "yesterday", yesterday),
        item("3", "carol", "today two", today - ChronoDuration::minutes(5)),
    ];

    let location = store.persist("job1", &items).await.unwrap();
    assert_eq!(location, Some(store.items_root().display().to_string()));

    assert!(store.items_root().join(LATEST_BATCH_FILE).exists());
    assert!(
        store
            .partition_dir(today.date_naive())
            .join("items-job1.jsonl")
            .exists()
    );
    assert!(
        store
            .partition_dir(yesterday.date_naive())
            .join("items-job1.jsonl")
            .exists()
    );

    let window = TimeWindow::new(today - ChronoDuration::hours(1), today);
    let loaded = store.load_window(window).await.unwrap();
    let ids: Vec<&str> = loaded.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "3"]);
}

#[tokio::test]
async fn test_compressed_partitions_round_trip_through_the_loader() {
    let dir = TempDir::new().unwrap();
    let store = JsonlStore::new(dir.path(), true);
    let items = vec![item("9", "alice", "gz", base_time())];

    store.persist("job2", &items).await.unwrap();
    assert!(
        store
            .partition_dir(base_time().date_naive())
            .join("items-job2.jsonl.gz")
            .exists()
    );

    let window = TimeWindow::new(base_time() - ChronoDuration::hours(1), base_time());
    assert_eq!(store.load_window(window).await.unwrap(), items);
}

#[tokio::test]
async fn test_loader_dedupes_across_jobs() {
    let dir = TempDir::new().unwrap();
    let store = JsonlStore::new(dir.path(), false);
    let items = vec![item("1", "alice", "same", base_time())];
    store.persist("job-a", &items).await.unwrap();
    store.persist("job-b", &items).await.unwrap();

    let window = TimeWindow::new(base_time() - ChronoDuration::hours(1), base_time());
    assert_eq!(store.load_window(window).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_empty_batch_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let store = JsonlStore::new(dir.path(), false);

    assert_eq!(store.persist("job3", &[]).await.unwrap(), None);
    assert!(!store.items_root().exists());
}

#[tokio::test]
async fn test_missing_partitions_load_as_empty() {
    let dir = TempDir::new().unwrap();
    let store = JsonlStore::new(dir.path(), false);
    let window = TimeWindow::new(base_time() - ChronoDuration::days(2), base_time());
    assert!(store.load_window(window).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_raw_dump_keeps_duplicates_outside_the_partitions() {
    let dir = TempDir::new().unwrap();
    let store = JsonlStore::new(dir.path(), false);
    let items = vec![
        item("1", "alice", "same", base_time()),
        item("1", "alice", "same", base_time()),
        item("2", "bob", "other", base_time()),
    ];

    let location = store.persist_raw("job4", &items).await.unwrap();
    let path = store.raw_path("job4");
    assert_eq!(location, Some(path.display().to_string()));
    assert!(path.starts_with(dir.path().join(RAW_DIR)));

    let body = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = body.lines().collect();
    assert_eq!(lines.len(), 3);
    let first: Item = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(first, items[0]);

    // The audit dump is not part of the windowed store
    let window = TimeWindow::new(base_time() - ChronoDuration::hours(1), base_time());
    assert!(store.load_window(window).await.unwrap().is_empty());

    assert_eq!(store.persist_raw("job5", &[]).await.unwrap(), None);
    assert!(!store.raw_path("job5").exists());
}
