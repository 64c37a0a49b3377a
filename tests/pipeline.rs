// tests/pipeline.rs
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use notice_harvester::config::AppConfig;
use notice_harvester::ingest::types::{SourceAdapter, SourceError};
use notice_harvester::ingest::Aggregator;
use notice_harvester::model::Notice;
use notice_harvester::notify::{Notifier, RunSummary};
use notice_harvester::pipeline::{run_digest, run_scrape};
use notice_harvester::store::sqlite::SqliteNoticeStore;
use notice_harvester::store::{InsertReport, NoticeStore, StoreError};

struct FixedAdapter {
    name: &'static str,
    guids: Vec<&'static str>,
}

#[async_trait]
impl SourceAdapter for FixedAdapter {
    async fn fetch_candidates(&self) -> Result<Vec<Notice>, SourceError> {
        Ok(self
            .guids
            .iter()
            .map(|g| Notice::candidate(self.name, *g, format!("{} {g}", self.name), "u"))
            .collect())
    }
    fn name(&self) -> &str {
        self.name
    }
}

struct BrokenAdapter;

#[async_trait]
impl SourceAdapter for BrokenAdapter {
    async fn fetch_candidates(&self) -> Result<Vec<Notice>, SourceError> {
        Err(SourceError::Unreachable {
            url: "https://down.test".into(),
            message: "dns".into(),
        })
    }
    fn name(&self) -> &str {
        "Broken"
    }
}

#[derive(Default)]
struct RecordingNotifier {
    calls: Mutex<Vec<(RunSummary, Vec<String>)>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, summary: &RunSummary, fresh: &[Notice]) -> anyhow::Result<()> {
        let guids = fresh.iter().map(|n| n.guid.clone()).collect();
        self.calls.lock().unwrap().push((summary.clone(), guids));
        Ok(())
    }
}

struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn notify(&self, _: &RunSummary, _: &[Notice]) -> anyhow::Result<()> {
        Err(anyhow!("webhook returned 500"))
    }
}

struct ClosedStore;

#[async_trait]
impl NoticeStore for ClosedStore {
    async fn insert_batch(&self, _: &[Notice]) -> Result<InsertReport, StoreError> {
        Err(StoreError::Query(sqlx::Error::PoolClosed))
    }
    async fn count(&self) -> Result<i64, StoreError> {
        Err(StoreError::Query(sqlx::Error::PoolClosed))
    }
    async fn latest(&self, _: usize) -> Result<Vec<Notice>, StoreError> {
        Err(StoreError::Query(sqlx::Error::PoolClosed))
    }
    async fn recent_for_digest(
        &self,
        _: DateTime<Utc>,
        _: Option<&str>,
    ) -> Result<Vec<Notice>, StoreError> {
        Err(StoreError::Query(sqlx::Error::PoolClosed))
    }
    async fn source_id_for(&self, _: &str) -> Result<String, StoreError> {
        Err(StoreError::Query(sqlx::Error::PoolClosed))
    }
}

fn aggregator(guids_a: Vec<&'static str>) -> Aggregator {
    let adapters: Vec<Arc<dyn SourceAdapter>> = vec![
        Arc::new(FixedAdapter {
            name: "A",
            guids: guids_a,
        }),
        Arc::new(BrokenAdapter),
        Arc::new(FixedAdapter {
            name: "C",
            guids: vec!["c1", "c2"],
        }),
    ];
    Aggregator::new(adapters, Duration::from_secs(5))
}

#[tokio::test]
async fn scrape_persists_and_reports_only_the_delta() {
    let store = SqliteNoticeStore::connect("sqlite::memory:").await.unwrap();
    let notifier = RecordingNotifier::default();

    let first = run_scrape(&aggregator(vec!["a1", "a2", "a3"]), &store, &notifier, "https://site.test")
        .await
        .unwrap();
    assert_eq!(first.matched, 5);
    assert_eq!(first.inserted.len(), 5);
    assert_eq!(first.failures.len(), 1);
    assert_eq!(first.failures[0].adapter, "Broken");

    // Second run: one new item from A, the rest already stored.
    let second = run_scrape(
        &aggregator(vec!["a1", "a2", "a3", "a4"]),
        &store,
        &notifier,
        "https://site.test",
    )
    .await
    .unwrap();
    assert_eq!(second.matched, 6);
    assert_eq!(second.inserted.len(), 1);
    assert_eq!(store.count().await.unwrap(), 6);

    let calls = notifier.calls.lock().unwrap();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].0.matched, 6);
    assert_eq!(calls[1].0.inserted, 1);
    assert_eq!(calls[1].0.site_url, "https://site.test");
    assert_eq!(calls[1].1, vec!["a4".to_string()]);
}

#[tokio::test]
async fn nothing_new_means_no_notification() {
    let store = SqliteNoticeStore::connect("sqlite::memory:").await.unwrap();
    let notifier = RecordingNotifier::default();
    let agg = aggregator(vec!["a1"]);

    run_scrape(&agg, &store, &notifier, "x").await.unwrap();
    let again = run_scrape(&agg, &store, &notifier, "x").await.unwrap();

    assert!(again.inserted.is_empty());
    assert_eq!(notifier.calls.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn notifier_failure_does_not_fail_the_run() {
    let store = SqliteNoticeStore::connect("sqlite::memory:").await.unwrap();
    let report = run_scrape(&aggregator(vec!["a1"]), &store, &FailingNotifier, "x")
        .await
        .unwrap();
    assert_eq!(report.inserted.len(), 3);
}

#[tokio::test]
async fn store_failure_aborts_the_run() {
    let notifier = RecordingNotifier::default();
    let err = run_scrape(&aggregator(vec!["a1"]), &ClosedStore, &notifier, "x")
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Query(_)));
    assert!(notifier.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn digest_writes_todays_file() {
    let store = SqliteNoticeStore::connect("sqlite::memory:").await.unwrap();
    store
        .insert_batch(&[
            Notice::candidate("Remotive", "r1", "<b>Rust</b> Engineer", "u")
                .with_body("<p>Remote &amp; async</p>"),
            Notice::candidate("HackerNews", "41709350", "Globex | Backend", "u"),
        ])
        .await
        .unwrap();

    let tmp = tempfile::tempdir().unwrap();
    let mut cfg = AppConfig::default();
    cfg.site_url = "https://site.test".into();
    cfg.digest.dir = tmp.path().join("latest_notices");

    let now = Utc::now();
    let path = run_digest(&store, &cfg, now).await.unwrap();
    assert_eq!(
        path.file_name().unwrap().to_string_lossy(),
        format!("{}_latest_notices.md", now.format("%Y-%m-%d"))
    );

    let md = std::fs::read_to_string(&path).unwrap();
    assert!(md.starts_with("# Latest Notices\n"));
    assert!(md.contains("## Rust Engineer\n\n**From**: Remotive\n\nRemote & async\n\n"));
    assert!(md.contains("**Read more**: [Here](https://site.test/"));
    // HackerNews is excluded by default.
    assert!(!md.contains("Globex"));
}

#[tokio::test]
async fn digest_propagates_store_errors() {
    let tmp = tempfile::tempdir().unwrap();
    let mut cfg = AppConfig::default();
    cfg.digest.dir = tmp.path().to_path_buf();
    assert!(run_digest(&ClosedStore, &cfg, Utc::now()).await.is_err());
}

#[tokio::test]
async fn digest_rejects_an_unrepresentable_window() {
    let store = SqliteNoticeStore::connect("sqlite::memory:").await.unwrap();
    let tmp = tempfile::tempdir().unwrap();
    let mut cfg = AppConfig::default();
    cfg.digest.dir = tmp.path().to_path_buf();
    // Bypasses the parser's clamp.
    cfg.digest.window_hours = i64::MAX;

    let err = run_digest(&store, &cfg, Utc::now()).await.unwrap_err();
    assert!(err.to_string().contains("out of range"));
    assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn digest_accepts_the_largest_configurable_window() {
    let store = SqliteNoticeStore::connect("sqlite::memory:").await.unwrap();
    let tmp = tempfile::tempdir().unwrap();
    let cfg = AppConfig::parse(&format!(
        "[digest]\ndir = \"{}\"\nwindow_hours = 9223372036854775807\n",
        tmp.path().display()
    ))
    .unwrap();

    assert!(run_digest(&store, &cfg, Utc::now()).await.is_ok());
}
