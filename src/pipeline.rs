// src/pipeline.rs
//! Run triggers: scrape (fetch → merge → persist → notify) and digest.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use metrics::{counter, gauge};

use crate::config::AppConfig;
use crate::digest::{render_digest, write_digest};
use crate::ingest::config::IngestConfig;
use crate::ingest::providers::build_adapters;
use crate::ingest::sources::{CachedSourceDirectory, NamedSources, SourceDirectory};
use crate::ingest::transport::{HttpTransport, Transport};
use crate::ingest::types::SourceError;
use crate::ingest::{ensure_metrics_described, AdapterFailure, Aggregator};
use crate::model::Notice;
use crate::notify::{Notifier, RunSummary};
use crate::store::{NoticeStore, StoreError};

#[derive(Debug)]
pub struct RunReport {
    /// Candidates produced across all adapters.
    pub matched: usize,
    /// Rows written by this run.
    pub inserted: Vec<Notice>,
    pub failures: Vec<AdapterFailure>,
    pub elapsed: Duration,
}

/// Adapters from `cfg` over real HTTP. Feed names are registered in the
/// store's `Source` table when `rss.resolve_sources` is set.
pub fn build_aggregator(
    cfg: &IngestConfig,
    store: Arc<dyn NoticeStore>,
) -> Result<Aggregator, SourceError> {
    let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(
        Duration::from_secs(cfg.request_timeout_secs),
        &cfg.user_agent,
    )?);
    let directory: Arc<dyn SourceDirectory> = if cfg.rss.resolve_sources {
        Arc::new(CachedSourceDirectory::new(store))
    } else {
        Arc::new(NamedSources)
    };
    Ok(Aggregator::new(
        build_adapters(cfg, transport, directory),
        Duration::from_secs(cfg.run_deadline_secs),
    ))
}

/// One scrape run. Only store errors abort it; adapter failures are in the
/// report and a notifier failure is logged.
pub async fn run_scrape(
    aggregator: &Aggregator,
    store: &dyn NoticeStore,
    notifier: &dyn Notifier,
    site_url: &str,
) -> Result<RunReport, StoreError> {
    ensure_metrics_described();
    let t0 = Instant::now();

    let outcome = aggregator.run().await;
    let matched = outcome.notices.len();
    tracing::info!(
        matched,
        failed_adapters = outcome.failures.len(),
        "trying to insert notices"
    );

    let report = store.insert_batch(&outcome.notices).await?;
    let inserted = report.inserted_count();
    counter!("store_notices_inserted_total").increment(inserted as u64);
    gauge!("ingest_pipeline_last_run_ts").set(Utc::now().timestamp() as f64);

    let elapsed = t0.elapsed();
    if inserted == 0 {
        tracing::info!("No new notices inserted");
    } else {
        let summary = RunSummary {
            matched,
            inserted,
            elapsed,
            finished_at: Utc::now(),
            site_url: site_url.to_string(),
        };
        if let Err(e) = notifier.notify(&summary, &report.inserted).await {
            tracing::warn!(error = %e, "notification failed");
        }
    }

    tracing::info!(
        matched,
        inserted,
        elapsed_ms = elapsed.as_millis() as u64,
        "scrape run finished"
    );
    Ok(RunReport {
        matched,
        inserted: report.inserted,
        failures: outcome.failures,
        elapsed,
    })
}

/// Render notices stored in the last `digest.window_hours` into today's
/// digest file and return its path.
pub async fn run_digest(
    store: &dyn NoticeStore,
    cfg: &AppConfig,
    now: DateTime<Utc>,
) -> Result<PathBuf> {
    let hours = cfg.digest.window_hours;
    let since = chrono::TimeDelta::try_hours(hours)
        .and_then(|window| now.checked_sub_signed(window))
        .ok_or_else(|| anyhow!("digest window of {hours} hours is out of range"))?;
    let notices = store
        .recent_for_digest(since, cfg.digest.excluded_source.as_deref())
        .await?;

    let date = now.date_naive();
    let content = render_digest(&notices, date, &cfg.site_url);
    let path = write_digest(&cfg.digest.dir, date, &content).await?;
    tracing::info!(count = notices.len(), path = %path.display(), "digest written");
    Ok(path)
}
