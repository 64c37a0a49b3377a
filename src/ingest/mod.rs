// src/ingest/mod.rs
pub mod config;
pub mod providers;
pub mod sources;
pub mod transport;
pub mod types;

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, histogram};
use once_cell::sync::OnceCell;
use tokio::task::JoinSet;
use tokio::time::{timeout_at, Instant};

use crate::ingest::types::{SourceAdapter, SourceError};
use crate::model::Notice;

/// One-time metrics registration.
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "ingest_notices_total",
            "Candidate notices produced per adapter."
        );
        describe_counter!(
            "ingest_adapter_errors_total",
            "Adapters that failed, timed out or panicked."
        );
        describe_counter!(
            "ingest_endpoint_errors_total",
            "Failed endpoints inside multi-endpoint adapters."
        );
        describe_histogram!(
            "ingest_adapter_fetch_ms",
            "Adapter fetch time in milliseconds."
        );
        describe_counter!(
            "store_notices_inserted_total",
            "Notices newly written to the store."
        );
        describe_gauge!(
            "ingest_pipeline_last_run_ts",
            "Unix ts when the scrape pipeline last finished."
        );
    });
}

/// An adapter that contributed nothing this run, and why.
#[derive(Debug)]
pub struct AdapterFailure {
    pub adapter: String,
    pub error: SourceError,
}

/// Merged batch of one aggregation run. Order across adapters is unspecified.
#[derive(Debug, Default)]
pub struct AggregateOutcome {
    pub notices: Vec<Notice>,
    pub failures: Vec<AdapterFailure>,
}

/// Fans out to every adapter at once and joins all of them before merging.
///
/// Failures stay with the adapter that produced them: an error, a panic or a
/// blown deadline in one adapter never costs the others their results.
pub struct Aggregator {
    adapters: Vec<Arc<dyn SourceAdapter>>,
    run_deadline: Duration,
}

impl Aggregator {
    pub fn new(adapters: Vec<Arc<dyn SourceAdapter>>, run_deadline: Duration) -> Self {
        Self {
            adapters,
            run_deadline,
        }
    }

    pub fn adapter_names(&self) -> Vec<&str> {
        self.adapters.iter().map(|a| a.name()).collect()
    }

    pub async fn run(&self) -> AggregateOutcome {
        ensure_metrics_described();

        let deadline = Instant::now() + self.run_deadline;
        let mut tasks = JoinSet::new();
        let mut names = HashMap::with_capacity(self.adapters.len());

        for adapter in &self.adapters {
            let a = Arc::clone(adapter);
            let handle = tasks.spawn(async move {
                let t0 = Instant::now();
                let res = match timeout_at(deadline, a.fetch_candidates()).await {
                    Ok(res) => res,
                    Err(_) => Err(SourceError::DeadlineExceeded),
                };
                (res, t0.elapsed())
            });
            names.insert(handle.id(), adapter.name().to_string());
        }

        let mut out = AggregateOutcome::default();
        while let Some(joined) = tasks.join_next_with_id().await {
            let (id, res, elapsed) = match joined {
                Ok((id, (res, elapsed))) => (id, res, Some(elapsed)),
                Err(join_err) => {
                    let id = join_err.id();
                    (id, Err(SourceError::Panicked(join_err.to_string())), None)
                }
            };
            let adapter = names.remove(&id).unwrap_or_else(|| "unknown".to_string());

            if let Some(elapsed) = elapsed {
                histogram!("ingest_adapter_fetch_ms", "adapter" => adapter.clone())
                    .record(elapsed.as_secs_f64() * 1_000.0);
            }

            match res {
                Ok(mut notices) => {
                    tracing::info!(adapter = %adapter, count = notices.len(), "adapter fetched");
                    counter!("ingest_notices_total", "adapter" => adapter.clone())
                        .increment(notices.len() as u64);
                    out.notices.append(&mut notices);
                }
                Err(error) => {
                    tracing::warn!(adapter = %adapter, error = %error, "adapter failed");
                    counter!("ingest_adapter_errors_total", "adapter" => adapter.clone())
                        .increment(1);
                    out.failures.push(AdapterFailure { adapter, error });
                }
            }
        }

        out
    }
}

/// Internal fan-out for multi-endpoint adapters.
///
/// Partial success is success: endpoints that fail are logged and skipped.
/// The adapter fails only if it had endpoints and every one of them failed.
pub async fn gather_endpoints<T, Fut>(
    adapter: &str,
    endpoints: Vec<(String, Fut)>,
) -> Result<Vec<T>, SourceError>
where
    Fut: Future<Output = Result<Vec<T>, SourceError>>,
{
    let total = endpoints.len();
    let (labels, futs): (Vec<String>, Vec<Fut>) = endpoints.into_iter().unzip();
    let results = join_all(futs).await;

    let mut items = Vec::new();
    let mut first_err: Option<SourceError> = None;
    let mut failed = 0usize;

    for (endpoint, res) in labels.into_iter().zip(results) {
        match res {
            Ok(mut v) => items.append(&mut v),
            Err(e) => {
                failed += 1;
                tracing::warn!(adapter, endpoint = %endpoint, error = %e, "endpoint failed");
                counter!("ingest_endpoint_errors_total", "adapter" => adapter.to_string())
                    .increment(1);
                first_err.get_or_insert(e);
            }
        }
    }

    match first_err {
        Some(first) if failed == total => Err(SourceError::AllEndpointsFailed {
            failed,
            first: Box::new(first),
        }),
        _ => Ok(items),
    }
}
