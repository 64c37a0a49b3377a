// src/store/mod.rs
//! Deduplicating notice store.
//!
//! Rows are unique on `(guid, "sourceId")`. `insert_batch` writes the whole
//! batch in one transaction with `ON CONFLICT DO NOTHING` and reports the rows
//! that were actually written via `RETURNING`, so the per-run delta stays
//! correct even when another writer is active.

pub mod postgres;
pub mod sqlite;

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::Notice;

/// Rows per INSERT statement. 13 binds per row keeps both backends well
/// below their bind-parameter limits.
pub(crate) const INSERT_CHUNK: usize = 1000;

pub(crate) const NOTICE_COLUMNS: &str = r#"id, title, body, url, "authorName", "authorUrl", "imageUrl", "sourceId", raw, guid, "publishedDate", "createdAt", "updatedAt""#;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unsupported database url: {0}")]
    UnsupportedUrl(String),

    #[error("database connection failed: {0}")]
    Connect(#[source] sqlx::Error),

    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("query failed: {0}")]
    Query(#[from] sqlx::Error),
}

/// Outcome of one `insert_batch` call.
#[derive(Debug, Clone, Default)]
pub struct InsertReport {
    /// Candidates handed to the store, before any dedup.
    pub attempted: usize,
    /// Rows written by this call, newest state as stored.
    pub inserted: Vec<Notice>,
}

impl InsertReport {
    pub fn inserted_count(&self) -> usize {
        self.inserted.len()
    }
}

#[async_trait]
pub trait NoticeStore: Send + Sync {
    /// Insert every notice whose `(guid, source_id)` is not stored yet.
    /// Existing rows are left untouched. All-or-nothing.
    async fn insert_batch(&self, notices: &[Notice]) -> Result<InsertReport, StoreError>;

    async fn count(&self) -> Result<i64, StoreError>;

    /// The `n` most recently created notices, newest first.
    async fn latest(&self, n: usize) -> Result<Vec<Notice>, StoreError>;

    /// Notices created at or after `since`, minus `excluded_source`,
    /// ordered by publish date (newest first, undated last).
    async fn recent_for_digest(
        &self,
        since: DateTime<Utc>,
        excluded_source: Option<&str>,
    ) -> Result<Vec<Notice>, StoreError>;

    /// Id of the `Source` row called `name`, registering it if absent.
    async fn source_id_for(&self, name: &str) -> Result<String, StoreError>;
}

/// Open the backend matching the URL scheme and apply migrations.
pub async fn connect(url: &str) -> Result<Arc<dyn NoticeStore>, StoreError> {
    if url.starts_with("postgres://") || url.starts_with("postgresql://") {
        Ok(Arc::new(postgres::PgNoticeStore::connect(url).await?))
    } else if url.starts_with("sqlite:") {
        Ok(Arc::new(sqlite::SqliteNoticeStore::connect(url).await?))
    } else {
        // Never echo credentials.
        let scheme = url.split(':').next().unwrap_or_default();
        Err(StoreError::UnsupportedUrl(format!("{scheme}://…")))
    }
}

/// Drop repeats of the same logical identity inside one batch; first one wins.
pub(crate) fn unique_by_identity(notices: &[Notice]) -> Vec<&Notice> {
    let mut seen = HashSet::with_capacity(notices.len());
    notices
        .iter()
        .filter(|n| seen.insert(n.identity()))
        .collect()
}
