// src/model.rs
//! The normalized notice record shared by every adapter, the store and the notifier.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One job posting, normalized from whatever the upstream source sent.
///
/// `id` is generated per candidate and only used for display/linking.
/// Deduplication happens on [`Notice::identity`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Notice {
    pub id: Uuid,
    pub title: String,
    /// Source markup is kept as-is; strip it before showing it anywhere.
    pub body: String,
    pub url: String,
    #[sqlx(rename = "authorName")]
    pub author_name: Option<String>,
    #[sqlx(rename = "authorUrl")]
    pub author_url: Option<String>,
    #[sqlx(rename = "imageUrl")]
    pub image_url: Option<String>,
    #[sqlx(rename = "sourceId")]
    pub source_id: String,
    pub raw: String,
    pub guid: String,
    #[sqlx(rename = "publishedDate")]
    pub published_date: Option<DateTime<Utc>>,
    #[sqlx(rename = "createdAt")]
    pub created_at: Option<DateTime<Utc>>,
    #[sqlx(rename = "updatedAt")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// The `(guid, source_id)` pair a notice is deduplicated on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LogicalKey<'a> {
    pub guid: &'a str,
    pub source_id: &'a str,
}

impl Notice {
    /// Fresh candidate with a new id and empty optional fields.
    pub fn candidate(
        source_id: impl Into<String>,
        guid: impl Into<String>,
        title: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            body: String::new(),
            url: url.into(),
            author_name: None,
            author_url: None,
            image_url: None,
            source_id: source_id.into(),
            raw: String::new(),
            guid: guid.into(),
            published_date: None,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_author(mut self, name: Option<String>, url: Option<String>) -> Self {
        self.author_name = name.filter(|s| !s.is_empty());
        self.author_url = url.filter(|s| !s.is_empty());
        self
    }

    pub fn with_image(mut self, image_url: Option<String>) -> Self {
        self.image_url = image_url.filter(|s| !s.is_empty());
        self
    }

    pub fn with_published(mut self, published: Option<DateTime<Utc>>) -> Self {
        self.published_date = published;
        self
    }

    pub fn with_raw(mut self, raw: String) -> Self {
        self.raw = raw;
        self
    }

    pub fn identity(&self) -> LogicalKey<'_> {
        LogicalKey {
            guid: &self.guid,
            source_id: &self.source_id,
        }
    }
}

/// Serialize an upstream payload for the `raw` column.
/// Falls back to an empty string; a bad payload never blocks the record.
pub fn raw_json<T: Serialize + ?Sized>(value: &T) -> String {
    match serde_json::to_string(value) {
        Ok(s) => s,
        Err(e) => {
            tracing::debug!(error = %e, "raw payload serialization failed");
            String::new()
        }
    }
}

/// Seconds since the epoch → UTC timestamp. Out-of-range values yield `None`.
pub fn from_unix(secs: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(secs, 0)
}
