// src/ingest/providers/hackernews.rs
//! Top-level comments of the monthly "Ask HN: Who is hiring?" thread.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::ingest::config::HackerNewsConfig;
use crate::ingest::gather_endpoints;
use crate::ingest::transport::Transport;
use crate::ingest::types::{SourceAdapter, SourceError};
use crate::model::{from_unix, Notice};
use crate::text::unescape_html;

pub const HN_SOURCE: &str = "HackerNews";
const API_BASE: &str = "https://hacker-news.firebaseio.com/v0";
/// Account that posts the monthly hiring threads.
const HIRING_ACCOUNT: &str = "whoishiring";

#[derive(Debug, Deserialize)]
struct HnItem {
    id: u64,
    #[serde(default)]
    by: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    time: i64,
    #[serde(default)]
    kids: Vec<u64>,
    #[serde(default)]
    deleted: bool,
    #[serde(default)]
    dead: bool,
}

#[derive(Debug, Deserialize)]
struct HnUser {
    #[serde(default)]
    submitted: Vec<u64>,
}

pub fn item_url(id: u64) -> String {
    format!("{API_BASE}/item/{id}.json")
}

pub fn user_url(name: &str) -> String {
    format!("{API_BASE}/user/{name}.json")
}

fn parse_item(json: &str, id: u64) -> Result<HnItem, SourceError> {
    serde_json::from_str(json).map_err(|e| SourceError::decode(format!("hn item {id}"), e))
}

/// Split a comment into (title, body).
///
/// The title is whatever precedes the first tag (usually the
/// "Company | Role | Location" line); unmarked text gets its first 20
/// characters as title. Bracket characters never survive in the title.
pub fn extract_title(text: &str) -> (String, String) {
    let (title, body) = match text.find('<') {
        Some(idx) => (&text[..idx], &text[idx..]),
        None => match text.char_indices().nth(20) {
            Some((idx, _)) => (&text[..idx], &text[idx..]),
            None => (text, text),
        },
    };

    let title: String = title
        .chars()
        .filter(|c| !matches!(c, '(' | ')' | '[' | ']' | '{' | '}'))
        .collect();

    (unescape_html(&title).trim().to_string(), unescape_html(body))
}

fn comment_to_notice(item: HnItem, raw: String, min_len: usize) -> Option<Notice> {
    if item.deleted || item.dead {
        return None;
    }
    let text = item.text.unwrap_or_default();
    let (title, body) = extract_title(&text);
    if title.chars().count() < min_len && body.chars().count() < min_len {
        tracing::debug!(id = item.id, "hn comment too short, dropped");
        return None;
    }

    let author_url = item
        .by
        .as_deref()
        .map(|by| format!("https://news.ycombinator.com/user?id={by}"));
    Some(
        Notice::candidate(
            HN_SOURCE,
            item.id.to_string(),
            title,
            format!("https://news.ycombinator.com/item?id={}", item.id),
        )
        .with_body(body)
        .with_author(item.by, author_url)
        .with_published(from_unix(item.time))
        .with_raw(raw),
    )
}

pub struct HackerNewsAdapter {
    cfg: HackerNewsConfig,
    transport: Arc<dyn Transport>,
}

impl HackerNewsAdapter {
    pub fn new(cfg: HackerNewsConfig, transport: Arc<dyn Transport>) -> Self {
        Self { cfg, transport }
    }

    async fn fetch_item(&self, id: u64) -> Result<(HnItem, String), SourceError> {
        let body = self.transport.get_text(&item_url(id)).await?;
        let item = parse_item(&body, id)?;
        Ok((item, body))
    }

    /// Newest "who is hiring" story among the account's recent submissions.
    async fn discover_thread(&self) -> Result<u64, SourceError> {
        let url = user_url(HIRING_ACCOUNT);
        let body = self.transport.get_text(&url).await?;
        let user: HnUser =
            serde_json::from_str(&body).map_err(|e| SourceError::decode("hn user", e))?;

        for id in user.submitted.into_iter().take(self.cfg.discovery_depth) {
            let (item, _) = self.fetch_item(id).await?;
            let is_hiring = item
                .title
                .as_deref()
                .is_some_and(|t| t.to_lowercase().contains("who is hiring"));
            if is_hiring {
                tracing::info!(thread_id = id, "discovered hiring thread");
                return Ok(id);
            }
        }
        Err(SourceError::decode(
            "hn hiring thread",
            format!("none among the latest {} submissions", self.cfg.discovery_depth),
        ))
    }

    async fn fetch_comment(&self, id: u64) -> Result<Vec<Notice>, SourceError> {
        let (item, raw) = self.fetch_item(id).await?;
        Ok(comment_to_notice(item, raw, self.cfg.min_len)
            .into_iter()
            .collect())
    }
}

#[async_trait]
impl SourceAdapter for HackerNewsAdapter {
    async fn fetch_candidates(&self) -> Result<Vec<Notice>, SourceError> {
        let thread_id = match self.cfg.thread_id {
            Some(id) => id,
            None => self.discover_thread().await?,
        };
        let (thread, _) = self.fetch_item(thread_id).await?;

        // Higher ids are newer comments.
        let mut kids = thread.kids;
        kids.sort_unstable_by(|a, b| b.cmp(a));
        kids.truncate(self.cfg.limit);

        let endpoints = kids
            .into_iter()
            .map(|id| (format!("item {id}"), self.fetch_comment(id)))
            .collect();
        gather_endpoints(self.name(), endpoints).await
    }

    fn name(&self) -> &str {
        HN_SOURCE
    }
}
