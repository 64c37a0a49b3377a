// src/notify/mod.rs
//! Run summaries for humans. Delivery is best effort: callers log failures
//! and carry on.

pub mod discord;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::model::Notice;
use crate::text::{plain_excerpt, strip_markup, truncate_chars};

pub use discord::DiscordNotifier;

/// Max embed title length accepted by Discord.
pub const EMBED_TITLE_MAX: usize = 256;
/// Body excerpt length shown per notice.
pub const EMBED_BODY_MAX: usize = 500;
/// Embeds per webhook message.
pub const EMBEDS_PER_MESSAGE: usize = 10;

#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Candidates produced by all adapters.
    pub matched: usize,
    /// Rows the store actually wrote.
    pub inserted: usize,
    pub elapsed: Duration,
    pub finished_at: DateTime<Utc>,
    pub site_url: String,
}

impl RunSummary {
    pub fn message(&self) -> String {
        format!(
            "Successfully ran scrape at: {}\nNotices matched: {}\nNew notices: {}\nRuntime: {:.2?}\nSite URL: {}/",
            self.finished_at.format("%B %-d, %Y %H:%M:%S"),
            self.matched,
            self.inserted,
            self.elapsed,
            self.site_url
        )
    }
}

/// Display-ready form of one new notice.
#[derive(Debug, Clone, PartialEq)]
pub struct NoticeCard {
    pub title: String,
    pub url: String,
    pub description: String,
}

impl NoticeCard {
    pub fn from_notice(n: &Notice, site_url: &str) -> Self {
        Self {
            // Room for the ellipsis.
            title: truncate_chars(&strip_markup(&n.title), EMBED_TITLE_MAX - 3),
            url: n.url.clone(),
            description: format!(
                "{}\n[View on site]({}/{})",
                plain_excerpt(&n.body, EMBED_BODY_MAX),
                site_url,
                n.id
            ),
        }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Report one finished run. `fresh` holds only the rows inserted by it.
    async fn notify(&self, summary: &RunSummary, fresh: &[Notice]) -> Result<()>;
}

/// Fallback when no chat webhook is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, summary: &RunSummary, fresh: &[Notice]) -> Result<()> {
        tracing::info!(
            matched = summary.matched,
            inserted = summary.inserted,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "run summary (no webhook configured)"
        );
        for n in fresh {
            tracing::debug!(source = %n.source_id, title = %n.title, url = %n.url, "new notice");
        }
        Ok(())
    }
}

/// Discord when a webhook is given, log-only otherwise.
pub fn notifier_for(webhook: Option<String>) -> Arc<dyn Notifier> {
    match webhook {
        Some(url) => Arc::new(DiscordNotifier::new(url)),
        None => {
            tracing::info!("DISCORD_WEBHOOK_URL not set; summaries go to the log");
            Arc::new(LogNotifier)
        }
    }
}
