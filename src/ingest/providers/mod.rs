// src/ingest/providers/mod.rs
pub mod hackernews;
pub mod reddit;
pub mod rss_feed;

use std::sync::Arc;

use crate::ingest::config::IngestConfig;
use crate::ingest::sources::SourceDirectory;
use crate::ingest::transport::Transport;
use crate::ingest::types::SourceAdapter;

use hackernews::HackerNewsAdapter;
use reddit::RedditAdapter;
use rss_feed::RssFeedAdapter;

/// Every adapter enabled in `cfg`, sharing one transport.
pub fn build_adapters(
    cfg: &IngestConfig,
    transport: Arc<dyn Transport>,
    directory: Arc<dyn SourceDirectory>,
) -> Vec<Arc<dyn SourceAdapter>> {
    let mut adapters: Vec<Arc<dyn SourceAdapter>> = Vec::new();

    if cfg.rss.enabled {
        adapters.push(Arc::new(RssFeedAdapter::new(
            cfg.rss.feeds.clone(),
            Arc::clone(&transport),
            directory,
        )));
    }
    if cfg.reddit.enabled {
        adapters.push(Arc::new(RedditAdapter::new(
            cfg.reddit.clone(),
            Arc::clone(&transport),
        )));
    }
    if cfg.hackernews.enabled {
        adapters.push(Arc::new(HackerNewsAdapter::new(
            cfg.hackernews.clone(),
            transport,
        )));
    }

    tracing::debug!(count = adapters.len(), "adapters built");
    adapters
}
