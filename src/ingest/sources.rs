// src/ingest/sources.rs
//! Resolution of human-readable feed names to the `source_id` stored on notices.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::types::SourceError;
use crate::store::NoticeStore;

#[async_trait]
pub trait SourceDirectory: Send + Sync {
    async fn resolve(&self, name: &str) -> Result<String, SourceError>;
}

/// Uses the feed name itself as the source id.
#[derive(Debug, Default, Clone, Copy)]
pub struct NamedSources;

#[async_trait]
impl SourceDirectory for NamedSources {
    async fn resolve(&self, name: &str) -> Result<String, SourceError> {
        Ok(name.to_string())
    }
}

/// Looks names up in the store's `Source` table, at most once per name.
/// Build one per run.
pub struct CachedSourceDirectory {
    store: Arc<dyn NoticeStore>,
    cache: Mutex<HashMap<String, String>>,
}

impl CachedSourceDirectory {
    pub fn new(store: Arc<dyn NoticeStore>) -> Self {
        Self {
            store,
            cache: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl SourceDirectory for CachedSourceDirectory {
    async fn resolve(&self, name: &str) -> Result<String, SourceError> {
        // Held across the lookup so concurrent feeds sharing a name hit the store once.
        let mut cache = self.cache.lock().await;
        if let Some(id) = cache.get(name) {
            return Ok(id.clone());
        }

        let id = self
            .store
            .source_id_for(name)
            .await
            .map_err(|e| SourceError::Directory {
                name: name.to_string(),
                message: e.to_string(),
            })?;
        cache.insert(name.to_string(), id.clone());
        Ok(id)
    }
}
