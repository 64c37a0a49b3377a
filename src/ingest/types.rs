// src/ingest/types.rs
use async_trait::async_trait;
use thiserror::Error;

use crate::model::Notice;

/// Why a source (or one of its endpoints) contributed nothing this run.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("request to {url} failed: {message}")]
    Unreachable { url: String, message: String },

    #[error("could not decode {what}: {message}")]
    Decode { what: String, message: String },

    #[error("source lookup for {name} failed: {message}")]
    Directory { name: String, message: String },

    #[error("all {failed} endpoints failed, first error: {first}")]
    AllEndpointsFailed { failed: usize, first: Box<SourceError> },

    #[error("run deadline exceeded")]
    DeadlineExceeded,

    #[error("adapter task aborted: {0}")]
    Panicked(String),
}

impl SourceError {
    pub fn decode(what: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Decode {
            what: what.into(),
            message: err.to_string(),
        }
    }
}

/// One pluggable upstream. Implementations do their own wire-format mapping
/// and must finish within their request timeouts.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    async fn fetch_candidates(&self) -> Result<Vec<Notice>, SourceError>;
    fn name(&self) -> &str;
}
