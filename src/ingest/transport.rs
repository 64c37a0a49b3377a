// src/ingest/transport.rs
//! HTTP access for adapters, behind a trait so fixtures can stand in for the network.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use super::types::SourceError;

#[async_trait]
pub trait Transport: Send + Sync {
    /// GET `url` and return the body of a 2xx response.
    async fn get_text(&self, url: &str) -> Result<String, SourceError>;
}

#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| SourceError::Http {
                url: String::new(),
                source: e,
            })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get_text(&self, url: &str) -> Result<String, SourceError> {
        let rsp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| SourceError::Http {
                url: url.to_string(),
                source: e,
            })?;

        let status = rsp.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        rsp.text().await.map_err(|e| SourceError::Http {
            url: url.to_string(),
            source: e,
        })
    }
}

// --- Test helper ---

enum Canned {
    Body(String),
    Status(u16),
    Unreachable(String),
}

/// Serves canned bodies per URL. Unknown URLs answer 404.
#[derive(Default)]
pub struct FixtureTransport {
    routes: HashMap<String, Canned>,
    delays: HashMap<String, Duration>,
}

impl FixtureTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_body(mut self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.routes.insert(url.into(), Canned::Body(body.into()));
        self
    }

    pub fn with_status(mut self, url: impl Into<String>, status: u16) -> Self {
        self.routes.insert(url.into(), Canned::Status(status));
        self
    }

    pub fn with_unreachable(mut self, url: impl Into<String>, message: impl Into<String>) -> Self {
        self.routes
            .insert(url.into(), Canned::Unreachable(message.into()));
        self
    }

    /// Sleep before answering `url`.
    pub fn with_delay(mut self, url: impl Into<String>, delay: Duration) -> Self {
        self.delays.insert(url.into(), delay);
        self
    }
}

#[async_trait]
impl Transport for FixtureTransport {
    async fn get_text(&self, url: &str) -> Result<String, SourceError> {
        if let Some(delay) = self.delays.get(url) {
            tokio::time::sleep(*delay).await;
        }
        match self.routes.get(url) {
            Some(Canned::Body(b)) => Ok(b.clone()),
            Some(Canned::Status(status)) => Err(SourceError::Status {
                url: url.to_string(),
                status: *status,
            }),
            Some(Canned::Unreachable(message)) => Err(SourceError::Unreachable {
                url: url.to_string(),
                message: message.clone(),
            }),
            None => Err(SourceError::Status {
                url: url.to_string(),
                status: 404,
            }),
        }
    }
}
