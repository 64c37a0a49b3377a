use super::{NoticeCard, Notifier, RunSummary, EMBEDS_PER_MESSAGE};
use crate::model::Notice;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

#[derive(Clone)]
pub struct DiscordNotifier {
    webhook: String,
    client: Client,
    timeout: Duration,
    max_retries: u8,
}

impl DiscordNotifier {
    pub fn new(webhook: String) -> Self {
        Self {
            webhook,
            client: Client::new(),
            timeout: Duration::from_secs(5),
            max_retries: 3,
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    pub fn with_retries(mut self, retries: u8) -> Self {
        self.max_retries = retries.max(1);
        self
    }

    async fn post(&self, payload: &DiscordWebhookPayload) -> Result<()> {
        let mut attempt: u8 = 0;
        loop {
            attempt += 1;
            let res = self
                .client
                .post(&self.webhook)
                .timeout(self.timeout)
                .json(payload)
                .send()
                .await;

            let err = match res {
                Ok(rsp) => match rsp.error_for_status_ref() {
                    Ok(_) => return Ok(()),
                    Err(e) => anyhow!("Discord webhook HTTP error: {e}"),
                },
                Err(e) => anyhow!("Discord webhook request failed: {e}"),
            };
            if attempt >= self.max_retries {
                return Err(err);
            }
            tracing::debug!(attempt, error = %err, "discord post failed, retrying");
            tokio::time::sleep(Duration::from_millis(500u64 << (attempt - 1))).await;
        }
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn notify(&self, summary: &RunSummary, fresh: &[Notice]) -> Result<()> {
        let cards: Vec<NoticeCard> = fresh
            .iter()
            .map(|n| NoticeCard::from_notice(n, &summary.site_url))
            .collect();

        // One bad message must not swallow the ones after it.
        let payloads = build_payloads(&summary.message(), &cards);
        let total = payloads.len();
        let mut failed = 0usize;
        let mut first_err = None;
        for (i, payload) in payloads.iter().enumerate() {
            if let Err(e) = self.post(payload).await {
                tracing::warn!(part = i + 1, total, error = %e, "discord message not delivered");
                failed += 1;
                first_err.get_or_insert(e);
            }
        }

        match first_err {
            None => Ok(()),
            Some(e) => Err(anyhow!(
                "{failed} of {total} Discord messages failed, first error: {e}"
            )),
        }
    }
}

/// Summary text on the first message, cards spread over as many messages
/// as the per-message embed cap requires.
fn build_payloads(message: &str, cards: &[NoticeCard]) -> Vec<DiscordWebhookPayload> {
    let mut payloads: Vec<DiscordWebhookPayload> = cards
        .chunks(EMBEDS_PER_MESSAGE)
        .map(|chunk| DiscordWebhookPayload {
            content: None,
            embeds: chunk.iter().map(DiscordEmbed::from).collect(),
        })
        .collect();

    match payloads.first_mut() {
        Some(first) => first.content = Some(message.to_string()),
        None => payloads.push(DiscordWebhookPayload {
            content: Some(message.to_string()),
            embeds: Vec::new(),
        }),
    }
    payloads
}

#[derive(Debug, Serialize)]
struct DiscordEmbed {
    title: String,
    url: String,
    description: String,
}

impl From<&NoticeCard> for DiscordEmbed {
    fn from(c: &NoticeCard) -> Self {
        Self {
            title: c.title.clone(),
            url: c.url.clone(),
            description: c.description.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
struct DiscordWebhookPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    embeds: Vec<DiscordEmbed>,
}
