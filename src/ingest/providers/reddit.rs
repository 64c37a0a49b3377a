// src/ingest/providers/reddit.rs
//! Subreddit listings via the public JSON endpoints, one request per subreddit.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::ingest::config::RedditConfig;
use crate::ingest::gather_endpoints;
use crate::ingest::transport::Transport;
use crate::ingest::types::{SourceAdapter, SourceError};
use crate::model::{from_unix, raw_json, Notice};
use crate::text::unescape_html;

pub const REDDIT_SOURCE: &str = "Reddit";

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Child>,
}

#[derive(Debug, Deserialize)]
struct Child {
    data: Post,
}

#[derive(Debug, Deserialize, Serialize)]
struct Post {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    selftext_html: Option<String>,
    #[serde(default)]
    permalink: String,
    #[serde(default)]
    author: String,
    #[serde(default)]
    created_utc: f64,
    #[serde(default)]
    preview: Option<Preview>,
}

#[derive(Debug, Deserialize, Serialize)]
struct Preview {
    #[serde(default)]
    images: Vec<PreviewImage>,
}

#[derive(Debug, Deserialize, Serialize)]
struct PreviewImage {
    source: ImageSource,
}

#[derive(Debug, Deserialize, Serialize)]
struct ImageSource {
    url: String,
}

fn is_hiring_post(title: &str, filter: &str) -> bool {
    filter.is_empty() || title.to_lowercase().contains(&filter.to_lowercase())
}

fn post_to_notice(post: Post) -> Notice {
    let raw = raw_json(&post);
    let permalink = if post.permalink.starts_with('/') {
        post.permalink.clone()
    } else {
        format!("/{}", post.permalink)
    };
    let image = post
        .preview
        .as_ref()
        .and_then(|p| p.images.first())
        // Preview URLs come entity-encoded (`&amp;`).
        .map(|img| unescape_html(&img.source.url));
    let author_url = format!("https://www.reddit.com/user/{}", post.author);

    Notice::candidate(
        REDDIT_SOURCE,
        post.id,
        post.title,
        format!("https://www.reddit.com{permalink}"),
    )
    .with_body(unescape_html(post.selftext_html.as_deref().unwrap_or_default()))
    .with_author(Some(post.author), Some(author_url))
    .with_image(image)
    .with_published(from_unix(post.created_utc as i64))
    .with_raw(raw)
}

/// Parse one listing page, keeping posts whose title passes `title_filter`.
pub fn parse_listing(json: &str, title_filter: &str) -> Result<Vec<Notice>, SourceError> {
    let listing: Listing =
        serde_json::from_str(json).map_err(|e| SourceError::decode("reddit listing", e))?;
    Ok(listing
        .data
        .children
        .into_iter()
        .map(|c| c.data)
        .filter(|p| is_hiring_post(&p.title, title_filter))
        .map(post_to_notice)
        .collect())
}

pub struct RedditAdapter {
    cfg: RedditConfig,
    transport: Arc<dyn Transport>,
}

impl RedditAdapter {
    pub fn new(cfg: RedditConfig, transport: Arc<dyn Transport>) -> Self {
        Self { cfg, transport }
    }

    pub fn listing_url(&self, subreddit: &str) -> String {
        format!(
            "https://www.reddit.com/r/{subreddit}/new.json?limit={}&t={}",
            self.cfg.limit, self.cfg.window
        )
    }

    async fn fetch_subreddit(&self, subreddit: &str) -> Result<Vec<Notice>, SourceError> {
        let body = self.transport.get_text(&self.listing_url(subreddit)).await?;
        parse_listing(&body, &self.cfg.title_filter)
    }
}

#[async_trait]
impl SourceAdapter for RedditAdapter {
    async fn fetch_candidates(&self) -> Result<Vec<Notice>, SourceError> {
        let endpoints = self
            .cfg
            .subreddits
            .iter()
            .map(|sr| (format!("r/{sr}"), self.fetch_subreddit(sr)))
            .collect();
        gather_endpoints(self.name(), endpoints).await
    }

    fn name(&self) -> &str {
        REDDIT_SOURCE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"{
      "kind": "Listing",
      "data": {
        "children": [
          {"kind": "t3", "data": {
            "id": "1abcde",
            "title": "[Hiring] Rust developer (remote)",
            "selftext_html": "&lt;p&gt;Pay: $80/h&lt;/p&gt;",
            "permalink": "/r/forhire/comments/1abcde/hiring_rust_developer/",
            "author": "acme_hr",
            "created_utc": 1727776800.0,
            "preview": {"images": [{"source": {"url": "https://preview.redd.it/x.png?a=1&amp;b=2"}}]}
          }},
          {"kind": "t3", "data": {
            "id": "2fghij",
            "title": "[For Hire] Designer available",
            "selftext_html": null,
            "permalink": "/r/forhire/comments/2fghij/",
            "author": "someone",
            "created_utc": 1727776900.0
          }}
        ]
      }
    }"#;

    #[test]
    fn only_hiring_posts_are_kept() {
        let notices = parse_listing(LISTING, "[hiring]").unwrap();
        assert_eq!(notices.len(), 1);
        let n = &notices[0];
        assert_eq!(n.guid, "1abcde");
        assert_eq!(n.source_id, REDDIT_SOURCE);
        assert_eq!(
            n.url,
            "https://www.reddit.com/r/forhire/comments/1abcde/hiring_rust_developer/"
        );
        assert_eq!(n.body, "<p>Pay: $80/h</p>");
        assert_eq!(n.author_name.as_deref(), Some("acme_hr"));
        assert_eq!(
            n.author_url.as_deref(),
            Some("https://www.reddit.com/user/acme_hr")
        );
        assert_eq!(
            n.image_url.as_deref(),
            Some("https://preview.redd.it/x.png?a=1&b=2")
        );
        assert_eq!(n.published_date.map(|d| d.timestamp()), Some(1_727_776_800));
        assert!(n.raw.contains("1abcde"));
    }

    #[test]
    fn empty_filter_keeps_everything() {
        assert_eq!(parse_listing(LISTING, "").unwrap().len(), 2);
    }

    #[test]
    fn bad_json_is_a_decode_error() {
        assert!(matches!(
            parse_listing("{\"data\": 1}", "[hiring]"),
            Err(SourceError::Decode { .. })
        ));
    }
}
