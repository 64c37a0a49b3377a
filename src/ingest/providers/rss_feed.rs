// src/ingest/providers/rss_feed.rs
//! Syndication feeds (RSS 2.0 and Atom). Several feed URLs form one adapter.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use once_cell::sync::OnceCell;
use quick_xml::de::from_str;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use time::format_description::well_known::{Rfc2822, Rfc3339};
use time::OffsetDateTime;

use crate::ingest::config::FeedConfig;
use crate::ingest::gather_endpoints;
use crate::ingest::sources::SourceDirectory;
use crate::ingest::transport::Transport;
use crate::ingest::types::{SourceAdapter, SourceError};
use crate::model::{from_unix, raw_json, Notice};

// --- RSS 2.0 (rss crate) ---

/// The fields of an `rss::Item` this crate reads, kept as the row's raw payload.
#[derive(Debug, Serialize)]
struct RawItem<'a> {
    title: Option<&'a str>,
    link: Option<&'a str>,
    guid: Option<&'a str>,
    #[serde(rename = "pubDate")]
    pub_date: Option<&'a str>,
    description: Option<&'a str>,
    content: Option<&'a str>,
    author: Option<&'a str>,
    creator: Option<&'a str>,
    image: Option<&'a str>,
}

// --- Atom ---
// Repeated children are `Vec`s; quick-xml's `overlapped-lists` lets them be non-contiguous.

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(rename = "entry", default)]
    entry: Vec<Entry>,
}

#[derive(Debug, Deserialize, Serialize)]
struct Entry {
    id: Option<TextNode>,
    title: Option<TextNode>,
    #[serde(default)]
    link: Vec<AtomLink>,
    summary: Option<TextNode>,
    // `media:content` shares the local name.
    #[serde(default)]
    content: Vec<TextNode>,
    published: Option<String>,
    updated: Option<String>,
    #[serde(default)]
    author: Vec<AtomAuthor>,
}

#[derive(Debug, Deserialize, Serialize)]
struct TextNode {
    #[serde(rename = "$text", default)]
    value: String,
}

#[derive(Debug, Deserialize, Serialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: Option<String>,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
struct AtomAuthor {
    name: Option<String>,
    email: Option<String>,
    uri: Option<String>,
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn non_empty_str(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_rfc2822(ts: &str) -> Option<DateTime<Utc>> {
    let ts = ts.trim();
    OffsetDateTime::parse(ts, &Rfc2822)
        .ok()
        .and_then(|dt| from_unix(dt.unix_timestamp()))
        // Feeds love non-standard zone names; chrono is more lenient there.
        .or_else(|| {
            DateTime::parse_from_rfc2822(ts)
                .ok()
                .map(|dt| dt.with_timezone(&Utc))
        })
}

fn parse_rfc3339(ts: &str) -> Option<DateTime<Utc>> {
    OffsetDateTime::parse(ts.trim(), &Rfc3339)
        .ok()
        .and_then(|dt| from_unix(dt.unix_timestamp()))
}

/// Turn one feed document into notices attributed to `source_id`.
/// Items without any usable identifier are dropped.
pub fn parse_feed(xml: &str, source_id: &str) -> Result<Vec<Notice>, SourceError> {
    let xml_clean = scrub_html_entities_for_xml(xml);
    if looks_like_atom(&xml_clean) {
        let feed: AtomFeed =
            from_str(&xml_clean).map_err(|e| SourceError::decode("atom feed xml", e))?;
        Ok(feed
            .entry
            .into_iter()
            .filter_map(|e| entry_to_notice(e, source_id))
            .collect())
    } else {
        let channel = rss::Channel::read_from(xml_clean.as_bytes())
            .map_err(|e| SourceError::decode("rss feed xml", e))?;
        Ok(channel
            .items()
            .iter()
            .filter_map(|it| item_to_notice(it, source_id))
            .collect())
    }
}

fn looks_like_atom(xml: &str) -> bool {
    !xml.contains("<rss") && !xml.contains("<channel") && xml.contains("<feed")
}

/// `dc:creator`, whether or not the feed declared the Dublin Core namespace.
fn dc_creator(it: &rss::Item) -> Option<&str> {
    it.dublin_core_ext()
        .and_then(|dc| dc.creators().first().map(String::as_str))
        .or_else(|| extension_value(it, "dc", "creator"))
}

fn extension_value<'a>(it: &'a rss::Item, prefix: &str, name: &str) -> Option<&'a str> {
    it.extensions()
        .get(prefix)?
        .get(name)?
        .iter()
        .find_map(|ext| ext.value())
}

/// First `<enclosure>`, else the first `<media:content>` carrying a url.
fn item_image(it: &rss::Item) -> Option<&str> {
    let media = || {
        it.extensions()
            .get("media")?
            .get("content")?
            .iter()
            .find_map(|ext| ext.attrs().get("url").map(String::as_str))
    };
    it.enclosure()
        .map(|e| e.url())
        .filter(|u| !u.trim().is_empty())
        .or_else(media)
}

fn item_to_notice(it: &rss::Item, source_id: &str) -> Option<Notice> {
    let link = non_empty_str(it.link());
    let guid = non_empty_str(it.guid().map(|g| g.value())).or(link);
    let Some(guid) = guid else {
        tracing::debug!(source = source_id, "feed item without guid or link dropped");
        return None;
    };

    let body = non_empty_str(it.description()).or_else(|| non_empty_str(it.content()));
    let creator = non_empty_str(dc_creator(it));
    let author = non_empty_str(it.author());
    let image = item_image(it);
    let raw = raw_json(&RawItem {
        title: it.title(),
        link: it.link(),
        guid: it.guid().map(|g| g.value()),
        pub_date: it.pub_date(),
        description: it.description(),
        content: it.content(),
        author: it.author(),
        creator,
        image,
    });

    Some(
        Notice::candidate(
            source_id,
            guid,
            it.title().unwrap_or_default().trim(),
            link.unwrap_or_default(),
        )
        .with_body(body.unwrap_or_default())
        .with_author(
            creator.or(author).map(str::to_string),
            author.map(str::to_string),
        )
        .with_image(image.map(str::to_string))
        .with_published(it.pub_date().and_then(parse_rfc2822))
        .with_raw(raw),
    )
}

fn entry_to_notice(e: Entry, source_id: &str) -> Option<Notice> {
    let raw = raw_json(&e);
    let link = e
        .link
        .iter()
        .find(|l| l.rel.as_deref().map_or(true, |r| r == "alternate"))
        .or_else(|| e.link.first())
        .and_then(|l| non_empty(l.href.clone()));
    let guid = non_empty(e.id.map(|t| t.value)).or_else(|| link.clone());
    let Some(guid) = guid else {
        tracing::debug!(source = source_id, "atom entry without id or link dropped");
        return None;
    };

    let body = e
        .content
        .into_iter()
        .find_map(|t| non_empty(Some(t.value)))
        .or_else(|| non_empty(e.summary.map(|t| t.value)))
        .unwrap_or_default();
    let published = e
        .published
        .as_deref()
        .or(e.updated.as_deref())
        .and_then(parse_rfc3339);
    let (author_name, author_url) = match e.author.into_iter().next() {
        Some(a) => (non_empty(a.name), non_empty(a.uri).or_else(|| non_empty(a.email))),
        None => (None, None),
    };

    Some(
        Notice::candidate(
            source_id,
            guid,
            e.title.map(|t| t.value).unwrap_or_default().trim(),
            link.unwrap_or_default(),
        )
        .with_body(body)
        .with_author(author_name, author_url)
        .with_published(published)
        .with_raw(raw),
    )
}

/// All configured feeds as one logical source.
pub struct RssFeedAdapter {
    feeds: Vec<FeedConfig>,
    transport: Arc<dyn Transport>,
    directory: Arc<dyn SourceDirectory>,
}

impl RssFeedAdapter {
    pub fn new(
        feeds: Vec<FeedConfig>,
        transport: Arc<dyn Transport>,
        directory: Arc<dyn SourceDirectory>,
    ) -> Self {
        Self {
            feeds,
            transport,
            directory,
        }
    }

    async fn fetch_feed(&self, feed: &FeedConfig) -> Result<Vec<Notice>, SourceError> {
        let body = self.transport.get_text(&feed.url).await?;
        let source_id = self.directory.resolve(&feed.source).await?;
        let notices = parse_feed(&body, &source_id)?;
        tracing::debug!(feed = %feed.url, count = notices.len(), "feed parsed");
        Ok(notices)
    }
}

#[async_trait]
impl SourceAdapter for RssFeedAdapter {
    async fn fetch_candidates(&self) -> Result<Vec<Notice>, SourceError> {
        let endpoints = self
            .feeds
            .iter()
            .map(|f| (format!("{} ({})", f.source, f.url), self.fetch_feed(f)))
            .collect();
        gather_endpoints(self.name(), endpoints).await
    }

    fn name(&self) -> &str {
        "RSS Feeds"
    }
}

/// HTML named entities are undefined in XML. Rewrite each one as numeric
/// character references; unknown names become literal text.
fn scrub_html_entities_for_xml(s: &str) -> String {
    static RE_ENTITY: OnceCell<Regex> = OnceCell::new();
    let re = RE_ENTITY
        .get_or_init(|| Regex::new(r"&([A-Za-z][A-Za-z0-9]*);").expect("static regex"));

    re.replace_all(s, |caps: &Captures| {
        let name = &caps[1];
        if matches!(name, "amp" | "lt" | "gt" | "quot" | "apos") {
            return caps[0].to_string();
        }
        let decoded = html_escape::decode_html_entities(&caps[0]);
        if decoded == caps[0] {
            format!("&amp;{name};")
        } else {
            decoded.chars().map(|c| format!("&#{};", c as u32)).collect()
        }
    })
    .into_owned()
}
