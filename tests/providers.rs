// tests/providers.rs
use std::sync::Arc;

use notice_harvester::ingest::config::{FeedConfig, HackerNewsConfig, RedditConfig};
use notice_harvester::ingest::providers::hackernews::{item_url, user_url, HackerNewsAdapter};
use notice_harvester::ingest::providers::reddit::RedditAdapter;
use notice_harvester::ingest::providers::rss_feed::RssFeedAdapter;
use notice_harvester::ingest::sources::{CachedSourceDirectory, NamedSources};
use notice_harvester::ingest::transport::FixtureTransport;
use notice_harvester::ingest::types::{SourceAdapter, SourceError};
use notice_harvester::store::sqlite::SqliteNoticeStore;
use notice_harvester::store::NoticeStore;

fn fixture(name: &str) -> String {
    std::fs::read_to_string(format!("tests/fixtures/{name}")).expect("fixture")
}

fn feed(url: &str, source: &str) -> FeedConfig {
    FeedConfig {
        url: url.to_string(),
        source: source.to_string(),
    }
}

const WWR: &str = "https://wwr.test/backend.rss";
const REMOTIVE: &str = "https://remotive.test/feed";

#[tokio::test]
async fn rss_adapter_keeps_healthy_feeds() {
    let transport = FixtureTransport::new()
        .with_body(WWR, fixture("wwr_feed.xml"))
        .with_status(REMOTIVE, 502);
    let adapter = RssFeedAdapter::new(
        vec![feed(WWR, "WeWorkRemotely"), feed(REMOTIVE, "Remotive")],
        Arc::new(transport),
        Arc::new(NamedSources),
    );

    let notices = adapter.fetch_candidates().await.unwrap();
    assert_eq!(notices.len(), 3);
    assert!(notices.iter().all(|n| n.source_id == "WeWorkRemotely"));

    let acme = &notices[0];
    assert_eq!(acme.title, "Acme: Senior Rust Engineer");
    assert_eq!(
        acme.guid,
        "https://weworkremotely.com/remote-jobs/acme-senior-rust-engineer"
    );
    assert_eq!(
        acme.image_url.as_deref(),
        Some("https://weworkremotely.com/logos/acme.png")
    );
    assert!(acme.body.contains("ingestion pipelines"));
    assert!(notices[2].published_date.is_some());
}

#[tokio::test]
async fn rss_adapter_reads_atom_feeds_with_html_entities() {
    let transport = FixtureTransport::new().with_body(REMOTIVE, fixture("remotive_atom.xml"));
    let adapter = RssFeedAdapter::new(
        vec![feed(REMOTIVE, "Remotive")],
        Arc::new(transport),
        Arc::new(NamedSources),
    );

    let notices = adapter.fetch_candidates().await.unwrap();
    assert_eq!(notices.len(), 2);

    let cafe = &notices[0];
    assert_eq!(cafe.title, "Café Labs: Backend Engineer – Rust");
    assert_eq!(
        cafe.url,
        "https://remotive.test/remote-jobs/software-dev/caf-backend-1911"
    );
    assert!(cafe.body.contains("naïve baristas"));
    assert_eq!(cafe.author_name.as_deref(), Some("Café Labs"));
    assert_eq!(
        cafe.author_url.as_deref(),
        Some("https://remotive.test/company/cafe")
    );
    assert!(cafe.published_date.is_some());

    assert_eq!(notices[1].body, "Kubernetes on call");
}

#[tokio::test]
async fn rss_adapter_fails_when_every_feed_fails() {
    let transport = FixtureTransport::new()
        .with_unreachable(WWR, "connection reset")
        .with_body(REMOTIVE, "<html>not a feed");
    let adapter = RssFeedAdapter::new(
        vec![feed(WWR, "WeWorkRemotely"), feed(REMOTIVE, "Remotive")],
        Arc::new(transport),
        Arc::new(NamedSources),
    );

    match adapter.fetch_candidates().await {
        Err(SourceError::AllEndpointsFailed { failed, .. }) => assert_eq!(failed, 2),
        other => panic!("expected AllEndpointsFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn rss_adapter_with_no_feeds_is_empty_success() {
    let adapter = RssFeedAdapter::new(
        Vec::new(),
        Arc::new(FixtureTransport::new()),
        Arc::new(NamedSources),
    );
    assert!(adapter.fetch_candidates().await.unwrap().is_empty());
}

#[tokio::test]
async fn rss_adapter_registers_feed_names_in_the_store() {
    let store = Arc::new(SqliteNoticeStore::connect("sqlite::memory:").await.unwrap());
    let transport = FixtureTransport::new().with_body(WWR, fixture("wwr_feed.xml"));
    let adapter = RssFeedAdapter::new(
        vec![feed(WWR, "WeWorkRemotely")],
        Arc::new(transport),
        Arc::new(CachedSourceDirectory::new(store.clone())),
    );

    let notices = adapter.fetch_candidates().await.unwrap();
    let expected = store.source_id_for("WeWorkRemotely").await.unwrap();
    assert_ne!(expected, "WeWorkRemotely");
    assert!(notices.iter().all(|n| n.source_id == expected));
}

#[tokio::test]
async fn reddit_adapter_filters_hiring_posts_per_subreddit() {
    let cfg = RedditConfig {
        subreddits: vec!["forhire".into(), "remotejs".into()],
        ..RedditConfig::default()
    };
    let urls = RedditAdapter::new(cfg.clone(), Arc::new(FixtureTransport::new()));
    let transport = FixtureTransport::new()
        .with_body(urls.listing_url("forhire"), fixture("reddit_forhire.json"))
        .with_status(urls.listing_url("remotejs"), 429);
    let adapter = RedditAdapter::new(cfg, Arc::new(transport));

    let notices = adapter.fetch_candidates().await.unwrap();
    let mut guids: Vec<&str> = notices.iter().map(|n| n.guid.as_str()).collect();
    guids.sort();
    assert_eq!(guids, vec!["1fty0a1", "1fty0c3"]);
    assert!(notices.iter().all(|n| n.source_id == "Reddit"));

    let data = notices.iter().find(|n| n.guid == "1fty0c3").unwrap();
    assert_eq!(
        data.image_url.as_deref(),
        Some("https://preview.redd.it/abc.png?width=640&s=1")
    );
    assert_eq!(
        data.url,
        "https://www.reddit.com/r/forhire/comments/1fty0c3/hiring_data_engineer/"
    );
}

fn hn_transport() -> FixtureTransport {
    FixtureTransport::new()
        .with_body(item_url(41709301), fixture("hn_thread.json"))
        .with_body(
            item_url(41709420),
            r#"{"by":"acme_jobs","id":41709420,"parent":41709301,"text":"Acme | Senior Rust Engineer | Remote (EU) | Full-time<p>We build storage engines.</p>","time":1727796000,"type":"comment"}"#,
        )
        .with_body(
            item_url(41709401),
            r#"{"deleted":true,"id":41709401,"parent":41709301,"time":1727795900,"type":"comment"}"#,
        )
        .with_body(
            item_url(41709350),
            r#"{"by":"globex","id":41709350,"parent":41709301,"text":"Globex | Backend | NYC &amp; Remote<p>Go, Postgres</p>","time":1727795000,"type":"comment"}"#,
        )
}

#[tokio::test]
async fn hackernews_adapter_reads_newest_comments_of_the_thread() {
    let cfg = HackerNewsConfig {
        thread_id: Some(41709301),
        limit: 3,
        ..HackerNewsConfig::default()
    };
    let adapter = HackerNewsAdapter::new(cfg, Arc::new(hn_transport()));

    let notices = adapter.fetch_candidates().await.unwrap();
    let mut guids: Vec<&str> = notices.iter().map(|n| n.guid.as_str()).collect();
    guids.sort();
    // 41709333 is outside the newest three; 41709401 is deleted.
    assert_eq!(guids, vec!["41709350", "41709420"]);

    let globex = notices.iter().find(|n| n.guid == "41709350").unwrap();
    assert_eq!(globex.title, "Globex | Backend | NYC & Remote");
    assert_eq!(globex.body, "<p>Go, Postgres</p>");
    assert_eq!(globex.url, "https://news.ycombinator.com/item?id=41709350");
    assert_eq!(globex.author_name.as_deref(), Some("globex"));
}

#[tokio::test]
async fn hackernews_adapter_discovers_the_hiring_thread() {
    let transport = hn_transport()
        .with_body(user_url("whoishiring"), fixture("hn_user.json"))
        .with_body(
            item_url(41709303),
            r#"{"id":41709303,"title":"Ask HN: Who wants to be hired? (October 2024)","type":"story"}"#,
        )
        .with_body(
            item_url(41709302),
            r#"{"id":41709302,"title":"Ask HN: Freelancer? Seeking freelancer? (October 2024)","type":"story"}"#,
        );
    let cfg = HackerNewsConfig {
        limit: 3,
        ..HackerNewsConfig::default()
    };
    let adapter = HackerNewsAdapter::new(cfg, Arc::new(transport));

    let notices = adapter.fetch_candidates().await.unwrap();
    assert_eq!(notices.len(), 2);
}

#[tokio::test]
async fn hackernews_adapter_fails_without_its_thread() {
    let cfg = HackerNewsConfig {
        thread_id: Some(1),
        ..HackerNewsConfig::default()
    };
    let adapter = HackerNewsAdapter::new(cfg, Arc::new(FixtureTransport::new()));
    assert!(matches!(
        adapter.fetch_candidates().await,
        Err(SourceError::Status { status: 404, .. })
    ));
}
