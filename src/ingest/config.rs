// src/ingest/config.rs
//! Per-adapter settings. Everything has a default so an empty `[rss]` table
//! (or no config file at all) still yields a working setup.

use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}
fn default_run_deadline_secs() -> u64 {
    60
}
fn default_request_timeout_secs() -> u64 {
    20
}
fn default_user_agent() -> String {
    concat!("notice-harvester/", env!("CARGO_PKG_VERSION")).to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Hard bound on the whole fan-out, in seconds.
    #[serde(default = "default_run_deadline_secs")]
    pub run_deadline_secs: u64,
    /// Per HTTP request, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default)]
    pub rss: RssConfig,
    #[serde(default)]
    pub reddit: RedditConfig,
    #[serde(default)]
    pub hackernews: HackerNewsConfig,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            run_deadline_secs: default_run_deadline_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            user_agent: default_user_agent(),
            rss: RssConfig::default(),
            reddit: RedditConfig::default(),
            hackernews: HackerNewsConfig::default(),
        }
    }
}

impl IngestConfig {
    /// Clamp values that would make a run hang or fetch nothing.
    pub fn sanitize(&mut self) {
        self.run_deadline_secs = self.run_deadline_secs.max(1);
        self.request_timeout_secs = self.request_timeout_secs.max(1);
        if self.user_agent.trim().is_empty() {
            self.user_agent = default_user_agent();
        }

        self.rss.feeds.retain(|f| !f.url.trim().is_empty());
        for f in &mut self.rss.feeds {
            if f.source.trim().is_empty() {
                f.source = f.url.clone();
            }
        }

        self.reddit.limit = self.reddit.limit.clamp(1, 100);
        self.reddit.subreddits = self
            .reddit
            .subreddits
            .iter()
            .map(|s| s.trim().trim_start_matches("r/").to_string())
            .filter(|s| !s.is_empty())
            .collect();

        self.hackernews.limit = self.hackernews.limit.max(1);
        self.hackernews.discovery_depth = self.hackernews.discovery_depth.max(1);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedConfig {
    pub url: String,
    /// Human-readable name, resolved to a source id at fetch time.
    pub source: String,
}

impl FeedConfig {
    fn new(url: &str, source: &str) -> Self {
        Self {
            url: url.to_string(),
            source: source.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RssConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Register feed names in the `Source` table instead of storing the raw name.
    #[serde(default = "default_true")]
    pub resolve_sources: bool,
    #[serde(default = "default_feeds")]
    pub feeds: Vec<FeedConfig>,
}

impl Default for RssConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            resolve_sources: true,
            feeds: default_feeds(),
        }
    }
}

pub fn default_feeds() -> Vec<FeedConfig> {
    vec![
        FeedConfig::new(
            "https://weworkremotely.com/categories/remote-full-stack-programming-jobs.rss",
            "WeWorkRemotely",
        ),
        FeedConfig::new(
            "https://weworkremotely.com/categories/remote-front-end-programming-jobs.rss",
            "WeWorkRemotely",
        ),
        FeedConfig::new(
            "https://weworkremotely.com/categories/remote-back-end-programming-jobs.rss",
            "WeWorkRemotely",
        ),
        FeedConfig::new("https://remotive.io/remote-jobs/software-dev", "Remotive"),
        FeedConfig::new("https://jobicy.com/jobs/feed/", "JobIcy"),
        FeedConfig::new(
            "https://cryptojobslist.com/jobs.rss?jobLocation=Remote",
            "CryptoJobsList",
        ),
        FeedConfig::new("https://www.fossjobs.net/rss/all/", "FOSSJobs"),
        FeedConfig::new("http://rss.indeed.com/rss", "Indeed"),
        FeedConfig::new("https://remoteok.io/remote-jobs.rss", "RemoteOK"),
    ]
}

fn default_subreddits() -> Vec<String> {
    vec!["forhire".to_string(), "remotejs".to_string()]
}
fn default_reddit_limit() -> u32 {
    20
}
fn default_reddit_window() -> String {
    "week".to_string()
}
fn default_title_filter() -> String {
    "[hiring]".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_subreddits")]
    pub subreddits: Vec<String>,
    /// Posts per subreddit (1..=100).
    #[serde(default = "default_reddit_limit")]
    pub limit: u32,
    #[serde(default = "default_reddit_window")]
    pub window: String,
    /// Case-insensitive title substring; empty keeps every post.
    #[serde(default = "default_title_filter")]
    pub title_filter: String,
}

impl Default for RedditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            subreddits: default_subreddits(),
            limit: default_reddit_limit(),
            window: default_reddit_window(),
            title_filter: default_title_filter(),
        }
    }
}

fn default_hn_limit() -> usize {
    20
}
fn default_hn_min_len() -> usize {
    10
}
fn default_hn_discovery_depth() -> usize {
    6
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HackerNewsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// "Who is hiring?" story id. Discovered from the `whoishiring` account when unset.
    #[serde(default)]
    pub thread_id: Option<u64>,
    /// Newest top-level comments to fetch.
    #[serde(default = "default_hn_limit")]
    pub limit: usize,
    /// Comments with both title and body shorter than this are dropped.
    #[serde(default = "default_hn_min_len")]
    pub min_len: usize,
    /// Recent `whoishiring` submissions inspected during discovery.
    #[serde(default = "default_hn_discovery_depth")]
    pub discovery_depth: usize,
}

impl Default for HackerNewsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            thread_id: None,
            limit: default_hn_limit(),
            min_len: default_hn_min_len(),
            discovery_depth: default_hn_discovery_depth(),
        }
    }
}
