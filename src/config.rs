// src/config.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::ingest::config::IngestConfig;

pub const ENV_CONFIG_PATH: &str = "NOTICE_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/sources.toml";

fn default_site_url() -> String {
    "https://workfindy.com".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Public site that renders stored notices as `<site_url>/<id>`.
    #[serde(default = "default_site_url")]
    pub site_url: String,
    #[serde(default)]
    pub digest: DigestConfig,
    #[serde(flatten)]
    pub ingest: IngestConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            site_url: default_site_url(),
            digest: DigestConfig::default(),
            ingest: IngestConfig::default(),
        }
    }
}

fn default_digest_dir() -> PathBuf {
    PathBuf::from("latest_notices")
}
fn default_window_hours() -> i64 {
    24
}
/// Ten years; anything longer is a typo.
pub const MAX_WINDOW_HOURS: i64 = 24 * 366 * 10;
fn default_excluded_source() -> Option<String> {
    Some("HackerNews".to_string())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigestConfig {
    #[serde(default = "default_digest_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_window_hours")]
    pub window_hours: i64,
    /// Source id left out of the digest. Set to "" to keep everything.
    #[serde(default = "default_excluded_source")]
    pub excluded_source: Option<String>,
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            dir: default_digest_dir(),
            window_hours: default_window_hours(),
            excluded_source: default_excluded_source(),
        }
    }
}

impl AppConfig {
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("parsing {}", path.display()))
    }

    /// Resolution order:
    /// 1) explicit path (CLI flag or $NOTICE_CONFIG_PATH), must exist
    /// 2) config/sources.toml
    /// 3) built-in defaults
    pub fn load_default(explicit: Option<&Path>) -> Result<Self> {
        let from_env = std::env::var(ENV_CONFIG_PATH).ok().map(PathBuf::from);
        if let Some(p) = explicit.map(Path::to_path_buf).or(from_env) {
            if !p.exists() {
                return Err(anyhow!("config path {} does not exist", p.display()));
            }
            return Self::load_from(&p);
        }
        let fallback = PathBuf::from(DEFAULT_CONFIG_PATH);
        if fallback.exists() {
            return Self::load_from(&fallback);
        }
        Ok(Self::default())
    }

    pub fn parse(s: &str) -> Result<Self> {
        let mut cfg: AppConfig = toml::from_str(s)?;
        cfg.sanitize();
        Ok(cfg)
    }

    fn sanitize(&mut self) {
        self.ingest.sanitize();
        self.site_url = self.site_url.trim_end_matches('/').to_string();
        self.digest.window_hours = self.digest.window_hours.clamp(1, MAX_WINDOW_HOURS);
        if self
            .digest
            .excluded_source
            .as_deref()
            .is_some_and(|s| s.trim().is_empty())
        {
            self.digest.excluded_source = None;
        }
    }
}

/// Store connection string: `$DATABASE_URL`, else composed from the
/// `POSTGRES_*` variables.
pub fn database_url_from_env() -> Result<String> {
    if let Ok(url) = std::env::var("DATABASE_URL") {
        if !url.trim().is_empty() {
            return Ok(url);
        }
    }
    let user = std::env::var("POSTGRES_USER").map_err(|_| anyhow!("Missing POSTGRES_USER env var"))?;
    let password = std::env::var("POSTGRES_PASSWORD")
        .map_err(|_| anyhow!("Missing POSTGRES_PASSWORD env var"))?;
    let db = std::env::var("POSTGRES_DB").map_err(|_| anyhow!("Missing POSTGRES_DB env var"))?;
    let host = std::env::var("POSTGRES_HOST").unwrap_or_else(|_| "localhost".to_string());
    let port = std::env::var("POSTGRES_PORT").unwrap_or_else(|_| "5432".to_string());
    Ok(format!(
        "postgresql://{user}:{password}@{host}:{port}/{db}?sslmode=disable"
    ))
}

/// Discord webhook for run summaries; `None` means log-only.
pub fn discord_webhook_from_env() -> Option<String> {
    std::env::var("DISCORD_WEBHOOK_URL")
        .ok()
        .filter(|s| !s.trim().is_empty())
}
