//! notice-harvester: one scrape run per invocation, or the markdown digest
//! with `--markdown`. Scheduling is left to cron or whatever triggers us.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use notice_harvester::config::{database_url_from_env, discord_webhook_from_env, AppConfig};
use notice_harvester::notify::notifier_for;
use notice_harvester::pipeline::{build_aggregator, run_digest, run_scrape};
use notice_harvester::store;

#[derive(Parser, Debug)]
#[command(name = "notice-harvester", version, about)]
struct Cli {
    /// Render the digest of recent notices instead of scraping.
    #[arg(long)]
    markdown: bool,

    /// TOML config file (falls back to config/sources.toml, then defaults).
    #[arg(long, env = "NOTICE_CONFIG_PATH")]
    config: Option<PathBuf>,

    /// Store connection string; composed from POSTGRES_* when unset.
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: Option<String>,

    /// Output directory for the digest file.
    #[arg(long)]
    digest_dir: Option<PathBuf>,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; missing file is fine.
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("ignoring unreadable .env: {e}");
        }
    }
    init_tracing();

    let cli = Cli::parse();
    let mut cfg = AppConfig::load_default(cli.config.as_deref())?;
    if let Some(dir) = cli.digest_dir {
        cfg.digest.dir = dir;
    }

    let url = match cli.database_url {
        Some(url) => url,
        None => database_url_from_env()?,
    };
    let store = store::connect(&url).await.context("opening notice store")?;

    if cli.markdown {
        let path = run_digest(store.as_ref(), &cfg, chrono::Utc::now()).await?;
        tracing::info!(path = %path.display(), "markdown digest created");
        return Ok(());
    }

    let aggregator = build_aggregator(&cfg.ingest, store.clone())?;
    tracing::info!(adapters = ?aggregator.adapter_names(), "starting scrape run");
    let notifier = notifier_for(discord_webhook_from_env());

    let report = run_scrape(&aggregator, store.as_ref(), notifier.as_ref(), &cfg.site_url).await?;
    for f in &report.failures {
        tracing::warn!(adapter = %f.adapter, error = %f.error, "adapter contributed nothing");
    }
    tracing::info!(
        matched = report.matched,
        inserted = report.inserted.len(),
        "script run successfully"
    );
    Ok(())
}
