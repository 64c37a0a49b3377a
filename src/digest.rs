// src/digest.rs
//! Dated markdown digest of recently stored notices.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;

use crate::model::Notice;
use crate::text::plain_excerpt;

const TITLE_MAX: usize = 100;
const BODY_MAX: usize = 500;

pub fn digest_file_name(date: NaiveDate) -> String {
    format!("{}_latest_notices.md", date.format("%Y-%m-%d"))
}

pub fn render_digest(notices: &[Notice], date: NaiveDate, site_url: &str) -> String {
    let mut out = String::with_capacity(64 + notices.len() * 768);
    let _ = write!(out, "# Latest Notices\n{}\n\n", date.format("%Y-%m-%d"));

    for n in notices {
        let _ = write!(
            out,
            "## {}\n\n**From**: {}\n\n{}\n\n**Read more**: [Here]({}/{})\n\n---\n\n",
            plain_excerpt(&n.title, TITLE_MAX),
            n.source_id,
            plain_excerpt(&n.body, BODY_MAX),
            site_url,
            n.id
        );
    }
    out
}

/// Write `content` to `<dir>/<date>_latest_notices.md`, replacing any
/// digest already written that day.
pub async fn write_digest(dir: &Path, date: NaiveDate, content: &str) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("creating digest dir {}", dir.display()))?;
    let path = dir.join(digest_file_name(date));
    tokio::fs::write(&path, content)
        .await
        .with_context(|| format!("writing digest {}", path.display()))?;
    Ok(path)
}
