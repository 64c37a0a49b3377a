// src/text.rs
//! Helpers for turning untrusted source markup into plain display text.

use once_cell::sync::OnceCell;
use regex::Regex;

/// Decode entities, drop tags, decode again (feeds double-encode a lot).
pub fn strip_markup(s: &str) -> String {
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"<[^>]*>?").expect("static regex"));

    let decoded = html_escape::decode_html_entities(s);
    let stripped = re_tags.replace_all(&decoded, "");
    html_escape::decode_html_entities(&stripped).trim().to_string()
}

/// Cut to `max` characters, appending `...` when something was cut.
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

/// `strip_markup` followed by `truncate_chars`.
pub fn plain_excerpt(s: &str, max: usize) -> String {
    truncate_chars(&strip_markup(s), max)
}

pub fn unescape_html(s: &str) -> String {
    html_escape::decode_html_entities(s).into_owned()
}
