//! Decoding of yt-dlp's line-oriented output

use crate::types::DownloadProgress;
use regex::Regex;
use std::path::PathBuf;
use std::sync::LazyLock;

static PERCENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[download\]\s+(\d{1,3}(?:\.\d+)?)%").expect("Invalid regex")
});

static DESTINATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[download\]\s+Destination:\s+(.+)$").expect("Invalid regex")
});

static MERGER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[Merger\]\s+Merging formats into\s+(.+)$").expect("Invalid regex")
});

/// Percentage carried by a `[download]  42.3% of ...` line.
///
/// Anything else yields `None`; an unmatched line is the normal case.
pub fn parse_percent(line: &str) -> Option<f64> {
    let captures = PERCENT_RE.captures(line)?;
    let value: f64 = captures.get(1)?.as_str().parse().ok()?;
    Some(value.clamp(0.0, 100.0))
}

/// Path announced by `[download] Destination: <path>`
pub fn parse_destination(line: &str) -> Option<PathBuf> {
    capture_path(&DESTINATION_RE, line)
}

/// Path announced by `[Merger] Merging formats into "<path>"`
pub fn parse_merge_target(line: &str) -> Option<PathBuf> {
    capture_path(&MERGER_RE, line)
}

fn capture_path(re: &Regex, line: &str) -> Option<PathBuf> {
    let raw = re.captures(line)?.get(1)?.as_str().trim();
    let path = strip_quotes(raw);
    if path.is_empty() {
        return None;
    }
    Some(PathBuf::from(path))
}

/// Remove one layer of `"…"` or `“…”`
fn strip_quotes(s: &str) -> &str {
    for (open, close) in [('"', '"'), ('\u{201C}', '\u{201D}')] {
        if let Some(inner) = s.strip_prefix(open).and_then(|r| r.strip_suffix(close)) {
            return inner;
        }
    }
    s
}

/// Decode one output line into a progress event
pub fn parse_progress(line: &str) -> DownloadProgress {
    DownloadProgress {
        percent: parse_percent(line),
        line: line.to_string(),
        destination: parse_destination(line).or_else(|| parse_merge_target(line)),
    }
}
