//! Filtering and ordering of a fetched format list

use crate::types::{FormatEntry, FormatKind};
use std::cmp::Reverse;

/// Which streams to keep by content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindFilter {
    /// Anything with a video track
    Video,
    /// Audio-only streams
    Audio,
}

/// Narrowing applied to a format list; `None` fields match everything
#[derive(Debug, Clone, Default)]
pub struct FormatFilter {
    pub kind: Option<KindFilter>,
    pub ext: Option<String>,
    pub protocol: Option<String>,
    /// "1080p" or a raw resolution string such as "audio only"
    pub resolution: Option<String>,
}

fn eq_ci(a: Option<&str>, b: &str) -> bool {
    a.is_some_and(|a| a.eq_ignore_ascii_case(b))
}

impl FormatFilter {
    pub fn matches(&self, format: &FormatEntry) -> bool {
        if format.kind() == FormatKind::Unusable {
            return false;
        }
        let kind_ok = match self.kind {
            None => true,
            Some(KindFilter::Video) => format.has_video(),
            Some(KindFilter::Audio) => !format.has_video(),
        };
        let ext_ok = self
            .ext
            .as_deref()
            .is_none_or(|ext| eq_ci(format.ext.as_deref(), ext));
        let proto_ok = self
            .protocol
            .as_deref()
            .is_none_or(|p| eq_ci(format.protocol.as_deref(), p));
        let res_ok = self.resolution.as_deref().is_none_or(|res| {
            eq_ci(format.resolution_label().as_deref(), res)
                || eq_ci(format.resolution.as_deref(), res)
        });
        kind_ok && ext_ok && proto_ok && res_ok
    }

    pub fn apply<'a>(&self, formats: &'a [FormatEntry]) -> Vec<&'a FormatEntry> {
        formats.iter().filter(|f| self.matches(f)).collect()
    }
}

/// Distinct values, case-insensitive, first spelling wins
fn distinct<'a>(values: impl Iterator<Item = Option<&'a str>>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for value in values.flatten().map(str::trim).filter(|v| !v.is_empty()) {
        if !out.iter().any(|seen| seen.eq_ignore_ascii_case(value)) {
            out.push(value.to_string());
        }
    }
    out
}

/// Container extensions offered, sorted case-insensitively
pub fn distinct_extensions(formats: &[FormatEntry]) -> Vec<String> {
    let mut exts = distinct(formats.iter().map(|f| f.ext.as_deref()));
    exts.sort_by_key(|e| e.to_ascii_lowercase());
    exts
}

/// Transport protocols offered, sorted case-insensitively
pub fn distinct_protocols(formats: &[FormatEntry]) -> Vec<String> {
    let mut protocols = distinct(formats.iter().map(|f| f.protocol.as_deref()));
    protocols.sort_by_key(|p| p.to_ascii_lowercase());
    protocols
}

/// Resolution labels, lowest height first; non-numeric labels ("audio only") lead
pub fn distinct_resolutions(formats: &[FormatEntry]) -> Vec<String> {
    let labels: Vec<String> = formats.iter().filter_map(FormatEntry::resolution_label).collect();
    let mut res = distinct(labels.iter().map(|l| Some(l.as_str())));
    res.sort_by_key(|label| resolution_order(label));
    res
}

fn resolution_order(label: &str) -> i64 {
    label
        .strip_suffix(['p', 'P'])
        .and_then(|n| n.parse::<i64>().ok())
        .unwrap_or(i64::MIN)
}

/// Highest resolution first, then by extension; stable for ties
pub fn sort_by_resolution(formats: &mut [FormatEntry]) {
    formats.sort_by_key(|f| {
        (
            Reverse(f.height_or_parsed()),
            f.ext.clone().unwrap_or_default().to_ascii_lowercase(),
        )
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fmt(id: &str, ext: &str, height: Option<u32>, video: &str, audio: &str, proto: &str) -> FormatEntry {
        FormatEntry {
            format_id: id.into(),
            ext: Some(ext.into()),
            height,
            resolution: if height.is_none() { Some("audio only".into()) } else { None },
            video_ext: Some(video.into()),
            audio_ext: Some(audio.into()),
            protocol: Some(proto.into()),
            ..FormatEntry::default()
        }
    }

    fn sample() -> Vec<FormatEntry> {
        vec![
            fmt("sb0", "mhtml", None, "none", "none", "mhtml"),
            fmt("140", "m4a", None, "none", "m4a", "https"),
            fmt("251", "webm", None, "none", "webm", "https"),
            fmt("18", "mp4", Some(360), "mp4", "m4a", "https"),
            fmt("137", "mp4", Some(1080), "mp4", "none", "https"),
            fmt("248", "webm", Some(1080), "webm", "none", "m3u8_native"),
            fmt("136", "MP4", Some(720), "mp4", "none", "https"),
        ]
    }

    fn ids(list: &[&FormatEntry]) -> Vec<String> {
        list.iter().map(|f| f.format_id.clone()).collect()
    }

    #[test]
    fn test_filter_by_kind_skips_unusable() {
        let formats = sample();
        let audio = FormatFilter {
            kind: Some(KindFilter::Audio),
            ..FormatFilter::default()
        };
        assert_eq!(ids(&audio.apply(&formats)), vec!["140", "251"]);
        let all = FormatFilter::default().apply(&formats);
        assert_eq!(all.len(), 6);
    }

    #[test]
    fn test_filter_by_ext_protocol_resolution() {
        let formats = sample();
        let filter = FormatFilter {
            kind: Some(KindFilter::Video),
            ext: Some("mp4".into()),
            protocol: Some("HTTPS".into()),
            resolution: Some("1080p".into()),
        };
        assert_eq!(ids(&filter.apply(&formats)), vec!["137"]);

        let by_raw = FormatFilter {
            resolution: Some("audio only".into()),
            ..FormatFilter::default()
        };
        assert_eq!(ids(&by_raw.apply(&formats)), vec!["140", "251"]);
    }

    #[test]
    fn test_distinct_lists() {
        let formats = sample();
        assert_eq!(distinct_extensions(&formats), vec!["m4a", "mhtml", "mp4", "webm"]);
        assert_eq!(distinct_protocols(&formats), vec!["https", "m3u8_native", "mhtml"]);
        assert_eq!(
            distinct_resolutions(&formats),
            vec!["audio only", "360p", "720p", "1080p"]
        );
    }

    #[test]
    fn test_sort_by_resolution() {
        let mut formats = sample();
        sort_by_resolution(&mut formats);
        let order: Vec<&str> = formats.iter().map(|f| f.format_id.as_str()).collect();
        assert_eq!(order, vec!["137", "248", "136", "18", "140", "sb0", "251"]);
    }
}
