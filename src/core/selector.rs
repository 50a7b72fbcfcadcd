//! Format selector synthesis
//!
//! Maps a picked [`FormatEntry`] or a set of simple choices (kind, container,
//! quality) to an expression in yt-dlp's `-f` grammar. Everything here is
//! pure: the same inputs always produce the same string.

use crate::error::{GrabError, Result};
use crate::types::{BEST, DEFAULT_OUTPUT_TEMPLATE, FormatEntry, FormatKind, OUTPUT_TEMPLATE_BY_FORMAT};
use std::borrow::Cow;

/// Characters with meaning in the selector grammar or to a shell
const SPECIAL_CHARS: [char; 5] = [' ', '+', ',', '[', ']'];

/// Options applied when building from a single picked entry
#[derive(Debug, Clone, Default)]
pub struct EntryOptions {
    /// Pair video-only streams with audio
    pub auto_merge: bool,
    /// Preferred audio container; `None` or "best" means any
    pub audio_ext: Option<String>,
}

/// Media kind in simple mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MediaKind {
    #[default]
    Video,
    Audio,
    /// Use the raw expression verbatim
    Custom,
}

/// The three independent axes of simple mode
#[derive(Debug, Clone)]
pub struct SimpleSelection {
    pub kind: MediaKind,
    /// Target container, "best" = unconstrained
    pub ext: String,
    /// Quality such as "1080p", "best" = unconstrained
    pub quality: String,
    /// Audio container for the merged audio term
    pub audio_ext: String,
    pub auto_merge: bool,
    /// Raw expression for [`MediaKind::Custom`]
    pub custom: String,
}

impl Default for SimpleSelection {
    fn default() -> Self {
        Self {
            kind: MediaKind::Video,
            ext: BEST.into(),
            quality: BEST.into(),
            audio_ext: BEST.into(),
            auto_merge: true,
            custom: String::new(),
        }
    }
}

/// A custom expression, returned as typed; empty falls back to "best"
pub fn custom(expr: &str) -> String {
    let trimmed = expr.trim();
    if trimmed.is_empty() {
        BEST.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Selector for one picked entry
pub fn for_entry(entry: &FormatEntry, options: &EntryOptions) -> String {
    if options.auto_merge && entry.kind() == FormatKind::VideoOnly {
        let audio = audio_term(options.audio_ext.as_deref());
        return format!("{}+{}/{}", entry.format_id, audio, BEST);
    }
    // Audio-only and combined entries are already complete selections
    entry.format_id.clone()
}

/// Selector built from the simple-mode axes
pub fn simple(selection: &SimpleSelection) -> String {
    let height = parse_height(&selection.quality);
    let height_clause = height_clause(height);

    match selection.kind {
        MediaKind::Custom => custom(&selection.custom),
        MediaKind::Video => {
            let mut expr = format!("bestvideo{}{}", ext_clause(&selection.ext), height_clause);
            if selection.auto_merge {
                expr.push('+');
                expr.push_str(&audio_term(Some(&selection.audio_ext)));
            }
            expr.push('/');
            expr.push_str(BEST);
            expr.push_str(&height_clause);
            if height > 0 {
                expr.push('/');
                expr.push_str(BEST);
            }
            expr
        }
        MediaKind::Audio => {
            let ext = ext_clause(&selection.ext);
            if ext.is_empty() {
                format!("bestaudio/{BEST}")
            } else {
                format!("bestaudio{ext}/bestaudio/{BEST}")
            }
        }
    }
}

/// `bestaudio` or `bestaudio[ext=<pref>]`
fn audio_term(preference: Option<&str>) -> String {
    format!("bestaudio{}", ext_clause(preference.unwrap_or(BEST)))
}

/// `[ext=…]`, or nothing for "best"/blank
fn ext_clause(ext: &str) -> String {
    let ext = ext.trim();
    if ext.is_empty() || ext.eq_ignore_ascii_case(BEST) {
        String::new()
    } else {
        format!("[ext={}]", ext.to_ascii_lowercase())
    }
}

/// `[height<=…]`, or nothing for 0
fn height_clause(height: u32) -> String {
    if height == 0 {
        String::new()
    } else {
        format!("[height<={height}]")
    }
}

/// Height cap from "1080p", "1080" or "1920x1080"; 0 when unconstrained
pub fn parse_height(quality: &str) -> u32 {
    let q = quality.trim();
    if let Some(num) = q.strip_suffix(['p', 'P']) {
        return num.trim().parse().unwrap_or(0);
    }
    if let Some((_, h)) = q.split_once(['x', 'X']) {
        return h.trim().parse().unwrap_or(0);
    }
    q.parse().unwrap_or(0)
}

/// How several picked entries are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MultiMode {
    /// `a+b`: streams muxed into one file
    Merge,
    /// `a,b`: each downloaded on its own
    Separate,
}

/// Selector and switches for an advanced multi-pick
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiSelection {
    pub selector: String,
    pub output_template: &'static str,
    pub video_multistreams: bool,
    pub audio_multistreams: bool,
}

impl MultiSelection {
    pub fn new(entries: &[&FormatEntry], mode: MultiMode) -> Result<Self> {
        if entries.is_empty() {
            return Err(GrabError::InvalidArgument("no formats selected".into()));
        }

        let ids: Vec<&str> = entries.iter().map(|e| e.format_id.as_str()).collect();
        let (separator, output_template) = match mode {
            MultiMode::Merge => ("+", DEFAULT_OUTPUT_TEMPLATE),
            MultiMode::Separate => (",", OUTPUT_TEMPLATE_BY_FORMAT),
        };

        let merging = mode == MultiMode::Merge;
        let videos = entries.iter().filter(|e| e.has_video()).count();
        let audios = entries.iter().filter(|e| e.has_audio()).count();

        Ok(Self {
            selector: ids.join(separator),
            output_template,
            video_multistreams: merging && videos > 1,
            audio_multistreams: merging && audios > 1,
        })
    }
}

/// Wrap in double quotes when the token would otherwise be split or misread
pub fn quote_if_needed(token: &str) -> Cow<'_, str> {
    if !token.is_empty() && token.contains(SPECIAL_CHARS) {
        Cow::Owned(format!("\"{token}\""))
    } else {
        Cow::Borrowed(token)
    }
}
