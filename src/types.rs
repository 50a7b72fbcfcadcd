//! Type definitions for yt-grab
//!
//! Source of truth for all data structures.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// The tool's spelling of "this axis is absent"
pub const NONE_SENTINEL: &str = "none";

/// Selector used whenever nothing more specific was chosen
pub const BEST: &str = "best";

/// Output template used when the caller gives none
pub const DEFAULT_OUTPUT_TEMPLATE: &str = "%(title)s [%(id)s].%(ext)s";

/// Output template for comma-joined selections, keyed by format id
pub const OUTPUT_TEMPLATE_BY_FORMAT: &str = "%(title)s [%(id)s] [%(format_id)s].%(ext)s";

/// yt-dlp writes `null` for lists it has nothing for
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ============================================
// Metadata Types
// ============================================

/// Everything `yt-dlp -J` reports that we care about
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaInfo {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub webpage_url: Option<String>,
    /// URL of the preview image
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub formats: Vec<FormatEntry>,
    /// Language code -> available tracks
    #[serde(default, deserialize_with = "null_as_default")]
    pub subtitles: BTreeMap<String, Vec<SubtitleTrack>>,
}

impl MediaInfo {
    /// Subtitle language codes, sorted
    pub fn subtitle_languages(&self) -> Vec<&str> {
        self.subtitles.keys().map(String::as_str).collect()
    }

    pub fn find_format(&self, format_id: &str) -> Option<&FormatEntry> {
        self.formats.iter().find(|f| f.format_id == format_id)
    }
}

/// What a format carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatKind {
    AudioVideo,
    VideoOnly,
    AudioOnly,
    /// Neither axis present (storyboards and the like)
    Unusable,
}

impl FormatKind {
    /// Short tag for listings
    pub fn tag(self) -> &'static str {
        match self {
            Self::AudioVideo => "AV",
            Self::VideoOnly => "V",
            Self::AudioOnly => "A",
            Self::Unusable => "?",
        }
    }
}

/// One downloadable stream as reported by the tool
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormatEntry {
    pub format_id: String,
    #[serde(default)]
    pub ext: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    /// Human form, e.g. "1920x1080" or "audio only"
    #[serde(default)]
    pub resolution: Option<String>,
    #[serde(default)]
    pub fps: Option<f64>,
    /// Total bitrate in kbps
    #[serde(default)]
    pub tbr: Option<f64>,
    #[serde(default)]
    pub vbr: Option<f64>,
    #[serde(default)]
    pub abr: Option<f64>,
    #[serde(default)]
    pub vcodec: Option<String>,
    #[serde(default)]
    pub acodec: Option<String>,
    #[serde(default)]
    pub video_ext: Option<String>,
    #[serde(default)]
    pub audio_ext: Option<String>,
    #[serde(default)]
    pub protocol: Option<String>,
    #[serde(default)]
    pub format_note: Option<String>,
    #[serde(default)]
    pub filesize: Option<u64>,
    #[serde(default)]
    pub filesize_approx: Option<u64>,
}

/// An axis is present unless the tool says "none". The container field wins
/// over the codec field; when neither is reported the axis is assumed present.
fn axis_present(container: Option<&str>, codec: Option<&str>) -> bool {
    let reported = container
        .filter(|s| !s.trim().is_empty())
        .or_else(|| codec.filter(|s| !s.trim().is_empty()));
    match reported {
        Some(value) => !value.eq_ignore_ascii_case(NONE_SENTINEL),
        None => true,
    }
}

impl FormatEntry {
    pub fn has_video(&self) -> bool {
        axis_present(self.video_ext.as_deref(), self.vcodec.as_deref())
    }

    pub fn has_audio(&self) -> bool {
        axis_present(self.audio_ext.as_deref(), self.acodec.as_deref())
    }

    pub fn kind(&self) -> FormatKind {
        match (self.has_video(), self.has_audio()) {
            (true, true) => FormatKind::AudioVideo,
            (true, false) => FormatKind::VideoOnly,
            (false, true) => FormatKind::AudioOnly,
            (false, false) => FormatKind::Unusable,
        }
    }

    pub fn is_video_only(&self) -> bool {
        self.kind() == FormatKind::VideoOnly
    }

    pub fn is_audio_only(&self) -> bool {
        self.kind() == FormatKind::AudioOnly
    }

    /// Height as reported, else recovered from the resolution string
    pub fn height_or_parsed(&self) -> u32 {
        self.height
            .filter(|h| *h > 0)
            .unwrap_or_else(|| {
                self.resolution
                    .as_deref()
                    .map(crate::core::selector::parse_height)
                    .unwrap_or(0)
            })
    }

    /// Resolution label used for filtering: "1080p" when the height is known
    pub fn resolution_label(&self) -> Option<String> {
        match self.height {
            Some(h) if h > 0 => Some(format!("{h}p")),
            _ => self
                .resolution
                .as_ref()
                .filter(|r| !r.trim().is_empty())
                .cloned(),
        }
    }

    /// One-line description for pickers
    pub fn display_label(&self) -> String {
        let dash = |v: &Option<String>| {
            v.as_deref()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or("-")
                .to_string()
        };
        let res = self.resolution_label().unwrap_or_default();
        let fps = self.fps.map(|f| format!("{}fps", trim_float(f))).unwrap_or_default();
        let tbr = self.tbr.map(|b| format!("{}kbps", trim_float(b))).unwrap_or_default();
        format!(
            "{}  [{}]  {}  {} {}  {}/{}  {}  ({})",
            self.format_id,
            self.kind().tag(),
            self.ext.as_deref().unwrap_or(""),
            res,
            fps,
            dash(&self.vcodec),
            dash(&self.acodec),
            tbr,
            dash(&self.protocol),
        )
    }
}

/// At most one decimal, no trailing ".0"
fn trim_float(value: f64) -> String {
    let rounded = (value * 10.0).round() / 10.0;
    if rounded.fract() == 0.0 {
        format!("{}", rounded as i64)
    } else {
        format!("{rounded:.1}")
    }
}

/// A subtitle file offered for one language
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubtitleTrack {
    #[serde(default)]
    pub ext: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

// ============================================
// Preset Types
// ============================================

/// A named argument string placed before the URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Preset {
    pub name: String,
    #[serde(default)]
    pub args: String,
    #[serde(default)]
    pub is_default: bool,
}

impl Preset {
    pub fn new(name: impl Into<String>, args: impl Into<String>, is_default: bool) -> Self {
        Self {
            name: name.into(),
            args: args.into(),
            is_default,
        }
    }
}

/// On-disk preset file: `{ "Items": [...] }`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PresetStore {
    #[serde(default, deserialize_with = "null_as_default")]
    pub items: Vec<Preset>,
}

// ============================================
// Config Types
// ============================================

/// User configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// yt-dlp executable, looked up on PATH when bare
    pub tool_path: String,
    /// Download directory path
    pub download_dir: String,
    /// Pair video-only picks with the best audio
    pub auto_merge: bool,
    /// Preferred audio container when merging ("best" = any)
    pub audio_ext: String,
    /// Pass --ignore-config to every invocation
    pub ignore_config: bool,
    /// Subtitle languages to fetch by default
    pub sub_langs: Vec<String>,
    /// Format sort spec passed via -S
    pub sort: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tool_path: default_tool_path().into(),
            download_dir: String::new(), // Set at runtime to ~/Downloads
            auto_merge: true,
            audio_ext: BEST.into(),
            ignore_config: false,
            sub_langs: Vec::new(),
            sort: None,
        }
    }
}

pub fn default_tool_path() -> &'static str {
    if cfg!(windows) { "yt-dlp.exe" } else { "yt-dlp" }
}

// ============================================
// Download Types
// ============================================

/// One decoded output line
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadProgress {
    /// 0..=100, `None` when the line carries no percentage
    pub percent: Option<f64>,
    /// The line exactly as received
    pub line: String,
    /// Set when this line announced where the file is being written
    pub destination: Option<PathBuf>,
}

/// Everything a download invocation needs
#[derive(Debug, Clone, Default)]
pub struct DownloadRequest {
    pub url: String,
    /// Format selector; blank means "best"
    pub selector: String,
    /// Output template; blank means `<cwd>/DEFAULT_OUTPUT_TEMPLATE`
    pub output_template: String,
    pub sub_langs: Vec<String>,
    pub write_subs: bool,
    pub ignore_config: bool,
    pub sort: Option<String>,
    pub video_multistreams: bool,
    pub audio_multistreams: bool,
    /// Extra arguments placed before `-o` (preset args)
    pub extra_args: Vec<String>,
}

impl DownloadRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = selector.into();
        self
    }

    pub fn output_template(mut self, template: impl Into<String>) -> Self {
        self.output_template = template.into();
        self
    }

    pub fn subtitles(mut self, langs: Vec<String>) -> Self {
        self.write_subs = !langs.is_empty();
        self.sub_langs = langs;
        self
    }

    pub fn ignore_config(mut self, ignore: bool) -> Self {
        self.ignore_config = ignore;
        self
    }

    pub fn sort(mut self, sort: Option<String>) -> Self {
        self.sort = sort.filter(|s| !s.trim().is_empty());
        self
    }

    pub fn multistreams(mut self, video: bool, audio: bool) -> Self {
        self.video_multistreams = video;
        self.audio_multistreams = audio;
        self
    }

    pub fn extra_args(mut self, args: Vec<String>) -> Self {
        self.extra_args = args;
        self
    }
}

/// Result of a download that ran to completion (successfully or not)
#[derive(Debug, Clone)]
pub struct DownloadReport {
    /// The tool's own exit code; -1 when it died from a signal
    pub exit_code: i32,
    /// Every destination the tool announced, in order
    pub destinations: Vec<PathBuf>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl DownloadReport {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Most recently announced output path
    pub fn final_destination(&self) -> Option<&PathBuf> {
        self.destinations.last()
    }
}

// ============================================
// Selector Types
// ============================================

/// Item displayed in selector menu
#[derive(Debug, Clone)]
pub struct MenuItem<T> {
    /// Display text
    pub label: String,
    /// Underlying value
    pub value: T,
}
