//! Argument lists for yt-dlp invocations

use crate::core::selector::quote_if_needed;
use crate::types::{BEST, DEFAULT_OUTPUT_TEMPLATE, DownloadRequest};
use std::path::Path;

/// Arguments for a single-item JSON dump
pub fn metadata_args(url: &str, ignore_config: bool) -> Vec<String> {
    let mut args = Vec::new();
    if ignore_config {
        args.push("--ignore-config".to_string());
    }
    args.extend(
        ["-J", "--no-warnings", "--no-playlist", "--no-color", "--newline"]
            .map(String::from),
    );
    args.push(url.to_string());
    args
}

/// Output template, falling back to the default pattern in the working directory
pub fn effective_output_template(template: &str) -> String {
    if !template.trim().is_empty() {
        return template.to_string();
    }
    let cwd = std::env::current_dir().unwrap_or_else(|_| ".".into());
    cwd.join(DEFAULT_OUTPUT_TEMPLATE).to_string_lossy().into_owned()
}

/// Template inside a chosen directory
pub fn output_template_in(dir: &Path, template: &str) -> String {
    dir.join(template).to_string_lossy().into_owned()
}

/// Arguments for a download.
///
/// When `extra_args` come from a preset and the request has no selector, the
/// preset is expected to carry its own `-f`, so none is added.
pub fn download_args(request: &DownloadRequest) -> Vec<String> {
    let mut args = Vec::new();
    if request.ignore_config {
        args.push("--ignore-config".to_string());
    }
    args.push("--newline".to_string());
    args.push("--no-color".to_string());

    if let Some(sort) = request.sort.as_deref().filter(|s| !s.trim().is_empty()) {
        args.push("-S".to_string());
        args.push(sort.to_string());
    }
    if request.video_multistreams {
        args.push("--video-multistreams".to_string());
    }
    if request.audio_multistreams {
        args.push("--audio-multistreams".to_string());
    }

    let selector = request.selector.trim();
    if !selector.is_empty() || request.extra_args.is_empty() {
        args.push("-f".to_string());
        args.push(if selector.is_empty() { BEST } else { selector }.to_string());
    }

    let langs: Vec<&str> = request
        .sub_langs
        .iter()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect();
    if request.write_subs && !langs.is_empty() {
        args.push("--write-subs".to_string());
        args.push("--sub-langs".to_string());
        args.push(langs.join(","));
    }

    args.extend(request.extra_args.iter().cloned());

    args.push("-o".to_string());
    args.push(effective_output_template(&request.output_template));
    args.push(request.url.clone());
    args
}

/// Split a free-form argument string the way a POSIX shell would.
///
/// Unbalanced quotes fall back to plain whitespace splitting.
pub fn split_args(s: &str) -> Vec<String> {
    shell_words::split(s).unwrap_or_else(|e| {
        tracing::debug!("split_args({:?}): {}; splitting on whitespace", s, e);
        s.split_whitespace().map(String::from).collect()
    })
}

/// Copy-pasteable command line for display
pub fn render_command_line(program: &str, args: &[String]) -> String {
    let mut parts = vec![quote_if_needed(program).into_owned()];
    parts.extend(args.iter().map(|a| quote_if_needed(a).into_owned()));
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_args() {
        assert_eq!(
            metadata_args("https://x/y", true),
            vec!["--ignore-config", "-J", "--no-warnings", "--no-playlist", "--no-color", "--newline", "https://x/y"]
        );
        assert_eq!(metadata_args("u", false)[0], "-J");
    }

    #[test]
    fn test_download_args_full() {
        let req = DownloadRequest::new("https://x/y")
            .selector("137+bestaudio/best")
            .output_template("/out/%(title)s.%(ext)s")
            .subtitles(vec!["en".into(), " de ".into()])
            .ignore_config(true)
            .sort(Some("res:1080".into()))
            .multistreams(true, false);
        assert_eq!(
            download_args(&req),
            vec![
                "--ignore-config",
                "--newline",
                "--no-color",
                "-S",
                "res:1080",
                "--video-multistreams",
                "-f",
                "137+bestaudio/best",
                "--write-subs",
                "--sub-langs",
                "en,de",
                "-o",
                "/out/%(title)s.%(ext)s",
                "https://x/y",
            ]
        );
    }

    #[test]
    fn test_blank_selector_defaults_to_best() {
        let req = DownloadRequest::new("u").selector("  ").output_template("t");
        let args = download_args(&req);
        let f = args.iter().position(|a| a == "-f").unwrap();
        assert_eq!(args[f + 1], "best");
    }

    #[test]
    fn test_blank_template_uses_cwd_default() {
        let args = download_args(&DownloadRequest::new("u"));
        let o = args.iter().position(|a| a == "-o").unwrap();
        assert!(args[o + 1].ends_with(DEFAULT_OUTPUT_TEMPLATE));
        assert!(Path::new(&args[o + 1]).is_absolute());
    }

    #[test]
    fn test_write_subs_needs_languages() {
        let mut req = DownloadRequest::new("u").output_template("t");
        req.write_subs = true;
        assert!(!download_args(&req).contains(&"--write-subs".to_string()));
    }

    #[test]
    fn test_preset_args_replace_selector() {
        let req = DownloadRequest::new("u")
            .output_template("t")
            .extra_args(split_args("-f bestaudio --extract-audio --audio-format mp3"));
        assert_eq!(
            download_args(&req),
            vec!["--newline", "--no-color", "-f", "bestaudio", "--extract-audio", "--audio-format", "mp3", "-o", "t", "u"]
        );
    }

    #[test]
    fn test_split_args_quotes() {
        assert_eq!(
            split_args(r#"-f "bv*[height<=720]+ba" --embed-subs"#),
            vec!["-f", "bv*[height<=720]+ba", "--embed-subs"]
        );
        assert_eq!(split_args(r#"-o "unterminated"#), vec!["-o", "\"unterminated"]);
        assert!(split_args("   ").is_empty());
    }

    #[test]
    fn test_render_command_line() {
        let args: Vec<String> = ["-f", "137+bestaudio/best", "-o", "/my dir/%(title)s.%(ext)s", "https://x/y"]
            .map(String::from)
            .to_vec();
        assert_eq!(
            render_command_line("yt-dlp", &args),
            r#"yt-dlp -f "137+bestaudio/best" -o "/my dir/%(title)s.%(ext)s" https://x/y"#
        );
    }
}
