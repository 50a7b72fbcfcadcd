//! Metadata fetch: `yt-dlp -J` into [`MediaInfo`]

use crate::core::args::metadata_args;
use crate::core::process::force_kill;
use crate::core::ytdlp::{YtDlp, exit_code, read_all, request_stop};
use crate::error::{GrabError, Result};
use crate::types::MediaInfo;
use tokio_util::sync::CancellationToken;

impl YtDlp {
    /// Fetch and parse the JSON description of one URL.
    ///
    /// Fails with `InvalidArgument` for a blank URL (nothing is spawned),
    /// `Tool` when the process fails without output, `EmptyResult` when it
    /// succeeds without output, `Parse` on malformed JSON and `Cancelled`
    /// when `cancel` fires first.
    pub async fn fetch_metadata(
        &self,
        url: &str,
        ignore_config: bool,
        cancel: &CancellationToken,
    ) -> Result<MediaInfo> {
        let url = url.trim();
        if url.is_empty() {
            return Err(GrabError::InvalidArgument("URL is empty".into()));
        }

        let (mut child, tree) = self.spawn(&metadata_args(url, ignore_config))?;
        let mut stdin = child.stdin.take();
        let stdout_task = tokio::spawn(read_all(child.stdout.take()));
        let stderr_task = tokio::spawn(read_all(child.stderr.take()));

        let status = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::info!(url, "metadata fetch cancelled");
                request_stop(&mut stdin).await;
                force_kill(&tree, &mut child);
                if let Err(e) = child.wait().await {
                    tracing::debug!("wait after kill: {}", e);
                }
                stdout_task.abort();
                stderr_task.abort();
                return Err(GrabError::Cancelled);
            }
            status = child.wait() => status?,
        };
        drop(stdin);

        let stdout = stdout_task.await.unwrap_or_default();
        let stderr = stderr_task.await.unwrap_or_default();
        let code = exit_code(status);
        tracing::debug!(url, code, bytes = stdout.len(), "metadata fetch finished");

        interpret_output(code, stdout, stderr)
    }
}

/// Decide the outcome of a finished `-J` run
pub fn interpret_output(code: i32, stdout: String, stderr: String) -> Result<MediaInfo> {
    let has_output = !stdout.trim().is_empty();
    if code != 0 && !has_output {
        return Err(GrabError::Tool {
            code,
            stderr: stderr.trim().to_string(),
        });
    }
    if !has_output {
        return Err(GrabError::EmptyResult);
    }
    if code != 0 {
        tracing::warn!(code, "yt-dlp failed but produced output; using it");
    }
    parse_media_info(stdout)
}

/// Parse a `-J` dump; the raw text is kept on failure
pub fn parse_media_info(raw: String) -> Result<MediaInfo> {
    serde_json::from_str(&raw).map_err(|source| GrabError::Parse { source, raw })
}

#[cfg(test)]
mod tests {
    use super::*;

    const DUMP: &str = r#"{
        "id": "dQw4w9WgXcQ",
        "title": "Clip",
        "description": "desc",
        "webpage_url": "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
        "thumbnail": "https://i.ytimg.com/vi/dQw4w9WgXcQ/maxresdefault.jpg",
        "formats": [
            {"format_id": "140", "ext": "m4a", "vcodec": "none", "acodec": "mp4a.40.2",
             "video_ext": "none", "audio_ext": "m4a", "abr": 129.5, "protocol": "https",
             "resolution": "audio only", "width": null, "height": null},
            {"format_id": "137", "ext": "mp4", "vcodec": "avc1.640028", "acodec": "none",
             "video_ext": "mp4", "audio_ext": "none", "width": 1920, "height": 1080,
             "fps": 29.97, "tbr": 4400.1, "protocol": "https"}
        ],
        "subtitles": {"en": [{"ext": "vtt", "url": "https://x/en.vtt", "name": "English"}]}
    }"#;

    #[test]
    fn test_parse_dump() {
        let info = parse_media_info(DUMP.to_string()).unwrap();
        assert_eq!(info.id.as_deref(), Some("dQw4w9WgXcQ"));
        assert_eq!(info.formats.len(), 2);
        assert!(info.formats[0].is_audio_only());
        assert!(info.formats[1].is_video_only());
        assert_eq!(info.find_format("137").and_then(|f| f.height), Some(1080));
        assert_eq!(info.subtitle_languages(), vec!["en"]);
    }

    #[test]
    fn test_empty_output_with_success_is_empty_result() {
        let err = interpret_output(0, "  \n".into(), String::new()).unwrap_err();
        assert!(matches!(err, GrabError::EmptyResult));
    }

    #[test]
    fn test_failure_without_output_is_tool_error() {
        let err = interpret_output(2, String::new(), "ERROR: nope\n".into()).unwrap_err();
        match err {
            GrabError::Tool { code, stderr } => {
                assert_eq!(code, 2);
                assert_eq!(stderr, "ERROR: nope");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_failure_with_output_still_parses() {
        let info = interpret_output(1, DUMP.to_string(), "WARNING".into()).unwrap();
        assert_eq!(info.title.as_deref(), Some("Clip"));
    }

    #[test]
    fn test_garbage_is_parse_error_with_raw_text() {
        let err = interpret_output(0, "not json".into(), String::new()).unwrap_err();
        match err {
            GrabError::Parse { raw, .. } => assert_eq!(raw, "not json"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_blank_url_never_spawns() {
        let tool = YtDlp::new("/definitely/not/here/yt-dlp");
        let err = tool
            .fetch_metadata("   ", false, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, GrabError::InvalidArgument(_)));
    }

    #[cfg(unix)]
    mod spawned {
        use super::*;
        use crate::core::ytdlp::testing::fake_tool;
        use std::time::{Duration, Instant};

        #[tokio::test]
        async fn test_fetch_parses_stdout() {
            let dir = tempfile::tempdir().unwrap();
            let script = format!("cat <<'EOF'\n{DUMP}\nEOF\necho 'WARNING: noise' >&2\n");
            let tool = fake_tool(dir.path(), &script);
            let info = tool
                .fetch_metadata("https://example.com/v", true, &CancellationToken::new())
                .await
                .unwrap();
            assert_eq!(info.formats.len(), 2);
        }

        #[tokio::test]
        async fn test_fetch_receives_expected_arguments() {
            let dir = tempfile::tempdir().unwrap();
            let tool = fake_tool(dir.path(), "echo \"{\\\"title\\\": \\\"$*\\\"}\"\n");
            let info = tool
                .fetch_metadata("https://example.com/v", true, &CancellationToken::new())
                .await
                .unwrap();
            assert_eq!(
                info.title.as_deref(),
                Some("--ignore-config -J --no-warnings --no-playlist --no-color --newline https://example.com/v")
            );
        }

        #[tokio::test]
        async fn test_fetch_empty_stdout_zero_exit() {
            let dir = tempfile::tempdir().unwrap();
            let tool = fake_tool(dir.path(), "exit 0\n");
            let err = tool
                .fetch_metadata("https://example.com/v", false, &CancellationToken::new())
                .await
                .unwrap_err();
            assert!(matches!(err, GrabError::EmptyResult));
        }

        #[tokio::test]
        async fn test_fetch_nonzero_exit_carries_code() {
            let dir = tempfile::tempdir().unwrap();
            let tool = fake_tool(dir.path(), "echo 'ERROR: Unsupported URL' >&2\nexit 7\n");
            let err = tool
                .fetch_metadata("https://example.com/v", false, &CancellationToken::new())
                .await
                .unwrap_err();
            match err {
                GrabError::Tool { code, stderr } => {
                    assert_eq!(code, 7);
                    assert!(stderr.contains("Unsupported URL"));
                }
                other => panic!("unexpected {other:?}"),
            }
        }

        #[tokio::test]
        async fn test_fetch_cancel_kills_process() {
            let dir = tempfile::tempdir().unwrap();
            let tool = fake_tool(dir.path(), "sleep 30\n");
            let cancel = CancellationToken::new();
            let trigger = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(200)).await;
                trigger.cancel();
            });

            let started = Instant::now();
            let err = tool
                .fetch_metadata("https://example.com/v", false, &cancel)
                .await
                .unwrap_err();
            assert!(err.is_cancelled());
            assert!(started.elapsed() < Duration::from_secs(10));
        }
    }
}
