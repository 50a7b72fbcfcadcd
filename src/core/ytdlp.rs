//! Handle on the external yt-dlp executable

use crate::core::args::render_command_line;
use crate::core::process::{self, ProcessTree};
use crate::error::{GrabError, Result};
use crate::types::{Config, default_tool_path};
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin};

/// The tool to run, plus any arguments that must precede ours
/// (for example `python3 -m yt_dlp`).
#[derive(Debug, Clone)]
pub struct YtDlp {
    program: PathBuf,
    leading_args: Vec<String>,
}

impl YtDlp {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        let program = program.into();
        let program = if program.as_os_str().is_empty() {
            PathBuf::from(default_tool_path())
        } else {
            program
        };
        Self {
            program,
            leading_args: Vec::new(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.tool_path.trim())
    }

    pub fn with_leading_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.leading_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Full argument vector as passed to the process
    fn full_args(&self, args: &[String]) -> Vec<String> {
        self.leading_args.iter().chain(args).cloned().collect()
    }

    /// Shell-style rendering of an invocation, for copying
    pub fn command_line(&self, args: &[String]) -> String {
        render_command_line(&self.program.to_string_lossy(), &self.full_args(args))
    }

    /// Spawn inside a fresh process tree
    pub(crate) fn spawn(&self, args: &[String]) -> Result<(Child, ProcessTree)> {
        let mut tree = ProcessTree::new();
        let mut cmd = process::command(&self.program);
        cmd.args(self.full_args(args));
        tree.configure(&mut cmd);

        tracing::debug!(command = %self.command_line(args), "spawning yt-dlp");
        let child = cmd.spawn().map_err(|e| {
            GrabError::Spawn(format!("Failed to start {}: {}", self.program.display(), e))
        })?;
        tree.assign(&child);
        Ok((child, tree))
    }

    /// `--version` output, or `MissingDependency` when the tool cannot run
    pub async fn check_available(&self) -> Result<String> {
        let output = process::command(&self.program)
            .args(self.full_args(&["--version".to_string()]))
            .stdin(std::process::Stdio::null())
            .output()
            .await
            .map_err(|_| GrabError::MissingDependency(self.program.display().to_string()))?;
        if !output.status.success() {
            return Err(GrabError::MissingDependency(self.program.display().to_string()));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

impl Default for YtDlp {
    fn default() -> Self {
        Self::new(default_tool_path())
    }
}

/// Exit code, with death-by-signal reported as -1
pub(crate) fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}

/// Polite stop: yt-dlp (and ffmpeg under it) quit on `q`
pub(crate) async fn request_stop(stdin: &mut Option<ChildStdin>) {
    let Some(pipe) = stdin.as_mut() else {
        return;
    };
    let sent = async {
        pipe.write_all(b"q\n").await?;
        pipe.flush().await
    }
    .await;
    if let Err(e) = sent {
        // Process may not read stdin, or has already gone
        tracing::debug!("could not send quit request: {}", e);
    }
    *stdin = None;
}

/// Read a pipe to its end, lossily decoded
pub(crate) async fn read_all<R: AsyncRead + Unpin>(pipe: Option<R>) -> String {
    let Some(mut pipe) = pipe else {
        return String::new();
    };
    let mut buf = Vec::new();
    if let Err(e) = pipe.read_to_end(&mut buf).await {
        tracing::debug!("pipe read ended early: {}", e);
    }
    String::from_utf8_lossy(&buf).into_owned()
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_program_uses_default() {
        assert_eq!(YtDlp::new("").program(), Path::new(default_tool_path()));
        let cfg = Config {
            tool_path: "  /opt/yt-dlp  ".into(),
            ..Config::default()
        };
        assert_eq!(YtDlp::from_config(&cfg).program(), Path::new("/opt/yt-dlp"));
    }

    #[test]
    fn test_command_line_includes_leading_args() {
        let tool = YtDlp::new("python3").with_leading_args(["-m", "yt_dlp"]);
        let line = tool.command_line(&["-f".into(), "137+bestaudio/best".into()]);
        assert_eq!(line, r#"python3 -m yt_dlp -f "137+bestaudio/best""#);
    }

    #[tokio::test]
    async fn test_missing_tool_is_reported() {
        let tool = YtDlp::new("/definitely/not/here/yt-dlp");
        let err = tool.check_available().await.unwrap_err();
        assert!(matches!(err, GrabError::MissingDependency(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_check_available_returns_version() {
        let dir = tempfile::tempdir().unwrap();
        let tool = testing::fake_tool(dir.path(), "echo 2024.08.06\n");
        assert_eq!(tool.check_available().await.unwrap(), "2024.08.06");
    }
}
