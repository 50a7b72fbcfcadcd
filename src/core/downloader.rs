//! Downloader module - yt-dlp download with live progress and clean cancel

use crate::core::args::{download_args, split_args};
use crate::core::process::force_kill;
use crate::core::progress::parse_progress;
use crate::core::ytdlp::{YtDlp, exit_code, request_stop};
use crate::error::{GrabError, Result};
use crate::types::{DownloadProgress, DownloadReport, DownloadRequest, Preset};
use chrono::Utc;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;

/// Time between the polite quit request and the hard kill
pub const GRACE_PERIOD: Duration = Duration::from_millis(500);

/// How long pipes may stay open once the tool exited or was killed;
/// after that, whatever still holds them is killed and output abandoned
const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Deletion attempts per partial file
pub const CLEANUP_ATTEMPTS: u32 = 8;

/// Pause between deletion attempts
pub const CLEANUP_DELAY: Duration = Duration::from_millis(200);

/// Sidecars yt-dlp keeps next to an unfinished file
const PARTIAL_SUFFIXES: [&str; 2] = [".part", ".ytdl"];

/// Cancellation progress of one download.
///
/// Running -> StopRequested (quit sent, grace timer armed) -> ForceKilled.
/// The kill happens when the grace timer fires even if the process has
/// already exited by then. A cancel arriving after a natural exit does not
/// change the outcome; it only stops waiting on leftover descendants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Running,
    StopRequested,
    ForceKilled,
}

impl YtDlp {
    /// Run a download, reporting every output line through `on_progress`.
    ///
    /// Returns the tool's exit code when it finishes on its own, zero or not.
    /// Returns `Cancelled` once `cancel` fired, the process tree is gone and
    /// every announced destination (plus `.part`/`.ytdl`) has been removed.
    pub async fn download<F>(
        &self,
        request: &DownloadRequest,
        on_progress: F,
        cancel: &CancellationToken,
    ) -> Result<DownloadReport>
    where
        F: FnMut(DownloadProgress),
    {
        if request.url.trim().is_empty() {
            return Err(GrabError::InvalidArgument("URL is empty".into()));
        }
        self.run_download(&download_args(request), on_progress, cancel)
            .await
    }

    /// Download using a preset's argument string in place of a selector
    pub async fn download_with_preset<F>(
        &self,
        url: &str,
        preset: &Preset,
        output_template: &str,
        ignore_config: bool,
        on_progress: F,
        cancel: &CancellationToken,
    ) -> Result<DownloadReport>
    where
        F: FnMut(DownloadProgress),
    {
        tracing::info!(preset = %preset.name, "downloading with preset");
        let request = DownloadRequest::new(url)
            .output_template(output_template)
            .ignore_config(ignore_config)
            .extra_args(split_args(&preset.args));
        self.download(&request, on_progress, cancel).await
    }

    async fn run_download<F>(
        &self,
        args: &[String],
        mut on_progress: F,
        cancel: &CancellationToken,
    ) -> Result<DownloadReport>
    where
        F: FnMut(DownloadProgress),
    {
        let started_at = Utc::now();
        let (mut child, mut tree) = self.spawn(args)?;
        let mut stdin = child.stdin.take();

        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(forward_lines(stdout, tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_lines(stderr, tx.clone()));
        }
        drop(tx);

        let mut destinations: Vec<PathBuf> = Vec::new();
        let mut exit: Option<ExitStatus> = None;
        let mut drained = false;
        let mut stage = Stage::Running;
        let timer = sleep(GRACE_PERIOD);
        tokio::pin!(timer);

        loop {
            if exit.is_some() && drained && stage != Stage::StopRequested {
                break;
            }
            let deadline_armed =
                stage == Stage::StopRequested || (!drained && (stage == Stage::ForceKilled || exit.is_some()));

            tokio::select! {
                biased;
                _ = &mut timer, if deadline_armed => {
                    if stage == Stage::StopRequested {
                        tracing::info!("grace period over, killing process tree");
                        force_kill(&tree, &mut child);
                        stage = Stage::ForceKilled;
                        timer.as_mut().reset(Instant::now() + DRAIN_TIMEOUT);
                    } else {
                        tracing::warn!("output still open after exit; killing stragglers");
                        tree.terminate_all();
                        drained = true;
                    }
                }
                _ = cancel.cancelled(), if stage == Stage::Running => {
                    if exit.is_some() {
                        // Tool already finished; only descendants hold the pipes
                        tracing::info!("cancel after exit; abandoning output");
                        tree.terminate_all();
                        drained = true;
                    } else {
                        tracing::info!("download cancel requested");
                        request_stop(&mut stdin).await;
                        stage = Stage::StopRequested;
                        timer.as_mut().reset(Instant::now() + GRACE_PERIOD);
                    }
                }
                status = child.wait(), if exit.is_none() => {
                    exit = Some(status?);
                    if stage == Stage::Running {
                        timer.as_mut().reset(Instant::now() + DRAIN_TIMEOUT);
                    }
                }
                line = rx.recv(), if !drained => match line {
                    Some(line) => handle_line(line, &mut destinations, &mut on_progress),
                    None => drained = true,
                },
            }
        }
        // Lines already queued when readers were abandoned
        while let Ok(line) = rx.try_recv() {
            handle_line(line, &mut destinations, &mut on_progress);
        }
        drop(stdin);
        tree.release();

        if stage != Stage::Running {
            cleanup_partials(&destinations).await;
            return Err(GrabError::Cancelled);
        }

        let exit_code = exit.map(exit_code).unwrap_or(-1);
        tracing::info!(exit_code, "download finished");
        Ok(DownloadReport {
            exit_code,
            destinations,
            started_at,
            finished_at: Utc::now(),
        })
    }
}

fn handle_line<F>(line: String, destinations: &mut Vec<PathBuf>, on_progress: &mut F)
where
    F: FnMut(DownloadProgress),
{
    if line.trim().is_empty() {
        return;
    }
    let progress = parse_progress(&line);
    if let Some(dest) = &progress.destination {
        tracing::debug!(destination = %dest.display(), "destination announced");
        if !destinations.contains(dest) {
            destinations.push(dest.clone());
        }
    }
    on_progress(progress);
}

/// Forward one pipe line by line; invalid UTF-8 is replaced, never fatal
async fn forward_lines<R>(pipe: R, tx: mpsc::UnboundedSender<String>)
where
    R: AsyncRead + Unpin,
{
    let mut segments = BufReader::new(pipe).split(b'\n');
    loop {
        match segments.next_segment().await {
            Ok(Some(bytes)) => {
                let line = String::from_utf8_lossy(&bytes);
                if tx.send(line.trim_end_matches('\r').to_string()).is_err() {
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                tracing::debug!("pipe read failed: {}", e);
                break;
            }
        }
    }
}

/// `path` with a suffix appended to the full file name
fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// Files a cancelled download may have left for `destination`
pub fn partial_candidates(destination: &Path) -> Vec<PathBuf> {
    let mut out: Vec<PathBuf> = PARTIAL_SUFFIXES
        .iter()
        .map(|suffix| with_suffix(destination, suffix))
        .collect();
    out.push(destination.to_path_buf());
    out
}

/// Delete every partial artifact; best effort, failures are only logged
pub async fn cleanup_partials(destinations: &[PathBuf]) {
    for destination in destinations {
        for candidate in partial_candidates(destination) {
            remove_with_retry(&candidate).await;
        }
    }
}

/// The killed process may hold the handle a little longer than it lives
async fn remove_with_retry(path: &Path) -> bool {
    for attempt in 1..=CLEANUP_ATTEMPTS {
        match tokio::fs::remove_file(path).await {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "removed partial file");
                return true;
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return true,
            Err(e) => {
                tracing::debug!(path = %path.display(), attempt, "delete failed: {}", e);
                if attempt < CLEANUP_ATTEMPTS {
                    sleep(CLEANUP_DELAY).await;
                }
            }
        }
    }
    tracing::warn!(path = %path.display(), "left partial file behind");
    false
}
