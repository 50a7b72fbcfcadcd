//! Terminal progress rendering for download events

use crate::types::DownloadProgress;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;

const BAR_TEMPLATE: &str = "{spinner:.green} [{bar:40.cyan/blue}] {pos:>3}% {msg}";

/// Progress bar fed by [`DownloadProgress`] events
pub struct DownloadView {
    bar: ProgressBar,
    verbose: bool,
}

impl DownloadView {
    pub fn new(verbose: bool) -> Self {
        let bar = ProgressBar::new(100);
        bar.set_style(
            ProgressStyle::default_bar()
                .template(BAR_TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        bar.set_message("Starting...");
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar, verbose }
    }

    /// No drawing at all, for output that is not a terminal
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
            verbose: false,
        }
    }

    pub fn update(&self, event: &DownloadProgress) {
        if let Some(dest) = &event.destination {
            self.bar.set_message(file_label(dest));
        }
        match event.percent {
            Some(percent) => self.bar.set_position(percent.round() as u64),
            None if self.verbose && event.destination.is_none() => {
                self.bar.println(event.line.dimmed().to_string());
            }
            None => {}
        }
    }

    pub fn finish(&self, message: &str) {
        self.bar.finish_and_clear();
        println!("{}", message);
    }

    pub fn abandon(&self) {
        self.bar.finish_and_clear();
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
