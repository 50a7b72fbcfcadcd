//! Core modules: yt-dlp invocation, selectors, progress, process control

pub mod args;
pub mod downloader;
pub mod formats;
pub mod metadata;
pub mod operation;
pub mod process;
pub mod progress;
pub mod selector;
pub mod thumbnail;
pub mod ytdlp;

pub use operation::{OperationGuard, OperationKind, OperationSlot};
pub use ytdlp::YtDlp;
