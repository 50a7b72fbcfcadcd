//! yt-grab library
//!
//! Drives the external yt-dlp tool: metadata fetch, format selector
//! synthesis, cancellable downloads with live progress, and presets.

pub mod core;
pub mod error;
pub mod storage;
pub mod types;
pub mod ui;
pub mod utils;

pub use crate::core::YtDlp;
pub use crate::error::{GrabError, Result};
