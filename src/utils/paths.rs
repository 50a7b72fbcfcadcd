//! Path utilities for yt-grab
//!
//! Respects XDG Base Directory Specification

use crate::error::Result;
use std::env;
use std::path::{Path, PathBuf};
use tokio::fs;

const APP_NAME: &str = "yt-grab";
const PRESETS_FILE: &str = "presets.json";

/// Get config directory path
/// Respects XDG_CONFIG_HOME, defaults to ~/.config/yt-grab
pub fn get_config_dir() -> PathBuf {
    let base = env::var_os("XDG_CONFIG_HOME")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(dirs::config_dir)
        .unwrap_or_else(|| {
            PathBuf::from(env::var_os("HOME").unwrap_or_default()).join(".config")
        });

    base.join(APP_NAME)
}

/// Get config file path
pub fn get_config_path() -> PathBuf {
    get_config_dir().join("config.json")
}

/// Presets sit next to the executable, or in the config dir when
/// the executable location is unknown
pub fn get_presets_path() -> PathBuf {
    let exe_dir = env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf));
    presets_path_in(exe_dir.as_deref())
}

fn presets_path_in(exe_dir: Option<&Path>) -> PathBuf {
    match exe_dir {
        Some(dir) => dir.join(PRESETS_FILE),
        None => get_config_dir().join(PRESETS_FILE),
    }
}

/// Default download directory: ~/Downloads, else the working directory
pub fn default_download_dir() -> PathBuf {
    dirs::download_dir()
        .or_else(|| env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Ensure a directory exists
pub async fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).await?;
    Ok(())
}

/// Ensure the parent directory of a file exists
pub async fn ensure_parent(file: &Path) -> Result<()> {
    match file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => ensure_dir(parent).await,
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_path_ends_with_app_dir() {
        let path = get_config_path();
        assert!(path.ends_with("yt-grab/config.json"));
    }

    #[test]
    fn test_presets_path_prefers_exe_dir() {
        assert_eq!(
            presets_path_in(Some(Path::new("/opt/yt-grab/bin"))),
            PathBuf::from("/opt/yt-grab/bin/presets.json")
        );
        assert!(presets_path_in(None).ends_with("yt-grab/presets.json"));
    }

    #[tokio::test]
    async fn test_ensure_parent_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a/b/presets.json");
        ensure_parent(&file).await.unwrap();
        assert!(dir.path().join("a/b").is_dir());
        ensure_parent(Path::new("relative.json")).await.unwrap();
    }
}
