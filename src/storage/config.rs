//! Configuration management

use crate::error::Result;
use crate::types::Config;
use crate::utils::paths::{default_download_dir, ensure_parent, get_config_path};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Load configuration from the default location
pub async fn load_config() -> Result<Config> {
    load_config_from(&get_config_path()).await
}

/// Load configuration from file; a missing file means defaults.
/// Fields absent from the file keep their default values.
pub async fn load_config_from(path: &Path) -> Result<Config> {
    let mut config = if path.exists() {
        let content = fs::read_to_string(path).await?;
        serde_json::from_str::<Config>(&content)?
    } else {
        tracing::debug!(path = %path.display(), "no config file; using defaults");
        Config::default()
    };

    // Set download_dir with default if empty
    if config.download_dir.trim().is_empty() {
        config.download_dir = default_download_dir().to_string_lossy().into_owned();
    }

    Ok(config)
}

/// Save configuration to the default location
pub async fn save_config(config: &Config) -> Result<()> {
    save_config_to(&get_config_path(), config).await
}

pub async fn save_config_to(path: &Path, config: &Config) -> Result<()> {
    ensure_parent(path).await?;
    let content = serde_json::to_string_pretty(config)?;
    fs::write(path, content).await?;
    Ok(())
}

/// Directory downloads land in
pub fn download_dir(config: &Config) -> PathBuf {
    if config.download_dir.trim().is_empty() {
        default_download_dir()
    } else {
        PathBuf::from(config.download_dir.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_file_gives_defaults_with_download_dir() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_from(&dir.path().join("config.json")).await.unwrap();
        assert!(cfg.auto_merge);
        assert_eq!(cfg.audio_ext, "best");
        assert!(!cfg.download_dir.is_empty());
    }

    #[tokio::test]
    async fn test_partial_file_merges_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"download_dir": "/media/videos", "auto_merge": false}"#).unwrap();
        let cfg = load_config_from(&path).await.unwrap();
        assert_eq!(cfg.download_dir, "/media/videos");
        assert!(!cfg.auto_merge);
        assert_eq!(cfg.tool_path, Config::default().tool_path);
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub/config.json");
        let cfg = Config {
            download_dir: "/tmp/dl".into(),
            sub_langs: vec!["en".into(), "de".into()],
            sort: Some("res:1080".into()),
            ..Config::default()
        };
        save_config_to(&path, &cfg).await.unwrap();
        assert_eq!(load_config_from(&path).await.unwrap(), cfg);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{").unwrap();
        assert!(load_config_from(&path).await.is_err());
    }

    #[test]
    fn test_download_dir_falls_back() {
        let cfg = Config::default();
        assert_eq!(download_dir(&cfg), default_download_dir());
        let cfg = Config {
            download_dir: " /srv/media ".into(),
            ..Config::default()
        };
        assert_eq!(download_dir(&cfg), PathBuf::from("/srv/media"));
    }
}
