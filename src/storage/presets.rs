//! Preset store: named yt-dlp argument strings

use crate::error::Result;
use crate::types::{Preset, PresetStore};
use crate::utils::paths::ensure_parent;
use std::path::Path;
use tokio::fs;

impl PresetStore {
    /// The three presets a fresh install starts with
    pub fn builtin() -> Self {
        Self {
            items: vec![
                Preset::new(
                    "mp4",
                    "-f bestvideo[ext=mp4]+bestaudio/best --merge-output-format mp4",
                    true,
                ),
                Preset::new("mp3", "-f bestaudio --extract-audio --audio-format mp3", false),
                Preset::new(
                    "webm",
                    "-f bestvideo[ext=webm]+bestaudio/best --merge-output-format webm",
                    false,
                ),
            ],
        }
    }

    /// Load presets from file.
    ///
    /// A missing, unreadable, corrupt or empty file yields the built-ins,
    /// which are written back so the file is valid next time.
    pub async fn load(path: &Path) -> Result<Self> {
        match Self::read(path).await {
            Some(store) if !store.items.is_empty() => Ok(store),
            _ => {
                tracing::info!(path = %path.display(), "restoring built-in presets");
                let store = Self::builtin();
                store.save(path).await?;
                Ok(store)
            }
        }
    }

    async fn read(path: &Path) -> Option<Self> {
        let content = match fs::read(path).await {
            Ok(content) => content,
            Err(e) => {
                tracing::debug!(path = %path.display(), "presets unreadable: {}", e);
                return None;
            }
        };
        // Tolerate a UTF-8 BOM
        let content = content.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(&content);
        match serde_json::from_slice(content) {
            Ok(store) => Some(store),
            Err(e) => {
                tracing::warn!(path = %path.display(), "presets file is corrupt: {}", e);
                None
            }
        }
    }

    /// Save presets to file
    pub async fn save(&self, path: &Path) -> Result<()> {
        ensure_parent(path).await?;
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).await?;
        Ok(())
    }

    /// Load, apply `change`, save
    pub async fn update<F>(path: &Path, change: F) -> Result<Self>
    where
        F: FnOnce(&mut Self),
    {
        let mut store = Self::load(path).await?;
        change(&mut store);
        store.save(path).await?;
        Ok(store)
    }

    pub fn find(&self, name: &str) -> Option<&Preset> {
        self.items.iter().find(|p| p.name.eq_ignore_ascii_case(name))
    }

    pub fn default_preset(&self) -> Option<&Preset> {
        self.items.iter().find(|p| p.is_default)
    }

    /// Make `name` the only default; an unknown name clears every flag
    pub fn mark_default(&mut self, name: &str) {
        for preset in &mut self.items {
            preset.is_default = preset.name.eq_ignore_ascii_case(name);
        }
    }

    /// Insert or replace by name
    pub fn upsert(&mut self, preset: Preset) {
        let name = preset.name.clone();
        let is_default = preset.is_default;
        match self
            .items
            .iter_mut()
            .find(|p| p.name.eq_ignore_ascii_case(&name))
        {
            Some(existing) => *existing = preset,
            None => self.items.push(preset),
        }
        if is_default {
            self.mark_default(&name);
        }
    }

    /// Remove by name; returns whether anything was removed
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|p| !p.name.eq_ignore_ascii_case(name));
        self.items.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_file_restores_builtins() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("presets.json");

        let store = PresetStore::load(&path).await.unwrap();
        assert_eq!(store, PresetStore::builtin());
        assert_eq!(store.default_preset().map(|p| p.name.as_str()), Some("mp4"));
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_corrupt_or_empty_file_restores_builtins() {
        let dir = tempfile::tempdir().unwrap();
        for content in ["{not json", "", r#"{"Items": []}"#, r#"{"Items": null}"#] {
            let path = dir.path().join("presets.json");
            std::fs::write(&path, content).unwrap();
            let store = PresetStore::load(&path).await.unwrap();
            assert_eq!(store.items.len(), 3, "content {content:?}");

            let saved: PresetStore =
                serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
            assert_eq!(saved, store);
        }
    }

    #[tokio::test]
    async fn test_existing_file_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("presets.json");
        std::fs::write(
            &path,
            "\u{FEFF}{\"Items\":[{\"Name\":\"opus\",\"Args\":\"-x --audio-format opus\",\"IsDefault\":true}]}",
        )
        .unwrap();
        let store = PresetStore::load(&path).await.unwrap();
        assert_eq!(store.items.len(), 1);
        assert_eq!(store.find("OPUS").map(|p| p.args.as_str()), Some("-x --audio-format opus"));
    }

    #[test]
    fn test_mark_default_is_exclusive_and_case_insensitive() {
        let mut store = PresetStore::builtin();
        store.mark_default("WEBM");
        let defaults: Vec<_> = store.items.iter().filter(|p| p.is_default).collect();
        assert_eq!(defaults.len(), 1);
        assert_eq!(defaults[0].name, "webm");
    }

    #[test]
    fn test_upsert_replaces_and_honours_default() {
        let mut store = PresetStore::builtin();
        store.upsert(Preset::new("MP3", "-x --audio-format mp3 --audio-quality 0", true));
        assert_eq!(store.items.len(), 3);
        assert_eq!(store.default_preset().map(|p| p.name.as_str()), Some("MP3"));

        store.upsert(Preset::new("flac", "-x --audio-format flac", false));
        assert_eq!(store.items.len(), 4);
        assert_eq!(store.default_preset().map(|p| p.name.as_str()), Some("MP3"));
    }

    #[test]
    fn test_remove() {
        let mut store = PresetStore::builtin();
        assert!(store.remove("Mp4"));
        assert!(!store.remove("mp4"));
        assert!(store.default_preset().is_none());
    }

    #[tokio::test]
    async fn test_update_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/presets.json");
        PresetStore::update(&path, |s| s.mark_default("mp3")).await.unwrap();
        let reloaded = PresetStore::load(&path).await.unwrap();
        assert_eq!(reloaded.default_preset().map(|p| p.name.as_str()), Some("mp3"));
    }
}
