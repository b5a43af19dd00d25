use std::path::{Path, PathBuf};

use beatmap_editor_core::{
    Bookmark, BpmChange, InMemoryStorage, MapStorage, Note, Result,
};
use serde_json::Value;

/// Map storage backed by a single JSON document on disk.
///
/// Everything lives in memory between saves; `save_to_file` rewrites the
/// whole document at `path`.
pub struct JsonFileStorage {
    path: PathBuf,
    inner: InMemoryStorage,
}

impl JsonFileStorage {
    pub fn open(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let inner = serde_json::from_str(&text)?;
        tracing::debug!(?path, "loaded map");
        Ok(Self {
            path: path.to_path_buf(),
            inner,
        })
    }

    /// Redirects future saves to `path`.
    pub fn set_path(&mut self, path: PathBuf) {
        self.path = path;
    }
}

impl MapStorage for JsonFileStorage {
    fn difficulty_count(&self) -> usize {
        self.inner.difficulty_count()
    }

    fn notes_for_map(&self, index: usize) -> Result<Vec<Note>> {
        self.inner.notes_for_map(index)
    }

    fn set_notes_for_map(&mut self, index: usize, notes: Vec<Note>) -> Result<()> {
        self.inner.set_notes_for_map(index, notes)
    }

    fn bpm_changes_for_map(&self, index: usize) -> Result<Vec<BpmChange>> {
        self.inner.bpm_changes_for_map(index)
    }

    fn set_bpm_changes_for_map(&mut self, index: usize, changes: Vec<BpmChange>) -> Result<()> {
        self.inner.set_bpm_changes_for_map(index, changes)
    }

    fn bookmarks_for_map(&self, index: usize) -> Result<Vec<Bookmark>> {
        self.inner.bookmarks_for_map(index)
    }

    fn set_bookmarks_for_map(&mut self, index: usize, bookmarks: Vec<Bookmark>) -> Result<()> {
        self.inner.set_bookmarks_for_map(index, bookmarks)
    }

    fn add_map(&mut self) -> Result<usize> {
        self.inner.add_map()
    }

    fn delete_map(&mut self, index: usize) -> Result<()> {
        self.inner.delete_map(index)
    }

    fn swap_maps(&mut self, i: usize, j: usize) -> Result<()> {
        self.inner.swap_maps(i, j)
    }

    fn value(&self, key: &str) -> Option<Value> {
        self.inner.value(key)
    }

    fn set_value(&mut self, key: &str, value: Value) {
        self.inner.set_value(key, value)
    }

    fn value_for_difficulty_map(&self, index: usize, key: &str) -> Option<Value> {
        self.inner.value_for_difficulty_map(index, key)
    }

    fn set_value_for_difficulty_map(&mut self, index: usize, key: &str, value: Value) -> Result<()> {
        self.inner.set_value_for_difficulty_map(index, key, value)
    }

    fn save_to_file(&mut self) -> Result<()> {
        let text = serde_json::to_string_pretty(&self.inner)?;
        std::fs::write(&self.path, text)?;
        self.inner.save_to_file()?;
        tracing::info!(path = ?self.path, "map written");
        Ok(())
    }
}
