use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Bookmark, BpmChange, EditorError, Note, Result};

/// Map-level key holding the song's base tempo.
pub const BPM_KEY: &str = "_beatsPerMinute";
/// Difficulty-level key used to order difficulty slots.
pub const DIFFICULTY_RANK_KEY: &str = "_difficultyRank";

/// Durable home of a map. The editor reads collections from here when a
/// difficulty is loaded and writes them back on switch and save; it never
/// touches the filesystem itself.
pub trait MapStorage {
    fn difficulty_count(&self) -> usize;

    fn notes_for_map(&self, index: usize) -> Result<Vec<Note>>;
    fn set_notes_for_map(&mut self, index: usize, notes: Vec<Note>) -> Result<()>;

    fn bpm_changes_for_map(&self, index: usize) -> Result<Vec<BpmChange>>;
    fn set_bpm_changes_for_map(&mut self, index: usize, changes: Vec<BpmChange>) -> Result<()>;

    fn bookmarks_for_map(&self, index: usize) -> Result<Vec<Bookmark>>;
    fn set_bookmarks_for_map(&mut self, index: usize, bookmarks: Vec<Bookmark>) -> Result<()>;

    /// Appends an empty difficulty and returns its index.
    fn add_map(&mut self) -> Result<usize>;
    fn delete_map(&mut self, index: usize) -> Result<()>;
    fn swap_maps(&mut self, i: usize, j: usize) -> Result<()>;

    fn value(&self, key: &str) -> Option<Value>;
    fn set_value(&mut self, key: &str, value: Value);

    fn value_for_difficulty_map(&self, index: usize, key: &str) -> Option<Value>;
    fn set_value_for_difficulty_map(&mut self, index: usize, key: &str, value: Value) -> Result<()>;

    fn save_to_file(&mut self) -> Result<()>;
}

/// Collections and metadata of one stored difficulty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoredDifficulty {
    #[serde(default)]
    pub notes: Vec<Note>,
    #[serde(default)]
    pub bpm_changes: Vec<BpmChange>,
    #[serde(default)]
    pub bookmarks: Vec<Bookmark>,
    #[serde(default)]
    pub values: BTreeMap<String, Value>,
}

/// Storage kept entirely in memory. "Saving" only bumps a counter, which
/// makes it usable as a test double and as the backing store of file-based
/// implementations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InMemoryStorage {
    #[serde(default)]
    values: BTreeMap<String, Value>,
    #[serde(default)]
    maps: Vec<StoredDifficulty>,
    #[serde(skip)]
    saves: usize,
}

impl InMemoryStorage {
    /// Creates an empty map with the given base tempo.
    pub fn new(global_bpm: f64) -> Self {
        let mut storage = Self::default();
        storage.set_value(BPM_KEY, Value::from(global_bpm));
        storage
    }

    pub fn with_difficulties(global_bpm: f64, difficulties: Vec<StoredDifficulty>) -> Self {
        let mut storage = Self::new(global_bpm);
        storage.maps = difficulties;
        storage
    }

    /// Number of successful [`MapStorage::save_to_file`] calls.
    pub fn save_count(&self) -> usize {
        self.saves
    }

    pub fn difficulty(&self, index: usize) -> Option<&StoredDifficulty> {
        self.maps.get(index)
    }

    fn map(&self, index: usize) -> Result<&StoredDifficulty> {
        let count = self.maps.len();
        self.maps
            .get(index)
            .ok_or(EditorError::DifficultyOutOfRange { index, count })
    }

    fn map_mut(&mut self, index: usize) -> Result<&mut StoredDifficulty> {
        let count = self.maps.len();
        self.maps
            .get_mut(index)
            .ok_or(EditorError::DifficultyOutOfRange { index, count })
    }
}

impl MapStorage for InMemoryStorage {
    fn difficulty_count(&self) -> usize {
        self.maps.len()
    }

    fn notes_for_map(&self, index: usize) -> Result<Vec<Note>> {
        Ok(self.map(index)?.notes.clone())
    }

    fn set_notes_for_map(&mut self, index: usize, notes: Vec<Note>) -> Result<()> {
        self.map_mut(index)?.notes = notes;
        Ok(())
    }

    fn bpm_changes_for_map(&self, index: usize) -> Result<Vec<BpmChange>> {
        Ok(self.map(index)?.bpm_changes.clone())
    }

    fn set_bpm_changes_for_map(&mut self, index: usize, changes: Vec<BpmChange>) -> Result<()> {
        self.map_mut(index)?.bpm_changes = changes;
        Ok(())
    }

    fn bookmarks_for_map(&self, index: usize) -> Result<Vec<Bookmark>> {
        Ok(self.map(index)?.bookmarks.clone())
    }

    fn set_bookmarks_for_map(&mut self, index: usize, bookmarks: Vec<Bookmark>) -> Result<()> {
        self.map_mut(index)?.bookmarks = bookmarks;
        Ok(())
    }

    fn add_map(&mut self) -> Result<usize> {
        self.maps.push(StoredDifficulty::default());
        Ok(self.maps.len() - 1)
    }

    fn delete_map(&mut self, index: usize) -> Result<()> {
        self.map(index)?;
        self.maps.remove(index);
        Ok(())
    }

    fn swap_maps(&mut self, i: usize, j: usize) -> Result<()> {
        self.map(i)?;
        self.map(j)?;
        self.maps.swap(i, j);
        Ok(())
    }

    fn value(&self, key: &str) -> Option<Value> {
        self.values.get(key).cloned()
    }

    fn set_value(&mut self, key: &str, value: Value) {
        self.values.insert(key.to_string(), value);
    }

    fn value_for_difficulty_map(&self, index: usize, key: &str) -> Option<Value> {
        self.maps.get(index)?.values.get(key).cloned()
    }

    fn set_value_for_difficulty_map(&mut self, index: usize, key: &str, value: Value) -> Result<()> {
        self.map_mut(index)?.values.insert(key.to_string(), value);
        Ok(())
    }

    fn save_to_file(&mut self) -> Result<()> {
        self.saves += 1;
        Ok(())
    }
}
