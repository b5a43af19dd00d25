//! Editor orchestration over up to [`MAX_DIFFICULTIES`] difficulty slots.
//!
//! The editor owns the live model and drives two collaborators: a
//! [`MapStorage`] that persists collections and a [`Renderer`] that is told
//! about every visible change. It is single-writer by construction: every
//! mutating method takes `&mut self`, and readers on other threads must work
//! from [`MapDifficulty::snapshot`] copies.

mod difficulty_operations;
mod marker_operations;
mod note_operations;
mod selection_operations;

use std::collections::BTreeSet;

use crate::storage::BPM_KEY;
use crate::{
    EditorConfig, EditorError, MapDifficulty, MapStorage, Note, Renderer, Result, TempoMap,
};

/// Maximum number of difficulty slots in a map.
pub const MAX_DIFFICULTIES: usize = 3;

pub struct MapEditor<S, R> {
    storage: S,
    renderer: R,
    config: EditorConfig,
    difficulties: Vec<MapDifficulty>,
    current: Option<usize>,
    clipboard: BTreeSet<Note>,
    global_bpm: f64,
    song_duration: f64,
}

impl<S: MapStorage, R: Renderer> MapEditor<S, R> {
    /// Loads every difficulty from `storage` and activates the first one.
    ///
    /// `song_duration` is the length of the audio in seconds; notes are never
    /// placed beyond it.
    pub fn open(storage: S, renderer: R, config: EditorConfig, song_duration: f64) -> Result<Self> {
        config.validate()?;
        validate_duration(song_duration)?;

        let global_bpm = storage
            .value(BPM_KEY)
            .and_then(|value| value.as_f64())
            .ok_or_else(|| EditorError::MissingValue(BPM_KEY.to_string()))?;
        validate_bpm(global_bpm)?;

        let count = storage.difficulty_count();
        if count > MAX_DIFFICULTIES {
            return Err(EditorError::TooManyDifficulties {
                max: MAX_DIFFICULTIES,
            });
        }
        let difficulties = (0..count)
            .map(|index| MapDifficulty::load(&storage, index, config.history_capacity))
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(global_bpm, difficulties = count, "opened map");

        let mut editor = Self {
            storage,
            renderer,
            config,
            difficulties,
            current: None,
            clipboard: BTreeSet::new(),
            global_bpm,
            song_duration,
        };
        if count > 0 {
            editor.current = Some(0);
            editor.redraw_current();
        }
        Ok(editor)
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Direct access to the backend. Collections of loaded difficulties
    /// are overwritten on the next flush.
    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    /// Hands the storage back, dropping the live model. Call [`Self::save`]
    /// first to keep unsaved edits.
    pub fn into_storage(self) -> S {
        self.storage
    }

    pub fn global_bpm(&self) -> f64 {
        self.global_bpm
    }

    pub fn song_duration(&self) -> f64 {
        self.song_duration
    }

    pub fn clipboard(&self) -> &BTreeSet<Note> {
        &self.clipboard
    }

    pub fn difficulty_count(&self) -> usize {
        self.difficulties.len()
    }

    pub fn difficulty(&self, index: usize) -> Option<&MapDifficulty> {
        self.difficulties.get(index)
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn current_difficulty(&self) -> Option<&MapDifficulty> {
        self.current.and_then(|index| self.difficulties.get(index))
    }

    /// True when any difficulty holds changes not yet flushed to storage.
    pub fn is_dirty(&self) -> bool {
        self.difficulties.iter().any(MapDifficulty::is_dirty)
    }

    /// Tempo view of the active difficulty.
    pub fn tempo_map(&self) -> Result<TempoMap<'_>> {
        let difficulty = self.active_ref()?;
        Ok(difficulty.tempo_map(self.global_bpm, self.config.default_grid_division))
    }

    /// Length of the song in global beats.
    pub fn total_beats(&self) -> f64 {
        self.song_duration * self.global_bpm / 60.0
    }

    pub fn beat_to_seconds(&self, beat: f64) -> f64 {
        beat * 60.0 / self.global_bpm
    }

    pub fn seconds_to_beat(&self, seconds: f64) -> f64 {
        seconds * self.global_bpm / 60.0
    }

    pub fn set_global_bpm(&mut self, bpm: f64) -> Result<()> {
        validate_bpm(bpm)?;
        self.global_bpm = bpm;
        self.storage.set_value(BPM_KEY, serde_json::Value::from(bpm));
        tracing::debug!(bpm, "global BPM changed");
        self.renderer.redraw_grid();
        self.renderer.redraw_markers();
        Ok(())
    }

    pub fn set_song_duration(&mut self, seconds: f64) -> Result<()> {
        validate_duration(seconds)?;
        self.song_duration = seconds;
        self.renderer.redraw_grid();
        Ok(())
    }

    /// Writes the active difficulty's collections back to storage.
    pub fn flush_current(&mut self) -> Result<()> {
        if let Some(index) = self.current {
            self.difficulties[index].flush(&mut self.storage, index)?;
        }
        Ok(())
    }

    /// Flushes every dirty difficulty and asks storage to persist the map.
    pub fn save(&mut self) -> Result<()> {
        for (index, difficulty) in self.difficulties.iter_mut().enumerate() {
            if difficulty.is_dirty() {
                difficulty.flush(&mut self.storage, index)?;
            }
        }
        self.storage.save_to_file()?;
        tracing::info!(difficulties = self.difficulties.len(), "map saved");
        Ok(())
    }

    fn active_ref(&self) -> Result<&MapDifficulty> {
        self.current_difficulty()
            .ok_or(EditorError::NoDifficultySelected)
    }

    /// Splits the borrow so the active difficulty and the renderer can be
    /// used together.
    fn active(&mut self) -> Result<(&mut MapDifficulty, &mut R)> {
        let index = self.current.ok_or(EditorError::NoDifficultySelected)?;
        let difficulty = self
            .difficulties
            .get_mut(index)
            .ok_or(EditorError::NoDifficultySelected)?;
        Ok((difficulty, &mut self.renderer))
    }

    fn redraw_current(&mut self) {
        if let Some(difficulty) = self.current_difficulty() {
            let notes: Vec<Note> = difficulty.notes().iter().copied().collect();
            let selected: Vec<Note> = difficulty.selected_notes().iter().copied().collect();
            self.renderer.draw_notes(&notes);
            self.renderer.highlight_notes(&selected);
        }
        self.renderer.redraw_grid();
        self.renderer.redraw_markers();
    }

    fn validate_note(&self, note: &Note) -> Result<()> {
        note.validate(self.config.columns)?;
        if note.beat > self.total_beats() {
            return Err(EditorError::InvalidBeat(note.beat));
        }
        Ok(())
    }

    fn fits_grid(&self, note: &Note) -> bool {
        self.validate_note(note).is_ok()
    }
}

fn validate_bpm(bpm: f64) -> Result<()> {
    if bpm.is_finite() && bpm > 0.0 {
        Ok(())
    } else {
        Err(EditorError::InvalidBpm(bpm))
    }
}

fn validate_duration(seconds: f64) -> Result<()> {
    if seconds.is_finite() && seconds >= 0.0 {
        Ok(())
    } else {
        Err(EditorError::msg(format!(
            "song duration {seconds} must be finite and non-negative"
        )))
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::storage::StoredDifficulty;
    use crate::{BpmChange, InMemoryStorage, RecordingRenderer};

    pub type TestEditor = MapEditor<InMemoryStorage, RecordingRenderer>;

    pub fn notes(list: &[(f64, i32)]) -> Vec<Note> {
        list.iter().map(|&(beat, col)| Note::new(beat, col)).collect()
    }

    pub fn stored(list: &[(f64, i32)], changes: &[BpmChange]) -> StoredDifficulty {
        StoredDifficulty {
            notes: notes(list),
            bpm_changes: changes.to_vec(),
            ..Default::default()
        }
    }

    /// 120 BPM, 60 second song (120 beats), one difficulty.
    pub fn editor_with(list: &[(f64, i32)]) -> TestEditor {
        editor_from(vec![stored(list, &[])])
    }

    pub fn editor_from(difficulties: Vec<StoredDifficulty>) -> TestEditor {
        let storage = InMemoryStorage::with_difficulties(120.0, difficulties);
        MapEditor::open(storage, RecordingRenderer::new(), EditorConfig::default(), 60.0).unwrap()
    }

    pub fn current_notes(editor: &TestEditor) -> Vec<Note> {
        editor
            .current_difficulty()
            .unwrap()
            .notes()
            .iter()
            .copied()
            .collect()
    }

    pub fn selected(editor: &TestEditor) -> Vec<Note> {
        editor
            .current_difficulty()
            .unwrap()
            .selected_notes()
            .iter()
            .copied()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::{InMemoryStorage, NullRenderer, RenderCall};

    #[test]
    fn open_requires_global_bpm() {
        let storage = InMemoryStorage::default();
        let err = MapEditor::open(storage, NullRenderer, EditorConfig::default(), 60.0)
            .err()
            .unwrap();
        assert!(matches!(err, EditorError::MissingValue(_)));
    }

    #[test]
    fn open_without_difficulties_has_no_current() {
        let storage = InMemoryStorage::new(120.0);
        let mut editor = MapEditor::open(storage, NullRenderer, EditorConfig::default(), 60.0).unwrap();
        assert!(editor.current_difficulty().is_none());
        assert!(matches!(
            editor.place_note(1.0, 0),
            Err(EditorError::NoDifficultySelected)
        ));
    }

    #[test]
    fn open_draws_first_difficulty() {
        let editor = editor_with(&[(1.0, 0), (2.0, 1)]);
        assert_eq!(editor.current_index(), Some(0));
        assert_eq!(editor.renderer().drawn(), notes(&[(1.0, 0), (2.0, 1)]));
    }

    #[test]
    fn beat_time_conversions_use_global_bpm() {
        let editor = editor_with(&[]);
        assert_eq!(editor.total_beats(), 120.0);
        assert_eq!(editor.beat_to_seconds(30.0), 15.0);
        assert_eq!(editor.seconds_to_beat(15.0), 30.0);
    }

    #[test]
    fn global_bpm_is_persisted() {
        let mut editor = editor_with(&[]);
        editor.set_global_bpm(150.0).unwrap();
        assert_eq!(
            editor.storage().value(BPM_KEY).and_then(|v| v.as_f64()),
            Some(150.0)
        );
        assert!(editor.renderer().calls().contains(&RenderCall::Grid));
        assert!(editor.set_global_bpm(-1.0).is_err());
        assert!(editor.set_song_duration(f64::INFINITY).is_err());
    }

    #[test]
    fn save_flushes_dirty_difficulties() {
        let mut editor = editor_with(&[(1.0, 0)]);
        editor.place_note(2.0, 3).unwrap();
        assert!(editor.is_dirty());

        editor.save().unwrap();
        assert!(!editor.is_dirty());
        let storage = editor.into_storage();
        assert_eq!(storage.save_count(), 1);
        assert_eq!(storage.notes_for_map(0).unwrap(), notes(&[(1.0, 0), (2.0, 3)]));
    }
}
