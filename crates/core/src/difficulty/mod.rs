//! In-memory model of one difficulty.
//!
//! A `MapDifficulty` is not synchronised. All mutation must happen on the
//! thread that owns the editor; background readers (autosave, waveform
//! rendering) should work on a [`DifficultySnapshot`] instead of borrowing
//! the live collections.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::ops::Bound;

use serde::{Deserialize, Serialize};

use crate::{Bookmark, BpmChange, EditHistory, EditList, MapStorage, Note, Result, TempoMap};

/// Point-in-time copy of a difficulty's collections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DifficultySnapshot {
    pub notes: Vec<Note>,
    pub bpm_changes: Vec<BpmChange>,
    pub bookmarks: Vec<Bookmark>,
}

/// Notes that actually left and entered the note set during an update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NoteChanges {
    pub removed: Vec<Note>,
    pub inserted: Vec<Note>,
}

impl NoteChanges {
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.inserted.is_empty()
    }
}

/// Membership changes produced by a selection operation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionDelta {
    pub selected: Vec<Note>,
    pub deselected: Vec<Note>,
}

#[derive(Debug, Clone)]
pub struct MapDifficulty {
    notes: BTreeSet<Note>,
    bookmarks: BTreeSet<Bookmark>,
    bpm_changes: BTreeSet<BpmChange>,
    selected_notes: BTreeSet<Note>,
    history: EditHistory<Note>,
    dirty: bool,
}

impl MapDifficulty {
    pub fn new(history_capacity: usize) -> Self {
        Self {
            notes: BTreeSet::new(),
            bookmarks: BTreeSet::new(),
            bpm_changes: BTreeSet::new(),
            selected_notes: BTreeSet::new(),
            history: EditHistory::with_capacity(history_capacity),
            dirty: false,
        }
    }

    pub fn from_parts(
        notes: Vec<Note>,
        bpm_changes: Vec<BpmChange>,
        bookmarks: Vec<Bookmark>,
        history_capacity: usize,
    ) -> Self {
        Self {
            notes: notes.into_iter().collect(),
            bookmarks: bookmarks.into_iter().collect(),
            bpm_changes: bpm_changes.into_iter().collect(),
            ..Self::new(history_capacity)
        }
    }

    /// Reads the collections of difficulty `index` from storage.
    pub fn load<S: MapStorage>(storage: &S, index: usize, history_capacity: usize) -> Result<Self> {
        Ok(Self::from_parts(
            storage.notes_for_map(index)?,
            storage.bpm_changes_for_map(index)?,
            storage.bookmarks_for_map(index)?,
            history_capacity,
        ))
    }

    /// Writes the collections back to storage and clears the dirty flag.
    pub fn flush<S: MapStorage>(&mut self, storage: &mut S, index: usize) -> Result<()> {
        storage.set_notes_for_map(index, self.notes.iter().copied().collect())?;
        storage.set_bpm_changes_for_map(index, self.bpm_changes.iter().copied().collect())?;
        storage.set_bookmarks_for_map(index, self.bookmarks.iter().cloned().collect())?;
        self.dirty = false;
        Ok(())
    }

    pub fn snapshot(&self) -> DifficultySnapshot {
        DifficultySnapshot {
            notes: self.notes.iter().copied().collect(),
            bpm_changes: self.bpm_changes.iter().copied().collect(),
            bookmarks: self.bookmarks.iter().cloned().collect(),
        }
    }

    pub fn notes(&self) -> &BTreeSet<Note> {
        &self.notes
    }

    pub fn bookmarks(&self) -> &BTreeSet<Bookmark> {
        &self.bookmarks
    }

    pub fn bpm_changes(&self) -> &BTreeSet<BpmChange> {
        &self.bpm_changes
    }

    pub fn selected_notes(&self) -> &BTreeSet<Note> {
        &self.selected_notes
    }

    pub fn history(&self) -> &EditHistory<Note> {
        &self.history
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn tempo_map(&self, global_bpm: f64, default_grid_division: u32) -> TempoMap<'_> {
        TempoMap::new(&self.bpm_changes, global_bpm, default_grid_division)
    }

    /// Inserts the notes that are not present yet and returns exactly those.
    /// Duplicates are dropped silently.
    pub fn add_notes(&mut self, notes: impl IntoIterator<Item = Note>, record_history: bool) -> Vec<Note> {
        let inserted: Vec<Note> = notes
            .into_iter()
            .filter(|note| self.notes.insert(*note))
            .collect();
        if !inserted.is_empty() {
            self.dirty = true;
        }
        if record_history && !inserted.is_empty() {
            self.history.add(EditList::addition(inserted.iter().copied()));
        }
        inserted
    }

    /// Removes the notes from the note set and the selection, returning the
    /// ones that were present.
    pub fn remove_notes(&mut self, notes: impl IntoIterator<Item = Note>, record_history: bool) -> Vec<Note> {
        let removed: Vec<Note> = notes
            .into_iter()
            .filter(|note| {
                self.selected_notes.remove(note);
                self.notes.remove(note)
            })
            .collect();
        if !removed.is_empty() {
            self.dirty = true;
        }
        if record_history && !removed.is_empty() {
            self.history.add(EditList::removal(removed.iter().copied()));
        }
        removed
    }

    /// Replaces `old` with `new` as a single undo step. Notes present in
    /// both are left alone, so an update that changes nothing records
    /// nothing. Afterwards the selection is the part of `new` that exists.
    pub fn update_notes(&mut self, new: &[Note], old: &[Note]) -> Result<NoteChanges> {
        let old_set: BTreeSet<Note> = old.iter().copied().collect();
        let new_set: BTreeSet<Note> = new.iter().copied().collect();
        let removed = self.remove_notes(old_set.difference(&new_set).copied().collect::<Vec<_>>(), false);
        let inserted = self.add_notes(new_set.difference(&old_set).copied().collect::<Vec<_>>(), false);
        self.selected_notes = new_set
            .into_iter()
            .filter(|note| self.notes.contains(note))
            .collect();

        let changes = NoteChanges { removed, inserted };
        if changes.is_empty() {
            return Ok(changes);
        }
        // Both halves go into a single entry.
        let mut edit = EditList::removal(changes.removed.iter().copied());
        edit.extend(EditList::addition(changes.inserted.iter().copied()));
        self.history.add(edit);
        Ok(changes)
    }

    /// Applies an edit returned by the history without recording it again.
    /// Returns the net changes in the order they were applied.
    pub fn apply_edit(&mut self, edit: &EditList<Note>) -> Vec<(bool, Vec<Note>)> {
        edit.runs()
            .into_iter()
            .map(|(is_add, items)| {
                let changed = if is_add {
                    self.add_notes(items, false)
                } else {
                    self.remove_notes(items, false)
                };
                (is_add, changed)
            })
            .filter(|(_, changed)| !changed.is_empty())
            .collect()
    }

    pub fn undo(&mut self) -> Vec<(bool, Vec<Note>)> {
        let edit = self.history.undo();
        self.apply_edit(&edit)
    }

    pub fn redo(&mut self) -> Vec<(bool, Vec<Note>)> {
        let edit = self.history.redo();
        self.apply_edit(&edit)
    }

    /// Notes with `start <= beat < end`.
    pub fn notes_in_range(&self, start: f64, end: f64) -> Vec<Note> {
        if start.total_cmp(&end) != Ordering::Less {
            return Vec::new();
        }
        self.notes
            .range((
                Bound::Included(Note::new(start, i32::MIN)),
                Bound::Excluded(Note::new(end, i32::MIN)),
            ))
            .copied()
            .collect()
    }

    /// Updates the selection. With `toggle` every note flips membership,
    /// otherwise the selection is replaced. Notes that are not part of the
    /// difficulty are ignored.
    pub fn select(&mut self, notes: impl IntoIterator<Item = Note>, toggle: bool) -> SelectionDelta {
        let mut delta = SelectionDelta::default();
        if !toggle {
            delta.deselected = self.clear_selection();
        }
        for note in notes {
            if !self.notes.contains(&note) {
                continue;
            }
            if self.selected_notes.insert(note) {
                delta.selected.push(note);
            } else if toggle {
                self.selected_notes.remove(&note);
                delta.deselected.push(note);
            }
        }
        if !toggle {
            // Notes that stayed selected produce no render traffic.
            let previous: BTreeSet<Note> = delta.deselected.iter().copied().collect();
            delta.deselected.retain(|note| !self.selected_notes.contains(note));
            delta.selected.retain(|note| !previous.contains(note));
        }
        delta
    }

    /// Empties the selection and returns what was selected.
    pub fn clear_selection(&mut self) -> Vec<Note> {
        std::mem::take(&mut self.selected_notes).into_iter().collect()
    }

    pub fn bookmark_at(&self, beat: f64) -> Option<&Bookmark> {
        self.bookmarks.get(&Bookmark::at(beat))
    }

    /// The first bookmark strictly after `beat`.
    pub fn bookmark_after(&self, beat: f64) -> Option<&Bookmark> {
        self.bookmarks
            .range((Bound::Excluded(Bookmark::at(beat)), Bound::Unbounded))
            .next()
    }

    /// Inserts a bookmark unless one already sits within tolerance.
    pub fn add_bookmark(&mut self, bookmark: Bookmark) -> bool {
        let inserted = self.bookmarks.insert(bookmark);
        self.dirty |= inserted;
        inserted
    }

    pub fn remove_bookmark(&mut self, beat: f64) -> Option<Bookmark> {
        let removed = self.bookmarks.take(&Bookmark::at(beat));
        self.dirty |= removed.is_some();
        removed
    }

    pub fn rename_bookmark(&mut self, beat: f64, name: impl Into<String>) -> bool {
        match self.bookmarks.take(&Bookmark::at(beat)) {
            Some(mut bookmark) => {
                bookmark.name = name.into();
                self.bookmarks.insert(bookmark);
                self.dirty = true;
                true
            }
            None => false,
        }
    }

    /// Moves the bookmark at `from` to `to`. Fails when there is no bookmark
    /// at `from` or another one already occupies `to`.
    pub fn move_bookmark(&mut self, from: f64, to: f64) -> bool {
        let Some(mut bookmark) = self.bookmarks.take(&Bookmark::at(from)) else {
            return false;
        };
        let original = bookmark.beat;
        bookmark.beat = to;
        if self.bookmarks.contains(&bookmark) {
            bookmark.beat = original;
            self.bookmarks.insert(bookmark);
            return false;
        }
        self.bookmarks.insert(bookmark);
        self.dirty = true;
        true
    }

    pub fn bpm_change_at(&self, beat: f64) -> Option<&BpmChange> {
        self.bpm_changes.get(&BpmChange::at(beat))
    }

    /// The first tempo change strictly after `beat`.
    pub fn bpm_change_after(&self, beat: f64) -> Option<&BpmChange> {
        self.bpm_changes
            .range((Bound::Excluded(BpmChange::at(beat)), Bound::Unbounded))
            .next()
    }

    /// Inserts a tempo change, replacing and returning any change already at
    /// the same beat.
    pub fn add_bpm_change(&mut self, change: BpmChange) -> Option<BpmChange> {
        self.dirty = true;
        self.bpm_changes.replace(change)
    }

    pub fn remove_bpm_change(&mut self, beat: f64) -> Option<BpmChange> {
        let removed = self.bpm_changes.take(&BpmChange::at(beat));
        self.dirty |= removed.is_some();
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryStorage;

    fn notes(list: &[(f64, i32)]) -> Vec<Note> {
        list.iter().map(|&(beat, col)| Note::new(beat, col)).collect()
    }

    fn difficulty_with(list: &[(f64, i32)]) -> MapDifficulty {
        MapDifficulty::from_parts(notes(list), Vec::new(), Vec::new(), 16)
    }

    #[test]
    fn add_reports_only_inserted_notes() {
        let mut difficulty = difficulty_with(&[(1.0, 0)]);
        let inserted = difficulty.add_notes(notes(&[(1.0, 0), (2.0, 1), (2.0, 1)]), true);

        assert_eq!(inserted, notes(&[(2.0, 1)]));
        assert_eq!(difficulty.notes().len(), 2);
        assert!(difficulty.is_dirty());
        assert_eq!(difficulty.history().undo_len(), 1);
    }

    #[test]
    fn duplicate_only_add_records_nothing() {
        let mut difficulty = difficulty_with(&[(1.0, 0)]);
        assert!(difficulty.add_notes(notes(&[(1.0, 0)]), true).is_empty());
        assert_eq!(difficulty.history().undo_len(), 0);
        assert!(!difficulty.is_dirty());
    }

    #[test]
    fn remove_also_deselects() {
        let mut difficulty = difficulty_with(&[(1.0, 0), (2.0, 1)]);
        difficulty.select(notes(&[(1.0, 0), (2.0, 1)]), false);
        difficulty.remove_notes(notes(&[(1.0, 0)]), true);

        assert_eq!(difficulty.selected_notes().len(), 1);
        assert!(difficulty.selected_notes().is_subset(difficulty.notes()));
    }

    #[test]
    fn update_is_one_undo_step() {
        let mut difficulty = difficulty_with(&[(1.0, 0), (2.0, 1)]);
        let old = notes(&[(1.0, 0), (2.0, 1)]);
        let new = notes(&[(1.0, 3), (2.0, 1)]);
        let changes = difficulty.update_notes(&new, &old).unwrap();

        assert_eq!(changes.removed, notes(&[(1.0, 0)]));
        assert_eq!(changes.inserted, notes(&[(1.0, 3)]));
        assert_eq!(difficulty.history().undo_len(), 1);
        assert_eq!(difficulty.selected_notes().iter().copied().collect::<Vec<_>>(), new);

        difficulty.undo();
        assert_eq!(difficulty.notes().iter().copied().collect::<Vec<_>>(), old);
    }

    #[test]
    fn update_stays_undoable_with_single_entry_history() {
        let mut difficulty = MapDifficulty::from_parts(notes(&[(1.0, 0)]), Vec::new(), Vec::new(), 1);
        let changes = difficulty
            .update_notes(&notes(&[(2.0, 0)]), &notes(&[(1.0, 0)]))
            .unwrap();
        assert_eq!(changes.inserted, notes(&[(2.0, 0)]));
        assert_eq!(difficulty.history().undo_len(), 1);

        difficulty.undo();
        assert_eq!(difficulty.notes().iter().copied().collect::<Vec<_>>(), notes(&[(1.0, 0)]));
        difficulty.redo();
        assert_eq!(difficulty.notes().iter().copied().collect::<Vec<_>>(), notes(&[(2.0, 0)]));
    }

    #[test]
    fn unchanged_update_records_nothing() {
        let mut difficulty = difficulty_with(&[(1.0, 0), (2.0, 1)]);
        let same = notes(&[(1.0, 0), (2.0, 1)]);
        let changes = difficulty.update_notes(&same, &same).unwrap();

        assert!(changes.is_empty());
        assert!(!difficulty.history().can_undo());
        assert_eq!(difficulty.selected_notes().len(), 2);
    }

    #[test]
    fn undo_redo_round_trip_restores_state() {
        let mut difficulty = difficulty_with(&[(0.0, 0)]);
        let initial = difficulty.snapshot();

        difficulty.add_notes(notes(&[(1.0, 1), (2.0, 2)]), true);
        difficulty.remove_notes(notes(&[(0.0, 0)]), true);
        difficulty
            .update_notes(&notes(&[(1.5, 1)]), &notes(&[(1.0, 1)]))
            .unwrap();
        difficulty.add_notes(notes(&[(1.5, 1), (3.0, 3)]), true);
        let edited = difficulty.snapshot();

        while difficulty.history().can_undo() {
            difficulty.undo();
        }
        assert_eq!(difficulty.snapshot(), initial);

        while difficulty.history().can_redo() {
            difficulty.redo();
        }
        assert_eq!(difficulty.snapshot(), edited);
    }

    #[test]
    fn toggle_selection_is_xor() {
        let mut difficulty = difficulty_with(&[(1.0, 0), (2.0, 1), (3.0, 2)]);
        difficulty.select(notes(&[(1.0, 0), (2.0, 1)]), false);
        let delta = difficulty.select(notes(&[(2.0, 1), (3.0, 2)]), true);

        assert_eq!(delta.selected, notes(&[(3.0, 2)]));
        assert_eq!(delta.deselected, notes(&[(2.0, 1)]));
        assert_eq!(
            difficulty.selected_notes().iter().copied().collect::<Vec<_>>(),
            notes(&[(1.0, 0), (3.0, 2)])
        );
    }

    #[test]
    fn replace_selection_reports_only_changes() {
        let mut difficulty = difficulty_with(&[(1.0, 0), (2.0, 1), (3.0, 2)]);
        difficulty.select(notes(&[(1.0, 0), (2.0, 1)]), false);
        let delta = difficulty.select(notes(&[(2.0, 1), (3.0, 2), (9.0, 0)]), false);

        assert_eq!(delta.selected, notes(&[(3.0, 2)]));
        assert_eq!(delta.deselected, notes(&[(1.0, 0)]));
        assert_eq!(difficulty.selected_notes().len(), 2);
    }

    #[test]
    fn range_query_is_half_open() {
        let difficulty = difficulty_with(&[(1.0, 3), (2.0, 0), (2.0, 3), (4.0, 0)]);
        assert_eq!(difficulty.notes_in_range(1.0, 4.0), notes(&[(1.0, 3), (2.0, 0), (2.0, 3)]));
        assert!(difficulty.notes_in_range(4.0, 4.0).is_empty());
    }

    #[test]
    fn bookmark_editing() {
        let mut difficulty = MapDifficulty::new(8);
        assert!(difficulty.add_bookmark(Bookmark::new(4.0, "verse")));
        assert!(difficulty.add_bookmark(Bookmark::new(12.0, "chorus")));
        assert!(!difficulty.add_bookmark(Bookmark::new(4.00001, "dupe")));

        assert_eq!(difficulty.bookmark_after(4.0).unwrap().name, "chorus");
        assert!(difficulty.bookmark_after(12.0).is_none());

        assert!(difficulty.rename_bookmark(12.0, "drop"));
        assert_eq!(difficulty.bookmark_at(12.0).unwrap().name, "drop");

        assert!(!difficulty.move_bookmark(4.0, 12.00002));
        assert!(difficulty.move_bookmark(4.0, 6.0));
        assert_eq!(difficulty.bookmark_at(6.0).unwrap().name, "verse");
        assert!(difficulty.remove_bookmark(6.0).is_some());
        assert_eq!(difficulty.bookmarks().len(), 1);
    }

    #[test]
    fn bpm_change_replaces_same_beat() {
        let mut difficulty = MapDifficulty::new(8);
        assert!(difficulty.add_bpm_change(BpmChange::new(8.0, 180.0, 4)).is_none());
        let replaced = difficulty.add_bpm_change(BpmChange::new(8.0, 90.0, 3)).unwrap();
        assert_eq!(replaced.bpm, 180.0);
        assert_eq!(difficulty.bpm_change_at(8.0).unwrap().bpm, 90.0);
        assert!(difficulty.bpm_change_after(0.0).is_some());
        assert!(difficulty.remove_bpm_change(8.0).is_some());
        assert!(difficulty.bpm_changes().is_empty());
    }

    #[test]
    fn load_and_flush_through_storage() {
        let mut storage = InMemoryStorage::new(120.0);
        let index = storage.add_map().unwrap();
        storage
            .set_notes_for_map(index, notes(&[(1.0, 0), (1.0, 0), (2.0, 2)]))
            .unwrap();

        let mut difficulty = MapDifficulty::load(&storage, index, 8).unwrap();
        assert_eq!(difficulty.notes().len(), 2);

        difficulty.add_notes(notes(&[(3.0, 1)]), true);
        difficulty.add_bookmark(Bookmark::new(3.0, "end"));
        difficulty.flush(&mut storage, index).unwrap();

        assert!(!difficulty.is_dirty());
        assert_eq!(storage.notes_for_map(index).unwrap().len(), 3);
        assert_eq!(storage.bookmarks_for_map(index).unwrap()[0].name, "end");
    }
}
