use crate::difficulty::NoteChanges;
use crate::{MapEditor, MapStorage, Note, Renderer, Result, TempoMap};

impl<S: MapStorage, R: Renderer> MapEditor<S, R> {
    /// Inserts the notes that are not present yet, draws exactly those and
    /// returns them.
    pub fn add_notes(&mut self, notes: &[Note], record_history: bool) -> Result<Vec<Note>> {
        let (difficulty, renderer) = self.active()?;
        let inserted = difficulty.add_notes(notes.iter().copied(), record_history);
        if !inserted.is_empty() {
            renderer.draw_notes(&inserted);
            tracing::debug!(count = inserted.len(), "notes added");
        }
        Ok(inserted)
    }

    /// Removes the notes (and their selection) and undraws the ones that
    /// were present.
    pub fn remove_notes(&mut self, notes: &[Note], record_history: bool) -> Result<Vec<Note>> {
        let (difficulty, renderer) = self.active()?;
        let removed = difficulty.remove_notes(notes.iter().copied(), record_history);
        if !removed.is_empty() {
            renderer.undraw_notes(&removed);
            tracing::debug!(count = removed.len(), "notes removed");
        }
        Ok(removed)
    }

    /// Replaces `old` with `new` as one undo step and selects `new`.
    pub fn update_notes(&mut self, new: &[Note], old: &[Note]) -> Result<NoteChanges> {
        let (difficulty, renderer) = self.active()?;
        let previous = difficulty.clear_selection();
        renderer.unhighlight_notes(&previous);

        let changes = difficulty.update_notes(new, old)?;
        if !changes.removed.is_empty() {
            renderer.undraw_notes(&changes.removed);
        }
        if !changes.inserted.is_empty() {
            renderer.draw_notes(&changes.inserted);
        }
        let selected: Vec<Note> = difficulty.selected_notes().iter().copied().collect();
        renderer.highlight_notes(&selected);

        tracing::debug!(
            removed = changes.removed.len(),
            inserted = changes.inserted.len(),
            "notes updated"
        );
        Ok(changes)
    }

    /// Places a single note. Returns false when the cell is already taken.
    pub fn place_note(&mut self, beat: f64, col: i32) -> Result<bool> {
        let note = Note::new(beat, col);
        self.validate_note(&note)?;
        Ok(!self.add_notes(&[note], true)?.is_empty())
    }

    pub fn delete_note(&mut self, note: Note) -> Result<bool> {
        Ok(!self.remove_notes(&[note], true)?.is_empty())
    }

    /// Drags a note to a new cell as one undo step.
    pub fn move_note(&mut self, from: Note, to: Note) -> Result<bool> {
        self.validate_note(&to)?;
        if !self.active_ref()?.notes().contains(&from) {
            return Ok(false);
        }
        let changes = self.update_notes(&[to], &[from])?;
        Ok(!changes.is_empty())
    }

    pub fn delete_selection(&mut self) -> Result<usize> {
        let selected: Vec<Note> = self.active_ref()?.selected_notes().iter().copied().collect();
        Ok(self.remove_notes(&selected, true)?.len())
    }

    /// Reverts the last step. Returns false when there was nothing to undo.
    pub fn undo(&mut self) -> Result<bool> {
        let (difficulty, renderer) = self.active()?;
        if !difficulty.history().can_undo() {
            return Ok(false);
        }
        let previous = difficulty.clear_selection();
        renderer.unhighlight_notes(&previous);
        let changes = difficulty.undo();
        replay(renderer, &changes);
        tracing::debug!(steps = changes.len(), "undo");
        Ok(true)
    }

    /// Reapplies the last undone step. Returns false at the end of history.
    pub fn redo(&mut self) -> Result<bool> {
        let (difficulty, renderer) = self.active()?;
        if !difficulty.history().can_redo() {
            return Ok(false);
        }
        let previous = difficulty.clear_selection();
        renderer.unhighlight_notes(&previous);
        let changes = difficulty.redo();
        replay(renderer, &changes);
        tracing::debug!(steps = changes.len(), "redo");
        Ok(true)
    }

    /// Snaps every selected note to the grid of its tempo region.
    pub fn quantize_selection(&mut self) -> Result<bool> {
        self.transform_selection("quantize", |tempo, note| {
            Note::new(tempo.quantize(note.beat), note.col)
        })
    }

    /// Mirrors the selection across the centre of the grid.
    pub fn mirror_selection(&mut self) -> Result<bool> {
        let last_col = self.config.columns - 1;
        self.transform_selection("mirror", |_, note| Note::new(note.beat, last_col - note.col))
    }

    pub fn shift_selection_by_beat(&mut self, beat_offset: f64) -> Result<bool> {
        self.transform_selection("shift beat", |_, note| note.shifted(beat_offset, 0))
    }

    pub fn shift_selection_by_col(&mut self, col_offset: i32) -> Result<bool> {
        self.transform_selection("shift column", |_, note| note.shifted(0.0, col_offset))
    }

    /// Copies the selection to the clipboard.
    pub fn copy(&mut self) -> Result<usize> {
        self.clipboard = self.active_ref()?.selected_notes().clone();
        Ok(self.clipboard.len())
    }

    pub fn cut(&mut self) -> Result<usize> {
        let count = self.copy()?;
        self.delete_selection()?;
        Ok(count)
    }

    /// Pastes the clipboard with its earliest note at `beat` (and in `col`
    /// when given). Notes that would leave the grid are dropped; the pasted
    /// notes become the selection.
    pub fn paste(&mut self, beat: f64, col: Option<i32>) -> Result<Vec<Note>> {
        let Some(anchor) = self.clipboard.first().copied() else {
            return Ok(Vec::new());
        };
        let beat_offset = beat - anchor.beat;
        let col_offset = col.map_or(0, |col| col - anchor.col);

        let shifted: Vec<Note> = self
            .clipboard
            .iter()
            .map(|note| note.shifted(beat_offset, col_offset))
            .filter(|note| self.fits_grid(note))
            .collect();
        let dropped = self.clipboard.len() - shifted.len();
        if dropped > 0 {
            tracing::debug!(dropped, "paste dropped notes outside the grid");
        }
        if shifted.is_empty() {
            return Ok(Vec::new());
        }

        let inserted = self.add_notes(&shifted, true)?;
        let (difficulty, renderer) = self.active()?;
        let delta = difficulty.select(shifted, false);
        renderer.unhighlight_notes(&delta.deselected);
        renderer.highlight_notes(&delta.selected);
        Ok(inserted)
    }

    /// Computes a transformed copy of the selection and commits it through
    /// [`Self::update_notes`]. The whole transform is rejected when any note
    /// would leave the grid.
    fn transform_selection<F>(&mut self, label: &str, transform: F) -> Result<bool>
    where
        F: Fn(&TempoMap<'_>, Note) -> Note,
    {
        let difficulty = self.active_ref()?;
        let old: Vec<Note> = difficulty.selected_notes().iter().copied().collect();
        if old.is_empty() {
            return Ok(false);
        }
        let tempo = difficulty.tempo_map(self.global_bpm, self.config.default_grid_division);
        let new: Vec<Note> = old.iter().map(|note| transform(&tempo, *note)).collect();

        if let Some(outside) = new.iter().find(|note| !self.fits_grid(note)) {
            tracing::debug!(label, beat = outside.beat, col = outside.col, "transform rejected");
            return Ok(false);
        }

        let changes = self.update_notes(&new, &old)?;
        Ok(!changes.is_empty())
    }
}

fn replay<R: Renderer>(renderer: &mut R, changes: &[(bool, Vec<Note>)]) {
    for (is_add, notes) in changes {
        if *is_add {
            renderer.draw_notes(notes);
        } else {
            renderer.undraw_notes(notes);
        }
    }
}
