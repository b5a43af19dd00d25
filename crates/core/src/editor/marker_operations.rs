use crate::entity::validate_beat;
use crate::{Bookmark, BpmChange, MapEditor, MapStorage, Note, Renderer, Result, TempoMap};

impl<S: MapStorage, R: Renderer> MapEditor<S, R> {
    /// Adds a bookmark. Returns false when one already sits at that beat.
    pub fn add_bookmark(&mut self, beat: f64, name: impl Into<String>) -> Result<bool> {
        validate_beat(beat)?;
        let (difficulty, renderer) = self.active()?;
        let added = difficulty.add_bookmark(Bookmark::new(beat, name));
        if added {
            renderer.redraw_markers();
            tracing::debug!(beat, "bookmark added");
        }
        Ok(added)
    }

    pub fn remove_bookmark(&mut self, beat: f64) -> Result<Option<Bookmark>> {
        let (difficulty, renderer) = self.active()?;
        let removed = difficulty.remove_bookmark(beat);
        if removed.is_some() {
            renderer.redraw_markers();
            tracing::debug!(beat, "bookmark removed");
        }
        Ok(removed)
    }

    pub fn rename_bookmark(&mut self, beat: f64, name: impl Into<String>) -> Result<bool> {
        let (difficulty, renderer) = self.active()?;
        let renamed = difficulty.rename_bookmark(beat, name);
        if renamed {
            renderer.redraw_markers();
            tracing::debug!(beat, "bookmark renamed");
        }
        Ok(renamed)
    }

    pub fn move_bookmark(&mut self, from: f64, to: f64) -> Result<bool> {
        validate_beat(to)?;
        let (difficulty, renderer) = self.active()?;
        let moved = difficulty.move_bookmark(from, to);
        if moved {
            renderer.redraw_markers();
            tracing::debug!(from, to, "bookmark moved");
        }
        Ok(moved)
    }

    /// Inserts a tempo change, replacing any change at the same beat.
    pub fn add_bpm_change(&mut self, change: BpmChange) -> Result<Option<BpmChange>> {
        change.validate(self.config.max_grid_division)?;
        let (difficulty, renderer) = self.active()?;
        let replaced = difficulty.add_bpm_change(change);
        renderer.redraw_grid();
        renderer.redraw_markers();
        tracing::debug!(beat = change.global_beat, bpm = change.bpm, "tempo change added");
        Ok(replaced)
    }

    pub fn remove_bpm_change(&mut self, beat: f64) -> Result<Option<BpmChange>> {
        let (difficulty, renderer) = self.active()?;
        let removed = difficulty.remove_bpm_change(beat);
        if removed.is_some() {
            renderer.redraw_grid();
            renderer.redraw_markers();
            tracing::debug!(beat, "tempo change removed");
        }
        Ok(removed)
    }

    /// Replaces the tempo change at `beat` with `change`.
    ///
    /// The edit is refused when `change` moves onto a beat that already
    /// holds another tempo change. With `retime_notes` the notes governed by the old change keep their
    /// position in local beats under the new tempo; they move as one undo
    /// step and become the selection. Returns false when there is no change
    /// at `beat` or a retimed note would leave the grid.
    pub fn edit_bpm_change(
        &mut self,
        beat: f64,
        change: BpmChange,
        retime_notes: bool,
    ) -> Result<bool> {
        change.validate(self.config.max_grid_division)?;
        let difficulty = self.active_ref()?;
        let Some(old) = difficulty.bpm_change_at(beat).copied() else {
            return Ok(false);
        };
        if change != old && difficulty.bpm_change_at(change.global_beat).is_some() {
            tracing::debug!(
                from = old.global_beat,
                to = change.global_beat,
                "tempo edit rejected, target beat already has a change"
            );
            return Ok(false);
        }

        let mut retimed = None;
        if retime_notes {
            let end = difficulty
                .bpm_change_after(old.global_beat)
                .map_or(f64::INFINITY, |next| next.global_beat);
            let old_notes = difficulty.notes_in_range(old.global_beat, end);
            let new_notes: Vec<Note> = old_notes
                .iter()
                .map(|note| Note::new(TempoMap::retime(note.beat, &old, &change), note.col))
                .collect();
            if new_notes.iter().any(|note| !self.fits_grid(note)) {
                tracing::debug!(beat, "tempo edit rejected, retimed notes leave the grid");
                return Ok(false);
            }
            retimed = Some((new_notes, old_notes));
        }

        let (difficulty, renderer) = self.active()?;
        difficulty.remove_bpm_change(old.global_beat);
        difficulty.add_bpm_change(change);
        renderer.redraw_grid();
        renderer.redraw_markers();

        if let Some((new_notes, old_notes)) = retimed {
            if !old_notes.is_empty() {
                self.update_notes(&new_notes, &old_notes)?;
            }
        }
        tracing::debug!(from = old.bpm, to = change.bpm, retime_notes, "tempo change edited");
        Ok(true)
    }
}
