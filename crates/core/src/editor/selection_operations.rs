use crate::{MapEditor, MapStorage, Note, Renderer, Result};

impl<S: MapStorage, R: Renderer> MapEditor<S, R> {
    /// Selects `notes`. With `toggle` (the multi-select modifier held) each
    /// note flips membership; otherwise the selection is replaced.
    pub fn select_notes(&mut self, notes: &[Note], toggle: bool) -> Result<()> {
        let (difficulty, renderer) = self.active()?;
        let delta = difficulty.select(notes.iter().copied(), toggle);
        if !delta.deselected.is_empty() {
            renderer.unhighlight_notes(&delta.deselected);
        }
        if !delta.selected.is_empty() {
            renderer.highlight_notes(&delta.selected);
        }
        Ok(())
    }

    pub fn select_note(&mut self, note: Note, toggle: bool) -> Result<()> {
        self.select_notes(&[note], toggle)
    }

    pub fn select_all(&mut self) -> Result<()> {
        let notes: Vec<Note> = self.active_ref()?.notes().iter().copied().collect();
        self.select_notes(&notes, false)
    }

    /// Selects every note with `start <= beat < end`.
    pub fn select_range(&mut self, start: f64, end: f64, toggle: bool) -> Result<()> {
        let notes = self.active_ref()?.notes_in_range(start, end);
        self.select_notes(&notes, toggle)
    }

    /// Selects the notes between the bookmark at `beat` and the next one.
    /// Does nothing when no bookmark sits at `beat`.
    pub fn select_all_in_bookmark(&mut self, beat: f64, toggle: bool) -> Result<()> {
        let difficulty = self.active_ref()?;
        let Some(bookmark) = difficulty.bookmark_at(beat) else {
            return Ok(());
        };
        let end = difficulty
            .bookmark_after(bookmark.beat)
            .map_or(f64::INFINITY, |next| next.beat);
        let notes = difficulty.notes_in_range(bookmark.beat, end);
        self.select_notes(&notes, toggle)
    }

    /// Selects the notes governed by the tempo change at `beat`.
    pub fn select_all_in_bpm_change(&mut self, beat: f64, toggle: bool) -> Result<()> {
        let difficulty = self.active_ref()?;
        let Some(change) = difficulty.bpm_change_at(beat) else {
            return Ok(());
        };
        let end = difficulty
            .bpm_change_after(change.global_beat)
            .map_or(f64::INFINITY, |next| next.global_beat);
        let notes = difficulty.notes_in_range(change.global_beat, end);
        self.select_notes(&notes, toggle)
    }

    pub fn clear_selection(&mut self) -> Result<()> {
        let (difficulty, renderer) = self.active()?;
        let previous = difficulty.clear_selection();
        if !previous.is_empty() {
            renderer.unhighlight_notes(&previous);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::editor::test_support::*;
    use crate::storage::StoredDifficulty;
    use crate::{Bookmark, BpmChange, Note, RenderCall};

    fn marked_editor() -> TestEditor {
        editor_from(vec![StoredDifficulty {
            notes: notes(&[(1.0, 0), (4.0, 1), (5.5, 2), (8.0, 3), (12.0, 0)]),
            bpm_changes: vec![BpmChange::new(4.0, 180.0, 4), BpmChange::new(8.0, 90.0, 2)],
            bookmarks: vec![Bookmark::new(0.0, "intro"), Bookmark::new(5.0, "verse")],
            ..Default::default()
        }])
    }

    #[test]
    fn bookmark_interval_runs_to_next_bookmark() {
        let mut editor = marked_editor();
        editor.select_all_in_bookmark(0.0, false).unwrap();
        assert_eq!(selected(&editor), notes(&[(1.0, 0), (4.0, 1)]));

        editor.select_all_in_bookmark(5.0, false).unwrap();
        assert_eq!(selected(&editor), notes(&[(5.5, 2), (8.0, 3), (12.0, 0)]));
    }

    #[test]
    fn bpm_interval_runs_to_next_change() {
        let mut editor = marked_editor();
        editor.select_all_in_bpm_change(4.0, false).unwrap();
        assert_eq!(selected(&editor), notes(&[(4.0, 1), (5.5, 2)]));

        editor.select_all_in_bpm_change(8.0, true).unwrap();
        assert_eq!(
            selected(&editor),
            notes(&[(4.0, 1), (5.5, 2), (8.0, 3), (12.0, 0)])
        );
    }

    #[test]
    fn missing_marker_selects_nothing() {
        let mut editor = marked_editor();
        editor.select_all_in_bookmark(3.0, false).unwrap();
        editor.select_all_in_bpm_change(3.0, false).unwrap();
        assert!(selected(&editor).is_empty());
    }

    #[test]
    fn toggle_flips_membership() {
        let mut editor = marked_editor();
        editor.select_range(0.0, 6.0, false).unwrap();
        editor.select_range(4.0, 9.0, true).unwrap();
        assert_eq!(selected(&editor), notes(&[(1.0, 0), (8.0, 3)]));
    }

    #[test]
    fn selection_changes_are_highlighted() {
        let mut editor = marked_editor();
        editor.renderer_mut().clear();
        editor.select_note(Note::new(1.0, 0), false).unwrap();
        editor.select_note(Note::new(4.0, 1), false).unwrap();
        editor.clear_selection().unwrap();

        assert_eq!(
            editor.renderer().calls(),
            &[
                RenderCall::Highlight(notes(&[(1.0, 0)])),
                RenderCall::Unhighlight(notes(&[(1.0, 0)])),
                RenderCall::Highlight(notes(&[(4.0, 1)])),
                RenderCall::Unhighlight(notes(&[(4.0, 1)])),
            ]
        );
    }

    #[test]
    fn selecting_unknown_note_is_ignored() {
        let mut editor = marked_editor();
        editor.select_note(Note::new(2.0, 2), false).unwrap();
        assert!(selected(&editor).is_empty());
    }
}
