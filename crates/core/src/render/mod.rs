use crate::Note;

/// Observer notified about every visible change to the active difficulty.
/// Calls are fire-and-forget; the editor never waits on the renderer.
pub trait Renderer {
    fn draw_notes(&mut self, notes: &[Note]);
    fn undraw_notes(&mut self, notes: &[Note]);
    fn highlight_notes(&mut self, notes: &[Note]);
    fn unhighlight_notes(&mut self, notes: &[Note]);

    /// Tempo changes or global BPM moved the grid lines.
    fn redraw_grid(&mut self) {}

    /// Bookmarks or tempo markers changed.
    fn redraw_markers(&mut self) {}
}

/// Renderer that ignores every call, for headless use.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRenderer;

impl Renderer for NullRenderer {
    fn draw_notes(&mut self, _notes: &[Note]) {}
    fn undraw_notes(&mut self, _notes: &[Note]) {}
    fn highlight_notes(&mut self, _notes: &[Note]) {}
    fn unhighlight_notes(&mut self, _notes: &[Note]) {}
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderCall {
    Draw(Vec<Note>),
    Undraw(Vec<Note>),
    Highlight(Vec<Note>),
    Unhighlight(Vec<Note>),
    Grid,
    Markers,
}

/// Renderer that records every call in order.
#[derive(Debug, Default, Clone)]
pub struct RecordingRenderer {
    calls: Vec<RenderCall>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> &[RenderCall] {
        &self.calls
    }

    pub fn clear(&mut self) {
        self.calls.clear();
    }

    /// Notes passed to draw calls, flattened.
    pub fn drawn(&self) -> Vec<Note> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                RenderCall::Draw(notes) => Some(notes.iter().copied()),
                _ => None,
            })
            .flatten()
            .collect()
    }
}

impl Renderer for RecordingRenderer {
    fn draw_notes(&mut self, notes: &[Note]) {
        self.calls.push(RenderCall::Draw(notes.to_vec()));
    }

    fn undraw_notes(&mut self, notes: &[Note]) {
        self.calls.push(RenderCall::Undraw(notes.to_vec()));
    }

    fn highlight_notes(&mut self, notes: &[Note]) {
        self.calls.push(RenderCall::Highlight(notes.to_vec()));
    }

    fn unhighlight_notes(&mut self, notes: &[Note]) {
        self.calls.push(RenderCall::Unhighlight(notes.to_vec()));
    }

    fn redraw_grid(&mut self) {
        self.calls.push(RenderCall::Grid);
    }

    fn redraw_markers(&mut self) {
        self.calls.push(RenderCall::Markers);
    }
}
