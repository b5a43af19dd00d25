//! Core library of the beatmap editor.
//!
//! The crate holds the timeline edit engine: sorted note, bookmark and tempo
//! collections per difficulty, a piecewise tempo map for beat arithmetic and
//! quantization, and a bounded undo history that makes every note edit
//! reversible. Persistence and drawing are reached only through the
//! [`MapStorage`] and [`Renderer`] traits so front ends can plug in their own.

pub mod config;
pub mod difficulty;
pub mod editor;
pub mod entity;
pub mod error;
pub mod history;
pub mod render;
pub mod storage;
pub mod timeline;

pub use config::EditorConfig;
pub use difficulty::{DifficultySnapshot, MapDifficulty, NoteChanges, SelectionDelta};
pub use editor::{MapEditor, MAX_DIFFICULTIES};
pub use entity::{beats_equal, Bookmark, BpmChange, Note, BEAT_EPSILON};
pub use error::{EditorError, Result};
pub use history::{Edit, EditHistory, EditList, DEFAULT_HISTORY_CAPACITY};
pub use render::{NullRenderer, RecordingRenderer, RenderCall, Renderer};
pub use storage::{InMemoryStorage, MapStorage, StoredDifficulty};
pub use timeline::TempoMap;
