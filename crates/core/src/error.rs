/// Result alias that carries the custom [`EditorError`] type.
pub type Result<T> = std::result::Result<T, EditorError>;

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    /// Free-form failure reported by a collaborator such as the storage
    /// backend.
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Wrapper around JSON (de)serialisation errors.
    #[error("{0}")]
    Json(#[from] serde_json::Error),
    /// An editing operation was requested while no difficulty is active.
    #[error("no difficulty is currently selected")]
    NoDifficultySelected,
    #[error("difficulty slot {index} is out of range (have {count})")]
    DifficultyOutOfRange { index: usize, count: usize },
    #[error("a map can hold at most {max} difficulties")]
    TooManyDifficulties { max: usize },
    #[error("beat {0} must be finite and non-negative")]
    InvalidBeat(f64),
    #[error("column {col} is outside 0..{columns}")]
    InvalidColumn { col: i32, columns: i32 },
    #[error("BPM {0} must be finite and positive")]
    InvalidBpm(f64),
    #[error("grid division {division} is outside 1..={max}")]
    InvalidGridDivision { division: u32, max: u32 },
    /// A required value is missing from storage.
    #[error("missing value `{0}`")]
    MissingValue(String),
    /// `EditHistory::consolidate` was asked to merge more entries than the
    /// done-stack holds.
    #[error("cannot consolidate {requested} history entries, only {available} are undoable")]
    ConsolidateOutOfRange { requested: usize, available: usize },
}

impl EditorError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }
}

impl From<&str> for EditorError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for EditorError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
