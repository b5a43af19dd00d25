use serde::{Deserialize, Serialize};

use crate::{EditorError, Result};

/// Tunables for the edit engine.
///
/// Bookmark identity uses the fixed [`crate::BEAT_EPSILON`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Number of undo steps kept per difficulty.
    pub history_capacity: usize,
    /// Grid division used before the first tempo change.
    pub default_grid_division: u32,
    pub max_grid_division: u32,
    /// Number of lanes on the note grid.
    pub columns: i32,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history_capacity: 128,
            default_grid_division: 4,
            max_grid_division: 64,
            columns: 4,
        }
    }
}

impl EditorConfig {
    /// Parses a JSON document and validates the result. Missing fields fall
    /// back to their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        // Compound edits record two entries before merging them.
        if self.history_capacity < 2 {
            return Err(EditorError::msg(format!(
                "history capacity must be at least 2, got {}",
                self.history_capacity
            )));
        }
        if self.max_grid_division == 0 {
            return Err(EditorError::msg("max grid division must be positive"));
        }
        if self.default_grid_division == 0 || self.default_grid_division > self.max_grid_division {
            return Err(EditorError::InvalidGridDivision {
                division: self.default_grid_division,
                max: self.max_grid_division,
            });
        }
        if self.columns <= 0 {
            return Err(EditorError::msg("column count must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = EditorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.history_capacity, 128);
        assert_eq!(config.columns, 4);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = EditorConfig::from_json_str(r#"{ "history_capacity": 16 }"#).unwrap();
        assert_eq!(config.history_capacity, 16);
        assert_eq!(config.default_grid_division, 4);
    }

    #[test]
    fn rejects_tiny_history() {
        let err = EditorConfig::from_json_str(r#"{ "history_capacity": 1 }"#).unwrap_err();
        assert!(format!("{err}").contains("history capacity"));
    }

    #[test]
    fn rejects_default_division_above_max() {
        let err = EditorConfig::from_json_str(r#"{ "default_grid_division": 96 }"#).unwrap_err();
        assert!(matches!(err, EditorError::InvalidGridDivision { division: 96, .. }));
    }

    #[test]
    fn empty_document_is_the_default() {
        let config = EditorConfig::from_json_str("{}").unwrap();
        assert_eq!(config, EditorConfig::default());
        assert_eq!(config.max_grid_division, 64);
    }
}
