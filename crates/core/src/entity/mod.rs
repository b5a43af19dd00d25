//! Value types placed along the beat axis.
//!
//! Every entity carries its own total ordering so it can live in a
//! `BTreeSet`. Notes and tempo changes compare beats exactly; bookmarks
//! compare them within [`BEAT_EPSILON`] because they are positioned by
//! continuous dragging.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::{EditorError, Result};

/// Tolerance used for bookmark identity and for snapping decisions.
pub const BEAT_EPSILON: f64 = 1e-4;

/// Returns true when two beats are within [`BEAT_EPSILON`] of each other.
pub fn beats_equal(a: f64, b: f64) -> bool {
    (a - b).abs() <= BEAT_EPSILON
}

/// Orders beats exactly, with `-0.0` and `0.0` treated as the same beat.
fn cmp_beats(a: f64, b: f64) -> Ordering {
    (a + 0.0).total_cmp(&(b + 0.0))
}

pub(crate) fn validate_beat(beat: f64) -> Result<()> {
    if beat.is_finite() && beat >= 0.0 {
        Ok(())
    } else {
        Err(EditorError::InvalidBeat(beat))
    }
}

/// A single hit on the note grid.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Note {
    pub beat: f64,
    pub col: i32,
}

impl Note {
    pub fn new(beat: f64, col: i32) -> Self {
        Self {
            beat: beat + 0.0,
            col,
        }
    }

    /// Checks the note against the grid bounds of a map with `columns` lanes.
    pub fn validate(&self, columns: i32) -> Result<()> {
        validate_beat(self.beat)?;
        if !(0..columns).contains(&self.col) {
            return Err(EditorError::InvalidColumn {
                col: self.col,
                columns,
            });
        }
        Ok(())
    }

    /// Returns a copy moved by the given offsets.
    pub fn shifted(&self, beat_offset: f64, col_offset: i32) -> Self {
        Self::new(self.beat + beat_offset, self.col + col_offset)
    }
}

impl Ord for Note {
    fn cmp(&self, other: &Self) -> Ordering {
        cmp_beats(self.beat, other.beat).then_with(|| self.col.cmp(&other.col))
    }
}

impl PartialOrd for Note {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Note {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Note {}

/// A named marker on the timeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bookmark {
    pub beat: f64,
    pub name: String,
}

impl Bookmark {
    pub fn new(beat: f64, name: impl Into<String>) -> Self {
        Self {
            beat: beat + 0.0,
            name: name.into(),
        }
    }

    /// Key used to look a bookmark up by position only.
    pub(crate) fn at(beat: f64) -> Self {
        Self::new(beat, String::new())
    }
}

impl Ord for Bookmark {
    fn cmp(&self, other: &Self) -> Ordering {
        if beats_equal(self.beat, other.beat) {
            Ordering::Equal
        } else {
            cmp_beats(self.beat, other.beat)
        }
    }
}

impl PartialOrd for Bookmark {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Bookmark {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Bookmark {}

/// A tempo breakpoint. From `global_beat` on, the grid runs at `bpm` with
/// `grid_division` cells per beat.
///
/// Identity is the position alone: a map holds at most one change per beat.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BpmChange {
    pub global_beat: f64,
    pub bpm: f64,
    pub grid_division: u32,
}

impl BpmChange {
    pub fn new(global_beat: f64, bpm: f64, grid_division: u32) -> Self {
        Self {
            global_beat: global_beat + 0.0,
            bpm,
            grid_division,
        }
    }

    pub(crate) fn at(global_beat: f64) -> Self {
        Self::new(global_beat, 0.0, 0)
    }

    pub fn validate(&self, max_grid_division: u32) -> Result<()> {
        validate_beat(self.global_beat)?;
        if !(self.bpm.is_finite() && self.bpm > 0.0) {
            return Err(EditorError::InvalidBpm(self.bpm));
        }
        if self.grid_division == 0 || self.grid_division > max_grid_division {
            return Err(EditorError::InvalidGridDivision {
                division: self.grid_division,
                max: max_grid_division,
            });
        }
        Ok(())
    }
}

impl Ord for BpmChange {
    fn cmp(&self, other: &Self) -> Ordering {
        cmp_beats(self.global_beat, other.global_beat)
    }
}

impl PartialOrd for BpmChange {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for BpmChange {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for BpmChange {}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    #[test]
    fn notes_order_by_beat_then_column() {
        let set: BTreeSet<Note> = [Note::new(1.0, 3), Note::new(0.5, 2), Note::new(1.0, 0)]
            .into_iter()
            .collect();
        let ordered: Vec<_> = set.iter().map(|n| (n.beat, n.col)).collect();
        assert_eq!(ordered, vec![(0.5, 2), (1.0, 0), (1.0, 3)]);
    }

    #[test]
    fn duplicate_notes_are_rejected_by_set() {
        let mut set = BTreeSet::new();
        assert!(set.insert(Note::new(2.0, 1)));
        assert!(!set.insert(Note::new(2.0, 1)));
        assert!(set.insert(Note::new(2.0 + 1e-9, 1)));
    }

    #[test]
    fn bookmarks_within_tolerance_collide() {
        let mut set = BTreeSet::new();
        assert!(set.insert(Bookmark::new(4.0, "drop")));
        assert!(!set.insert(Bookmark::new(4.00005, "duplicate")));
        assert!(set.insert(Bookmark::new(4.01, "later")));
        assert_eq!(set.get(&Bookmark::at(4.00002)).unwrap().name, "drop");
    }

    #[test]
    fn note_validation_checks_column_and_beat() {
        assert!(Note::new(0.0, 3).validate(4).is_ok());
        assert!(matches!(
            Note::new(1.0, 4).validate(4),
            Err(EditorError::InvalidColumn { col: 4, .. })
        ));
        assert!(matches!(
            Note::new(-1.0, 0).validate(4),
            Err(EditorError::InvalidBeat(_))
        ));
        assert!(Note::new(f64::NAN, 0).validate(4).is_err());
    }

    #[test]
    fn bpm_change_validation() {
        assert!(BpmChange::new(8.0, 180.0, 4).validate(64).is_ok());
        assert!(matches!(
            BpmChange::new(8.0, 0.0, 4).validate(64),
            Err(EditorError::InvalidBpm(_))
        ));
        assert!(BpmChange::new(8.0, 120.0, 0).validate(64).is_err());
        assert!(BpmChange::new(8.0, 120.0, 65).validate(64).is_err());
    }

    #[test]
    fn negative_zero_is_the_same_beat() {
        let notes: BTreeSet<Note> = [Note::new(0.0, 1), Note::new(-0.0, 1)].into_iter().collect();
        assert_eq!(notes.len(), 1);
        assert!(Note::new(-0.0, 1).beat.is_sign_positive());

        let deserialised = Note { beat: -0.0, col: 1 };
        assert_eq!(deserialised, Note::new(0.0, 1));

        let changes: BTreeSet<BpmChange> = [BpmChange::new(0.0, 120.0, 4), BpmChange::new(-0.0, 90.0, 4)]
            .into_iter()
            .collect();
        assert_eq!(changes.len(), 1);
    }
}
