//! Piecewise tempo timeline.
//!
//! Stored beats are expressed in global-BPM units so playback timing does
//! not depend on tempo changes. Grid snapping works in the local tempo of the
//! region a beat falls into, which is what [`TempoMap`] resolves.

use std::collections::BTreeSet;
use std::ops::Bound;

use crate::entity::{beats_equal, BpmChange, BEAT_EPSILON};

/// Read-only view over a difficulty's tempo changes.
#[derive(Debug, Clone, Copy)]
pub struct TempoMap<'a> {
    changes: &'a BTreeSet<BpmChange>,
    global_bpm: f64,
    default_grid_division: u32,
}

impl<'a> TempoMap<'a> {
    pub fn new(
        changes: &'a BTreeSet<BpmChange>,
        global_bpm: f64,
        default_grid_division: u32,
    ) -> Self {
        Self {
            changes,
            global_bpm,
            default_grid_division,
        }
    }

    pub fn global_bpm(&self) -> f64 {
        self.global_bpm
    }

    /// The change with the greatest position not after `beat`. Before the
    /// first change the global tempo applies.
    pub fn last_change_at(&self, beat: f64) -> BpmChange {
        self.changes
            .range(..=BpmChange::at(beat))
            .next_back()
            .copied()
            .unwrap_or_else(|| BpmChange::new(0.0, self.global_bpm, self.default_grid_division))
    }

    /// The first change strictly after `beat`, if any.
    pub fn next_change_after(&self, beat: f64) -> Option<BpmChange> {
        self.changes
            .range((Bound::Excluded(BpmChange::at(beat)), Bound::Unbounded))
            .next()
            .copied()
    }

    /// Length of one grid cell at `local_bpm`, in global beats.
    pub fn grid_length(&self, local_bpm: f64, division: u32) -> f64 {
        (self.global_bpm / local_bpm) / f64::from(division)
    }

    /// Snaps `beat` to the nearest grid line of the tempo region it falls in.
    ///
    /// A beat already on a grid line (or one cell off through rounding noise)
    /// comes back unchanged, and a snapped beat never spills into the next
    /// tempo region.
    pub fn quantize(&self, beat: f64) -> f64 {
        let last = self.last_change_at(beat);
        let grid = self.grid_length(last.bpm, last.grid_division);
        let offset = last.global_beat - (last.global_beat / grid).floor() * grid;

        let mut snapped = ((beat - offset) / grid).round() * grid + offset;
        if let Some(next) = self.next_change_after(last.global_beat) {
            if snapped > next.global_beat - BEAT_EPSILON {
                snapped = (snapped - grid).max(last.global_beat);
            }
        }

        if beats_equal(snapped, beat) || beats_equal((snapped - beat).abs(), grid) {
            beat
        } else {
            snapped
        }
    }

    /// Smallest grid division, up to `max_division`, whose grid lines pass
    /// through `beat` in its local tempo. This picks the rune drawn on a note.
    pub fn subdivision(&self, beat: f64, max_division: u32) -> Option<u32> {
        let last = self.last_change_at(beat);
        let local = (beat - last.global_beat) * last.bpm / self.global_bpm;
        let fraction = local - local.floor();
        (1..=max_division).find(|&division| {
            let cells = fraction * f64::from(division);
            beats_equal(cells, cells.round())
        })
    }

    /// Moves a beat in the span of `old` so it keeps its local-beat offset
    /// when the change becomes `new`.
    pub fn retime(beat: f64, old: &BpmChange, new: &BpmChange) -> f64 {
        new.global_beat + (beat - old.global_beat) * old.bpm / new.bpm
    }

    pub fn beat_to_seconds(&self, beat: f64) -> f64 {
        beat * 60.0 / self.global_bpm
    }

    pub fn seconds_to_beat(&self, seconds: f64) -> f64 {
        seconds * self.global_bpm / 60.0
    }
}
