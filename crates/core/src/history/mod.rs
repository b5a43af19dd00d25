//! Bounded linear undo/redo log.
//!
//! The history never touches the model itself. [`EditHistory::undo`] and
//! [`EditHistory::redo`] hand back the [`EditList`] the caller has to apply,
//! which keeps the log generic over whatever entity type it records.

use std::collections::VecDeque;

use crate::{EditorError, Result};

pub const DEFAULT_HISTORY_CAPACITY: usize = 128;

/// One recorded insertion or removal.
#[derive(Debug, Clone, PartialEq)]
pub struct Edit<T> {
    pub is_add: bool,
    pub item: T,
}

/// A reversible batch of edits. Each item keeps its own direction so a
/// consolidated list can mix removals and insertions.
#[derive(Debug, Clone, PartialEq)]
pub struct EditList<T> {
    items: Vec<Edit<T>>,
}

impl<T> Default for EditList<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: Clone> EditList<T> {
    pub fn new(is_add: bool, items: impl IntoIterator<Item = T>) -> Self {
        Self {
            items: items
                .into_iter()
                .map(|item| Edit { is_add, item })
                .collect(),
        }
    }

    pub fn addition(items: impl IntoIterator<Item = T>) -> Self {
        Self::new(true, items)
    }

    pub fn removal(items: impl IntoIterator<Item = T>) -> Self {
        Self::new(false, items)
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn items(&self) -> &[Edit<T>] {
        &self.items
    }

    /// Returns the edit that reverts this one: every direction flipped and
    /// the order reversed, so a remove-then-add of overlapping items unwinds
    /// as remove-then-add as well.
    pub fn inverted(&self) -> Self {
        Self {
            items: self
                .items
                .iter()
                .rev()
                .map(|edit| Edit {
                    is_add: !edit.is_add,
                    item: edit.item.clone(),
                })
                .collect(),
        }
    }

    /// Appends the items of `other`, keeping their directions.
    pub fn extend(&mut self, other: EditList<T>) {
        self.items.extend(other.items);
    }

    /// Splits the list into maximal runs of the same direction, in order.
    pub fn runs(&self) -> Vec<(bool, Vec<T>)> {
        let mut runs: Vec<(bool, Vec<T>)> = Vec::new();
        for edit in &self.items {
            match runs.last_mut() {
                Some((is_add, items)) if *is_add == edit.is_add => items.push(edit.item.clone()),
                _ => runs.push((edit.is_add, vec![edit.item.clone()])),
            }
        }
        runs
    }
}

/// Fixed-capacity undo log. Entries before `current_index` are done, the
/// rest are redoable until the next [`EditHistory::add`].
#[derive(Debug, Clone)]
pub struct EditHistory<T> {
    entries: VecDeque<EditList<T>>,
    capacity: usize,
    current_index: usize,
}

impl<T: Clone> Default for EditHistory<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> EditHistory<T> {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            current_index: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of entries that can currently be undone.
    pub fn undo_len(&self) -> usize {
        self.current_index
    }

    /// Number of entries that can currently be redone.
    pub fn redo_len(&self) -> usize {
        self.entries.len() - self.current_index
    }

    pub fn can_undo(&self) -> bool {
        self.current_index > 0
    }

    pub fn can_redo(&self) -> bool {
        self.current_index < self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.current_index = 0;
    }

    /// Records a new step. The redo stack is discarded and the oldest entry
    /// is evicted when the log is full.
    pub fn add(&mut self, edit: EditList<T>) {
        self.entries.truncate(self.current_index);
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
            self.current_index -= 1;
        }
        self.entries.push_back(edit);
        self.current_index += 1;
    }

    /// Steps back and returns the inverse of the step, or an empty list when
    /// nothing is left to undo.
    pub fn undo(&mut self) -> EditList<T> {
        if self.current_index == 0 {
            return EditList::empty();
        }
        self.current_index -= 1;
        self.entries[self.current_index].inverted()
    }

    /// Steps forward and returns the step to reapply, or an empty list when
    /// the cursor is already at the end.
    pub fn redo(&mut self) -> EditList<T> {
        match self.entries.get(self.current_index) {
            Some(edit) => {
                let edit = edit.clone();
                self.current_index += 1;
                edit
            }
            None => EditList::empty(),
        }
    }

    /// Merges the last `n` done entries into a single step. Fails without
    /// touching the log when fewer than `n` entries are undoable.
    pub fn consolidate(&mut self, n: usize) -> Result<()> {
        if n > self.current_index {
            return Err(EditorError::ConsolidateOutOfRange {
                requested: n,
                available: self.current_index,
            });
        }
        if n <= 1 {
            return Ok(());
        }

        self.entries.truncate(self.current_index);
        let start = self.current_index - n;
        let mut merged = EditList::empty();
        for edit in self.entries.drain(start..) {
            merged.extend(edit);
        }
        self.current_index = start;
        self.add(merged);
        Ok(())
    }
}
