use std::cmp::Ordering;

use serde_json::Value;

use crate::storage::DIFFICULTY_RANK_KEY;
use crate::{EditorError, MapDifficulty, MapEditor, MapStorage, Note, Renderer, Result, MAX_DIFFICULTIES};

impl<S: MapStorage, R: Renderer> MapEditor<S, R> {
    /// Makes `index` the active difficulty.
    ///
    /// The outgoing difficulty is flushed to storage, its selection is
    /// dropped and its notes are undrawn before the new one is drawn.
    pub fn select_difficulty(&mut self, index: usize) -> Result<()> {
        self.check_index(index)?;
        if self.current == Some(index) {
            return Ok(());
        }
        if let Some(previous) = self.current {
            self.release(previous)?;
        }
        self.current = Some(index);
        self.redraw_current();
        tracing::debug!(index, "difficulty selected");
        Ok(())
    }

    /// Appends an empty difficulty slot and activates it.
    pub fn create_difficulty(&mut self) -> Result<usize> {
        if self.difficulties.len() >= MAX_DIFFICULTIES {
            return Err(EditorError::TooManyDifficulties {
                max: MAX_DIFFICULTIES,
            });
        }
        let index = self.storage.add_map()?;
        if index != self.difficulties.len() {
            return Err(EditorError::msg(format!(
                "storage created difficulty {index}, expected {}",
                self.difficulties.len()
            )));
        }
        self.difficulties
            .push(MapDifficulty::new(self.config.history_capacity));
        tracing::info!(index, "difficulty created");
        self.select_difficulty(index)?;
        Ok(index)
    }

    /// Deletes a slot. Later slots shift down by one and the current index
    /// follows its difficulty, or is clamped when the current one is deleted.
    pub fn delete_difficulty(&mut self, index: usize) -> Result<()> {
        self.check_index(index)?;
        let deleting_current = self.current == Some(index);
        if deleting_current {
            let notes: Vec<Note> = self.difficulties[index].notes().iter().copied().collect();
            self.renderer.undraw_notes(&notes);
        }

        self.storage.delete_map(index)?;
        self.difficulties.remove(index);
        tracing::info!(index, remaining = self.difficulties.len(), "difficulty deleted");

        let count = self.difficulties.len();
        self.current = match self.current {
            _ if count == 0 => None,
            Some(current) if current == index => Some(index.min(count - 1)),
            Some(current) if current > index => Some(current - 1),
            other => other,
        };
        if deleting_current {
            self.redraw_current();
        }
        Ok(())
    }

    pub fn difficulty_rank(&self, index: usize) -> Option<f64> {
        self.storage
            .value_for_difficulty_map(index, DIFFICULTY_RANK_KEY)
            .and_then(|value| value.as_f64())
    }

    pub fn set_difficulty_rank(&mut self, index: usize, rank: f64) -> Result<()> {
        self.check_index(index)?;
        self.storage
            .set_value_for_difficulty_map(index, DIFFICULTY_RANK_KEY, Value::from(rank))
    }

    /// Orders the slots by ascending rank with a stable bubble sort. Slots
    /// without a rank sort last. Returns true when anything moved.
    pub fn sort_difficulties(&mut self) -> Result<bool> {
        let mut ranks: Vec<f64> = (0..self.difficulties.len())
            .map(|index| self.difficulty_rank(index).unwrap_or(f64::INFINITY))
            .collect();

        let mut moved = false;
        for pass in 0..ranks.len() {
            for j in 0..ranks.len() - 1 - pass {
                if ranks[j].total_cmp(&ranks[j + 1]) != Ordering::Greater {
                    continue;
                }
                self.storage.swap_maps(j, j + 1)?;
                ranks.swap(j, j + 1);
                self.difficulties.swap(j, j + 1);
                self.current = match self.current {
                    Some(current) if current == j => Some(j + 1),
                    Some(current) if current == j + 1 => Some(j),
                    other => other,
                };
                moved = true;
            }
        }
        if moved {
            tracing::debug!(current = ?self.current, "difficulties sorted");
        }
        Ok(moved)
    }

    fn check_index(&self, index: usize) -> Result<()> {
        let count = self.difficulties.len();
        if index < count {
            Ok(())
        } else {
            Err(EditorError::DifficultyOutOfRange { index, count })
        }
    }

    fn release(&mut self, index: usize) -> Result<()> {
        let Some(difficulty) = self.difficulties.get_mut(index) else {
            return Ok(());
        };
        difficulty.flush(&mut self.storage, index)?;
        let selected = difficulty.clear_selection();
        if !selected.is_empty() {
            self.renderer.unhighlight_notes(&selected);
        }
        let notes: Vec<Note> = difficulty.notes().iter().copied().collect();
        self.renderer.undraw_notes(&notes);
        Ok(())
    }
}
