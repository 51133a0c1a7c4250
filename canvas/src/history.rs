//! Snapshot-based linear undo/redo.
//!
//! Each [`HistoryEntry`] is an owned deep copy of the design in its serialized
//! form; entries never share anything with live elements. The cursor always
//! points at the entry matching the current state.

#[cfg(test)]
#[path = "history_test.rs"]
mod history_test;

use crate::consts::MAX_HISTORY;
use crate::design::{Design, DesignData, Material, Side, SideElements, Template};
use crate::element::ElementError;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HistoryError {
    #[error("history entry could not be restored: {0}")]
    Restore(#[from] ElementError),
}

/// One immutable snapshot of the design plus the active side.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub elements: SideElements,
    pub material: Material,
    pub template: Template,
    pub active_side: Side,
    pub timestamp_ms: f64,
}

impl HistoryEntry {
    #[must_use]
    pub fn capture(design: &Design, active_side: Side, timestamp_ms: f64) -> Self {
        Self {
            elements: design.elements_data(),
            material: design.mode.material(),
            template: design.mode.template(),
            active_side,
            timestamp_ms,
        }
    }

    /// Structural equality, ignoring the timestamp.
    #[must_use]
    pub fn same_state(&self, other: &Self) -> bool {
        self.elements == other.elements
            && self.material == other.material
            && self.template == other.template
            && self.active_side == other.active_side
    }

    /// Rebuild the design this entry describes.
    ///
    /// # Errors
    ///
    /// Fails if any stored element does not rebuild.
    pub fn to_design(&self) -> Result<Design, HistoryError> {
        let data = DesignData {
            material: self.material,
            template: self.template,
            elements: self.elements.clone(),
            ..Default::default()
        };
        Ok(Design::from_data(&data)?)
    }
}

/// Linear history with a cursor.
#[derive(Debug, Clone, Default)]
pub struct HistoryManager {
    entries: Vec<HistoryEntry>,
    cursor: usize,
}

impl HistoryManager {
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    #[must_use]
    pub fn current(&self) -> Option<&HistoryEntry> {
        self.entries.get(self.cursor)
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.cursor > 0 && self.cursor < self.entries.len()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    /// Append `entry` unless it matches the entry at the cursor.
    ///
    /// Discards the redo branch, then evicts the oldest entry once the cap is
    /// exceeded. Returns whether anything was appended.
    pub fn record(&mut self, entry: HistoryEntry) -> bool {
        if self.current().is_some_and(|cur| cur.same_state(&entry)) {
            return false;
        }
        if !self.entries.is_empty() {
            self.entries.truncate(self.cursor + 1);
        }
        self.entries.push(entry);
        if self.entries.len() > MAX_HISTORY {
            self.entries.remove(0);
        }
        self.cursor = self.entries.len() - 1;
        true
    }

    /// Step back one entry, handing it to `restore` first.
    ///
    /// The cursor moves only if `restore` succeeds. Returns `Ok(false)` when
    /// already at the oldest entry.
    ///
    /// # Errors
    ///
    /// Propagates the restore failure; history is left untouched.
    pub fn undo<F>(&mut self, restore: F) -> Result<bool, HistoryError>
    where
        F: FnOnce(&HistoryEntry) -> Result<(), HistoryError>,
    {
        if !self.can_undo() {
            return Ok(false);
        }
        self.step_to(self.cursor - 1, restore)
    }

    /// Step forward one entry. Mirror of [`HistoryManager::undo`].
    ///
    /// # Errors
    ///
    /// Propagates the restore failure; history is left untouched.
    pub fn redo<F>(&mut self, restore: F) -> Result<bool, HistoryError>
    where
        F: FnOnce(&HistoryEntry) -> Result<(), HistoryError>,
    {
        if !self.can_redo() {
            return Ok(false);
        }
        self.step_to(self.cursor + 1, restore)
    }

    fn step_to<F>(&mut self, target: usize, restore: F) -> Result<bool, HistoryError>
    where
        F: FnOnce(&HistoryEntry) -> Result<(), HistoryError>,
    {
        let Some(entry) = self.entries.get(target) else {
            return Ok(false);
        };
        restore(entry)?;
        self.cursor = target;
        Ok(true)
    }

    /// Clamp the cursor into range. Returns whether a repair was needed.
    pub fn repair_cursor(&mut self) -> bool {
        let max = self.entries.len().saturating_sub(1);
        if self.cursor > max {
            self.cursor = max;
            return true;
        }
        false
    }

    #[cfg(test)]
    pub(crate) fn force_cursor(&mut self, cursor: usize) {
        self.cursor = cursor;
    }
}
