use std::collections::VecDeque;

use crate::config::game::MAX_HISTORY_LIMIT;
use crate::world::GridState;

/// Bounded undo/redo stacks of grid snapshots.
///
/// The top of the undo stack is always the current state. Snapshots share
/// cell storage until one of them is written, so pushing is cheap.
#[derive(Debug, Clone)]
pub struct History {
    undo: VecDeque<GridState>,
    redo: Vec<GridState>,
    capacity: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::with_capacity(MAX_HISTORY_LIMIT)
    }
}

impl History {
    /// Capacity is clamped to 1..=100.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.clamp(1, MAX_HISTORY_LIMIT);
        Self {
            undo: VecDeque::with_capacity(capacity),
            redo: Vec::new(),
            capacity,
        }
    }

    /// Rebuild from saved stacks, oldest undo entry first. Entries beyond
    /// the capacity are dropped from the old end.
    pub fn from_parts(undo: Vec<GridState>, redo: Vec<GridState>, capacity: usize) -> Self {
        let mut history = Self::with_capacity(capacity);
        for state in undo {
            history.push_bounded(state);
        }
        history.redo = redo;
        history
    }

    /// Record a new current state.
    ///
    /// Clears the redo stack: once a new action is taken, states that were
    /// undone are discarded rather than kept available for redo.
    pub fn push(&mut self, state: GridState) {
        self.redo.clear();
        self.push_bounded(state);
    }

    fn push_bounded(&mut self, state: GridState) {
        while self.undo.len() >= self.capacity {
            self.undo.pop_front();
        }
        self.undo.push_back(state);
    }

    /// Step back one snapshot. Returns the new current state, or `None`
    /// when only the initial snapshot remains.
    pub fn undo(&mut self) -> Option<&GridState> {
        if self.undo.len() <= 1 {
            return None;
        }
        let top = self.undo.pop_back()?;
        self.redo.push(top);
        self.undo.back()
    }

    /// Re-apply the most recently undone snapshot.
    pub fn redo(&mut self) -> Option<&GridState> {
        let state = self.redo.pop()?;
        self.push_bounded(state);
        self.undo.back()
    }

    pub fn current(&self) -> Option<&GridState> {
        self.undo.back()
    }

    pub fn can_undo(&self) -> bool {
        self.undo.len() > 1
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn len(&self) -> usize {
        self.undo.len()
    }

    pub fn is_empty(&self) -> bool {
        self.undo.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Undo entries, oldest first.
    pub fn past(&self) -> impl Iterator<Item = &GridState> {
        self.undo.iter()
    }

    /// Redo entries, bottom of the stack first.
    pub fn future(&self) -> &[GridState] {
        &self.redo
    }
}
