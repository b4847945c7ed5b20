// Copyright 2026 the Scope Tape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pointer scopes and the undo log.
//!
//! A scope owns one tape position. Opening a scope copies the current position into a new
//! level; closing it rolls back every cell written while it was the innermost scope and drops
//! the position, so the enclosing scope resumes where it was.
//!
//! Rollback is driven by the [`UndoLog`]: before a cell is mutated, the VM asks the log to
//! capture the cell's value for the current level. Only the first mutation of a given
//! `(index, level)` pair is recorded, so closing a scope always restores the value the cell had
//! when the scope was entered.

use alloc::vec;
use alloc::vec::Vec;
use core::fmt;

use hashbrown::HashSet;

use crate::tape::{Tape, TapeError};

/// Scope nesting level. Level 0 is the root scope.
pub type Level = u32;

/// Scope stack errors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScopeError {
    /// Opening another scope would exceed the configured depth.
    Overflow {
        /// Maximum number of scopes that may be open above the root.
        max_depth: u32,
    },
    /// Attempted to close the root scope.
    Underflow,
}

impl fmt::Display for ScopeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Overflow { max_depth } => {
                write!(f, "scope stack overflow (max depth {max_depth})")
            }
            Self::Underflow => write!(f, "scope stack underflow"),
        }
    }
}

impl core::error::Error for ScopeError {}

/// The stack of open scopes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScopeStack {
    // positions[level] is the tape position owned by `level`; never empty.
    positions: Vec<i64>,
    max_depth: u32,
}

impl ScopeStack {
    /// Creates a stack holding only the root scope at position 0.
    #[must_use]
    pub fn new(max_depth: u32) -> Self {
        Self {
            positions: vec![0],
            max_depth,
        }
    }

    /// Returns the innermost open level.
    #[must_use]
    pub fn level(&self) -> Level {
        // Bounded by `max_depth`, which is a `u32`.
        (self.positions.len() - 1) as Level
    }

    /// Returns the position of the innermost scope.
    #[must_use]
    pub fn position(&self) -> i64 {
        self.positions[self.positions.len() - 1]
    }

    /// Moves the innermost scope's position.
    pub fn set_position(&mut self, index: i64) {
        let last = self.positions.len() - 1;
        self.positions[last] = index;
    }

    /// Opens a scope at the current position and returns its level.
    pub fn push(&mut self) -> Result<Level, ScopeError> {
        if self.level() >= self.max_depth {
            return Err(ScopeError::Overflow {
                max_depth: self.max_depth,
            });
        }
        self.positions.push(self.position());
        Ok(self.level())
    }

    /// Closes the innermost scope and returns the level that was closed.
    ///
    /// This only drops the position; use [`UndoLog::restore`] first to roll back cells.
    pub fn pop(&mut self) -> Result<Level, ScopeError> {
        if self.positions.len() == 1 {
            return Err(ScopeError::Underflow);
        }
        let closed = self.level();
        self.positions.pop();
        Ok(closed)
    }

    /// Resets to a lone root scope at position 0.
    pub fn reset(&mut self, max_depth: u32) {
        self.positions.clear();
        self.positions.push(0);
        self.max_depth = max_depth;
    }
}

impl Default for ScopeStack {
    fn default() -> Self {
        Self::new(255)
    }
}

/// One captured pre-mutation cell value.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct UndoEntry {
    /// Logical tape index.
    pub index: i64,
    /// Value before the first mutation at `level`.
    pub original: u8,
    /// Scope level the capture belongs to.
    pub level: Level,
}

/// Level-tagged journal of first writes.
#[derive(Clone, Debug, Default)]
pub struct UndoLog {
    entries: Vec<UndoEntry>,
    captured: HashSet<(i64, Level)>,
}

impl UndoLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the journal, oldest first.
    #[must_use]
    pub fn entries(&self) -> &[UndoEntry] {
        &self.entries
    }

    /// Returns the number of journaled captures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is journaled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Captures the current value of `index` for `level` unless already captured.
    ///
    /// Must be called before the cell is mutated. The root level is never journaled since it can
    /// never be closed. Returns `true` if a new entry was appended.
    pub fn record(
        &mut self,
        tape: &mut Tape,
        index: i64,
        level: Level,
    ) -> Result<bool, TapeError> {
        if level == 0 || self.captured.contains(&(index, level)) {
            return Ok(false);
        }
        let phys = tape.ensure(index)?;
        self.entries.push(UndoEntry {
            index,
            original: tape.cell(phys),
            level,
        });
        self.captured.insert((index, level));
        Ok(true)
    }

    /// Rolls back every capture belonging to `level`, most recent first.
    ///
    /// Returns the number of restored cells.
    pub fn restore(&mut self, tape: &mut Tape, level: Level) -> Result<usize, TapeError> {
        let mut restored = 0;
        while let Some(entry) = self.entries.last().copied() {
            if entry.level != level {
                break;
            }
            // Captured cells were addressable when recorded and the tape never shrinks.
            let phys = tape.ensure(entry.index)?;
            *tape.cell_mut(phys) = entry.original;
            self.entries.pop();
            self.captured.remove(&(entry.index, level));
            restored += 1;
        }
        Ok(restored)
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.captured.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_scope_is_permanent() {
        let mut s = ScopeStack::new(4);
        assert_eq!(s.level(), 0);
        assert_eq!(s.position(), 0);
        assert_eq!(s.pop(), Err(ScopeError::Underflow));
        assert_eq!(s.level(), 0);
    }

    #[test]
    fn push_copies_position_and_pop_discards_it() {
        let mut s = ScopeStack::new(4);
        s.set_position(3);
        assert_eq!(s.push(), Ok(1));
        assert_eq!(s.position(), 3);
        s.set_position(-10);
        assert_eq!(s.pop(), Ok(1));
        assert_eq!(s.position(), 3);
    }

    #[test]
    fn push_stops_at_max_depth() {
        let mut s = ScopeStack::new(2);
        s.push().unwrap();
        s.push().unwrap();
        assert_eq!(s.push(), Err(ScopeError::Overflow { max_depth: 2 }));
        assert_eq!(s.level(), 2);
    }

    #[test]
    fn capture_is_first_write_only() {
        let mut tape = Tape::new(8).unwrap();
        let mut log = UndoLog::new();
        tape.set(0, 5).unwrap();
        assert_eq!(log.record(&mut tape, 0, 1), Ok(true));
        tape.set(0, 6).unwrap();
        assert_eq!(log.record(&mut tape, 0, 1), Ok(false));
        tape.set(0, 7).unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(
            log.entries()[0],
            UndoEntry {
                index: 0,
                original: 5,
                level: 1
            }
        );

        assert_eq!(log.restore(&mut tape, 1), Ok(1));
        assert_eq!(tape.get(0), 5);
        assert!(log.is_empty());
    }

    #[test]
    fn root_level_is_not_journaled() {
        let mut tape = Tape::new(8).unwrap();
        let mut log = UndoLog::new();
        assert_eq!(log.record(&mut tape, 0, 0), Ok(false));
        assert!(log.is_empty());
    }

    #[test]
    fn levels_restore_independently() {
        let mut tape = Tape::new(8).unwrap();
        let mut log = UndoLog::new();
        tape.set(0, 1).unwrap();

        log.record(&mut tape, 0, 1).unwrap();
        tape.set(0, 2).unwrap();
        log.record(&mut tape, 0, 2).unwrap();
        tape.set(0, 3).unwrap();
        log.record(&mut tape, 1, 2).unwrap();
        tape.set(1, 9).unwrap();

        assert_eq!(log.restore(&mut tape, 2), Ok(2));
        assert_eq!(tape.get(0), 2);
        assert_eq!(tape.get(1), 0);

        assert_eq!(log.restore(&mut tape, 1), Ok(1));
        assert_eq!(tape.get(0), 1);
        assert!(log.is_empty());
    }

    #[test]
    fn reopened_level_captures_again() {
        let mut tape = Tape::new(8).unwrap();
        let mut log = UndoLog::new();

        log.record(&mut tape, 0, 1).unwrap();
        tape.set(0, 4).unwrap();
        log.restore(&mut tape, 1).unwrap();
        assert_eq!(tape.get(0), 0);

        // Same (index, level) after the level was closed: must be captured afresh.
        tape.set(0, 8).unwrap();
        assert_eq!(log.record(&mut tape, 0, 1), Ok(true));
        tape.set(0, 9).unwrap();
        log.restore(&mut tape, 1).unwrap();
        assert_eq!(tape.get(0), 8);
    }

    #[test]
    fn restore_of_other_level_is_a_no_op() {
        let mut tape = Tape::new(8).unwrap();
        let mut log = UndoLog::new();
        log.record(&mut tape, 2, 1).unwrap();
        assert_eq!(log.restore(&mut tape, 2), Ok(0));
        assert_eq!(log.len(), 1);
    }
}
