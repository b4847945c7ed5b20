// Copyright 2026 the Scope Tape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing hooks for `scope_tape`.
//!
//! Tracing is optional and is designed to be `no_std` friendly.
//! The VM only emits events requested by a [`TraceMask`].
//!
//! To enable tracing, pass a [`TraceMask`] and [`TraceSink`] to [`Vm::run`].

#[cfg(doc)]
use crate::vm::Vm;

use crate::opcode::Command;
use crate::program::Program;
use crate::scope::Level;
use crate::tape::Growth;
use crate::vm::TrapInfo;

/// A set of trace events requested by a [`TraceSink`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TraceMask(u32);

impl core::ops::BitOr for TraceMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl core::ops::BitOrAssign for TraceMask {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl TraceMask {
    /// No tracing.
    pub const NONE: Self = Self(0);
    /// Trace run boundaries.
    ///
    /// Enables:
    /// - [`TraceSink::run_start`]
    /// - [`TraceSink::run_end`]
    pub const RUN: Self = Self(1 << 0);
    /// Trace each executed instruction.
    ///
    /// Enables:
    /// - [`TraceSink::instr`]
    pub const INSTR: Self = Self(1 << 1);
    /// Trace pointer scopes.
    ///
    /// Enables:
    /// - [`TraceSink::scope_enter`]
    /// - [`TraceSink::scope_exit`]
    pub const SCOPE: Self = Self(1 << 2);
    /// Trace tape growth.
    ///
    /// Enables:
    /// - [`TraceSink::tape_grow`]
    pub const TAPE: Self = Self(1 << 3);
    /// Every event.
    pub const ALL: Self = Self(Self::RUN.0 | Self::INSTR.0 | Self::SCOPE.0 | Self::TAPE.0);

    /// Returns `true` if this mask includes all bits in `other`.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }
}

/// Why a scope was exited.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ScopeExit {
    /// A `}` command.
    Close,
    /// Forced close of a scope left open when the program ended.
    ///
    /// Verified programs have balanced braces and never produce this.
    Cleanup,
}

/// Machine state at the start of one instruction.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct InstrEvent {
    /// Instruction pointer.
    pub ip: usize,
    /// Command about to execute.
    pub command: Command,
    /// Innermost scope level.
    pub level: Level,
    /// Current logical position.
    pub position: i64,
    /// Value of the current cell (zero if not yet backed by the tape).
    pub cell: u8,
}

/// Run outcome for tracing.
#[derive(Clone, Debug)]
pub enum TraceOutcome<'a> {
    /// Successful run.
    Ok {
        /// Instructions executed.
        steps: u64,
    },
    /// Trapped.
    Trap(&'a TrapInfo),
}

/// A trace sink that can receive VM events.
pub trait TraceSink {
    /// Returns the set of events the sink wants.
    fn mask(&self) -> TraceMask {
        TraceMask::NONE
    }

    /// Called at the start of a VM run.
    ///
    /// Called only if `mask()` includes [`TraceMask::RUN`].
    fn run_start(&mut self, _program: &Program) {}

    /// Called before each executed instruction.
    ///
    /// Called only if `mask()` includes [`TraceMask::INSTR`].
    fn instr(&mut self, _program: &Program, _event: InstrEvent) {}

    /// Called after a scope was opened.
    ///
    /// Called only if `mask()` includes [`TraceMask::SCOPE`].
    ///
    /// - `level`: the new innermost level
    /// - `position`: the position copied into it
    fn scope_enter(&mut self, _program: &Program, _ip: usize, _level: Level, _position: i64) {}

    /// Called after a scope was rolled back and closed.
    ///
    /// Called only if `mask()` includes [`TraceMask::SCOPE`].
    ///
    /// - `level`: the level that was closed
    /// - `restored`: number of cells written back from the undo log
    /// - `position`: the enclosing scope's position, now current again
    fn scope_exit(
        &mut self,
        _program: &Program,
        _ip: usize,
        _level: Level,
        _restored: usize,
        _position: i64,
        _why: ScopeExit,
    ) {
    }

    /// Called after the tape grew.
    ///
    /// Called only if `mask()` includes [`TraceMask::TAPE`].
    fn tape_grow(&mut self, _growth: Growth, _zero_offset: usize) {}

    /// Called at the end of a VM run.
    ///
    /// Called only if `mask()` includes [`TraceMask::RUN`].
    fn run_end(&mut self, _program: &Program, _outcome: TraceOutcome<'_>) {}
}

#[cfg(test)]
mod tests {
    use super::TraceMask;

    #[test]
    fn mask_contains_and_union() {
        let mut m = TraceMask::RUN;
        assert!(m.contains(TraceMask::RUN));
        assert!(!m.contains(TraceMask::INSTR));
        m |= TraceMask::SCOPE;
        assert!(m.contains(TraceMask::RUN | TraceMask::SCOPE));
        assert!(TraceMask::ALL.contains(m | TraceMask::TAPE | TraceMask::INSTR));
        assert!(m.contains(TraceMask::NONE));
    }
}
