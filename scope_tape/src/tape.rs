// Copyright 2026 the Scope Tape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Bidirectionally growable byte tape.
//!
//! The tape is a contiguous arena with a movable origin: logical index `i` lives at physical
//! index `zero_offset + i`. Growth doubles the arena. Growth to the right appends zeroes; growth
//! to the left moves the existing contents right inside the new arena and bumps `zero_offset`
//! by the same amount, so every previously written cell keeps its logical index.
//!
//! Invariant: `0 <= zero_offset < len`.

use alloc::vec;
use alloc::vec::Vec;
use core::fmt;

/// Default initial tape length.
pub const DEFAULT_TAPE_LEN: usize = 30_000;

/// A tape growth failure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TapeError {
    /// Growth would exceed the configured cell ceiling.
    LimitExceeded {
        /// Logical index that was requested.
        index: i64,
        /// Configured ceiling.
        max_len: usize,
    },
    /// The allocator could not provide the new arena.
    AllocFailed {
        /// Requested arena length.
        len: usize,
    },
}

impl fmt::Display for TapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LimitExceeded { index, max_len } => {
                write!(f, "index {index} is beyond the tape limit of {max_len} cells")
            }
            Self::AllocFailed { len } => write!(f, "failed to allocate {len} tape cells"),
        }
    }
}

impl core::error::Error for TapeError {}

/// Describes one growth event.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Growth {
    /// Arena length before growing.
    pub old_len: usize,
    /// Arena length after growing.
    pub new_len: usize,
    /// Distance existing contents moved right (zero for rightward growth).
    pub shift: usize,
}

/// The interpreter's addressable memory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tape {
    cells: Vec<u8>,
    zero_offset: usize,
    max_len: usize,
}

impl Default for Tape {
    fn default() -> Self {
        Self {
            cells: vec![0; DEFAULT_TAPE_LEN],
            zero_offset: DEFAULT_TAPE_LEN / 2,
            max_len: usize::MAX,
        }
    }
}

impl Tape {
    /// Creates a zeroed tape of `initial_len` cells (at least one) with the origin at the
    /// midpoint.
    pub fn new(initial_len: usize) -> Result<Self, TapeError> {
        Self::with_max_len(initial_len, usize::MAX)
    }

    /// Creates a tape that refuses to grow past `max_len` cells.
    ///
    /// Fails if `initial_len` already exceeds `max_len` or the arena cannot be allocated.
    pub fn with_max_len(initial_len: usize, max_len: usize) -> Result<Self, TapeError> {
        let len = initial_len.max(1);
        let zero_offset = len / 2;
        if len > max_len {
            // Report the rightmost cell the initial arena would have backed.
            let index = i64::try_from(len - zero_offset - 1).unwrap_or(i64::MAX);
            return Err(TapeError::LimitExceeded { index, max_len });
        }
        let mut cells = Vec::new();
        cells
            .try_reserve_exact(len)
            .map_err(|_| TapeError::AllocFailed { len })?;
        cells.resize(len, 0);
        Ok(Self {
            cells,
            zero_offset,
            max_len,
        })
    }

    /// Returns the arena length.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Always `false`: a tape holds at least one cell.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Returns the physical index of logical index 0.
    #[must_use]
    pub fn zero_offset(&self) -> usize {
        self.zero_offset
    }

    /// Returns the logical index range currently backed by the arena.
    #[must_use]
    pub fn logical_range(&self) -> core::ops::Range<i64> {
        let start = -(self.zero_offset as i64);
        start..start + self.cells.len() as i64
    }

    /// Returns the physical index for `index` if it is already addressable.
    #[must_use]
    pub fn physical(&self, index: i64) -> Option<usize> {
        let phys = self.zero_offset as i128 + i128::from(index);
        if (0..self.cells.len() as i128).contains(&phys) {
            Some(phys as usize)
        } else {
            None
        }
    }

    /// Makes `index` addressable and returns its physical index.
    ///
    /// See [`Tape::ensure_tracked`] for the growth event.
    pub fn ensure(&mut self, index: i64) -> Result<usize, TapeError> {
        self.ensure_tracked(index).map(|(phys, _)| phys)
    }

    /// Makes `index` addressable, growing the arena if needed.
    ///
    /// Returns the physical index and, if the arena grew, a description of the growth.
    pub fn ensure_tracked(&mut self, index: i64) -> Result<(usize, Option<Growth>), TapeError> {
        if let Some(phys) = self.physical(index) {
            return Ok((phys, None));
        }

        let old_len = self.cells.len();
        let phys = self.zero_offset as i128 + i128::from(index);
        let growth = if phys < 0 {
            let deficit = usize::try_from(-phys).map_err(|_| self.limit(index))?;
            self.grow_left(index, deficit)?
        } else {
            let required = usize::try_from(phys)
                .ok()
                .and_then(|p| p.checked_add(1))
                .ok_or_else(|| self.limit(index))?;
            self.grow_right(index, required)?
        };

        let phys = self.physical(index).ok_or_else(|| self.limit(index))?;
        debug_assert!(self.zero_offset < self.cells.len());
        Ok((
            phys,
            Some(Growth {
                old_len,
                new_len: self.cells.len(),
                shift: growth,
            }),
        ))
    }

    /// Reads the cell at `index`; cells outside the arena read as zero.
    #[must_use]
    pub fn get(&self, index: i64) -> u8 {
        self.physical(index).map_or(0, |p| self.cells[p])
    }

    /// Writes `value` at `index`, growing as needed.
    pub fn set(&mut self, index: i64, value: u8) -> Result<(), TapeError> {
        let phys = self.ensure(index)?;
        self.cells[phys] = value;
        Ok(())
    }

    /// Returns the cell at a physical index obtained from [`Tape::ensure`].
    #[must_use]
    pub(crate) fn cell(&self, phys: usize) -> u8 {
        self.cells[phys]
    }

    /// Returns a mutable cell at a physical index obtained from [`Tape::ensure`].
    pub(crate) fn cell_mut(&mut self, phys: usize) -> &mut u8 {
        &mut self.cells[phys]
    }

    /// Returns the raw arena.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.cells
    }

    fn limit(&self, index: i64) -> TapeError {
        TapeError::LimitExceeded {
            index,
            max_len: self.max_len,
        }
    }

    fn doubled_len_for(
        &self,
        index: i64,
        mut fits: impl FnMut(usize) -> bool,
    ) -> Result<usize, TapeError> {
        let mut new_len = self.cells.len();
        while !fits(new_len) {
            match new_len.checked_mul(2) {
                Some(doubled) if doubled <= self.max_len => new_len = doubled,
                // The last step is clamped to the ceiling when that is enough.
                _ if self.max_len > new_len && fits(self.max_len) => return Ok(self.max_len),
                _ => return Err(self.limit(index)),
            }
        }
        Ok(new_len)
    }

    fn grow_right(&mut self, index: i64, required: usize) -> Result<usize, TapeError> {
        let new_len = self.doubled_len_for(index, |len| len >= required)?;
        let extra = new_len - self.cells.len();
        self.cells
            .try_reserve_exact(extra)
            .map_err(|_| TapeError::AllocFailed { len: new_len })?;
        self.cells.resize(new_len, 0);
        Ok(0)
    }

    fn grow_left(&mut self, index: i64, deficit: usize) -> Result<usize, TapeError> {
        let old_len = self.cells.len();
        let new_len =
            self.doubled_len_for(index, |len| len > old_len && len - old_len >= deficit)?;
        // Half of the slack beyond the deficit becomes new left margin; the rest stays on the
        // right.
        let slack = new_len - old_len - deficit;
        let shift = deficit + slack / 2;

        let mut cells = Vec::new();
        cells
            .try_reserve_exact(new_len)
            .map_err(|_| TapeError::AllocFailed { len: new_len })?;
        cells.resize(shift, 0);
        cells.extend_from_slice(&self.cells);
        cells.resize(new_len, 0);

        self.cells = cells;
        self.zero_offset += shift;
        Ok(shift)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_tape_has_origin_at_midpoint() {
        let t = Tape::new(10).unwrap();
        assert_eq!(t.len(), 10);
        assert_eq!(t.zero_offset(), 5);
        assert_eq!(t.logical_range(), -5..5);
        assert!(!t.is_empty());

        let t = Tape::new(0).unwrap();
        assert_eq!(t.len(), 1);
        assert_eq!(t.zero_offset(), 0);
    }

    #[test]
    fn boundary_indices_do_not_grow() {
        let mut t = Tape::new(10).unwrap();
        assert_eq!(t.ensure_tracked(4).unwrap(), (9, None));
        assert_eq!(t.ensure_tracked(-5).unwrap(), (0, None));
        assert_eq!(t.len(), 10);
    }

    #[test]
    fn one_past_the_right_edge_doubles() {
        let mut t = Tape::new(10).unwrap();
        let (phys, growth) = t.ensure_tracked(5).unwrap();
        assert_eq!(phys, 10);
        assert_eq!(
            growth,
            Some(Growth {
                old_len: 10,
                new_len: 20,
                shift: 0
            })
        );
        assert_eq!(t.zero_offset(), 5);
    }

    #[test]
    fn one_past_the_left_edge_shifts_contents() {
        let mut t = Tape::new(10).unwrap();
        t.set(-5, 7).unwrap();
        t.set(4, 9).unwrap();
        let (phys, growth) = t.ensure_tracked(-6).unwrap();
        let growth = growth.unwrap();
        assert_eq!(growth.old_len, 10);
        assert_eq!(growth.new_len, 20);
        // deficit 1, slack 9 -> shift 1 + 4.
        assert_eq!(growth.shift, 5);
        assert_eq!(t.zero_offset(), 10);
        assert_eq!(phys, 4);
        assert_eq!(t.get(-5), 7);
        assert_eq!(t.get(4), 9);
        assert_eq!(t.get(-6), 0);
    }

    #[test]
    fn repeated_doubling_reaches_far_indices() {
        let mut t = Tape::new(4).unwrap();
        t.set(0, 1).unwrap();
        t.set(1_000, 2).unwrap();
        assert!(t.len() >= 1_000);
        assert!(t.len().is_power_of_two());
        t.set(-5_000, 3).unwrap();
        assert_eq!(t.get(0), 1);
        assert_eq!(t.get(1_000), 2);
        assert_eq!(t.get(-5_000), 3);
        assert!(t.zero_offset() < t.len());
        assert!(t.logical_range().contains(&-5_000));
        assert!(t.logical_range().contains(&1_000));
    }

    #[test]
    fn unbacked_cells_read_as_zero() {
        let t = Tape::new(4).unwrap();
        assert_eq!(t.get(i64::MIN), 0);
        assert_eq!(t.get(i64::MAX), 0);
        assert_eq!(t.physical(i64::MIN), None);
    }

    #[test]
    fn growth_respects_cell_ceiling() {
        let mut t = Tape::with_max_len(8, 16).unwrap();
        t.ensure(11).unwrap();
        assert_eq!(t.len(), 16);
        assert_eq!(
            t.ensure(12),
            Err(TapeError::LimitExceeded {
                index: 12,
                max_len: 16
            })
        );
        assert_eq!(
            t.ensure(-100),
            Err(TapeError::LimitExceeded {
                index: -100,
                max_len: 16
            })
        );
        assert_eq!(t.len(), 16);
    }

    #[test]
    fn extreme_indices_fail_without_wrapping() {
        let mut t = Tape::with_max_len(8, 1 << 20).unwrap();
        assert!(matches!(
            t.ensure(i64::MAX),
            Err(TapeError::LimitExceeded { .. })
        ));
        assert!(matches!(
            t.ensure(i64::MIN),
            Err(TapeError::LimitExceeded { .. })
        ));
        assert_eq!(t.len(), 8);
    }

    #[test]
    fn last_growth_step_is_clamped_to_the_ceiling() {
        let mut t = Tape::with_max_len(3, 8).unwrap();
        // Index 5 needs 7 cells; doubling would overshoot to 12.
        let (_, growth) = t.ensure_tracked(5).unwrap();
        assert_eq!(growth.map(|g| g.new_len), Some(8));
        assert_eq!(t.len(), 8);
        assert_eq!(
            t.ensure(7),
            Err(TapeError::LimitExceeded {
                index: 7,
                max_len: 8
            })
        );

        let mut t = Tape::with_max_len(4, 7).unwrap();
        t.set(-2, 1).unwrap();
        let (_, growth) = t.ensure_tracked(-4).unwrap();
        let growth = growth.unwrap();
        assert_eq!(growth.new_len, 7);
        assert_eq!(t.get(-2), 1);
        assert!(t.logical_range().contains(&-4));
    }

    #[test]
    fn initial_length_is_checked_against_the_ceiling() {
        assert_eq!(
            Tape::with_max_len(10, 4),
            Err(TapeError::LimitExceeded {
                index: 4,
                max_len: 4
            })
        );
        assert_eq!(Tape::with_max_len(4, 4).unwrap().len(), 4);
    }

    #[test]
    fn oversized_initial_tape_fails_to_allocate() {
        let len = usize::MAX / 2;
        assert_eq!(Tape::new(len), Err(TapeError::AllocFailed { len }));
    }

    #[test]
    fn default_tape_matches_default_length() {
        let t = Tape::default();
        assert_eq!(t.len(), DEFAULT_TAPE_LEN);
        assert_eq!(t.zero_offset(), DEFAULT_TAPE_LEN / 2);
    }
}
