// Copyright 2026 the Scope Tape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Structural verification and jump-table construction.
//!
//! Verification rejects every program whose brackets (`[` / `]`) or braces (`{` / `}`) do not
//! pair up before anything executes, so a structural error can never leave the tape partially
//! mutated. The two families nest independently but may not cross: `[{}]` is accepted while
//! `[{]}` is rejected.
//!
//! On success the verifier produces a [`VerifiedProgram`] carrying one jump table per family.
//! The VM uses those tables for O(1) control transfers instead of rescanning the code.

use alloc::vec;
use alloc::vec::Vec;
use core::fmt;

use crate::opcode::{Command, PairFamily};
use crate::program::Program;

#[cfg(doc)]
use crate::vm::Vm;

/// Verifier configuration and limits.
#[derive(Clone, Debug)]
pub struct VerifyConfig {
    /// Maximum number of filtered commands.
    pub max_code_len: usize,
    /// Maximum combined nesting depth of brackets and braces.
    pub max_nesting_depth: usize,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            max_code_len: 65_536,
            max_nesting_depth: 1_024,
        }
    }
}

/// A structural verification error.
///
/// Every position is an index into the filtered command stream; use
/// [`Program::source_offset`] to map it back to the source text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VerifyError {
    /// The filtered program is longer than [`VerifyConfig::max_code_len`].
    CodeTooLarge {
        /// Filtered program length.
        len: usize,
        /// Configured maximum.
        max: usize,
    },
    /// Brackets and braces are nested deeper than [`VerifyConfig::max_nesting_depth`].
    NestingTooDeep {
        /// Position of the opener that exceeded the limit.
        pos: usize,
        /// Configured maximum.
        max: usize,
    },
    /// A closer appeared with nothing open.
    UnmatchedClose {
        /// Position of the closer.
        pos: usize,
        /// The closer found.
        found: Command,
    },
    /// A closer does not match the family of the innermost open pair (e.g. `[{]`).
    MismatchedPair {
        /// Position of the closer.
        pos: usize,
        /// The closer found.
        found: Command,
        /// The closer the innermost open pair expects.
        expected: Command,
        /// Position of the innermost opener.
        open_pos: usize,
    },
    /// An opener is never closed.
    ///
    /// When several openers are left open the innermost one is reported.
    UnclosedOpen {
        /// Position of the opener.
        pos: usize,
        /// The opener found.
        found: Command,
    },
}

impl fmt::Display for VerifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CodeTooLarge { len, max } => {
                write!(f, "code length {len} exceeds maximum {max}")
            }
            Self::NestingTooDeep { pos, max } => {
                write!(f, "nesting depth exceeds {max} at position {pos}")
            }
            Self::UnmatchedClose { pos, found } => {
                write!(f, "unmatched '{found}' at position {pos}")
            }
            Self::MismatchedPair {
                pos,
                found,
                expected,
                open_pos,
            } => write!(
                f,
                "mismatched pair: found '{found}' but expected '{expected}' at position {pos} \
                 (matching open at {open_pos})"
            ),
            Self::UnclosedOpen { pos, found } => {
                write!(f, "unmatched opening '{found}' at position {pos}")
            }
        }
    }
}

impl core::error::Error for VerifyError {}

/// A partner table for one pair family.
///
/// Indexed by code position; `None` for positions that hold no symbol of the family.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JumpTable {
    partners: Vec<Option<u32>>,
}

impl JumpTable {
    fn new(len: usize) -> Self {
        Self {
            partners: vec![None; len],
        }
    }

    fn link(&mut self, open: usize, close: usize) {
        // Positions are below `code_len_limit`, so they fit in `u32`.
        self.partners[open] = Some(close as u32);
        self.partners[close] = Some(open as u32);
    }

    /// Returns the partner of the symbol at `pos`.
    #[must_use]
    pub fn partner(&self, pos: usize) -> Option<usize> {
        self.partners.get(pos).copied().flatten().map(|p| p as usize)
    }

    /// Returns the table length (the filtered program length).
    #[must_use]
    pub fn len(&self) -> usize {
        self.partners.len()
    }

    /// Returns `true` if the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.partners.is_empty()
    }
}

/// A program that passed structural verification.
///
/// This is the only program form [`Vm::run`] accepts, so the VM may assume every bracket and
/// brace has a partner.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerifiedProgram {
    program: Program,
    bracket_map: JumpTable,
    brace_map: JumpTable,
}

impl VerifiedProgram {
    /// Returns the underlying program.
    #[must_use]
    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Returns the `[` / `]` partner table.
    #[must_use]
    pub fn bracket_map(&self) -> &JumpTable {
        &self.bracket_map
    }

    /// Returns the `{` / `}` partner table.
    #[must_use]
    pub fn brace_map(&self) -> &JumpTable {
        &self.brace_map
    }

    /// Consumes `self` and returns the underlying program.
    #[must_use]
    pub fn into_program(self) -> Program {
        self.program
    }
}

impl fmt::Display for VerifiedProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.program, f)
    }
}

/// Verifies `program` and builds its jump tables.
pub fn verify_program(
    program: &Program,
    cfg: &VerifyConfig,
) -> Result<VerifiedProgram, VerifyError> {
    let (bracket_map, brace_map) = build_jump_tables(program.commands(), cfg)?;
    Ok(VerifiedProgram {
        program: program.clone(),
        bracket_map,
        brace_map,
    })
}

/// Verifies `program`, taking ownership on success.
pub fn verify_program_owned(
    program: Program,
    cfg: &VerifyConfig,
) -> Result<VerifiedProgram, VerifyError> {
    let (bracket_map, brace_map) = build_jump_tables(program.commands(), cfg)?;
    Ok(VerifiedProgram {
        program,
        bracket_map,
        brace_map,
    })
}

/// Effective code length ceiling: jump tables store positions as `u32`.
fn code_len_limit(cfg: &VerifyConfig) -> usize {
    let table_max = usize::try_from(u32::MAX).unwrap_or(usize::MAX);
    cfg.max_code_len.min(table_max)
}

fn build_jump_tables(
    code: &[Command],
    cfg: &VerifyConfig,
) -> Result<(JumpTable, JumpTable), VerifyError> {
    let max = code_len_limit(cfg);
    if code.len() > max {
        return Err(VerifyError::CodeTooLarge {
            len: code.len(),
            max,
        });
    }

    let mut bracket_map = JumpTable::new(code.len());
    let mut brace_map = JumpTable::new(code.len());
    let mut open: Vec<(usize, PairFamily)> = Vec::new();

    for (pos, &cmd) in code.iter().enumerate() {
        let Some((family, is_open)) = cmd.pair() else {
            continue;
        };
        if is_open {
            if open.len() >= cfg.max_nesting_depth {
                return Err(VerifyError::NestingTooDeep {
                    pos,
                    max: cfg.max_nesting_depth,
                });
            }
            open.push((pos, family));
            continue;
        }

        let Some(&(open_pos, open_family)) = open.last() else {
            return Err(VerifyError::UnmatchedClose { pos, found: cmd });
        };
        if open_family != family {
            return Err(VerifyError::MismatchedPair {
                pos,
                found: cmd,
                expected: open_family.close(),
                open_pos,
            });
        }
        open.pop();
        match family {
            PairFamily::Bracket => bracket_map.link(open_pos, pos),
            PairFamily::Brace => brace_map.link(open_pos, pos),
        }
    }

    if let Some(&(pos, family)) = open.last() {
        return Err(VerifyError::UnclosedOpen {
            pos,
            found: family.open(),
        });
    }

    Ok((bracket_map, brace_map))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verify(src: &str) -> Result<VerifiedProgram, VerifyError> {
        verify_program(&Program::from_source(src), &VerifyConfig::default())
    }

    #[test]
    fn verifier_accepts_empty_program() {
        let vp = verify("").unwrap();
        assert!(vp.bracket_map().is_empty());
        assert!(vp.brace_map().is_empty());
    }

    #[test]
    fn verifier_links_brackets_and_braces_independently() {
        // 0:[ 1:{ 2:} 3:]
        let vp = verify("[{}]").unwrap();
        assert_eq!(vp.bracket_map().partner(0), Some(3));
        assert_eq!(vp.bracket_map().partner(3), Some(0));
        assert_eq!(vp.bracket_map().partner(1), None);
        assert_eq!(vp.brace_map().partner(1), Some(2));
        assert_eq!(vp.brace_map().partner(2), Some(1));
        assert_eq!(vp.brace_map().partner(0), None);
    }

    #[test]
    fn verifier_links_nested_loops() {
        // 0:+ 1:[ 2:[ 3:- 4:] 5:> 6:]
        let vp = verify("+[[-]>]").unwrap();
        let m = vp.bracket_map();
        assert_eq!(m.partner(1), Some(6));
        assert_eq!(m.partner(6), Some(1));
        assert_eq!(m.partner(2), Some(4));
        assert_eq!(m.partner(4), Some(2));
        assert_eq!(m.partner(0), None);
        assert_eq!(m.len(), 7);
    }

    #[test]
    fn verifier_rejects_crossed_families() {
        assert_eq!(
            verify("[{]}").unwrap_err(),
            VerifyError::MismatchedPair {
                pos: 2,
                found: Command::LoopEnd,
                expected: Command::ScopeClose,
                open_pos: 1,
            }
        );
        assert_eq!(
            verify("{[}]").unwrap_err(),
            VerifyError::MismatchedPair {
                pos: 2,
                found: Command::ScopeClose,
                expected: Command::LoopEnd,
                open_pos: 1,
            }
        );
    }

    #[test]
    fn verifier_rejects_unmatched_close() {
        assert_eq!(
            verify("+]").unwrap_err(),
            VerifyError::UnmatchedClose {
                pos: 1,
                found: Command::LoopEnd,
            }
        );
        assert_eq!(
            verify("{}}").unwrap_err(),
            VerifyError::UnmatchedClose {
                pos: 2,
                found: Command::ScopeClose,
            }
        );
    }

    #[test]
    fn verifier_reports_innermost_unclosed_opener() {
        assert_eq!(
            verify("[+{").unwrap_err(),
            VerifyError::UnclosedOpen {
                pos: 2,
                found: Command::ScopeOpen,
            }
        );
        assert_eq!(
            verify("[[]").unwrap_err(),
            VerifyError::UnclosedOpen {
                pos: 0,
                found: Command::LoopStart,
            }
        );
    }

    #[test]
    fn verifier_positions_ignore_comments() {
        // The `]` inside the comment is not code; the real one sits at filtered position 1.
        let err = verify("# ]\n+\n]").unwrap_err();
        assert_eq!(
            err,
            VerifyError::UnmatchedClose {
                pos: 1,
                found: Command::LoopEnd,
            }
        );
    }

    #[test]
    fn verifier_enforces_nesting_limit() {
        let cfg = VerifyConfig {
            max_nesting_depth: 2,
            ..VerifyConfig::default()
        };
        let ok = Program::from_source("[{}]");
        verify_program(&ok, &cfg).unwrap();
        let deep = Program::from_source("[{[]}]");
        assert_eq!(
            verify_program(&deep, &cfg).unwrap_err(),
            VerifyError::NestingTooDeep { pos: 2, max: 2 }
        );
    }

    #[test]
    fn verifier_enforces_code_length_limit() {
        let cfg = VerifyConfig {
            max_code_len: 3,
            ..VerifyConfig::default()
        };
        assert_eq!(
            verify_program(&Program::from_source("++++"), &cfg).unwrap_err(),
            VerifyError::CodeTooLarge { len: 4, max: 3 }
        );
    }

    #[test]
    fn code_length_ceiling_fits_jump_table_entries() {
        let unbounded = VerifyConfig {
            max_code_len: usize::MAX,
            ..VerifyConfig::default()
        };
        let limit = code_len_limit(&unbounded);
        assert!(u32::try_from(limit).is_ok());
        assert_eq!(code_len_limit(&VerifyConfig::default()), 65_536);

        // Small programs are unaffected by the cap.
        let p = verify_program(&Program::from_source("[{}]"), &unbounded).unwrap();
        assert_eq!(p.bracket_map().partner(3), Some(0));
        assert_eq!(p.brace_map().partner(2), Some(1));
    }

    #[test]
    fn verify_error_display_names_symbols() {
        let msg = alloc::format!("{}", verify("[{]}").unwrap_err());
        assert_eq!(
            msg,
            "mismatched pair: found ']' but expected '}' at position 2 (matching open at 1)"
        );
    }
}
