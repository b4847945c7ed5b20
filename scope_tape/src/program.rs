// Copyright 2026 the Scope Tape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Filtered programs.
//!
//! A [`Program`] is the command stream left after discarding comments and every byte outside
//! the command alphabet. It keeps a source-offset table so positions reported by the verifier
//! and the VM can be mapped back to the original text.
//!
//! A [`Program`] has not been structurally checked; see [`crate::verifier`].

use alloc::vec::Vec;
use core::fmt;

use crate::opcode::Command;

/// Starts a comment that runs to the end of the line.
pub const COMMENT_BYTE: u8 = b'#';

/// A filtered command stream.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Program {
    commands: Vec<Command>,
    // Byte offset into the source of each command. Empty when built from commands directly.
    source_offsets: Vec<usize>,
}

impl Program {
    /// Filters `source` into a program.
    ///
    /// Everything from [`COMMENT_BYTE`] to the next `\n` is dropped, as is every byte that is not
    /// a command.
    #[must_use]
    pub fn from_source(source: impl AsRef<[u8]>) -> Self {
        let source = source.as_ref();
        let mut commands = Vec::with_capacity(source.len());
        let mut source_offsets = Vec::with_capacity(source.len());
        let mut in_comment = false;
        for (offset, &b) in source.iter().enumerate() {
            if in_comment {
                if b == b'\n' {
                    in_comment = false;
                }
                continue;
            }
            if b == COMMENT_BYTE {
                in_comment = true;
                continue;
            }
            if let Some(cmd) = Command::from_byte(b) {
                commands.push(cmd);
                source_offsets.push(offset);
            }
        }
        commands.shrink_to_fit();
        source_offsets.shrink_to_fit();
        Self {
            commands,
            source_offsets,
        }
    }

    /// Builds a program directly from commands (no source mapping).
    #[must_use]
    pub fn from_commands(commands: impl IntoIterator<Item = Command>) -> Self {
        Self {
            commands: commands.into_iter().collect(),
            source_offsets: Vec::new(),
        }
    }

    /// Returns the filtered commands.
    #[must_use]
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Returns the command at `ip`, if any.
    #[must_use]
    pub fn get(&self, ip: usize) -> Option<Command> {
        self.commands.get(ip).copied()
    }

    /// Returns the number of commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Returns `true` if there are no commands.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Returns the source byte offset of the command at `ip`.
    ///
    /// Returns `None` if `ip` is out of bounds or the program was not built from source.
    #[must_use]
    pub fn source_offset(&self, ip: usize) -> Option<usize> {
        self.source_offsets.get(ip).copied()
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for cmd in &self.commands {
            write!(f, "{cmd}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn filter_drops_comments_and_noise() {
        let p = Program::from_source("+ + hello > # a comment with [ and {\n<.");
        assert_eq!(p.to_string(), "++><.");
        assert_eq!(p.len(), 5);
    }

    #[test]
    fn comment_runs_to_end_of_line_only() {
        let p = Program::from_source("#[[[\n+#}\n-");
        assert_eq!(p.to_string(), "+-");
    }

    #[test]
    fn source_offsets_track_filtered_positions() {
        let p = Program::from_source("a+ b#x\n-");
        assert_eq!(p.commands(), &[Command::Inc, Command::Dec]);
        assert_eq!(p.source_offset(0), Some(1));
        assert_eq!(p.source_offset(1), Some(7));
        assert_eq!(p.source_offset(2), None);
    }

    #[test]
    fn from_commands_has_no_source_map() {
        let p = Program::from_commands([Command::ScopeOpen, Command::ScopeClose]);
        assert_eq!(p.to_string(), "{}");
        assert_eq!(p.get(1), Some(Command::ScopeClose));
        assert_eq!(p.source_offset(0), None);
    }
}
