// Copyright 2026 the Scope Tape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The command alphabet.

use core::fmt;

/// One command of the language.
///
/// Every command is a single ASCII byte in source form.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Command {
    /// `>`: move the current position one cell to the right.
    Right = b'>',
    /// `<`: move the current position one cell to the left.
    Left = b'<',
    /// `+`: increment the current cell (wrapping).
    Inc = b'+',
    /// `-`: decrement the current cell (wrapping).
    Dec = b'-',
    /// `.`: write the current cell to the output sink.
    Output = b'.',
    /// `,`: read one byte from the input source into the current cell.
    Input = b',',
    /// `[`: loop entry test.
    LoopStart = b'[',
    /// `]`: loop continuation test.
    LoopEnd = b']',
    /// `{`: open a pointer scope.
    ScopeOpen = b'{',
    /// `}`: close the current pointer scope and roll back its mutations.
    ScopeClose = b'}',
}

/// The two independently nesting pair families.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PairFamily {
    /// `[` / `]`.
    Bracket,
    /// `{` / `}`.
    Brace,
}

impl PairFamily {
    /// Returns the opening symbol of this family.
    #[must_use]
    pub const fn open(self) -> Command {
        match self {
            Self::Bracket => Command::LoopStart,
            Self::Brace => Command::ScopeOpen,
        }
    }

    /// Returns the closing symbol of this family.
    #[must_use]
    pub const fn close(self) -> Command {
        match self {
            Self::Bracket => Command::LoopEnd,
            Self::Brace => Command::ScopeClose,
        }
    }
}

impl Command {
    /// Returns the source byte of this command.
    #[must_use]
    pub const fn byte(self) -> u8 {
        self as u8
    }

    /// Parses a command from its source byte.
    ///
    /// Returns `None` for every byte outside the command alphabet.
    #[must_use]
    pub const fn from_byte(b: u8) -> Option<Self> {
        match b {
            b'>' => Some(Self::Right),
            b'<' => Some(Self::Left),
            b'+' => Some(Self::Inc),
            b'-' => Some(Self::Dec),
            b'.' => Some(Self::Output),
            b',' => Some(Self::Input),
            b'[' => Some(Self::LoopStart),
            b']' => Some(Self::LoopEnd),
            b'{' => Some(Self::ScopeOpen),
            b'}' => Some(Self::ScopeClose),
            _ => None,
        }
    }

    /// Returns the pair family and whether this command opens it.
    ///
    /// Returns `None` for commands that are not part of a pair.
    #[must_use]
    pub const fn pair(self) -> Option<(PairFamily, bool)> {
        match self {
            Self::LoopStart => Some((PairFamily::Bracket, true)),
            Self::LoopEnd => Some((PairFamily::Bracket, false)),
            Self::ScopeOpen => Some((PairFamily::Brace, true)),
            Self::ScopeClose => Some((PairFamily::Brace, false)),
            _ => None,
        }
    }

    /// Returns `true` if executing this command may mutate the current cell.
    #[must_use]
    pub const fn mutates_cell(self) -> bool {
        matches!(self, Self::Inc | Self::Dec | Self::Input)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", char::from(self.byte()))
    }
}
