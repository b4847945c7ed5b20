// Copyright 2026 the Scope Tape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! `scope_tape`: a tape VM for a Brainfuck dialect with scoped pointers and transactional undo.
//!
//! Besides the eight classic commands (`+ - > < . , [ ]`), the dialect has pointer scopes:
//! `{` opens a scope that starts at the current position, and `}` closes it, rolling back every
//! cell written inside it and returning to the position the scope was opened at.
//!
//! Execution is split into three stages:
//! - [`program::Program::from_source`] filters source text (comments start with `#`)
//! - [`verifier::verify_program`] checks bracket/brace nesting and builds jump tables
//! - [`vm::Vm::run`] executes the verified program under explicit [`vm::Limits`]
//!
//! ## Example
//!
//! ```
//! use scope_tape::program::Program;
//! use scope_tape::trace::TraceMask;
//! use scope_tape::verifier::{VerifyConfig, verify_program};
//! use scope_tape::vm::{Limits, Vm};
//!
//! // Print 3 from inside a scope, then 1 after the scope rolled the cell back.
//! let program = Program::from_source("+ { ++ . } . # scoped write");
//! let program = verify_program(&program, &VerifyConfig::default())?;
//!
//! let mut vm = Vm::new(&b""[..], Vec::new(), Limits::default());
//! vm.run(&program, TraceMask::NONE, None).unwrap();
//! assert_eq!(vm.output(), &[3, 1]);
//! # Ok::<(), scope_tape::verifier::VerifyError>(())
//! ```

#![no_std]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod io;
pub mod opcode;
pub mod program;
pub mod scope;
pub mod tape;
pub mod trace;
pub mod verifier;
pub mod vm;

pub use vm::{RunError, run};
