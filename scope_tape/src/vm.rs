// Copyright 2026 the Scope Tape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Interpreter for verified programs.
//!
//! The VM executes programs with explicit limits (fuel, scope depth, tape size).
//!
//! The VM executes [`VerifiedProgram`]s only, so every bracket and brace it meets is known to
//! have a partner.

use core::fmt;

use crate::io::{ByteSink, ByteSource, IoError};
use crate::opcode::Command;
use crate::program::Program;
use crate::scope::{Level, ScopeError, ScopeStack, UndoLog};
use crate::tape::{DEFAULT_TAPE_LEN, Tape, TapeError};
use crate::trace::{InstrEvent, ScopeExit, TraceMask, TraceOutcome, TraceSink};
use crate::verifier::{VerifiedProgram, VerifyConfig, VerifyError, verify_program_owned};

/// Execution limits for a VM run.
#[derive(Clone, Debug)]
pub struct Limits {
    /// Instruction budget. Each executed command costs 1.
    pub fuel: u64,
    /// Maximum number of scopes open above the root scope.
    pub max_scope_depth: u32,
    /// Initial tape length in cells.
    pub initial_tape_len: usize,
    /// Ceiling on tape length in cells.
    pub max_tape_len: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            fuel: 100_000_000,
            max_scope_depth: 255,
            initial_tape_len: DEFAULT_TAPE_LEN,
            max_tape_len: 1 << 30,
        }
    }
}

/// A runtime trap.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Trap {
    /// Fuel limit exceeded.
    FuelExceeded,
    /// The tape could not grow to the requested index.
    TapeCapacity(TapeError),
    /// Opened more scopes than [`Limits::max_scope_depth`] allows.
    ScopeOverflow {
        /// Configured maximum depth.
        max_depth: u32,
    },
    /// Closed the root scope.
    ScopeUnderflow,
    /// The output sink failed.
    OutputFailed(IoError),
    /// The input source failed (end of input is not a failure).
    InputFailed(IoError),
    /// A bracket or brace had no jump-table partner.
    InvalidJump,
}

impl fmt::Display for Trap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FuelExceeded => write!(f, "fuel limit exceeded"),
            Self::TapeCapacity(e) => write!(f, "tape capacity: {e}"),
            Self::ScopeOverflow { max_depth } => {
                write!(f, "scope stack overflow (max depth {max_depth})")
            }
            Self::ScopeUnderflow => write!(f, "scope stack underflow"),
            Self::OutputFailed(e) => write!(f, "output failed: {e}"),
            Self::InputFailed(e) => write!(f, "input failed: {e}"),
            Self::InvalidJump => write!(f, "invalid jump target"),
        }
    }
}

impl core::error::Error for Trap {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            Self::TapeCapacity(e) => Some(e),
            Self::OutputFailed(e) | Self::InputFailed(e) => Some(e),
            _ => None,
        }
    }
}

impl From<TapeError> for Trap {
    fn from(e: TapeError) -> Self {
        Self::TapeCapacity(e)
    }
}

impl From<ScopeError> for Trap {
    fn from(e: ScopeError) -> Self {
        match e {
            ScopeError::Overflow { max_depth } => Self::ScopeOverflow { max_depth },
            ScopeError::Underflow => Self::ScopeUnderflow,
        }
    }
}

/// A trap annotated with location information.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrapInfo {
    /// Instruction pointer (filtered command index). Equals the program length for traps raised
    /// after the last command (e.g. the final flush).
    pub ip: usize,
    /// Command at `ip`, if any.
    pub command: Option<Command>,
    /// Source byte offset of `ip`, if the program was built from source.
    pub source_offset: Option<usize>,
    /// Trap kind.
    pub trap: Trap,
}

impl fmt::Display for TrapInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "trap at ip={}", self.ip)?;
        if let Some(cmd) = self.command {
            write!(f, " '{cmd}'")?;
        }
        if let Some(offset) = self.source_offset {
            write!(f, " (source offset {offset})")?;
        }
        write!(f, ": {}", self.trap)
    }
}

impl core::error::Error for TrapInfo {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        Some(&self.trap)
    }
}

/// Summary of a successful run.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RunSummary {
    /// Commands executed.
    pub steps: u64,
    /// Final tape length in cells.
    pub tape_len: usize,
}

/// Per-run execution context for [`Vm`].
///
/// This holds all state one run mutates: the tape, the scope stack, the undo log and the
/// remaining fuel. Embedders can pass their own context to [`Vm::run_with_ctx`] to inspect the
/// tape after a run.
#[derive(Clone, Debug, Default)]
pub struct ExecutionContext {
    fuel: u64,
    steps: u64,
    tape: Tape,
    scopes: ScopeStack,
    undo: UndoLog,
}

impl ExecutionContext {
    /// Creates an execution context with a default-sized tape.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the tape.
    #[must_use]
    pub fn tape(&self) -> &Tape {
        &self.tape
    }

    /// Returns the scope stack.
    #[must_use]
    pub fn scopes(&self) -> &ScopeStack {
        &self.scopes
    }

    /// Returns the undo log.
    #[must_use]
    pub fn undo_log(&self) -> &UndoLog {
        &self.undo
    }

    /// Returns the current logical position.
    #[must_use]
    pub fn position(&self) -> i64 {
        self.scopes.position()
    }

    /// Returns the number of commands executed by the last run.
    #[must_use]
    pub fn steps(&self) -> u64 {
        self.steps
    }

    fn reset(&mut self, limits: &Limits) -> Result<(), TapeError> {
        self.tape = Tape::with_max_len(limits.initial_tape_len, limits.max_tape_len)?;
        self.fuel = limits.fuel;
        self.steps = 0;
        self.scopes.reset(limits.max_scope_depth);
        self.undo.clear();
        Ok(())
    }

    fn trap(&self, program: &Program, ip: usize, trap: Trap) -> TrapInfo {
        TrapInfo {
            ip,
            command: program.get(ip),
            source_offset: program.source_offset(ip),
            trap,
        }
    }

    /// Makes `index` addressable, reporting growth to the trace sink.
    fn ensure(
        &mut self,
        index: i64,
        trace_mask: TraceMask,
        trace: &mut Option<&mut dyn TraceSink>,
    ) -> Result<usize, Trap> {
        let (phys, growth) = self.tape.ensure_tracked(index)?;
        if let Some(growth) = growth
            && trace_mask.contains(TraceMask::TAPE)
            && let Some(t) = trace.as_mut()
        {
            t.tape_grow(growth, self.tape.zero_offset());
        }
        Ok(phys)
    }

    /// Rolls back and closes the innermost scope.
    fn close_scope(&mut self) -> Result<(Level, usize), Trap> {
        let level = self.scopes.level();
        if level == 0 {
            return Err(ScopeError::Underflow.into());
        }
        let restored = self.undo.restore(&mut self.tape, level)?;
        self.scopes.pop()?;
        Ok((level, restored))
    }
}

/// A tape VM.
pub struct Vm<I: ByteSource, O: ByteSink> {
    input: I,
    output: O,
    limits: Limits,
}

impl<I: ByteSource, O: ByteSink> fmt::Debug for Vm<I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vm")
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}

impl<I: ByteSource, O: ByteSink> Vm<I, O> {
    /// Creates a new VM reading from `input`, writing to `output`, bounded by `limits`.
    #[must_use]
    pub fn new(input: I, output: O, limits: Limits) -> Self {
        Self {
            input,
            output,
            limits,
        }
    }

    /// Returns the limits.
    #[must_use]
    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Returns the output sink.
    #[must_use]
    pub fn output(&self) -> &O {
        &self.output
    }

    /// Consumes the VM and returns its input source and output sink.
    #[must_use]
    pub fn into_parts(self) -> (I, O) {
        (self.input, self.output)
    }

    /// Executes `program` to completion.
    ///
    /// Tracing is controlled by `trace_mask`; pass `None` for `trace` to disable tracing.
    pub fn run(
        &mut self,
        program: &VerifiedProgram,
        trace_mask: TraceMask,
        trace: Option<&mut dyn TraceSink>,
    ) -> Result<RunSummary, TrapInfo> {
        let mut ctx = ExecutionContext::new();
        self.run_with_ctx(&mut ctx, program, trace_mask, trace)
    }

    /// Executes `program` using an explicit per-run [`ExecutionContext`].
    ///
    /// The context is reset first. After the run it holds the final tape, which is useful for
    /// inspection and tests.
    pub fn run_with_ctx(
        &mut self,
        ctx: &mut ExecutionContext,
        program: &VerifiedProgram,
        trace_mask: TraceMask,
        mut trace: Option<&mut dyn TraceSink>,
    ) -> Result<RunSummary, TrapInfo> {
        let program_ref = program.program();
        if trace_mask.contains(TraceMask::RUN)
            && let Some(t) = trace.as_mut()
        {
            t.run_start(program_ref);
        }

        let result = self.run_body(ctx, program, trace_mask, &mut trace);

        if trace_mask.contains(TraceMask::RUN)
            && let Some(t) = trace.as_mut()
        {
            let outcome = match &result {
                Ok(summary) => TraceOutcome::Ok {
                    steps: summary.steps,
                },
                Err(e) => TraceOutcome::Trap(e),
            };
            t.run_end(program_ref, outcome);
        }

        result
    }

    fn run_body(
        &mut self,
        ctx: &mut ExecutionContext,
        program: &VerifiedProgram,
        trace_mask: TraceMask,
        trace: &mut Option<&mut dyn TraceSink>,
    ) -> Result<RunSummary, TrapInfo> {
        let program_ref = program.program();
        let code = program_ref.commands();
        ctx.reset(&self.limits)
            .map_err(|e| ctx.trap(program_ref, 0, Trap::TapeCapacity(e)))?;

        let mut ip = 0_usize;
        while let Some(&cmd) = code.get(ip) {
            if ctx.fuel == 0 {
                return Err(ctx.trap(program_ref, ip, Trap::FuelExceeded));
            }
            ctx.fuel -= 1;
            ctx.steps += 1;

            if trace_mask.contains(TraceMask::INSTR)
                && let Some(t) = trace.as_mut()
            {
                let position = ctx.scopes.position();
                t.instr(
                    program_ref,
                    InstrEvent {
                        ip,
                        command: cmd,
                        level: ctx.scopes.level(),
                        position,
                        cell: ctx.tape.get(position),
                    },
                );
            }

            match self.step(ctx, program, ip, cmd, trace_mask, trace) {
                Ok(next) => ip = next,
                Err(t) => return Err(ctx.trap(program_ref, ip, t)),
            }
        }

        self.finish(ctx, program_ref, ip, trace_mask, trace)
    }

    /// Closes scopes left open above the root, like an explicit `}` each, then flushes output.
    ///
    /// Verification rejects unbalanced braces, so for a [`VerifiedProgram`] only the flush
    /// has work to do.
    fn finish(
        &mut self,
        ctx: &mut ExecutionContext,
        program: &Program,
        ip: usize,
        trace_mask: TraceMask,
        trace: &mut Option<&mut dyn TraceSink>,
    ) -> Result<RunSummary, TrapInfo> {
        while ctx.scopes.level() > 0 {
            let (level, restored) = ctx.close_scope().map_err(|t| ctx.trap(program, ip, t))?;
            if trace_mask.contains(TraceMask::SCOPE)
                && let Some(t) = trace.as_mut()
            {
                t.scope_exit(
                    program,
                    ip,
                    level,
                    restored,
                    ctx.scopes.position(),
                    ScopeExit::Cleanup,
                );
            }
        }

        self.output
            .flush()
            .map_err(|e| ctx.trap(program, ip, Trap::OutputFailed(e)))?;

        Ok(RunSummary {
            steps: ctx.steps,
            tape_len: ctx.tape.len(),
        })
    }

    /// Executes `cmd` at `ip` and returns the next instruction pointer.
    fn step(
        &mut self,
        ctx: &mut ExecutionContext,
        program: &VerifiedProgram,
        ip: usize,
        cmd: Command,
        trace_mask: TraceMask,
        trace: &mut Option<&mut dyn TraceSink>,
    ) -> Result<usize, Trap> {
        let pos = ctx.scopes.position();

        if cmd.mutates_cell() {
            ctx.ensure(pos, trace_mask, trace)?;
            let level = ctx.scopes.level();
            ctx.undo.record(&mut ctx.tape, pos, level)?;
        }

        match cmd {
            Command::Right | Command::Left => {
                let delta = if cmd == Command::Right { 1 } else { -1 };
                let next = pos.checked_add(delta).ok_or(TapeError::LimitExceeded {
                    index: pos,
                    max_len: self.limits.max_tape_len,
                })?;
                ctx.ensure(next, trace_mask, trace)?;
                ctx.scopes.set_position(next);
            }
            Command::Inc => {
                let phys = ctx.ensure(pos, trace_mask, trace)?;
                let cell = ctx.tape.cell_mut(phys);
                *cell = cell.wrapping_add(1);
            }
            Command::Dec => {
                let phys = ctx.ensure(pos, trace_mask, trace)?;
                let cell = ctx.tape.cell_mut(phys);
                *cell = cell.wrapping_sub(1);
            }
            Command::Output => {
                let phys = ctx.ensure(pos, trace_mask, trace)?;
                self.output
                    .write_byte(ctx.tape.cell(phys))
                    .map_err(Trap::OutputFailed)?;
            }
            Command::Input => {
                let phys = ctx.ensure(pos, trace_mask, trace)?;
                let byte = self
                    .input
                    .read_byte()
                    .map_err(Trap::InputFailed)?
                    .unwrap_or(0);
                *ctx.tape.cell_mut(phys) = byte;
            }
            Command::LoopStart => {
                let phys = ctx.ensure(pos, trace_mask, trace)?;
                if ctx.tape.cell(phys) == 0 {
                    let target = program.bracket_map().partner(ip).ok_or(Trap::InvalidJump)?;
                    return Ok(target + 1);
                }
            }
            Command::LoopEnd => {
                let phys = ctx.ensure(pos, trace_mask, trace)?;
                if ctx.tape.cell(phys) != 0 {
                    let target = program.bracket_map().partner(ip).ok_or(Trap::InvalidJump)?;
                    return Ok(target + 1);
                }
            }
            Command::ScopeOpen => {
                let level = ctx.scopes.push()?;
                if trace_mask.contains(TraceMask::SCOPE)
                    && let Some(t) = trace.as_mut()
                {
                    t.scope_enter(program.program(), ip, level, pos);
                }
            }
            Command::ScopeClose => {
                let (level, restored) = ctx.close_scope()?;
                if trace_mask.contains(TraceMask::SCOPE)
                    && let Some(t) = trace.as_mut()
                {
                    t.scope_exit(
                        program.program(),
                        ip,
                        level,
                        restored,
                        ctx.scopes.position(),
                        ScopeExit::Close,
                    );
                }
            }
        }

        Ok(ip + 1)
    }
}

/// Errors from [`run`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunError {
    /// The program failed structural verification; nothing was executed.
    Verify(VerifyError),
    /// The program trapped while executing.
    Trap(TrapInfo),
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Verify(e) => write!(f, "verification failed: {e}"),
            Self::Trap(e) => write!(f, "{e}"),
        }
    }
}

impl core::error::Error for RunError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            Self::Verify(e) => Some(e),
            Self::Trap(e) => Some(e),
        }
    }
}

impl From<VerifyError> for RunError {
    fn from(e: VerifyError) -> Self {
        Self::Verify(e)
    }
}

impl From<TrapInfo> for RunError {
    fn from(e: TrapInfo) -> Self {
        Self::Trap(e)
    }
}

/// Filters, verifies and runs `source` with default limits and a tape of `tape_initial_len`
/// cells.
pub fn run<I: ByteSource, O: ByteSink>(
    source: impl AsRef<[u8]>,
    tape_initial_len: usize,
    input: I,
    output: O,
) -> Result<RunSummary, RunError> {
    let program = verify_program_owned(Program::from_source(source), &VerifyConfig::default())?;
    let limits = Limits {
        initial_tape_len: tape_initial_len,
        ..Limits::default()
    };
    let mut vm = Vm::new(input, output, limits);
    Ok(vm.run(&program, TraceMask::NONE, None)?)
}
