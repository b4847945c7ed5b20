// Copyright 2026 the Scope Tape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

#![doc = "Command-line runner for `scope_tape` programs.\n\n\
          This is a std-only binary crate. The core VM stays `no_std`.\n"]

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::Parser;
use scope_tape::io::{Reader, Writer};
use scope_tape::program::Program;
use scope_tape::scope::Level;
use scope_tape::tape::Growth;
use scope_tape::trace::{InstrEvent, ScopeExit, TraceMask, TraceOutcome, TraceSink};
use scope_tape::verifier::{VerifyConfig, verify_program_owned};
use scope_tape::vm::{Limits, Vm};
use serde::Deserialize;

#[derive(Parser, Debug)]
#[command(name = "scope-tape")]
#[command(about = "Runs a scoped-tape Brainfuck program.", long_about = None)]
struct Options {
    /// Program source file.
    program: PathBuf,

    /// Input file; stdin if omitted.
    input: Option<PathBuf>,

    /// Output file; stdout if omitted.
    output: Option<PathBuf>,

    /// Write a step log to stderr.
    #[arg(long)]
    trace: bool,

    /// Instruction budget.
    #[arg(long, value_name = "N")]
    fuel: Option<u64>,

    /// Initial tape length in cells.
    #[arg(long, value_name = "N")]
    tape_len: Option<usize>,

    /// Maximum number of nested scopes.
    #[arg(long, value_name = "N")]
    max_scope_depth: Option<u32>,

    /// JSON file with limit overrides; flags win.
    #[arg(long, value_name = "FILE")]
    limits: Option<PathBuf>,
}

/// Limit overrides loaded from `--limits`. Absent fields keep their defaults.
#[derive(Deserialize, Debug, Default, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
struct LimitsFile {
    fuel: Option<u64>,
    max_scope_depth: Option<u32>,
    initial_tape_len: Option<usize>,
    max_tape_len: Option<usize>,
    max_code_len: Option<usize>,
    max_nesting_depth: Option<usize>,
}

fn load_limits(path: &Path) -> Result<LimitsFile> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read limits file {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("failed to parse limits file {}", path.display()))
}

/// Applies the limits file, then the command-line flags, over the defaults.
fn resolve_limits(opts: &Options, file: &LimitsFile) -> (Limits, VerifyConfig) {
    let mut limits = Limits::default();
    let mut verify = VerifyConfig::default();

    if let Some(fuel) = opts.fuel.or(file.fuel) {
        limits.fuel = fuel;
    }
    if let Some(depth) = opts.max_scope_depth.or(file.max_scope_depth) {
        limits.max_scope_depth = depth;
    }
    if let Some(len) = opts.tape_len.or(file.initial_tape_len) {
        limits.initial_tape_len = len;
    }
    if let Some(len) = file.max_tape_len {
        limits.max_tape_len = len;
    }
    if let Some(len) = file.max_code_len {
        verify.max_code_len = len;
    }
    if let Some(depth) = file.max_nesting_depth {
        verify.max_nesting_depth = depth;
    }
    (limits, verify)
}

fn read_source(path: &Path, max_code_len: usize) -> Result<Vec<u8>> {
    // Comments and whitespace may pad the source, so allow twice the filtered limit.
    let limit = u64::try_from(max_code_len.saturating_mul(2)).unwrap_or(u64::MAX);
    let len = fs::metadata(path)
        .with_context(|| format!("failed to read {}", path.display()))?
        .len();
    if len > limit {
        bail!(
            "program file {} is too large ({len} bytes, limit {limit})",
            path.display()
        );
    }
    fs::read(path).with_context(|| format!("failed to read {}", path.display()))
}

/// Writes one line per trace event.
struct StepLog<W> {
    out: W,
}

impl<W: Write> StepLog<W> {
    fn line(&mut self, args: std::fmt::Arguments<'_>) {
        // The log is best effort; a closed stderr must not abort the run.
        let _ = self.out.write_fmt(args);
        let _ = self.out.write_all(b"\n");
    }
}

impl<W: Write> TraceSink for StepLog<W> {
    fn mask(&self) -> TraceMask {
        TraceMask::ALL
    }

    fn run_start(&mut self, program: &Program) {
        self.line(format_args!("run: {} commands", program.len()));
    }

    fn instr(&mut self, _program: &Program, event: InstrEvent) {
        self.line(format_args!(
            "{:>8} {} level={} pos={} cell={}",
            event.ip, event.command, event.level, event.position, event.cell
        ));
    }

    fn scope_enter(&mut self, _program: &Program, ip: usize, level: Level, position: i64) {
        self.line(format_args!("{ip:>8} enter level={level} pos={position}"));
    }

    fn scope_exit(
        &mut self,
        _program: &Program,
        ip: usize,
        level: Level,
        restored: usize,
        position: i64,
        why: ScopeExit,
    ) {
        let why = match why {
            ScopeExit::Close => "close",
            ScopeExit::Cleanup => "cleanup",
        };
        self.line(format_args!(
            "{ip:>8} exit level={level} restored={restored} pos={position} ({why})"
        ));
    }

    fn tape_grow(&mut self, growth: Growth, zero_offset: usize) {
        self.line(format_args!(
            "tape: {} -> {} cells (shift {}, zero offset {zero_offset})",
            growth.old_len, growth.new_len, growth.shift
        ));
    }

    fn run_end(&mut self, _program: &Program, outcome: TraceOutcome<'_>) {
        match outcome {
            TraceOutcome::Ok { steps } => self.line(format_args!("run: ok after {steps} steps")),
            TraceOutcome::Trap(info) => self.line(format_args!("run: {info}")),
        }
    }
}

fn run(opts: &Options) -> Result<()> {
    let file = match &opts.limits {
        Some(path) => load_limits(path)?,
        None => LimitsFile::default(),
    };
    let (limits, verify) = resolve_limits(opts, &file);

    let source = read_source(&opts.program, verify.max_code_len)?;
    let program = verify_program_owned(Program::from_source(&source), &verify)
        .with_context(|| format!("invalid program {}", opts.program.display()))?;

    let input: Box<dyn Read> = match &opts.input {
        Some(path) => Box::new(
            File::open(path).with_context(|| format!("failed to open {}", path.display()))?,
        ),
        None => Box::new(io::stdin().lock()),
    };
    let output: Box<dyn Write> = match &opts.output {
        Some(path) => Box::new(
            File::create(path).with_context(|| format!("failed to create {}", path.display()))?,
        ),
        None => Box::new(io::stdout().lock()),
    };

    let mut vm = Vm::new(
        Reader(BufReader::new(input)),
        Writer(BufWriter::new(output)),
        limits,
    );
    let mut log = opts.trace.then(|| StepLog {
        out: io::stderr().lock(),
    });
    let mask = log.as_ref().map_or(TraceMask::NONE, TraceSink::mask);
    let summary = vm
        .run(&program, mask, log.as_mut().map(|l| l as &mut dyn TraceSink))
        .with_context(|| format!("{} trapped", opts.program.display()))?;
    if opts.trace {
        eprintln!(
            "steps: {}, tape: {} cells",
            summary.steps, summary.tape_len
        );
    }
    Ok(())
}

fn main() -> Result<()> {
    let opts = match Options::try_parse() {
        Ok(opts) => opts,
        // `--help` comes back as an error that is not a failure.
        Err(e) if !e.use_stderr() => {
            e.print()?;
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };
    run(&opts)
}
