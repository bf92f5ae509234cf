//! The fetch-decode-execute loop.
//!
//! An [`Engine`] owns a [`Tape`] and an instruction pointer, borrows a
//! validated [`Program`] and the caller's I/O channels, and runs until the
//! instruction pointer walks off the end of the program or an operator fails.
//! There is no step limit: a program that loops forever runs forever.

use std::fmt;
use std::io::{self, Write};
use std::str::FromStr;

use crate::channel::{InputSource, OutputSink};
use crate::tape::{Cell, CellWidth, Tape, TapeError};
use crate::validator::{JumpTable, Program};

/// What `,` does when the input source is exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EofPolicy {
    /// Store 0 in the current cell. The default.
    #[default]
    Zero,
    /// Leave the current cell as it was.
    Unchanged,
    /// Halt with [`RuntimeErrorKind::InputExhausted`].
    Error,
}

impl fmt::Display for EofPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EofPolicy::Zero => "zero",
            EofPolicy::Unchanged => "unchanged",
            EofPolicy::Error => "error",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid EOF policy '{0}' (expected zero, unchanged or error)")]
pub struct ParseEofPolicyError(pub String);

impl FromStr for EofPolicy {
    type Err = ParseEofPolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "zero" | "0" => Ok(EofPolicy::Zero),
            "unchanged" | "keep" => Ok(EofPolicy::Unchanged),
            "error" => Ok(EofPolicy::Error),
            _ => Err(ParseEofPolicyError(s.to_string())),
        }
    }
}

/// Per-run knobs that are not part of the program itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunOptions {
    pub eof: EofPolicy,
    /// Upper bound on materialized tape cells; `None` means limited only by memory.
    ///
    /// Only a non-zero write past the current extent materializes cells, so
    /// moving the pointer or reading a cell beyond the bound never fails with
    /// [`RuntimeErrorKind::OutOfMemory`]; the first `+`, `-` or non-zero `,`
    /// there does.
    pub max_cells: Option<usize>,
}

/// Why a run stopped early.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeErrorKind {
    #[error("pointer moved left of cell 0")]
    PointerUnderflow,

    #[error("tape cannot grow to {requested} cells")]
    OutOfMemory { requested: usize },

    #[error("input exhausted")]
    InputExhausted,

    #[error("I/O error: {0}")]
    Io(#[source] io::Error),

    #[error("jump table was not built from this source")]
    JumpTableMismatch,
}

impl From<TapeError> for RuntimeErrorKind {
    fn from(err: TapeError) -> Self {
        match err {
            TapeError::Underflow => RuntimeErrorKind::PointerUnderflow,
            TapeError::OutOfMemory { requested } => RuntimeErrorKind::OutOfMemory { requested },
        }
    }
}

/// A failed run, with where it failed.
#[derive(Debug, thiserror::Error)]
#[error("{kind} at instruction {instruction_pointer} (ptr={tape_pointer})")]
pub struct RuntimeError {
    #[source]
    pub kind: RuntimeErrorKind,
    pub instruction_pointer: usize,
    pub tape_pointer: usize,
}

/// Facts about a run that halted normally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Operators executed. Comment characters are not counted.
    pub steps: u64,
    /// Final tape pointer.
    pub pointer: usize,
    /// Materialized tape cells at halt.
    pub extent: usize,
}

#[inline]
fn is_operator(c: char) -> bool {
    matches!(c, '>' | '<' | '+' | '-' | '.' | ',' | '[' | ']')
}

/// Interpreter state for one run over cells of type `C`.
pub struct Engine<'a, C: Cell> {
    program: &'a Program,
    tape: Tape<C>,
    ip: usize,
    steps: u64,
    eof: EofPolicy,
    input: &'a mut dyn InputSource,
    output: &'a mut dyn OutputSink,
    tracer: Option<&'a mut dyn Write>,
}

impl<'a, C: Cell> Engine<'a, C> {
    /// A fresh engine: empty tape, pointer and instruction pointer at 0.
    pub fn new(
        program: &'a Program,
        input: &'a mut dyn InputSource,
        output: &'a mut dyn OutputSink,
    ) -> Self {
        Self {
            program,
            tape: Tape::new(),
            ip: 0,
            steps: 0,
            eof: EofPolicy::default(),
            input,
            output,
            tracer: None,
        }
    }

    /// Apply `options`. Call before the first step; the tape is reset.
    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.eof = options.eof;
        self.tape = Tape::with_limit(options.max_cells);
        self
    }

    /// Write one table row per executed operator to `tracer`.
    pub fn with_tracer(mut self, tracer: &'a mut dyn Write) -> Self {
        self.tracer = Some(tracer);
        self
    }

    pub fn tape(&self) -> &Tape<C> {
        &self.tape
    }

    pub fn into_tape(self) -> Tape<C> {
        self.tape
    }

    pub fn instruction_pointer(&self) -> usize {
        self.ip
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn is_halted(&self) -> bool {
        self.program.code()[self.ip.min(self.program.len())..]
            .iter()
            .all(|&c| !is_operator(c))
    }

    fn error(&self, kind: RuntimeErrorKind) -> RuntimeError {
        RuntimeError {
            kind,
            instruction_pointer: self.ip,
            tape_pointer: self.tape.pointer(),
        }
    }

    /// Run to completion.
    ///
    /// Output already emitted before a runtime error stays emitted. The output
    /// sink is flushed on both normal and error halts.
    pub fn run(&mut self) -> Result<RunSummary, RuntimeError> {
        if let Some(out) = self.tracer.as_deref_mut() {
            let header = writeln!(out, "STEP | IP  | PTR | CELL | INSTR | ACTION").and_then(|_| {
                writeln!(out, "-----+-----+-----+------+-------+------------------------------------------------")
            });
            if let Err(e) = header {
                return Err(self.error(RuntimeErrorKind::Io(e)));
            }
        }

        let result = loop {
            match self.step() {
                Ok(true) => {}
                Ok(false) => break Ok(()),
                Err(e) => break Err(e),
            }
        };

        let flushed = self.output.flush();
        result?;
        if let Err(e) = flushed {
            return Err(self.error(RuntimeErrorKind::Io(e)));
        }

        Ok(RunSummary {
            steps: self.steps,
            pointer: self.tape.pointer(),
            extent: self.tape.extent(),
        })
    }

    /// Execute the next operator. Returns `Ok(false)` once the program has ended.
    pub fn step(&mut self) -> Result<bool, RuntimeError> {
        let program = self.program;
        let code = program.code();

        while self.ip < code.len() && !is_operator(code[self.ip]) {
            self.ip += 1;
        }
        if self.ip >= code.len() {
            return Ok(false);
        }

        let instr = code[self.ip];
        let tracing = self.tracer.is_some();
        let (ptr_before, cell_before) = (self.tape.pointer(), self.tape.current());
        let mut action: Option<String> = None;
        let mut next = self.ip + 1;

        match instr {
            '>' => {
                let moved = self.tape.move_right();
                moved.map_err(|e| self.error(e.into()))?;
                if tracing {
                    action = Some(format!("Moved pointer head to index {}", self.tape.pointer()));
                }
            }
            '<' => {
                let moved = self.tape.move_left();
                moved.map_err(|e| self.error(e.into()))?;
                if tracing {
                    action = Some(format!("Moved pointer head to index {}", self.tape.pointer()));
                }
            }
            '+' => {
                let written = self.tape.increment();
                written.map_err(|e| self.error(e.into()))?;
                if tracing {
                    action = Some(format!(
                        "Increment cell[{}] from {} to {}",
                        ptr_before,
                        cell_before,
                        self.tape.current()
                    ));
                }
            }
            '-' => {
                let written = self.tape.decrement();
                written.map_err(|e| self.error(e.into()))?;
                if tracing {
                    action = Some(format!(
                        "Decrement cell[{}] from {} to {}",
                        ptr_before,
                        cell_before,
                        self.tape.current()
                    ));
                }
            }
            '.' => {
                let emitted = self.output.write_value(cell_before.widen());
                emitted.map_err(|e| self.error(RuntimeErrorKind::Io(e)))?;
                if tracing {
                    action = Some(format!("Output value {}", cell_before));
                }
            }
            ',' => {
                // Anything the program printed as a prompt must be visible before we block.
                let flushed = self.output.flush();
                flushed.map_err(|e| self.error(RuntimeErrorKind::Io(e)))?;
                let read = self.input.read_value();
                let value = read.map_err(|e| self.error(RuntimeErrorKind::Io(e)))?;
                let stored = match (value, self.eof) {
                    (Some(v), _) => Some(C::truncate(v)),
                    (None, EofPolicy::Zero) => Some(C::ZERO),
                    (None, EofPolicy::Unchanged) => None,
                    (None, EofPolicy::Error) => {
                        return Err(self.error(RuntimeErrorKind::InputExhausted));
                    }
                };
                if let Some(v) = stored {
                    let written = self.tape.set_current(v);
                    written.map_err(|e| self.error(e.into()))?;
                }
                if tracing {
                    action = Some(match value {
                        Some(_) => format!("Read input -> {}", self.tape.current()),
                        None => format!("End of input ({}) -> {}", self.eof, self.tape.current()),
                    });
                }
            }
            '[' => {
                if cell_before.is_zero() {
                    let close = program.jumps().target(self.ip);
                    next = close + 1;
                    if tracing {
                        action = Some(format!("Cell is 0; jump forward past matching ']' at IP {}", close));
                    }
                } else if tracing {
                    action = Some("Enter loop (cell != 0)".to_string());
                }
            }
            ']' => {
                if !cell_before.is_zero() {
                    let open = program.jumps().target(self.ip);
                    next = open + 1;
                    if tracing {
                        action = Some(format!("Cell != 0; jump back past matching '[' at IP {}", open));
                    }
                } else if tracing {
                    action = Some("Exit loop (cell is 0)".to_string());
                }
            }
            _ => unreachable!("comment characters are skipped above"),
        }

        if let Some(out) = self.tracer.as_deref_mut() {
            let row = writeln!(
                out,
                "{:<4} | {:<3} | {:<3} | {:<4} |  {}    | {}",
                self.steps,
                self.ip,
                ptr_before,
                cell_before,
                instr,
                action.unwrap_or_default()
            );
            if let Err(e) = row {
                return Err(self.error(RuntimeErrorKind::Io(e)));
            }
        }

        self.steps += 1;
        self.ip = next;
        Ok(true)
    }
}

/// Run `source` with the default [`RunOptions`].
pub fn run(
    source: &str,
    jumps: &JumpTable,
    width: CellWidth,
    input: &mut dyn InputSource,
    output: &mut dyn OutputSink,
) -> Result<RunSummary, RuntimeError> {
    run_with_options(source, jumps, width, input, output, RunOptions::default(), None)
}

/// Run `source` on a fresh tape of the given width.
///
/// `jumps` must come from [`validate`](crate::validate) on the same source.
/// The width is resolved here, once, by picking the matching `Engine<C>`.
pub fn run_with_options(
    source: &str,
    jumps: &JumpTable,
    width: CellWidth,
    input: &mut dyn InputSource,
    output: &mut dyn OutputSink,
    options: RunOptions,
    tracer: Option<&mut dyn Write>,
) -> Result<RunSummary, RuntimeError> {
    let Some(program) = Program::from_parts(source, jumps.clone()) else {
        return Err(RuntimeError {
            kind: RuntimeErrorKind::JumpTableMismatch,
            instruction_pointer: 0,
            tape_pointer: 0,
        });
    };

    match width {
        CellWidth::W8 => execute::<u8>(&program, input, output, options, tracer),
        CellWidth::W16 => execute::<u16>(&program, input, output, options, tracer),
        CellWidth::W32 => execute::<u32>(&program, input, output, options, tracer),
        CellWidth::W64 => execute::<u64>(&program, input, output, options, tracer),
    }
}

fn execute<C: Cell>(
    program: &Program,
    input: &mut dyn InputSource,
    output: &mut dyn OutputSink,
    options: RunOptions,
    tracer: Option<&mut dyn Write>,
) -> Result<RunSummary, RuntimeError> {
    let mut engine = Engine::<C>::new(program, input, output).with_options(options);
    if let Some(t) = tracer {
        engine = engine.with_tracer(t);
    }
    engine.run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{BufferInput, BufferOutput};

    fn run_u8(code: &str, input: &[u8], options: RunOptions) -> (Result<RunSummary, RuntimeError>, Vec<u8>, Tape<u8>) {
        let program = Program::parse(code).expect("valid program");
        let mut inp = BufferInput::from_bytes(input);
        let mut out = BufferOutput::new();
        let mut engine = Engine::<u8>::new(&program, &mut inp, &mut out).with_options(options);
        let result = engine.run();
        let tape = engine.into_tape();
        (result, out.bytes(), tape)
    }

    #[test]
    fn hello_world_prints_expected_text() {
        let code = "++++++++++[>+++++++>++++++++++>+++>+<<<<-]>++.>+.+++++++..+++.>++.<<+++++++++++++++.>.+++.------.--------.>+.>.";
        let (result, out, _) = run_u8(code, &[], RunOptions::default());
        assert!(result.is_ok());
        assert_eq!(out, b"Hello World!\n");
    }

    #[test]
    fn empty_loop_on_zero_cell_is_skipped() {
        let (result, _, tape) = run_u8("[]+", &[], RunOptions::default());
        assert_eq!(result.unwrap().steps, 2);
        assert_eq!(tape.get(0), 1);
    }

    #[test]
    fn loop_clears_cell() {
        let (result, _, tape) = run_u8("+++[-]>+", &[], RunOptions::default());
        let summary = result.unwrap();
        assert_eq!(tape.get(0), 0);
        assert_eq!(tape.get(1), 1);
        assert_eq!(summary.pointer, 1);
    }

    #[test]
    fn comments_are_not_executed_or_counted() {
        let (result, out, _) = run_u8("add three: +++ then print: .", &[], RunOptions::default());
        assert_eq!(result.unwrap().steps, 4);
        assert_eq!(out, vec![3]);
    }

    #[test]
    fn left_of_zero_is_pointer_underflow() {
        let (result, out, _) = run_u8("+.<", &[], RunOptions::default());
        let err = result.unwrap_err();
        assert!(matches!(err.kind, RuntimeErrorKind::PointerUnderflow));
        assert_eq!(err.instruction_pointer, 2);
        assert_eq!(err.tape_pointer, 0);
        // Output emitted before the failure is kept.
        assert_eq!(out, vec![1]);
    }

    #[test]
    fn eof_policy_zero_clears_cell() {
        let (result, _, tape) = run_u8("+++,", &[], RunOptions::default());
        assert!(result.is_ok());
        assert_eq!(tape.get(0), 0);
    }

    #[test]
    fn eof_policy_unchanged_keeps_cell() {
        let options = RunOptions { eof: EofPolicy::Unchanged, ..RunOptions::default() };
        let (result, _, tape) = run_u8("+++,", &[], options);
        assert!(result.is_ok());
        assert_eq!(tape.get(0), 3);
    }

    #[test]
    fn eof_policy_error_halts() {
        let options = RunOptions { eof: EofPolicy::Error, ..RunOptions::default() };
        let (result, _, _) = run_u8(">,", &[], options);
        let err = result.unwrap_err();
        assert!(matches!(err.kind, RuntimeErrorKind::InputExhausted));
        assert_eq!(err.instruction_pointer, 1);
        assert_eq!(err.tape_pointer, 1);
    }

    #[test]
    fn cat_copies_input_until_eof() {
        let (result, out, _) = run_u8(",[.,]", b"abc", RunOptions::default());
        assert!(result.is_ok());
        assert_eq!(out, b"abc");
    }

    #[test]
    fn input_is_reduced_to_cell_width() {
        let program = Program::parse(",.").unwrap();
        let mut inp = BufferInput::new([0x1_0041]);
        let mut out = BufferOutput::new();
        let mut engine = Engine::<u16>::new(&program, &mut inp, &mut out);
        engine.run().unwrap();
        drop(engine);
        assert_eq!(out.values(), &[0x41]);
    }

    #[test]
    fn max_cells_turns_growth_into_out_of_memory() {
        let options = RunOptions { max_cells: Some(2), ..RunOptions::default() };
        let (result, _, _) = run_u8(">>+", &[], options);
        let err = result.unwrap_err();
        assert!(matches!(err.kind, RuntimeErrorKind::OutOfMemory { requested: 3 }));
        assert_eq!(err.instruction_pointer, 2);
        assert_eq!(err.tape_pointer, 2);
    }

    #[test]
    fn max_cells_does_not_limit_pointer_moves_or_reads() {
        let options = RunOptions { max_cells: Some(2), ..RunOptions::default() };
        let (result, out, tape) = run_u8(">>>>>.[-]<<", &[], options);
        let summary = result.unwrap();
        assert_eq!(out, vec![0]);
        assert_eq!(summary.pointer, 3);
        assert_eq!(summary.extent, 0);
        assert_eq!(tape.extent(), 0);
    }

    #[test]
    fn max_cells_applies_to_input_past_the_bound() {
        let options = RunOptions { max_cells: Some(2), ..RunOptions::default() };
        let (result, _, _) = run_u8(">>,", &[0], options);
        assert_eq!(result.unwrap().extent, 0);
        let (result, _, _) = run_u8(">>,", b"x", options);
        let err = result.unwrap_err();
        assert!(matches!(err.kind, RuntimeErrorKind::OutOfMemory { requested: 3 }));
    }

    /// Records the order of writes and flushes.
    #[derive(Default)]
    struct FlushLog {
        events: Vec<&'static str>,
    }

    impl OutputSink for FlushLog {
        fn write_value(&mut self, _value: u64) -> io::Result<()> {
            self.events.push("write");
            Ok(())
        }

        fn flush(&mut self) -> io::Result<()> {
            self.events.push("flush");
            Ok(())
        }
    }

    fn run_logged(code: &str, input: &[u8]) -> (Result<RunSummary, RuntimeError>, Vec<&'static str>) {
        let program = Program::parse(code).unwrap();
        let mut inp = BufferInput::from_bytes(input);
        let mut out = FlushLog::default();
        let result = Engine::<u8>::new(&program, &mut inp, &mut out).run();
        (result, out.events)
    }

    #[test]
    fn output_is_flushed_before_each_read() {
        let (result, events) = run_logged("+.,.,", b"a");
        assert!(result.is_ok());
        assert_eq!(events, ["write", "flush", "write", "flush", "flush"]);
    }

    #[test]
    fn output_is_flushed_on_normal_halt() {
        let (result, events) = run_logged("+.+.", &[]);
        assert!(result.is_ok());
        assert_eq!(events, ["write", "write", "flush"]);
    }

    #[test]
    fn output_is_flushed_after_runtime_error() {
        let (result, events) = run_logged("+.<.", &[]);
        assert!(matches!(result.unwrap_err().kind, RuntimeErrorKind::PointerUnderflow));
        assert_eq!(events, ["write", "flush"]);
    }

    #[test]
    fn tracer_writes_a_row_per_operator() {
        let program = Program::parse(">+ x").unwrap();
        let mut inp = BufferInput::default();
        let mut out = BufferOutput::new();
        let mut trace: Vec<u8> = Vec::new();
        Engine::<u8>::new(&program, &mut inp, &mut out)
            .with_tracer(&mut trace)
            .run()
            .unwrap();
        let trace = String::from_utf8(trace).unwrap();
        assert!(trace.starts_with("STEP | IP"));
        assert!(trace.contains("Moved pointer head to index 1"));
        assert!(trace.contains("Increment cell[1] from 0 to 1"));
        assert_eq!(trace.lines().count(), 4);
    }

    #[test]
    fn step_reports_end_of_program() {
        let program = Program::parse("+ ").unwrap();
        let mut inp = BufferInput::default();
        let mut out = BufferOutput::new();
        let mut engine = Engine::<u32>::new(&program, &mut inp, &mut out);
        assert!(!engine.is_halted());
        assert!(engine.step().unwrap());
        assert!(engine.is_halted());
        assert!(!engine.step().unwrap());
        assert_eq!(engine.tape().get(0), 1);
    }

    #[test]
    fn free_run_dispatches_on_width() {
        let source = "-.";
        let jumps = crate::validate(source).unwrap();
        for width in CellWidth::ALL {
            let mut inp = BufferInput::default();
            let mut out = BufferOutput::new();
            run(source, &jumps, width, &mut inp, &mut out).unwrap();
            assert_eq!(out.values(), &[width.max_value()]);
        }
    }

    #[test]
    fn foreign_jump_table_is_rejected_before_running() {
        let jumps = crate::validate("[]").unwrap();
        let mut inp = BufferInput::default();
        let mut out = BufferOutput::new();
        let err = run("+.+", &jumps, CellWidth::W8, &mut inp, &mut out).unwrap_err();
        assert!(matches!(err.kind, RuntimeErrorKind::JumpTableMismatch));
        assert!(out.values().is_empty());
    }

    #[test]
    fn same_length_table_from_other_source_is_rejected() {
        // Same length as "[-]+.", but its brackets sit one slot to the right.
        let jumps = crate::validate("+[-].").unwrap();
        let mut inp = BufferInput::default();
        let mut out = BufferOutput::new();
        let err = run("[-]+.", &jumps, CellWidth::W8, &mut inp, &mut out).unwrap_err();
        assert!(matches!(err.kind, RuntimeErrorKind::JumpTableMismatch));
        assert_eq!(err.instruction_pointer, 0);
        assert_eq!(err.tape_pointer, 0);
        assert!(out.values().is_empty());
    }

    #[test]
    fn eof_policy_parsing() {
        assert_eq!("zero".parse::<EofPolicy>(), Ok(EofPolicy::Zero));
        assert_eq!("Unchanged".parse::<EofPolicy>(), Ok(EofPolicy::Unchanged));
        assert_eq!("error".parse::<EofPolicy>(), Ok(EofPolicy::Error));
        assert!("-1".parse::<EofPolicy>().is_err());
    }
}
