//! A Brainfuck interpreter library.
//!
//! Programs are checked by a static [`validate`] pass before anything runs,
//! then executed by an [`Engine`] over a [`Tape`] of 8, 16, 32 or 64-bit cells.
//!
//! Features and behaviors:
//! - Memory tape initialized to 0 and unbounded to the right; it grows on
//!   first write and never shrinks.
//! - Moving left of cell 0 is a runtime error (`PointerUnderflow`).
//! - `+` and `-` wrap modulo 2^width.
//! - Input `,` on end of input stores 0 by default ([`EofPolicy::Zero`]);
//!   `Unchanged` and `Error` are available through [`RunOptions`].
//! - Loops are resolved through a precomputed jump table; unmatched brackets
//!   are reported before execution with their position.
//! - Characters outside `><+-.,[]` are comments.
//!
//! Quick start:
//!
//! ```
//! use bfi::{validate, run, BufferInput, BufferOutput, CellWidth};
//!
//! let code = "++++++++++[>+++++++>++++++++++>+++>+<<<<-]>++.>+.+++++++..+++.>++.<<+++++++++++++++.>.+++.------.--------.>+.>.";
//! let jumps = validate(code).expect("balanced brackets");
//! let mut input = BufferInput::default();
//! let mut output = BufferOutput::new();
//! run(code, &jumps, CellWidth::W8, &mut input, &mut output).expect("program should run");
//! assert_eq!(output.text(), "Hello World!\n");
//! ```

pub mod channel;
pub mod cli_util;
pub mod config;
pub mod engine;
pub mod tape;
pub mod validator;

pub use channel::{BufferInput, BufferOutput, InputSource, OutputSink, ReaderInput, WriterOutput};
pub use engine::{
    run, run_with_options, Engine, EofPolicy, RunOptions, RunSummary, RuntimeError, RuntimeErrorKind,
};
pub use tape::{Cell, CellWidth, Tape, TapeError};
pub use validator::{validate, JumpTable, Program, ValidationError};
