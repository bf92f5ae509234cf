use std::io::{self, IsTerminal, Write};
use nu_ansi_term::Color;
use crate::{RuntimeError, RuntimeErrorKind, ValidationError};

/// Label like `Parse error:`; red when stderr is a terminal.
fn label(text: &str) -> String {
    if io::stderr().is_terminal() {
        Color::Red.bold().paint(text).to_string()
    } else {
        text.to_string()
    }
}

fn prefix_program(program: Option<&str>, msg: &str) -> String {
    match program {
        Some(p) => format!("{p}: {msg}"),
        None => msg.to_string(),
    }
}

/// Pretty-print a validation failure with caret positioning.
/// If `program` is `Some("bf")`, messages are prefixed with "bf: ...".
pub fn print_validation_error(program: Option<&str>, code: &str, err: &ValidationError) {
    let what = match err {
        ValidationError::UnmatchedOpenBracket { .. } => "unmatched bracket '['",
        ValidationError::UnmatchedCloseBracket { .. } => "unmatched bracket ']'",
    };
    let msg = prefix_program(program, &format!("{} {what}", label("Parse error:")));
    print_error_with_context(&msg, code, err.position());
}

/// Pretty-print a runtime failure with caret positioning.
pub fn print_runtime_error(program: Option<&str>, code: &str, err: &RuntimeError) {
    let detail = match &err.kind {
        RuntimeErrorKind::PointerUnderflow => "pointer moved left of cell 0".to_string(),
        RuntimeErrorKind::OutOfMemory { requested } => {
            format!("tape cannot grow to {requested} cells")
        }
        RuntimeErrorKind::InputExhausted => "input exhausted".to_string(),
        RuntimeErrorKind::Io(source) => format!("I/O error: {source}"),
        RuntimeErrorKind::JumpTableMismatch => "jump table does not match source".to_string(),
    };
    let msg = prefix_program(
        program,
        &format!("{} {detail} (ptr={})", label("Runtime error:"), err.tape_pointer),
    );
    print_error_with_context(&msg, code, err.instruction_pointer);
}

/// Print a concise error with instruction index and a caret context window,
/// working with UTF-8 by slicing using char indices.
pub fn print_error_with_context(prefix: &str, code: &str, pos: usize) {
    let mut stderr = io::stderr().lock();
    let _ = write_error_with_context(&mut stderr, prefix, code, pos);
    let _ = stderr.flush();
}

/// Same as [`print_error_with_context`] but into any writer.
pub fn write_error_with_context<W: Write>(out: &mut W, prefix: &str, code: &str, pos: usize) -> io::Result<()> {
    writeln!(out, "{prefix} at instruction {pos}")?;

    // Show a short window around the position for context
    const WINDOW_CHARS: usize = 32;

    let total_chars = code.chars().count();
    let start_char = pos.saturating_sub(WINDOW_CHARS);
    let end_char = (pos + WINDOW_CHARS + 1).min(total_chars);

    let start_byte = char_to_byte_index(code, start_char);
    let end_byte = char_to_byte_index(code, end_char);
    // Newlines would break the caret alignment.
    let slice: String = code[start_byte..end_byte]
        .chars()
        .map(|c| if c.is_whitespace() { ' ' } else { c })
        .collect();

    writeln!(out, "  {}", slice)?;

    // Caret under the exact position
    let caret_offset_chars = pos.saturating_sub(start_char);
    writeln!(out, "  {}^", " ".repeat(caret_offset_chars))
}

/// Convert a char index into a byte index in the given UTF-8 string.
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices().nth(char_idx).map_or(s.len(), |(i, _)| i)
}
