use bfi::{run_with_options, validate, CellWidth, EofPolicy, ReaderInput, RunOptions, WriterOutput};
use std::io;

fn main() {
    // Classic Brainfuck "Hello World!" program
    let code = "++++++++++[>+++++++>++++++++++>+++>+<<<<-]>++.>+.+++++++..+++.>++.<<+++++++++++++++.>.+++.------.--------.>+.>.";

    let jumps = match validate(code) {
        Ok(j) => j,
        Err(err) => {
            eprintln!("Brainfuck validation error: {err}");
            std::process::exit(1);
        }
    };

    let mut input = ReaderInput::new(io::stdin());
    let mut output = WriterOutput::new(io::stdout(), CellWidth::W8);
    let options = RunOptions { eof: EofPolicy::Zero, max_cells: Some(30_000) };

    // Tip: pass `Some(&mut io::stderr())` instead of `None` to trace each step.
    if let Err(err) = run_with_options(code, &jumps, CellWidth::W8, &mut input, &mut output, options, None) {
        eprintln!("Brainfuck interpreter error: {err}");
        std::process::exit(1);
    }
}
