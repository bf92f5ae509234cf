use clap::Args;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use bfi::cli_util::{print_runtime_error, print_validation_error};
use bfi::config::{self, Overrides, Settings};
use bfi::{run_with_options, validate, CellWidth, EofPolicy, ReaderInput, WriterOutput};

#[derive(Args, Debug)]
#[command(disable_help_flag = true)]
pub struct RunArgs {
    /// Cell width in bits: 8, 16, 32 or 64 (fallback BF_WIDTH; default 8)
    #[arg(short = 'w', long = "width", value_name = "BITS")]
    pub width: Option<CellWidth>,

    /// What ',' does at end of input: zero, unchanged or error (fallback BF_EOF; default zero)
    #[arg(long = "eof", value_name = "POLICY")]
    pub eof: Option<EofPolicy>,

    /// Maximum tape cells, 0 for unlimited (fallback BF_MAX_CELLS; default unlimited)
    #[arg(long = "max-cells", value_name = "N")]
    pub max_cells: Option<usize>,

    /// Trace every executed operator to stderr
    #[arg(short = 'd', long = "debug")]
    pub debug: bool,

    /// Run CODE instead of reading files
    #[arg(short = 'c', long = "code", value_name = "CODE", allow_hyphen_values = true)]
    pub code: Option<String>,

    /// Source files, run in order
    #[arg(value_name = "FILE")]
    pub files: Vec<PathBuf>,

    /// Show this help
    #[arg(short = 'h', long = "help", action = clap::ArgAction::SetTrue)]
    pub help: bool,
}

pub fn run(program: &str, args: RunArgs) -> i32 {
    if args.help {
        usage_and_exit(program, 0);
    }

    let RunArgs {
        width,
        eof,
        max_cells,
        debug,
        code,
        files,
        ..
    } = args;

    if code.is_none() && files.is_empty() {
        usage_and_exit(program, 2);
    }

    if code.is_some() && !files.is_empty() {
        eprintln!("{program}: cannot use --code together with FILE arguments");
        usage_and_exit(program, 2);
    }

    let mut warnings = Vec::new();
    let settings = config::resolve(Overrides { width, eof, max_cells }, &mut warnings);
    for w in &warnings {
        eprintln!("{program}: warning: {w}");
    }

    let sources: Vec<(Option<String>, io::Result<String>)> = match code {
        Some(c) => vec![(None, Ok(c))],
        None => files
            .iter()
            .map(|p| (Some(p.display().to_string()), fs::read_to_string(p)))
            .collect(),
    };
    let multi = sources.len() > 1;

    let mut failed = false;
    for (name, text) in sources {
        let who = match &name {
            Some(n) => format!("{program}: {n}"),
            None => program.to_string(),
        };

        if multi {
            println!("-- {} --", name.as_deref().unwrap_or_default());
        }

        let code_str = match text {
            Ok(s) => s,
            Err(e) => {
                eprintln!("{who}: failed to read code file as UTF-8: {e}");
                let _ = io::stderr().flush();
                failed = true;
                continue;
            }
        };

        let (ok, last) = run_source(&who, &code_str, &settings, debug);
        failed |= !ok;

        // Keep each file's output visually separate from the next header.
        if multi && last.is_some_and(|b| b != b'\n') {
            println!("⏎");
        }
    }

    let _ = io::stdout().flush();
    if failed { 1 } else { 0 }
}

/// Validate and execute one source. Returns whether it succeeded and the last
/// byte written to stdout.
fn run_source(who: &str, code: &str, settings: &Settings, debug: bool) -> (bool, Option<u8>) {
    let jumps = match validate(code) {
        Ok(j) => j,
        Err(err) => {
            print_validation_error(Some(who), code, &err);
            return (false, None);
        }
    };

    let mut input = ReaderInput::new(io::stdin());
    let mut output = WriterOutput::new(io::stdout(), settings.width);
    let mut stderr = io::stderr();
    let tracer: Option<&mut dyn Write> = if debug { Some(&mut stderr) } else { None };

    let result = run_with_options(
        code,
        &jumps,
        settings.width,
        &mut input,
        &mut output,
        settings.run_options(),
        tracer,
    );
    let last = output.last_byte();

    match result {
        Ok(_) => (true, last),
        Err(err) => {
            let _ = io::stdout().flush();
            print_runtime_error(Some(who), code, &err);
            (false, last)
        }
    }
}

fn usage_and_exit(program: &str, code: i32) -> ! {
    eprintln!(
        r#"Usage:
  {0} run [OPTIONS] <FILE>...
  {0} run [OPTIONS] --code "<code>"

Options:
  --width, -w <BITS>  Cell width: 8, 16, 32 or 64 (default 8)
  --eof <POLICY>      End of input for ',': zero, unchanged or error (default zero)
  --max-cells <N>     Refuse to grow the tape past N cells (0 = unlimited)
  --code,  -c <CODE>  Run CODE instead of reading files
  --debug, -d         Trace each executed operator to stderr
  --help,  -h         Show this help

Notes:
- Characters outside of Brainfuck's ><+-.,[] are comments.
- Settings fall back to BF_WIDTH, BF_EOF, BF_MAX_CELLS, then the [interpreter]
  section of {1} in your config directory.
- With several files, each output is preceded by "-- FILE --".

Examples:
- Run a program with 16-bit cells:
    {0} run -w 16 ./program.bf
- Echo a file back through an inline cat program (`,` reads its bytes):
    {0} run -c ",[.,]" < notes.txt
"#,
        program,
        config::CONFIG_FILE_NAME
    );
    let _ = io::stderr().flush();
    std::process::exit(code);
}
