mod commands;

use clap::{Parser, Subcommand};
use std::env;
use std::io::{self, Write};
use std::path::Path;
use commands::check::CheckArgs;
use commands::run::RunArgs;

fn print_top_usage_and_exit(program: &str, code: i32) -> ! {
    eprintln!(
        r#"Usage:
  {0} run   [OPTIONS] <FILE>...        # Run Brainfuck files in order
  {0} run   [OPTIONS] --code "<code>"  # Run Brainfuck code given inline
  {0} check <FILE>...                  # Validate brackets without running

Run "{0} <subcommand> --help" for more info.
"#,
        program
    );
    let _ = io::stderr().flush();
    std::process::exit(code);
}

#[derive(Parser, Debug)]
#[command(name = "bf", disable_help_flag = true, disable_help_subcommand = true)]
struct Cli {
    /// Show this help
    #[arg(short = 'h', long = "help", action = clap::ArgAction::SetTrue)]
    help: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    Run(RunArgs),
    Check(CheckArgs),
}

fn main() {
    let program = env::args()
        .next()
        .as_deref()
        .and_then(|p| Path::new(p).file_stem())
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| "bf".to_string());

    let cli = Cli::parse();

    // Ctrl+C: make whatever the program printed visible, then leave with 130.
    if let Err(e) = ctrlc::set_handler(|| {
        let _ = io::stdout().flush();
        let _ = io::stderr().flush();
        std::process::exit(130);
    }) {
        eprintln!("{program}: failed to set ctrl+c handler: {e}");
        let _ = io::stderr().flush();
    }

    let code = match cli.command {
        Some(Command::Run(args)) => commands::run::run(&program, args),
        Some(Command::Check(args)) => commands::check::run(&program, args),
        None => print_top_usage_and_exit(&program, if cli.help { 0 } else { 2 }),
    };

    std::process::exit(code);
}
