use clap::Args;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use bfi::cli_util::print_validation_error;
use bfi::validate;

#[derive(Args, Debug)]
#[command(disable_help_flag = true)]
pub struct CheckArgs {
    /// Source files to validate
    #[arg(value_name = "FILE")]
    pub files: Vec<PathBuf>,

    /// Show this help
    #[arg(short = 'h', long = "help", action = clap::ArgAction::SetTrue)]
    pub help: bool,
}

pub fn run(program: &str, args: CheckArgs) -> i32 {
    if args.help {
        usage_and_exit(program, 0);
    }
    if args.files.is_empty() {
        usage_and_exit(program, 2);
    }

    let mut failed = false;
    for path in &args.files {
        let name = path.display().to_string();
        let code = match fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("{program}: {name}: failed to read code file as UTF-8: {e}");
                failed = true;
                continue;
            }
        };

        match validate(&code) {
            Ok(jumps) => println!("{name}: ok ({} loops)", jumps.pairs().count()),
            Err(err) => {
                print_validation_error(Some(&format!("{program}: {name}")), &code, &err);
                failed = true;
            }
        }
    }

    let _ = io::stdout().flush();
    if failed { 1 } else { 0 }
}

fn usage_and_exit(program: &str, code: i32) -> ! {
    eprintln!(
        r#"Usage:
  {0} check <FILE>...

Options:
  --help, -h   Show this help

Description:
  Checks that every '[' has a matching ']' without running anything.
"#,
        program
    );
    let _ = io::stderr().flush();
    std::process::exit(code);
}
