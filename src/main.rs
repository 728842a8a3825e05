//! UltraMem CLI
//!
//! Measures memory bandwidth with a `reads:writes` kernel (or the named
//! STREAM kernels) over three arrays sized to escape the last-level cache.
//!
//! # Output
//!
//! The report is written to stdout, as banners and a table or, with
//! `--format json`, as one JSON document. Diagnostics and logs go to stderr
//! (`RUST_LOG=info` for sizing and topology decisions).
//!
//! # Exit Codes
//!
//! - `0`: benchmark completed, or `--help`/`--version`
//! - `1`: invalid arguments, allocation failure, or any other error

use std::io;
use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use ultramem::{run, Cli, RunConfig};

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => return parse_failure(err),
    };

    let cfg = match RunConfig::from_cli(&cli) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match run::run(&cfg, &mut out) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn parse_failure(err: clap::Error) -> ExitCode {
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
            let _ = err.print();
            ExitCode::SUCCESS
        }
        ErrorKind::MissingRequiredArgument
        | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
            let _ = Cli::command().print_help();
            println!();
            ExitCode::FAILURE
        }
        _ => {
            let _ = err.print();
            ExitCode::FAILURE
        }
    }
}
