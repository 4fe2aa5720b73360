//! Trolley CLI

use std::process::ExitCode;

use clap::Parser;
use trolley::observability::init_subscriber;

use crate::cli::Cli;

mod cli;

/// Trolley CLI entry point
pub fn main() -> ExitCode {
    let _env = dotenvy::dotenv();

    let cli = Cli::parse();

    if let Err(err) = init_subscriber(&cli.logging) {
        #[expect(
            clippy::print_stderr,
            reason = "logging not initialized, must use eprintln for subscriber errors"
        )]
        {
            eprintln!("{err}");
        }

        return ExitCode::FAILURE;
    }

    match cli.run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            #[expect(clippy::print_stderr, reason = "command errors are shown to the user")]
            {
                eprintln!("error: {err:#}");
            }

            ExitCode::FAILURE
        }
    }
}
