//! relink - migrate legacy link fields to the unified link field.

use clap::Parser;
use std::process::ExitCode;

use relink_cli::{run, telemetry, Cli};

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let _log_guard = telemetry::init_tracing();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
