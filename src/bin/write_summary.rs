//! Writes the static cross-country markdown summary.
//!
//! Every configured source file must exist; a missing one is reported and
//! the process exits with status 1 without touching the output.

use std::process::ExitCode;

use solar_compare::config::CompareConfig;
use solar_compare::logging::{self, Component};
use solar_compare::report;

fn main() -> ExitCode {
    let config = match CompareConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };
    config.init_logging();

    match report::run_batch(&config) {
        Ok(written) => {
            for path in written {
                println!("Wrote {}", path.display());
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            logging::error(Component::Report, None, &e.to_string());
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
