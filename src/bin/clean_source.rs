//! Cleans one raw source export.
//!
//! Usage: `clean_source <label> <input.csv> <output.csv> [report.txt]`

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use solar_compare::cleaning;
use solar_compare::config::CompareConfig;

const USAGE: &str = "usage: clean_source <label> <input.csv> <output.csv> [report.txt]";

fn main() -> ExitCode {
    let args: Vec<String> = env::args().skip(1).collect();
    if !(3..=4).contains(&args.len()) {
        eprintln!("{}", USAGE);
        return ExitCode::FAILURE;
    }

    match CompareConfig::from_env() {
        Ok(config) => config.init_logging(),
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    }

    let label = &args[0];
    let input = PathBuf::from(&args[1]);
    let output = PathBuf::from(&args[2]);
    let report = args.get(3).map(PathBuf::from);

    match cleaning::clean_file(label, &input, &output, report.as_deref()) {
        Ok(result) => {
            let flagged: usize = result.outliers.iter().map(|(_, n)| n).sum();
            println!(
                "Cleaned {} rows for {} ({} outlier flags); wrote {}",
                result.rows,
                label,
                flagged,
                output.display()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
