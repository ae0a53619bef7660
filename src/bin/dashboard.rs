//! Interactive terminal dashboard over the configured sources.
//!
//! Reads one command per line from stdin; `help` lists them.

use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use solar_compare::config::CompareConfig;
use solar_compare::logging::{self, Component};
use solar_compare::report::dashboard::{CommandResult, DashboardSession, HELP};

fn main() -> ExitCode {
    let config = match CompareConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };
    config.init_logging();

    let mut session = DashboardSession::from_config(&config);
    logging::info(
        Component::Dashboard,
        None,
        &format!("sources: {}", session.available_sources().join(", ")),
    );

    match session.render() {
        Ok(text) => println!("{}\n{}", text, HELP),
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    loop {
        print!("> ");
        let _ = stdout.flush();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                eprintln!("Error reading input: {}", e);
                return ExitCode::FAILURE;
            }
        }

        match session.handle_command(&line) {
            Ok(CommandResult::Output(text)) => println!("{}", text),
            Ok(CommandResult::Quit) => break,
            // unreadable source files end the session; missing ones never reach here
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::FAILURE;
            }
        }
    }

    ExitCode::SUCCESS
}
