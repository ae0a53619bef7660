//! Prints the summary table, test results and GHI ranking to stdout.

use std::process::ExitCode;

use solar_compare::analysis::hypothesis::TestKind;
use solar_compare::config::CompareConfig;
use solar_compare::ingest::MissingSourcePolicy;
use solar_compare::pipeline::ComparisonPipeline;
use solar_compare::report::{format_fixed, format_test_line};

fn main() -> ExitCode {
    let config = match CompareConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };
    config.init_logging();

    let outcome = match ComparisonPipeline::from_config(&config, MissingSourcePolicy::FailFast).run() {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    println!("Summary");
    println!("=======");
    let columns = outcome.summary.column_names();
    println!("country,{}", columns.join(","));
    for row in &outcome.summary.rows {
        let cells: Vec<String> = columns
            .iter()
            .map(|c| row.column(c).map(format_fixed).unwrap_or_default())
            .collect();
        println!("{},{}", row.label, cells.join(","));
    }

    println!();
    println!("Statistical tests on {}", outcome.tests.metric);
    println!("{}", format_test_line(TestKind::Anova, &outcome.tests.anova));
    println!("{}", format_test_line(TestKind::KruskalWallis, &outcome.tests.kruskal));

    println!();
    println!("Average {} ranking", outcome.ranking.metric);
    for (i, entry) in outcome.ranking.entries.iter().enumerate() {
        println!("{}. {}: {}", i + 1, entry.label, format_fixed(entry.value));
    }

    ExitCode::SUCCESS
}
