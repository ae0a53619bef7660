//! Presentation of pipeline outcomes.
//!
//! Submodules:
//! - `markdown`: the static summary document written by the batch binary.
//! - `dashboard`: the interactive terminal view.
//!
//! Both surfaces format numbers through the helpers here so a value is
//! always shown the same way in both.

pub mod dashboard;
pub mod markdown;

use std::fs;
use std::path::{Path, PathBuf};

use crate::analysis::hypothesis::{TestKind, TestOutcome};
use crate::analysis::round4;
use crate::config::CompareConfig;
use crate::ingest::MissingSourcePolicy;
use crate::logging::{self, Component};
use crate::model::CompareError;
use crate::pipeline::ComparisonPipeline;

// ---------------------------------------------------------------------------
// Number formatting
// ---------------------------------------------------------------------------

/// Four-decimal fixed notation of the rounded value, e.g. `500.1235`.
pub fn format_fixed(value: f64) -> String {
    let rounded = round4(value);
    // avoid printing "-0.0000"
    let rounded = if rounded == 0.0 { 0.0 } else { rounded };
    format!("{:.4}", rounded)
}

/// Four-decimal scientific notation with a signed two-digit exponent,
/// e.g. `1.2346e-05`.
pub fn format_sci(value: f64) -> String {
    let raw = format!("{:.4e}", value);
    match raw.split_once('e') {
        Some((mantissa, exponent)) => match exponent.parse::<i32>() {
            Ok(exp) => {
                let sign = if exp < 0 { '-' } else { '+' };
                format!("{}e{}{:02}", mantissa, sign, exp.abs())
            }
            Err(_) => raw,
        },
        None => raw,
    }
}

/// Compact single-line form used by the dashboard:
/// `ANOVA: F=27.0000, p=1.0000e-03` or `ANOVA: not available`.
pub fn format_test_line(kind: TestKind, outcome: &TestOutcome) -> String {
    match outcome {
        TestOutcome::Computed { statistic, p_value } => format!(
            "{}: {}={}, p={}",
            kind.name(),
            kind.symbol(),
            format_fixed(*statistic),
            format_sci(*p_value)
        ),
        TestOutcome::Unavailable { .. } => format!("{}: not available", kind.name()),
    }
}

// ---------------------------------------------------------------------------
// Output files
// ---------------------------------------------------------------------------

/// Writes `content` to `path`, creating parent directories and replacing
/// any previous file.
pub fn write_output(path: &Path, content: &str) -> Result<(), CompareError> {
    let io_error = |e: std::io::Error| CompareError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    };
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(io_error)?;
        }
    }
    fs::write(path, content).map_err(io_error)
}

/// Runs the pipeline with every configured source required and writes the
/// markdown summary (plus the JSON sidecar when configured).
///
/// Returns the paths written.
pub fn run_batch(config: &CompareConfig) -> Result<Vec<PathBuf>, CompareError> {
    let pipeline = ComparisonPipeline::from_config(config, MissingSourcePolicy::FailFast);
    let outcome = pipeline.run()?;

    let mut written = Vec::new();
    let document = markdown::render_markdown(&outcome);
    write_output(&config.output_path, &document)?;
    logging::info(
        Component::Report,
        None,
        &format!("Wrote {}", config.output_path.display()),
    );
    written.push(config.output_path.clone());

    if let Some(json_path) = &config.json_output {
        let json = markdown::render_json(&outcome)?;
        write_output(json_path, &json)?;
        logging::info(Component::Report, None, &format!("Wrote {}", json_path.display()));
        written.push(json_path.clone());
    }

    Ok(written)
}
