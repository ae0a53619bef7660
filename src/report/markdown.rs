//! Static markdown summary.
//!
//! Layout: title, summary table, statistical tests, ranking, and a short
//! list of observations. The observations are derived from the computed
//! values so they cannot drift out of date when the input data changes.
//!
//! Rendering is a pure function of the outcome; identical input gives a
//! byte-identical document.

use serde::Serialize;

use super::{format_fixed, format_sci};
use crate::analysis::hypothesis::{HypothesisReport, TestKind, TestOutcome};
use crate::analysis::ranking::Ranking;
use crate::analysis::summary::SummaryTable;
use crate::model::{CompareError, SOURCE_COLUMN};
use crate::pipeline::ComparisonOutcome;

/// Significance level used by the observation bullets.
pub const SIGNIFICANCE_LEVEL: f64 = 0.05;

pub fn title(outcome: &ComparisonOutcome) -> String {
    format!("Cross-country summary ({})", outcome.requested.join(", "))
}

pub fn render_markdown(outcome: &ComparisonOutcome) -> String {
    let metric = &outcome.tests.metric;
    let mut md: Vec<String> = Vec::new();

    md.push(format!("# {}", title(outcome)));
    md.push(String::new());
    md.push("## Summary table (mean, median, std)".to_string());
    md.push(String::new());
    md.extend(summary_table_lines(&outcome.summary));
    md.push(String::new());

    md.push(format!("## Statistical tests on {}", metric));
    md.push(String::new());
    for kind in [TestKind::Anova, TestKind::KruskalWallis] {
        md.push(test_bullet(kind, outcome.tests.outcome(kind)));
    }
    md.push(String::new());

    md.push(format!("## Average {} ranking (descending)", outcome.ranking.metric));
    md.push(String::new());
    if outcome.ranking.is_empty() {
        md.push(format!("- no {} values available", outcome.ranking.metric));
    }
    for entry in &outcome.ranking.entries {
        md.push(format!("- {}: {}", entry.label, format_fixed(entry.value)));
    }
    md.push(String::new());

    md.push("## Key observations (brief)".to_string());
    md.push(String::new());
    for line in observations(outcome) {
        md.push(format!("- {}", line));
    }

    let mut document = md.join("\n");
    document.push('\n');
    document
}

fn summary_table_lines(summary: &SummaryTable) -> Vec<String> {
    let columns = summary.column_names();
    let mut header = vec![SOURCE_COLUMN.to_string()];
    header.extend(columns.iter().cloned());

    let mut lines = vec![
        format!("| {} |", header.join(" | ")),
        format!("| {} |", vec!["---"; header.len()].join(" | ")),
    ];
    for row in &summary.rows {
        let mut cells = vec![row.label.clone()];
        cells.extend(
            columns
                .iter()
                .map(|c| row.column(c).map(format_fixed).unwrap_or_default()),
        );
        lines.push(format!("| {} |", cells.join(" | ")));
    }
    lines
}

fn test_bullet(kind: TestKind, outcome: &TestOutcome) -> String {
    match outcome {
        TestOutcome::Computed { statistic, p_value } => format!(
            "- {}: {} = {}, p = {}",
            kind.name(),
            kind.symbol(),
            format_fixed(*statistic),
            format_sci(*p_value)
        ),
        TestOutcome::Unavailable { .. } => format!("- {}: failed to compute", kind.name()),
    }
}

// ---------------------------------------------------------------------------
// Observations
// ---------------------------------------------------------------------------

/// Short findings derived from the ranking, the tests and the summary.
pub fn observations(outcome: &ComparisonOutcome) -> Vec<String> {
    vec![
        ranking_observation(&outcome.ranking),
        significance_observation(&outcome.tests),
        variability_observation(&outcome.summary, &outcome.tests.metric),
    ]
}

fn ranking_observation(ranking: &Ranking) -> String {
    let labels = ranking.labels();
    let metric = &ranking.metric;
    match labels.as_slice() {
        [] => format!("No source has {} values to rank.", metric),
        [only] => format!("{} is the only source with {} values.", only, metric),
        [top, next] => format!("{} has the highest average {}, followed by {}.", top, metric, next),
        [top, middle @ .., last] => format!(
            "{} has the highest average {}, followed by {} and {}.",
            top,
            metric,
            middle.join(", "),
            last
        ),
    }
}

fn significance_observation(tests: &HypothesisReport) -> String {
    let metric = &tests.metric;
    match (&tests.anova, &tests.kruskal) {
        (TestOutcome::Computed { p_value: pa, .. }, TestOutcome::Computed { p_value: pk, .. }) => {
            let anova_sig = *pa < SIGNIFICANCE_LEVEL;
            let kruskal_sig = *pk < SIGNIFICANCE_LEVEL;
            match (anova_sig, kruskal_sig) {
                (true, true) => format!(
                    "Both ANOVA and Kruskal–Wallis report p < {}, indicating statistically significant differences in {} between sources.",
                    SIGNIFICANCE_LEVEL, metric
                ),
                (false, false) => format!(
                    "Neither ANOVA nor Kruskal–Wallis finds a statistically significant difference in {} between sources (p ≥ {}).",
                    metric, SIGNIFICANCE_LEVEL
                ),
                _ => format!(
                    "ANOVA (p = {}) and Kruskal–Wallis (p = {}) disagree at the {} level; treat differences in {} with caution.",
                    format_sci(*pa),
                    format_sci(*pk),
                    SIGNIFICANCE_LEVEL,
                    metric
                ),
            }
        }
        (anova, kruskal) => {
            let reasons: Vec<String> = [(TestKind::Anova, anova), (TestKind::KruskalWallis, kruskal)]
                .iter()
                .filter_map(|(kind, outcome)| match outcome {
                    TestOutcome::Unavailable { reason } => Some(format!("{} ({})", kind.name(), reason)),
                    TestOutcome::Computed { .. } => None,
                })
                .collect();
            format!(
                "Significance of {} differences could not be fully assessed: {} unavailable.",
                metric,
                reasons.join(", ")
            )
        }
    }
}

fn variability_observation(summary: &SummaryTable, metric: &str) -> String {
    let noisy: Vec<&str> = summary
        .rows
        .iter()
        .filter(|row| {
            row.stats(metric)
                .and_then(|s| s.std.zip(s.median))
                .map(|(std, median)| std > median)
                .unwrap_or(false)
        })
        .map(|row| row.label.as_str())
        .collect();

    if noisy.is_empty() {
        format!(
            "{} standard deviations do not exceed the medians; the means are a reasonable summary.",
            metric
        )
    } else {
        format!(
            "The {} standard deviation exceeds the median for {}, indicating high variability; consider median/IQR for robust comparisons.",
            metric,
            noisy.join(", ")
        )
    }
}

// ---------------------------------------------------------------------------
// JSON sidecar
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ReportDocument<'a> {
    title: String,
    summary: &'a SummaryTable,
    tests: &'a HypothesisReport,
    ranking: &'a Ranking,
    observations: Vec<String>,
}

/// The same content as the markdown document, as pretty-printed JSON.
pub fn render_json(outcome: &ComparisonOutcome) -> Result<String, CompareError> {
    let document = ReportDocument {
        title: title(outcome),
        summary: &outcome.summary,
        tests: &outcome.tests,
        ranking: &outcome.ranking,
        observations: observations(outcome),
    };
    serde_json::to_string_pretty(&document)
        .map_err(|e| CompareError::InvalidArgument(format!("cannot serialize report: {}", e)))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
