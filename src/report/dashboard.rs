//! Interactive terminal dashboard.
//!
//! A `DashboardSession` holds the user's controls (metric, selected sources,
//! chart sample fraction) and re-runs the shared pipeline on every command.
//! Missing source files are skipped here; when nothing loads the view shows
//! a guidance message instead of tables and charts.
//!
//! The sample fraction only thins the box-plot input. Summary statistics,
//! averages and test results always use every row.

use rand::rngs::StdRng;
use rand::SeedableRng;

use super::{format_fixed, format_test_line};
use crate::analysis::hypothesis::{HypothesisReport, TestKind};
use crate::analysis::ranking::Ranking;
use crate::analysis::summary::SummaryTable;
use crate::analysis::{median, quantile};
use crate::config::CompareConfig;
use crate::ingest::{load_sources, MissingSourcePolicy};
use crate::logging::{self, Component};
use crate::model::{CompareError, SOURCE_COLUMN};
use crate::pipeline::{ComparisonOutcome, ComparisonPipeline};
use crate::sources::{is_known_metric, DEFAULT_METRICS, METRIC_GHI};

pub const DEFAULT_SAMPLE_FRACTION: f64 = 0.2;
pub const MIN_SAMPLE_FRACTION: f64 = 0.01;
pub const MAX_SAMPLE_FRACTION: f64 = 1.0;

/// Seed for chart subsampling, fixed so repeated renders agree.
const SAMPLE_SEED: u64 = 0;

const CHART_WIDTH: usize = 40;

const GUIDANCE: &str = "No cleaned CSVs found. Run `clean_source` for each dataset or place \
                        cleaned CSVs in the data directory with the expected file names \
                        (e.g. benin_clean.csv).";

// ---------------------------------------------------------------------------
// Controls
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardControls {
    pub metric: String,
    pub sources: Vec<String>,
    pub sample_fraction: f64,
    pub show_tests: bool,
}

impl DashboardControls {
    /// GHI, every source selected, 20% chart sampling, tests hidden.
    pub fn new(sources: Vec<String>) -> Self {
        Self {
            metric: METRIC_GHI.to_string(),
            sources,
            sample_fraction: DEFAULT_SAMPLE_FRACTION,
            show_tests: false,
        }
    }

    pub fn set_metric(&mut self, metric: &str) -> Result<(), CompareError> {
        if !is_known_metric(metric) {
            return Err(CompareError::InvalidArgument(format!(
                "unknown metric '{}', choose one of {}",
                metric,
                DEFAULT_METRICS.join(", ")
            )));
        }
        self.metric = metric.to_string();
        Ok(())
    }

    /// Replaces the selection. Every label must be one of `available`.
    pub fn set_sources(&mut self, labels: &[String], available: &[String]) -> Result<(), CompareError> {
        if let Some(unknown) = labels.iter().find(|l| !available.contains(l)) {
            return Err(CompareError::InvalidArgument(format!(
                "unknown source '{}', choose from {}",
                unknown,
                available.join(", ")
            )));
        }
        self.sources = labels.to_vec();
        Ok(())
    }

    pub fn set_sample_fraction(&mut self, fraction: f64) -> Result<(), CompareError> {
        if !(MIN_SAMPLE_FRACTION..=MAX_SAMPLE_FRACTION).contains(&fraction) {
            return Err(CompareError::InvalidArgument(format!(
                "sample fraction must be between {} and {}, got {}",
                MIN_SAMPLE_FRACTION, MAX_SAMPLE_FRACTION, fraction
            )));
        }
        self.sample_fraction = fraction;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// View model
// ---------------------------------------------------------------------------

/// Five-number summary for one source's box plot.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxStats {
    pub label: String,
    pub n: usize,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

impl BoxStats {
    pub fn from_values(label: &str, values: &[f64]) -> Option<Self> {
        let min = values.iter().copied().reduce(f64::min)?;
        let max = values.iter().copied().reduce(f64::max)?;
        Some(Self {
            label: label.to_string(),
            n: values.len(),
            min,
            q1: quantile(values, 0.25)?,
            median: median(values)?,
            q3: quantile(values, 0.75)?,
            max,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardView {
    pub metric: String,
    /// Set when nothing loaded; the other fields are then empty.
    pub guidance: Option<String>,
    pub summary: SummaryTable,
    pub boxes: Vec<BoxStats>,
    pub averages: Ranking,
    pub tests: Option<HypothesisReport>,
}

/// Row indices to keep when sampling `fraction` of `len` rows. Indices come
/// back in ascending order; a non-empty input always keeps at least one row.
pub fn sample_indices(len: usize, fraction: f64, rng: &mut StdRng) -> Vec<usize> {
    if fraction >= 1.0 || len == 0 {
        return (0..len).collect();
    }
    let amount = ((len as f64 * fraction).round() as usize).clamp(1, len);
    let mut picked = rand::seq::index::sample(rng, len, amount).into_vec();
    picked.sort_unstable();
    picked
}

/// Builds the view for the given controls from an already-run pipeline
/// outcome.
pub fn build_view(outcome: &ComparisonOutcome, controls: &DashboardControls) -> DashboardView {
    let table = &outcome.table;
    if table.is_empty() {
        return DashboardView {
            metric: controls.metric.clone(),
            guidance: Some(GUIDANCE.to_string()),
            summary: SummaryTable::default(),
            boxes: Vec::new(),
            averages: Ranking::default(),
            tests: None,
        };
    }

    let mut rng = StdRng::seed_from_u64(SAMPLE_SEED);
    let boxes = table
        .source_labels()
        .iter()
        .filter_map(|label| {
            let rows: Vec<_> = table.rows_for(label).collect();
            let sampled: Vec<f64> = sample_indices(rows.len(), controls.sample_fraction, &mut rng)
                .into_iter()
                .filter_map(|i| rows[i].value(&controls.metric))
                .collect();
            BoxStats::from_values(label, &sampled)
        })
        .collect();

    DashboardView {
        metric: controls.metric.clone(),
        guidance: None,
        summary: outcome.summary.clone(),
        boxes,
        averages: outcome.ranking_for(&controls.metric),
        tests: controls.show_tests.then(|| outcome.tests.clone()),
    }
}

// ---------------------------------------------------------------------------
// Text rendering
// ---------------------------------------------------------------------------

pub fn render_view(view: &DashboardView) -> String {
    let mut out: Vec<String> = Vec::new();
    out.push("Cross-country solar dashboard".to_string());
    out.push("=============================".to_string());

    if let Some(guidance) = &view.guidance {
        out.push(String::new());
        out.push(guidance.clone());
        return out.join("\n") + "\n";
    }

    out.push(String::new());
    out.push("Summary".to_string());
    out.push("-------".to_string());
    out.extend(render_summary(&view.summary));

    if let Some(tests) = &view.tests {
        out.push(String::new());
        out.push(format!("Statistical tests on {}", tests.metric));
        for kind in [TestKind::Anova, TestKind::KruskalWallis] {
            out.push(format_test_line(kind, tests.outcome(kind)));
        }
    }

    out.push(String::new());
    out.push(format!("{} boxplot by country", view.metric));
    out.push("-".repeat(CHART_WIDTH));
    out.extend(render_boxes(&view.boxes));

    out.push(String::new());
    out.push(format!("Average {} ranking", view.metric));
    out.push("-".repeat(CHART_WIDTH));
    out.extend(render_bars(&view.averages));

    out.join("\n") + "\n"
}

fn render_summary(summary: &SummaryTable) -> Vec<String> {
    let columns = summary.column_names();
    let label_width = summary
        .rows
        .iter()
        .map(|r| r.label.len())
        .chain(std::iter::once(SOURCE_COLUMN.len()))
        .max()
        .unwrap_or(0);
    let cell_width = columns.iter().map(String::len).max().unwrap_or(0).max(10);

    let mut lines = Vec::new();
    let mut header = format!("{:<w$}", SOURCE_COLUMN, w = label_width);
    for c in &columns {
        header.push_str(&format!("  {:>w$}", c, w = cell_width));
    }
    lines.push(header);

    for row in &summary.rows {
        let mut line = format!("{:<w$}", row.label, w = label_width);
        for c in &columns {
            let cell = row.column(c).map(format_fixed).unwrap_or_else(|| "-".to_string());
            line.push_str(&format!("  {:>w$}", cell, w = cell_width));
        }
        lines.push(line);
    }
    lines
}

/// Maps `value` in [lo, hi] to a column in [0, CHART_WIDTH - 1].
fn scale(value: f64, lo: f64, hi: f64) -> usize {
    if hi <= lo {
        return 0;
    }
    let pos = (value - lo) / (hi - lo) * (CHART_WIDTH - 1) as f64;
    (pos.round().max(0.0) as usize).min(CHART_WIDTH - 1)
}

fn render_boxes(boxes: &[BoxStats]) -> Vec<String> {
    let lo = boxes.iter().map(|b| b.min).reduce(f64::min);
    let hi = boxes.iter().map(|b| b.max).reduce(f64::max);
    let (Some(lo), Some(hi)) = (lo, hi) else {
        return vec!["(no values for this metric)".to_string()];
    };
    let label_width = boxes.iter().map(|b| b.label.len()).max().unwrap_or(0);

    boxes
        .iter()
        .map(|b| {
            let mut cells = vec![' '; CHART_WIDTH];
            let (min, q1, med, q3, max) = (
                scale(b.min, lo, hi),
                scale(b.q1, lo, hi),
                scale(b.median, lo, hi),
                scale(b.q3, lo, hi),
                scale(b.max, lo, hi),
            );
            for cell in cells.iter_mut().take(max + 1).skip(min) {
                *cell = '-';
            }
            for cell in cells.iter_mut().take(q3 + 1).skip(q1) {
                *cell = '=';
            }
            cells[min] = '|';
            cells[max] = '|';
            cells[med] = '#';
            let plot: String = cells.into_iter().collect();
            format!(
                "{:<w$}  {}  n={} median={}",
                b.label,
                plot,
                b.n,
                format_fixed(b.median),
                w = label_width
            )
        })
        .collect()
}

fn render_bars(ranking: &Ranking) -> Vec<String> {
    if ranking.is_empty() {
        return vec!["(no values for this metric)".to_string()];
    }
    let top = ranking.entries.iter().map(|e| e.value).fold(0.0, f64::max);
    let label_width = ranking.entries.iter().map(|e| e.label.len()).max().unwrap_or(0);

    ranking
        .entries
        .iter()
        .map(|e| {
            let len = if top > 0.0 {
                ((e.value.max(0.0) / top) * CHART_WIDTH as f64).round() as usize
            } else {
                0
            };
            format!(
                "{:<w$}  {:<bw$}  {}",
                e.label,
                "█".repeat(len),
                format_fixed(e.value),
                w = label_width,
                bw = CHART_WIDTH
            )
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// What the caller should do after a command.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandResult {
    /// Print this text and keep reading commands.
    Output(String),
    Quit,
}

pub const HELP: &str = "Commands:
  metric <GHI|DNI|DHI>     select the charted metric
  sources <A,B,...>        select sources (comma separated), `sources all` for every one
  sample <0.01..1.0>       fraction of rows drawn in the box plots
  tests                    run the statistical tests and show results
  show                     redraw the dashboard
  help                     this text
  quit                     exit";

pub struct DashboardSession {
    pipeline: ComparisonPipeline,
    available: Vec<String>,
    pub controls: DashboardControls,
}

impl DashboardSession {
    pub fn new(pipeline: ComparisonPipeline) -> Self {
        let available = pipeline.sources.labels();
        let controls = DashboardControls::new(available.clone());
        Self {
            pipeline: ComparisonPipeline {
                policy: MissingSourcePolicy::Skip,
                ..pipeline
            },
            available,
            controls,
        }
    }

    pub fn from_config(config: &CompareConfig) -> Self {
        Self::new(ComparisonPipeline::from_config(config, MissingSourcePolicy::Skip))
    }

    pub fn available_sources(&self) -> &[String] {
        &self.available
    }

    /// Reloads every configured source, keeps the selected ones and re-runs
    /// the analysis stages on them.
    pub fn view(&self) -> Result<DashboardView, CompareError> {
        let loaded = load_sources(&self.pipeline.sources, self.pipeline.policy)?;
        let outcome = self.pipeline.analyze(loaded.filter_sources(&self.controls.sources));
        Ok(build_view(&outcome, &self.controls))
    }

    pub fn render(&self) -> Result<String, CompareError> {
        self.view().map(|v| render_view(&v))
    }

    /// Applies one command line. Invalid input is reported as output text;
    /// only pipeline failures (unreadable files) are returned as errors.
    pub fn handle_command(&mut self, line: &str) -> Result<CommandResult, CompareError> {
        let line = line.trim();
        let (command, arg) = match line.split_once(char::is_whitespace) {
            Some((c, a)) => (c, a.trim()),
            None => (line, ""),
        };

        let applied = match command {
            "" => return Ok(CommandResult::Output(String::new())),
            "quit" | "exit" | "q" => return Ok(CommandResult::Quit),
            "help" | "?" => return Ok(CommandResult::Output(HELP.to_string())),
            "show" => Ok(()),
            "metric" => self.controls.set_metric(arg),
            "sources" => {
                let labels: Vec<String> = if arg == "all" {
                    self.available.clone()
                } else {
                    arg.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                };
                self.controls.set_sources(&labels, &self.available)
            }
            "sample" => match arg.parse::<f64>() {
                Ok(f) => self.controls.set_sample_fraction(f),
                Err(_) => Err(CompareError::InvalidArgument(format!(
                    "sample fraction must be a number, got '{}'",
                    arg
                ))),
            },
            "tests" => {
                self.controls.show_tests = true;
                Ok(())
            }
            other => Err(CompareError::InvalidArgument(format!(
                "unknown command '{}' (try `help`)",
                other
            ))),
        };

        match applied {
            Ok(()) => {
                logging::debug(Component::Dashboard, None, &format!("command: {}", line));
                self.render().map(CommandResult::Output)
            }
            Err(e) => Ok(CommandResult::Output(e.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::SourceMap;
    use std::fs;
    use std::path::Path;

    fn write_fixtures(dir: &Path) {
        let mut benin = String::from("GHI,DNI,DHI\n");
        let mut togo = String::from("GHI,DNI,DHI\n");
        for i in 0..50 {
            benin.push_str(&format!("{},{},{}\n", 500 + i % 5, 400 + i % 3, 100 + i % 2));
            togo.push_str(&format!("{},{},{}\n", 300 + i % 5, 250 + i % 3, 90 + i % 2));
        }
        fs::write(dir.join("benin.csv"), benin).unwrap();
        fs::write(dir.join("togo.csv"), togo).unwrap();
    }

    fn session(dir: &Path) -> DashboardSession {
        let mut sources = SourceMap::new();
        sources.insert("Benin", dir.join("benin.csv"));
        sources.insert("Togo", dir.join("togo.csv"));
        sources.insert("SierraLeone", dir.join("sierraleone.csv"));
        DashboardSession::new(ComparisonPipeline::new(
            sources,
            DEFAULT_METRICS.iter().map(|m| m.to_string()).collect(),
            "GHI",
            MissingSourcePolicy::FailFast,
        ))
    }

    #[test]
    fn test_missing_sources_are_tolerated() {
        let dir = tempfile::tempdir().unwrap();
        write_fixtures(dir.path());
        let view = session(dir.path()).view().expect("dashboard must skip missing files");
        assert!(view.guidance.is_none());
        assert_eq!(view.averages.labels(), vec!["Benin", "Togo"]);
    }

    #[test]
    fn test_empty_data_shows_guidance() {
        let dir = tempfile::tempdir().unwrap();
        let text = session(dir.path()).render().unwrap();
        assert!(text.contains("No cleaned CSVs found"));
        assert!(!text.contains("Summary"));
    }

    #[test]
    fn test_sampling_changes_boxes_not_averages() {
        let dir = tempfile::tempdir().unwrap();
        write_fixtures(dir.path());
        let mut s = session(dir.path());

        s.controls.set_sample_fraction(1.0).unwrap();
        let full = s.view().unwrap();
        s.controls.set_sample_fraction(0.1).unwrap();
        let thin = s.view().unwrap();

        assert_eq!(full.boxes[0].n, 50);
        assert_eq!(thin.boxes[0].n, 5);
        assert_eq!(full.averages, thin.averages);
        assert_eq!(full.summary, thin.summary);
    }

    #[test]
    fn test_sampling_is_repeatable() {
        let mut a = StdRng::seed_from_u64(SAMPLE_SEED);
        let mut b = StdRng::seed_from_u64(SAMPLE_SEED);
        assert_eq!(sample_indices(100, 0.2, &mut a), sample_indices(100, 0.2, &mut b));
        let picked = sample_indices(100, 0.2, &mut a);
        assert_eq!(picked.len(), 20);
        assert!(picked.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(sample_indices(3, 0.01, &mut a).len(), 1);
    }

    #[test]
    fn test_tests_shown_on_demand() {
        let dir = tempfile::tempdir().unwrap();
        write_fixtures(dir.path());
        let mut s = session(dir.path());

        let before = s.render().unwrap();
        assert!(!before.contains("ANOVA"));

        match s.handle_command("tests").unwrap() {
            CommandResult::Output(text) => {
                assert!(text.contains("ANOVA: F="), "got {}", text);
                assert!(text.contains("Kruskal–Wallis: H="));
            }
            CommandResult::Quit => panic!("tests must not quit"),
        }
    }

    #[test]
    fn test_source_selection_narrows_every_view() {
        let dir = tempfile::tempdir().unwrap();
        write_fixtures(dir.path());
        let mut s = session(dir.path());
        s.handle_command("sources Togo").unwrap();

        let view = s.view().unwrap();
        assert_eq!(view.averages.labels(), vec!["Togo"]);
        assert_eq!(view.summary.rows.len(), 1);
        assert_eq!(view.boxes.len(), 1);

        s.handle_command("sources all").unwrap();
        assert_eq!(s.view().unwrap().averages.labels(), vec!["Benin", "Togo"]);
    }

    #[test]
    fn test_single_source_tests_not_available() {
        let dir = tempfile::tempdir().unwrap();
        write_fixtures(dir.path());
        let mut s = session(dir.path());
        s.handle_command("sources Benin").unwrap();
        match s.handle_command("tests").unwrap() {
            CommandResult::Output(text) => {
                assert!(text.contains("ANOVA: not available"), "got {}", text);
                assert!(text.contains("Kruskal–Wallis: not available"));
            }
            CommandResult::Quit => panic!("tests must not quit"),
        }
    }

    #[test]
    fn test_metric_selection_is_closed_set() {
        let dir = tempfile::tempdir().unwrap();
        write_fixtures(dir.path());
        let mut s = session(dir.path());

        match s.handle_command("metric Tamb").unwrap() {
            CommandResult::Output(text) => assert!(text.contains("unknown metric 'Tamb'")),
            CommandResult::Quit => panic!(),
        }
        assert_eq!(s.controls.metric, "GHI");

        match s.handle_command("metric DNI").unwrap() {
            CommandResult::Output(text) => assert!(text.contains("Average DNI ranking")),
            CommandResult::Quit => panic!(),
        }
    }

    #[test]
    fn test_invalid_commands_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = session(dir.path());
        let expect_output = |r: CommandResult, needle: &str| match r {
            CommandResult::Output(text) => assert!(text.contains(needle), "got {}", text),
            CommandResult::Quit => panic!("unexpected quit"),
        };
        expect_output(s.handle_command("sample 2").unwrap(), "between");
        expect_output(s.handle_command("sample lots").unwrap(), "must be a number");
        expect_output(s.handle_command("sources Ghana").unwrap(), "unknown source 'Ghana'");
        expect_output(s.handle_command("dance").unwrap(), "unknown command");
        assert_eq!(s.handle_command("quit").unwrap(), CommandResult::Quit);
    }

    #[test]
    fn test_box_stats_five_numbers() {
        let b = BoxStats::from_values("A", &[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        assert_eq!((b.min, b.q1, b.median, b.q3, b.max), (1.0, 2.0, 3.0, 4.0, 5.0));
        assert!(BoxStats::from_values("A", &[]).is_none());
    }

    #[test]
    fn test_bars_show_four_decimal_labels() {
        let ranking = crate::analysis::ranking::rank_descending(
            "GHI",
            vec![("A".to_string(), 10.0), ("B".to_string(), 5.123_456)],
        );
        let lines = render_bars(&ranking);
        assert!(lines[0].starts_with("A"));
        assert!(lines[0].ends_with("10.0000"));
        assert!(lines[1].ends_with("5.1235"));
    }
}
