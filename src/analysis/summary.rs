//! Grouped descriptive statistics.
//!
//! Produces one `GroupSummary` per source label with mean, median and sample
//! standard deviation for each requested metric. Flattened column names
//! follow `{metric}_{statistic}`, e.g. `GHI_mean`.

use serde::Serialize;

use super::{mean, median, std_dev};
use crate::logging::{self, Component};
use crate::model::UnifiedTable;

/// Statistic suffixes, in column order.
pub const STATISTICS: &[&str] = &["mean", "median", "std"];

/// Statistics for one (source, metric) pair. Every field is `None` when the
/// source has no values for the metric.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct MetricStats {
    pub mean: Option<f64>,
    pub median: Option<f64>,
    pub std: Option<f64>,
}

impl MetricStats {
    pub fn from_values(values: &[f64]) -> Self {
        Self {
            mean: mean(values),
            median: median(values),
            std: std_dev(values, 1),
        }
    }

    /// Looks up a statistic by its column suffix.
    pub fn get(&self, statistic: &str) -> Option<f64> {
        match statistic {
            "mean" => self.mean,
            "median" => self.median,
            "std" => self.std,
            _ => None,
        }
    }
}

/// One summary row: a source label plus stats for each metric, in the
/// metric order the summary was built with.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    pub label: String,
    pub count: usize,
    pub metrics: Vec<(String, MetricStats)>,
}

impl GroupSummary {
    pub fn stats(&self, metric: &str) -> Option<&MetricStats> {
        self.metrics.iter().find(|(m, _)| m == metric).map(|(_, s)| s)
    }

    /// Value of a flattened column such as `DNI_median`.
    pub fn column(&self, column: &str) -> Option<f64> {
        let (metric, statistic) = column.rsplit_once('_')?;
        self.stats(metric)?.get(statistic)
    }
}

/// The full summary table.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SummaryTable {
    pub metrics: Vec<String>,
    pub rows: Vec<GroupSummary>,
}

impl SummaryTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Flattened `{metric}_{statistic}` column names.
    pub fn column_names(&self) -> Vec<String> {
        column_names(&self.metrics)
    }

    pub fn row(&self, label: &str) -> Option<&GroupSummary> {
        self.rows.iter().find(|r| r.label == label)
    }

    /// `(label, mean)` pairs for one metric in table order, skipping sources
    /// with no values.
    pub fn means(&self, metric: &str) -> Vec<(String, f64)> {
        self.rows
            .iter()
            .filter_map(|r| {
                r.stats(metric)
                    .and_then(|s| s.mean)
                    .map(|m| (r.label.clone(), m))
            })
            .collect()
    }
}

pub fn column_names(metrics: &[String]) -> Vec<String> {
    metrics
        .iter()
        .flat_map(|m| STATISTICS.iter().map(move |s| format!("{}_{}", m, s)))
        .collect()
}

/// Groups `table` by source label (first-appearance order) and summarizes
/// each metric over its non-missing values.
pub fn summarize(table: &UnifiedTable, metrics: &[String]) -> SummaryTable {
    if table.is_empty() {
        return SummaryTable {
            metrics: metrics.to_vec(),
            rows: Vec::new(),
        };
    }

    let rows: Vec<GroupSummary> = table
        .source_labels()
        .into_iter()
        .map(|label| {
            let count = table.rows_for(&label).count();
            let metrics = metrics
                .iter()
                .map(|metric| {
                    let values = table.metric_values(&label, metric);
                    if values.is_empty() {
                        logging::debug(
                            Component::Aggregator,
                            Some(&label),
                            &format!("no values for {}", metric),
                        );
                    }
                    (metric.clone(), MetricStats::from_values(&values))
                })
                .collect();
            GroupSummary {
                label,
                count,
                metrics,
            }
        })
        .collect();

    SummaryTable {
        metrics: metrics.to_vec(),
        rows,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ObservationRow;

    fn metrics() -> Vec<String> {
        vec!["GHI".to_string(), "DNI".to_string(), "DHI".to_string()]
    }

    fn table() -> UnifiedTable {
        let mut table = UnifiedTable::new();
        let mk = |source: &str, ghi: Option<f64>, dni: Option<f64>| {
            let mut r = ObservationRow::new(source);
            if let Some(v) = ghi {
                r.values.insert("GHI".to_string(), v);
            }
            if let Some(v) = dni {
                r.values.insert("DNI".to_string(), v);
            }
            r
        };
        table.extend_source(
            &["GHI".to_string(), "DNI".to_string()],
            vec![
                mk("Benin", Some(100.0), Some(10.0)),
                mk("Benin", Some(200.0), None),
                mk("Benin", None, Some(30.0)),
                mk("Benin", Some(600.0), Some(50.0)),
            ],
        );
        table.extend_source(&["GHI".to_string()], vec![mk("Togo", Some(42.0), None)]);
        table
    }

    #[test]
    fn test_mean_matches_hand_computation() {
        let summary = summarize(&table(), &metrics());
        let benin = summary.row("Benin").expect("Benin row");
        // (100 + 200 + 600) / 3, missing cell ignored
        assert_eq!(benin.column("GHI_mean"), Some(300.0));
        assert_eq!(benin.column("GHI_median"), Some(200.0));
        assert_eq!(benin.column("DNI_mean"), Some(30.0));
        // sample std of 100, 200, 600
        let std = benin.column("GHI_std").unwrap();
        assert!((std - 264.575_131).abs() < 1e-5, "got {}", std);
    }

    #[test]
    fn test_counts_match_source_rows() {
        let summary = summarize(&table(), &metrics());
        assert_eq!(summary.row("Benin").map(|r| r.count), Some(4));
        assert_eq!(summary.row("Togo").map(|r| r.count), Some(1));
        let total: usize = summary.rows.iter().map(|r| r.count).sum();
        assert_eq!(total, table().len());
    }

    #[test]
    fn test_absent_metric_is_all_missing() {
        let summary = summarize(&table(), &metrics());
        let togo = summary.row("Togo").unwrap();
        assert_eq!(togo.stats("DHI"), Some(&MetricStats::default()));
        assert_eq!(togo.column("DNI_mean"), None);
        // one value: mean and median defined, sample std is not
        assert_eq!(togo.column("GHI_mean"), Some(42.0));
        assert_eq!(togo.column("GHI_std"), None);
    }

    #[test]
    fn test_column_names_follow_convention() {
        let summary = summarize(&table(), &metrics());
        assert_eq!(
            summary.column_names(),
            vec![
                "GHI_mean", "GHI_median", "GHI_std", "DNI_mean", "DNI_median", "DNI_std",
                "DHI_mean", "DHI_median", "DHI_std",
            ]
        );
    }

    #[test]
    fn test_empty_table_gives_empty_summary() {
        let summary = summarize(&UnifiedTable::new(), &metrics());
        assert!(summary.is_empty());
        assert!(summary.means("GHI").is_empty());
    }

    #[test]
    fn test_means_skip_sources_without_values() {
        let summary = summarize(&table(), &metrics());
        assert_eq!(summary.means("DNI"), vec![("Benin".to_string(), 30.0)]);
    }
}
