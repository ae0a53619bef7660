//! Core data types for the solar comparison service.
//!
//! This module defines the shared domain model imported by all other modules:
//! observation rows, the unified multi-source table, and the crate error type.
//! It contains no I/O.

use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Column names
// ---------------------------------------------------------------------------

/// Name of the optional timestamp column in source CSVs.
pub const TIMESTAMP_COLUMN: &str = "Timestamp";

/// Name of the source-label column written to cleaned and combined outputs.
pub const SOURCE_COLUMN: &str = "country";

// ---------------------------------------------------------------------------
// Observation rows
// ---------------------------------------------------------------------------

/// A single measurement record from one source file.
///
/// Numeric cells land in `values`; a missing or empty cell is simply absent
/// from the map, never stored as zero. Cells that are neither numeric nor
/// missing (comments, unparseable timestamps) are kept in `text`.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ObservationRow {
    pub source: String,
    pub timestamp: Option<NaiveDateTime>,
    pub values: BTreeMap<String, f64>,
    pub text: BTreeMap<String, String>,
}

impl ObservationRow {
    pub fn new(source: &str) -> Self {
        Self {
            source: source.to_string(),
            ..Self::default()
        }
    }

    /// Returns the numeric value for `column`, or `None` when missing.
    pub fn value(&self, column: &str) -> Option<f64> {
        self.values.get(column).copied()
    }
}

// ---------------------------------------------------------------------------
// Unified table
// ---------------------------------------------------------------------------

/// All loaded observation rows across sources.
///
/// Rows from one source stay contiguous and in file order. `columns` is the
/// union of every source's header in first-seen order, so a column that only
/// one source provides still appears here; other sources just have no value
/// for it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UnifiedTable {
    pub columns: Vec<String>,
    pub rows: Vec<ObservationRow>,
}

impl UnifiedTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Appends one source's rows, merging its columns into the column union.
    pub fn extend_source(&mut self, columns: &[String], rows: Vec<ObservationRow>) {
        for column in columns {
            if !self.columns.contains(column) {
                self.columns.push(column.clone());
            }
        }
        self.rows.extend(rows);
    }

    /// Distinct source labels in order of first appearance.
    pub fn source_labels(&self) -> Vec<String> {
        let mut labels: Vec<String> = Vec::new();
        for row in &self.rows {
            if !labels.iter().any(|l| l == &row.source) {
                labels.push(row.source.clone());
            }
        }
        labels
    }

    pub fn rows_for<'a>(&'a self, label: &'a str) -> impl Iterator<Item = &'a ObservationRow> + 'a {
        self.rows.iter().filter(move |r| r.source == label)
    }

    /// Non-missing values of `metric` for one source, in row order.
    pub fn metric_values(&self, label: &str, metric: &str) -> Vec<f64> {
        self.rows_for(label).filter_map(|r| r.value(metric)).collect()
    }

    /// Returns a copy restricted to the given labels, preserving row order.
    pub fn filter_sources(&self, labels: &[String]) -> UnifiedTable {
        UnifiedTable {
            columns: self.columns.clone(),
            rows: self
                .rows
                .iter()
                .filter(|r| labels.contains(&r.source))
                .cloned()
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can arise when loading, analyzing or reporting on source data.
#[derive(Debug, Clone, PartialEq)]
pub enum CompareError {
    /// A configured source file does not exist.
    SourceNotFound { label: String, path: String },
    /// Any other filesystem failure while reading or writing.
    Io { path: String, message: String },
    /// The file exists but could not be parsed as CSV.
    Csv { path: String, message: String },
    /// The configuration file is unreadable or inconsistent.
    Config(String),
    /// A caller passed a value outside the accepted set.
    InvalidArgument(String),
}

impl std::fmt::Display for CompareError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompareError::SourceNotFound { label, path } => {
                write!(f, "Source file not found for {}: {}", label, path)
            }
            CompareError::Io { path, message } => write!(f, "IO error on {}: {}", path, message),
            CompareError::Csv { path, message } => write!(f, "CSV error in {}: {}", path, message),
            CompareError::Config(msg) => write!(f, "Config error: {}", msg),
            CompareError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
        }
    }
}

impl std::error::Error for CompareError {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn row(source: &str, ghi: Option<f64>) -> ObservationRow {
        let mut r = ObservationRow::new(source);
        if let Some(v) = ghi {
            r.values.insert("GHI".to_string(), v);
        }
        r
    }

    #[test]
    fn test_source_labels_follow_first_appearance() {
        let mut table = UnifiedTable::new();
        table.extend_source(&["GHI".to_string()], vec![row("Togo", Some(1.0)), row("Togo", None)]);
        table.extend_source(&["GHI".to_string()], vec![row("Benin", Some(2.0))]);
        assert_eq!(table.source_labels(), vec!["Togo", "Benin"]);
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_column_union_keeps_first_seen_order() {
        let mut table = UnifiedTable::new();
        table.extend_source(&["GHI".to_string(), "DNI".to_string()], vec![]);
        table.extend_source(&["DHI".to_string(), "GHI".to_string()], vec![]);
        assert_eq!(table.columns, vec!["GHI", "DNI", "DHI"]);
    }

    #[test]
    fn test_metric_values_skip_missing_cells() {
        let mut table = UnifiedTable::new();
        table.extend_source(
            &["GHI".to_string()],
            vec![row("Benin", Some(10.0)), row("Benin", None), row("Benin", Some(30.0))],
        );
        assert_eq!(table.metric_values("Benin", "GHI"), vec![10.0, 30.0]);
        assert!(table.metric_values("Benin", "DNI").is_empty());
    }

    #[test]
    fn test_filter_sources_preserves_row_order() {
        let mut table = UnifiedTable::new();
        table.extend_source(&["GHI".to_string()], vec![row("A", Some(1.0)), row("A", Some(2.0))]);
        table.extend_source(&["GHI".to_string()], vec![row("B", Some(3.0))]);
        let only_a = table.filter_sources(&["A".to_string()]);
        assert_eq!(only_a.metric_values("A", "GHI"), vec![1.0, 2.0]);
        assert_eq!(only_a.source_labels(), vec!["A"]);
    }

    #[test]
    fn test_error_display_names_the_source() {
        let err = CompareError::SourceNotFound {
            label: "Togo".to_string(),
            path: "data/togo_clean.csv".to_string(),
        };
        assert_eq!(err.to_string(), "Source file not found for Togo: data/togo_clean.csv");
    }
}
