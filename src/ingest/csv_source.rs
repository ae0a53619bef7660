//! CSV source loader.
//!
//! Reads one cleaned CSV per source, tags every row with the source label,
//! and concatenates the results into a `UnifiedTable`.
//!
//! A missing file is an ordinary condition for the dashboard (the cleaning
//! pass may not have run for every source yet) but fatal for the batch
//! report. That difference is carried by `MissingSourcePolicy` so both
//! callers share this one loader.

use chrono::{NaiveDate, NaiveDateTime};
use csv::StringRecord;
use std::fs::File;
use std::io::ErrorKind;
use std::path::Path;

use crate::logging::{self, Component};
use crate::model::{CompareError, ObservationRow, UnifiedTable, SOURCE_COLUMN, TIMESTAMP_COLUMN};
use crate::sources::SourceMap;

/// Cell contents treated as missing in addition to the empty string.
pub const MISSING_TOKENS: &[&str] = &["NaN", "nan", "NA", "N/A", "null", "NULL", "None"];

/// Timestamp layouts accepted in the `Timestamp` column, tried in order.
const TIMESTAMP_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S"];

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// What to do when a configured source file does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingSourcePolicy {
    /// Return `CompareError::SourceNotFound` for the first missing file.
    FailFast,
    /// Leave the source out of the table and keep going.
    Skip,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Loads every source in `sources`, in map order.
///
/// Read and parse errors other than a missing file are returned under both
/// policies. If nothing loads, the result is an empty table.
pub fn load_sources(
    sources: &SourceMap,
    policy: MissingSourcePolicy,
) -> Result<UnifiedTable, CompareError> {
    let mut table = UnifiedTable::new();
    let mut loaded = 0usize;
    let mut skipped = 0usize;

    for spec in sources.iter() {
        match read_source_csv(&spec.path, &spec.label) {
            Ok((columns, rows)) => {
                logging::debug(
                    Component::Loader,
                    Some(&spec.label),
                    &format!("read {} rows from {}", rows.len(), spec.path.display()),
                );
                table.extend_source(&columns, rows);
                loaded += 1;
            }
            Err(err @ CompareError::SourceNotFound { .. }) => {
                logging::log_load_failure(&spec.label, "load", &err);
                if policy == MissingSourcePolicy::FailFast {
                    return Err(err);
                }
                skipped += 1;
            }
            Err(err) => {
                logging::log_load_failure(&spec.label, "load", &err);
                return Err(err);
            }
        }
    }

    logging::log_load_summary(sources.len(), loaded, skipped, table.len());
    Ok(table)
}

/// Reads a single CSV file and tags each row with `label`.
///
/// Returns the file's data columns (header order, without any existing
/// source-label column) and the parsed rows.
pub fn read_source_csv(
    path: &Path,
    label: &str,
) -> Result<(Vec<String>, Vec<ObservationRow>), CompareError> {
    let file = open_source(path, label)?;

    let csv_error = |e: csv::Error| CompareError::Csv {
        path: path.display().to_string(),
        message: e.to_string(),
    };

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = reader.headers().map_err(csv_error)?.clone();
    let columns: Vec<String> = headers
        .iter()
        .filter(|h| *h != SOURCE_COLUMN)
        .map(String::from)
        .collect();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(csv_error)?;
        rows.push(parse_record(&headers, &record, label));
    }

    Ok((columns, rows))
}

fn parse_record(headers: &StringRecord, record: &StringRecord, label: &str) -> ObservationRow {
    let mut row = ObservationRow::new(label);

    for (name, cell) in headers.iter().zip(record.iter()) {
        if name == SOURCE_COLUMN || is_missing(cell) {
            continue;
        }

        if name == TIMESTAMP_COLUMN {
            match parse_timestamp(cell) {
                Some(ts) => row.timestamp = Some(ts),
                None => {
                    row.text.insert(name.to_string(), cell.to_string());
                }
            }
            continue;
        }

        match cell.parse::<f64>() {
            Ok(v) if !v.is_nan() => {
                row.values.insert(name.to_string(), v);
            }
            Ok(_) => {}
            Err(_) => {
                row.text.insert(name.to_string(), cell.to_string());
            }
        }
    }

    row
}

/// Opens a source file, mapping a missing file to `SourceNotFound`.
pub fn open_source(path: &Path, label: &str) -> Result<File, CompareError> {
    File::open(path).map_err(|e| {
        if e.kind() == ErrorKind::NotFound {
            CompareError::SourceNotFound {
                label: label.to_string(),
                path: path.display().to_string(),
            }
        } else {
            CompareError::Io {
                path: path.display().to_string(),
                message: e.to_string(),
            }
        }
    })
}

/// Empty cells and the `MISSING_TOKENS` spellings.
pub fn is_missing(cell: &str) -> bool {
    cell.is_empty() || MISSING_TOKENS.contains(&cell)
}

/// Parses the timestamp layouts seen in the station exports.
pub fn parse_timestamp(cell: &str) -> Option<NaiveDateTime> {
    for format in TIMESTAMP_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(cell, format) {
            return Some(ts);
        }
    }
    NaiveDate::parse_from_str(cell, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_csv(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = File::create(&path).expect("create fixture");
        file.write_all(content.as_bytes()).expect("write fixture");
        path
    }

    #[test]
    fn test_read_parses_numbers_missing_and_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            &dir,
            "benin.csv",
            "Timestamp,GHI,DNI,Comments\n\
             2021-08-09 00:01,1.5,,dusty\n\
             2021-08-09 00:02,NaN,2.0,\n",
        );
        let (columns, rows) = read_source_csv(&path, "Benin").unwrap();

        assert_eq!(columns, vec!["Timestamp", "GHI", "DNI", "Comments"]);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].source, "Benin");
        assert_eq!(rows[0].value("GHI"), Some(1.5));
        assert_eq!(rows[0].value("DNI"), None);
        assert_eq!(rows[0].text.get("Comments").map(String::as_str), Some("dusty"));
        assert_eq!(rows[1].value("GHI"), None, "NaN token must be missing, not a number");
        assert_eq!(
            rows[1].timestamp,
            NaiveDateTime::parse_from_str("2021-08-09 00:02:00", "%Y-%m-%d %H:%M:%S").ok()
        );
    }

    #[test]
    fn test_existing_country_column_is_replaced_by_label() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(&dir, "togo.csv", "GHI,country\n5,Elsewhere\n");
        let (columns, rows) = read_source_csv(&path, "Togo").unwrap();
        assert_eq!(columns, vec!["GHI"]);
        assert_eq!(rows[0].source, "Togo");
        assert!(rows[0].text.is_empty());
    }

    #[test]
    fn test_ragged_rows_are_tolerated() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(&dir, "short.csv", "GHI,DNI,DHI\n1,2\n3,4,5\n");
        let (_, rows) = read_source_csv(&path, "A").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].value("DHI"), None);
        assert_eq!(rows[1].value("DHI"), Some(5.0));
    }

    #[test]
    fn test_missing_file_is_source_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let result = read_source_csv(&dir.path().join("absent.csv"), "Togo");
        assert!(
            matches!(result, Err(CompareError::SourceNotFound { ref label, .. }) if label == "Togo"),
            "got {:?}",
            result
        );
    }

    #[test]
    fn test_skip_policy_omits_missing_sources() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_csv(&dir, "a.csv", "GHI\n1\n2\n");
        let c = write_csv(&dir, "c.csv", "GHI,DNI\n3,30\n");
        let mut map = SourceMap::new();
        map.insert("A", a);
        map.insert("B", dir.path().join("b.csv"));
        map.insert("C", c);

        let table = load_sources(&map, MissingSourcePolicy::Skip).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.source_labels(), vec!["A", "C"]);
        assert_eq!(table.columns, vec!["GHI", "DNI"]);
        assert_eq!(table.metric_values("A", "DNI"), Vec::<f64>::new());
    }

    #[test]
    fn test_fail_fast_policy_reports_missing_source() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_csv(&dir, "a.csv", "GHI\n1\n");
        let mut map = SourceMap::new();
        map.insert("A", a);
        map.insert("B", dir.path().join("b.csv"));

        let result = load_sources(&map, MissingSourcePolicy::FailFast);
        assert!(matches!(result, Err(CompareError::SourceNotFound { ref label, .. }) if label == "B"));
    }

    #[test]
    fn test_no_sources_yields_empty_table() {
        let dir = tempfile::tempdir().unwrap();
        let mut map = SourceMap::new();
        map.insert("A", dir.path().join("a.csv"));
        let table = load_sources(&map, MissingSourcePolicy::Skip).unwrap();
        assert!(table.is_empty());
        assert!(table.source_labels().is_empty());
    }

    #[test]
    fn test_parse_timestamp_layouts() {
        assert!(parse_timestamp("2021-08-09 00:01:00").is_some());
        assert!(parse_timestamp("2021-08-09T00:01:00").is_some());
        assert!(parse_timestamp("2021-08-09").is_some());
        assert!(parse_timestamp("yesterday").is_none());
    }
}
