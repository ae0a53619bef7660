//! Per-source cleaning pass.
//!
//! Turns a raw station export into the `*_clean.csv` file the comparison
//! loader reads:
//!
//! 1. describe-style statistics for every numeric column
//! 2. missing-value report, listing columns over 5 % missing
//! 3. z-score outlier flags (|z| > 3) for the key sensor columns
//! 4. median imputation of the key columns
//!
//! The cleaned file keeps every original column in order, with imputed key
//! columns, followed by one `<col>_zflag` column per flagged key column and a
//! final `any_z_outlier` column.

use std::path::Path;

use crate::analysis::{mean, median, std_dev};
use crate::ingest::{is_missing, open_source};
use crate::logging::{self, Component};
use crate::model::CompareError;
use crate::report::{format_fixed, write_output};
use crate::sources::CLEANING_KEY_COLUMNS;

/// Missing share above which a column is called out in the report.
pub const MISSING_PCT_THRESHOLD: f64 = 5.0;

/// |z| above this marks an outlier.
pub const Z_THRESHOLD: f64 = 3.0;

pub const ANY_OUTLIER_COLUMN: &str = "any_z_outlier";

// ---------------------------------------------------------------------------
// Raw table
// ---------------------------------------------------------------------------

/// A CSV held as text, so columns the cleaning pass does not touch are
/// written back exactly as read.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    /// One entry per data row, padded to `headers.len()`.
    pub records: Vec<Vec<String>>,
}

impl RawTable {
    pub fn read(path: &Path, label: &str) -> Result<Self, CompareError> {
        let file = open_source(path, label)?;
        let csv_error = |e: csv::Error| CompareError::Csv {
            path: path.display().to_string(),
            message: e.to_string(),
        };

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(file);
        let headers: Vec<String> = reader.headers().map_err(csv_error)?.iter().map(String::from).collect();

        let mut records = Vec::new();
        for result in reader.records() {
            let record = result.map_err(csv_error)?;
            let mut cells: Vec<String> = record.iter().take(headers.len()).map(String::from).collect();
            cells.resize(headers.len(), String::new());
            records.push(cells);
        }
        Ok(Self { headers, records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Parsed values of a column, or `None` if any present cell is not a
    /// number or the column has no values at all.
    pub fn numeric_column(&self, index: usize) -> Option<Vec<Option<f64>>> {
        let mut any = false;
        let mut values = Vec::with_capacity(self.records.len());
        for record in &self.records {
            let cell = record[index].as_str();
            if is_missing(cell) {
                values.push(None);
            } else {
                values.push(Some(cell.parse::<f64>().ok()?));
                any = true;
            }
        }
        any.then_some(values)
    }

    pub fn missing_count(&self, index: usize) -> usize {
        self.records.iter().filter(|r| is_missing(&r[index])).count()
    }

    pub fn write(&self, path: &Path) -> Result<(), CompareError> {
        let csv_error = |e: csv::Error| CompareError::Csv {
            path: path.display().to_string(),
            message: e.to_string(),
        };
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&self.headers).map_err(csv_error)?;
        for record in &self.records {
            writer.write_record(record).map_err(csv_error)?;
        }
        let bytes = writer.into_inner().map_err(|e| CompareError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        write_output(path, &String::from_utf8_lossy(&bytes))
    }
}

fn present(values: &[Option<f64>]) -> Vec<f64> {
    values.iter().flatten().copied().collect()
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDescription {
    pub column: String,
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MissingEntry {
    pub column: String,
    pub count: usize,
    pub pct: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MissingReport {
    /// Every column, header order.
    pub entries: Vec<MissingEntry>,
    /// Columns over the threshold, most-missing first.
    pub over_threshold: Vec<MissingEntry>,
}

/// Describe-style statistics for each numeric column (sample std).
pub fn describe(table: &RawTable) -> Vec<ColumnDescription> {
    (0..table.headers.len())
        .filter_map(|i| {
            let values = present(&table.numeric_column(i)?);
            Some(ColumnDescription {
                column: table.headers[i].clone(),
                count: values.len(),
                mean: mean(&values),
                std: std_dev(&values, 1),
                min: values.iter().copied().reduce(f64::min),
                max: values.iter().copied().reduce(f64::max),
            })
        })
        .collect()
}

pub fn missing_report(table: &RawTable) -> MissingReport {
    let total = table.len();
    let entries: Vec<MissingEntry> = table
        .headers
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let count = table.missing_count(i);
            let pct = if total == 0 { 0.0 } else { count as f64 * 100.0 / total as f64 };
            MissingEntry { column: name.clone(), count, pct }
        })
        .collect();

    let mut over_threshold: Vec<MissingEntry> = entries
        .iter()
        .filter(|e| e.pct > MISSING_PCT_THRESHOLD)
        .cloned()
        .collect();
    over_threshold.sort_by(|a, b| b.pct.total_cmp(&a.pct));

    MissingReport { entries, over_threshold }
}

/// |z| > 3 flags over the median-filled column, population std.
///
/// A column with no spread flags nothing.
pub fn zscore_flags(values: &[Option<f64>]) -> Vec<bool> {
    let observed = present(values);
    let Some(fill) = median(&observed) else {
        return vec![false; values.len()];
    };
    let filled: Vec<f64> = values.iter().map(|v| v.unwrap_or(fill)).collect();
    let (Some(mu), Some(sigma)) = (mean(&filled), std_dev(&filled, 0)) else {
        return vec![false; values.len()];
    };
    if sigma == 0.0 || !sigma.is_finite() {
        return vec![false; values.len()];
    }
    filled.iter().map(|v| ((v - mu) / sigma).abs() > Z_THRESHOLD).collect()
}

// ---------------------------------------------------------------------------
// Cleaning
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct CleaningResult {
    pub label: String,
    pub rows: usize,
    pub description: Vec<ColumnDescription>,
    pub missing: MissingReport,
    /// (column, flagged row count) for each key column present.
    pub outliers: Vec<(String, usize)>,
    /// (column, median used) for each imputed key column.
    pub medians: Vec<(String, f64)>,
    pub cleaned: RawTable,
}

/// Runs the full cleaning pass on an already-read table.
pub fn clean_table(label: &str, raw: &RawTable) -> CleaningResult {
    let description = describe(raw);
    let missing = missing_report(raw);

    let key_columns: Vec<(usize, Vec<Option<f64>>)> = CLEANING_KEY_COLUMNS
        .iter()
        .filter_map(|name| {
            let index = raw.column_index(name)?;
            Some((index, raw.numeric_column(index)?))
        })
        .collect();

    // flags are computed before imputation
    let mut cleaned = raw.clone();
    let mut outliers = Vec::new();
    let mut flag_columns: Vec<Vec<bool>> = Vec::new();
    for (index, values) in &key_columns {
        let flags = zscore_flags(values);
        outliers.push((raw.headers[*index].clone(), flags.iter().filter(|f| **f).count()));
        cleaned.headers.push(format!("{}_zflag", raw.headers[*index]));
        flag_columns.push(flags);
    }
    cleaned.headers.push(ANY_OUTLIER_COLUMN.to_string());

    let mut medians = Vec::new();
    for (index, values) in &key_columns {
        let Some(fill) = median(&present(values)) else {
            continue;
        };
        medians.push((raw.headers[*index].clone(), fill));
        for (record, value) in cleaned.records.iter_mut().zip(values) {
            if value.is_none() {
                record[*index] = fill.to_string();
            }
        }
    }

    for (row, record) in cleaned.records.iter_mut().enumerate() {
        let mut any = false;
        for flags in &flag_columns {
            any |= flags[row];
            record.push(bool_cell(flags[row]));
        }
        record.push(bool_cell(any));
    }

    CleaningResult {
        label: label.to_string(),
        rows: raw.len(),
        description,
        missing,
        outliers,
        medians,
        cleaned,
    }
}

fn bool_cell(flag: bool) -> String {
    let text = if flag { "True" } else { "False" };
    text.to_string()
}

fn opt_fixed(value: Option<f64>) -> String {
    value.map(format_fixed).unwrap_or_else(|| "-".to_string())
}

pub fn render_report(result: &CleaningResult) -> String {
    let mut out = vec![
        format!("Cleaning report: {}", result.label),
        format!("Rows: {}", result.rows),
        String::new(),
        "Summary statistics (numeric columns)".to_string(),
        format!("{:<16} {:>8} {:>14} {:>14} {:>14} {:>14}", "column", "count", "mean", "std", "min", "max"),
    ];
    for d in &result.description {
        out.push(format!(
            "{:<16} {:>8} {:>14} {:>14} {:>14} {:>14}",
            d.column,
            d.count,
            opt_fixed(d.mean),
            opt_fixed(d.std),
            opt_fixed(d.min),
            opt_fixed(d.max)
        ));
    }

    out.push(String::new());
    out.push("Missing values".to_string());
    out.push(format!("{:<16} {:>13} {:>11}", "column", "missing_count", "missing_pct"));
    for e in &result.missing.entries {
        out.push(format!("{:<16} {:>13} {:>11.2}", e.column, e.count, e.pct));
    }

    out.push(String::new());
    out.push(format!("Columns with > {}% missing", MISSING_PCT_THRESHOLD));
    if result.missing.over_threshold.is_empty() {
        out.push("  none".to_string());
    }
    for e in &result.missing.over_threshold {
        out.push(format!("  {}: {} ({:.2}%)", e.column, e.count, e.pct));
    }

    out.push(String::new());
    out.push(format!("Z-score outliers (|z| > {})", Z_THRESHOLD));
    for (column, count) in &result.outliers {
        out.push(format!("  {}: {}", column, count));
    }

    out.push(String::new());
    out.push("Median imputation".to_string());
    for (column, value) in &result.medians {
        out.push(format!("  {}: {}", column, format_fixed(*value)));
    }

    out.join("\n") + "\n"
}

/// Reads `input`, cleans it, writes the cleaned CSV to `output` and, when
/// given, the text report to `report_path`.
pub fn clean_file(
    label: &str,
    input: &Path,
    output: &Path,
    report_path: Option<&Path>,
) -> Result<CleaningResult, CompareError> {
    let raw = RawTable::read(input, label)?;
    logging::info(
        Component::Cleaning,
        Some(label),
        &format!("read {} rows, {} columns from {}", raw.len(), raw.headers.len(), input.display()),
    );

    let result = clean_table(label, &raw);
    for e in &result.missing.over_threshold {
        logging::warn(
            Component::Cleaning,
            Some(label),
            &format!("{} is {:.2}% missing", e.column, e.pct),
        );
    }

    result.cleaned.write(output)?;
    logging::info(Component::Cleaning, Some(label), &format!("Wrote {}", output.display()));

    if let Some(path) = report_path {
        write_output(path, &render_report(&result))?;
        logging::info(Component::Cleaning, Some(label), &format!("Wrote {}", path.display()));
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn table(csv_text: &str) -> RawTable {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("raw.csv");
        fs::write(&path, csv_text).unwrap();
        RawTable::read(&path, "Togo").unwrap()
    }

    #[test]
    fn test_zscore_flags_single_spike() {
        let mut values: Vec<Option<f64>> = vec![Some(10.0); 20];
        values.push(Some(1000.0));
        let flags = zscore_flags(&values);
        assert_eq!(flags.iter().filter(|f| **f).count(), 1);
        assert!(flags[20]);
    }

    #[test]
    fn test_zscore_flags_constant_and_empty_columns() {
        assert_eq!(zscore_flags(&[Some(3.0), Some(3.0), None]), vec![false, false, false]);
        assert_eq!(zscore_flags(&[None, None]), vec![false, false]);
    }

    #[test]
    fn test_missing_report_threshold() {
        let mut text = String::from("Timestamp,GHI,Comments\n");
        for i in 0..20 {
            let ghi = if i == 0 { String::new() } else { i.to_string() };
            text.push_str(&format!("2021-08-09 00:{:02},{},\n", i, ghi));
        }
        let report = missing_report(&table(&text));
        assert_eq!(report.entries[1].count, 1);
        assert!((report.entries[1].pct - 5.0).abs() < 1e-12);
        // exactly 5% is not over the threshold
        let over: Vec<&str> = report.over_threshold.iter().map(|e| e.column.as_str()).collect();
        assert_eq!(over, vec!["Comments"]);
    }

    #[test]
    fn test_clean_table_imputes_and_appends_flags() {
        let raw = table("Timestamp,GHI,DNI,Comments\nt1,1,5,a\nt2,,7,\nt3,3,,b\n");
        let result = clean_table("Togo", &raw);

        assert_eq!(
            result.cleaned.headers,
            vec!["Timestamp", "GHI", "DNI", "Comments", "GHI_zflag", "DNI_zflag", "any_z_outlier"]
        );
        assert_eq!(result.cleaned.records[1][1], "2");
        assert_eq!(result.cleaned.records[2][2], "6");
        assert_eq!(result.cleaned.records[1][3], "");
        assert_eq!(result.cleaned.records[0][6], "False");
        assert_eq!(result.medians, vec![("GHI".to_string(), 2.0), ("DNI".to_string(), 6.0)]);
    }

    #[test]
    fn test_describe_skips_text_columns() {
        let raw = table("GHI,Comments\n1,x\n2,y\n3,\n");
        let description = describe(&raw);
        assert_eq!(description.len(), 1);
        assert_eq!(description[0].count, 3);
        assert_eq!(description[0].std, Some(1.0));
    }

    #[test]
    fn test_report_lists_missing_counts_for_every_column() {
        let raw = table("Timestamp,GHI,Comments\nt1,1,\nt2,,\nt3,3,\nt4,4,ok\n");
        let report = render_report(&clean_table("Togo", &raw));

        let section: Vec<Vec<&str>> = report
            .lines()
            .skip_while(|l| *l != "Missing values")
            .skip(2)
            .take(3)
            .map(|l| l.split_whitespace().collect())
            .collect();
        assert_eq!(section[0], vec!["Timestamp", "0", "0.00"]);
        assert_eq!(section[1], vec!["GHI", "1", "25.00"]);
        assert_eq!(section[2], vec!["Comments", "3", "75.00"]);
        assert!(report.contains("  Comments: 3 (75.00%)"));
    }

    #[test]
    fn test_clean_file_writes_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("togo.csv");
        let output = dir.path().join("data").join("togo_clean.csv");
        let report = dir.path().join("outputs").join("togo").join("report.txt");

        let mut text = String::from("GHI,WS\n");
        for _ in 0..20 {
            text.push_str("100,2\n");
        }
        text.push_str("5000,\n");
        fs::write(&input, text).unwrap();

        let result = clean_file("Togo", &input, &output, Some(&report)).unwrap();
        assert_eq!(result.outliers, vec![("GHI".to_string(), 1), ("WS".to_string(), 0)]);

        let cleaned = fs::read_to_string(&output).unwrap();
        assert!(cleaned.starts_with("GHI,WS,GHI_zflag,WS_zflag,any_z_outlier\n"));
        assert!(cleaned.contains("5000,2,True,False,True\n"));
        assert!(fs::read_to_string(&report).unwrap().contains("GHI: 1"));
    }

    #[test]
    fn test_missing_cells_agree_with_loader() {
        use crate::ingest::csv_source::MISSING_TOKENS;
        use crate::ingest::read_source_csv;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("raw.csv");
        let mut text = String::from("GHI\n");
        for token in MISSING_TOKENS {
            text.push_str(&format!("{}\n", token));
        }
        text.push_str("5\n");
        fs::write(&path, text).unwrap();

        let raw = RawTable::read(&path, "Togo").unwrap();
        let (_, rows) = read_source_csv(&path, "Togo").unwrap();
        let loader_missing = rows.iter().filter(|r| r.value("GHI").is_none()).count();

        assert_eq!(raw.missing_count(0), MISSING_TOKENS.len());
        assert_eq!(loader_missing, raw.missing_count(0));
    }

    #[test]
    fn test_missing_input_is_source_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = clean_file("Togo", &dir.path().join("nope.csv"), &dir.path().join("out.csv"), None);
        assert!(matches!(err, Err(CompareError::SourceNotFound { .. })));
    }
}
