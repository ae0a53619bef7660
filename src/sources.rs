//! Source registry for the solar comparison service.
//!
//! Defines the default set of datasets compared by this service, the fixed
//! metric list used by the summary table, and the ancillary sensor columns
//! the cleaning pass knows about. This is the single source of truth for
//! labels and default file names; runtime code receives an explicit
//! `SourceMap` built from here (or from configuration) rather than reading
//! this table directly.

use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Metric names
// ---------------------------------------------------------------------------

/// Global Horizontal Irradiance (W/m²).
pub const METRIC_GHI: &str = "GHI";

/// Direct Normal Irradiance (W/m²).
pub const METRIC_DNI: &str = "DNI";

/// Diffuse Horizontal Irradiance (W/m²).
pub const METRIC_DHI: &str = "DHI";

/// Metrics summarized for every source, in report column order.
pub const DEFAULT_METRICS: &[&str] = &[METRIC_GHI, METRIC_DNI, METRIC_DHI];

/// Columns checked for z-score outliers and median-imputed during cleaning.
pub const CLEANING_KEY_COLUMNS: &[&str] = &[
    METRIC_GHI, METRIC_DNI, METRIC_DHI, "ModA", "ModB", "WS", "WSgust",
];

// ---------------------------------------------------------------------------
// Source metadata
// ---------------------------------------------------------------------------

/// Metadata for a single default dataset.
pub struct DefaultSource {
    /// Group label attached to every row from this dataset.
    pub label: &'static str,
    /// File name of the cleaned CSV inside the data directory.
    pub clean_file: &'static str,
}

/// Default datasets, in report order.
pub static SOURCE_REGISTRY: &[DefaultSource] = &[
    DefaultSource {
        label: "Benin",
        clean_file: "benin_clean.csv",
    },
    DefaultSource {
        label: "Togo",
        clean_file: "togo_clean.csv",
    },
    DefaultSource {
        label: "SierraLeone",
        clean_file: "sierraleone_clean.csv",
    },
];

// ---------------------------------------------------------------------------
// Source mapping
// ---------------------------------------------------------------------------

/// One label → file location entry.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceSpec {
    pub label: String,
    pub path: PathBuf,
}

/// Ordered mapping from source label to file location.
///
/// Iteration order is the order sources are loaded and reported in.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SourceMap {
    entries: Vec<SourceSpec>,
}

impl SourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the entry for `label`, keeping its original position
    /// on replacement.
    pub fn insert(&mut self, label: &str, path: impl Into<PathBuf>) {
        let path = path.into();
        match self.entries.iter_mut().find(|e| e.label == label) {
            Some(existing) => existing.path = path,
            None => self.entries.push(SourceSpec {
                label: label.to_string(),
                path,
            }),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &SourceSpec> {
        self.entries.iter()
    }

    pub fn labels(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.label.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, label: &str) -> Option<&SourceSpec> {
        self.entries.iter().find(|e| e.label == label)
    }

}

/// Builds the default mapping with every registry file resolved under
/// `data_dir`.
pub fn default_source_map(data_dir: &Path) -> SourceMap {
    let mut map = SourceMap::new();
    for source in SOURCE_REGISTRY {
        map.insert(source.label, data_dir.join(source.clean_file));
    }
    map
}

/// Returns `true` if `metric` is one of the selectable dashboard metrics.
pub fn is_known_metric(metric: &str) -> bool {
    DEFAULT_METRICS.contains(&metric)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
