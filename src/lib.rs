//! Cross-source comparison of solar irradiance datasets.
//!
//! One cleaned CSV per source (country) is loaded into a single table,
//! summarized per source, ranked by average GHI, and tested for
//! between-source differences with one-way ANOVA and Kruskal–Wallis. The
//! results are written as a markdown summary (`write_summary`) or browsed
//! in a terminal dashboard (`dashboard`). `clean_source` produces the
//! cleaned CSVs from raw station exports.

pub mod analysis;
pub mod cleaning;
pub mod config;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod report;
pub mod sources;
