//! Source ingestion.
//!
//! Submodules:
//! - `csv_source`: reads labeled CSV files into the unified table, with an
//!   explicit policy for sources whose file does not exist.

pub mod csv_source;

pub use csv_source::{is_missing, load_sources, open_source, read_source_csv, MissingSourcePolicy};
