//! The shared comparison pipeline.
//!
//! Load → summarize → (rank, test). The batch report and the dashboard both
//! call `ComparisonPipeline::run` and differ only in the missing-source
//! policy they pass in and in how they render the outcome.

use crate::analysis::hypothesis::{self, HypothesisReport};
use crate::analysis::ranking::{self, Ranking};
use crate::analysis::summary::{self, SummaryTable};
use crate::config::CompareConfig;
use crate::ingest::{load_sources, MissingSourcePolicy};
use crate::logging::{self, Component};
use crate::model::{CompareError, UnifiedTable};
use crate::sources::SourceMap;

/// Everything one run produces.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonOutcome {
    /// Labels requested, in mapping order, whether or not they loaded.
    pub requested: Vec<String>,
    pub table: UnifiedTable,
    pub summary: SummaryTable,
    pub tests: HypothesisReport,
    /// Ranking of the test metric's group means.
    pub ranking: Ranking,
}

impl ComparisonOutcome {
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Labels that actually contributed rows.
    pub fn loaded_labels(&self) -> Vec<String> {
        self.summary.rows.iter().map(|r| r.label.clone()).collect()
    }

    /// Ranking for any summarized metric.
    pub fn ranking_for(&self, metric: &str) -> Ranking {
        ranking::rank_descending(metric, self.summary.means(metric))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonPipeline {
    pub sources: SourceMap,
    pub metrics: Vec<String>,
    pub test_metric: String,
    pub policy: MissingSourcePolicy,
}

impl ComparisonPipeline {
    pub fn new(
        sources: SourceMap,
        metrics: Vec<String>,
        test_metric: &str,
        policy: MissingSourcePolicy,
    ) -> Self {
        Self {
            sources,
            metrics,
            test_metric: test_metric.to_string(),
            policy,
        }
    }

    pub fn from_config(config: &CompareConfig, policy: MissingSourcePolicy) -> Self {
        Self::new(config.source_map(), config.metrics.clone(), &config.test_metric, policy)
    }

    pub fn run(&self) -> Result<ComparisonOutcome, CompareError> {
        let table = load_sources(&self.sources, self.policy)?;
        Ok(self.analyze(table))
    }

    /// Runs every stage after loading on a table the caller already holds.
    /// The dashboard passes its loaded table narrowed to the selected sources.
    pub fn analyze(&self, table: UnifiedTable) -> ComparisonOutcome {
        let summary = summary::summarize(&table, &self.metrics);
        logging::debug(
            Component::Aggregator,
            None,
            &format!("summarized {} sources over {:?}", summary.rows.len(), self.metrics),
        );

        let ranking = ranking::rank_descending(&self.test_metric, summary.means(&self.test_metric));
        let tests = hypothesis::run_tests(&table, &self.test_metric);

        ComparisonOutcome {
            requested: self.sources.labels(),
            table,
            summary,
            tests,
            ranking,
        }
    }
}
