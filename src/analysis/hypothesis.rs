//! Significance tests across sources.
//!
//! Partitions one metric's values by source label and runs two independent
//! tests over the partitions:
//!
//! - one-way ANOVA (parametric, compares group means), and
//! - the Kruskal-Wallis H-test (rank-based, no normality assumption).
//!
//! Degenerate input never panics and never produces a made-up number: each
//! test reports `TestOutcome::Unavailable` with the reason instead. The two
//! tests are always both attempted.

use serde::Serialize;
use statrs::distribution::{ChiSquared, ContinuousCDF, FisherSnedecor};
use std::fmt;

use super::mean;
use crate::logging::{self, Component};
use crate::model::UnifiedTable;

// ---------------------------------------------------------------------------
// Outcome types
// ---------------------------------------------------------------------------

/// Why a test could not be computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UnavailableReason {
    /// Fewer than two non-empty groups were supplied.
    TooFewGroups,
    /// At least one group had no values once missing cells were dropped.
    EmptyGroup,
    /// Every group has one value, leaving no within-group degrees of freedom.
    TooFewObservations,
    /// All groups are constant, so within-group variance is zero.
    ZeroVariance,
    /// Every pooled value is identical; ranks carry no information.
    AllValuesTied,
    /// The computation produced NaN or infinity.
    NonFinite,
}

impl fmt::Display for UnavailableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnavailableReason::TooFewGroups => write!(f, "fewer than two groups"),
            UnavailableReason::EmptyGroup => write!(f, "a group has no values"),
            UnavailableReason::TooFewObservations => write!(f, "not enough observations"),
            UnavailableReason::ZeroVariance => write!(f, "zero within-group variance"),
            UnavailableReason::AllValuesTied => write!(f, "all values are identical"),
            UnavailableReason::NonFinite => write!(f, "result is not finite"),
        }
    }
}

/// Result of one test: either a statistic with its p-value, or a reason it
/// could not be computed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TestOutcome {
    Computed { statistic: f64, p_value: f64 },
    Unavailable { reason: UnavailableReason },
}

impl TestOutcome {
    fn unavailable(reason: UnavailableReason) -> Self {
        TestOutcome::Unavailable { reason }
    }

    fn computed(statistic: f64, p_value: f64) -> Self {
        if statistic.is_finite() && p_value.is_finite() {
            TestOutcome::Computed { statistic, p_value }
        } else {
            TestOutcome::unavailable(UnavailableReason::NonFinite)
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, TestOutcome::Computed { .. })
    }

    pub fn p_value(&self) -> Option<f64> {
        match self {
            TestOutcome::Computed { p_value, .. } => Some(*p_value),
            TestOutcome::Unavailable { .. } => None,
        }
    }

    pub fn statistic(&self) -> Option<f64> {
        match self {
            TestOutcome::Computed { statistic, .. } => Some(*statistic),
            TestOutcome::Unavailable { .. } => None,
        }
    }
}

/// The two test kinds, with their display names and statistic symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestKind {
    Anova,
    KruskalWallis,
}

impl TestKind {
    pub fn name(&self) -> &'static str {
        match self {
            TestKind::Anova => "ANOVA",
            TestKind::KruskalWallis => "Kruskal–Wallis",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            TestKind::Anova => "F",
            TestKind::KruskalWallis => "H",
        }
    }
}

/// Both test outcomes for one metric, plus the per-source means sorted
/// descending (unrounded).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HypothesisReport {
    pub metric: String,
    pub groups: Vec<String>,
    pub anova: TestOutcome,
    pub kruskal: TestOutcome,
    pub means_desc: Vec<(String, f64)>,
}

impl HypothesisReport {
    pub fn outcome(&self, kind: TestKind) -> &TestOutcome {
        match kind {
            TestKind::Anova => &self.anova,
            TestKind::KruskalWallis => &self.kruskal,
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Runs both tests on `metric`, grouping by source label in first-appearance
/// order.
pub fn run_tests(table: &UnifiedTable, metric: &str) -> HypothesisReport {
    let groups = table.source_labels();
    let samples: Vec<Vec<f64>> = groups
        .iter()
        .map(|label| table.metric_values(label, metric))
        .collect();

    let anova = one_way_anova(&samples);
    let kruskal = kruskal_wallis(&samples);

    for (kind, outcome) in [(TestKind::Anova, &anova), (TestKind::KruskalWallis, &kruskal)] {
        match outcome {
            TestOutcome::Computed { statistic, p_value } => logging::debug(
                Component::Tester,
                None,
                &format!("{} on {}: {}={:.4}, p={:e}", kind.name(), metric, kind.symbol(), statistic, p_value),
            ),
            TestOutcome::Unavailable { reason } => logging::warn(
                Component::Tester,
                None,
                &format!("{} on {} unavailable: {}", kind.name(), metric, reason),
            ),
        }
    }

    let mut means_desc: Vec<(String, f64)> = groups
        .iter()
        .zip(&samples)
        .filter_map(|(label, values)| mean(values).map(|m| (label.clone(), m)))
        .collect();
    means_desc.sort_by(|a, b| b.1.total_cmp(&a.1));

    HypothesisReport {
        metric: metric.to_string(),
        groups,
        anova,
        kruskal,
        means_desc,
    }
}

// ---------------------------------------------------------------------------
// One-way ANOVA
// ---------------------------------------------------------------------------

fn check_groups(groups: &[Vec<f64>]) -> Result<(), UnavailableReason> {
    if groups.len() < 2 {
        return Err(UnavailableReason::TooFewGroups);
    }
    if groups.iter().any(|g| g.is_empty()) {
        return Err(UnavailableReason::EmptyGroup);
    }
    Ok(())
}

/// One-way ANOVA: F = MS_between / MS_within on (k − 1, N − k) degrees of
/// freedom; the p-value is the upper tail of the F distribution.
pub fn one_way_anova(groups: &[Vec<f64>]) -> TestOutcome {
    if let Err(reason) = check_groups(groups) {
        return TestOutcome::unavailable(reason);
    }

    let k = groups.len();
    let n: usize = groups.iter().map(Vec::len).sum();
    if n <= k {
        return TestOutcome::unavailable(UnavailableReason::TooFewObservations);
    }

    // exact comparison; a float mean of constant decimals leaves rounding
    // noise in the within-group sum of squares
    if groups.iter().all(|g| g.iter().all(|v| *v == g[0])) {
        return TestOutcome::unavailable(UnavailableReason::ZeroVariance);
    }

    let grand_mean = groups.iter().flatten().sum::<f64>() / n as f64;

    let mut ss_between = 0.0;
    let mut ss_within = 0.0;
    for group in groups {
        let group_mean = group.iter().sum::<f64>() / group.len() as f64;
        ss_between += group.len() as f64 * (group_mean - grand_mean).powi(2);
        ss_within += group.iter().map(|v| (v - group_mean).powi(2)).sum::<f64>();
    }

    let df_between = (k - 1) as f64;
    let df_within = (n - k) as f64;
    let f_stat = (ss_between / df_between) / (ss_within / df_within);

    match FisherSnedecor::new(df_between, df_within) {
        Ok(dist) => TestOutcome::computed(f_stat, dist.sf(f_stat)),
        Err(_) => TestOutcome::unavailable(UnavailableReason::NonFinite),
    }
}

// ---------------------------------------------------------------------------
// Kruskal-Wallis H-test
// ---------------------------------------------------------------------------

/// Average ranks (1-based) of `values`, with ties sharing the mean of the
/// positions they span. Also returns Σ(t³ − t) over tie groups.
fn average_ranks(values: &[f64]) -> (Vec<f64>, f64) {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; values.len()];
    let mut tie_sum = 0.0;
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && values[order[j + 1]] == values[order[i]] {
            j += 1;
        }
        // positions i..=j share rank ((i+1) + (j+1)) / 2
        let rank = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            ranks[idx] = rank;
        }
        let t = (j - i + 1) as f64;
        tie_sum += t.powi(3) - t;
        i = j + 1;
    }
    (ranks, tie_sum)
}

/// Kruskal-Wallis H with tie correction; the p-value is the upper tail of
/// chi-squared on k − 1 degrees of freedom.
pub fn kruskal_wallis(groups: &[Vec<f64>]) -> TestOutcome {
    if let Err(reason) = check_groups(groups) {
        return TestOutcome::unavailable(reason);
    }

    let pooled: Vec<f64> = groups.iter().flatten().copied().collect();
    let n = pooled.len() as f64;
    let (ranks, tie_sum) = average_ranks(&pooled);

    let correction = 1.0 - tie_sum / (n.powi(3) - n);
    if correction <= 0.0 {
        return TestOutcome::unavailable(UnavailableReason::AllValuesTied);
    }

    let mut offset = 0;
    let mut rank_term = 0.0;
    for group in groups {
        let rank_sum: f64 = ranks[offset..offset + group.len()].iter().sum();
        rank_term += rank_sum.powi(2) / group.len() as f64;
        offset += group.len();
    }

    let h_raw = 12.0 / (n * (n + 1.0)) * rank_term - 3.0 * (n + 1.0);
    let h = (h_raw / correction).max(0.0);

    match ChiSquared::new((groups.len() - 1) as f64) {
        Ok(dist) => TestOutcome::computed(h, dist.sf(h)),
        Err(_) => TestOutcome::unavailable(UnavailableReason::NonFinite),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
