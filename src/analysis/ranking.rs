//! Ranking of sources by group mean.

use serde::Serialize;

/// One ranked source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankEntry {
    pub label: String,
    pub value: f64,
}

/// Sources ordered by value, highest first.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Ranking {
    pub metric: String,
    pub entries: Vec<RankEntry>,
}

impl Ranking {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn labels(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.label.as_str()).collect()
    }
}

/// Orders `(label, mean)` pairs descending by mean.
///
/// The sort is stable: equal means keep their input order.
pub fn rank_descending(metric: &str, means: Vec<(String, f64)>) -> Ranking {
    let mut entries: Vec<RankEntry> = means
        .into_iter()
        .map(|(label, value)| RankEntry { label, value })
        .collect();
    entries.sort_by(|a, b| b.value.total_cmp(&a.value));

    Ranking {
        metric: metric.to_string(),
        entries,
    }
}
