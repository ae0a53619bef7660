//! Cross-source statistics.
//!
//! Submodules:
//! - `summary`: grouped mean/median/std per metric (the summary table).
//! - `hypothesis`: one-way ANOVA and Kruskal-Wallis across sources.
//! - `ranking`: stable descending ordering of per-source means.
//!
//! The small descriptive helpers below are shared by all three and by the
//! cleaning pass. They take already-filtered samples: callers drop missing
//! values before calling in.

pub mod hypothesis;
pub mod ranking;
pub mod summary;

/// Decimal places used by every rendered number.
pub const DISPLAY_DECIMALS: i32 = 4;

/// Rounds to `DISPLAY_DECIMALS` places. Both report surfaces go through this
/// so they always show the same value.
pub fn round4(value: f64) -> f64 {
    let scale = 10f64.powi(DISPLAY_DECIMALS);
    (value * scale).round() / scale
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

pub fn median(values: &[f64]) -> Option<f64> {
    quantile(values, 0.5)
}

/// Linear-interpolation quantile (the "type 7" definition), `q` in [0, 1].
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * frac)
}

/// Standard deviation with `ddof` delta degrees of freedom.
///
/// `ddof = 1` gives the sample std used by the summary table; `ddof = 0`
/// gives the population std used for z-scores. Returns `None` when
/// `len <= ddof`.
pub fn std_dev(values: &[f64], ddof: usize) -> Option<f64> {
    if values.len() <= ddof {
        return None;
    }
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    Some((ss / (values.len() - ddof) as f64).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round4() {
        assert_eq!(round4(1.234_56), 1.2346);
        assert_eq!(round4(-0.000_04), -0.0);
        assert_eq!(round4(500.0), 500.0);
    }

    #[test]
    fn test_median_even_and_odd() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn test_quartiles_interpolate() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(quantile(&values, 0.25), Some(2.0));
        assert_eq!(quantile(&values, 0.75), Some(4.0));
        assert_eq!(quantile(&[1.0, 2.0], 0.25), Some(1.25));
    }

    #[test]
    fn test_std_dev_sample_vs_population() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_eq!(std_dev(&values, 0), Some(2.0));
        let sample = std_dev(&values, 1).unwrap();
        assert!((sample - 2.138_089_935).abs() < 1e-6);
        assert_eq!(std_dev(&[1.0], 1), None);
    }
}
