//! Read-only comparison of an admitted salary against its industry.

use serde::Serialize;

use crate::anomaly::SalaryStats;
use crate::types::{Industry, Record, RecordStatus};

/// Where a salary sits relative to its industry peers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Comparison {
    /// Industry compared against.
    pub industry: Industry,
    /// Non-rejected records in the industry (including the subject).
    pub sample_size: usize,
    /// Mean salary of the sample.
    pub industry_mean: f64,
    /// Percentage of the sample earning strictly less, rounded to an integer.
    pub percentile_rank: u8,
    /// `(salary - mean) / mean * 100`, one decimal place.
    pub delta_pct: f64,
}

/// Compare `salary` against non-rejected records of `industry`.
///
/// Returns `None` when the industry has no eligible records.
pub fn compare(salary: u64, industry: Industry, corpus: &[Record]) -> Option<Comparison> {
    let peers: Vec<u64> = corpus
        .iter()
        .filter(|r| r.industry == industry && r.status != RecordStatus::Rejected)
        .map(|r| r.salary)
        .collect();

    let stats = SalaryStats::from_salaries(peers.iter().copied())?;
    let below = peers.iter().filter(|&&s| s < salary).count();
    let percentile = (below as f64 / stats.count as f64 * 100.0).round();

    let delta_pct = if stats.mean > 0.0 {
        round_one_decimal((salary as f64 - stats.mean) / stats.mean * 100.0)
    } else {
        0.0
    };

    Some(Comparison {
        industry,
        sample_size: stats.count,
        industry_mean: stats.mean,
        percentile_rank: percentile.clamp(0.0, 100.0) as u8,
        delta_pct,
    })
}

fn round_one_decimal(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}
