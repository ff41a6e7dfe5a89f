//! Quantile cutoffs over `gas_offered`.

use serde::{Deserialize, Serialize};

use crate::analysis::column::GasCategory;

/// Probability levels the gas buckets are split at.
pub const CUTOFF_LEVELS: [f64; 4] = [0.5, 0.75, 0.95, 0.99];

/// Quantile of already sorted data using linear interpolation between
/// closest ranks (`h = (n - 1) * p`).
///
/// Returns `None` for empty input or `p` outside `[0, 1]`.
pub fn quantile_sorted(sorted: &[f64], p: f64) -> Option<f64> {
    if sorted.is_empty() || !(0.0..=1.0).contains(&p) {
        return None;
    }

    let h = (sorted.len() - 1) as f64 * p;
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    let frac = h - lo as f64;

    Some(sorted[lo] + frac * (sorted[hi] - sorted[lo]))
}

/// Unsorted convenience wrapper around [`quantile_sorted`].
pub fn quantile(values: &[f64], p: f64) -> Option<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    quantile_sorted(&sorted, p)
}

/// The 50th/75th/95th/99th percentile of `gas_offered`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuantileCutoffs {
    pub q50: f64,
    pub q75: f64,
    pub q95: f64,
    pub q99: f64,
}

impl QuantileCutoffs {
    pub fn from_values(values: &[f64]) -> Option<Self> {
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        Some(Self {
            q50: quantile_sorted(&sorted, CUTOFF_LEVELS[0])?,
            q75: quantile_sorted(&sorted, CUTOFF_LEVELS[1])?,
            q95: quantile_sorted(&sorted, CUTOFF_LEVELS[2])?,
            q99: quantile_sorted(&sorted, CUTOFF_LEVELS[3])?,
        })
    }

    /// Pairs of `(level, cutoff)` in ascending order.
    pub fn levels(&self) -> [(f64, f64); 4] {
        [
            (CUTOFF_LEVELS[0], self.q50),
            (CUTOFF_LEVELS[1], self.q75),
            (CUTOFF_LEVELS[2], self.q95),
            (CUTOFF_LEVELS[3], self.q99),
        ]
    }

    /// `true` when two or more cutoffs coincide, leaving some buckets empty.
    pub fn is_degenerate(&self) -> bool {
        self.q50 == self.q75 || self.q75 == self.q95 || self.q95 == self.q99
    }

    /// Bucket for a gas offer.
    ///
    /// The first three cutoffs are inclusive upper bounds while the last is
    /// an exclusive one, so a value sitting exactly on q99 lands in the top
    /// bucket but one on q95 stays in the third. Checking in ascending
    /// order keeps the buckets exclusive when cutoffs coincide.
    pub fn categorize(&self, gas_offered: f64) -> GasCategory {
        if gas_offered <= self.q50 {
            GasCategory::Cat1
        } else if gas_offered <= self.q75 {
            GasCategory::Cat2
        } else if gas_offered <= self.q95 {
            GasCategory::Cat3
        } else if gas_offered < self.q99 {
            GasCategory::Cat4
        } else {
            GasCategory::Cat5
        }
    }
}
