//! Discrete time-shift search and waveform residuals.
//!
//! A shift of `k` samples compares observed sample `i` with synthetic sample
//! `i - k` (positive `k` delays the synthetic). Synthetic samples that fall
//! outside the trace are treated as zero.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// How the best shift of a component group is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ShiftStrategy {
    /// Maximise the weighted sum of cross-correlations, then score the
    /// residual at that shift.
    #[default]
    CrossCorrelation,
    /// Minimise the weighted residual directly.
    ResidualNorm,
}

/// One weighted observed/synthetic pair taking part in a shift search.
#[derive(Debug, Clone, Copy)]
pub struct ShiftPair<'a> {
    pub weight: f64,
    pub observed: &'a [f64],
    pub synthetic: &'a [f64],
}

#[inline]
fn shifted(s: &[f64], i: usize, k: isize) -> f64 {
    let j = i as isize - k;
    if j >= 0 && (j as usize) < s.len() {
        s[j as usize]
    } else {
        0.0
    }
}

/// `Σ_i (d[i] - s[i - k])²` (not yet scaled by the sample interval).
pub fn residual_sq(observed: &[f64], synthetic: &[f64], k: isize) -> f64 {
    observed
        .iter()
        .enumerate()
        .map(|(i, d)| {
            let r = d - shifted(synthetic, i, k);
            r * r
        })
        .sum()
}

/// `Σ_i d[i] s[i - k]`.
pub fn cross_correlation(observed: &[f64], synthetic: &[f64], k: isize) -> f64 {
    observed
        .iter()
        .enumerate()
        .map(|(i, d)| d * shifted(synthetic, i, k))
        .sum()
}

/// Candidate shifts ordered `0, -1, 1, -2, 2, …` so that strict-improvement
/// scanning prefers the smallest |shift|, then the negative one.
fn candidates(max_samples: usize) -> impl Iterator<Item = isize> {
    std::iter::once(0).chain((1..=max_samples as isize).flat_map(|k| [-k, k]))
}

/// Best shift (in samples) for a group of pairs sharing one shift.
pub fn best_shift(pairs: &[ShiftPair<'_>], max_samples: usize, strategy: ShiftStrategy) -> isize {
    let mut best_k = 0;
    let mut best_score = f64::NEG_INFINITY;
    for k in candidates(max_samples) {
        let score = match strategy {
            ShiftStrategy::CrossCorrelation => pairs
                .iter()
                .map(|p| p.weight * cross_correlation(p.observed, p.synthetic, k))
                .sum::<f64>(),
            ShiftStrategy::ResidualNorm => -pairs
                .iter()
                .map(|p| p.weight * residual_sq(p.observed, p.synthetic, k))
                .sum::<f64>(),
        };
        if score > best_score {
            best_score = score;
            best_k = k;
        }
    }
    best_k
}
