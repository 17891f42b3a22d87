//! Loss metrics: the seven-statistic summary of one simulation.

use serde::{Deserialize, Serialize};

/// Summary over every run's total loss. Field names are persisted
/// and exported as-is; do not rename.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationMetrics {
    pub total_loss:         f64,
    pub mean_loss:          f64,
    pub median_loss:        f64,
    pub std_dev_loss:       f64,
    pub min_loss:           f64,
    pub max_loss:           f64,
    pub percentile_95_loss: f64,
}

/// Reduce per-run losses to the metric set.
///
/// Standard deviation is the population form (divide by N). The 95th
/// percentile interpolates linearly between the two closest ranks.
/// An empty sample yields all zeros.
pub fn aggregate(losses: &[f64]) -> SimulationMetrics {
    if losses.is_empty() {
        return SimulationMetrics::default();
    }

    let n = losses.len() as f64;
    let total_loss: f64 = losses.iter().sum();
    let mean_loss = total_loss / n;
    let variance = losses.iter().map(|x| (x - mean_loss).powi(2)).sum::<f64>() / n;

    let mut sorted = losses.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    SimulationMetrics {
        total_loss,
        mean_loss,
        median_loss:        percentile(&sorted, 0.50).unwrap_or_default(),
        std_dev_loss:       variance.sqrt(),
        min_loss:           sorted[0],
        max_loss:           sorted[sorted.len() - 1],
        percentile_95_loss: percentile(&sorted, 0.95).unwrap_or_default(),
    }
}

/// Linear-interpolated percentile of an ascending sample.
/// `p` is a fraction in [0, 1]. None for an empty sample.
pub fn percentile(sorted: &[f64], p: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let rank = p.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        return Some(sorted[lo]);
    }
    let w = rank - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * w)
}
