//! Assignment policies.
//!
//! Two interchangeable strategies decide where terminals go each window:
//!
//! - **LCA** (least-collision assignment): a closed-form heuristic on the
//!   expected usable capacity `(1 - failure_rate) * bits_per_rb * num_rbs`
//!   of each sub-band, computed here as a pure planning function;
//! - **RLA** (learning assignment): defers to an attached policy oracle
//!   through an epsilon-greedy exploration rule (see the scheduler).
//!
//! The proportional LCA path reconciles rounding with the largest-remainder
//! method, so the planned bucket sizes always sum to exactly the terminal
//! count.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{SubBandId, TerminalId};

use super::stats::WindowStatistics;

/// Which assignment policy the scheduler runs.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlgorithmType {
    /// Least-collision heuristic assignment.
    #[default]
    Lca,
    /// Policy-delegated (reinforcement-learning) assignment.
    Rla,
}

/// Expected usable capacity of a sub-band.
pub fn sub_band_metric(failure_rate: f64, avg_bits_per_rb: f64, num_rbs: u16) -> f64 {
    (1.0 - failure_rate) * avg_bits_per_rb * f64::from(num_rbs)
}

/// Plan the LCA assignment for one window.
///
/// With at most `max_scheduled` terminals, every terminal goes to the
/// sub-band with the strictly maximal capacity metric (first in ascending id
/// order wins ties). With more terminals than one sub-band can schedule per
/// slot, terminals are distributed proportionally to the metrics, buckets
/// reconciled by largest remainder, terminals taken in snapshot order and
/// sub-bands filled in ascending id order.
pub fn lca_assignments(
    stats: &WindowStatistics,
    num_rbs: &BTreeMap<SubBandId, u16>,
    max_scheduled: u32,
) -> Vec<(TerminalId, SubBandId)> {
    if stats.terminals.is_empty() || stats.sub_bands.is_empty() {
        return Vec::new();
    }

    let metrics: Vec<(SubBandId, f64)> = stats
        .sub_bands
        .iter()
        .map(|band| {
            let rbs = num_rbs.get(&band.id).copied().unwrap_or(0);
            (
                band.id,
                sub_band_metric(band.failure_rate, band.avg_bits_per_rb, rbs),
            )
        })
        .collect();

    if stats.terminals.len() as u32 <= max_scheduled {
        // Everyone fits on the best sub-band.
        let mut best = metrics[0].0;
        let mut best_metric = 0.0;
        for &(id, metric) in &metrics {
            if metric > best_metric {
                best_metric = metric;
                best = id;
            }
        }
        return stats.terminals.iter().map(|t| (t.id, best)).collect();
    }

    let weights: Vec<f64> = metrics.iter().map(|&(_, m)| m).collect();
    let buckets = largest_remainder(&weights, stats.terminals.len());

    let mut assignments = Vec::with_capacity(stats.terminals.len());
    let mut terminals = stats.terminals.iter();
    for (&(band, _), &bucket) in metrics.iter().zip(&buckets) {
        for _ in 0..bucket {
            match terminals.next() {
                Some(t) => assignments.push((t.id, band)),
                None => return assignments,
            }
        }
    }
    assignments
}

/// Apportion `total` units across `weights` with the largest-remainder
/// method: floor every exact quota, then hand the leftover units to the
/// largest fractional parts (ties to the lower index). Non-positive total
/// weight degrades to an even split with the remainder on the first entries.
fn largest_remainder(weights: &[f64], total: usize) -> Vec<usize> {
    let n = weights.len();
    let sum: f64 = weights.iter().sum();
    if sum <= 0.0 {
        let base = total / n;
        let rem = total % n;
        return (0..n).map(|i| base + usize::from(i < rem)).collect();
    }

    let quotas: Vec<f64> = weights.iter().map(|w| total as f64 * w / sum).collect();
    let mut buckets: Vec<usize> = quotas.iter().map(|q| q.floor() as usize).collect();
    let assigned: usize = buckets.iter().sum();

    let mut by_fraction: Vec<usize> = (0..n).collect();
    by_fraction.sort_by(|&a, &b| {
        let fa = quotas[a] - quotas[a].floor();
        let fb = quotas[b] - quotas[b].floor();
        fb.partial_cmp(&fa).unwrap_or(std::cmp::Ordering::Equal).then(a.cmp(&b))
    });
    for &idx in by_fraction.iter().take(total - assigned) {
        buckets[idx] += 1;
    }
    buckets
}

/// Epsilon-greedy exploration schedule: `epsilon <- max(epsilon * decay,
/// floor)`, applied exactly once per decision window.
#[derive(Clone, Copy, Debug)]
pub struct EpsilonSchedule {
    epsilon: f64,
    floor: f64,
    decay: f64,
}

impl EpsilonSchedule {
    /// Create a schedule starting at `epsilon`.
    pub fn new(epsilon: f64, floor: f64, decay: f64) -> Self {
        Self {
            epsilon,
            floor,
            decay,
        }
    }

    /// Current exploration probability.
    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Decay toward the floor; returns the new value.
    pub fn advance(&mut self) -> f64 {
        self.epsilon = (self.epsilon * self.decay).max(self.floor);
        self.epsilon
    }
}
