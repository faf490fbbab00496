//! Window statistics snapshots.
//!
//! A [`WindowStatistics`] is rebuilt from scratch at every decision boundary
//! and handed to whichever assignment policy is active. Two aging rules
//! matter:
//!
//! - per-sub-band `avg_bits_per_rb` is an exponential moving average carried
//!   *across* windows (0.9 previous / 0.1 fresh sample);
//! - per-sub-band throughput/collision counters are *rolling*: they
//!   accumulate during a window and are zeroed after the decision.

use crate::types::{SubBandId, TerminalId};

/// Seed for the per-sub-band bits-per-RB moving average before the first
/// sample arrives.
pub const INITIAL_BITS_PER_RB: f64 = 20.0;

/// Per-sub-band figures for one decision window.
#[derive(Clone, Debug)]
pub struct SubBandSnapshot {
    /// Sub-band identifier.
    pub id: SubBandId,
    /// Smoothed access-failure rate from the channel-access layer.
    pub failure_rate: f64,
    /// Smoothed coexisting-traffic occupancy.
    pub occupancy: f64,
    /// Contention window at collection time.
    pub contention_window: u16,
    /// Cross-window moving average of bits per resource block.
    pub avg_bits_per_rb: f64,
    /// Throughput accumulated in this window (rolling).
    pub total_throughput: f64,
    /// Collisions accumulated in this window (rolling).
    pub total_collisions: u32,
}

impl SubBandSnapshot {
    /// Fresh per-band state with the moving average at its seed value.
    pub fn new(id: SubBandId) -> Self {
        Self {
            id,
            failure_rate: 0.0,
            occupancy: 0.0,
            contention_window: 0,
            avg_bits_per_rb: INITIAL_BITS_PER_RB,
            total_throughput: 0.0,
            total_collisions: 0,
        }
    }

    /// Fold a fresh PHY sample into the cross-window moving average.
    pub fn fold_bits_per_rb(&mut self, sample: f64) {
        self.avg_bits_per_rb = 0.9 * self.avg_bits_per_rb + 0.1 * sample;
    }

    /// Zero the rolling counters at the end of a window.
    pub fn reset_window_counters(&mut self) {
        self.total_throughput = 0.0;
        self.total_collisions = 0;
    }
}

/// Per-terminal figures for one decision window, rebuilt fresh every window.
#[derive(Clone, Debug)]
pub struct TerminalSnapshot {
    /// Terminal identifier.
    pub id: TerminalId,
    /// Sub-band the terminal is currently assigned to.
    pub sub_band: SubBandId,
    /// Downlink queue size in packets.
    pub queue_size: u32,
    /// Head-of-line delay in seconds.
    pub hol_delay: f64,
    /// Throughput achieved in this window.
    pub throughput: f64,
    /// Per-terminal bits per resource block.
    pub avg_bits_per_rb: f64,
}

/// One decision window's complete view of the system.
#[derive(Clone, Debug, Default)]
pub struct WindowStatistics {
    /// Index of the window this snapshot was collected for.
    pub window: u32,
    /// Per-sub-band records, ascending by id.
    pub sub_bands: Vec<SubBandSnapshot>,
    /// Per-terminal records, ascending by id.
    pub terminals: Vec<TerminalSnapshot>,
}

impl Default for SubBandSnapshot {
    fn default() -> Self {
        Self::new(SubBandId::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bits_per_rb_ema() {
        let mut snap = SubBandSnapshot::new(SubBandId(0));
        assert!((snap.avg_bits_per_rb - 20.0).abs() < 1e-12);

        snap.fold_bits_per_rb(30.0);
        assert!((snap.avg_bits_per_rb - 21.0).abs() < 1e-12);

        snap.fold_bits_per_rb(30.0);
        assert!((snap.avg_bits_per_rb - 21.9).abs() < 1e-12);
    }

    #[test]
    fn test_reset_clears_only_rolling_counters() {
        let mut snap = SubBandSnapshot::new(SubBandId(0));
        snap.fold_bits_per_rb(40.0);
        snap.total_throughput = 512.0;
        snap.total_collisions = 9;
        let ema = snap.avg_bits_per_rb;

        snap.reset_window_counters();
        assert_eq!(snap.total_throughput, 0.0);
        assert_eq!(snap.total_collisions, 0);
        // The moving average survives the window boundary.
        assert!((snap.avg_bits_per_rb - ema).abs() < 1e-12);
    }
}
