//! PHY collaborator boundary.
//!
//! The physical layer is outside this crate: resource-block allocation,
//! link adaptation, and per-terminal metering all live behind [`PhyPort`].
//! The decision layer only ever issues the read queries below, plus one
//! notification when a terminal's sub-band switch takes effect.
//!
//! [`SimPhy`] is the built-in table-driven implementation used by tests and
//! demos; real integrations implement [`PhyPort`] themselves.

use std::collections::BTreeMap;

use crate::types::{SubBandId, TerminalId};

/// Synchronous query/command interface to the physical layer.
///
/// Queries for entities the PHY does not know are expected to return a
/// neutral figure (zero); the callers poll opportunistically and absorb
/// missing data as defaults.
pub trait PhyPort {
    /// Average bits carried per resource block on a sub-band (fresh sample,
    /// not smoothed; the scheduler owns the moving average).
    fn avg_bits_per_rb(&self, sub_band: SubBandId) -> f64;

    /// Current downlink queue size for a terminal, in packets.
    fn queue_size(&self, terminal: TerminalId) -> u32;

    /// Head-of-line delay for a terminal, in seconds.
    fn hol_delay(&self, terminal: TerminalId) -> f64;

    /// Throughput achieved by a terminal in the current window.
    fn throughput(&self, terminal: TerminalId) -> f64;

    /// Per-terminal average bits per resource block.
    fn terminal_avg_bits_per_rb(&self, terminal: TerminalId) -> f64;

    /// A sub-band switch for `terminal` has taken effect (delivered after the
    /// configured switch latency).
    fn sub_band_switched(&mut self, terminal: TerminalId, sub_band: SubBandId);
}

/// Table-driven PHY stand-in.
///
/// Per-band and per-terminal figures are set directly; queries for unknown
/// ids return zero. Received switch notifications are recorded in order,
/// which lets tests assert on notification timing.
#[derive(Debug, Default)]
pub struct SimPhy {
    band_bits_per_rb: BTreeMap<SubBandId, f64>,
    queue_sizes: BTreeMap<TerminalId, u32>,
    hol_delays: BTreeMap<TerminalId, f64>,
    throughputs: BTreeMap<TerminalId, f64>,
    terminal_bits_per_rb: BTreeMap<TerminalId, f64>,
    switch_log: Vec<(TerminalId, SubBandId)>,
}

impl SimPhy {
    /// Empty PHY; every query returns zero until figures are set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the bits-per-RB sample reported for a sub-band.
    pub fn set_band_bits_per_rb(&mut self, sub_band: SubBandId, bits: f64) {
        self.band_bits_per_rb.insert(sub_band, bits);
    }

    /// Set the per-terminal figures reported for a terminal.
    pub fn set_terminal_stats(
        &mut self,
        terminal: TerminalId,
        queue_size: u32,
        hol_delay: f64,
        throughput: f64,
        bits_per_rb: f64,
    ) {
        self.queue_sizes.insert(terminal, queue_size);
        self.hol_delays.insert(terminal, hol_delay);
        self.throughputs.insert(terminal, throughput);
        self.terminal_bits_per_rb.insert(terminal, bits_per_rb);
    }

    /// Switch notifications received so far, in delivery order.
    pub fn switch_log(&self) -> &[(TerminalId, SubBandId)] {
        &self.switch_log
    }
}

impl PhyPort for SimPhy {
    fn avg_bits_per_rb(&self, sub_band: SubBandId) -> f64 {
        self.band_bits_per_rb.get(&sub_band).copied().unwrap_or(0.0)
    }

    fn queue_size(&self, terminal: TerminalId) -> u32 {
        self.queue_sizes.get(&terminal).copied().unwrap_or(0)
    }

    fn hol_delay(&self, terminal: TerminalId) -> f64 {
        self.hol_delays.get(&terminal).copied().unwrap_or(0.0)
    }

    fn throughput(&self, terminal: TerminalId) -> f64 {
        self.throughputs.get(&terminal).copied().unwrap_or(0.0)
    }

    fn terminal_avg_bits_per_rb(&self, terminal: TerminalId) -> f64 {
        self.terminal_bits_per_rb
            .get(&terminal)
            .copied()
            .unwrap_or(0.0)
    }

    fn sub_band_switched(&mut self, terminal: TerminalId, sub_band: SubBandId) {
        self.switch_log.push((terminal, sub_band));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_ids_report_zero() {
        let phy = SimPhy::new();
        assert_eq!(phy.avg_bits_per_rb(SubBandId(3)), 0.0);
        assert_eq!(phy.queue_size(TerminalId(3)), 0);
        assert_eq!(phy.hol_delay(TerminalId(3)), 0.0);
        assert_eq!(phy.throughput(TerminalId(3)), 0.0);
        assert_eq!(phy.terminal_avg_bits_per_rb(TerminalId(3)), 0.0);
    }

    #[test]
    fn test_set_and_query() {
        let mut phy = SimPhy::new();
        phy.set_band_bits_per_rb(SubBandId(0), 20.0);
        phy.set_terminal_stats(TerminalId(1), 12, 0.004, 350.0, 18.0);

        assert_eq!(phy.avg_bits_per_rb(SubBandId(0)), 20.0);
        assert_eq!(phy.queue_size(TerminalId(1)), 12);
        assert!((phy.hol_delay(TerminalId(1)) - 0.004).abs() < 1e-12);
        assert_eq!(phy.throughput(TerminalId(1)), 350.0);
        assert_eq!(phy.terminal_avg_bits_per_rb(TerminalId(1)), 18.0);
    }

    #[test]
    fn test_switch_log_records_in_order() {
        let mut phy = SimPhy::new();
        phy.sub_band_switched(TerminalId(1), SubBandId(2));
        phy.sub_band_switched(TerminalId(2), SubBandId(0));
        assert_eq!(
            phy.switch_log(),
            &[(TerminalId(1), SubBandId(2)), (TerminalId(2), SubBandId(0))]
        );
    }
}
