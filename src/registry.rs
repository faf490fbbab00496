//! Terminal-to-sub-band assignment registry.
//!
//! Owns the terminal ↔ sub-band relation and the per-sub-band capacity
//! metadata. The one mutation that matters is [`SubBandRegistry::switch_sub_band`]:
//! it moves a terminal between sub-bands *atomically* (the old band's active
//! count, the new band's active count, and the terminal's recorded sub-band
//! change together or not at all) and schedules a latency-delayed
//! notification to the PHY.
//!
//! Invariant: between `switch_sub_band` calls, the sum of active counts over
//! all sub-bands equals the number of registered terminals.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::clock::SimClock;
use crate::error::{AirtimeError, Result};
use crate::phy::PhyPort;
use crate::types::{SubBandId, TerminalId};

/// Capacity metadata for one sub-band.
#[derive(Clone, Copy, Debug)]
struct SubBandInfo {
    num_rbs: u16,
    active_terminals: u16,
}

struct RegistryCore {
    bands: BTreeMap<SubBandId, SubBandInfo>,
    terminals: BTreeMap<TerminalId, SubBandId>,
    default_sub_band: SubBandId,
    switch_latency: Duration,
}

/// Cloneable handle to the assignment registry.
#[derive(Clone)]
pub struct SubBandRegistry {
    clock: SimClock,
    phy: Rc<RefCell<dyn PhyPort>>,
    core: Rc<RefCell<RegistryCore>>,
}

impl SubBandRegistry {
    /// Create an empty registry.
    ///
    /// New terminals attach to `default_sub_band`; switch notifications reach
    /// the PHY `switch_latency` after the switch is recorded.
    pub fn new(
        clock: SimClock,
        phy: Rc<RefCell<dyn PhyPort>>,
        default_sub_band: SubBandId,
        switch_latency: Duration,
    ) -> Self {
        Self {
            clock,
            phy,
            core: Rc::new(RefCell::new(RegistryCore {
                bands: BTreeMap::new(),
                terminals: BTreeMap::new(),
                default_sub_band,
                switch_latency,
            })),
        }
    }

    /// Register a sub-band with its resource-block count.
    pub fn add_sub_band(&self, id: SubBandId, num_rbs: u16) -> Result<()> {
        let mut core = self.core.borrow_mut();
        if core.bands.contains_key(&id) {
            return Err(AirtimeError::DuplicateSubBand(id));
        }
        core.bands.insert(
            id,
            SubBandInfo {
                num_rbs,
                active_terminals: 0,
            },
        );
        info!(sub_band = %id, num_rbs, "added sub-band");
        Ok(())
    }

    /// Remove a sub-band; its terminals migrate to the default sub-band.
    ///
    /// Removing the default sub-band while terminals are attached to it is
    /// rejected, since they would have nowhere to go.
    pub fn remove_sub_band(&self, id: SubBandId) -> Result<()> {
        let mut core = self.core.borrow_mut();
        let info = *core
            .bands
            .get(&id)
            .ok_or(AirtimeError::UnknownSubBand(id))?;
        if id == core.default_sub_band && info.active_terminals > 0 {
            return Err(AirtimeError::SubBandInUse(id));
        }

        let default = core.default_sub_band;
        let mut migrated = 0u16;
        for band in core.terminals.values_mut() {
            if *band == id {
                *band = default;
                migrated += 1;
            }
        }
        if migrated > 0 {
            let target = core
                .bands
                .get_mut(&default)
                .ok_or(AirtimeError::UnknownSubBand(default))?;
            target.active_terminals += migrated;
        }
        core.bands.remove(&id);
        info!(sub_band = %id, migrated, "removed sub-band");
        Ok(())
    }

    /// Register a terminal, attaching it to the default sub-band.
    pub fn add_terminal(&self, id: TerminalId) -> Result<()> {
        let mut core = self.core.borrow_mut();
        if core.terminals.contains_key(&id) {
            return Err(AirtimeError::DuplicateTerminal(id));
        }
        let default = core.default_sub_band;
        let band = core
            .bands
            .get_mut(&default)
            .ok_or(AirtimeError::UnknownSubBand(default))?;
        band.active_terminals += 1;
        core.terminals.insert(id, default);
        info!(terminal = %id, sub_band = %default, "added terminal");
        Ok(())
    }

    /// Deregister a terminal.
    pub fn remove_terminal(&self, id: TerminalId) -> Result<()> {
        let mut core = self.core.borrow_mut();
        let band = core
            .terminals
            .remove(&id)
            .ok_or(AirtimeError::UnknownTerminal(id))?;
        if let Some(info) = core.bands.get_mut(&band) {
            info.active_terminals -= 1;
        }
        info!(terminal = %id, sub_band = %band, "removed terminal");
        Ok(())
    }

    /// Move a terminal to a new sub-band.
    ///
    /// No-op if the terminal is already there. On an actual move, both active
    /// counts and the terminal's record are updated together, and the PHY is
    /// notified after the configured switch latency.
    pub fn switch_sub_band(&self, terminal: TerminalId, new: SubBandId) -> Result<()> {
        let latency = {
            let mut core = self.core.borrow_mut();
            if !core.bands.contains_key(&new) {
                return Err(AirtimeError::UnknownSubBand(new));
            }
            let old = *core
                .terminals
                .get(&terminal)
                .ok_or(AirtimeError::UnknownTerminal(terminal))?;
            if old == new {
                debug!(terminal = %terminal, sub_band = %new, "switch is a no-op");
                return Ok(());
            }

            if let Some(info) = core.bands.get_mut(&old) {
                info.active_terminals -= 1;
            }
            if let Some(info) = core.bands.get_mut(&new) {
                info.active_terminals += 1;
            }
            core.terminals.insert(terminal, new);
            info!(terminal = %terminal, from = %old, to = %new, "switched sub-band");
            core.switch_latency
        };

        let phy = self.phy.clone();
        self.clock.schedule_after(latency, move || {
            phy.borrow_mut().sub_band_switched(terminal, new);
        });
        Ok(())
    }

    /// Number of registered sub-bands.
    pub fn num_sub_bands(&self) -> usize {
        self.core.borrow().bands.len()
    }

    /// Number of registered terminals.
    pub fn num_terminals(&self) -> usize {
        self.core.borrow().terminals.len()
    }

    /// Resource-block count of a sub-band.
    pub fn num_resource_blocks(&self, id: SubBandId) -> Result<u16> {
        self.core
            .borrow()
            .bands
            .get(&id)
            .map(|info| info.num_rbs)
            .ok_or(AirtimeError::UnknownSubBand(id))
    }

    /// Active-terminal count of a sub-band.
    pub fn active_terminals(&self, id: SubBandId) -> Result<u16> {
        self.core
            .borrow()
            .bands
            .get(&id)
            .map(|info| info.active_terminals)
            .ok_or(AirtimeError::UnknownSubBand(id))
    }

    /// Current sub-band of a terminal.
    pub fn sub_band_of(&self, terminal: TerminalId) -> Result<SubBandId> {
        self.core
            .borrow()
            .terminals
            .get(&terminal)
            .copied()
            .ok_or(AirtimeError::UnknownTerminal(terminal))
    }

    /// All registered sub-band ids in ascending order.
    pub fn sub_band_ids(&self) -> Vec<SubBandId> {
        self.core.borrow().bands.keys().copied().collect()
    }

    /// Snapshot of the full terminal → sub-band map.
    pub fn terminal_map(&self) -> BTreeMap<TerminalId, SubBandId> {
        self.core.borrow().terminals.clone()
    }

    /// Log-and-continue wrapper around [`Self::switch_sub_band`] for callers
    /// that treat a rejected switch as a warning rather than a failure.
    pub fn try_switch_sub_band(&self, terminal: TerminalId, new: SubBandId) {
        if let Err(err) = self.switch_sub_band(terminal, new) {
            warn!(terminal = %terminal, sub_band = %new, %err, "sub-band switch rejected");
        }
    }
}

impl std::fmt::Debug for SubBandRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let core = self.core.borrow();
        f.debug_struct("SubBandRegistry")
            .field("sub_bands", &core.bands.len())
            .field("terminals", &core.terminals.len())
            .field("default_sub_band", &core.default_sub_band)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phy::SimPhy;

    fn registry() -> (SimClock, Rc<RefCell<SimPhy>>, SubBandRegistry) {
        let clock = SimClock::new();
        let phy = Rc::new(RefCell::new(SimPhy::new()));
        let reg = SubBandRegistry::new(
            clock.clone(),
            phy.clone(),
            SubBandId(0),
            Duration::from_millis(1),
        );
        (clock, phy, reg)
    }

    fn conservation_holds(reg: &SubBandRegistry) -> bool {
        let total: u16 = reg
            .sub_band_ids()
            .iter()
            .map(|&id| reg.active_terminals(id).unwrap())
            .sum();
        total as usize == reg.num_terminals()
    }

    #[test]
    fn test_add_and_query() {
        let (_, _, reg) = registry();
        reg.add_sub_band(SubBandId(0), 10).unwrap();
        reg.add_sub_band(SubBandId(1), 20).unwrap();
        reg.add_terminal(TerminalId(1)).unwrap();

        assert_eq!(reg.num_sub_bands(), 2);
        assert_eq!(reg.num_terminals(), 1);
        assert_eq!(reg.num_resource_blocks(SubBandId(1)).unwrap(), 20);
        assert_eq!(reg.active_terminals(SubBandId(0)).unwrap(), 1);
        assert_eq!(reg.sub_band_of(TerminalId(1)).unwrap(), SubBandId(0));
        assert!(conservation_holds(&reg));
    }

    #[test]
    fn test_duplicates_rejected() {
        let (_, _, reg) = registry();
        reg.add_sub_band(SubBandId(0), 10).unwrap();
        assert!(reg.add_sub_band(SubBandId(0), 99).is_err());
        reg.add_terminal(TerminalId(1)).unwrap();
        assert!(reg.add_terminal(TerminalId(1)).is_err());
    }

    #[test]
    fn test_terminal_without_default_band_rejected() {
        let (_, _, reg) = registry();
        assert!(matches!(
            reg.add_terminal(TerminalId(1)),
            Err(AirtimeError::UnknownSubBand(SubBandId(0)))
        ));
    }

    #[test]
    fn test_switch_moves_counts_atomically() {
        let (_, _, reg) = registry();
        reg.add_sub_band(SubBandId(0), 10).unwrap();
        reg.add_sub_band(SubBandId(1), 10).unwrap();
        reg.add_terminal(TerminalId(1)).unwrap();

        reg.switch_sub_band(TerminalId(1), SubBandId(1)).unwrap();
        assert_eq!(reg.active_terminals(SubBandId(0)).unwrap(), 0);
        assert_eq!(reg.active_terminals(SubBandId(1)).unwrap(), 1);
        assert_eq!(reg.sub_band_of(TerminalId(1)).unwrap(), SubBandId(1));
        assert!(conservation_holds(&reg));
    }

    #[test]
    fn test_switch_to_same_band_is_noop() {
        let (clock, phy, reg) = registry();
        reg.add_sub_band(SubBandId(0), 10).unwrap();
        reg.add_terminal(TerminalId(1)).unwrap();

        reg.switch_sub_band(TerminalId(1), SubBandId(0)).unwrap();
        clock.run_for(Duration::from_secs(1));
        // No move, no notification.
        assert!(phy.borrow().switch_log().is_empty());
    }

    #[test]
    fn test_switch_with_unknown_ids_leaves_counts_intact() {
        let (_, _, reg) = registry();
        reg.add_sub_band(SubBandId(0), 10).unwrap();
        reg.add_terminal(TerminalId(1)).unwrap();

        assert!(reg.switch_sub_band(TerminalId(1), SubBandId(9)).is_err());
        assert!(reg.switch_sub_band(TerminalId(9), SubBandId(0)).is_err());
        assert_eq!(reg.active_terminals(SubBandId(0)).unwrap(), 1);
        assert!(conservation_holds(&reg));
    }

    #[test]
    fn test_conservation_over_switch_sequences() {
        let (_, _, reg) = registry();
        for b in 0..3 {
            reg.add_sub_band(SubBandId(b), 10).unwrap();
        }
        for t in 0..10 {
            reg.add_terminal(TerminalId(t)).unwrap();
        }

        // Deterministic pseudo-random churn across bands.
        for step in 0..100u16 {
            let terminal = TerminalId(step * 7 % 10);
            let band = SubBandId(step * 3 % 3);
            reg.switch_sub_band(terminal, band).unwrap();
            assert!(conservation_holds(&reg));
        }
    }

    #[test]
    fn test_notification_arrives_after_latency() {
        let (clock, phy, reg) = registry();
        reg.add_sub_band(SubBandId(0), 10).unwrap();
        reg.add_sub_band(SubBandId(1), 10).unwrap();
        reg.add_terminal(TerminalId(1)).unwrap();

        reg.switch_sub_band(TerminalId(1), SubBandId(1)).unwrap();
        // The registry has already moved the terminal...
        assert_eq!(reg.sub_band_of(TerminalId(1)).unwrap(), SubBandId(1));
        // ...but the PHY only hears about it after the switch latency.
        clock.run_for(Duration::from_micros(900));
        assert!(phy.borrow().switch_log().is_empty());
        clock.run_for(Duration::from_micros(100));
        assert_eq!(
            phy.borrow().switch_log(),
            &[(TerminalId(1), SubBandId(1))]
        );
    }

    #[test]
    fn test_remove_sub_band_migrates_to_default() {
        let (_, _, reg) = registry();
        reg.add_sub_band(SubBandId(0), 10).unwrap();
        reg.add_sub_band(SubBandId(1), 10).unwrap();
        for t in 0..4 {
            reg.add_terminal(TerminalId(t)).unwrap();
        }
        for t in 0..4 {
            reg.switch_sub_band(TerminalId(t), SubBandId(1)).unwrap();
        }

        reg.remove_sub_band(SubBandId(1)).unwrap();
        assert_eq!(reg.num_sub_bands(), 1);
        assert_eq!(reg.active_terminals(SubBandId(0)).unwrap(), 4);
        assert!(conservation_holds(&reg));
    }

    #[test]
    fn test_remove_default_with_terminals_rejected() {
        let (_, _, reg) = registry();
        reg.add_sub_band(SubBandId(0), 10).unwrap();
        reg.add_terminal(TerminalId(1)).unwrap();
        assert!(matches!(
            reg.remove_sub_band(SubBandId(0)),
            Err(AirtimeError::SubBandInUse(SubBandId(0)))
        ));

        reg.remove_terminal(TerminalId(1)).unwrap();
        assert!(reg.remove_sub_band(SubBandId(0)).is_ok());
    }
}
