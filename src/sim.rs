//! Top-level simulation facade.
//!
//! [`AirtimeSim`] wires the four components (virtual clock, channel-access
//! controller, assignment registry, decision scheduler) and exposes the
//! handles plus a couple of conveniences for driving a session:
//!
//! ```ignore
//! use airtime_rs::AirtimeBuilder;
//! use std::time::Duration;
//!
//! let sim = AirtimeBuilder::new().seed(42).build()?;
//! sim.add_sub_band(0.into(), 10, 50.0)?;
//! sim.add_sub_band(1.into(), 10, 200.0)?;
//! for t in 0..5 {
//!     sim.add_terminal(t.into())?;
//! }
//! sim.start()?;
//! sim.run_for(Duration::from_secs(10));
//! ```

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use crate::clock::{SimClock, SimInstant};
use crate::config::AirtimeConfig;
use crate::error::Result;
use crate::lbt::LbtController;
use crate::phy::PhyPort;
use crate::registry::SubBandRegistry;
use crate::rl::PolicyPort;
use crate::sched::DecisionScheduler;
use crate::types::{SubBandId, TerminalId};

/// A wired simulation session.
pub struct AirtimeSim {
    config: AirtimeConfig,
    clock: SimClock,
    lbt: LbtController,
    registry: SubBandRegistry,
    scheduler: DecisionScheduler,
}

impl AirtimeSim {
    /// Wire a simulation from a validated configuration.
    ///
    /// RLA additionally needs a policy adapter, either passed here or
    /// attached later with [`AirtimeSim::attach_policy`], before
    /// [`AirtimeSim::start`] will run.
    pub fn from_config(
        config: AirtimeConfig,
        phy: Rc<RefCell<dyn PhyPort>>,
        policy: Option<Rc<RefCell<dyn PolicyPort>>>,
    ) -> Result<Self> {
        config.validate()?;

        let clock = SimClock::new();
        let lbt = match config.rng_seed {
            Some(seed) => LbtController::with_seed(clock.clone(), config.lbt.clone(), seed),
            None => LbtController::new(clock.clone(), config.lbt.clone()),
        };
        let registry = SubBandRegistry::new(
            clock.clone(),
            phy.clone(),
            config.default_sub_band,
            config.switch_latency(),
        );
        let scheduler = DecisionScheduler::new(
            clock.clone(),
            lbt.clone(),
            registry.clone(),
            phy,
            policy,
            &config,
        );

        Ok(Self {
            config,
            clock,
            lbt,
            registry,
            scheduler,
        })
    }

    /// The configuration this session was built with.
    pub fn config(&self) -> &AirtimeConfig {
        &self.config
    }

    /// Handle to the virtual clock.
    pub fn clock(&self) -> &SimClock {
        &self.clock
    }

    /// Handle to the channel-access controller.
    pub fn lbt(&self) -> &LbtController {
        &self.lbt
    }

    /// Handle to the assignment registry.
    pub fn registry(&self) -> &SubBandRegistry {
        &self.registry
    }

    /// Handle to the decision scheduler.
    pub fn scheduler(&self) -> &DecisionScheduler {
        &self.scheduler
    }

    /// Register a sub-band with both the registry (capacity) and the
    /// channel-access layer (contention).
    ///
    /// Kept consistent: if the access layer rejects the registration, the
    /// registry entry is rolled back.
    pub fn add_sub_band(
        &self,
        id: SubBandId,
        num_rbs: u16,
        interference_mean: f64,
    ) -> Result<()> {
        self.registry.add_sub_band(id, num_rbs)?;
        if let Err(err) = self.lbt.register_sub_band(id, interference_mean) {
            self.registry.remove_sub_band(id)?;
            return Err(err);
        }
        Ok(())
    }

    /// Register a terminal on the default sub-band.
    pub fn add_terminal(&self, id: TerminalId) -> Result<()> {
        self.registry.add_terminal(id)
    }

    /// Attach the RLA policy adapter after wiring.
    pub fn attach_policy(&self, policy: Rc<RefCell<dyn PolicyPort>>) {
        self.scheduler.attach_policy(policy);
    }

    /// Start the decision cycle.
    pub fn start(&self) -> Result<()> {
        self.scheduler.start()
    }

    /// Drive the simulation forward by `duration`; returns the number of
    /// events executed.
    pub fn run_for(&self, duration: Duration) -> usize {
        self.clock.run_for(duration)
    }

    /// Drive the simulation up to `deadline`.
    pub fn run_until(&self, deadline: SimInstant) -> usize {
        self.clock.run_until(deadline)
    }

    /// Current simulated time.
    pub fn now(&self) -> SimInstant {
        self.clock.now()
    }
}

impl std::fmt::Debug for AirtimeSim {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AirtimeSim")
            .field("now", &self.clock.now())
            .field("algorithm", &self.config.algorithm)
            .field("sub_bands", &self.registry.num_sub_bands())
            .field("terminals", &self.registry.num_terminals())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AirtimeError;
    use crate::phy::SimPhy;
    use crate::sched::AlgorithmType;

    fn phy() -> Rc<RefCell<SimPhy>> {
        Rc::new(RefCell::new(SimPhy::new()))
    }

    #[test]
    fn test_from_config_validates() {
        let mut config = AirtimeConfig::default();
        config.epsilon = 2.0;
        assert!(AirtimeSim::from_config(config, phy(), None).is_err());
    }

    #[test]
    fn test_rla_without_policy_rejected_at_start() {
        let config = AirtimeConfig {
            algorithm: AlgorithmType::Rla,
            ..Default::default()
        };
        let sim = AirtimeSim::from_config(config, phy(), None).unwrap();
        assert!(matches!(sim.start(), Err(AirtimeError::PolicyMissing)));

        // Attaching an adapter unblocks the run.
        let policy = crate::rl::GreedyPolicy::with_seed(sim.registry().clone(), 2).into_port();
        sim.attach_policy(policy);
        assert!(sim.start().is_ok());
    }

    #[test]
    fn test_add_sub_band_registers_both_layers() {
        let sim = AirtimeSim::from_config(AirtimeConfig::default(), phy(), None).unwrap();
        sim.add_sub_band(SubBandId(0), 10, 50.0).unwrap();

        assert_eq!(sim.registry().num_sub_bands(), 1);
        assert!(sim.lbt().failure_rate(SubBandId(0)).is_ok());
    }

    #[test]
    fn test_add_sub_band_rolls_back_on_rejected_rate() {
        let sim = AirtimeSim::from_config(AirtimeConfig::default(), phy(), None).unwrap();
        assert!(sim.add_sub_band(SubBandId(0), 10, -1.0).is_err());
        // The registry entry did not outlive the failed registration.
        assert_eq!(sim.registry().num_sub_bands(), 0);
    }

    #[test]
    fn test_session_runs_windows() {
        let config = AirtimeConfig {
            rng_seed: Some(9),
            ..Default::default()
        };
        let sim = AirtimeSim::from_config(config, phy(), None).unwrap();
        sim.add_sub_band(SubBandId(0), 10, 100.0).unwrap();
        sim.add_terminal(TerminalId(0)).unwrap();
        sim.start().unwrap();

        sim.run_for(Duration::from_secs(1));
        // 1 s / 250 ms windows: boundaries at 0, 250, 500, 750, 1000 ms.
        assert_eq!(sim.scheduler().windows_completed(), 5);
        assert!(sim.lbt().arrival_count(SubBandId(0)).unwrap() > 0);
    }
}
