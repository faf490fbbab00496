//! The decision-window scheduler.
//!
//! One repeating cycle for the lifetime of the session:
//!
//! ```text
//! collect statistics -> assign (LCA | RLA) -> reset window counters
//!     -> sleep one window -> repeat
//! ```
//!
//! Statistics flow in from two collaborators, the channel-access layer
//! (failure rate, occupancy, contention window) and the PHY (bits per RB,
//! queue/delay/throughput per terminal), and assignments flow out through
//! the registry. The policy choice is fixed at construction: LCA plans with
//! the closed-form capacity heuristic, RLA delegates to the attached policy
//! oracle under an epsilon-greedy exploration rule.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use crate::clock::SimClock;
use crate::config::AirtimeConfig;
use crate::error::{AirtimeError, Result};
use crate::lbt::LbtController;
use crate::phy::PhyPort;
use crate::registry::SubBandRegistry;
use crate::rl::{window_reward, PolicyPort, RewardWeights};
use crate::types::{slots, SubBandId};

use super::policy::{lca_assignments, AlgorithmType, EpsilonSchedule};
use super::stats::{SubBandSnapshot, TerminalSnapshot, WindowStatistics};

struct SchedulerCore {
    algorithm: AlgorithmType,
    window_slots: u32,
    max_scheduled: u32,
    epsilon: EpsilonSchedule,
    reward_weights: RewardWeights,
    lbt: LbtController,
    registry: SubBandRegistry,
    phy: Rc<RefCell<dyn PhyPort>>,
    policy: Option<Rc<RefCell<dyn PolicyPort>>>,
    /// Persistent per-band window state: the cross-window bits-per-RB EMA
    /// plus the rolling throughput/collision counters.
    band_stats: BTreeMap<SubBandId, SubBandSnapshot>,
    rng: SmallRng,
    windows_completed: u32,
    last_snapshot: Option<WindowStatistics>,
    last_reward: Option<f64>,
    started: bool,
}

/// Periodic assignment scheduler.
///
/// Cloneable handle; all clones share the same state.
#[derive(Clone)]
pub struct DecisionScheduler {
    clock: SimClock,
    core: Rc<RefCell<SchedulerCore>>,
}

impl DecisionScheduler {
    /// Create a scheduler over the given collaborators.
    ///
    /// `policy` may be `None` unless the configured algorithm is RLA, in
    /// which case [`DecisionScheduler::start`] refuses to run.
    pub fn new(
        clock: SimClock,
        lbt: LbtController,
        registry: SubBandRegistry,
        phy: Rc<RefCell<dyn PhyPort>>,
        policy: Option<Rc<RefCell<dyn PolicyPort>>>,
        config: &AirtimeConfig,
    ) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };
        Self {
            clock,
            core: Rc::new(RefCell::new(SchedulerCore {
                algorithm: config.algorithm,
                window_slots: config.time_window_slots,
                max_scheduled: config.max_scheduled_terminals,
                epsilon: EpsilonSchedule::new(
                    config.epsilon,
                    config.epsilon_min,
                    config.epsilon_decay,
                ),
                reward_weights: config.reward,
                lbt,
                registry,
                phy,
                policy,
                band_stats: BTreeMap::new(),
                rng,
                windows_completed: 0,
                last_snapshot: None,
                last_reward: None,
                started: false,
            })),
        }
    }

    /// Start the repeating decision cycle; the first window fires at the
    /// current simulated time.
    ///
    /// Fails with [`AirtimeError::PolicyMissing`] when RLA is selected and no
    /// policy adapter is attached: a configuration error that must abort the
    /// run rather than silently fall back to LCA.
    pub fn start(&self) -> Result<()> {
        {
            let mut core = self.core.borrow_mut();
            if core.algorithm == AlgorithmType::Rla && core.policy.is_none() {
                return Err(AirtimeError::PolicyMissing);
            }
            if core.started {
                debug!("scheduler already started");
                return Ok(());
            }
            core.started = true;
        }
        let scheduler = self.clone();
        self.clock
            .schedule_after(std::time::Duration::ZERO, move || scheduler.run_window());
        Ok(())
    }

    /// Attach (or replace) the RLA policy adapter.
    ///
    /// Useful when the adapter needs handles that only exist after the
    /// simulation is wired, e.g. the registry.
    pub fn attach_policy(&self, policy: Rc<RefCell<dyn PolicyPort>>) {
        self.core.borrow_mut().policy = Some(policy);
    }

    /// Accumulate throughput delivered on a sub-band in the current window.
    pub fn record_throughput(&self, sub_band: SubBandId, bits: f64) {
        self.record(sub_band, |snap| snap.total_throughput += bits);
    }

    /// Count one collision on a sub-band in the current window.
    pub fn record_collision(&self, sub_band: SubBandId) {
        self.record(sub_band, |snap| snap.total_collisions += 1);
    }

    /// The policy the scheduler was configured with.
    pub fn algorithm(&self) -> AlgorithmType {
        self.core.borrow().algorithm
    }

    /// Current exploration probability (meaningful under RLA).
    pub fn epsilon(&self) -> f64 {
        self.core.borrow().epsilon.epsilon()
    }

    /// Number of completed decision windows.
    pub fn windows_completed(&self) -> u32 {
        self.core.borrow().windows_completed
    }

    /// Snapshot collected at the most recent decision boundary.
    pub fn last_statistics(&self) -> Option<WindowStatistics> {
        self.core.borrow().last_snapshot.clone()
    }

    /// Reward computed for the most recent RLA window.
    pub fn last_reward(&self) -> Option<f64> {
        self.core.borrow().last_reward
    }

    fn record(&self, sub_band: SubBandId, f: impl FnOnce(&mut SubBandSnapshot)) {
        let mut core = self.core.borrow_mut();
        if core.registry.num_resource_blocks(sub_band).is_err() {
            warn!(sub_band = %sub_band, "window counter for unregistered sub-band dropped");
            return;
        }
        let snap = core
            .band_stats
            .entry(sub_band)
            .or_insert_with(|| SubBandSnapshot::new(sub_band));
        f(snap);
    }

    /// One full decision window, then reschedule.
    fn run_window(&self) {
        let window_duration = {
            let mut core = self.core.borrow_mut();
            let snapshot = Self::collect_statistics(&mut core);

            match core.algorithm {
                AlgorithmType::Lca => Self::assign_lca(&mut core, &snapshot),
                AlgorithmType::Rla => Self::assign_rla(&mut core, &snapshot),
            }

            for snap in core.band_stats.values_mut() {
                snap.reset_window_counters();
            }
            core.last_snapshot = Some(snapshot);
            core.windows_completed += 1;
            slots(core.window_slots)
        };

        let scheduler = self.clone();
        self.clock
            .schedule_after(window_duration, move || scheduler.run_window());
    }

    /// Build the window snapshot from the channel-access layer, the PHY and
    /// the registry. Sub-bands the access layer does not know yet are
    /// absorbed as neutral defaults rather than failing the window.
    fn collect_statistics(core: &mut SchedulerCore) -> WindowStatistics {
        let band_ids = core.registry.sub_band_ids();
        let cw_default = core.lbt.knobs().cw_min;

        core.band_stats.retain(|id, _| band_ids.contains(id));
        for &id in &band_ids {
            let snap = core
                .band_stats
                .entry(id)
                .or_insert_with(|| SubBandSnapshot::new(id));

            match (
                core.lbt.failure_rate(id),
                core.lbt.occupancy(id),
                core.lbt.contention_window(id),
            ) {
                (Ok(failure_rate), Ok(occupancy), Ok(cw)) => {
                    snap.failure_rate = failure_rate;
                    snap.occupancy = occupancy;
                    snap.contention_window = cw;
                }
                _ => {
                    warn!(sub_band = %id, "no channel-access state; using neutral defaults");
                    snap.failure_rate = 0.0;
                    snap.occupancy = 0.0;
                    snap.contention_window = cw_default;
                }
            }

            let sample = core.phy.borrow().avg_bits_per_rb(id);
            snap.fold_bits_per_rb(sample);
        }

        let terminals = core
            .registry
            .terminal_map()
            .into_iter()
            .map(|(id, sub_band)| {
                let phy = core.phy.borrow();
                TerminalSnapshot {
                    id,
                    sub_band,
                    queue_size: phy.queue_size(id),
                    hol_delay: phy.hol_delay(id),
                    throughput: phy.throughput(id),
                    avg_bits_per_rb: phy.terminal_avg_bits_per_rb(id),
                }
            })
            .collect();

        WindowStatistics {
            window: core.windows_completed,
            sub_bands: core.band_stats.values().cloned().collect(),
            terminals,
        }
    }

    fn assign_lca(core: &mut SchedulerCore, snapshot: &WindowStatistics) {
        let num_rbs: BTreeMap<SubBandId, u16> = snapshot
            .sub_bands
            .iter()
            .map(|band| {
                (
                    band.id,
                    core.registry.num_resource_blocks(band.id).unwrap_or(0),
                )
            })
            .collect();

        let plan = lca_assignments(snapshot, &num_rbs, core.max_scheduled);
        for &(terminal, sub_band) in &plan {
            core.registry.try_switch_sub_band(terminal, sub_band);
        }
        info!(
            window = core.windows_completed,
            terminals = plan.len(),
            "LCA assignment applied"
        );
    }

    fn assign_rla(core: &mut SchedulerCore, snapshot: &WindowStatistics) {
        // start() refuses to run RLA without a policy; reaching this point
        // without one is a wiring bug.
        let policy = core
            .policy
            .clone()
            .expect("RLA selected but no policy adapter attached");
        let mut policy = policy.borrow_mut();

        policy.begin_window(snapshot);
        let observation = policy.current_observation();

        let explore = core.rng.gen::<f64>() < core.epsilon.epsilon();
        let action = if explore {
            debug!(window = core.windows_completed, "RLA exploring");
            policy.sample_random_action()
        } else {
            debug!(window = core.windows_completed, "RLA exploiting");
            policy.best_action(&observation)
        };

        let moves = policy.apply_action(&action);
        for &(terminal, sub_band) in &moves {
            core.registry.try_switch_sub_band(terminal, sub_band);
        }

        core.last_reward = window_reward(snapshot, &core.reward_weights);
        core.epsilon.advance();
        info!(
            window = core.windows_completed,
            terminals = moves.len(),
            explore,
            epsilon = core.epsilon.epsilon(),
            "RLA assignment applied"
        );
    }
}

impl std::fmt::Debug for DecisionScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let core = self.core.borrow();
        f.debug_struct("DecisionScheduler")
            .field("algorithm", &core.algorithm)
            .field("windows_completed", &core.windows_completed)
            .field("epsilon", &core.epsilon.epsilon())
            .finish()
    }
}
