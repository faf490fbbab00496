//! Reinforcement-learning policy boundary.
//!
//! The learning environment itself (model, training, action-value estimates)
//! lives outside this crate behind [`PolicyPort`]. The scheduler pushes the
//! fresh window snapshot in with [`PolicyPort::begin_window`], then drives
//! the epsilon-greedy exploration rule against the narrow oracle surface:
//! observation out, action in, assignments back.
//!
//! [`GreedyPolicy`] is the built-in reference oracle: its "best" action is
//! the argmax-capacity sub-band, so RLA wired to it reproduces the heuristic
//! assignment while exercising the full policy path.

use std::cell::RefCell;
use std::rc::Rc;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::registry::SubBandRegistry;
use crate::sched::stats::WindowStatistics;
use crate::types::{SubBandId, TerminalId};

/// One observation row per terminal.
#[derive(Clone, Debug)]
pub struct TerminalRow {
    /// Terminal identifier.
    pub terminal: TerminalId,
    /// Sub-band the terminal currently operates on.
    pub sub_band: SubBandId,
    /// Downlink queue size in packets.
    pub queue_size: u32,
    /// Head-of-line delay in seconds.
    pub hol_delay: f64,
    /// Per-terminal bits per resource block.
    pub avg_bits_per_rb: f64,
    /// Window throughput.
    pub throughput: f64,
}

/// One observation row per sub-band.
#[derive(Clone, Debug)]
pub struct SubBandRow {
    /// Sub-band identifier.
    pub sub_band: SubBandId,
    /// Smoothed coexisting-traffic occupancy.
    pub occupancy: f64,
    /// Smoothed access-failure rate.
    pub failure_rate: f64,
    /// Contention window at collection time.
    pub contention_window: u16,
}

/// Structured observation handed to the policy oracle.
#[derive(Clone, Debug, Default)]
pub struct Observation {
    /// Registered sub-band ids in ascending order (one-hot basis).
    pub sub_band_ids: Vec<SubBandId>,
    /// Per-terminal rows, ascending by terminal id.
    pub terminals: Vec<TerminalRow>,
    /// Per-sub-band rows, ascending by sub-band id.
    pub sub_bands: Vec<SubBandRow>,
}

impl Observation {
    /// Build an observation from a window snapshot.
    pub fn from_stats(stats: &WindowStatistics) -> Self {
        let sub_band_ids: Vec<SubBandId> = stats.sub_bands.iter().map(|b| b.id).collect();
        let terminals = stats
            .terminals
            .iter()
            .map(|t| TerminalRow {
                terminal: t.id,
                sub_band: t.sub_band,
                queue_size: t.queue_size,
                hol_delay: t.hol_delay,
                avg_bits_per_rb: t.avg_bits_per_rb,
                throughput: t.throughput,
            })
            .collect();
        let sub_bands = stats
            .sub_bands
            .iter()
            .map(|b| SubBandRow {
                sub_band: b.id,
                occupancy: b.occupancy,
                failure_rate: b.failure_rate,
                contention_window: b.contention_window,
            })
            .collect();
        Self {
            sub_band_ids,
            terminals,
            sub_bands,
        }
    }

    /// Flatten into the box layout consumed by learning backends: per
    /// terminal `[queue, hol_delay, bits_per_rb, throughput, bits_per_rb,
    /// one-hot sub-band…]`, then per sub-band `[occupancy, failure_rate,
    /// contention_window]`.
    pub fn flatten(&self) -> Vec<f64> {
        let n_bands = self.sub_band_ids.len();
        let mut out = Vec::with_capacity(self.terminals.len() * (5 + n_bands) + n_bands * 3);
        for t in &self.terminals {
            out.push(f64::from(t.queue_size));
            out.push(t.hol_delay);
            out.push(t.avg_bits_per_rb);
            out.push(t.throughput);
            out.push(t.avg_bits_per_rb);
            for &band in &self.sub_band_ids {
                out.push(if t.sub_band == band { 1.0 } else { 0.0 });
            }
        }
        for b in &self.sub_bands {
            out.push(b.occupancy);
            out.push(b.failure_rate);
            out.push(f64::from(b.contention_window));
        }
        out
    }
}

/// Opaque discrete action value.
///
/// The reference policy interprets it modulo the sub-band count as an index
/// into the ascending sub-band list; richer oracles may encode per-terminal
/// assignments however they like, since only [`PolicyPort::apply_action`]
/// gives an action meaning.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Action(pub u32);

/// The policy oracle consumed by the RLA assignment path.
pub trait PolicyPort {
    /// A new decision window has begun; `stats` is the fresh snapshot.
    fn begin_window(&mut self, stats: &WindowStatistics);

    /// The oracle's current observation of the system.
    fn current_observation(&mut self) -> Observation;

    /// Draw a uniformly random action (exploration branch).
    fn sample_random_action(&mut self) -> Action;

    /// The oracle's best action for `observation` (exploitation branch).
    fn best_action(&mut self, observation: &Observation) -> Action;

    /// Translate an action into concrete terminal → sub-band assignments.
    fn apply_action(&mut self, action: &Action) -> Vec<(TerminalId, SubBandId)>;
}

/// Weights for the window reward.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardWeights {
    /// Weight for the average head-of-line delay term.
    /// Default: 1.0
    pub alpha: f64,
    /// Weight for the throughput-shortfall term.
    /// Default: 1.0
    pub beta: f64,
    /// Maximum achievable throughput, for normalizing the shortfall.
    /// Default: 1000.0
    pub max_throughput: f64,
}

impl Default for RewardWeights {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            beta: 1.0,
            max_throughput: 1000.0,
        }
    }
}

/// Window reward: `-(alpha * avg_hol_delay + beta * (max_throughput -
/// total_throughput))`.
///
/// Returns `None` when the window has no terminals; averaging over an empty
/// set is skipped rather than divided through.
pub fn window_reward(stats: &WindowStatistics, weights: &RewardWeights) -> Option<f64> {
    if stats.terminals.is_empty() {
        return None;
    }
    let avg_hol: f64 =
        stats.terminals.iter().map(|t| t.hol_delay).sum::<f64>() / stats.terminals.len() as f64;
    let total_throughput: f64 = stats.terminals.iter().map(|t| t.throughput).sum();
    Some(-(weights.alpha * avg_hol + weights.beta * (weights.max_throughput - total_throughput)))
}

/// Reference oracle: greedy on expected sub-band capacity.
pub struct GreedyPolicy {
    registry: SubBandRegistry,
    rng: SmallRng,
    last_stats: WindowStatistics,
}

impl GreedyPolicy {
    /// Create a greedy oracle over the given registry.
    pub fn new(registry: SubBandRegistry) -> Self {
        Self::with_rng(registry, SmallRng::from_entropy())
    }

    /// Create a greedy oracle with a fixed seed.
    pub fn with_seed(registry: SubBandRegistry, seed: u64) -> Self {
        Self::with_rng(registry, SmallRng::seed_from_u64(seed))
    }

    fn with_rng(registry: SubBandRegistry, rng: SmallRng) -> Self {
        Self {
            registry,
            rng,
            last_stats: WindowStatistics::default(),
        }
    }

    /// Wrap into the shared handle shape the scheduler consumes.
    pub fn into_port(self) -> Rc<RefCell<dyn PolicyPort>> {
        Rc::new(RefCell::new(self))
    }

    fn band_at(&self, action: &Action) -> Option<SubBandId> {
        let bands = &self.last_stats.sub_bands;
        if bands.is_empty() {
            return None;
        }
        Some(bands[action.0 as usize % bands.len()].id)
    }
}

impl PolicyPort for GreedyPolicy {
    fn begin_window(&mut self, stats: &WindowStatistics) {
        self.last_stats = stats.clone();
    }

    fn current_observation(&mut self) -> Observation {
        Observation::from_stats(&self.last_stats)
    }

    fn sample_random_action(&mut self) -> Action {
        let n = self.last_stats.sub_bands.len().max(1) as u32;
        Action(self.rng.gen_range(0..n))
    }

    fn best_action(&mut self, observation: &Observation) -> Action {
        // Argmax of expected capacity, first-seen (lowest index) on ties.
        let mut best = 0u32;
        let mut best_metric = 0.0;
        for (idx, row) in observation.sub_bands.iter().enumerate() {
            let rbs = self
                .registry
                .num_resource_blocks(row.sub_band)
                .unwrap_or(0);
            let bits = self
                .last_stats
                .sub_bands
                .iter()
                .find(|b| b.id == row.sub_band)
                .map(|b| b.avg_bits_per_rb)
                .unwrap_or(0.0);
            let metric = (1.0 - row.failure_rate) * bits * f64::from(rbs);
            if metric > best_metric {
                best_metric = metric;
                best = idx as u32;
            }
        }
        Action(best)
    }

    fn apply_action(&mut self, action: &Action) -> Vec<(TerminalId, SubBandId)> {
        let Some(band) = self.band_at(action) else {
            return Vec::new();
        };
        self.last_stats
            .terminals
            .iter()
            .map(|t| (t.id, band))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SimClock;
    use crate::phy::SimPhy;
    use crate::sched::stats::{SubBandSnapshot, TerminalSnapshot};
    use std::time::Duration;

    fn stats() -> WindowStatistics {
        let mut b0 = SubBandSnapshot::new(SubBandId(0));
        b0.failure_rate = 0.1;
        b0.avg_bits_per_rb = 20.0;
        let mut b1 = SubBandSnapshot::new(SubBandId(1));
        b1.failure_rate = 0.5;
        b1.avg_bits_per_rb = 20.0;
        WindowStatistics {
            window: 3,
            sub_bands: vec![b0, b1],
            terminals: (0..2)
                .map(|t| TerminalSnapshot {
                    id: TerminalId(t),
                    sub_band: SubBandId(1),
                    queue_size: 5,
                    hol_delay: 0.002,
                    throughput: 100.0,
                    avg_bits_per_rb: 18.0,
                })
                .collect(),
        }
    }

    fn greedy() -> GreedyPolicy {
        let clock = SimClock::new();
        let phy = Rc::new(RefCell::new(SimPhy::new()));
        let registry = crate::registry::SubBandRegistry::new(
            clock,
            phy,
            SubBandId(0),
            Duration::from_millis(1),
        );
        registry.add_sub_band(SubBandId(0), 10).unwrap();
        registry.add_sub_band(SubBandId(1), 10).unwrap();
        GreedyPolicy::with_seed(registry, 11)
    }

    #[test]
    fn test_observation_flatten_layout() {
        let obs = Observation::from_stats(&stats());
        let flat = obs.flatten();
        // 2 terminals * (5 + 2 one-hot) + 2 bands * 3.
        assert_eq!(flat.len(), 2 * 7 + 6);
        // First terminal row: queue, hol, bits, throughput, bits, one-hot.
        assert_eq!(flat[0], 5.0);
        assert!((flat[1] - 0.002).abs() < 1e-12);
        assert_eq!(flat[2], 18.0);
        assert_eq!(flat[3], 100.0);
        assert_eq!(flat[4], 18.0);
        assert_eq!(&flat[5..7], &[0.0, 1.0]);
    }

    #[test]
    fn test_reward_matches_formula() {
        let weights = RewardWeights::default();
        let reward = window_reward(&stats(), &weights).unwrap();
        // avg hol 0.002, total throughput 200.
        let expected = -(1.0 * 0.002 + 1.0 * (1000.0 - 200.0));
        assert!((reward - expected).abs() < 1e-9);
    }

    #[test]
    fn test_reward_skipped_with_no_terminals() {
        let empty = WindowStatistics::default();
        assert!(window_reward(&empty, &RewardWeights::default()).is_none());
    }

    #[test]
    fn test_greedy_best_action_is_argmax_capacity() {
        let mut policy = greedy();
        policy.begin_window(&stats());
        let obs = policy.current_observation();
        // Metrics: band 0 -> 0.9*20*10 = 180, band 1 -> 0.5*20*10 = 100.
        let action = policy.best_action(&obs);
        assert_eq!(action, Action(0));
    }

    #[test]
    fn test_greedy_apply_maps_every_terminal() {
        let mut policy = greedy();
        policy.begin_window(&stats());
        let moves = policy.apply_action(&Action(0));
        assert_eq!(
            moves,
            vec![(TerminalId(0), SubBandId(0)), (TerminalId(1), SubBandId(0))]
        );
        // Action values wrap modulo the sub-band count.
        let moves = policy.apply_action(&Action(3));
        assert!(moves.iter().all(|&(_, band)| band == SubBandId(1)));
    }

    #[test]
    fn test_random_action_in_range() {
        let mut policy = greedy();
        policy.begin_window(&stats());
        for _ in 0..50 {
            let action = policy.sample_random_action();
            assert!(action.0 < 2);
        }
    }
}
