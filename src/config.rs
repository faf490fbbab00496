//! Configuration types for the simulation.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AirtimeError, Result};
use crate::lbt::LbtKnobs;
use crate::rl::RewardWeights;
use crate::sched::AlgorithmType;
use crate::types::{slots, SubBandId};

/// Configuration for an airtime simulation.
///
/// This struct can be deserialized from TOML, YAML, JSON, or environment
/// variables using figment; see [`crate::builder::AirtimeBuilder`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AirtimeConfig {
    /// Assignment policy run at each decision boundary (default: `lca`).
    ///
    /// Selecting `rla` requires a policy adapter to be attached, otherwise
    /// starting the scheduler fails.
    #[serde(default)]
    pub algorithm: AlgorithmType,

    /// Decision window length in slots (default: 500, i.e. 250 ms).
    #[serde(default = "default_time_window_slots")]
    pub time_window_slots: u32,

    /// Above this many terminals, LCA switches from single-best to
    /// proportional assignment (default: 16).
    #[serde(default = "default_max_scheduled_terminals")]
    pub max_scheduled_terminals: u32,

    /// Initial exploration rate for RLA (default: 1.0).
    #[serde(default = "default_epsilon")]
    pub epsilon: f64,

    /// Exploration-rate floor (default: 0.01).
    #[serde(default = "default_epsilon_min")]
    pub epsilon_min: f64,

    /// Multiplicative exploration decay per window (default: 0.995).
    #[serde(default = "default_epsilon_decay")]
    pub epsilon_decay: f64,

    /// Latency between recording a sub-band switch and the PHY hearing about
    /// it, in slots (default: 2, i.e. 1 ms).
    #[serde(default = "default_switch_latency_slots")]
    pub switch_latency_slots: u32,

    /// Sub-band newly added terminals attach to (default: 0).
    #[serde(default)]
    pub default_sub_band: SubBandId,

    /// Seed for all random draws; entropy-seeded when absent.
    #[serde(default)]
    pub rng_seed: Option<u64>,

    /// Channel-access knobs.
    #[serde(default)]
    pub lbt: LbtKnobs,

    /// Window-reward weights for RLA bookkeeping.
    #[serde(default)]
    pub reward: RewardWeights,
}

fn default_time_window_slots() -> u32 {
    500
}

fn default_max_scheduled_terminals() -> u32 {
    16
}

fn default_epsilon() -> f64 {
    1.0
}

fn default_epsilon_min() -> f64 {
    0.01
}

fn default_epsilon_decay() -> f64 {
    0.995
}

fn default_switch_latency_slots() -> u32 {
    2
}

impl Default for AirtimeConfig {
    fn default() -> Self {
        Self {
            algorithm: AlgorithmType::default(),
            time_window_slots: default_time_window_slots(),
            max_scheduled_terminals: default_max_scheduled_terminals(),
            epsilon: default_epsilon(),
            epsilon_min: default_epsilon_min(),
            epsilon_decay: default_epsilon_decay(),
            switch_latency_slots: default_switch_latency_slots(),
            default_sub_band: SubBandId(0),
            rng_seed: None,
            lbt: LbtKnobs::default(),
            reward: RewardWeights::default(),
        }
    }
}

impl AirtimeConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Duration of one decision window.
    pub fn window_duration(&self) -> Duration {
        slots(self.time_window_slots)
    }

    /// Duration of the switch-notification latency.
    pub fn switch_latency(&self) -> Duration {
        slots(self.switch_latency_slots)
    }

    /// Check the configuration for internal consistency.
    pub fn validate(&self) -> Result<()> {
        self.lbt.validate()?;
        if self.time_window_slots == 0 {
            return Err(AirtimeError::InvalidConfig(
                "time_window_slots must be at least 1".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.epsilon) {
            return Err(AirtimeError::InvalidConfig(format!(
                "epsilon {} must be in [0, 1]",
                self.epsilon
            )));
        }
        if !(0.0..=1.0).contains(&self.epsilon_min) || self.epsilon_min > self.epsilon {
            return Err(AirtimeError::InvalidConfig(format!(
                "epsilon_min {} must be in [0, epsilon]",
                self.epsilon_min
            )));
        }
        if !(self.epsilon_decay > 0.0 && self.epsilon_decay <= 1.0) {
            return Err(AirtimeError::InvalidConfig(format!(
                "epsilon_decay {} must be in (0, 1]",
                self.epsilon_decay
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AirtimeConfig::default();
        assert_eq!(config.algorithm, AlgorithmType::Lca);
        assert_eq!(config.time_window_slots, 500);
        assert_eq!(config.max_scheduled_terminals, 16);
        assert!((config.epsilon - 1.0).abs() < 1e-12);
        assert!((config.epsilon_min - 0.01).abs() < 1e-12);
        assert!((config.epsilon_decay - 0.995).abs() < 1e-12);
        assert_eq!(config.default_sub_band, SubBandId(0));
        assert!(config.rng_seed.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_window_durations() {
        let config = AirtimeConfig::default();
        assert_eq!(config.window_duration(), Duration::from_millis(250));
        assert_eq!(config.switch_latency(), Duration::from_millis(1));
    }

    #[test]
    fn test_validate_rejects_bad_epsilon() {
        let mut config = AirtimeConfig::default();
        config.epsilon = 1.5;
        assert!(config.validate().is_err());

        let mut config = AirtimeConfig::default();
        config.epsilon = 0.005;
        // Floor above the starting value is inconsistent.
        assert!(config.validate().is_err());

        let mut config = AirtimeConfig::default();
        config.epsilon_decay = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_window() {
        let mut config = AirtimeConfig::default();
        config.time_window_slots = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_deserialize_config() {
        let toml = r#"
            algorithm = "rla"
            time_window_slots = 100
            max_scheduled_terminals = 8
            epsilon = 0.8
            rng_seed = 42

            [lbt]
            cw_min = 4
            cw_max = 64
        "#;

        let config: AirtimeConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.algorithm, AlgorithmType::Rla);
        assert_eq!(config.time_window_slots, 100);
        assert_eq!(config.max_scheduled_terminals, 8);
        assert!((config.epsilon - 0.8).abs() < 1e-12);
        assert_eq!(config.rng_seed, Some(42));
        assert_eq!(config.lbt.cw_min, 4);
        assert_eq!(config.lbt.cw_max, 64);
        // Untouched fields keep their defaults.
        assert!((config.epsilon_decay - 0.995).abs() < 1e-12);
        assert_eq!(config.lbt.mcot_slots, 5);
    }
}
