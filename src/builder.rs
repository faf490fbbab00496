//! Builder pattern for constructing simulations.
//!
//! The builder supports multiple configuration sources using figment:
//! - Default values
//! - Config files (TOML, YAML, JSON)
//! - Environment variables
//! - Programmatic overrides
//! - CLI arguments via clap
//!
//! The PHY and policy collaborators are not serializable and are attached
//! programmatically with [`AirtimeBuilder::phy`] / [`AirtimeBuilder::policy`].

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use figment::Figment;

use crate::config::AirtimeConfig;
use crate::error::Result;
use crate::lbt::LbtKnobs;
use crate::phy::{PhyPort, SimPhy};
use crate::rl::{PolicyPort, RewardWeights};
use crate::sched::AlgorithmType;
use crate::sim::AirtimeSim;

/// Builder for an [`AirtimeSim`].
///
/// Configuration sources are merged in the following order (later sources
/// override earlier):
/// 1. Default values
/// 2. Config files (in order added)
/// 3. Environment variables
/// 4. Programmatic overrides
/// 5. CLI arguments
///
/// # Examples
///
/// ```ignore
/// use airtime_rs::AirtimeBuilder;
///
/// let sim = AirtimeBuilder::new()
///     .file("airtime.toml")
///     .env_prefix("AIRTIME")
///     .time_window_slots(200)
///     .seed(42)
///     .build()?;
/// ```
pub struct AirtimeBuilder {
    figment: Figment,
    phy: Option<Rc<RefCell<dyn PhyPort>>>,
    policy: Option<Rc<RefCell<dyn PolicyPort>>>,
}

impl Default for AirtimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AirtimeBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AirtimeBuilder")
            .field("figment", &self.figment)
            .field("phy", &self.phy.as_ref().map(|_| "<PhyPort>"))
            .field("policy", &self.policy.as_ref().map(|_| "<PolicyPort>"))
            .finish()
    }
}

impl AirtimeBuilder {
    /// Create a new builder with default configuration.
    pub fn new() -> Self {
        Self {
            figment: Figment::from(Serialized::defaults(AirtimeConfig::default())),
            phy: None,
            policy: None,
        }
    }

    /// Add a configuration file.
    ///
    /// Supports TOML, YAML, and JSON formats (detected by extension).
    /// Files are merged in the order they are added.
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        let path = path.as_ref();
        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        self.figment = match extension.to_lowercase().as_str() {
            "toml" => self.figment.merge(Toml::file(path)),
            "yaml" | "yml" => self.figment.merge(Yaml::file(path)),
            "json" => self.figment.merge(Json::file(path)),
            _ => {
                // Default to TOML
                self.figment.merge(Toml::file(path))
            }
        };
        self
    }

    /// Add environment variables with a prefix.
    ///
    /// Variables are expected in the format `{PREFIX}_{KEY}`, e.g.
    /// `AIRTIME_EPSILON`, `AIRTIME_TIME_WINDOW_SLOTS`.
    pub fn env_prefix(mut self, prefix: &str) -> Self {
        self.figment = self.figment.merge(Env::prefixed(&format!("{prefix}_")));
        self
    }

    /// Set the assignment algorithm.
    pub fn algorithm(mut self, algorithm: AlgorithmType) -> Self {
        self.figment = self
            .figment
            .merge(Serialized::default("algorithm", algorithm));
        self
    }

    /// Set the decision window length in slots.
    pub fn time_window_slots(mut self, slots: u32) -> Self {
        self.figment = self
            .figment
            .merge(Serialized::default("time_window_slots", slots));
        self
    }

    /// Set the single-best vs proportional LCA threshold.
    pub fn max_scheduled_terminals(mut self, count: u32) -> Self {
        self.figment = self
            .figment
            .merge(Serialized::default("max_scheduled_terminals", count));
        self
    }

    /// Set the initial exploration rate.
    pub fn epsilon(mut self, epsilon: f64) -> Self {
        self.figment = self.figment.merge(Serialized::default("epsilon", epsilon));
        self
    }

    /// Set the exploration-rate floor.
    pub fn epsilon_min(mut self, floor: f64) -> Self {
        self.figment = self
            .figment
            .merge(Serialized::default("epsilon_min", floor));
        self
    }

    /// Set the per-window exploration decay.
    pub fn epsilon_decay(mut self, decay: f64) -> Self {
        self.figment = self
            .figment
            .merge(Serialized::default("epsilon_decay", decay));
        self
    }

    /// Set the switch-notification latency in slots.
    pub fn switch_latency_slots(mut self, slots: u32) -> Self {
        self.figment = self
            .figment
            .merge(Serialized::default("switch_latency_slots", slots));
        self
    }

    /// Seed all random draws for a reproducible run.
    pub fn seed(mut self, seed: u64) -> Self {
        self.figment = self.figment.merge(Serialized::default("rng_seed", seed));
        self
    }

    /// Set the channel-access knobs.
    pub fn lbt_knobs(mut self, knobs: LbtKnobs) -> Self {
        self.figment = self.figment.merge(Serialized::default("lbt", knobs));
        self
    }

    /// Set the window-reward weights.
    pub fn reward_weights(mut self, weights: RewardWeights) -> Self {
        self.figment = self.figment.merge(Serialized::default("reward", weights));
        self
    }

    /// Attach the PHY collaborator.
    ///
    /// Defaults to a fresh [`SimPhy`] when not provided.
    pub fn phy(mut self, phy: Rc<RefCell<dyn PhyPort>>) -> Self {
        self.phy = Some(phy);
        self
    }

    /// Attach the RL policy adapter (required for RLA).
    pub fn policy(mut self, policy: Rc<RefCell<dyn PolicyPort>>) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Apply CLI argument overrides.
    ///
    /// This method applies any non-None values from the `AirtimeArgs` struct.
    pub fn with_cli_args(mut self, args: &AirtimeArgs) -> Self {
        if let Some(ref algorithm) = args.airtime_algorithm {
            self.figment = self
                .figment
                .merge(Serialized::default("algorithm", algorithm.to_lowercase()));
        }
        if let Some(slots) = args.airtime_window_slots {
            self.figment = self
                .figment
                .merge(Serialized::default("time_window_slots", slots));
        }
        if let Some(count) = args.airtime_max_scheduled {
            self.figment = self
                .figment
                .merge(Serialized::default("max_scheduled_terminals", count));
        }
        if let Some(epsilon) = args.airtime_epsilon {
            self.figment = self.figment.merge(Serialized::default("epsilon", epsilon));
        }
        if let Some(seed) = args.airtime_seed {
            self.figment = self.figment.merge(Serialized::default("rng_seed", seed));
        }
        self
    }

    /// Build the simulation.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration extraction or validation fails, or
    /// if RLA is selected without an attached policy adapter.
    pub fn build(self) -> Result<AirtimeSim> {
        let config: AirtimeConfig = self.figment.extract().map_err(Box::new)?;
        let phy = self
            .phy
            .unwrap_or_else(|| Rc::new(RefCell::new(SimPhy::new())));
        AirtimeSim::from_config(config, phy, self.policy)
    }
}

/// CLI arguments for airtime configuration.
///
/// Use with clap's `Parser` derive macro and apply to a builder with
/// [`AirtimeBuilder::with_cli_args`].
///
/// # Examples
///
/// ```ignore
/// use clap::Parser;
/// use airtime_rs::{AirtimeBuilder, AirtimeArgs};
///
/// #[derive(Parser)]
/// struct MyArgs {
///     #[command(flatten)]
///     airtime: AirtimeArgs,
///     // ... other args
/// }
///
/// let args = MyArgs::parse();
/// let sim = AirtimeBuilder::new()
///     .with_cli_args(&args.airtime)
///     .build()?;
/// ```
#[derive(Debug, Default, Clone, clap::Args)]
pub struct AirtimeArgs {
    /// Assignment algorithm (lca or rla)
    #[arg(long)]
    pub airtime_algorithm: Option<String>,

    /// Decision window length in slots
    #[arg(long)]
    pub airtime_window_slots: Option<u32>,

    /// Single-best vs proportional LCA threshold
    #[arg(long)]
    pub airtime_max_scheduled: Option<u32>,

    /// Initial exploration rate
    #[arg(long)]
    pub airtime_epsilon: Option<f64>,

    /// RNG seed for reproducible runs
    #[arg(long)]
    pub airtime_seed: Option<u64>,
}
