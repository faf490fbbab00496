//! # airtime-rs
//!
//! **Who gets the channel, and who goes where**
//!
//! A deterministic simulator for spectrum-sharing channel access and
//! bandwidth-part ("sub-band") assignment in unlicensed spectrum.
//!
//! ## Features
//!
//! - **LBT channel access**: per-sub-band ICCA/ECCA contention with a
//!   binary-exponential contention window and smoothed failure/occupancy
//!   statistics
//! - **Coexistence model**: a self-sustaining Poisson interference process
//!   per sub-band, reconfigurable at runtime
//! - **Decision-window scheduling**: periodic terminal-to-sub-band
//!   assignment with two interchangeable policies, a closed-form capacity
//!   heuristic (LCA) and an epsilon-greedy RL-policy adapter (RLA)
//! - **Virtual time**: a single-threaded earliest-first event queue; runs
//!   are reproducible down to the RNG seed
//! - **Flexible configuration**: files (TOML/YAML/JSON), environment
//!   variables, programmatic overrides, and clap CLI arguments via figment
//!
//! ## Quick Start
//!
//! ```ignore
//! use airtime_rs::AirtimeBuilder;
//! use std::time::Duration;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let sim = AirtimeBuilder::new()
//!         .time_window_slots(200)
//!         .seed(42)
//!         .build()?;
//!
//!     // Two sub-bands: 10 RBs each, light vs heavy coexisting traffic.
//!     sim.add_sub_band(0.into(), 10, 50.0)?;
//!     sim.add_sub_band(1.into(), 10, 400.0)?;
//!     for t in 0..5 {
//!         sim.add_terminal(t.into())?;
//!     }
//!
//!     sim.start()?;
//!     sim.run_for(Duration::from_secs(10));
//!
//!     let stats = sim.scheduler().last_statistics().unwrap();
//!     for band in &stats.sub_bands {
//!         println!(
//!             "sub-band {}: failure rate {:.3}, occupancy {:.3}",
//!             band.id, band.failure_rate, band.occupancy
//!         );
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! Configuration sources are merged in order (later sources override
//! earlier): defaults, config files, environment variables, programmatic
//! overrides, CLI arguments.
//!
//! ### Config File Example (TOML)
//!
//! ```toml
//! algorithm = "lca"
//! time_window_slots = 500
//! max_scheduled_terminals = 16
//! switch_latency_slots = 2
//!
//! [lbt]
//! cw_min = 8
//! cw_max = 128
//! mcot_slots = 5
//! ```
//!
//! ### Environment Variables
//!
//! With `.env_prefix("AIRTIME")`:
//! - `AIRTIME_ALGORITHM=rla`
//! - `AIRTIME_TIME_WINDOW_SLOTS=250`
//! - `AIRTIME_EPSILON=0.8`
//!
//! ## Collaborator boundaries
//!
//! The physical layer and the learning environment stay outside the crate:
//! implement [`PhyPort`] for metering/notification and [`PolicyPort`] for
//! the RLA oracle. [`SimPhy`] and [`GreedyPolicy`] are built-in reference
//! implementations for tests and demos.

pub mod builder;
pub mod clock;
pub mod config;
pub mod error;
pub mod lbt;
pub mod phy;
pub mod registry;
pub mod rl;
pub mod sched;
pub mod sim;
pub mod types;

pub use builder::{AirtimeArgs, AirtimeBuilder};
pub use clock::{SimClock, SimInstant};
pub use config::AirtimeConfig;
pub use error::{AirtimeError, Result};
pub use lbt::{AccessOutcome, DenialReason, LbtController, LbtKnobs};
pub use phy::{PhyPort, SimPhy};
pub use registry::SubBandRegistry;
pub use rl::{Action, GreedyPolicy, Observation, PolicyPort, RewardWeights};
pub use sched::{AlgorithmType, DecisionScheduler, WindowStatistics};
pub use sim::AirtimeSim;
pub use types::{slots, SubBandId, TerminalId, SLOT};
