//! Listen-Before-Talk channel access.
//!
//! This module arbitrates physical access to each sub-band with a
//! collision-avoidance contention procedure and maintains the live
//! statistics the decision layer feeds on:
//!
//! - **ICCA** (immediate clear-channel assessment): an instantaneous
//!   busy/idle check against the current busy interval.
//! - **ECCA** (extended clear-channel assessment): a uniform random backoff
//!   bounded by the contention window, which doubles on failure and resets
//!   to its floor on success.
//! - **Interference process**: per sub-band, a self-sustaining renewal
//!   process of coexisting-traffic bursts with exponential inter-arrival
//!   gaps.
//!
//! Every query is `Result`-typed: an unknown sub-band is a typed error, and
//! the caller decides whether that means a bug or a tolerable default.

mod controller;
mod knobs;
mod state;

pub use controller::{AccessOutcome, DenialReason, LbtController};
pub use knobs::LbtKnobs;
pub use state::ChannelAccessState;
