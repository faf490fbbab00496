//! Per-sub-band channel-access arbitration.
//!
//! The controller owns one [`ChannelAccessState`] per registered sub-band,
//! runs the coexisting-traffic interference process on the virtual clock, and
//! answers access requests with the ICCA/ECCA procedure:
//!
//! 1. **ICCA**: if the channel is currently busy, deny immediately.
//! 2. **ECCA**: draw a uniform backoff in `[0, contention_window)` slots. If
//!    the next interference arrival lands before the backoff completes, the
//!    wait is interrupted: deny and double the contention window (capped).
//!    Otherwise grant the channel for one MCOT and reset the window.
//!
//! A denied request is an outcome, not an error; the caller decides whether
//! and when to retry.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::Duration;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Exp};
use tracing::debug;

use crate::clock::SimClock;
use crate::error::{AirtimeError, Result};
use crate::types::{slots, SubBandId};

use super::knobs::LbtKnobs;
use super::state::ChannelAccessState;

/// Outcome of a channel-access request.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum AccessOutcome {
    /// Channel granted for one MCOT.
    Granted,
    /// Channel denied.
    Denied(DenialReason),
}

/// Why an access request was denied.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DenialReason {
    /// ICCA: the channel was already busy at request time.
    ChannelBusy,
    /// ECCA: an interference arrival would interrupt the backoff wait.
    BackoffInterrupted,
}

impl AccessOutcome {
    /// True if the request was granted.
    pub fn is_granted(self) -> bool {
        matches!(self, AccessOutcome::Granted)
    }
}

struct ControllerCore {
    knobs: LbtKnobs,
    bands: BTreeMap<SubBandId, ChannelAccessState>,
    rng: SmallRng,
}

/// Channel-access controller for all registered sub-bands.
///
/// Cloneable handle; all clones share the same state. Single-threaded by
/// design: every operation runs to completion on the virtual timeline.
#[derive(Clone)]
pub struct LbtController {
    clock: SimClock,
    core: Rc<RefCell<ControllerCore>>,
}

impl LbtController {
    /// Create a controller with entropy-seeded randomness.
    pub fn new(clock: SimClock, knobs: LbtKnobs) -> Self {
        Self::with_rng(clock, knobs, SmallRng::from_entropy())
    }

    /// Create a controller with a fixed seed for reproducible runs.
    pub fn with_seed(clock: SimClock, knobs: LbtKnobs, seed: u64) -> Self {
        Self::with_rng(clock, knobs, SmallRng::seed_from_u64(seed))
    }

    fn with_rng(clock: SimClock, knobs: LbtKnobs, rng: SmallRng) -> Self {
        Self {
            clock,
            core: Rc::new(RefCell::new(ControllerCore {
                knobs,
                bands: BTreeMap::new(),
                rng,
            })),
        }
    }

    /// The knobs this controller was built with.
    pub fn knobs(&self) -> LbtKnobs {
        self.core.borrow().knobs.clone()
    }

    /// Register a sub-band and start its interference process.
    ///
    /// `interference_mean` is the coexisting-traffic arrival rate in arrivals
    /// per second; it must be finite and strictly positive. Registering an id
    /// that already exists is an error; deregistering first creates fresh
    /// state with zeroed counters.
    pub fn register_sub_band(&self, id: SubBandId, interference_mean: f64) -> Result<()> {
        check_rate(interference_mean)?;
        {
            let mut core = self.core.borrow_mut();
            if core.bands.contains_key(&id) {
                return Err(AirtimeError::DuplicateSubBand(id));
            }
            let cw_min = core.knobs.cw_min;
            let state = ChannelAccessState::new(cw_min, interference_mean, self.clock.now());
            core.bands.insert(id, state);
        }
        debug!(sub_band = %id, rate = interference_mean, "registered sub-band");
        self.schedule_next_arrival(id);
        Ok(())
    }

    /// Deregister a sub-band, destroying its state.
    ///
    /// The already scheduled interference arrival for this id fires into a
    /// no-op; there is no event cancellation.
    pub fn deregister_sub_band(&self, id: SubBandId) -> Result<()> {
        self.core
            .borrow_mut()
            .bands
            .remove(&id)
            .map(|_| ())
            .ok_or(AirtimeError::UnknownSubBand(id))
    }

    /// Reconfigure the interference arrival rate without touching statistics.
    ///
    /// Takes effect from the next scheduled arrival onward.
    pub fn set_interference_rate(&self, id: SubBandId, interference_mean: f64) -> Result<()> {
        check_rate(interference_mean)?;
        let mut core = self.core.borrow_mut();
        let state = core
            .bands
            .get_mut(&id)
            .ok_or(AirtimeError::UnknownSubBand(id))?;
        state.interference_mean = interference_mean;
        Ok(())
    }

    /// Run the contention procedure for one access request, evaluated at the
    /// current simulated time.
    pub fn request_access(&self, id: SubBandId) -> Result<AccessOutcome> {
        let now = self.clock.now();
        let mut core = self.core.borrow_mut();
        let ControllerCore { knobs, bands, rng } = &mut *core;
        let state = bands.get_mut(&id).ok_or(AirtimeError::UnknownSubBand(id))?;

        state.total_attempts += 1;

        // ICCA: the channel is already known busy.
        if now < state.busy_until {
            state.record_failure(knobs.stat_alpha);
            debug!(sub_band = %id, "access denied: channel busy");
            return Ok(AccessOutcome::Denied(DenialReason::ChannelBusy));
        }

        // ECCA: random backoff, interrupted if an arrival lands first.
        let backoff = rng.gen_range(0..state.contention_window);
        let completion = now + slots(u32::from(knobs.icca_slots) + u32::from(backoff));

        // Equal timestamps count as busy: arrivals are applied before any
        // access check at the same instant.
        if state.next_arrival_at <= completion {
            state.record_failure(knobs.stat_alpha);
            state.grow_contention_window(knobs.cw_max);
            debug!(
                sub_band = %id,
                backoff,
                cw = state.contention_window,
                "access denied: backoff interrupted"
            );
            return Ok(AccessOutcome::Denied(DenialReason::BackoffInterrupted));
        }

        state.reset_contention_window(knobs.cw_min);
        state.occupied_until = now + slots(u32::from(knobs.mcot_slots));
        debug!(sub_band = %id, backoff, until = %state.occupied_until, "access granted");
        Ok(AccessOutcome::Granted)
    }

    /// Smoothed access-failure rate for a sub-band.
    pub fn failure_rate(&self, id: SubBandId) -> Result<f64> {
        self.query(id, |s| s.failure_rate)
    }

    /// Smoothed coexisting-traffic occupancy for a sub-band.
    pub fn occupancy(&self, id: SubBandId) -> Result<f64> {
        self.query(id, |s| s.occupancy)
    }

    /// Current contention window for a sub-band.
    pub fn contention_window(&self, id: SubBandId) -> Result<u16> {
        self.query(id, |s| s.contention_window)
    }

    /// Total (attempts, failures) since registration.
    pub fn attempt_counts(&self, id: SubBandId) -> Result<(u64, u64)> {
        self.query(id, |s| (s.total_attempts, s.total_failures))
    }

    /// Total interference arrivals since registration.
    pub fn arrival_count(&self, id: SubBandId) -> Result<u64> {
        self.query(id, |s| s.total_arrivals)
    }

    fn query<T>(&self, id: SubBandId, f: impl FnOnce(&ChannelAccessState) -> T) -> Result<T> {
        self.core
            .borrow()
            .bands
            .get(&id)
            .map(f)
            .ok_or(AirtimeError::UnknownSubBand(id))
    }

    /// One interference arrival: mark the channel busy for a short burst,
    /// fold the occupancy statistic, and reschedule (self-sustaining renewal).
    fn handle_arrival(&self, id: SubBandId) {
        let now = self.clock.now();
        let next_gap = {
            let mut core = self.core.borrow_mut();
            let ControllerCore { knobs, bands, rng } = &mut *core;
            let Some(state) = bands.get_mut(&id) else {
                debug!(sub_band = %id, "arrival for deregistered sub-band dropped");
                return;
            };

            let busy_slots = rng.gen_range(knobs.busy_min_slots..=knobs.busy_max_slots);
            let busy = slots(u32::from(busy_slots));
            state.busy_until = now + busy;
            state.total_arrivals += 1;

            let elapsed = now.saturating_since(state.last_update);
            state.fold_occupancy(busy.as_secs_f64(), elapsed.as_secs_f64(), knobs.stat_alpha);
            state.last_update = now;

            let gap = draw_gap(rng, state.interference_mean);
            state.next_arrival_at = now + gap;
            gap
        };
        let controller = self.clone();
        self.clock
            .schedule_after(next_gap, move || controller.handle_arrival(id));
    }

    fn schedule_next_arrival(&self, id: SubBandId) {
        let gap = {
            let mut core = self.core.borrow_mut();
            let ControllerCore { bands, rng, .. } = &mut *core;
            let Some(state) = bands.get_mut(&id) else {
                return;
            };
            let gap = draw_gap(rng, state.interference_mean);
            state.next_arrival_at = self.clock.now() + gap;
            gap
        };
        let controller = self.clone();
        self.clock
            .schedule_after(gap, move || controller.handle_arrival(id));
    }
}

/// Exponential inter-arrival gap with mean `1 / rate`; strictly positive.
fn draw_gap(rng: &mut SmallRng, rate: f64) -> Duration {
    let exp = Exp::new(rate).expect("interference rate validated at registration");
    let secs = exp.sample(rng).max(1e-9);
    Duration::from_secs_f64(secs)
}

fn check_rate(rate: f64) -> Result<()> {
    if !rate.is_finite() || rate <= 0.0 {
        return Err(AirtimeError::InvalidConfig(format!(
            "interference rate {rate} must be finite and strictly positive"
        )));
    }
    Ok(())
}
