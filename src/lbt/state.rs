//! Per-sub-band channel-access state.

use crate::clock::SimInstant;

/// Live contention state for one registered sub-band.
///
/// Created at registration, mutated on every access request and interference
/// arrival, destroyed at deregistration. The attempt/failure counters are
/// monotone for the lifetime of the registration; they are deliberately
/// decoupled from the decision window's rolling counters.
#[derive(Clone, Debug)]
pub struct ChannelAccessState {
    /// Current contention window, always within `[cw_min, cw_max]`.
    pub contention_window: u16,
    /// Poisson arrival rate of coexisting traffic, in arrivals per second.
    pub interference_mean: f64,
    /// Smoothed share of time the channel is held by coexisting traffic.
    pub occupancy: f64,
    /// Smoothed access-failure rate.
    pub failure_rate: f64,
    /// Total access attempts since registration.
    pub total_attempts: u64,
    /// Total denied attempts since registration.
    pub total_failures: u64,
    /// Total interference arrivals since registration.
    pub total_arrivals: u64,
    /// Channel is externally busy until this instant.
    pub busy_until: SimInstant,
    /// We hold the channel (MCOT grant) until this instant.
    pub occupied_until: SimInstant,
    /// When the next interference arrival is scheduled to land.
    pub next_arrival_at: SimInstant,
    /// Last occupancy-statistics update.
    pub last_update: SimInstant,
}

impl ChannelAccessState {
    /// Fresh state for a newly registered sub-band.
    pub fn new(cw_min: u16, interference_mean: f64, now: SimInstant) -> Self {
        Self {
            contention_window: cw_min,
            interference_mean,
            occupancy: 0.0,
            failure_rate: 0.0,
            total_attempts: 0,
            total_failures: 0,
            total_arrivals: 0,
            busy_until: now,
            occupied_until: now,
            next_arrival_at: now,
            last_update: now,
        }
    }

    /// Record a denied attempt and refresh the smoothed failure rate:
    /// `rate' = (1 - alpha) * rate + alpha * (failures / attempts)`.
    pub fn record_failure(&mut self, alpha: f64) {
        self.total_failures += 1;
        let current = self.total_failures as f64 / self.total_attempts as f64;
        self.failure_rate = (1.0 - alpha) * self.failure_rate + alpha * current;
    }

    /// Double the contention window, capped at `cw_max`.
    pub fn grow_contention_window(&mut self, cw_max: u16) {
        self.contention_window = (self.contention_window.saturating_mul(2)).min(cw_max);
    }

    /// Reset the contention window after a successful access.
    pub fn reset_contention_window(&mut self, cw_min: u16) {
        self.contention_window = cw_min;
    }

    /// Fold one busy burst into the smoothed occupancy.
    ///
    /// The sample is the busy share of the time elapsed since the previous
    /// arrival, clamped to 1.0 so overlapping bursts cannot push the
    /// smoothed value out of `[0, 1]`.
    pub fn fold_occupancy(&mut self, busy_secs: f64, elapsed_secs: f64, alpha: f64) {
        let sample = if elapsed_secs > 0.0 {
            (busy_secs / elapsed_secs).min(1.0)
        } else {
            1.0
        };
        self.occupancy = (1.0 - alpha) * self.occupancy + alpha * sample;
    }
}
