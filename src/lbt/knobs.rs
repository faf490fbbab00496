//! Configuration knobs for the channel-access procedure.
//!
//! Defaults follow the usual collision-avoidance parameterization for
//! unlicensed operation: an 8..128 contention window, a one-slot immediate
//! check, and a five-slot maximum occupancy grant.

use serde::{Deserialize, Serialize};

use crate::error::{AirtimeError, Result};

/// Knobs for the per-sub-band Listen-Before-Talk procedure.
///
/// All durations are expressed in 500 µs slots. Fields omitted from a config
/// file keep their defaults.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LbtKnobs {
    /// Minimum contention window size.
    /// The window resets to this value after every successful access.
    /// Default: 8
    pub cw_min: u16,

    /// Maximum contention window size.
    /// Doubling on failure is capped here.
    /// Default: 128
    pub cw_max: u16,

    /// Immediate clear-channel assessment duration in slots, deferred before
    /// the random backoff completes.
    /// Default: 1
    pub icca_slots: u16,

    /// Maximum Channel Occupancy Time in slots granted on success.
    /// Default: 5
    pub mcot_slots: u16,

    /// Shortest coexisting-traffic busy burst in slots.
    /// Default: 1
    pub busy_min_slots: u16,

    /// Longest coexisting-traffic busy burst in slots.
    /// Default: 5
    pub busy_max_slots: u16,

    /// Smoothing weight given to the newest failure-rate/occupancy sample;
    /// history keeps `1 - stat_alpha`.
    /// Default: 0.1
    pub stat_alpha: f64,
}

impl Default for LbtKnobs {
    fn default() -> Self {
        Self {
            cw_min: 8,
            cw_max: 128,
            icca_slots: 1,
            mcot_slots: 5,
            busy_min_slots: 1,
            busy_max_slots: 5,
            stat_alpha: 0.1,
        }
    }
}

impl LbtKnobs {
    /// Create knobs with all defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the contention-window bounds.
    pub fn with_contention_window(mut self, cw_min: u16, cw_max: u16) -> Self {
        self.cw_min = cw_min;
        self.cw_max = cw_max;
        self
    }

    /// Builder method to set the MCOT grant length in slots.
    pub fn with_mcot_slots(mut self, slots: u16) -> Self {
        self.mcot_slots = slots;
        self
    }

    /// Builder method to set the busy-burst range in slots.
    pub fn with_busy_burst(mut self, min_slots: u16, max_slots: u16) -> Self {
        self.busy_min_slots = min_slots;
        self.busy_max_slots = max_slots;
        self
    }

    /// Check the knob values for internal consistency.
    pub fn validate(&self) -> Result<()> {
        if self.cw_min == 0 || self.cw_min > self.cw_max {
            return Err(AirtimeError::ContentionWindowBounds {
                cw_min: self.cw_min,
                cw_max: self.cw_max,
            });
        }
        if self.busy_min_slots == 0 || self.busy_min_slots > self.busy_max_slots {
            return Err(AirtimeError::InvalidConfig(format!(
                "busy burst range {}..={} slots is empty or starts at zero",
                self.busy_min_slots, self.busy_max_slots
            )));
        }
        if !(self.stat_alpha > 0.0 && self.stat_alpha <= 1.0) {
            return Err(AirtimeError::InvalidConfig(format!(
                "stat_alpha {} must be in (0, 1]",
                self.stat_alpha
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let knobs = LbtKnobs::default();
        assert_eq!(knobs.cw_min, 8);
        assert_eq!(knobs.cw_max, 128);
        assert_eq!(knobs.icca_slots, 1);
        assert_eq!(knobs.mcot_slots, 5);
        assert!((knobs.stat_alpha - 0.1).abs() < 1e-12);
        assert!(knobs.validate().is_ok());
    }

    #[test]
    fn test_builder_methods() {
        let knobs = LbtKnobs::new()
            .with_contention_window(4, 64)
            .with_mcot_slots(8)
            .with_busy_burst(2, 3);
        assert_eq!(knobs.cw_min, 4);
        assert_eq!(knobs.cw_max, 64);
        assert_eq!(knobs.mcot_slots, 8);
        assert_eq!(knobs.busy_min_slots, 2);
        assert_eq!(knobs.busy_max_slots, 3);
        assert!(knobs.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_inverted_cw() {
        let knobs = LbtKnobs::new().with_contention_window(64, 8);
        assert!(knobs.validate().is_err());

        let knobs = LbtKnobs::new().with_contention_window(0, 8);
        assert!(knobs.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_burst_range() {
        let knobs = LbtKnobs::new().with_busy_burst(5, 1);
        assert!(knobs.validate().is_err());

        let knobs = LbtKnobs::new().with_busy_burst(0, 5);
        assert!(knobs.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_alpha() {
        let mut knobs = LbtKnobs::new();
        knobs.stat_alpha = 0.0;
        assert!(knobs.validate().is_err());
        knobs.stat_alpha = 1.5;
        assert!(knobs.validate().is_err());
    }

    #[test]
    fn test_serialization_round_trip() {
        let knobs = LbtKnobs::default();
        let json = serde_json::to_string(&knobs).unwrap();
        let parsed: LbtKnobs = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.cw_min, knobs.cw_min);
        assert_eq!(parsed.mcot_slots, knobs.mcot_slots);
    }
}
