//! Shared identifiers and slot timing.
//!
//! Everything in the simulation is clocked in fixed 500 µs slots: backoff
//! draws, busy bursts, MCOT grants, and the decision window are all expressed
//! as slot counts and converted to durations here.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Identifies a frequency sub-band (bandwidth part) a terminal can operate on.
#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct SubBandId(pub u16);

/// Identifies a served terminal.
#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct TerminalId(pub u16);

impl fmt::Display for SubBandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for TerminalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u16> for SubBandId {
    fn from(v: u16) -> Self {
        SubBandId(v)
    }
}

impl From<u16> for TerminalId {
    fn from(v: u16) -> Self {
        TerminalId(v)
    }
}

/// Fixed simulated slot length (500 µs).
pub const SLOT: Duration = Duration::from_micros(500);

/// Convert a slot count to a simulated duration.
pub fn slots(n: u32) -> Duration {
    SLOT * n
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_arithmetic() {
        assert_eq!(slots(0), Duration::ZERO);
        assert_eq!(slots(2), Duration::from_millis(1));
        assert_eq!(slots(500), Duration::from_millis(250));
    }

    #[test]
    fn test_id_ordering() {
        assert!(SubBandId(1) < SubBandId(2));
        assert_eq!(SubBandId(3).to_string(), "3");
        assert_eq!(TerminalId::from(7), TerminalId(7));
    }
}
