//! Error types for airtime-rs.

use thiserror::Error;

use crate::types::{SubBandId, TerminalId};

/// Errors that can occur when building or driving a simulation.
#[derive(Debug, Error)]
pub enum AirtimeError {
    /// Error extracting configuration from figment.
    #[error("configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    /// A configuration value failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Contention-window bounds are inconsistent.
    #[error("cw_min {cw_min} must be at least 1 and no larger than cw_max {cw_max}")]
    ContentionWindowBounds { cw_min: u16, cw_max: u16 },

    /// The sub-band id is already registered.
    #[error("sub-band {0} is already registered")]
    DuplicateSubBand(SubBandId),

    /// The sub-band id is not registered.
    #[error("sub-band {0} is not registered")]
    UnknownSubBand(SubBandId),

    /// The terminal id is already registered.
    #[error("terminal {0} is already registered")]
    DuplicateTerminal(TerminalId),

    /// The terminal id is not registered.
    #[error("terminal {0} is not registered")]
    UnknownTerminal(TerminalId),

    /// A sub-band that terminals would be stranded on cannot be removed.
    #[error("sub-band {0} is the default sub-band and still has terminals attached")]
    SubBandInUse(SubBandId),

    /// RLA was selected but no policy adapter is attached.
    #[error("RLA selected but no policy adapter is attached")]
    PolicyMissing,
}

/// Result type alias for airtime operations.
pub type Result<T> = std::result::Result<T, AirtimeError>;
