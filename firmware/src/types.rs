//! Shared types used across the firmware
//!
//! This module defines the result kinds, logic levels and version records
//! shared by the acquisition engine, the actuation engine and the control
//! façade.

use core::fmt;

/// Failure kinds reported by engine operations
///
/// Every rejected call leaves the hardware untouched; the kind tells the
/// caller why nothing happened.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HalError {
    /// Group, channel or source index outside the configured range
    InvalidId,
    /// The engine has no bound configuration
    NotInitialized,
    /// The request is well-formed but the engine state does not allow it
    PreconditionUnmet,
}

impl HalError {
    /// Short human-readable name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidId => "invalid id",
            Self::NotInitialized => "not initialized",
            Self::PreconditionUnmet => "precondition unmet",
        }
    }
}

impl fmt::Display for HalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for HalError {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{=str}", self.as_str());
    }
}

/// Result type for engine operations
pub type HalResult<T> = Result<T, HalError>;

/// Logic level of a digital line or output polarity
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Level {
    /// Low level / active-low polarity
    #[default]
    Low,
    /// High level / active-high polarity
    High,
}

impl Level {
    /// Build from a boolean (`true` is high)
    #[must_use]
    pub const fn from_bool(high: bool) -> Self {
        if high {
            Self::High
        } else {
            Self::Low
        }
    }

    /// Check for the high level
    #[must_use]
    pub const fn is_high(self) -> bool {
        matches!(self, Self::High)
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for Level {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Low => defmt::write!(f, "LOW"),
            Self::High => defmt::write!(f, "HIGH"),
        }
    }
}

/// Driver module version record
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VersionInfo {
    /// Vendor identifier
    pub vendor_id: u16,
    /// Module identifier
    pub module_id: u16,
    /// Major software version
    pub major: u8,
    /// Minor software version
    pub minor: u8,
    /// Patch software version
    pub patch: u8,
}

impl fmt::Display for VersionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04X}:{:04X} v{}.{}.{}",
            self.vendor_id, self.module_id, self.major, self.minor, self.patch
        )
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for VersionInfo {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "{=u16:#x}:{=u16:#x} v{}.{}.{}",
            self.vendor_id,
            self.module_id,
            self.major,
            self.minor,
            self.patch
        );
    }
}
