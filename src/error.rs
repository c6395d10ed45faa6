//! Error and fault types for the boiler controller.
//!
//! Physical faults never surface as `Err`: per-component flags inside the
//! controller state are the source of truth, and the plant learns about
//! them through detection messages. The only fallible operation in the
//! crate is construction, where the boiler characteristics are validated.
//! All variants are `Copy` so they can be passed around freely without
//! allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Rejection reasons for an inconsistent set of boiler characteristics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// The pump capacity vector is empty.
    NoPumps,
    /// A pump claims zero or negative throughput.
    NonPositivePumpCapacity,
    /// The tank capacity is zero or negative.
    NonPositiveCapacity,
    /// `minimal_normal >= maximal_normal`.
    InvertedNormalBand,
    /// The safety band does not strictly enclose the normal band.
    SafetyBandTooNarrow,
    /// A limit level lies outside `[0, capacity]`.
    LimitsOutsideTank,
    /// The maximum steam rate is zero or negative.
    NonPositiveSteamRate,
    /// The cycle period is zero or negative.
    NonPositivePeriod,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoPumps => write!(f, "no pumps configured"),
            Self::NonPositivePumpCapacity => write!(f, "pump capacity must be positive"),
            Self::NonPositiveCapacity => write!(f, "tank capacity must be positive"),
            Self::InvertedNormalBand => write!(f, "normal band is inverted"),
            Self::SafetyBandTooNarrow => write!(f, "safety band does not enclose normal band"),
            Self::LimitsOutsideTank => write!(f, "limit levels lie outside the tank"),
            Self::NonPositiveSteamRate => write!(f, "maximum steam rate must be positive"),
            Self::NonPositivePeriod => write!(f, "cycle period must be positive"),
        }
    }
}

impl std::error::Error for ConfigError {}

// ---------------------------------------------------------------------------
// Component faults
// ---------------------------------------------------------------------------

/// Identity of a plant component suspected broken.
///
/// Used for log lines and to pick the matching detection message; the
/// per-component boolean flags in the cycle context remain the canonical
/// fault record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// Physical pump `i` is not doing what it was commanded.
    Pump(usize),
    /// Pump controller `i` reports a state inconsistent with reality.
    PumpController(usize),
    /// The steam-rate sensor returned an impossible reading.
    SteamSensor,
    /// The water-level sensor returned an impossible reading.
    WaterSensor,
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pump(i) => write!(f, "pump {i}"),
            Self::PumpController(i) => write!(f, "pump controller {i}"),
            Self::SteamSensor => write!(f, "steam sensor"),
            Self::WaterSensor => write!(f, "water level sensor"),
        }
    }
}
