//! Boiler characteristics.
//!
//! All physical parameters of the boiler under control. The struct is
//! immutable for the lifetime of the controller; values typically come
//! from the host simulator's characteristics file.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Physical characteristics of the boiler and its feed pumps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoilerConfig {
    /// Per-pump throughput in volume units per second. The length of
    /// this vector is the pump count `N`.
    pub pump_capacity: Vec<f64>,

    /// Total capacity of the tank (volume units).
    pub capacity: f64,

    // --- Normal operating band ---
    /// Minimal normal water level.
    pub minimal_normal: f64,
    /// Maximal normal water level.
    pub maximal_normal: f64,

    // --- Safety band ---
    /// Minimal limit level; below this while heating, the boiler is in danger.
    pub minimal_limit: f64,
    /// Maximal limit level; above this, the boiler is in danger.
    pub maximal_limit: f64,

    /// Maximum steam production rate (volume units per second).
    pub maximal_steam_rate: f64,

    /// Seconds between clock ticks.
    pub cycle_period_secs: f64,
}

impl Default for BoilerConfig {
    fn default() -> Self {
        Self {
            pump_capacity: vec![10.0; 4],
            capacity: 1000.0,
            minimal_normal: 400.0,
            maximal_normal: 600.0,
            minimal_limit: 100.0,
            maximal_limit: 900.0,
            maximal_steam_rate: 10.0,
            cycle_period_secs: 5.0,
        }
    }
}

impl BoilerConfig {
    /// Number of feed pumps.
    pub fn pump_count(&self) -> usize {
        self.pump_capacity.len()
    }

    /// Target water level: the midpoint of the normal band.
    pub fn optimal_level(&self) -> f64 {
        (self.minimal_normal + self.maximal_normal) / 2.0
    }

    /// Check the characteristics for internal consistency.
    ///
    /// Rejects rather than clamps: a characteristics file that claims a
    /// safety band narrower than the normal band is a configuration bug,
    /// not something to silently repair.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pump_capacity.is_empty() {
            return Err(ConfigError::NoPumps);
        }
        if self.pump_capacity.iter().any(|&c| c <= 0.0) {
            return Err(ConfigError::NonPositivePumpCapacity);
        }
        if self.capacity <= 0.0 {
            return Err(ConfigError::NonPositiveCapacity);
        }
        if self.minimal_normal >= self.maximal_normal {
            return Err(ConfigError::InvertedNormalBand);
        }
        if self.minimal_limit >= self.minimal_normal || self.maximal_limit <= self.maximal_normal {
            return Err(ConfigError::SafetyBandTooNarrow);
        }
        if self.maximal_limit > self.capacity || self.minimal_limit < 0.0 {
            return Err(ConfigError::LimitsOutsideTank);
        }
        if self.maximal_steam_rate <= 0.0 {
            return Err(ConfigError::NonPositiveSteamRate);
        }
        if self.cycle_period_secs <= 0.0 {
            return Err(ConfigError::NonPositivePeriod);
        }
        Ok(())
    }
}
