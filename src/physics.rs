//! Closed-form physical model of the tank over one cycle.
//!
//! Everything the controller predicts or estimates is expressed through
//! two bounds on the water level after one period `T`:
//!
//! ```text
//! w_hi = w + T·cap − T·s        (steam holds at the current rate)
//! w_lo = w + T·cap − T·S_max    (steam rises to the physical maximum)
//! ```
//!
//! where `cap` is the summed throughput of the open pumps. The sensor
//! fallbacks are the same forms run in reverse: when the level sensor is
//! dead the upper bound is the conservative level estimate (biased
//! against over-fill), and when the steam sensor is dead the rate is
//! recovered from the observed level drop.

use crate::config::BoilerConfig;

/// Highest water level reachable after one cycle with `open_capacity`
/// units/s flowing in and steam held at rate `steam`.
pub fn level_upper_bound(cfg: &BoilerConfig, water: f64, steam: f64, open_capacity: f64) -> f64 {
    water + cfg.cycle_period_secs * open_capacity - cfg.cycle_period_secs * steam
}

/// Lowest water level reachable after one cycle with `open_capacity`
/// units/s flowing in, assuming steam may rise to the maximum rate
/// between readings.
pub fn level_lower_bound(cfg: &BoilerConfig, water: f64, open_capacity: f64) -> f64 {
    water + cfg.cycle_period_secs * open_capacity
        - cfg.cycle_period_secs * cfg.maximal_steam_rate
}

/// Water-level estimate for the next cycle when the level sensor is
/// broken: the upper bound from the last trusted level, clamped into the
/// tank.
pub fn estimate_water_level(
    cfg: &BoilerConfig,
    last_water: f64,
    steam: f64,
    open_capacity: f64,
) -> f64 {
    level_upper_bound(cfg, last_water, steam, open_capacity).clamp(0.0, cfg.capacity)
}

/// Steam-rate estimate when the steam sensor is broken: inverts
/// `water_now = w_hi(last_water, s, cap)` for `s`, clamped to the
/// physically possible range.
pub fn estimate_steam_rate(
    cfg: &BoilerConfig,
    last_water: f64,
    water_now: f64,
    open_capacity: f64,
) -> f64 {
    let rate = (last_water - water_now) / cfg.cycle_period_secs + open_capacity;
    rate.clamp(0.0, cfg.maximal_steam_rate)
}
