//! Failure and repair detection.
//!
//! Runs **every tick before the mode dispatch** and turns raw plant
//! reports into the per-component fault flags that the mode machine
//! summarises. Three independent fault sources feed it:
//!
//! 1. each pump and its controller, cross-checked against the last
//!    command and the predicted water band;
//! 2. the steam sensor (range and monotonicity);
//! 3. the water-level sensor (range and model agreement).
//!
//! Detection messages and repair acknowledgements are *staged* into
//! `ctx.alerts`; the mode handler flushes them right after its mode
//! announcement so the outgoing batch stays mode-first.
//!
//! The predicted band `[band_lo, band_hi]` consumed here was written by
//! the planner on the *previous* tick — the one piece of intra-tick
//! feedback in the controller.

use log::{info, warn};

use crate::error::FaultKind;
use crate::fsm::context::CycleContext;
use crate::fsm::Mode;
use crate::mailbox::Message;

/// Margin under the predicted lower bound still considered "within
/// limits": absorbs model error across a five-second period.
const WITHIN_MARGIN_LO: f64 = 0.8;
/// Margin above the predicted upper bound still considered "within
/// limits".
const WITHIN_MARGIN_HI: f64 = 1.2;

// ---------------------------------------------------------------------------
// Transmission failure
// ---------------------------------------------------------------------------

/// A malformed inbox: missing or duplicated sensor readings, or pump /
/// pump-controller report counts that do not match the pump count.
/// Fatal for the boiler run.
pub fn transmission_failure(ctx: &CycleContext) -> bool {
    ctx.inputs.level.is_none()
        || ctx.inputs.steam.is_none()
        || ctx.inputs.pump_state.is_none()
        || ctx.inputs.pump_control_state.is_none()
}

// ---------------------------------------------------------------------------
// Repairs
// ---------------------------------------------------------------------------

/// Handle at most one repair notification, in priority order: pump,
/// pump controller, steam sensor, level sensor. Clears the flag, stages
/// the acknowledgement, and reports whether anything was repaired so the
/// driver can return the controller to NORMAL (later checks in the same
/// tick may immediately reclassify).
pub fn handle_repair(ctx: &mut CycleContext) -> bool {
    let n = ctx.config.pump_count();

    let pump_repaired = ctx
        .inputs
        .pump_repaired
        .iter()
        .copied()
        .find(|&i| i < n && ctx.pump_failed[i]);
    if let Some(i) = pump_repaired {
        ctx.pump_failed[i] = false;
        ctx.alerts.send(Message::PumpRepairedAcknowledgement(i));
        info!("repair: pump {i} back in service");
        return true;
    }

    let ctrl_repaired = ctx
        .inputs
        .pump_control_repaired
        .iter()
        .copied()
        .find(|&i| i < n && ctx.ctrl_failed[i]);
    if let Some(i) = ctrl_repaired {
        ctx.ctrl_failed[i] = false;
        ctx.alerts.send(Message::PumpControlRepairedAcknowledgement(i));
        info!("repair: pump controller {i} back in service");
        return true;
    }

    if ctx.inputs.steam_repaired && ctx.steam_sensor_failed {
        ctx.steam_sensor_failed = false;
        ctx.alerts.send(Message::SteamRepairedAcknowledgement);
        info!("repair: steam sensor back in service");
        return true;
    }

    if ctx.inputs.level_repaired && ctx.water_sensor_failed {
        ctx.water_sensor_failed = false;
        ctx.alerts.send(Message::LevelRepairedAcknowledgement);
        info!("repair: level sensor back in service");
        return true;
    }

    false
}

// ---------------------------------------------------------------------------
// Fault detection
// ---------------------------------------------------------------------------

/// Run all fault oracles for this tick. Order matters: the pump scan
/// runs first because the water-sensor oracle refuses to blame the
/// sensor for a discrepancy a broken pump already explains.
pub fn detect_faults(ctx: &mut CycleContext) {
    classify_pumps(ctx);
    check_steam_sensor(ctx);
    check_water_sensor(ctx);
}

/// Cross-check every pump's report, its controller's report, and the
/// last command. Only the first fresh fault in the scan is acted on per
/// tick — one detection message at a time keeps the plant-side protocol
/// unambiguous.
fn classify_pumps(ctx: &mut CycleContext) {
    let (Some(pump_states), Some(ctrl_states)) = (
        ctx.inputs.pump_state.clone(),
        ctx.inputs.pump_control_state.clone(),
    ) else {
        return;
    };

    let water = ctx.effective_water();
    let within = water >= ctx.band_lo * WITHIN_MARGIN_LO && water <= ctx.band_hi * WITHIN_MARGIN_HI;

    for i in 0..ctx.config.pump_count() {
        if ctx.pump_failed[i] || ctx.ctrl_failed[i] {
            continue;
        }
        let commanded = ctx.pump_commanded[i];
        let pump_agrees = pump_states[i] == commanded;
        let ctrl_agrees = ctrl_states[i] == commanded;

        if pump_agrees && ctrl_agrees {
            continue;
        }
        // Pump and command agree, controller dissents: if the water did
        // what the command predicts, the controller lied; otherwise the
        // pump failed and its own report is the lie. A pump that itself
        // contradicts the command is broken either way.
        if pump_agrees && within {
            let kind = FaultKind::PumpController(i);
            warn!("fault detected: {kind} (commanded {commanded}, within-band {within})");
            ctx.ctrl_failed[i] = true;
            ctx.alerts.send(Message::PumpControlFailureDetection(i));
        } else {
            let kind = FaultKind::Pump(i);
            warn!("fault detected: {kind} (commanded {commanded}, within-band {within})");
            ctx.pump_failed[i] = true;
            ctx.alerts.send(Message::PumpFailureDetection(i));
        }
        return;
    }
}

/// Steam readings can rise or plateau within a cycle but never fall, and
/// must stay inside `[0, S_max]`.
fn check_steam_sensor(ctx: &mut CycleContext) {
    if ctx.steam_sensor_failed {
        return;
    }
    let Some(steam) = ctx.inputs.steam else {
        return;
    };
    if steam < 0.0 || steam > ctx.config.maximal_steam_rate || steam < ctx.last_steam {
        warn!(
            "fault detected: {} (reading {steam:.2}, last {:.2})",
            FaultKind::SteamSensor,
            ctx.last_steam
        );
        ctx.steam_sensor_failed = true;
        ctx.alerts.send(Message::SteamFailureDetection);
    }
}

/// A level reading outside the tank is always a sensor fault; a reading
/// outside the predicted band only is — while the boiler is actively
/// heating and no pump fault already explains the discrepancy.
fn check_water_sensor(ctx: &mut CycleContext) {
    if ctx.water_sensor_failed {
        return;
    }
    let Some(water) = ctx.inputs.level else {
        return;
    };

    let outside_tank = water < 0.0 || water > ctx.config.capacity;
    let off_model = ctx.heater_on
        && !ctx.any_pump_fault()
        && (water < ctx.band_lo * WITHIN_MARGIN_LO || water > ctx.band_hi * WITHIN_MARGIN_HI);

    if outside_tank || off_model {
        warn!(
            "fault detected: {} (reading {water:.2}, band [{:.2}, {:.2}])",
            FaultKind::WaterSensor,
            ctx.band_lo,
            ctx.band_hi
        );
        ctx.water_sensor_failed = true;
        ctx.alerts.send(Message::LevelFailureDetection);
    }
}

// ---------------------------------------------------------------------------
// Imminent failure and mode reclassification
// ---------------------------------------------------------------------------

/// Conditions that make continued operation indefensible: both sensors
/// lost, or the water the controller believes in has left the safety
/// band while that matters.
pub fn imminent_failure(ctx: &CycleContext, mode: Mode) -> bool {
    if ctx.water_sensor_failed && ctx.steam_sensor_failed {
        return true;
    }
    let water = ctx.effective_water();
    if water > ctx.config.maximal_limit && mode != Mode::Waiting {
        return true;
    }
    if water < ctx.config.minimal_limit && ctx.heater_on {
        return true;
    }
    false
}

/// Extra guards for the initialisation phases: a boiler already making
/// steam cannot be initialised, and the start-up protocol has no
/// degraded sub-modes — a sensor fault before NORMAL stops the boiler.
pub fn init_phase_violation(ctx: &CycleContext, mode: Mode) -> bool {
    match mode {
        Mode::Waiting => {
            ctx.sensor_fault() || ctx.inputs.steam.map_or(false, |s| s != 0.0)
        }
        Mode::Ready => ctx.sensor_fault(),
        _ => false,
    }
}

/// Derive the operating mode from the fault flags. The flags are the
/// source of truth; this summary only applies while the controller is
/// past initialisation and not stopped.
pub fn reclassify(ctx: &CycleContext, mode: Mode) -> Option<Mode> {
    if !matches!(mode, Mode::Normal | Mode::Degraded | Mode::Rescue) {
        return None;
    }
    let target = if ctx.water_sensor_failed {
        Mode::Rescue
    } else if ctx.steam_sensor_failed || ctx.any_pump_fault() {
        Mode::Degraded
    } else {
        return None;
    };
    (target != mode).then_some(target)
}
