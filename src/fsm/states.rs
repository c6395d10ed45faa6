//! Concrete mode handlers and table builder.
//!
//! Each mode is three plain `fn` pointers — no closures, no dynamic
//! dispatch, no heap.  The per-tick guards that *force* a mode change
//! (transmission failure, imminent failure, fault reclassification) run
//! in the cycle driver before `Fsm::tick`; the handlers below only own
//! the transitions that belong to the initialisation protocol:
//!
//! ```text
//!  WAITING ──[level settles in normal band]──▶ READY
//!  READY ──[PHYSICAL_UNITS_READY]──▶ NORMAL
//!
//!  NORMAL ⇄ DEGRADED / RESCUE        (driver reclassification)
//!  any ──[fatal condition]──▶ EMERGENCY_STOP   (driver, latched)
//! ```
//!
//! Every handler announces its mode first and then flushes the staged
//! detection/acknowledgement alerts, so the mode message always leads
//! the outgoing batch.

use log::{error, info};

use super::context::CycleContext;
use super::{Mode, ModeDescriptor};
use crate::mailbox::{Message, PlantMode};
use crate::{physics, planner};

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static mode table.  Called once at controller construction.
pub fn build_state_table() -> [ModeDescriptor; Mode::COUNT] {
    [
        // Index 0 — Waiting
        ModeDescriptor {
            mode: Mode::Waiting,
            name: Mode::Waiting.name(),
            on_enter: Some(waiting_enter),
            on_exit: None,
            on_update: waiting_update,
        },
        // Index 1 — Ready
        ModeDescriptor {
            mode: Mode::Ready,
            name: Mode::Ready.name(),
            on_enter: Some(ready_enter),
            on_exit: None,
            on_update: ready_update,
        },
        // Index 2 — Normal
        ModeDescriptor {
            mode: Mode::Normal,
            name: Mode::Normal.name(),
            on_enter: Some(normal_enter),
            on_exit: None,
            on_update: normal_update,
        },
        // Index 3 — Degraded
        ModeDescriptor {
            mode: Mode::Degraded,
            name: Mode::Degraded.name(),
            on_enter: Some(degraded_enter),
            on_exit: None,
            on_update: degraded_update,
        },
        // Index 4 — Rescue
        ModeDescriptor {
            mode: Mode::Rescue,
            name: Mode::Rescue.name(),
            on_enter: Some(rescue_enter),
            on_exit: None,
            on_update: rescue_update,
        },
        // Index 5 — EmergencyStop
        ModeDescriptor {
            mode: Mode::EmergencyStop,
            name: Mode::EmergencyStop.name(),
            on_enter: Some(stop_enter),
            on_exit: None,
            on_update: stop_update,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  WAITING — filling (or draining) the tank into the normal band
// ═══════════════════════════════════════════════════════════════════════════

fn waiting_enter(_ctx: &mut CycleContext) {
    info!("WAITING: awaiting STEAM_BOILER_WAITING, level outside normal band");
}

fn waiting_update(ctx: &mut CycleContext) -> Option<Mode> {
    ctx.outbox.send(Message::Mode(PlantMode::Initialisation));
    ctx.flush_alerts();

    if !ctx.inputs.boiler_waiting {
        return None;
    }
    let (Some(water), Some(steam)) = (ctx.inputs.level, ctx.inputs.steam) else {
        // Transmission check already stopped the boiler on a missing
        // reading; nothing sensible to do here.
        return None;
    };

    // The valve may still be open from a previous drain; close it before
    // any filling starts.
    if ctx.emptying && water <= ctx.config.maximal_normal {
        ctx.outbox.send(Message::Valve);
        ctx.emptying = false;
    }

    if water > ctx.config.maximal_normal {
        if !ctx.emptying {
            info!("WAITING: level {water:.1} above normal band, draining");
            ctx.outbox.send(Message::Valve);
            ctx.emptying = true;
        }
    } else {
        // Below the band this floods with every controllable pump; inside
        // it, it trims the activation toward the optimal level so READY
        // starts from a settled configuration.
        planner::regulate(ctx, water, steam);
    }

    // Commands first, then the band test on this tick's reading.
    if water > ctx.config.minimal_normal && water < ctx.config.maximal_normal {
        return Some(Mode::Ready);
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  READY — level in band, waiting for the plant to acknowledge
// ═══════════════════════════════════════════════════════════════════════════

fn ready_enter(ctx: &mut CycleContext) {
    info!(
        "READY: level {:.1} within [{:.1}, {:.1}], announcing PROGRAM_READY",
        ctx.effective_water(),
        ctx.config.minimal_normal,
        ctx.config.maximal_normal
    );
}

fn ready_update(ctx: &mut CycleContext) -> Option<Mode> {
    ctx.outbox.send(Message::ProgramReady);
    ctx.flush_alerts();

    if ctx.inputs.units_ready {
        ctx.outbox.send(Message::Mode(PlantMode::Normal));
        return Some(Mode::Normal);
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  NORMAL — closed-loop regulation on trusted sensors
// ═══════════════════════════════════════════════════════════════════════════

fn normal_enter(ctx: &mut CycleContext) {
    ctx.heater_on = true;
    info!("NORMAL: heater on, regulating toward {:.1}", ctx.config.optimal_level());
}

fn normal_update(ctx: &mut CycleContext) -> Option<Mode> {
    ctx.outbox.send(Message::Mode(PlantMode::Normal));
    ctx.flush_alerts();

    let water = ctx.inputs.level.unwrap_or(ctx.last_water);
    let steam = ctx.inputs.steam.unwrap_or(ctx.last_steam);
    planner::regulate(ctx, water, steam);
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  DEGRADED — a pump, a pump controller, or the steam sensor is down
// ═══════════════════════════════════════════════════════════════════════════

fn degraded_enter(_ctx: &mut CycleContext) {
    info!("DEGRADED: regulating around the failed unit");
}

fn degraded_update(ctx: &mut CycleContext) -> Option<Mode> {
    ctx.outbox.send(Message::Mode(PlantMode::Degraded));
    ctx.flush_alerts();

    let water = ctx.inputs.level.unwrap_or(ctx.last_water);
    let steam = if ctx.steam_sensor_failed {
        // Recover the rate from the observed level change over the last
        // period; pump/controller faults need no substitution — the
        // planner simply routes around them.
        let open_capacity = ctx.capacity_of(&ctx.reported_open());
        physics::estimate_steam_rate(&ctx.config, ctx.last_water, water, open_capacity)
    } else {
        ctx.inputs.steam.unwrap_or(ctx.last_steam)
    };
    planner::regulate(ctx, water, steam);
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  RESCUE — level sensor down, running on the physical model
// ═══════════════════════════════════════════════════════════════════════════

fn rescue_enter(ctx: &mut CycleContext) {
    info!(
        "RESCUE: level sensor down, steering on estimate {:.1}",
        ctx.last_water
    );
}

fn rescue_update(ctx: &mut CycleContext) -> Option<Mode> {
    ctx.outbox.send(Message::Mode(PlantMode::Rescue));
    ctx.flush_alerts();

    let steam = ctx.inputs.steam.unwrap_or(ctx.last_steam);
    let estimate = ctx.last_water;
    planner::regulate(ctx, estimate, steam);

    // Feed-forward: next tick starts from the upper bound of what this
    // tick's activation can produce, biasing the estimate against
    // over-fill.
    let open_capacity = ctx.commanded_capacity();
    ctx.last_water = physics::estimate_water_level(&ctx.config, ctx.last_water, steam, open_capacity);
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  EMERGENCY_STOP — terminal; drain the tank and keep shouting
// ═══════════════════════════════════════════════════════════════════════════

fn stop_enter(ctx: &mut CycleContext) {
    ctx.heater_on = false;
    error!("EMERGENCY_STOP: shutting the boiler down");
}

fn stop_update(ctx: &mut CycleContext) -> Option<Mode> {
    // Announced three times: the message channel is allowed to drop.
    for _ in 0..3 {
        ctx.outbox.send(Message::Mode(PlantMode::EmergencyStop));
    }
    ctx.flush_alerts();

    if !ctx.stop_pumps_closed {
        for pump in 0..ctx.config.pump_count() {
            ctx.outbox.send(Message::ClosePump(pump));
            ctx.pump_commanded[pump] = false;
        }
        ctx.stop_pumps_closed = true;
    }
    if !ctx.emptying {
        ctx.outbox.send(Message::Valve);
        ctx.emptying = true;
    }
    None
}
