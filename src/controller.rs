//! The cyclic controller — the crate's public face.
//!
//! [`BoilerController`] owns the mode machine and the shared cycle
//! context, and exposes the contract the host simulator drives:
//!
//! ```text
//!  incoming Mailbox ──▶ ┌───────────────────────────┐ ──▶ outgoing Mailbox
//!                       │      BoilerController      │
//!                       │  detector · FSM · planner  │
//!                       └───────────────────────────┘
//! ```
//!
//! One [`tick`](BoilerController::tick) is an atomic transformation:
//! parse the inbox, run the transmission check, handle repairs, run the
//! fault oracles, apply the fatal guards, dispatch the current mode's
//! handler, refresh the trusted readings, and hand the batched output
//! back. Nothing suspends and nothing is shared.

use log::{error, warn};

use crate::config::BoilerConfig;
use crate::detector;
use crate::error::ConfigError;
use crate::fsm::context::{CycleContext, PlantInputs};
use crate::fsm::states::build_state_table;
use crate::fsm::{Fsm, Mode};
use crate::mailbox::Mailbox;

/// Point-in-time view of the controller for debug display and telemetry.
#[derive(Debug, Clone)]
pub struct ControllerStatus {
    pub mode: Mode,
    pub last_water: f64,
    pub last_steam: f64,
    pub heater_on: bool,
    pub emptying: bool,
    pub water_sensor_failed: bool,
    pub steam_sensor_failed: bool,
    pub pump_failed: Vec<bool>,
    pub ctrl_failed: Vec<bool>,
    pub pump_commanded: Vec<bool>,
}

/// The steam-boiler controller. Constructed in `WAITING`; driven by the
/// host simulator one clock tick at a time.
pub struct BoilerController {
    fsm: Fsm,
    ctx: CycleContext,
}

impl BoilerController {
    /// Validate the characteristics and build a controller in `WAITING`.
    pub fn new(config: BoilerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut ctx = CycleContext::new(config);
        let mut fsm = Fsm::new(build_state_table(), Mode::Waiting);
        fsm.start(&mut ctx);
        Ok(Self { fsm, ctx })
    }

    /// Run one five-second cycle. Reads `incoming` without mutating it
    /// and appends this tick's commands to `outgoing`.
    pub fn tick(&mut self, incoming: &Mailbox, outgoing: &mut Mailbox) {
        self.ctx.inputs = PlantInputs::parse(incoming, self.ctx.config.pump_count());

        let mode = self.fsm.current_mode();
        if mode != Mode::EmergencyStop {
            if detector::transmission_failure(&self.ctx) {
                error!("transmission failure: malformed inbox, stopping");
                self.fsm.force_transition(Mode::EmergencyStop, &mut self.ctx);
            } else {
                self.run_checks(mode);
            }
        }

        self.fsm.tick(&mut self.ctx);
        self.refresh_last_known();

        self.ctx.outbox.drain_into(outgoing);
        debug_assert!(self.ctx.alerts.is_empty(), "alerts must be flushed by the mode handler");
    }

    /// Human-readable name of the current mode, shown in the simulation
    /// window.
    pub fn status(&self) -> &'static str {
        self.fsm.current_mode().name()
    }

    /// The current operating mode.
    pub fn mode(&self) -> Mode {
        self.fsm.current_mode()
    }

    /// Snapshot of the controller's internal state.
    pub fn status_snapshot(&self) -> ControllerStatus {
        ControllerStatus {
            mode: self.fsm.current_mode(),
            last_water: self.ctx.last_water,
            last_steam: self.ctx.last_steam,
            heater_on: self.ctx.heater_on,
            emptying: self.ctx.emptying,
            water_sensor_failed: self.ctx.water_sensor_failed,
            steam_sensor_failed: self.ctx.steam_sensor_failed,
            pump_failed: self.ctx.pump_failed.clone(),
            ctrl_failed: self.ctx.ctrl_failed.clone(),
            pump_commanded: self.ctx.pump_commanded.clone(),
        }
    }

    // ── Internal ──────────────────────────────────────────────────

    /// Repairs, fault oracles, fatal guards, and mode reclassification —
    /// the fixed pre-dispatch sequence of every healthy-inbox tick.
    fn run_checks(&mut self, mode: Mode) {
        if detector::handle_repair(&mut self.ctx)
            && matches!(mode, Mode::Degraded | Mode::Rescue)
        {
            // Any repair returns the controller to NORMAL; the checks
            // below may immediately reclassify it back.
            self.fsm.force_transition(Mode::Normal, &mut self.ctx);
        }

        detector::detect_faults(&mut self.ctx);

        let mode = self.fsm.current_mode();
        if detector::imminent_failure(&self.ctx, mode)
            || detector::init_phase_violation(&self.ctx, mode)
        {
            warn!("imminent failure, stopping the boiler");
            self.fsm.force_transition(Mode::EmergencyStop, &mut self.ctx);
        } else if let Some(target) = detector::reclassify(&self.ctx, mode) {
            self.fsm.force_transition(target, &mut self.ctx);
        }
    }

    /// At cycle end, adopt this tick's readings as the trusted baseline —
    /// but only from sensors still believed honest. In RESCUE the
    /// feed-forward estimate written by the mode handler stands in for
    /// the level.
    fn refresh_last_known(&mut self) {
        if self.fsm.current_mode() == Mode::EmergencyStop {
            return;
        }
        if !self.ctx.water_sensor_failed {
            if let Some(w) = self.ctx.inputs.level {
                self.ctx.last_water = w.clamp(0.0, self.ctx.config.capacity);
            }
        }
        if !self.ctx.steam_sensor_failed {
            if let Some(s) = self.ctx.inputs.steam {
                self.ctx.last_steam = s.clamp(0.0, self.ctx.config.maximal_steam_rate);
            }
        }
    }
}
