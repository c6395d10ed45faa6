//! Shared mutable context threaded through every mode handler.
//!
//! [`CycleContext`] is the single struct that the failure detector, the
//! pump planner, and the mode handlers read from and write to.  It holds
//! the parsed inbox snapshot, the outgoing message buffers, the fault
//! flags (the canonical fault record — the mode is a derived summary),
//! and the tracking state that survives from tick to tick.  Think of it
//! as the "blackboard" in a blackboard architecture.

use crate::config::BoilerConfig;
use crate::mailbox::{Mailbox, Message, MessageKind};

// ---------------------------------------------------------------------------
// Parsed inbox snapshot (read-only to mode handlers; written by the driver)
// ---------------------------------------------------------------------------

/// Everything the controller extracted from one tick's inbox.
#[derive(Debug, Clone, Default)]
pub struct PlantInputs {
    /// Water-level reading, absent on zero or duplicated messages.
    pub level: Option<f64>,
    /// Steam-rate reading, absent on zero or duplicated messages.
    pub steam: Option<f64>,
    /// Reported pump states indexed by pump, `None` unless every pump
    /// reported exactly once.
    pub pump_state: Option<Vec<bool>>,
    /// Reported pump-controller states, same arity rule.
    pub pump_control_state: Option<Vec<bool>>,
    /// `STEAM_BOILER_WAITING` present (exactly once).
    pub boiler_waiting: bool,
    /// `PHYSICAL_UNITS_READY` present (exactly once).
    pub units_ready: bool,
    /// Pump indices named in repair notifications, in arrival order.
    pub pump_repaired: Vec<usize>,
    /// Pump-controller indices named in repair notifications.
    pub pump_control_repaired: Vec<usize>,
    /// Level-sensor repair notification present.
    pub level_repaired: bool,
    /// Steam-sensor repair notification present.
    pub steam_repaired: bool,
}

impl PlantInputs {
    /// Extract the tick's snapshot from the incoming mailbox.
    pub fn parse(incoming: &Mailbox, pump_count: usize) -> Self {
        let level = match incoming.only_match(MessageKind::Level) {
            Some(Message::Level(v)) => Some(v),
            _ => None,
        };
        let steam = match incoming.only_match(MessageKind::Steam) {
            Some(Message::Steam(v)) => Some(v),
            _ => None,
        };

        let pump_state = indexed_states(
            incoming.all_matches(MessageKind::PumpState),
            pump_count,
            |m| match m {
                Message::PumpState { pump, open } => Some((pump, open)),
                _ => None,
            },
        );
        let pump_control_state = indexed_states(
            incoming.all_matches(MessageKind::PumpControlState),
            pump_count,
            |m| match m {
                Message::PumpControlState { pump, open } => Some((pump, open)),
                _ => None,
            },
        );

        let pump_repaired = incoming
            .all_matches(MessageKind::PumpRepaired)
            .into_iter()
            .filter_map(|m| match m {
                Message::PumpRepaired(i) => Some(i),
                _ => None,
            })
            .collect();
        let pump_control_repaired = incoming
            .all_matches(MessageKind::PumpControlRepaired)
            .into_iter()
            .filter_map(|m| match m {
                Message::PumpControlRepaired(i) => Some(i),
                _ => None,
            })
            .collect();

        Self {
            level,
            steam,
            pump_state,
            pump_control_state,
            boiler_waiting: incoming.only_match(MessageKind::SteamBoilerWaiting).is_some(),
            units_ready: incoming.only_match(MessageKind::PhysicalUnitsReady).is_some(),
            pump_repaired,
            pump_control_repaired,
            level_repaired: incoming.only_match(MessageKind::LevelRepaired).is_some(),
            steam_repaired: incoming.only_match(MessageKind::SteamRepaired).is_some(),
        }
    }
}

/// Arrange per-pump state messages into a vector indexed by pump.
/// Returns `None` unless each of the `n` pumps reported exactly once —
/// the same arity violation the transmission-failure check looks for.
fn indexed_states<F>(messages: Vec<Message>, n: usize, extract: F) -> Option<Vec<bool>>
where
    F: Fn(Message) -> Option<(usize, bool)>,
{
    if messages.len() != n {
        return None;
    }
    let mut slots: Vec<Option<bool>> = vec![None; n];
    for msg in messages {
        let (pump, open) = extract(msg)?;
        if pump >= n || slots[pump].is_some() {
            return None;
        }
        slots[pump] = Some(open);
    }
    slots.into_iter().collect()
}

// ---------------------------------------------------------------------------
// CycleContext
// ---------------------------------------------------------------------------

/// The shared context passed to every mode handler.
pub struct CycleContext {
    /// Boiler characteristics (immutable after construction).
    pub config: BoilerConfig,

    /// This tick's parsed inbox. Refreshed by the driver before anything
    /// else runs.
    pub inputs: PlantInputs,

    /// Outgoing messages for this tick. Drained by the driver at cycle end.
    pub outbox: Mailbox,
    /// Detection and acknowledgement messages staged by the failure
    /// detector. Mode handlers flush these right after the mode
    /// announcement so the mode message stays first.
    pub alerts: Mailbox,

    // -- Fault flags (source of truth; the mode is derived from these) --
    pub water_sensor_failed: bool,
    pub steam_sensor_failed: bool,
    /// Physical pump `i` suspected broken.
    pub pump_failed: Vec<bool>,
    /// Pump controller `i` suspected broken.
    pub ctrl_failed: Vec<bool>,

    // -- Tracking --
    /// Last command issued to each pump — the controller's belief about
    /// the pump's state.
    pub pump_commanded: Vec<bool>,
    /// Most recent level reading believed truthful (or the rescue-mode
    /// feed-forward estimate while the level sensor is down).
    pub last_water: f64,
    /// Most recent steam reading believed truthful.
    pub last_steam: f64,
    /// Set on entry to NORMAL; the plant heats only from then on.
    pub heater_on: bool,
    /// Emptying valve currently open.
    pub emptying: bool,
    /// One-shot latch: the emergency handler has issued its close-all.
    pub stop_pumps_closed: bool,

    // -- Prediction band (planner → next tick's fault oracle) --
    /// Lower bound of the water level predicted for the chosen pump
    /// activation. Written by the planner, read by the failure detector
    /// on the following tick: the only intra-tick feedback loop in the
    /// controller.
    pub band_lo: f64,
    /// Upper bound of the predicted water level.
    pub band_hi: f64,
}

impl CycleContext {
    /// Create a fresh context. Bands start at the full tank so the fault
    /// oracle stays permissive until the planner has run once.
    pub fn new(config: BoilerConfig) -> Self {
        let n = config.pump_count();
        let band_hi = config.capacity;
        Self {
            config,
            inputs: PlantInputs::default(),
            outbox: Mailbox::new(),
            alerts: Mailbox::new(),
            water_sensor_failed: false,
            steam_sensor_failed: false,
            pump_failed: vec![false; n],
            ctrl_failed: vec![false; n],
            pump_commanded: vec![false; n],
            last_water: 0.0,
            last_steam: 0.0,
            heater_on: false,
            emptying: false,
            stop_pumps_closed: false,
            band_lo: 0.0,
            band_hi,
        }
    }

    /// Move staged detection/acknowledgement messages into the outbox.
    pub fn flush_alerts(&mut self) {
        let mut staged = core::mem::take(&mut self.alerts);
        staged.drain_into(&mut self.outbox);
    }

    /// Either sensor flagged broken.
    pub fn sensor_fault(&self) -> bool {
        self.water_sensor_failed || self.steam_sensor_failed
    }

    /// Any pump or pump-controller flagged broken.
    pub fn any_pump_fault(&self) -> bool {
        self.pump_failed.iter().any(|&f| f) || self.ctrl_failed.iter().any(|&f| f)
    }

    /// Any fault flag at all.
    pub fn any_fault(&self) -> bool {
        self.sensor_fault() || self.any_pump_fault()
    }

    /// The water level the controller acts on: the current reading when
    /// the level sensor is trusted, the tracked estimate otherwise.
    pub fn effective_water(&self) -> f64 {
        if self.water_sensor_failed {
            self.last_water
        } else {
            self.inputs.level.unwrap_or(self.last_water)
        }
    }

    /// Reported pump states, falling back to the commanded states when
    /// the reports were malformed (the transmission check has already
    /// stopped the boiler in that case).
    pub fn reported_open(&self) -> Vec<bool> {
        self.inputs
            .pump_state
            .clone()
            .unwrap_or_else(|| self.pump_commanded.clone())
    }

    /// Summed throughput of the pumps marked open in `open`.
    pub fn capacity_of(&self, open: &[bool]) -> f64 {
        self.config
            .pump_capacity
            .iter()
            .zip(open)
            .filter(|(_, &o)| o)
            .map(|(&c, _)| c)
            .sum()
    }

    /// Summed throughput of the pumps currently commanded open.
    pub fn commanded_capacity(&self) -> f64 {
        self.config
            .pump_capacity
            .iter()
            .zip(&self.pump_commanded)
            .filter(|(_, &open)| open)
            .map(|(&c, _)| c)
            .sum()
    }
}
