//! Function-pointer mode state machine.
//!
//! The six operating modes live in a fixed table; each tick the engine
//! calls `on_update` for the **current** mode, and a returned
//! `Some(next)` triggers `on_exit` → pointer update → `on_enter`:
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │  StateTable                                                   │
//! │  ┌───────────────┬──────────┬─────────┬────────────────────┐  │
//! │  │ Mode          │ on_enter │ on_exit │ on_update          │  │
//! │  ├───────────────┼──────────┼─────────┼────────────────────┤  │
//! │  │ Waiting       │ fn(ctx)  │ fn(ctx) │ fn(ctx)->Option<>  │  │
//! │  │ Ready         │ …        │ …       │ …                  │  │
//! │  │ Normal        │ …        │ …       │ …                  │  │
//! │  │ Degraded      │ …        │ …       │ …                  │  │
//! │  │ Rescue        │ …        │ …       │ …                  │  │
//! │  │ EmergencyStop │ …        │ …       │ …                  │  │
//! │  └───────────────┴──────────┴─────────┴────────────────────┘  │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! The cycle driver also forces transitions from outside the table
//! (transmission failure, imminent-failure, fault reclassification)
//! via [`Fsm::force_transition`].  `EmergencyStop` is latched: once
//! entered, no transition — forced or returned — leaves it.

pub mod context;
pub mod states;

use context::CycleContext;
use log::info;

// ---------------------------------------------------------------------------
// Mode identity
// ---------------------------------------------------------------------------

/// The six operating modes of the controller.
/// Must stay in sync with the table built in [`states::build_state_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Mode {
    Waiting = 0,
    Ready = 1,
    Normal = 2,
    Degraded = 3,
    Rescue = 4,
    EmergencyStop = 5,
}

impl Mode {
    /// Total number of modes — sizes the table array.
    pub const COUNT: usize = 6;

    /// Convert a table index back to a `Mode`. Panics on out-of-range in
    /// debug builds; returns `EmergencyStop` in release (safe fallback).
    pub fn from_index(idx: usize) -> Self {
        match idx {
            0 => Self::Waiting,
            1 => Self::Ready,
            2 => Self::Normal,
            3 => Self::Degraded,
            4 => Self::Rescue,
            5 => Self::EmergencyStop,
            _ => {
                debug_assert!(false, "invalid mode index: {idx}");
                Self::EmergencyStop
            }
        }
    }

    /// Display name, matching the plant's vocabulary.
    pub fn name(self) -> &'static str {
        match self {
            Self::Waiting => "WAITING",
            Self::Ready => "READY",
            Self::Normal => "NORMAL",
            Self::Degraded => "DEGRADED",
            Self::Rescue => "RESCUE",
            Self::EmergencyStop => "EMERGENCY_STOP",
        }
    }
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// Signature for `on_enter` and `on_exit` actions.
/// These run exactly once on each mode transition.
pub type ModeActionFn = fn(&mut CycleContext);

/// Signature for the per-tick update handler.
/// Returns `Some(next)` to trigger a transition, or `None` to stay.
pub type ModeUpdateFn = fn(&mut CycleContext) -> Option<Mode>;

// ---------------------------------------------------------------------------
// Mode descriptor (one row in the table)
// ---------------------------------------------------------------------------

/// Static descriptor for a single mode.
/// Stored in a fixed-size array — no heap, no `dyn`.
pub struct ModeDescriptor {
    pub mode: Mode,
    pub name: &'static str,
    pub on_enter: Option<ModeActionFn>,
    pub on_exit: Option<ModeActionFn>,
    pub on_update: ModeUpdateFn,
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

/// The mode state machine engine.
///
/// Owns the mode table and the index of the active mode; the mutable
/// [`CycleContext`] is threaded through every handler call.
pub struct Fsm {
    /// Fixed-size table indexed by `Mode as usize`.
    table: [ModeDescriptor; Mode::COUNT],
    /// Index of the currently active mode.
    current: usize,
}

impl Fsm {
    /// Construct a new FSM with the given table, starting in `initial`.
    pub fn new(table: [ModeDescriptor; Mode::COUNT], initial: Mode) -> Self {
        Self {
            table,
            current: initial as usize,
        }
    }

    /// Run the initial `on_enter` for the starting mode.
    /// Call once after construction, before the first `tick()`.
    pub fn start(&mut self, ctx: &mut CycleContext) {
        info!("controller starting in mode {}", self.table[self.current].name);
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }

    /// Run the current mode's per-tick handler, transitioning if it asks.
    pub fn tick(&mut self, ctx: &mut CycleContext) {
        let next = (self.table[self.current].on_update)(ctx);
        if let Some(next_mode) = next {
            self.force_transition(next_mode, ctx);
        }
    }

    /// Transition immediately (used by the cycle driver for transmission
    /// failures, imminent-failure stops, and fault reclassification).
    ///
    /// `EmergencyStop` is terminal: once there, every request to leave is
    /// ignored.
    pub fn force_transition(&mut self, next: Mode, ctx: &mut CycleContext) {
        if self.current_mode() == Mode::EmergencyStop {
            return;
        }
        if next as usize != self.current {
            self.transition(next, ctx);
        }
    }

    /// The current mode.
    pub fn current_mode(&self) -> Mode {
        Mode::from_index(self.current)
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn transition(&mut self, next_mode: Mode, ctx: &mut CycleContext) {
        let next_idx = next_mode as usize;

        info!(
            "mode transition: {} -> {}",
            self.table[self.current].name, self.table[next_idx].name
        );

        if let Some(exit) = self.table[self.current].on_exit {
            exit(ctx);
        }

        self.current = next_idx;

        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }
}
