//! Message types and the mailbox buffer shared with the physical plant.
//!
//! Every five seconds the plant hands the controller a batch of tagged
//! messages and expects a batch back. The mailbox itself is a dumb
//! ordered buffer; the two extraction helpers encode the batch protocol:
//!
//! - [`Mailbox::only_match`] — the sole message of a kind. Zero *or more
//!   than one* both yield `None`; a duplicated sensor reading is as
//!   untrustworthy as a missing one.
//! - [`Mailbox::all_matches`] — every message of a kind, in arrival order.
//!
//! Outgoing order is preserved as sent. The plant only depends on the
//! mode message coming first.

use core::fmt;

// ---------------------------------------------------------------------------
// Wire-level operating mode
// ---------------------------------------------------------------------------

/// Mode announced to the plant in `MODE` messages.
///
/// Note this is the *announced* mode: the controller's internal `WAITING`
/// and `READY` phases both announce `Initialisation`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlantMode {
    Initialisation,
    Normal,
    Degraded,
    Rescue,
    EmergencyStop,
}

impl fmt::Display for PlantMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initialisation => write!(f, "INITIALISATION"),
            Self::Normal => write!(f, "NORMAL"),
            Self::Degraded => write!(f, "DEGRADED"),
            Self::Rescue => write!(f, "RESCUE"),
            Self::EmergencyStop => write!(f, "EMERGENCY_STOP"),
        }
    }
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// A single tagged message, in either direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Message {
    // -- plant → controller --
    /// Water-level sensor reading.
    Level(f64),
    /// Steam-rate sensor reading.
    Steam(f64),
    /// Physical state of pump `pump` as reported by the pump itself.
    PumpState { pump: usize, open: bool },
    /// State of pump `pump` as reported by its controller unit.
    PumpControlState { pump: usize, open: bool },
    /// The boiler is ready for the initialisation protocol.
    SteamBoilerWaiting,
    /// All physical units acknowledge readiness for normal operation.
    PhysicalUnitsReady,
    /// The named pump has been repaired by the plant crew.
    PumpRepaired(usize),
    /// Pump controller has been repaired.
    PumpControlRepaired(usize),
    /// The water-level sensor has been repaired.
    LevelRepaired,
    /// The steam-rate sensor has been repaired.
    SteamRepaired,

    // -- controller → plant --
    /// Announce the operating mode.
    Mode(PlantMode),
    /// Initialisation is complete; waiting for `PhysicalUnitsReady`.
    ProgramReady,
    /// Command pump open.
    OpenPump(usize),
    /// Command pump closed.
    ClosePump(usize),
    /// Toggle the emptying valve.
    Valve,
    /// The controller believes pump `i` is broken.
    PumpFailureDetection(usize),
    /// The controller believes pump controller `i` is broken.
    PumpControlFailureDetection(usize),
    /// The controller believes the steam sensor is broken.
    SteamFailureDetection,
    /// The controller believes the level sensor is broken.
    LevelFailureDetection,
    /// Acknowledge a pump repair notification.
    PumpRepairedAcknowledgement(usize),
    /// Acknowledge a pump-controller repair notification.
    PumpControlRepairedAcknowledgement(usize),
    /// Acknowledge a steam-sensor repair notification.
    SteamRepairedAcknowledgement,
    /// Acknowledge a level-sensor repair notification.
    LevelRepairedAcknowledgement,
}

/// Discriminant of [`Message`], used by the extraction helpers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Level,
    Steam,
    PumpState,
    PumpControlState,
    SteamBoilerWaiting,
    PhysicalUnitsReady,
    PumpRepaired,
    PumpControlRepaired,
    LevelRepaired,
    SteamRepaired,
    Mode,
    ProgramReady,
    OpenPump,
    ClosePump,
    Valve,
    PumpFailureDetection,
    PumpControlFailureDetection,
    SteamFailureDetection,
    LevelFailureDetection,
    PumpRepairedAcknowledgement,
    PumpControlRepairedAcknowledgement,
    SteamRepairedAcknowledgement,
    LevelRepairedAcknowledgement,
}

impl Message {
    /// The kind tag of this message.
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::Level(_) => MessageKind::Level,
            Self::Steam(_) => MessageKind::Steam,
            Self::PumpState { .. } => MessageKind::PumpState,
            Self::PumpControlState { .. } => MessageKind::PumpControlState,
            Self::SteamBoilerWaiting => MessageKind::SteamBoilerWaiting,
            Self::PhysicalUnitsReady => MessageKind::PhysicalUnitsReady,
            Self::PumpRepaired(_) => MessageKind::PumpRepaired,
            Self::PumpControlRepaired(_) => MessageKind::PumpControlRepaired,
            Self::LevelRepaired => MessageKind::LevelRepaired,
            Self::SteamRepaired => MessageKind::SteamRepaired,
            Self::Mode(_) => MessageKind::Mode,
            Self::ProgramReady => MessageKind::ProgramReady,
            Self::OpenPump(_) => MessageKind::OpenPump,
            Self::ClosePump(_) => MessageKind::ClosePump,
            Self::Valve => MessageKind::Valve,
            Self::PumpFailureDetection(_) => MessageKind::PumpFailureDetection,
            Self::PumpControlFailureDetection(_) => MessageKind::PumpControlFailureDetection,
            Self::SteamFailureDetection => MessageKind::SteamFailureDetection,
            Self::LevelFailureDetection => MessageKind::LevelFailureDetection,
            Self::PumpRepairedAcknowledgement(_) => MessageKind::PumpRepairedAcknowledgement,
            Self::PumpControlRepairedAcknowledgement(_) => {
                MessageKind::PumpControlRepairedAcknowledgement
            }
            Self::SteamRepairedAcknowledgement => MessageKind::SteamRepairedAcknowledgement,
            Self::LevelRepairedAcknowledgement => MessageKind::LevelRepairedAcknowledgement,
        }
    }
}

// ---------------------------------------------------------------------------
// Mailbox
// ---------------------------------------------------------------------------

/// Ordered message buffer exchanged with the plant each tick.
#[derive(Debug, Clone, Default)]
pub struct Mailbox {
    messages: Vec<Message>,
}

impl Mailbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message. Order is preserved.
    pub fn send(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Number of buffered messages.
    pub fn size(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// The `i`-th message, if any.
    pub fn read(&self, i: usize) -> Option<&Message> {
        self.messages.get(i)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    /// Remove all messages, discarding them.
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Move every message into `other`, preserving order.
    pub fn drain_into(&mut self, other: &mut Mailbox) {
        other.messages.append(&mut self.messages);
    }

    /// The sole message of `kind`, or `None` if there are zero or
    /// several. A duplicated reading cannot be trusted any more than a
    /// missing one.
    pub fn only_match(&self, kind: MessageKind) -> Option<Message> {
        let mut found = None;
        for msg in &self.messages {
            if msg.kind() == kind {
                if found.is_some() {
                    return None;
                }
                found = Some(*msg);
            }
        }
        found
    }

    /// All messages of `kind`, in arrival order.
    pub fn all_matches(&self, kind: MessageKind) -> Vec<Message> {
        self.messages
            .iter()
            .filter(|m| m.kind() == kind)
            .copied()
            .collect()
    }

    /// Count of messages of `kind`.
    pub fn count_matches(&self, kind: MessageKind) -> usize {
        self.messages.iter().filter(|m| m.kind() == kind).count()
    }
}
