//! Cyclic steam-boiler controller.
//!
//! Every five seconds the host simulator hands the controller a batch
//! of plant messages and an empty outgoing buffer; the controller
//! interprets the batch, decides which feed pumps to run and whether to
//! drain, tracks component failures and repairs, and fills the buffer
//! with its commands. The controller is a pure library — no I/O, no
//! clock, no threads; the host owns all of that.
//!
//! Entry point: [`controller::BoilerController`].

#![deny(unused_must_use)]

pub mod config;
pub mod controller;
pub mod detector;
pub mod error;
pub mod fsm;
pub mod mailbox;
pub mod physics;
pub mod planner;

pub use config::BoilerConfig;
pub use controller::BoilerController;
pub use fsm::Mode;
pub use mailbox::{Mailbox, Message, MessageKind, PlantMode};
