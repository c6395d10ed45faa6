//! Fuzz target: `BoilerController::tick`
//!
//! Decodes arbitrary bytes into a message batch, feeds batches through
//! the cycle, and asserts the hard invariants: no panic, EMERGENCY_STOP
//! is terminal, and tracked readings stay inside physical ranges.
//!
//! cargo fuzz run fuzz_cycle

#![no_main]

use boilerctl::{BoilerConfig, BoilerController, Mailbox, Message, Mode};
use libfuzzer_sys::fuzz_target;

/// Decode one message from a five-byte chunk; the first byte selects the
/// kind, the rest parameterise it.
fn decode(chunk: &[u8; 5]) -> Message {
    let value = f64::from(u16::from_le_bytes([chunk[1], chunk[2]])) / 40.0 - 200.0;
    let pump = usize::from(chunk[3] % 6);
    let open = chunk[4] & 1 == 1;
    match chunk[0] % 10 {
        0 => Message::Level(value),
        1 => Message::Steam(value / 40.0),
        2 => Message::PumpState { pump, open },
        3 => Message::PumpControlState { pump, open },
        4 => Message::SteamBoilerWaiting,
        5 => Message::PhysicalUnitsReady,
        6 => Message::PumpRepaired(pump),
        7 => Message::PumpControlRepaired(pump),
        8 => Message::LevelRepaired,
        _ => Message::SteamRepaired,
    }
}

fuzz_target!(|data: &[u8]| {
    let cfg = BoilerConfig::default();
    let mut controller = match BoilerController::new(cfg.clone()) {
        Ok(c) => c,
        Err(_) => return,
    };

    let mut stopped = false;
    // Each 0xFF-free run of bytes becomes one tick's batch.
    for batch_bytes in data.split(|&b| b == 0xFF).take(64) {
        let mut incoming = Mailbox::new();
        for chunk in batch_bytes.chunks_exact(5) {
            let chunk: &[u8; 5] = chunk.try_into().expect("chunks_exact gives 5");
            incoming.send(decode(chunk));
        }
        let mut outgoing = Mailbox::new();
        controller.tick(&incoming, &mut outgoing);

        if stopped {
            assert_eq!(controller.mode(), Mode::EmergencyStop, "stop must be terminal");
        }
        stopped = controller.mode() == Mode::EmergencyStop;

        let snap = controller.status_snapshot();
        assert!(
            (0.0..=cfg.capacity).contains(&snap.last_water),
            "tracked level left the tank"
        );
        assert!(
            (0.0..=cfg.maximal_steam_rate).contains(&snap.last_steam),
            "tracked steam rate out of range"
        );
    }
});
