//! End-to-end scenarios: controller against the scripted mock plant.
//!
//! These follow the boiler's life story — cold start, initialisation,
//! hand-over, regulation, every fault family, and the emergency stop —
//! asserting on the actual message batches the plant would see.

use crate::harness::{run_to_normal, step, MockPlant};
use boilerctl::{BoilerConfig, BoilerController, Mailbox, Message, MessageKind, Mode, PlantMode};

fn controller() -> BoilerController {
    BoilerController::new(BoilerConfig::default()).expect("default config is valid")
}

/// Hand-built inbox for fault-injection ticks.
fn inbox(level: f64, steam: f64, pumps: [bool; 4], ctrls: [bool; 4]) -> Mailbox {
    let mut mb = Mailbox::new();
    mb.send(Message::Level(level));
    mb.send(Message::Steam(steam));
    for (i, &open) in pumps.iter().enumerate() {
        mb.send(Message::PumpState { pump: i, open });
    }
    for (i, &open) in ctrls.iter().enumerate() {
        mb.send(Message::PumpControlState { pump: i, open });
    }
    mb
}

fn tick(controller: &mut BoilerController, incoming: &Mailbox) -> Mailbox {
    let mut out = Mailbox::new();
    controller.tick(incoming, &mut out);
    out
}

/// Drive a fresh pair to NORMAL with one pump regulating against
/// steam at 8 u/s. Returns the pair with commanded = [pump 0 open].
fn regulating_pair() -> (BoilerController, MockPlant) {
    let mut c = controller();
    let mut plant = MockPlant::new(BoilerConfig::default());
    run_to_normal(&mut c, &mut plant, 20);
    plant.steam = 8.0;
    step(&mut c, &mut plant);
    assert_eq!(c.mode(), Mode::Normal);
    assert!(c.status_snapshot().pump_commanded[0], "pump 0 should carry the load");
    (c, plant)
}

// ── Scenario 1: cold start ───────────────────────────────────────

#[test]
fn cold_start_announces_initialisation_and_floods() {
    let mut c = controller();
    let mut plant = MockPlant::new(BoilerConfig::default());

    let out = step(&mut c, &mut plant);

    assert_eq!(c.mode(), Mode::Waiting);
    assert_eq!(out.read(0), Some(&Message::Mode(PlantMode::Initialisation)));
    assert_eq!(out.count_matches(MessageKind::OpenPump), 4);
    assert!(plant.pump_open.iter().all(|&o| o));
}

// ── Scenario 2: initialisation completes ─────────────────────────

#[test]
fn filling_reaches_ready_then_program_ready() {
    let mut c = controller();
    let mut plant = MockPlant::new(BoilerConfig::default());

    // Fill until the level settles in the normal band.
    let mut reached_ready_at = None;
    for t in 0..10 {
        step(&mut c, &mut plant);
        if c.mode() == Mode::Ready {
            reached_ready_at = Some(t);
            break;
        }
    }
    reached_ready_at.expect("controller never reached READY");
    let level = plant.water;
    assert!(level > 400.0 && level < 600.0, "READY outside band: {level}");

    // The following tick announces PROGRAM_READY.
    let out = step(&mut c, &mut plant);
    assert_eq!(out.count_matches(MessageKind::ProgramReady), 1);
}

#[test]
fn progress_to_normal_is_bounded() {
    let mut c = controller();
    let mut plant = MockPlant::new(BoilerConfig::default());
    // Fill time is capacity / (T · ΣC) = 5 ticks; allow protocol slack.
    let ticks = run_to_normal(&mut c, &mut plant, 10);
    assert!(ticks <= 8, "took {ticks} ticks to reach NORMAL");
    assert!(c.status_snapshot().heater_on);
}

// ── Scenario 3: normal regulation ────────────────────────────────

#[test]
fn normal_regulation_tracks_optimal_level() {
    let (c, plant) = regulating_pair();
    // With w ≈ 500 and s = 8, one pump keeps the predicted band strictly
    // inside the normal band.
    let snap = c.status_snapshot();
    assert_eq!(snap.pump_commanded, vec![true, false, false, false]);
    assert!(plant.water > 400.0 && plant.water < 600.0);
}

#[test]
fn regulation_holds_band_through_steam_ramp() {
    let mut c = controller();
    let mut plant = MockPlant::new(BoilerConfig::default());
    run_to_normal(&mut c, &mut plant, 10);

    for _ in 0..60 {
        // Steam may rise or plateau within a cycle, never fall.
        plant.steam = (plant.steam + 0.5).min(10.0);
        step(&mut c, &mut plant);
        assert_eq!(c.mode(), Mode::Normal, "healthy plant must stay NORMAL");
        assert!(
            plant.water > 100.0 && plant.water < 900.0,
            "water {:.1} left the safety band",
            plant.water
        );
    }
}

// ── Scenario 4: pump and pump-controller faults ──────────────────

#[test]
fn dissenting_controller_within_band_degrades_with_controller_fault() {
    let (mut c, _plant) = regulating_pair();

    // Pump 0 agrees with its open command; the controller unit dissents;
    // the level is where the plan put it.
    let inb = inbox(505.0, 8.0, [true, false, false, false], [false; 4]);
    let out = tick(&mut c, &inb);

    assert_eq!(c.mode(), Mode::Degraded);
    let snap = c.status_snapshot();
    assert!(snap.ctrl_failed[0]);
    assert!(!snap.pump_failed[0]);
    assert_eq!(out.read(0), Some(&Message::Mode(PlantMode::Degraded)));
    assert_eq!(
        out.all_matches(MessageKind::PumpControlFailureDetection),
        vec![Message::PumpControlFailureDetection(0)]
    );
}

#[test]
fn dissenting_pump_degrades_with_pump_fault() {
    let (mut c, _plant) = regulating_pair();

    // Pump 0 claims closed against its open command; its controller
    // agrees with the command.
    let inb = inbox(505.0, 8.0, [false; 4], [true, false, false, false]);
    let out = tick(&mut c, &inb);

    assert_eq!(c.mode(), Mode::Degraded);
    let snap = c.status_snapshot();
    assert!(snap.pump_failed[0]);
    assert!(!snap.ctrl_failed[0]);
    assert_eq!(
        out.all_matches(MessageKind::PumpFailureDetection),
        vec![Message::PumpFailureDetection(0)]
    );
}

#[test]
fn failed_pump_is_never_reopened() {
    let (mut c, _plant) = regulating_pair();
    let inb = inbox(505.0, 8.0, [false; 4], [true, false, false, false]);
    tick(&mut c, &inb);
    assert!(c.status_snapshot().pump_failed[0]);

    // Level sags below the band: the planner floods — around pump 0.
    for _ in 0..5 {
        let inb = inbox(350.0, 8.0, [false; 4], [false; 4]);
        let out = tick(&mut c, &inb);
        for msg in out.iter() {
            assert_ne!(msg, &Message::OpenPump(0), "commanded a failed pump");
        }
    }
}

#[test]
fn pump_repair_returns_to_normal_and_acknowledges_once() {
    let (mut c, _plant) = regulating_pair();
    let inb = inbox(505.0, 8.0, [false; 4], [true, false, false, false]);
    tick(&mut c, &inb);
    assert_eq!(c.mode(), Mode::Degraded);

    // The degraded tick re-planned onto pump 1; the crew repairs pump 0,
    // and every pump resumes its commanded state.
    let commanded = c.status_snapshot().pump_commanded;
    let states = [commanded[0], commanded[1], commanded[2], commanded[3]];
    let mut repair = inbox(505.0, 8.0, states, states);
    repair.send(Message::PumpRepaired(0));
    let out = tick(&mut c, &repair);

    assert_eq!(c.mode(), Mode::Normal);
    assert!(!c.status_snapshot().pump_failed[0]);
    assert_eq!(
        out.all_matches(MessageKind::PumpRepairedAcknowledgement),
        vec![Message::PumpRepairedAcknowledgement(0)]
    );

    // A repeated notification is not acknowledged again.
    let commanded = c.status_snapshot().pump_commanded;
    let states = [commanded[0], commanded[1], commanded[2], commanded[3]];
    let mut again = inbox(505.0, 8.0, states, states);
    again.send(Message::PumpRepaired(0));
    let out = tick(&mut c, &again);
    assert_eq!(out.count_matches(MessageKind::PumpRepairedAcknowledgement), 0);
}

// ── Scenario 5: steam sensor fault ───────────────────────────────

#[test]
fn negative_steam_reading_degrades_and_estimates() {
    let (mut c, _plant) = regulating_pair();

    let inb = inbox(505.0, -3.0, [true, false, false, false], [true, false, false, false]);
    let out = tick(&mut c, &inb);

    assert_eq!(c.mode(), Mode::Degraded);
    assert!(c.status_snapshot().steam_sensor_failed);
    assert_eq!(out.count_matches(MessageKind::SteamFailureDetection), 1);

    // The next tick still regulates, now on the estimated rate; the
    // detection is not repeated.
    let inb = inbox(510.0, -3.0, [true, false, false, false], [true, false, false, false]);
    let out = tick(&mut c, &inb);
    assert_eq!(c.mode(), Mode::Degraded);
    assert_eq!(out.read(0), Some(&Message::Mode(PlantMode::Degraded)));
    assert_eq!(out.count_matches(MessageKind::SteamFailureDetection), 0);
}

// ── Scenario 6: double sensor loss ───────────────────────────────

#[test]
fn double_sensor_loss_stops_the_boiler() {
    let (mut c, _plant) = regulating_pair();

    // First the steam sensor goes.
    let inb = inbox(505.0, -3.0, [true, false, false, false], [true, false, false, false]);
    tick(&mut c, &inb);
    assert_eq!(c.mode(), Mode::Degraded);

    // Then the level sensor reports an impossible value.
    let inb = inbox(1200.0, -3.0, [true, false, false, false], [true, false, false, false]);
    let out = tick(&mut c, &inb);

    assert_eq!(c.mode(), Mode::EmergencyStop);
    assert_eq!(out.count_matches(MessageKind::Mode), 3);
    assert!(out
        .iter()
        .all(|m| !matches!(m, Message::Mode(pm) if *pm != PlantMode::EmergencyStop)));
    assert_eq!(out.count_matches(MessageKind::Valve), 1);
    assert!(c.status_snapshot().emptying);
}

// ── Level sensor fault alone: RESCUE ─────────────────────────────

#[test]
fn impossible_level_reading_rescues_on_the_model() {
    let (mut c, _plant) = regulating_pair();
    let before = c.status_snapshot().last_water;

    let inb = inbox(-50.0, 8.0, [true, false, false, false], [true, false, false, false]);
    let out = tick(&mut c, &inb);

    assert_eq!(c.mode(), Mode::Rescue);
    assert_eq!(out.read(0), Some(&Message::Mode(PlantMode::Rescue)));
    assert_eq!(out.count_matches(MessageKind::LevelFailureDetection), 1);

    // The tracked level is now the feed-forward estimate, not the
    // garbage reading.
    let snap = c.status_snapshot();
    assert!(snap.last_water >= 0.0 && snap.last_water <= 1000.0);
    assert!((snap.last_water - before).abs() <= 60.0, "estimate jumped implausibly");
}

#[test]
fn level_repair_recovers_from_rescue() {
    let (mut c, _plant) = regulating_pair();
    let inb = inbox(-50.0, 8.0, [true, false, false, false], [true, false, false, false]);
    tick(&mut c, &inb);
    assert_eq!(c.mode(), Mode::Rescue);

    let open = c.status_snapshot().pump_commanded;
    let mut repair = inbox(
        505.0,
        8.0,
        [open[0], open[1], open[2], open[3]],
        [open[0], open[1], open[2], open[3]],
    );
    repair.send(Message::LevelRepaired);
    let out = tick(&mut c, &repair);

    assert_eq!(c.mode(), Mode::Normal);
    assert_eq!(out.count_matches(MessageKind::LevelRepairedAcknowledgement), 1);
}

// ── Fatal inbox shapes ───────────────────────────────────────────

#[test]
fn duplicated_level_reading_is_fatal() {
    let (mut c, _plant) = regulating_pair();
    let mut inb = inbox(505.0, 8.0, [true, false, false, false], [true, false, false, false]);
    inb.send(Message::Level(505.0));
    let out = tick(&mut c, &inb);
    assert_eq!(c.mode(), Mode::EmergencyStop);
    assert_eq!(out.count_matches(MessageKind::Mode), 3);
}

#[test]
fn missing_pump_report_is_fatal() {
    let (mut c, _plant) = regulating_pair();
    let mut inb = Mailbox::new();
    inb.send(Message::Level(505.0));
    inb.send(Message::Steam(8.0));
    for i in 0..3 {
        inb.send(Message::PumpState { pump: i, open: false });
    }
    for i in 0..4 {
        inb.send(Message::PumpControlState { pump: i, open: false });
    }
    tick(&mut c, &inb);
    assert_eq!(c.mode(), Mode::EmergencyStop);
}

#[test]
fn runaway_pumps_drive_overfill_stop() {
    // Every pump jams open and the level genuinely climbs. The pump scan
    // flags one unit per tick (which also exonerates the level sensor),
    // and the moment the trusted reading crosses the safety limit the
    // boiler stops.
    let (mut c, _plant) = regulating_pair();

    tick(&mut c, &inbox(600.0, 8.0, [true; 4], [true; 4]));
    assert_eq!(c.mode(), Mode::Degraded);

    tick(&mut c, &inbox(760.0, 8.0, [true; 4], [true; 4]));
    assert_eq!(c.mode(), Mode::Degraded);
    assert!(!c.status_snapshot().water_sensor_failed);

    let out = tick(&mut c, &inbox(920.0, 8.0, [true; 4], [true; 4]));
    assert_eq!(c.mode(), Mode::EmergencyStop);
    assert_eq!(out.count_matches(MessageKind::Mode), 3);
}

#[test]
fn steam_during_waiting_is_fatal() {
    let mut c = controller();
    let mut inb = inbox(0.0, 3.0, [false; 4], [false; 4]);
    inb.send(Message::SteamBoilerWaiting);
    tick(&mut c, &inb);
    assert_eq!(c.mode(), Mode::EmergencyStop);
}

#[test]
fn emergency_stop_keeps_announcing_forever() {
    let (mut c, _plant) = regulating_pair();
    tick(&mut c, &Mailbox::new()); // transmission failure

    for _ in 0..5 {
        let healthy = inbox(500.0, 8.0, [false; 4], [false; 4]);
        let out = tick(&mut c, &healthy);
        assert_eq!(c.mode(), Mode::EmergencyStop);
        assert_eq!(out.count_matches(MessageKind::Mode), 3);
        assert_eq!(out.count_matches(MessageKind::OpenPump), 0);
    }
}
