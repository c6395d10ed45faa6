//! Pump activation planner.
//!
//! Decides *how many* pumps should be open and *which* physical pumps to
//! toggle to get there, then records the predicted water band for the
//! chosen activation — the band the failure detector will hold the next
//! reading against.
//!
//! Cardinality policy:
//!
//! 1. at or above the normal band → close everything;
//! 2. below the band → flood with every controllable pump;
//! 3. inside the band → pick the count whose predicted mid-level sits
//!    closest to the optimal level while both bounds stay strictly
//!    inside the band. No feasible count means close everything.
//!
//! Index policy: open lowest-index-first, close highest-index-first,
//! never command a pump flagged failed. Deterministic, and keeps the
//! low-numbered pumps doing most of the work.

use log::debug;

use crate::fsm::context::CycleContext;
use crate::mailbox::Message;
use crate::physics;

/// Run one planning pass: choose a cardinality, issue the open/close
/// commands, and record the predicted band for the next tick's fault
/// oracle.
pub fn regulate(ctx: &mut CycleContext, water: f64, steam: f64) {
    let chosen = pumps_to_activate(ctx, water, steam);
    // "No feasible count" resolves to close-all.
    apply(ctx, chosen.unwrap_or(0));
    record_band(ctx, water, steam);
}

/// Number of pumps to run for the coming period, or `None` when no count
/// keeps the predicted band inside the normal band.
fn pumps_to_activate(ctx: &CycleContext, water: f64, steam: f64) -> Option<usize> {
    let cfg = &ctx.config;
    let n = cfg.pump_count();

    if water >= cfg.maximal_normal {
        // Any further filling risks over-fill.
        return Some(0);
    }
    if water < cfg.minimal_normal {
        // Flood back into the band.
        return Some(n);
    }

    let optimal = cfg.optimal_level();
    let mut best: Option<(usize, f64)> = None;
    for k in 0..=n {
        let capacity = controllable_capacity(ctx, k);
        let hi = physics::level_upper_bound(cfg, water, steam, capacity);
        let lo = physics::level_lower_bound(cfg, water, capacity);
        if hi < cfg.maximal_normal && lo > cfg.minimal_normal {
            let distance = ((hi + lo) / 2.0 - optimal).abs();
            if best.map_or(true, |(_, d)| distance < d) {
                best = Some((k, distance));
            }
        }
    }
    debug!(
        "planner: water {water:.1} steam {steam:.1} -> k = {:?}",
        best.map(|(k, _)| k)
    );
    best.map(|(k, _)| k)
}

/// Summed throughput of the first `k` controllable pumps — the pumps the
/// index policy would actually open.
fn controllable_capacity(ctx: &CycleContext, k: usize) -> f64 {
    ctx.config
        .pump_capacity
        .iter()
        .zip(&ctx.pump_failed)
        .filter(|(_, &failed)| !failed)
        .take(k)
        .map(|(&c, _)| c)
        .sum()
}

/// Issue open/close commands until the reported open count matches
/// `target`, skipping failed pumps, and keep the commanded-state record
/// in step with every message sent.
fn apply(ctx: &mut CycleContext, target: usize) {
    let n = ctx.config.pump_count();
    let mut open = ctx.reported_open();
    let mut open_count = open.iter().filter(|&&o| o).count();

    if open_count > target {
        // Close highest-index-first.
        for pump in (0..n).rev() {
            if open_count == target {
                break;
            }
            if open[pump] && !ctx.pump_failed[pump] {
                ctx.outbox.send(Message::ClosePump(pump));
                ctx.pump_commanded[pump] = false;
                open[pump] = false;
                open_count -= 1;
            }
        }
    } else if open_count < target {
        // Open lowest-index-first.
        for pump in 0..n {
            if open_count == target {
                break;
            }
            if !open[pump] && !ctx.pump_failed[pump] {
                ctx.outbox.send(Message::OpenPump(pump));
                ctx.pump_commanded[pump] = true;
                open[pump] = true;
                open_count += 1;
            }
        }
    }
}

/// Record the band the chosen activation predicts for the next reading.
/// Read back by the failure detector one tick later.
fn record_band(ctx: &mut CycleContext, water: f64, steam: f64) {
    let capacity = ctx.commanded_capacity();
    ctx.band_hi = physics::level_upper_bound(&ctx.config, water, steam, capacity);
    ctx.band_lo = physics::level_lower_bound(&ctx.config, water, capacity);
}
