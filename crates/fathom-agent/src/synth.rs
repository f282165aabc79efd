//! Synthetic media generator: plays the role of the media receiver external
//! collaborator (§1), producing frame-arrival events at a fixed rate so the
//! control loop can be exercised end-to-end without a real decoder.
//!
//! Frame sizes are scaled to the currently-applied bitrate (read from the
//! shared cell the adaptation engine maintains) plus a little per-frame
//! jitter, roughly mimicking a constant-bitrate encoder's output.

use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use fathom_core::time::Instant;
use fathom_rate::DeliveryRateEstimator;

/// Simulated frame rate.
const FRAMES_PER_SEC: u32 = 30;
const FRAME_PERIOD: StdDuration = StdDuration::from_micros(1_000_000 / FRAMES_PER_SEC as u64);

/// Runs until `stop` is set, feeding synthetic frame-arrival events into
/// `estimator` at `FRAMES_PER_SEC`. Intended to be the body of a dedicated
/// thread standing in for the real media receive path.
pub fn run_generator(estimator: &DeliveryRateEstimator, bitrate_cell: &Arc<AtomicI32>, stop: &AtomicBool) {
    let mut seq: u16 = 0;
    let mut sender_ts: u32 = 0;
    let mut lcg_state: u32 = 0x9E3779B9;

    while !stop.load(Ordering::Relaxed) {
        let bitrate_kbps = bitrate_cell.load(Ordering::Relaxed).max(1) as u64;
        // bits/sec -> bytes/frame at FRAMES_PER_SEC.
        let base_size = (bitrate_kbps * 1000 / 8) / FRAMES_PER_SEC as u64;
        let jitter = (next_lcg(&mut lcg_state) % 200) as i64 - 100;
        let size = (base_size as i64 + jitter).max(1) as u32;

        // A single-packet frame is enough to exercise the estimator; real
        // frames span several packets, but the estimator only cares about
        // the total accumulated size per sender timestamp.
        estimator.on_packet(1, seq, Instant::now(), sender_ts, size);

        seq = seq.wrapping_add(1);
        sender_ts = sender_ts.wrapping_add(1);
        std::thread::sleep(FRAME_PERIOD);
    }
}

/// Minimal linear congruential generator: enough jitter to avoid perfectly
/// uniform synthetic frames, not a source of real randomness.
fn next_lcg(state: &mut u32) -> u32 {
    *state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
    *state
}
