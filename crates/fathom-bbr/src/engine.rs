//! The BBR-style adaptation state machine (component C): reads the
//! delivery-rate estimator's snapshot on a fixed cycle, runs the three-state
//! variant described for this controller, and emits a clamped bitrate.

use fathom_core::snapshot::{ReportSnapshot, NO_SAMPLE};
use fathom_core::time::{Duration, Instant};
use fathom_wire::{ControlMessage, Reconfigure};

/// Control-tick cadence.
pub const CYCLE_PERIOD_US: i64 = 800_000;
/// STANDBY re-probe cadence.
pub const PROBE_INTERVAL_US: i64 = 5_000_000;
/// `rtt - rtprop` above this indicates a standing queue.
pub const QUEUE_THRESHOLD_US: u32 = 5_000;
/// Required throughput growth, relative to the worse of the last two
/// readings, for STARTUP to keep doubling.
pub const PLATEAU_GROWTH: f64 = 1.25;

pub const GAIN_MAINTAIN: f32 = 1.0;
pub const GAIN_INCREASE: f32 = 2.0;
pub const GAIN_DRAIN: f32 = 0.5;
pub const GAIN_STANDBY: f32 = 0.75;
pub const GAIN_PROBE: f32 = 1.25;

pub const BITRATE_MIN_KBPS: i32 = 200;
pub const BITRATE_MAX_KBPS: i32 = 30_000;
pub const BITRATE_INIT_DEFAULT_KBPS: i32 = 1_000;

/// Cycles to ignore at boot before any RECONFIGURE may be emitted (and
/// before WAITING may transition to STARTUP).
pub const WARMUP_CYCLES: u32 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Waiting,
    Startup,
    Standby,
}

/// Result of one control-tick. `reconfigure` is `Some` only when this cycle
/// both passed warm-up and moved the gain away from 1.0 by more than 0.1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleOutcome {
    pub stage: Stage,
    pub gain: f32,
    pub bitrate_kbps: i32,
    pub reconfigure: Option<Reconfigure>,
}

/// Owns the closed-loop controller's state across cycles.
pub struct BbrEngine {
    stage: Stage,
    prev_throughput_0: u32,
    prev_throughput_1: u32,
    /// Number of history shifts performed so far, capped at 2. Distinguishes
    /// "no data yet" from a legitimately-zero throughput reading.
    history_count: u8,
    prev_probe_at: Instant,
    bitrate_kbps: i32,
    last_gain: f32,
    cycles_elapsed: u32,
}

impl BbrEngine {
    pub fn new(initial_bitrate_kbps: i32) -> Self {
        Self {
            stage: Stage::Waiting,
            prev_throughput_0: 0,
            prev_throughput_1: 0,
            history_count: 0,
            prev_probe_at: Instant::from_micros(0),
            bitrate_kbps: initial_bitrate_kbps.clamp(BITRATE_MIN_KBPS, BITRATE_MAX_KBPS),
            last_gain: GAIN_MAINTAIN,
            cycles_elapsed: 0,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn bitrate_kbps(&self) -> i32 {
        self.bitrate_kbps
    }

    pub fn last_gain(&self) -> f32 {
        self.last_gain
    }

    pub fn cycles_elapsed(&self) -> u32 {
        self.cycles_elapsed
    }

    fn queue_detected(snapshot: &ReportSnapshot) -> bool {
        snapshot.rtt_us > snapshot.rtprop_us.saturating_add(QUEUE_THRESHOLD_US)
    }

    /// Run one control cycle. `now` is this tick's timestamp, used for the
    /// STANDBY probe cadence.
    pub fn step(&mut self, snapshot: ReportSnapshot, now: Instant) -> CycleOutcome {
        if snapshot.rtprop_us == NO_SAMPLE {
            // Sentinel, not an error: no data yet, skip this cycle entirely.
            return CycleOutcome {
                stage: self.stage,
                gain: GAIN_MAINTAIN,
                bitrate_kbps: self.bitrate_kbps,
                reconfigure: None,
            };
        }

        self.cycles_elapsed += 1;
        let gain = self.compute_gain(&snapshot, now);

        // Shift history with this cycle's throughput, using the pre-shift
        // values above when computing the plateau check.
        self.prev_throughput_1 = self.prev_throughput_0;
        self.prev_throughput_0 = snapshot.throughput_bytes_per_window;
        self.history_count = self.history_count.saturating_add(1).min(2);
        self.last_gain = gain;

        let warmed_up = self.cycles_elapsed > WARMUP_CYCLES;
        let reconfigure = if warmed_up && (gain - 1.0).abs() > 0.1 {
            let new_bitrate = ((self.bitrate_kbps as f64) * gain as f64).round() as i32;
            self.bitrate_kbps = new_bitrate.clamp(BITRATE_MIN_KBPS, BITRATE_MAX_KBPS);
            Some(Reconfigure::bitrate_only(self.bitrate_kbps))
        } else {
            None
        };

        CycleOutcome {
            stage: self.stage,
            gain,
            bitrate_kbps: self.bitrate_kbps,
            reconfigure,
        }
    }

    fn compute_gain(&mut self, snapshot: &ReportSnapshot, now: Instant) -> f32 {
        match self.stage {
            Stage::Waiting => {
                let warmed_up = self.cycles_elapsed > WARMUP_CYCLES;
                if snapshot.throughput_bytes_per_window != 0 && warmed_up {
                    self.stage = Stage::Startup;
                }
                GAIN_MAINTAIN
            }
            Stage::Startup => {
                let queue = Self::queue_detected(snapshot);
                let has_two_back_history = self.history_count >= 2;
                let plateaued = has_two_back_history && {
                    let floor = self.prev_throughput_0.min(self.prev_throughput_1) as f64;
                    floor * PLATEAU_GROWTH > snapshot.throughput_bytes_per_window as f64
                };
                let at_max = self.bitrate_kbps >= BITRATE_MAX_KBPS;

                if plateaued || queue || at_max {
                    self.stage = Stage::Standby;
                    self.prev_probe_at = now;
                    if queue {
                        GAIN_DRAIN
                    } else {
                        GAIN_MAINTAIN
                    }
                } else {
                    GAIN_INCREASE
                }
            }
            Stage::Standby => {
                if Self::queue_detected(snapshot) {
                    self.prev_probe_at = now;
                    GAIN_STANDBY
                } else if (now - self.prev_probe_at).as_micros() > PROBE_INTERVAL_US
                    && self.bitrate_kbps < BITRATE_MAX_KBPS
                {
                    self.prev_probe_at = now;
                    GAIN_PROBE
                } else {
                    GAIN_MAINTAIN
                }
            }
        }
    }
}

/// Wraps a just-computed cycle outcome into the wire message C emits via D,
/// when one was emitted this cycle.
pub fn to_control_message(outcome: &CycleOutcome) -> Option<ControlMessage> {
    outcome.reconfigure.map(ControlMessage::Reconfigure)
}

/// Out-of-band ping scheduler: sends a `PING` control message every
/// `PING_DELAY`, independent of the probe channel's own UDP pings, used by
/// the peer for its own diagnostics.
pub struct PingScheduler {
    next_id: u32,
    next_send_at: Instant,
    period: Duration,
}

pub const PING_DELAY_US: i64 = 20_000;

impl PingScheduler {
    pub fn new(start: Instant) -> Self {
        Self {
            next_id: 0,
            next_send_at: start,
            period: Duration::from_micros(PING_DELAY_US),
        }
    }

    /// If `now` has reached the next scheduled send time, returns a `Ping`
    /// message and advances the schedule; otherwise returns `None`.
    pub fn maybe_emit(&mut self, now: Instant) -> Option<ControlMessage> {
        if now < self.next_send_at {
            return None;
        }
        let us = now.as_micros();
        let msg = ControlMessage::Ping(fathom_wire::Ping {
            ping_id: self.next_id,
            tv_sec: (us / 1_000_000) as i32,
            tv_usec: (us % 1_000_000) as i32,
        });
        self.next_id = self.next_id.wrapping_add(1);
        self.next_send_at = self.next_send_at + self.period;
        Some(msg)
    }
}
