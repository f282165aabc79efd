//! The adaptation state machine (component C): reads the delivery-rate
//! estimator's snapshot on a fixed cycle and drives a clamped bitrate
//! through a three-stage BBR-style controller (WAITING, STARTUP, STANDBY).

pub mod engine;

pub use engine::{
    to_control_message, BbrEngine, CycleOutcome, PingScheduler, Stage, BITRATE_INIT_DEFAULT_KBPS,
    BITRATE_MAX_KBPS, BITRATE_MIN_KBPS, CYCLE_PERIOD_US, GAIN_DRAIN, GAIN_INCREASE, GAIN_MAINTAIN,
    GAIN_PROBE, GAIN_STANDBY, PING_DELAY_US, PLATEAU_GROWTH, PROBE_INTERVAL_US, QUEUE_THRESHOLD_US,
    WARMUP_CYCLES,
};
