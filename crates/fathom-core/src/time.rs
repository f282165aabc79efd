//! Microsecond-resolution monotonic time types.
//!
//! Every timestamp in this workspace is an integer count of microseconds
//! since an arbitrary epoch fixed at process start. `Instant` values are
//! only ever compared to other `Instant` values produced by this process;
//! they are not wall-clock timestamps and are not meant to be persisted.

use std::sync::OnceLock;

use quanta::Clock;

static CLOCK: OnceLock<(Clock, quanta::Instant)> = OnceLock::new();

fn clock() -> &'static (Clock, quanta::Instant) {
    CLOCK.get_or_init(|| {
        let clock = Clock::new();
        let epoch = clock.now();
        (clock, epoch)
    })
}

/// A monotonically non-decreasing timestamp, in microseconds since process start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Instant(i64);

/// A signed microsecond delta between two [`Instant`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Duration(i64);

impl Instant {
    /// The current time, read from the process-wide monotonic clock.
    pub fn now() -> Self {
        let (clock, epoch) = clock();
        let elapsed = clock.now().saturating_duration_since(*epoch);
        Instant(elapsed.as_micros().min(i64::MAX as u128) as i64)
    }

    /// Construct an `Instant` directly from a microsecond count. Used by tests
    /// and by scenario harnesses that need to script exact timestamps.
    pub const fn from_micros(us: i64) -> Self {
        Instant(us)
    }

    pub const fn as_micros(self) -> i64 {
        self.0
    }

    pub fn saturating_sub(self, rhs: Instant) -> Duration {
        Duration(self.0.saturating_sub(rhs.0))
    }

    pub fn saturating_add(self, rhs: Duration) -> Instant {
        Instant(self.0.saturating_add(rhs.0))
    }
}

impl Duration {
    pub const ZERO: Duration = Duration(0);

    pub const fn from_micros(us: i64) -> Self {
        Duration(us)
    }

    pub const fn from_millis(ms: i64) -> Self {
        Duration(ms.saturating_mul(1_000))
    }

    pub const fn from_secs(s: i64) -> Self {
        Duration(s.saturating_mul(1_000_000))
    }

    pub const fn as_micros(self) -> i64 {
        self.0
    }
}

impl std::ops::Sub for Instant {
    type Output = Duration;
    fn sub(self, rhs: Instant) -> Duration {
        self.saturating_sub(rhs)
    }
}

impl std::ops::Add<Duration> for Instant {
    type Output = Instant;
    fn add(self, rhs: Duration) -> Instant {
        self.saturating_add(rhs)
    }
}
