/// Sentinel returned by [`crate::signals::RttSignals::rt_prop`] when no RTT
/// sample is available yet. Mirrors the `UINT_MAX` "no data" convention used
/// throughout the probe channel and the adaptation state machine.
pub const NO_SAMPLE: u32 = u32::MAX;

/// An atomically-observable triple of network signals, published by the
/// delivery-rate estimator and consumed by the adaptation state machine.
///
/// `Copy` and immutable by construction: a reader obtains a whole snapshot
/// or it obtains the previous one, never a mix of fields from two different
/// publications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReportSnapshot {
    pub throughput_bytes_per_window: u32,
    pub rtprop_us: u32,
    pub rtt_us: u32,
}

impl ReportSnapshot {
    pub const fn new(throughput_bytes_per_window: u32, rtprop_us: u32, rtt_us: u32) -> Self {
        Self {
            throughput_bytes_per_window,
            rtprop_us,
            rtt_us,
        }
    }

    /// True when the rtprop field carries the "no data" sentinel.
    pub fn has_rtprop(&self) -> bool {
        self.rtprop_us != NO_SAMPLE
    }
}
