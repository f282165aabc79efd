/// Read-only view onto the RTT probe channel's windowed reductions.
///
/// Decouples the delivery-rate estimator and the adaptation state machine
/// from the concrete RTT store implementation — both only ever need these
/// two queries.
pub trait RttSignals: Send + Sync {
    /// Minimum non-zero sample over the long RTProp window. Returns
    /// [`crate::snapshot::NO_SAMPLE`] if no sample is available.
    fn rt_prop(&self) -> u32;

    /// Maximum sample over the last `window_us` worth of slots.
    fn rtt_max_recent(&self, window_us: u32) -> u32;
}
