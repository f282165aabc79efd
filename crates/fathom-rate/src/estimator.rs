//! The delivery-rate estimator (component B): the single `on_packet`
//! callback that groups packets into frames, maintains the sliding
//! throughput window, and publishes a [`ReportSnapshot`] every report
//! period.

use std::sync::atomic::AtomicI32;
use std::sync::{Arc, Mutex};

use arc_swap::ArcSwap;
use fathom_core::signals::RttSignals;
use fathom_core::snapshot::ReportSnapshot;
use fathom_core::time::Instant;

use crate::ring::{FrameRecord, FrameRing};
use crate::trace::Trace;

/// Publish a fresh snapshot at most this often.
pub const REPORT_PERIOD_US: i64 = 500_000;

/// Frames older than this relative to the newest arrival fall out of the
/// throughput sum.
pub const CYCLE_WINDOW_US: i64 = 800_000;

/// Window handed to `rtt_max_recent` when snapshotting a new frame: the
/// same span as the adaptation state machine's control cycle, so the
/// queueing-delay signal a frame carries matches what the controller will
/// act on.
const RTT_SNAPSHOT_WINDOW_US: u32 = CYCLE_WINDOW_US as u32;

struct State {
    ring: FrameRing,
    last_sender_ts: Option<u32>,
    last_report_at: Option<Instant>,
}

/// Converts per-packet arrival events into a windowed throughput signal,
/// synchronized with RTT snapshots read from the probe channel.
///
/// Single mutator (`on_packet`); the media receiver must not call it
/// concurrently from multiple threads (the interior [`Mutex`] exists to
/// satisfy `Send + Sync`, not to arbitrate real contention).
pub struct DeliveryRateEstimator {
    state: Mutex<State>,
    rtt_signals: Arc<dyn RttSignals>,
    snapshot: ArcSwap<ReportSnapshot>,
    /// Last-applied bitrate, mirrored here so the CSV trace can correlate
    /// the estimator's view with the controller's current output without a
    /// hard dependency on `fathom-bbr`.
    bitrate_cell: Arc<AtomicI32>,
    trace: Option<Trace>,
}

impl DeliveryRateEstimator {
    pub fn new(rtt_signals: Arc<dyn RttSignals>) -> Self {
        Self::with_trace(rtt_signals, Arc::new(AtomicI32::new(0)), None)
    }

    /// `bitrate_cell` is shared with the caller, who is expected to hand the
    /// same `Arc` to the adaptation engine — that's the only way `trace`'s
    /// CSV rows end up correlated with the controller's current bitrate.
    pub fn with_trace(
        rtt_signals: Arc<dyn RttSignals>,
        bitrate_cell: Arc<AtomicI32>,
        trace: Option<Trace>,
    ) -> Self {
        Self {
            state: Mutex::new(State {
                ring: FrameRing::new(),
                last_sender_ts: None,
                last_report_at: None,
            }),
            rtt_signals,
            snapshot: ArcSwap::from_pointee(ReportSnapshot::default()),
            bitrate_cell,
            trace,
        }
    }

    /// The shared cell the adaptation state machine should update with its
    /// currently-applied bitrate, purely for trace correlation.
    pub fn bitrate_cell(&self) -> Arc<AtomicI32> {
        self.bitrate_cell.clone()
    }

    /// The most recently published snapshot. Lock-free: readers never
    /// observe a torn triple because the whole triple is swapped as one
    /// immutable `Arc`.
    pub fn snapshot(&self) -> ReportSnapshot {
        **self.snapshot.load()
    }

    /// Per-media-packet arrival event. `ssrc` and `seq` are accepted and
    /// threaded through for parity with the media receiver's interface and
    /// for diagnostic logging, but are not otherwise interpreted — this
    /// estimator assumes a single SSRC.
    pub fn on_packet(&self, ssrc: u32, seq: u16, recv_time: Instant, sender_ts: u32, size: u32) {
        let mut state = self.state.lock().expect("estimator state mutex poisoned");

        if state.last_sender_ts == Some(sender_ts) {
            // Same frame: accumulate into the current head-minus-one record.
            if let Some(rec) = state.ring.newest_mut() {
                rec.size_bytes = rec.size_bytes.saturating_add(size);
            }
            return;
        }

        // A new frame begins. Documented limitation (not "fixed"): two
        // genuinely distinct frames that happen to share a sender timestamp
        // are folded together here, same as the rule above.
        //
        // The previous frame's state is now final; journal it before it is
        // displaced by the new head record.
        if let (Some(trace), Some(prev)) = (&self.trace, state.ring.newest()) {
            trace.record_frame(
                prev.recv_time,
                prev.size_bytes,
                self.snapshot().throughput_bytes_per_window,
                prev.rtt_snapshot_us,
                prev.rtprop_snapshot_us,
            );
        }

        let rtprop_snapshot_us = self.rtt_signals.rt_prop();
        let rtt_snapshot_us = self.rtt_signals.rtt_max_recent(RTT_SNAPSHOT_WINDOW_US);
        let elapsed_us = match state.ring.newest() {
            Some(prev) => (recv_time - prev.recv_time).as_micros().clamp(0, u32::MAX as i64) as u32,
            None => 0,
        };
        let record = FrameRecord {
            recv_time,
            size_bytes: size,
            elapsed_us,
            rtprop_snapshot_us,
            rtt_snapshot_us,
        };
        state.ring.push(record);
        state.last_sender_ts = Some(sender_ts);

        // The very first frame seeds `last_report_at` but never publishes:
        // there is nothing meaningful to report yet (spec §4.B edge case).
        let Some(last_report_at) = state.last_report_at else {
            state.last_report_at = Some(recv_time);
            return;
        };
        if (recv_time - last_report_at).as_micros() < REPORT_PERIOD_US {
            return;
        }

        state
            .ring
            .evict_front_while(|rec| (recv_time - rec.recv_time).as_micros() < CYCLE_WINDOW_US);
        let throughput = state.ring.throughput_sum();
        let (rtprop_us, rtt_us) = state
            .ring
            .newest()
            .map(|rec| (rec.rtprop_snapshot_us, rec.rtt_snapshot_us))
            .unwrap_or((rtprop_snapshot_us, rtt_snapshot_us));

        self.snapshot
            .store(Arc::new(ReportSnapshot::new(throughput, rtprop_us, rtt_us)));
        state.last_report_at = Some(recv_time);

        // ssrc/seq are intentionally not used beyond this diagnostic event.
        tracing::trace!(ssrc, seq, throughput, rtt_us, rtprop_us, "rate: published snapshot");
    }
}
