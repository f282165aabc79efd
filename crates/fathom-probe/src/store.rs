//! Fixed-size ring of RTT samples, written by the echo handler and queried
//! by the delivery-rate estimator and the adaptation state machine.

use std::sync::Mutex;

use fathom_core::signals::RttSignals;
use fathom_core::snapshot::NO_SAMPLE;

/// Number of id slots in the ring. Ids are taken modulo this when indexing.
pub const STORE_SIZE: usize = 4096;

/// One probe every 20 ms.
pub const PING_PERIOD_US: i64 = 20_000;

/// 20 s / 20 ms = 1000 slots.
pub const RTPROP_WINDOW_SLOTS: usize = 1000;

struct Inner {
    store: [u32; STORE_SIZE],
    last_id: u32,
}

/// Thread-safe RTT sample ring. A slot value of 0 means "lost or never
/// written"; any non-zero value is a measured round-trip time in
/// microseconds.
pub struct RttStore {
    inner: Mutex<Inner>,
}

impl Default for RttStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RttStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                store: [0u32; STORE_SIZE],
                last_id: 0,
            }),
        }
    }

    /// Record the RTT sample for probe `id`. Every slot strictly between
    /// the previous `last_id` and `id` is zeroed, representing probes that
    /// were lost or skipped. `id` is an ever-increasing counter; only its
    /// value modulo [`STORE_SIZE`] determines the storage slot.
    pub fn record(&self, id: u32, rtt_us: u32) {
        let mut inner = self.inner.lock().expect("rtt store mutex poisoned");
        let last = inner.last_id;
        let delta = id.wrapping_sub(last);
        let zero_count = delta.saturating_sub(1).min(STORE_SIZE as u32);
        let mut j = last.wrapping_add(1);
        for _ in 0..zero_count {
            inner.store[(j as usize) % STORE_SIZE] = 0;
            j = j.wrapping_add(1);
        }
        inner.store[(id as usize) % STORE_SIZE] = rtt_us;
        inner.last_id = id;
    }

    /// The id of the most recent sample written (whether or not it was a
    /// loss-zeroed slot).
    pub fn last_id(&self) -> u32 {
        self.inner.lock().expect("rtt store mutex poisoned").last_id
    }

    fn walk_back<F: FnMut(u32)>(&self, slots: usize, mut f: F) {
        let inner = self.inner.lock().expect("rtt store mutex poisoned");
        let slots = slots.min(STORE_SIZE);
        let mut idx = inner.last_id as usize % STORE_SIZE;
        for _ in 0..slots {
            f(inner.store[idx]);
            idx = (idx + STORE_SIZE - 1) % STORE_SIZE;
        }
    }
}

impl RttSignals for RttStore {
    fn rt_prop(&self) -> u32 {
        let mut min = NO_SAMPLE;
        self.walk_back(RTPROP_WINDOW_SLOTS, |v| {
            if v != 0 && v < min {
                min = v;
            }
        });
        min
    }

    fn rtt_max_recent(&self, window_us: u32) -> u32 {
        let slots = (window_us as i64 / PING_PERIOD_US).max(0) as usize;
        let mut max = 0u32;
        self.walk_back(slots, |v| {
            if v > max {
                max = v;
            }
        });
        max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_store_reports_sentinel() {
        let store = RttStore::new();
        assert_eq!(store.rt_prop(), NO_SAMPLE);
        assert_eq!(store.rtt_max_recent(200_000), 0);
    }

    #[test]
    fn ring_wrap_keeps_only_last_store_size_entries() {
        let store = RttStore::new();
        for id in 0u32..8192 {
            store.record(id, id + 1);
        }
        assert_eq!(store.last_id(), 8191);
        // Index k now holds the value written by id = 4096 + k, not id = k;
        // the maximum value present in the whole ring is from id 8191.
        assert_eq!(
            store.rtt_max_recent((STORE_SIZE as i64 * PING_PERIOD_US) as u32),
            8192
        );
    }

    #[test]
    fn loss_gap_zeroes_skipped_slots() {
        // Scenario 6: probes 0..9 sent, echoes 0, 3, 7 received.
        let store = RttStore::new();
        store.record(0, 100);
        store.record(3, 150);
        store.record(7, 120);

        let snapshot = store.inner.lock().unwrap().store;
        assert_eq!(snapshot[1], 0);
        assert_eq!(snapshot[2], 0);
        assert_eq!(snapshot[4], 0);
        assert_eq!(snapshot[5], 0);
        assert_eq!(snapshot[6], 0);
        assert_eq!(snapshot[0], 100);
        assert_eq!(snapshot[3], 150);
        assert_eq!(snapshot[7], 120);
        assert_eq!(store.last_id(), 7);

        // rt_prop is the min of the three non-zero values.
        assert_eq!(store.rt_prop(), 100);
    }

    #[test]
    fn rt_prop_ignores_zero_slots_in_window() {
        let store = RttStore::new();
        store.record(0, 50);
        // id 1 never arrives; record(2, ..) zeroes slot 1 as lost.
        store.record(2, 80);
        assert_eq!(store.rt_prop(), 50);
    }

    #[test]
    fn idempotent_reads() {
        let store = RttStore::new();
        store.record(0, 42);
        assert_eq!(store.rt_prop(), store.rt_prop());
    }
}
