//! The probe channel task: owns the UDP socket, sends identified pings on a
//! fixed period, and feeds echoes into the [`RttStore`].

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use fathom_core::time::{Duration, Instant};
use fathom_wire::{ControlMessage, ControlSink};

use crate::socket::DatagramSocket;
use crate::store::{RttStore, PING_PERIOD_US, STORE_SIZE};

/// `(u32 id, i64 tv_sec, i64 tv_usec)`, host byte order.
const PROBE_PAYLOAD_LEN: usize = 4 + 8 + 8;
const RECV_BUF_LEN: usize = 512;

/// Per-spec receive timeout: the probe loop never blocks the rest of the
/// system on an unavailable echo.
const RECV_TIMEOUT: StdDuration = StdDuration::from_micros(100);

fn encode_probe(id: u32, send_time: Instant) -> [u8; PROBE_PAYLOAD_LEN] {
    let us = send_time.as_micros();
    let tv_sec = us.div_euclid(1_000_000);
    let tv_usec = us.rem_euclid(1_000_000);
    let mut buf = [0u8; PROBE_PAYLOAD_LEN];
    buf[0..4].copy_from_slice(&id.to_ne_bytes());
    buf[4..12].copy_from_slice(&tv_sec.to_ne_bytes());
    buf[12..20].copy_from_slice(&tv_usec.to_ne_bytes());
    buf
}

fn decode_probe_id(buf: &[u8]) -> Option<u32> {
    if buf.len() < PROBE_PAYLOAD_LEN {
        return None;
    }
    Some(u32::from_ne_bytes(buf[0..4].try_into().unwrap()))
}

/// Runs the probe loop for one endpoint. `S` is the datagram transport,
/// normally [`crate::socket::UdpDatagramSocket`].
pub struct ProbeChannel<S: DatagramSocket> {
    socket: S,
    peer_addr: SocketAddr,
    store: Arc<RttStore>,
    sent_at: Mutex<Vec<Instant>>,
    stop: Arc<AtomicBool>,
}

impl<S: DatagramSocket> ProbeChannel<S> {
    /// Binds `socket` is assumed already bound; sends a one-shot
    /// INIT_PROBE_CHANNEL message over `control` before entering the loop.
    pub fn start(
        socket: S,
        peer_addr: SocketAddr,
        store: Arc<RttStore>,
        control: &dyn ControlSink,
    ) -> std::io::Result<Self> {
        if let Err(err) = control.send(&ControlMessage::InitProbeChannel) {
            tracing::warn!(%err, "failed to send probe-channel init message");
        }
        Ok(Self {
            socket,
            peer_addr,
            store,
            sent_at: Mutex::new(vec![Instant::from_micros(0); STORE_SIZE]),
            stop: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    pub fn store(&self) -> Arc<RttStore> {
        self.store.clone()
    }

    /// Runs the send/receive loop until `stop` is set. Intended to be the
    /// body of a dedicated thread.
    pub fn run(&self, mut next_id: u32) {
        let period = Duration::from_micros(PING_PERIOD_US);
        let mut next_send_at = Instant::now();

        while !self.stop.load(Ordering::Relaxed) {
            let now = Instant::now();
            if now >= next_send_at {
                self.send_probe(next_id, now);
                next_id = next_id.wrapping_add(1);
                next_send_at = next_send_at + period;
            }

            let mut buf = [0u8; RECV_BUF_LEN];
            match self.socket.recv_from(&mut buf, RECV_TIMEOUT) {
                Ok(Some((n, _from))) => self.handle_echo(&buf[..n]),
                Ok(None) => {}
                Err(err) => tracing::warn!(%err, "probe channel recv error"),
            }
        }
    }

    fn send_probe(&self, id: u32, send_time: Instant) {
        self.sent_at.lock().expect("sent_at mutex poisoned")[id as usize % STORE_SIZE] = send_time;
        let payload = encode_probe(id, send_time);
        if let Err(err) = self.socket.send_to(&payload, self.peer_addr) {
            tracing::warn!(%err, id, "probe send failed");
        }
    }

    fn handle_echo(&self, buf: &[u8]) {
        let Some(id) = decode_probe_id(buf) else {
            return;
        };
        let sent_at = self.sent_at.lock().expect("sent_at mutex poisoned")[id as usize % STORE_SIZE];
        let rtt = Instant::now().saturating_sub(sent_at);
        // A zero measurement would be indistinguishable from a loss-zeroed
        // slot; the shortest representable loopback RTT is rounded up to 1us.
        let rtt_us = rtt.as_micros().max(1) as u32;
        self.store.record(id, rtt_us);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::socket::UdpDatagramSocket;
    use fathom_core::RttSignals;
    use std::thread;
    use std::time::Duration as StdDuration;

    struct NullSink;
    impl ControlSink for NullSink {
        fn send(&self, _msg: &ControlMessage) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn probe_and_echo_produce_an_rtt_sample() {
        let client_socket = UdpDatagramSocket::bind("127.0.0.1:0").unwrap();
        let server_socket = UdpDatagramSocket::bind("127.0.0.1:0").unwrap();
        let server_addr = server_socket.local_addr().unwrap();

        let store = Arc::new(RttStore::new());
        let channel = ProbeChannel::start(client_socket, server_addr, store.clone(), &NullSink).unwrap();
        let client_addr = channel.socket.local_addr().unwrap();

        let stop = channel.stop_handle();
        let worker = thread::spawn(move || channel.run(0));

        // Minimal echo responder: bounce one datagram back.
        let mut buf = [0u8; RECV_BUF_LEN];
        let (n, from) = server_socket
            .recv_from(&mut buf, StdDuration::from_millis(500))
            .unwrap()
            .expect("probe datagram should arrive");
        assert_eq!(from, client_addr);
        server_socket.send_to(&buf[..n], client_addr).unwrap();

        // Give the client loop a moment to process the echo, then stop it.
        thread::sleep(StdDuration::from_millis(50));
        stop.store(true, Ordering::Relaxed);
        worker.join().unwrap();

        assert_ne!(store.rt_prop(), fathom_core::snapshot::NO_SAMPLE);
    }

    #[test]
    fn probe_payload_round_trips_the_id() {
        let id = 0xABCD_1234u32;
        let payload = encode_probe(id, Instant::from_micros(123_456));
        assert_eq!(decode_probe_id(&payload), Some(id));
    }

    #[test]
    fn init_message_failure_does_not_abort_start() {
        struct FailingSink;
        impl ControlSink for FailingSink {
            fn send(&self, _msg: &ControlMessage) -> std::io::Result<()> {
                Err(std::io::Error::other("boom"))
            }
        }
        let socket = UdpDatagramSocket::bind("127.0.0.1:0").unwrap();
        let store = Arc::new(RttStore::new());
        let addr: SocketAddr = "127.0.0.1:1".parse().unwrap();
        let result = ProbeChannel::start(socket, addr, store, &FailingSink);
        assert!(result.is_ok());
    }
}
