//! Peer-side counterpart of [`crate::channel::ProbeChannel`]: echoes every
//! probe datagram back to its sender, unmodified.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::socket::DatagramSocket;

const RECV_BUF_LEN: usize = 512;
const RECV_TIMEOUT: Duration = Duration::from_millis(50);

/// Runs until `stop` is set. Intended to be the body of a dedicated thread
/// on the peer/receiver side of the session.
pub fn run_echo_responder<S: DatagramSocket>(socket: &S, stop: &AtomicBool) {
    let mut buf = [0u8; RECV_BUF_LEN];
    while !stop.load(Ordering::Relaxed) {
        match socket.recv_from(&mut buf, RECV_TIMEOUT) {
            Ok(Some((n, from))) => {
                if let Err(err) = socket.send_to(&buf[..n], from) {
                    tracing::warn!(%err, "probe echo send failed");
                }
            }
            Ok(None) => {}
            Err(err) => tracing::warn!(%err, "probe echo recv error"),
        }
    }
}
