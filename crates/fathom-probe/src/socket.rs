//! Thin datagram-socket capability abstracting over the concrete transport,
//! so the probe loop and the peer echo responder are OS-independent and
//! substitutable in tests.

use std::io;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::time::Duration;

pub trait DatagramSocket: Send {
    fn send_to(&self, buf: &[u8], addr: SocketAddr) -> io::Result<usize>;

    /// Receive one datagram, waiting at most `timeout`. `Ok(None)` means the
    /// timeout elapsed with nothing received.
    fn recv_from(&self, buf: &mut [u8], timeout: Duration) -> io::Result<Option<(usize, SocketAddr)>>;

    fn local_addr(&self) -> io::Result<SocketAddr>;
}

pub struct UdpDatagramSocket {
    socket: UdpSocket,
}

impl UdpDatagramSocket {
    pub fn bind(addr: impl ToSocketAddrs) -> io::Result<Self> {
        let socket = UdpSocket::bind(addr)?;
        Ok(Self { socket })
    }
}

impl DatagramSocket for UdpDatagramSocket {
    fn send_to(&self, buf: &[u8], addr: SocketAddr) -> io::Result<usize> {
        self.socket.send_to(buf, addr)
    }

    fn recv_from(&self, buf: &mut [u8], timeout: Duration) -> io::Result<Option<(usize, SocketAddr)>> {
        self.socket.set_read_timeout(Some(timeout))?;
        match self.socket.recv_from(buf) {
            Ok((n, addr)) => Ok(Some((n, addr))),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock || e.kind() == io::ErrorKind::TimedOut => {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loopback_send_and_receive() {
        let a = UdpDatagramSocket::bind("127.0.0.1:0").unwrap();
        let b = UdpDatagramSocket::bind("127.0.0.1:0").unwrap();
        let b_addr = b.local_addr().unwrap();

        a.send_to(b"hello", b_addr).unwrap();

        let mut buf = [0u8; 16];
        let (n, _from) = b
            .recv_from(&mut buf, Duration::from_millis(500))
            .unwrap()
            .expect("datagram should arrive within timeout");
        assert_eq!(&buf[..n], b"hello");
    }

    #[test]
    fn recv_times_out_with_none() {
        let a = UdpDatagramSocket::bind("127.0.0.1:0").unwrap();
        let mut buf = [0u8; 16];
        let result = a.recv_from(&mut buf, Duration::from_millis(20)).unwrap();
        assert!(result.is_none());
    }
}
