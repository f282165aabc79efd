//! Peer/receiver demo binary: answers RTT probes and, for each connected
//! sender, demultiplexes inbound control frames through a
//! [`fathom_wire::HandlerRegistry`], applying (logging) reconfigure
//! commands in lieu of driving a real encoder.

use std::io::Read;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use clap::Parser;

use fathom_probe::{run_echo_responder, UdpDatagramSocket};
use fathom_wire::message::{ControlMessage, Reconfigure, HEADER_LEN, MAX_FRAME_LEN};
use fathom_wire::{HandlerRegistry, Subtype};

/// Adaptive bitrate controller peer: answers probes, applies reconfigure
/// commands sent by the sender.
#[derive(Parser, Debug)]
#[command(name = "fathom-peer", about = "Answers RTT probes and applies the sender's reconfigure commands")]
struct Cli {
    /// Address to bind the control-channel TCP listener on.
    #[arg(long, default_value = "0.0.0.0:7878")]
    control_bind: SocketAddr,

    /// Address to bind the RTT probe-channel UDP socket on.
    #[arg(long, default_value = "0.0.0.0:8556")]
    probe_bind: SocketAddr,
}

fn main() -> anyhow::Result<()> {
    fathom_core::logging::init();
    let cli = Cli::parse();

    tracing::info!(control_bind = %cli.control_bind, probe_bind = %cli.probe_bind, "fathom-peer starting");

    let stop = Arc::new(AtomicBool::new(false));
    // Wakes the accept loop below the instant shutdown is requested, rather
    // than waiting out its poll interval.
    let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(1);
    {
        let stop = stop.clone();
        ctrlc::set_handler(move || {
            tracing::info!("received ctrl-c, shutting down");
            stop.store(true, Ordering::Relaxed);
            let _ = shutdown_tx.try_send(());
        })?;
    }

    let probe_socket = UdpDatagramSocket::bind(cli.probe_bind)?;
    let probe_stop = stop.clone();
    let probe_handle = std::thread::Builder::new()
        .name("probe-echo".into())
        .spawn(move || run_echo_responder(&probe_socket, &probe_stop))?;

    let registry = Arc::new(build_registry());
    let listener = TcpListener::bind(cli.control_bind)?;
    listener.set_nonblocking(true)?;

    let mut inbound_handles = Vec::new();
    while !stop.load(Ordering::Relaxed) {
        match listener.accept() {
            Ok((stream, peer)) => {
                tracing::info!(%peer, "control channel connected");
                let registry = registry.clone();
                let stop = stop.clone();
                inbound_handles.push(
                    std::thread::Builder::new()
                        .name("control-inbound".into())
                        .spawn(move || inbound_loop(stream, &registry, &stop))?,
                );
            }
            Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                match shutdown_rx.recv_timeout(StdDuration::from_millis(50)) {
                    Ok(()) | Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
                    Err(crossbeam_channel::RecvTimeoutError::Timeout) => {}
                }
            }
            Err(err) => {
                tracing::warn!(%err, "control listener accept failed");
                match shutdown_rx.recv_timeout(StdDuration::from_millis(50)) {
                    Ok(()) | Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
                    Err(crossbeam_channel::RecvTimeoutError::Timeout) => {}
                }
            }
        }
    }

    for handle in inbound_handles {
        handle.join().ok();
    }
    probe_handle.join().ok();
    tracing::info!("fathom-peer stopped");
    Ok(())
}

fn build_registry() -> HandlerRegistry {
    let registry = HandlerRegistry::new();
    registry.set_handler(
        Subtype::Reconfigure,
        Box::new(|msg| {
            if let ControlMessage::Reconfigure(Reconfigure { bitrate, .. }) = msg {
                tracing::info!(bitrate_kbps = bitrate, "applying reconfigure");
            }
        }),
    );
    registry.set_handler(
        Subtype::Ping,
        Box::new(|msg| {
            if let ControlMessage::Ping(p) = msg {
                tracing::debug!(ping_id = p.ping_id, "ping received");
            }
        }),
    );
    registry.set_handler(
        Subtype::InitProbeChannel,
        Box::new(|_| tracing::info!("probe channel initialized by sender")),
    );
    registry
}

/// Reassembles raw SYSTEM frames directly off `stream` (same 4-byte
/// length-prefix framing as [`fathom_wire::stream::read_frame`], kept
/// separate so the assembled buffer can be handed to `registry` unparsed)
/// and dispatches each through `registry`.
fn inbound_loop(mut stream: TcpStream, registry: &HandlerRegistry, stop: &AtomicBool) {
    let mut header = [0u8; HEADER_LEN];
    while !stop.load(Ordering::Relaxed) {
        if let Err(err) = stream.read_exact(&mut header) {
            if err.kind() != std::io::ErrorKind::UnexpectedEof {
                tracing::info!(%err, "control channel closed");
            }
            return;
        }
        let msgsize = u16::from_be_bytes([header[0], header[1]]) as usize;
        if !(HEADER_LEN..=MAX_FRAME_LEN).contains(&msgsize) {
            tracing::error!(msgsize, "control channel: invalid frame size, dropping connection");
            return;
        }
        let mut frame = vec![0u8; msgsize];
        frame[..HEADER_LEN].copy_from_slice(&header);
        if let Err(err) = stream.read_exact(&mut frame[HEADER_LEN..]) {
            tracing::info!(%err, "control channel closed mid-frame");
            return;
        }
        let is_shutdown = frame.get(3) == Some(&(Subtype::Shutdown as u8));
        registry.handle(&frame);
        if is_shutdown {
            tracing::info!("peer received shutdown, closing connection");
            return;
        }
    }
}
