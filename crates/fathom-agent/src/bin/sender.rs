//! Sender demo binary: drives the adaptation loop against a synthetic media
//! source and ships reconfigure commands to the peer over a TCP control
//! channel, matching the thread-per-component wiring described for this
//! controller (probe channel, rate estimator, control tick, all on their
//! own named threads).

use std::net::TcpStream;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use clap::Parser;

use fathom_bbr::{to_control_message, BbrEngine, PingScheduler, CYCLE_PERIOD_US};
use fathom_core::time::{Duration, Instant};
use fathom_probe::{ProbeChannel, RttStore, UdpDatagramSocket};
use fathom_rate::{DeliveryRateEstimator, Trace};
use fathom_wire::{ControlMessage, ControlSink};

/// Adaptive bitrate controller sender.
#[derive(Parser, Debug)]
#[command(name = "fathom-sender", about = "Estimates network conditions and drives the peer's target bitrate")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "fathom.toml")]
    config: PathBuf,
}

fn main() -> anyhow::Result<()> {
    fathom_core::logging::init();
    let cli = Cli::parse();
    let config = fathom_agent::load_config(&cli.config)?;

    tracing::info!(
        control_addr = %config.control_addr,
        probe_port = config.probe_channel_port,
        bitrate_initial = config.bitrate_initial_kbps,
        "fathom-sender starting"
    );

    let stop = Arc::new(AtomicBool::new(false));
    // Wakes the control-tick loop below the instant shutdown is requested,
    // rather than waiting out its poll interval.
    let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(1);
    {
        let stop = stop.clone();
        let shutdown_tx = shutdown_tx.clone();
        ctrlc::set_handler(move || {
            tracing::info!("received ctrl-c, shutting down");
            stop.store(true, Ordering::Relaxed);
            let _ = shutdown_tx.try_send(());
        })?;
    }

    let control_stream = TcpStream::connect(config.control_addr.as_str())?;
    let mut control_reader = control_stream.try_clone()?;
    let control_sink: Arc<Mutex<TcpStream>> = Arc::new(Mutex::new(control_stream));

    let peer_host = config.control_addr.rsplit_once(':').map_or("127.0.0.1", |(host, _)| host);
    let peer_probe_addr: std::net::SocketAddr = format!("{peer_host}:{}", config.probe_channel_port).parse()?;

    let probe_socket = UdpDatagramSocket::bind("0.0.0.0:0")?;
    let rtt_store = Arc::new(RttStore::new());
    let probe_channel = Arc::new(ProbeChannel::start(
        probe_socket,
        peer_probe_addr,
        rtt_store.clone(),
        control_sink.as_ref(),
    )?);
    let probe_stop = probe_channel.stop_handle();
    let probe_handle = {
        let probe_channel = probe_channel.clone();
        std::thread::Builder::new()
            .name("probe-channel".into())
            .spawn(move || probe_channel.run(0))?
    };

    let bitrate_cell = Arc::new(AtomicI32::new(config.bitrate_initial_kbps));
    let trace = config
        .trace_path
        .as_ref()
        .map(|path| Trace::open(path, bitrate_cell.clone()))
        .transpose()?;
    let estimator = Arc::new(DeliveryRateEstimator::with_trace(
        rtt_store,
        bitrate_cell.clone(),
        trace,
    ));

    let media_handle = {
        let estimator = estimator.clone();
        let bitrate_cell = bitrate_cell.clone();
        let stop = stop.clone();
        std::thread::Builder::new()
            .name("media-gen".into())
            .spawn(move || fathom_agent::synth::run_generator(&estimator, &bitrate_cell, &stop))?
    };

    let inbound_handle = {
        let stop = stop.clone();
        let shutdown_tx = shutdown_tx.clone();
        std::thread::Builder::new().name("control-inbound".into()).spawn(move || loop {
            match fathom_wire::read_frame(&mut control_reader) {
                Ok(ControlMessage::Shutdown) => {
                    tracing::info!("peer requested shutdown");
                    stop.store(true, Ordering::Relaxed);
                    let _ = shutdown_tx.try_send(());
                    return;
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::info!(%err, "control channel closed");
                    stop.store(true, Ordering::Relaxed);
                    let _ = shutdown_tx.try_send(());
                    return;
                }
            }
        })?
    };

    let mut engine = BbrEngine::new(config.bitrate_initial_kbps);
    let mut ping_sched = PingScheduler::new(Instant::now());
    let cycle_period = Duration::from_micros(CYCLE_PERIOD_US);
    let mut next_tick = Instant::now() + cycle_period;

    while !stop.load(Ordering::Relaxed) {
        let now = Instant::now();
        if now >= next_tick {
            let snapshot = estimator.snapshot();
            let outcome = engine.step(snapshot, now);
            bitrate_cell.store(outcome.bitrate_kbps, Ordering::Relaxed);
            if let Some(msg) = to_control_message(&outcome) {
                match control_sink.send(&msg) {
                    Ok(()) => tracing::info!(
                        stage = ?outcome.stage,
                        gain = outcome.gain as f64,
                        bitrate_kbps = outcome.bitrate_kbps,
                        "reconfigure emitted"
                    ),
                    Err(err) => tracing::warn!(%err, "failed to send reconfigure"),
                }
            }
            next_tick = next_tick + cycle_period;
        }
        if let Some(ping) = ping_sched.maybe_emit(now) {
            if let Err(err) = control_sink.send(&ping) {
                tracing::warn!(%err, "failed to send ping");
            }
        }
        match shutdown_rx.recv_timeout(StdDuration::from_millis(5)) {
            Ok(()) | Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {}
        }
    }

    let _ = control_sink.send(&ControlMessage::Shutdown);
    probe_stop.store(true, Ordering::Relaxed);
    probe_handle.join().ok();
    media_handle.join().ok();
    drop(inbound_handle); // best-effort; the peer closing its socket unblocks it

    tracing::info!("fathom-sender stopped");
    Ok(())
}
