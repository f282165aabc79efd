//! Optional CSV trace of per-frame estimator state, enabled by configuring
//! `trace-path`. One row per completed frame:
//! `rcvtime, pktsize, throughput, rtt, rtprop, bitrate`.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Mutex;

use fathom_core::time::Instant;

const HEADER: &str = "rcvtime, pktsize, throughput, rtt, rtprop, bitrate\n";

/// Appends rows to `bbr_graph.csv`-shaped trace file. `bitrate` is read from
/// a shared cell the adaptation state machine updates independently, so the
/// delivery-rate estimator never needs a hard dependency on `fathom-bbr`.
pub struct Trace {
    writer: Mutex<BufWriter<File>>,
    bitrate_kbps: std::sync::Arc<AtomicI32>,
}

impl Trace {
    pub fn open(path: impl AsRef<Path>, bitrate_kbps: std::sync::Arc<AtomicI32>) -> io::Result<Self> {
        let mut file = File::create(path)?;
        file.write_all(HEADER.as_bytes())?;
        Ok(Self {
            writer: Mutex::new(BufWriter::new(file)),
            bitrate_kbps,
        })
    }

    pub fn record_frame(&self, recv_time: Instant, size_bytes: u32, throughput: u32, rtt_us: u32, rtprop_us: u32) {
        let bitrate = self.bitrate_kbps.load(Ordering::Relaxed);
        let row = format!(
            "{}, {}, {}, {}, {}, {}\n",
            recv_time.as_micros(),
            size_bytes,
            throughput,
            rtt_us,
            rtprop_us,
            bitrate
        );
        let mut writer = self.writer.lock().expect("trace writer mutex poisoned");
        if let Err(err) = writer.write_all(row.as_bytes()) {
            tracing::warn!(%err, "failed to append trace row");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicI32;
    use std::sync::Arc;

    #[test]
    fn writes_header_and_rows() {
        let dir = std::env::temp_dir().join(format!("fathom-trace-test-{}", std::process::id()));
        let bitrate = Arc::new(AtomicI32::new(2500));
        let trace = Trace::open(&dir, bitrate).unwrap();
        trace.record_frame(Instant::from_micros(1_000), 512, 4096, 30_000, 29_000);

        let contents = std::fs::read_to_string(&dir).unwrap();
        let mut lines = contents.lines();
        assert_eq!(lines.next().unwrap(), HEADER.trim_end());
        assert_eq!(lines.next().unwrap(), "1000, 512, 4096, 30000, 29000, 2500");
        std::fs::remove_file(&dir).ok();
    }
}
