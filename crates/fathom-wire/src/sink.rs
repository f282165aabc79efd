//! Outbound side of the control channel: anything that can accept an
//! encoded [`ControlMessage`]. Kept separate from [`crate::stream`] so
//! callers can depend on the narrow trait without naming a concrete
//! transport type.

use std::io;
use std::sync::Mutex;

use crate::message::ControlMessage;
use crate::stream::{write_frame, FrameIoError};

pub trait ControlSink: Send + Sync {
    fn send(&self, msg: &ControlMessage) -> io::Result<()>;
}

/// Any mutex-guarded writer is a valid [`ControlSink`]: frames are
/// serialized on the outbound channel in issue order by virtue of holding
/// the lock for the duration of the write.
impl<W: io::Write + Send> ControlSink for Mutex<W> {
    fn send(&self, msg: &ControlMessage) -> io::Result<()> {
        let mut writer = self.lock().expect("control sink mutex poisoned");
        write_frame(&mut *writer, msg).map_err(|err| match err {
            FrameIoError::Io(io_err) => io_err,
            other => io::Error::other(other.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Reconfigure;

    #[test]
    fn mutex_writer_serializes_a_frame() {
        let sink: Mutex<Vec<u8>> = Mutex::new(Vec::new());
        sink.send(&ControlMessage::Reconfigure(Reconfigure::bitrate_only(1500)))
            .unwrap();
        let bytes = sink.lock().unwrap().clone();
        assert_eq!(bytes.len(), crate::message::Subtype::Reconfigure.frame_len());
    }
}
