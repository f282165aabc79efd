//! Length-delimited framing over any `Read + Write` byte stream, so the
//! codec in [`crate::message`] can be exercised independently of whatever
//! concrete transport carries it (a TCP stream in `fathom-agent`).

use std::io::{self, Read, Write};

use crate::message::{CodecError, ControlMessage, HEADER_LEN, MAX_FRAME_LEN};

#[derive(Debug, thiserror::Error)]
pub enum FrameIoError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
    #[error("frame size {0} exceeds maximum {MAX_FRAME_LEN}")]
    TooLarge(usize),
}

/// Read one length-prefixed SYSTEM frame from `reader`, blocking until the
/// whole frame has arrived (or the stream errors/closes).
pub fn read_frame<R: Read>(reader: &mut R) -> Result<ControlMessage, FrameIoError> {
    let mut header = [0u8; HEADER_LEN];
    reader.read_exact(&mut header)?;
    let msgsize = u16::from_be_bytes([header[0], header[1]]) as usize;
    if msgsize > MAX_FRAME_LEN {
        return Err(FrameIoError::TooLarge(msgsize));
    }
    if msgsize < HEADER_LEN {
        // Let the codec produce the precise "truncated" error for a
        // consistent error surface regardless of where the cutoff happens.
        return Ok(ControlMessage::decode(&header)?);
    }
    let mut frame = Vec::with_capacity(msgsize);
    frame.extend_from_slice(&header);
    frame.resize(msgsize, 0);
    reader.read_exact(&mut frame[HEADER_LEN..])?;
    Ok(ControlMessage::decode(&frame)?)
}

/// Write one SYSTEM frame to `writer`.
pub fn write_frame<W: Write>(writer: &mut W, msg: &ControlMessage) -> Result<(), FrameIoError> {
    let encoded = msg.encode();
    writer.write_all(&encoded)?;
    Ok(())
}
