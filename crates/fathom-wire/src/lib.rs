//! Control message codec: frame layout, encode/decode, handler dispatch,
//! and a length-delimited stream carrier for the SYSTEM protocol used
//! between the adaptive bitrate controller and its peer.

pub mod message;
pub mod registry;
pub mod sink;
pub mod stream;

pub use message::{CodecError, ControlMessage, NetReport, Ping, Reconfigure, Subtype, MSGTYPE_SYSTEM};
pub use registry::{Handler, HandlerRegistry};
pub use sink::ControlSink;
pub use stream::{read_frame, write_frame, FrameIoError};
