//! SYSTEM control message frame layout, encode and decode.
//!
//! Frame header (4 bytes, big-endian): `msgsize: u16`, `msgtype: u8`
//! (always [`MSGTYPE_SYSTEM`]), `subtype: u8`. `msgsize` counts the whole
//! frame including the header and must equal the subtype's fixed length —
//! there is no variable-length payload in this protocol.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;

pub const MSGTYPE_SYSTEM: u8 = 0xFE;
pub const HEADER_LEN: usize = 4;
pub const MAX_FRAME_LEN: usize = 128;
pub const SUBTYPE_MAX: u8 = 5;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("frame truncated: need {need} bytes, have {have}")]
    Truncated { need: usize, have: usize },
    #[error("wrong msgtype {0:#04x}, expected SYSTEM")]
    WrongMsgType(u8),
    #[error("unknown subtype {0}")]
    UnknownSubtype(u8),
    #[error("bad msgsize for subtype: expected {expected}, got {actual}")]
    BadSize { expected: usize, actual: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Subtype {
    Null = 0,
    Shutdown = 1,
    NetReport = 2,
    Reconfigure = 3,
    InitProbeChannel = 4,
    Ping = 5,
}

impl Subtype {
    pub const fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(Subtype::Null),
            1 => Some(Subtype::Shutdown),
            2 => Some(Subtype::NetReport),
            3 => Some(Subtype::Reconfigure),
            4 => Some(Subtype::InitProbeChannel),
            5 => Some(Subtype::Ping),
            _ => None,
        }
    }

    /// Total frame length for this subtype, including the 4-byte header.
    pub const fn frame_len(self) -> usize {
        match self {
            Subtype::Null | Subtype::Shutdown | Subtype::InitProbeChannel => HEADER_LEN,
            Subtype::NetReport | Subtype::Reconfigure => HEADER_LEN + 24,
            Subtype::Ping => HEADER_LEN + 12,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NetReport {
    pub duration: u32,
    pub framecount: u32,
    pub pktcount: u32,
    pub pktloss: u32,
    pub bytecount: u32,
    pub capacity: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Reconfigure {
    pub reconf_id: i32,
    pub crf: i32,
    pub framerate: i32,
    pub bitrate: i32,
    pub width: i32,
    pub height: i32,
}

impl Reconfigure {
    /// A reconfigure carrying only a new bitrate; every other field left at
    /// 0, which the peer ignores when `bitrate` is non-zero (per the
    /// external interface contract).
    pub fn bitrate_only(bitrate_kbps: i32) -> Self {
        Reconfigure {
            bitrate: bitrate_kbps,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Ping {
    pub ping_id: u32,
    pub tv_sec: i32,
    pub tv_usec: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMessage {
    Null,
    Shutdown,
    NetReport(NetReport),
    Reconfigure(Reconfigure),
    InitProbeChannel,
    Ping(Ping),
}

impl ControlMessage {
    pub const fn subtype(&self) -> Subtype {
        match self {
            ControlMessage::Null => Subtype::Null,
            ControlMessage::Shutdown => Subtype::Shutdown,
            ControlMessage::NetReport(_) => Subtype::NetReport,
            ControlMessage::Reconfigure(_) => Subtype::Reconfigure,
            ControlMessage::InitProbeChannel => Subtype::InitProbeChannel,
            ControlMessage::Ping(_) => Subtype::Ping,
        }
    }

    pub fn encode(&self) -> Bytes {
        let subtype = self.subtype();
        let len = subtype.frame_len();
        let mut buf = BytesMut::with_capacity(len);
        buf.put_u16(len as u16);
        buf.put_u8(MSGTYPE_SYSTEM);
        buf.put_u8(subtype as u8);
        match self {
            ControlMessage::Null | ControlMessage::Shutdown | ControlMessage::InitProbeChannel => {}
            ControlMessage::NetReport(r) => {
                buf.put_u32(r.duration);
                buf.put_u32(r.framecount);
                buf.put_u32(r.pktcount);
                buf.put_u32(r.pktloss);
                buf.put_u32(r.bytecount);
                buf.put_u32(r.capacity);
            }
            ControlMessage::Reconfigure(r) => {
                buf.put_i32(r.reconf_id);
                buf.put_i32(r.crf);
                buf.put_i32(r.framerate);
                buf.put_i32(r.bitrate);
                buf.put_i32(r.width);
                buf.put_i32(r.height);
            }
            ControlMessage::Ping(p) => {
                buf.put_u32(p.ping_id);
                buf.put_i32(p.tv_sec);
                buf.put_i32(p.tv_usec);
            }
        }
        debug_assert_eq!(buf.len(), len);
        buf.freeze()
    }

    pub fn decode(buf: &[u8]) -> Result<ControlMessage, CodecError> {
        if buf.len() < HEADER_LEN {
            return Err(CodecError::Truncated {
                need: HEADER_LEN,
                have: buf.len(),
            });
        }
        let mut cur = buf;
        let msgsize = cur.get_u16() as usize;
        let msgtype = cur.get_u8();
        let subtype_byte = cur.get_u8();

        if msgtype != MSGTYPE_SYSTEM {
            return Err(CodecError::WrongMsgType(msgtype));
        }
        let subtype =
            Subtype::from_byte(subtype_byte).ok_or(CodecError::UnknownSubtype(subtype_byte))?;
        if msgsize != subtype.frame_len() {
            return Err(CodecError::BadSize {
                expected: subtype.frame_len(),
                actual: msgsize,
            });
        }
        if buf.len() < subtype.frame_len() {
            return Err(CodecError::Truncated {
                need: subtype.frame_len(),
                have: buf.len(),
            });
        }

        Ok(match subtype {
            Subtype::Null => ControlMessage::Null,
            Subtype::Shutdown => ControlMessage::Shutdown,
            Subtype::InitProbeChannel => ControlMessage::InitProbeChannel,
            Subtype::NetReport => ControlMessage::NetReport(NetReport {
                duration: cur.get_u32(),
                framecount: cur.get_u32(),
                pktcount: cur.get_u32(),
                pktloss: cur.get_u32(),
                bytecount: cur.get_u32(),
                capacity: cur.get_u32(),
            }),
            Subtype::Reconfigure => ControlMessage::Reconfigure(Reconfigure {
                reconf_id: cur.get_i32(),
                crf: cur.get_i32(),
                framerate: cur.get_i32(),
                bitrate: cur.get_i32(),
                width: cur.get_i32(),
                height: cur.get_i32(),
            }),
            Subtype::Ping => ControlMessage::Ping(Ping {
                ping_id: cur.get_u32(),
                tv_sec: cur.get_i32(),
                tv_usec: cur.get_i32(),
            }),
        })
    }
}
