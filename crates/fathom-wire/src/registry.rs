//! Fixed-size handler dispatch table for inbound SYSTEM frames.
//!
//! Registration is one-time at startup; the registry is read without
//! contention thereafter (the [`Mutex`] exists only to satisfy `Sync`, not
//! because concurrent mutation is supported).

use std::sync::Mutex;

use crate::message::{ControlMessage, Subtype, MSGTYPE_SYSTEM, SUBTYPE_MAX};

pub type Handler = Box<dyn Fn(ControlMessage) + Send + Sync>;

const SLOT_COUNT: usize = SUBTYPE_MAX as usize + 1;

pub struct HandlerRegistry {
    handlers: Mutex<[Option<Handler>; SLOT_COUNT]>,
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            handlers: Mutex::new(std::array::from_fn(|_| None)),
        }
    }

    /// Install a handler for `subtype`, returning the previous one (if any)
    /// so callers can chain or restore it later.
    pub fn set_handler(&self, subtype: Subtype, handler: Handler) -> Option<Handler> {
        let mut slots = self.handlers.lock().expect("registry mutex poisoned");
        slots[subtype as usize].replace(handler)
    }

    /// Decode and dispatch a raw frame. Returns `false` only when `buf` is
    /// not a SYSTEM frame at all (too short, or a different `msgtype`) —
    /// such buffers are not this registry's concern and the caller should
    /// try another demultiplexer. Returns `true` whenever the frame was
    /// recognized as SYSTEM, whether or not it was ultimately handled:
    /// unknown subtypes and malformed payloads are logged and consumed.
    pub fn handle(&self, buf: &[u8]) -> bool {
        if buf.len() < crate::message::HEADER_LEN {
            return false;
        }
        if buf[2] != MSGTYPE_SYSTEM {
            return false;
        }
        let subtype_byte = buf[3];
        if subtype_byte > SUBTYPE_MAX {
            tracing::error!(subtype = subtype_byte, "system-message: unknown subtype");
            return true;
        }
        let subtype = Subtype::from_byte(subtype_byte).expect("validated above");

        let msg = match ControlMessage::decode(buf) {
            Ok(msg) => msg,
            Err(err) => {
                tracing::error!(%err, "system-message: malformed frame, dropping");
                return true;
            }
        };

        let slots = self.handlers.lock().expect("registry mutex poisoned");
        if let Some(handler) = &slots[subtype as usize] {
            handler(msg);
        }
        true
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{ControlMessage, Ping, Reconfigure};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn dispatches_to_registered_handler() {
        let registry = HandlerRegistry::new();
        let seen = Arc::new(AtomicU32::new(0));
        let seen2 = seen.clone();
        registry.set_handler(
            Subtype::Ping,
            Box::new(move |msg| {
                if let ControlMessage::Ping(p) = msg {
                    seen2.store(p.ping_id, Ordering::SeqCst);
                }
            }),
        );

        let frame = ControlMessage::Ping(Ping {
            ping_id: 7,
            tv_sec: 1,
            tv_usec: 2,
        })
        .encode();
        assert!(registry.handle(&frame));
        assert_eq!(seen.load(Ordering::SeqCst), 7);
    }

    #[test]
    fn set_handler_returns_previous() {
        let registry = HandlerRegistry::new();
        let first = registry.set_handler(Subtype::Reconfigure, Box::new(|_| {}));
        assert!(first.is_none());
        let second = registry.set_handler(Subtype::Reconfigure, Box::new(|_| {}));
        assert!(second.is_some());
    }

    #[test]
    fn unregistered_subtype_is_silently_consumed() {
        let registry = HandlerRegistry::new();
        let frame = ControlMessage::Reconfigure(Reconfigure::bitrate_only(1234)).encode();
        assert!(registry.handle(&frame));
    }

    #[test]
    fn non_system_msgtype_is_not_handled() {
        let registry = HandlerRegistry::new();
        let mut frame = ControlMessage::Null.encode().to_vec();
        frame[2] = 0x01;
        assert!(!registry.handle(&frame));
    }

    #[test]
    fn too_short_buffer_is_not_handled() {
        let registry = HandlerRegistry::new();
        assert!(!registry.handle(&[0u8; 2]));
    }

    #[test]
    fn unknown_subtype_is_consumed_not_handled() {
        let registry = HandlerRegistry::new();
        let mut frame = ControlMessage::Null.encode().to_vec();
        frame[3] = 200;
        assert!(registry.handle(&frame));
    }

    #[test]
    fn malformed_size_is_consumed_not_torn_down() {
        let registry = HandlerRegistry::new();
        let mut frame = ControlMessage::Ping(Ping::default()).encode().to_vec();
        frame[1] = 4; // wrong msgsize for Ping
        assert!(registry.handle(&frame));
    }
}
