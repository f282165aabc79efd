//! Property-based round-trip tests for the SYSTEM control message codec,
//! covering the full documented range of every field rather than a handful
//! of fixed examples.

use fathom_wire::{ControlMessage, NetReport, Ping, Reconfigure, Subtype};
use proptest::prelude::*;

proptest! {
    #[test]
    fn net_report_roundtrips_across_the_full_u32_range(
        duration in any::<u32>(),
        framecount in any::<u32>(),
        pktcount in any::<u32>(),
        pktloss in any::<u32>(),
        bytecount in any::<u32>(),
        capacity in any::<u32>(),
    ) {
        let msg = ControlMessage::NetReport(NetReport {
            duration, framecount, pktcount, pktloss, bytecount, capacity,
        });
        let encoded = msg.encode();
        prop_assert_eq!(encoded.len(), Subtype::NetReport.frame_len());
        let decoded = ControlMessage::decode(&encoded).unwrap();
        prop_assert_eq!(decoded, msg);
    }

    #[test]
    fn reconfigure_roundtrips_across_the_full_i32_range(
        reconf_id in any::<i32>(),
        crf in any::<i32>(),
        framerate in any::<i32>(),
        bitrate in any::<i32>(),
        width in any::<i32>(),
        height in any::<i32>(),
    ) {
        let msg = ControlMessage::Reconfigure(Reconfigure {
            reconf_id, crf, framerate, bitrate, width, height,
        });
        let encoded = msg.encode();
        prop_assert_eq!(encoded.len(), Subtype::Reconfigure.frame_len());
        let decoded = ControlMessage::decode(&encoded).unwrap();
        prop_assert_eq!(decoded, msg);
    }

    #[test]
    fn ping_roundtrips_across_the_full_range(
        ping_id in any::<u32>(),
        tv_sec in any::<i32>(),
        tv_usec in any::<i32>(),
    ) {
        let msg = ControlMessage::Ping(Ping { ping_id, tv_sec, tv_usec });
        let encoded = msg.encode();
        prop_assert_eq!(encoded.len(), Subtype::Ping.frame_len());
        let decoded = ControlMessage::decode(&encoded).unwrap();
        prop_assert_eq!(decoded, msg);
    }

    #[test]
    fn decode_never_panics_on_arbitrary_bytes(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
        let _ = ControlMessage::decode(&bytes);
    }

    #[test]
    fn any_frame_length_reported_is_within_the_wire_maximum(
        reconf_id in any::<i32>(), crf in any::<i32>(), framerate in any::<i32>(),
        bitrate in any::<i32>(), width in any::<i32>(), height in any::<i32>(),
    ) {
        let msg = ControlMessage::Reconfigure(Reconfigure {
            reconf_id, crf, framerate, bitrate, width, height,
        });
        prop_assert!(msg.encode().len() <= fathom_wire::message::MAX_FRAME_LEN);
    }
}
