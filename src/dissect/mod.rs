//! Zero-copy protocol views over captured frames
//!
//! Each layer is parsed from the payload view of the layer below and keeps a reference to it:
//!
//! ```text
//! EthernetFrame<'a> -> Ipv4Packet<'a> -> UdpDatagram<'a> | IcmpMessage<'a>
//! ```
//!
//! The [Dissector] runs that chain for one frame at a time, reports every layer to a
//! [DissectionHandler] and feeds IPv4 fragments to an [Ipv4Reassembler].

/// A protocol number enum with a catch-all `Unknown` variant
macro_rules! protocol_codes {
    (
        $(#[$enum_docs:meta])*
        $enum_name:ident: $repr:ty {
            $(
                $(#[$docs:meta])*
                $name:ident = $value:literal
            ),*
        }
    ) => {
        $(#[$enum_docs])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $enum_name {
            $(
                $(#[$docs])*
                $name,
            )*
            Unknown($repr),
        }
        impl $enum_name {
            /// The number as it appears on the wire
            pub fn code(self) -> $repr {
                match self {
                    $(
                        $enum_name::$name => $value,
                    )*
                    $enum_name::Unknown(value) => value,
                }
            }
        }
        impl From<$repr> for $enum_name {
            fn from(value: $repr) -> Self {
                match value {
                    $(
                        $value => $enum_name::$name,
                    )*
                    other => $enum_name::Unknown(other),
                }
            }
        }
    };
}

pub mod ethernet;
pub mod fragment;
pub mod icmp;
pub mod ipv4;
pub mod udp;

pub use ethernet::{EtherType, EthernetFrame, FrameOrigin, LlcHeader, SnapHeader, VlanTag};
pub use fragment::{Fragment, FragmentKey, Ipv4Reassembler, ReassembledDatagram};
pub use icmp::IcmpMessage;
pub use ipv4::{IpProtocol, Ipv4Flags, Ipv4Packet};
pub use udp::UdpDatagram;

use crate::{
    captured_packet::CapturedPacket, error::FormatError, link_type::LinkType,
    pcap_ng::blocks::Block, utils::field_at,
};

/// Receives each layer as the [Dissector] produces it
///
/// Every method defaults to doing nothing.
pub trait DissectionHandler {
    fn ethernet_frame_dissected(&self, _frame: &EthernetFrame<'_>) {}
    fn ipv4_packet_dissected(&self, _packet: &Ipv4Packet<'_>) {}
    fn icmp_message_dissected(&self, _message: &IcmpMessage<'_>) {}
    fn udp_datagram_dissected(&self, _datagram: &UdpDatagram<'_>) {}
    fn ipv4_reassembled(&self, _datagram: &ReassembledDatagram) {}
}

/// Runs the dissection chain over frames, one at a time
///
/// Transport headers are only looked for in packets at fragment offset 0. With reassembly
/// enabled, fragments are collected and a completed UDP datagram is dissected again from
/// the reassembled payload.
#[derive(Debug, Default)]
pub struct Dissector {
    reassembler: Option<Ipv4Reassembler>,
}

impl Dissector {
    /// Dissects without collecting fragments
    pub fn new() -> Self {
        Self { reassembler: None }
    }
    pub fn with_reassembly(max_pending_sets: usize) -> Self {
        Self {
            reassembler: Some(Ipv4Reassembler::new(max_pending_sets)),
        }
    }
    pub fn reassembler(&self) -> Option<&Ipv4Reassembler> {
        self.reassembler.as_ref()
    }

    /// Dissects the frame in a packet-bearing block
    ///
    /// The caller is responsible for checking the interface is Ethernet.
    pub fn dissect_block<H: DissectionHandler + ?Sized>(
        &mut self,
        block: &Block,
        handler: &H,
    ) -> Result<(), FormatError> {
        let frame = EthernetFrame::from_block(block)?;
        self.dissect_frame(&frame, handler)
    }
    /// Dissects a captured packet, packets with another link type are skipped
    pub fn dissect_packet<H: DissectionHandler + ?Sized>(
        &mut self,
        packet: &CapturedPacket,
        handler: &H,
    ) -> Result<(), FormatError> {
        if packet.link_type() != LinkType::Ethernet {
            log::trace!(
                "Not dissecting {:?} packet at offset {}",
                packet.link_type(),
                packet.stream_offset()
            );
            return Ok(());
        }
        let frame = EthernetFrame::from_packet(packet)?;
        self.dissect_frame(&frame, handler)
    }
    pub fn dissect_frame<H: DissectionHandler + ?Sized>(
        &mut self,
        frame: &EthernetFrame<'_>,
        handler: &H,
    ) -> Result<(), FormatError> {
        handler.ethernet_frame_dissected(frame);
        if frame.ether_type() != Some(EtherType::Ipv4) {
            return Ok(());
        }
        let packet = Ipv4Packet::from_frame(frame)?;
        handler.ipv4_packet_dissected(&packet);

        if packet.fragment_offset() == 0 {
            dissect_transport(&packet, handler)?;
        }
        if let Some(reassembler) = &mut self.reassembler
            && let Some(key) = reassembler.on_fragment(&packet)
            && reassembler.try_reassemble_key(&key)
            && let Some(datagram) = reassembler.take_payload(&key)
        {
            handler.ipv4_reassembled(&datagram);
            if datagram.protocol == IpProtocol::Udp {
                let udp = UdpDatagram::parse(&datagram.payload)?;
                handler.udp_datagram_dissected(&udp);
            }
        }
        Ok(())
    }
}

fn dissect_transport<H: DissectionHandler + ?Sized>(
    packet: &Ipv4Packet<'_>,
    handler: &H,
) -> Result<(), FormatError> {
    match packet.protocol() {
        IpProtocol::Icmp => handler.icmp_message_dissected(&IcmpMessage::from_packet(packet)?),
        IpProtocol::Udp => handler.udp_datagram_dissected(&UdpDatagram::from_packet(packet)?),
        _ => {}
    }
    Ok(())
}

/// Takes `SIZE` bytes at `offset` and moves the offset past them
#[inline]
pub(crate) fn forward<const SIZE: usize>(
    bytes: &[u8],
    offset: &mut usize,
    name: &'static str,
) -> Result<[u8; SIZE], FormatError> {
    let value = field_at::<SIZE>(bytes, *offset, name)?;
    *offset += SIZE;
    Ok(value)
}
/// Network order u16, see [forward]
#[inline]
pub(crate) fn read_u16_be(
    bytes: &[u8],
    offset: &mut usize,
    name: &'static str,
) -> Result<u16, FormatError> {
    forward::<2>(bytes, offset, name).map(u16::from_be_bytes)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::{
        test_helpers::{icmp_echo_frame, ipv4_fragment, udp_frame},
        timestamp::CaptureTimestamp,
    };

    /// Writes down which layers were seen
    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }
    impl Recorder {
        fn push(&self, event: String) {
            if let Ok(mut events) = self.events.lock() {
                events.push(event);
            }
        }
        fn events(&self) -> Vec<String> {
            self.events.lock().map(|e| e.clone()).unwrap_or_default()
        }
    }
    impl DissectionHandler for Recorder {
        fn ethernet_frame_dissected(&self, frame: &EthernetFrame<'_>) {
            self.push(format!("ethernet {}", frame.bytes().len()));
        }
        fn ipv4_packet_dissected(&self, packet: &Ipv4Packet<'_>) {
            self.push(format!("ipv4 {}", packet.fragment_offset()));
        }
        fn icmp_message_dissected(&self, message: &IcmpMessage<'_>) {
            self.push(format!("icmp {}", message.icmp_type()));
        }
        fn udp_datagram_dissected(&self, datagram: &UdpDatagram<'_>) {
            let parent = if datagram.packet().is_some() { "framed" } else { "detached" };
            self.push(format!("udp {} {parent}", datagram.payload().len()));
        }
        fn ipv4_reassembled(&self, datagram: &ReassembledDatagram) {
            self.push(format!("reassembled {}", datagram.payload.len()));
        }
    }

    #[test]
    fn udp_and_icmp_layers() -> anyhow::Result<()> {
        let recorder = Recorder::default();
        let mut dissector = Dissector::new();
        let udp = udp_frame(b"abc");
        let icmp = icmp_echo_frame(b"ping");
        dissector.dissect_frame(&EthernetFrame::parse(&udp)?, &recorder)?;
        dissector.dissect_frame(&EthernetFrame::parse(&icmp)?, &recorder)?;
        assert_eq!(
            recorder.events(),
            vec![
                format!("ethernet {}", udp.len()),
                "ipv4 0".to_string(),
                "udp 3 framed".to_string(),
                format!("ethernet {}", icmp.len()),
                "ipv4 0".to_string(),
                "icmp 8".to_string(),
            ]
        );
        Ok(())
    }

    #[test]
    fn fragmented_udp_is_reassembled() -> anyhow::Result<()> {
        // UDP header claiming 24 bytes, split after 16 bytes
        let mut datagram = vec![0x13, 0x88, 0x13, 0x89, 0, 24, 0, 0];
        datagram.extend_from_slice(&[0xAB; 16]);
        let first = ipv4_fragment(77, 0, true, &datagram[..16]);
        let second = ipv4_fragment(77, 2, false, &datagram[16..]);

        let recorder = Recorder::default();
        let mut dissector = Dissector::with_reassembly(16);
        dissector.dissect_frame(&EthernetFrame::parse(&first)?, &recorder)?;
        dissector.dissect_frame(&EthernetFrame::parse(&second)?, &recorder)?;
        assert_eq!(
            recorder.events(),
            vec![
                format!("ethernet {}", first.len()),
                "ipv4 0".to_string(),
                "udp 8 framed".to_string(),
                format!("ethernet {}", second.len()),
                "ipv4 16".to_string(),
                "reassembled 24".to_string(),
                "udp 16 detached".to_string(),
            ]
        );
        assert_eq!(dissector.reassembler().map(Ipv4Reassembler::pending_sets), Some(0));
        Ok(())
    }

    #[test]
    fn non_ethernet_packets_are_skipped() -> anyhow::Result<()> {
        let recorder = Recorder::default();
        let packet = CapturedPacket::new(
            CaptureTimestamp::from_micros(0, 0),
            4,
            vec![0x45, 0, 0, 4],
            LinkType::Raw,
        )?;
        Dissector::new().dissect_packet(&packet, &recorder)?;
        assert!(recorder.events().is_empty());
        Ok(())
    }

    #[test]
    fn truncated_ipv4_is_an_error_after_the_frame_notification() {
        let mut bytes = udp_frame(b"");
        bytes.truncate(14 + 10);
        let recorder = Recorder::default();
        let result = EthernetFrame::parse(&bytes)
            .and_then(|frame| Dissector::new().dissect_frame(&frame, &recorder));
        assert!(matches!(result, Err(FormatError::Truncated { .. })));
        assert_eq!(recorder.events(), vec![format!("ethernet {}", bytes.len())]);
    }
}
