//! Ethernet II and IEEE 802.3 framing
//!
//! 802.1Q tags are consumed while the type field reads `0x8100`. A final type value of 1500 or
//! less is a length, in which case an LLC header and optionally a SNAP header follow.
use crate::{
    captured_packet::CapturedPacket,
    dissect::{forward, read_u16_be},
    error::FormatError,
    pcap_ng::blocks::Block,
};

protocol_codes! {
    /// Protocol carried in the payload of an Ethernet frame
    EtherType: u16 {
        Ipv4 = 0x0800,
        Arp = 0x0806,
        /// 802.1Q tag, only seen here when reading the raw type field
        Vlan = 0x8100,
        Ipv6 = 0x86DD,
        Lldp = 0x88CC
    }
}

/// Type field values up to this one are 802.3 lengths
pub const MAX_8023_LENGTH: u16 = 1500;

/// What an [EthernetFrame] was built from
#[derive(Debug, Clone, Copy)]
pub enum FrameOrigin<'a> {
    Block(&'a Block),
    Packet(&'a CapturedPacket),
    /// Built from bare bytes, such as a reassembled payload or a test vector
    Detached,
}

/// One 802.1Q tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VlanTag {
    /// 3 bit priority code point
    pub priority: u8,
    pub drop_eligible: bool,
    /// 12 bit VLAN identifier
    pub vlan_id: u16,
}
impl VlanTag {
    pub fn from_tci(tci: u16) -> Self {
        Self {
            priority: (tci >> 13) as u8,
            drop_eligible: (tci >> 12) & 1 == 1,
            vlan_id: tci & 0x0FFF,
        }
    }
    /// The tag control information as it is written on the wire
    pub fn tci(&self) -> u16 {
        (u16::from(self.priority & 0x07) << 13)
            | (u16::from(self.drop_eligible) << 12)
            | (self.vlan_id & 0x0FFF)
    }
}

/// IEEE 802.2 logical link control header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LlcHeader {
    pub dsap: u8,
    pub ssap: u8,
    pub control: u8,
}
impl LlcHeader {
    pub const SIZE: usize = 3;
    /// DSAP and SSAP `0xAA` with an unnumbered information control field
    pub fn announces_snap(&self) -> bool {
        self.dsap == 0xAA && self.ssap == 0xAA && self.control == 0x03
    }
}

/// Subnetwork access protocol header following a SNAP LLC header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapHeader {
    pub oui: [u8; 3],
    pub protocol_id: u16,
}
impl SnapHeader {
    pub const SIZE: usize = 5;
}

/// A view over one Ethernet frame
///
/// Nothing is copied, [EthernetFrame::payload] is a sub-slice of the bytes the frame was
/// parsed from.
#[derive(Debug, Clone)]
pub struct EthernetFrame<'a> {
    origin: FrameOrigin<'a>,
    bytes: &'a [u8],
    destination: [u8; 6],
    source: [u8; 6],
    vlan_tags: Vec<VlanTag>,
    type_or_length: u16,
    llc: Option<LlcHeader>,
    snap: Option<SnapHeader>,
    header_length: usize,
}

impl<'a> EthernetFrame<'a> {
    /// Parses a frame that is not tied to a capture record
    pub fn parse(bytes: &'a [u8]) -> Result<Self, FormatError> {
        Self::parse_with_origin(bytes, FrameOrigin::Detached)
    }
    /// Parses the packet data of a packet-bearing PCAP-NG block
    pub fn from_block(block: &'a Block) -> Result<Self, FormatError> {
        let data = block
            .packet_data()
            .ok_or(FormatError::NotPacketBearing(block.block_type()))?;
        Self::parse_with_origin(data, FrameOrigin::Block(block))
    }
    pub fn from_packet(packet: &'a CapturedPacket) -> Result<Self, FormatError> {
        Self::parse_with_origin(packet.data(), FrameOrigin::Packet(packet))
    }

    fn parse_with_origin(bytes: &'a [u8], origin: FrameOrigin<'a>) -> Result<Self, FormatError> {
        let mut offset = 0;
        let destination = forward::<6>(bytes, &mut offset, "ethernet destination")?;
        let source = forward::<6>(bytes, &mut offset, "ethernet source")?;

        let mut vlan_tags = Vec::new();
        let mut type_or_length = read_u16_be(bytes, &mut offset, "ethernet type")?;
        while type_or_length == EtherType::Vlan.code() {
            let tci = read_u16_be(bytes, &mut offset, "vlan tag")?;
            vlan_tags.push(VlanTag::from_tci(tci));
            type_or_length = read_u16_be(bytes, &mut offset, "ethernet type")?;
        }

        let mut llc = None;
        let mut snap = None;
        if type_or_length <= MAX_8023_LENGTH {
            let [dsap, ssap, control] = forward::<3>(bytes, &mut offset, "llc header")?;
            let header = LlcHeader {
                dsap,
                ssap,
                control,
            };
            if header.announces_snap() {
                let [a, b, c] = forward::<3>(bytes, &mut offset, "snap oui")?;
                let protocol_id = read_u16_be(bytes, &mut offset, "snap protocol id")?;
                snap = Some(SnapHeader {
                    oui: [a, b, c],
                    protocol_id,
                });
            }
            llc = Some(header);
        }

        let frame = Self {
            origin,
            bytes,
            destination,
            source,
            vlan_tags,
            type_or_length,
            llc,
            snap,
            header_length: offset,
        };
        #[cfg(debug_assertions)]
        if let Some(EtherType::Unknown(code)) = frame.ether_type() {
            log::debug!("Unknown ethertype {code:#06x}");
        }
        Ok(frame)
    }

    pub fn origin(&self) -> FrameOrigin<'a> {
        self.origin
    }
    pub fn destination(&self) -> [u8; 6] {
        self.destination
    }
    pub fn source(&self) -> [u8; 6] {
        self.source
    }
    /// 802.1Q tags in the order they appear, outermost first
    pub fn vlan_tags(&self) -> &[VlanTag] {
        &self.vlan_tags
    }
    /// The protocol of the payload
    ///
    /// For 802.3 frames this is the SNAP protocol id, or `None` when there is no SNAP header.
    pub fn ether_type(&self) -> Option<EtherType> {
        match (&self.snap, &self.llc) {
            (Some(snap), _) => Some(EtherType::from(snap.protocol_id)),
            (None, Some(_)) => None,
            (None, None) => Some(EtherType::from(self.type_or_length)),
        }
    }
    /// The 802.3 length field, `None` for Ethernet II frames
    pub fn length(&self) -> Option<u16> {
        self.llc.map(|_| self.type_or_length)
    }
    pub fn llc(&self) -> Option<&LlcHeader> {
        self.llc.as_ref()
    }
    pub fn snap(&self) -> Option<&SnapHeader> {
        self.snap.as_ref()
    }
    /// Bytes consumed by the MAC addresses, tags and LLC/SNAP headers
    pub fn header_length(&self) -> usize {
        self.header_length
    }
    /// The whole frame
    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }
    pub fn payload(&self) -> &'a [u8] {
        &self.bytes[self.header_length..]
    }
}
