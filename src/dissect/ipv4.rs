use std::net::Ipv4Addr;

use crate::{
    dissect::{
        ethernet::{EthernetFrame, FrameOrigin},
        forward, read_u16_be,
    },
    error::FormatError,
};

protocol_codes! {
    /// IANA assigned internet protocol numbers
    IpProtocol: u8 {
        Icmp = 1,
        Igmp = 2,
        Tcp = 6,
        Udp = 17,
        Ipv6 = 41,
        Esp = 50,
        Ah = 51
    }
}

/// The three flag bits in front of the fragment offset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Ipv4Flags {
    pub reserved: bool,
    pub dont_fragment: bool,
    pub more_fragments: bool,
}
impl Ipv4Flags {
    fn from_bits(bits: u8) -> Self {
        Self {
            reserved: bits & 0b100 != 0,
            dont_fragment: bits & 0b010 != 0,
            more_fragments: bits & 0b001 != 0,
        }
    }
}

/// A view over an IPv4 header and its payload
///
/// The checksum is exposed but never verified.
#[derive(Debug, Clone)]
pub struct Ipv4Packet<'a> {
    frame: Option<&'a EthernetFrame<'a>>,
    bytes: &'a [u8],
    version: u8,
    header_length: usize,
    dscp: u8,
    ecn: u8,
    total_length: u16,
    identification: u16,
    flags: Ipv4Flags,
    fragment_offset: u16,
    ttl: u8,
    protocol: IpProtocol,
    checksum: u16,
    source: Ipv4Addr,
    destination: Ipv4Addr,
}

impl<'a> Ipv4Packet<'a> {
    pub const MIN_HEADER_LENGTH: usize = 20;

    /// Parses the payload of `frame`, keeping a reference back to it
    pub fn from_frame(frame: &'a EthernetFrame<'a>) -> Result<Self, FormatError> {
        let mut packet = Self::parse(frame.payload())?;
        packet.frame = Some(frame);
        Ok(packet)
    }
    /// Parses a packet without an enclosing frame
    pub fn parse(bytes: &'a [u8]) -> Result<Self, FormatError> {
        let mut offset = 0;
        let [version_ihl, dscp_ecn] = forward::<2>(bytes, &mut offset, "ipv4 header")?;
        let header_length = usize::from(version_ihl & 0x0F) * 4;
        if header_length < Self::MIN_HEADER_LENGTH {
            return Err(FormatError::InvalidHeaderLength(header_length));
        }
        let total_length = read_u16_be(bytes, &mut offset, "ipv4 total length")?;
        let identification = read_u16_be(bytes, &mut offset, "ipv4 identification")?;
        let flags_and_offset = read_u16_be(bytes, &mut offset, "ipv4 fragment offset")?;
        let [ttl, protocol] = forward::<2>(bytes, &mut offset, "ipv4 protocol")?;
        let checksum = read_u16_be(bytes, &mut offset, "ipv4 checksum")?;
        let source = forward::<4>(bytes, &mut offset, "ipv4 source")?;
        let destination = forward::<4>(bytes, &mut offset, "ipv4 destination")?;
        if bytes.len() < header_length {
            return Err(FormatError::Truncated {
                name: "ipv4 options",
                needed: header_length,
                available: bytes.len(),
            });
        }

        let packet = Self {
            frame: None,
            bytes,
            version: version_ihl >> 4,
            header_length,
            dscp: dscp_ecn >> 2,
            ecn: dscp_ecn & 0x03,
            total_length,
            identification,
            flags: Ipv4Flags::from_bits((flags_and_offset >> 13) as u8),
            fragment_offset: (flags_and_offset & 0x1FFF) * 8,
            ttl,
            protocol: IpProtocol::from(protocol),
            checksum,
            source: Ipv4Addr::from(source),
            destination: Ipv4Addr::from(destination),
        };
        if packet.version != 4 {
            log::debug!("IPv4 header with version {}", packet.version);
        }
        #[cfg(debug_assertions)]
        if let IpProtocol::Unknown(code) = packet.protocol {
            log::debug!("Unknown ip protocol {code}");
        }
        Ok(packet)
    }

    /// The frame this packet was carried in
    pub fn frame(&self) -> Option<&'a EthernetFrame<'a>> {
        self.frame
    }
    pub fn origin(&self) -> Option<FrameOrigin<'a>> {
        self.frame.map(EthernetFrame::origin)
    }
    pub fn version(&self) -> u8 {
        self.version
    }
    /// Header length in bytes, options included
    pub fn header_length(&self) -> usize {
        self.header_length
    }
    pub fn dscp(&self) -> u8 {
        self.dscp
    }
    pub fn ecn(&self) -> u8 {
        self.ecn
    }
    pub fn total_length(&self) -> u16 {
        self.total_length
    }
    pub fn identification(&self) -> u16 {
        self.identification
    }
    pub fn flags(&self) -> Ipv4Flags {
        self.flags
    }
    /// Position of this fragment's payload in the original datagram, in bytes
    pub fn fragment_offset(&self) -> u16 {
        self.fragment_offset
    }
    pub fn ttl(&self) -> u8 {
        self.ttl
    }
    pub fn protocol(&self) -> IpProtocol {
        self.protocol
    }
    pub fn checksum(&self) -> u16 {
        self.checksum
    }
    pub fn source(&self) -> Ipv4Addr {
        self.source
    }
    pub fn destination(&self) -> Ipv4Addr {
        self.destination
    }
    /// Whether this packet is part of a fragmented datagram
    pub fn is_fragment(&self) -> bool {
        self.fragment_offset != 0 || self.flags.more_fragments
    }
    /// Option bytes between the fixed header and the payload
    pub fn options(&self) -> &'a [u8] {
        &self.bytes[Self::MIN_HEADER_LENGTH..self.header_length]
    }
    /// Every byte after the header, including any link-layer padding
    pub fn payload(&self) -> &'a [u8] {
        &self.bytes[self.header_length..]
    }
    /// The payload cut to the total length field, or to the captured bytes if shorter
    pub fn declared_payload(&self) -> &'a [u8] {
        let end = usize::from(self.total_length)
            .clamp(self.header_length, self.bytes.len());
        &self.bytes[self.header_length..end]
    }
    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{ipv4_fragment, udp_frame};

    #[test]
    fn header_fields() -> anyhow::Result<()> {
        let bytes = udp_frame(b"0123456789");
        let frame = EthernetFrame::parse(&bytes)?;
        let packet = Ipv4Packet::from_frame(&frame)?;
        assert_eq!(packet.version(), 4);
        assert_eq!(packet.header_length(), 20);
        assert_eq!(packet.total_length(), 20 + 8 + 10);
        assert_eq!(packet.ttl(), 20);
        assert_eq!(packet.protocol(), IpProtocol::Udp);
        assert_eq!(packet.source(), Ipv4Addr::new(192, 168, 1, 1));
        assert_eq!(packet.destination(), Ipv4Addr::new(192, 168, 1, 2));
        assert!(packet.options().is_empty());
        assert!(!packet.is_fragment());
        assert_eq!(packet.payload().len(), 18);
        assert!(packet.frame().is_some());
        assert!(matches!(packet.origin(), Some(FrameOrigin::Detached)));
        Ok(())
    }

    #[test]
    fn options_are_kept_as_a_view() -> anyhow::Result<()> {
        let mut bytes = vec![0x46, 0, 0, 28, 0, 1, 0, 0, 64, 17, 0, 0, 10, 0, 0, 1, 10, 0, 0, 2];
        // Router alert
        bytes.extend_from_slice(&[0x94, 0x04, 0, 0]);
        bytes.extend_from_slice(&[9, 9, 9, 9]);
        let packet = Ipv4Packet::parse(&bytes)?;
        assert_eq!(packet.header_length(), 24);
        assert_eq!(packet.options(), &[0x94, 0x04, 0, 0][..]);
        assert_eq!(packet.payload(), &[9, 9, 9, 9][..]);
        assert!(packet.frame().is_none());
        Ok(())
    }

    #[test]
    fn fragment_offset_is_in_bytes() -> anyhow::Result<()> {
        let bytes = ipv4_fragment(7, 370 / 8, true, &[0; 16]);
        let frame = EthernetFrame::parse(&bytes)?;
        let packet = Ipv4Packet::from_frame(&frame)?;
        assert_eq!(packet.identification(), 7);
        assert_eq!(packet.fragment_offset(), 368);
        assert!(packet.flags().more_fragments);
        assert!(!packet.flags().dont_fragment);
        assert!(packet.is_fragment());
        Ok(())
    }

    #[test]
    fn flags_do_not_leak_into_offset() -> anyhow::Result<()> {
        // Don't fragment set, offset 0
        let bytes = [0x45, 0, 0, 20, 0, 0, 0x40, 0, 64, 6, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2];
        let packet = Ipv4Packet::parse(&bytes)?;
        assert!(packet.flags().dont_fragment);
        assert_eq!(packet.fragment_offset(), 0);
        assert!(!packet.is_fragment());
        assert_eq!(packet.protocol(), IpProtocol::Tcp);
        Ok(())
    }

    #[test]
    fn declared_payload_drops_padding() -> anyhow::Result<()> {
        let mut bytes = vec![0x45, 0, 0, 22, 0, 0, 0, 0, 64, 1, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2];
        bytes.extend_from_slice(&[1, 2, 0, 0, 0, 0]);
        let packet = Ipv4Packet::parse(&bytes)?;
        assert_eq!(packet.payload().len(), 6);
        assert_eq!(packet.declared_payload(), &[1, 2][..]);
        Ok(())
    }

    #[test]
    fn invalid_headers() {
        let mut short_ihl = [0u8; 20];
        short_ihl[0] = 0x44;
        assert!(matches!(
            Ipv4Packet::parse(&short_ihl),
            Err(FormatError::InvalidHeaderLength(16))
        ));

        let mut long_ihl = [0u8; 20];
        long_ihl[0] = 0x4F;
        assert!(matches!(
            Ipv4Packet::parse(&long_ihl),
            Err(FormatError::Truncated {
                needed: 60,
                available: 20,
                ..
            })
        ));

        assert!(matches!(
            Ipv4Packet::parse(&[0x45, 0, 0, 20, 0, 0, 0, 0, 64, 1]),
            Err(FormatError::Truncated { .. })
        ));
    }
}
