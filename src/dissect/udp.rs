use crate::{
    dissect::{
        ethernet::{EthernetFrame, FrameOrigin},
        ipv4::Ipv4Packet,
        read_u16_be,
    },
    error::FormatError,
};

/// A view over a UDP header and its payload
///
/// The payload is every byte after the header. The length field is reported but the
/// enclosing framing decides where the datagram ends.
#[derive(Debug, Clone)]
pub struct UdpDatagram<'a> {
    packet: Option<&'a Ipv4Packet<'a>>,
    bytes: &'a [u8],
    source_port: u16,
    destination_port: u16,
    length: u16,
    checksum: u16,
}

impl<'a> UdpDatagram<'a> {
    pub const HEADER_LENGTH: usize = 8;

    pub fn from_packet(packet: &'a Ipv4Packet<'a>) -> Result<Self, FormatError> {
        let mut datagram = Self::parse(packet.payload())?;
        datagram.packet = Some(packet);
        Ok(datagram)
    }
    pub fn parse(bytes: &'a [u8]) -> Result<Self, FormatError> {
        let mut offset = 0;
        Ok(Self {
            packet: None,
            source_port: read_u16_be(bytes, &mut offset, "udp source port")?,
            destination_port: read_u16_be(bytes, &mut offset, "udp destination port")?,
            length: read_u16_be(bytes, &mut offset, "udp length")?,
            checksum: read_u16_be(bytes, &mut offset, "udp checksum")?,
            bytes,
        })
    }
    /// `None` for datagrams parsed from a reassembled payload
    pub fn packet(&self) -> Option<&'a Ipv4Packet<'a>> {
        self.packet
    }
    pub fn frame(&self) -> Option<&'a EthernetFrame<'a>> {
        self.packet.and_then(Ipv4Packet::frame)
    }
    pub fn origin(&self) -> Option<FrameOrigin<'a>> {
        self.frame().map(EthernetFrame::origin)
    }
    pub fn source_port(&self) -> u16 {
        self.source_port
    }
    pub fn destination_port(&self) -> u16 {
        self.destination_port
    }
    pub fn length(&self) -> u16 {
        self.length
    }
    pub fn checksum(&self) -> u16 {
        self.checksum
    }
    pub fn payload(&self) -> &'a [u8] {
        &self.bytes[Self::HEADER_LENGTH..]
    }
}
