use crate::{
    dissect::{
        ethernet::{EthernetFrame, FrameOrigin},
        ipv4::Ipv4Packet,
        read_u16_be,
    },
    error::FormatError,
};

/// A view over an ICMP message
#[derive(Debug, Clone)]
pub struct IcmpMessage<'a> {
    packet: Option<&'a Ipv4Packet<'a>>,
    bytes: &'a [u8],
    icmp_type: u8,
    code: u8,
    checksum: u16,
}

impl<'a> IcmpMessage<'a> {
    /// Type, code, checksum and the four type specific bytes
    pub const HEADER_LENGTH: usize = 8;

    pub fn from_packet(packet: &'a Ipv4Packet<'a>) -> Result<Self, FormatError> {
        let mut message = Self::parse(packet.payload())?;
        message.packet = Some(packet);
        Ok(message)
    }
    pub fn parse(bytes: &'a [u8]) -> Result<Self, FormatError> {
        if bytes.len() < Self::HEADER_LENGTH {
            return Err(FormatError::Truncated {
                name: "icmp header",
                needed: Self::HEADER_LENGTH,
                available: bytes.len(),
            });
        }
        let mut offset = 2;
        Ok(Self {
            packet: None,
            icmp_type: bytes[0],
            code: bytes[1],
            checksum: read_u16_be(bytes, &mut offset, "icmp checksum")?,
            bytes,
        })
    }
    pub fn packet(&self) -> Option<&'a Ipv4Packet<'a>> {
        self.packet
    }
    pub fn frame(&self) -> Option<&'a EthernetFrame<'a>> {
        self.packet.and_then(Ipv4Packet::frame)
    }
    pub fn origin(&self) -> Option<FrameOrigin<'a>> {
        self.frame().map(EthernetFrame::origin)
    }
    pub fn icmp_type(&self) -> u8 {
        self.icmp_type
    }
    pub fn code(&self) -> u8 {
        self.code
    }
    pub fn checksum(&self) -> u16 {
        self.checksum
    }
    pub fn header(&self) -> &'a [u8] {
        &self.bytes[..Self::HEADER_LENGTH]
    }
    /// The type specific word, identifier and sequence number for echo messages
    pub fn rest_of_header(&self) -> [u8; 4] {
        [self.bytes[4], self.bytes[5], self.bytes[6], self.bytes[7]]
    }
    pub fn payload(&self) -> &'a [u8] {
        &self.bytes[Self::HEADER_LENGTH..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::icmp_echo_frame;

    #[test]
    fn echo_request() -> anyhow::Result<()> {
        let bytes = icmp_echo_frame(b"ping");
        let frame = EthernetFrame::parse(&bytes)?;
        let packet = Ipv4Packet::from_frame(&frame)?;
        let message = IcmpMessage::from_packet(&packet)?;
        assert_eq!(message.icmp_type(), 8);
        assert_eq!(message.code(), 0);
        assert_eq!(message.header().len(), 8);
        // identifier 1, sequence 2
        assert_eq!(message.rest_of_header(), [0, 1, 0, 2]);
        assert_eq!(message.payload(), b"ping");
        assert!(message.frame().is_some());
        Ok(())
    }

    #[test]
    fn shorter_than_header() {
        assert!(matches!(
            IcmpMessage::parse(&[0, 0, 0, 0, 0, 0, 0]),
            Err(FormatError::Truncated {
                name: "icmp header",
                needed: 8,
                available: 7
            })
        ));
    }
}
