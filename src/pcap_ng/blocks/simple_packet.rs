use std::ops::Range;

use crate::{
    byte_order::{ByteOrder, Endianness},
    error::FormatError,
    pcap_ng::blocks::{BlockCodec, enhanced_packet::push_packet_data},
    utils::field_at,
};

/// A packet with no interface id, timestamp or options
///
/// It always belongs to the first interface of the section. The captured length is not stored,
/// it is the smaller of the original length and the space left in the block.
#[derive(Debug, Clone)]
pub struct SimplePacketBlock {
    pub original_length: u32,
    buffer: Vec<u8>,
    data: Range<usize>,
}
impl SimplePacketBlock {
    pub fn new(data: Vec<u8>, original_length: u32) -> Self {
        let data_range = 0..data.len();
        Self {
            original_length,
            buffer: data,
            data: data_range,
        }
    }
    pub fn packet_data(&self) -> &[u8] {
        &self.buffer[self.data.clone()]
    }
    pub fn captured_length(&self) -> u32 {
        self.data.len() as u32
    }
    pub fn into_packet_data(self) -> Vec<u8> {
        let mut buffer = self.buffer;
        buffer.truncate(self.data.end);
        buffer.drain(..self.data.start);
        buffer
    }
}
impl PartialEq for SimplePacketBlock {
    fn eq(&self, other: &Self) -> bool {
        self.original_length == other.original_length && self.packet_data() == other.packet_data()
    }
}
impl Eq for SimplePacketBlock {}

impl BlockCodec for SimplePacketBlock {
    const BLOCK_TYPE: u32 = 3;

    fn decode_body(body: Vec<u8>, byte_order: Endianness) -> Result<Self, FormatError> {
        let original_length = byte_order.u32_from_bytes(field_at(&body, 0, "original length")?);
        let available = body.len() - 4;
        let captured = available.min(original_length as usize);
        Ok(Self {
            original_length,
            buffer: body,
            data: 4..4 + captured,
        })
    }

    fn encode_body(&self, byte_order: Endianness) -> Result<Vec<u8>, FormatError> {
        let data = self.packet_data();
        let mut body = Vec::with_capacity(4 + data.len() + 3);
        body.extend_from_slice(&byte_order.u32_to_bytes(self.original_length));
        push_packet_data(&mut body, data);
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn padding_is_not_packet_data() -> anyhow::Result<()> {
        let packet = SimplePacketBlock::new(vec![9; 6], 6);
        let bytes = packet.to_bytes(Endianness::LittleEndian)?;
        assert_eq!(bytes.len(), 12 + 4 + 8);
        let read = SimplePacketBlock::read(&mut Cursor::new(&bytes), Endianness::LittleEndian)?;
        assert_eq!(read.packet_data(), &[9; 6]);
        assert_eq!(read, packet);
        Ok(())
    }

    #[test]
    fn snapped_packet_uses_block_space() -> anyhow::Result<()> {
        // Original length 1500 but only 8 bytes were kept
        let packet = SimplePacketBlock::new(vec![1; 8], 1500);
        let bytes = packet.to_bytes(Endianness::BigEndian)?;
        let read = SimplePacketBlock::read(&mut Cursor::new(&bytes), Endianness::BigEndian)?;
        assert_eq!(read.captured_length(), 8);
        assert_eq!(read.original_length, 1500);
        Ok(())
    }
}
