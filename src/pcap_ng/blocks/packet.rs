use std::ops::Range;

use crate::{
    byte_order::{ByteOrder, Endianness},
    error::FormatError,
    pcap_ng::{
        blocks::{
            BlockCodec, EnhancedPacketOptions,
            enhanced_packet::{locate_packet_data, push_packet_data},
            join_timestamp, split_timestamp,
        },
        options::OptionSet,
    },
    utils::{field_at, require_len},
};

/// The obsolete packet block (type 2)
///
/// Superseded by the enhanced packet block but still produced by old writers. Its interface id is
/// 16 bits and it carries a drop counter in the fixed fields.
#[derive(Debug, Clone)]
pub struct PacketBlock {
    pub interface_id: u16,
    pub drops_count: u16,
    pub timestamp: u64,
    pub original_length: u32,
    /// Only comment, flags and hash are defined for this block
    pub options: EnhancedPacketOptions,
    buffer: Vec<u8>,
    data: Range<usize>,
}
impl PacketBlock {
    pub fn new(interface_id: u16, timestamp: u64, data: Vec<u8>, original_length: u32) -> Self {
        let data_range = 0..data.len();
        Self {
            interface_id,
            drops_count: 0,
            timestamp,
            original_length,
            options: EnhancedPacketOptions::default(),
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
impl PartialEq for PacketBlock {
    fn eq(&self, other: &Self) -> bool {
        self.interface_id == other.interface_id
            && self.drops_count == other.drops_count
            && self.timestamp == other.timestamp
            && self.original_length == other.original_length
            && self.options == other.options
            && self.packet_data() == other.packet_data()
    }
}
impl Eq for PacketBlock {}

impl BlockCodec for PacketBlock {
    const BLOCK_TYPE: u32 = 2;

    fn decode_body(body: Vec<u8>, byte_order: Endianness) -> Result<Self, FormatError> {
        require_len(&body, 20, "packet")?;
        let interface_id = byte_order.u16_from_bytes(field_at(&body, 0, "interface id")?);
        let drops_count = byte_order.u16_from_bytes(field_at(&body, 2, "drops count")?);
        let high = byte_order.u32_from_bytes(field_at(&body, 4, "timestamp")?);
        let low = byte_order.u32_from_bytes(field_at(&body, 8, "timestamp")?);
        let captured_length = byte_order.u32_from_bytes(field_at(&body, 12, "captured length")?);
        let original_length = byte_order.u32_from_bytes(field_at(&body, 16, "original length")?);
        let (data, options_start) = locate_packet_data(&body, 20, captured_length)?;
        let options = EnhancedPacketOptions::parse(&body[options_start..], byte_order)?;
        Ok(Self {
            interface_id,
            drops_count,
            timestamp: join_timestamp(high, low),
            original_length,
            options,
            buffer: body,
            data,
        })
    }

    fn encode_body(&self, byte_order: Endianness) -> Result<Vec<u8>, FormatError> {
        let data = self.packet_data();
        let (high, low) = split_timestamp(self.timestamp);
        let mut body = Vec::with_capacity(20 + data.len() + 4);
        body.extend_from_slice(&byte_order.u16_to_bytes(self.interface_id));
        body.extend_from_slice(&byte_order.u16_to_bytes(self.drops_count));
        body.extend_from_slice(&byte_order.u32_to_bytes(high));
        body.extend_from_slice(&byte_order.u32_to_bytes(low));
        body.extend_from_slice(&byte_order.u32_to_bytes(self.captured_length()));
        body.extend_from_slice(&byte_order.u32_to_bytes(self.original_length));
        push_packet_data(&mut body, data);
        body.extend_from_slice(&self.options.to_bytes(byte_order)?);
        Ok(body)
    }
}
