use std::ops::Range;

use crate::{
    byte_order::{ByteOrder, Endianness},
    error::FormatError,
    pcap_ng::{
        blocks::{BlockCodec, join_timestamp, split_timestamp},
        options::{
            BlockOption, OptionSet, OptionsWriter, RawOption, decode_common, define_options_enum,
        },
        pad_length_to_32_bits,
    },
    utils::{field_at, require_len},
};

define_options_enum! {
    /// Options of enhanced packet blocks. The obsolete packet block uses the first three.
    enum EnhancedPacketOptionCodes {
        Flags = 2,
        Hash = 3,
        DropCount = 4,
        PacketId = 5,
        Queue = 6,
        Verdict = 7,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketDirection {
    NotAvailable,
    Inbound,
    Outbound,
    Invalid,
}

/// The 32 bit `epb_flags` word
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PacketFlags(pub u32);
impl PacketFlags {
    pub fn direction(self) -> PacketDirection {
        match self.0 & 0b11 {
            0 => PacketDirection::NotAvailable,
            1 => PacketDirection::Inbound,
            2 => PacketDirection::Outbound,
            _ => PacketDirection::Invalid,
        }
    }
    /// 0 unspecified, 1 unicast, 2 multicast, 3 broadcast, 4 promiscuous
    pub fn reception_type(self) -> u8 {
        ((self.0 >> 2) & 0b111) as u8
    }
    /// Length of the frame check sequence in bytes, 0 when not available
    pub fn fcs_length(self) -> u8 {
        ((self.0 >> 5) & 0b1111) as u8
    }
    pub fn link_layer_errors(self) -> u16 {
        (self.0 >> 16) as u16
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EnhancedPacketOptions {
    pub comments: Vec<String>,
    pub flags: Option<PacketFlags>,
    /// Algorithm byte followed by the digest
    pub hashes: Vec<Vec<u8>>,
    pub drop_count: Option<u64>,
    pub packet_id: Option<u64>,
    pub queue: Option<u32>,
    /// Verdict type byte followed by its data
    pub verdicts: Vec<Vec<u8>>,
    pub unknown: Vec<RawOption>,
}
impl OptionSet for EnhancedPacketOptions {
    const BLOCK_NAME: &'static str = "packet";

    fn decode(options: &[BlockOption<'_>], byte_order: Endianness) -> Result<Self, FormatError> {
        let mut result = Self::default();
        for option in options {
            match EnhancedPacketOptionCodes::try_from(option.code) {
                Ok(EnhancedPacketOptionCodes::Flags) => {
                    result.flags = Some(PacketFlags(option.u32(byte_order, "epb_flags")?))
                }
                Ok(EnhancedPacketOptionCodes::Hash) => result.hashes.push(option.value.to_vec()),
                Ok(EnhancedPacketOptionCodes::DropCount) => {
                    result.drop_count = Some(option.u64(byte_order, "epb_dropcount")?)
                }
                Ok(EnhancedPacketOptionCodes::PacketId) => {
                    result.packet_id = Some(option.u64(byte_order, "epb_packetid")?)
                }
                Ok(EnhancedPacketOptionCodes::Queue) => {
                    result.queue = Some(option.u32(byte_order, "epb_queue")?)
                }
                Ok(EnhancedPacketOptionCodes::Verdict) => {
                    result.verdicts.push(option.value.to_vec())
                }
                Err(()) => decode_common(
                    Self::BLOCK_NAME,
                    option,
                    &mut result.comments,
                    &mut result.unknown,
                ),
            }
        }
        Ok(result)
    }

    fn encode(&self, writer: &mut OptionsWriter) -> Result<(), FormatError> {
        if let Some(flags) = self.flags {
            writer.push_u32(EnhancedPacketOptionCodes::Flags as u16, flags.0)?;
        }
        for hash in &self.hashes {
            writer.push(EnhancedPacketOptionCodes::Hash as u16, hash)?;
        }
        if let Some(drop_count) = self.drop_count {
            writer.push_u64(EnhancedPacketOptionCodes::DropCount as u16, drop_count)?;
        }
        if let Some(packet_id) = self.packet_id {
            writer.push_u64(EnhancedPacketOptionCodes::PacketId as u16, packet_id)?;
        }
        if let Some(queue) = self.queue {
            writer.push_u32(EnhancedPacketOptionCodes::Queue as u16, queue)?;
        }
        for verdict in &self.verdicts {
            writer.push(EnhancedPacketOptionCodes::Verdict as u16, verdict)?;
        }
        writer.push_common(&self.comments, &self.unknown)
    }
}

/// Locates the packet data that follows a fixed prefix of `prefix` bytes
///
/// Returns the data range and the start of the options region.
pub(crate) fn locate_packet_data(
    body: &[u8],
    prefix: usize,
    captured_length: u32,
) -> Result<(Range<usize>, usize), FormatError> {
    let end = prefix + captured_length as usize;
    require_len(body, end, "packet data")?;
    let options_start = (prefix + pad_length_to_32_bits(captured_length as usize)).min(body.len());
    Ok((prefix..end, options_start))
}

/// Writes packet data followed by padding to 32 bits
pub(crate) fn push_packet_data(body: &mut Vec<u8>, data: &[u8]) {
    body.extend_from_slice(data);
    body.resize(body.len() + pad_length_to_32_bits(data.len()) - data.len(), 0);
}

/// The standard container for a captured packet
///
/// The block owns its body. [EnhancedPacketBlock::packet_data] is a view into it.
#[derive(Debug, Clone)]
pub struct EnhancedPacketBlock {
    pub interface_id: u32,
    /// Units since 1970-01-01 in the interface's timestamp resolution
    pub timestamp: u64,
    pub original_length: u32,
    pub options: EnhancedPacketOptions,
    buffer: Vec<u8>,
    data: Range<usize>,
}
impl EnhancedPacketBlock {
    pub fn new(interface_id: u32, timestamp: u64, data: Vec<u8>, original_length: u32) -> Self {
        let data_range = 0..data.len();
        Self {
            interface_id,
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
    pub fn timestamp_high(&self) -> u32 {
        split_timestamp(self.timestamp).0
    }
    pub fn timestamp_low(&self) -> u32 {
        split_timestamp(self.timestamp).1
    }
    /// Moves the packet data out, dropping the rest of the body
    pub fn into_packet_data(self) -> Vec<u8> {
        let mut buffer = self.buffer;
        buffer.truncate(self.data.end);
        buffer.drain(..self.data.start);
        buffer
    }
}
impl PartialEq for EnhancedPacketBlock {
    fn eq(&self, other: &Self) -> bool {
        self.interface_id == other.interface_id
            && self.timestamp == other.timestamp
            && self.original_length == other.original_length
            && self.options == other.options
            && self.packet_data() == other.packet_data()
    }
}
impl Eq for EnhancedPacketBlock {}

impl BlockCodec for EnhancedPacketBlock {
    const BLOCK_TYPE: u32 = 6;

    fn decode_body(body: Vec<u8>, byte_order: Endianness) -> Result<Self, FormatError> {
        require_len(&body, 20, "enhanced packet")?;
        let interface_id = byte_order.u32_from_bytes(field_at(&body, 0, "interface id")?);
        let timestamp_high = byte_order.u32_from_bytes(field_at(&body, 4, "timestamp")?);
        let timestamp_low = byte_order.u32_from_bytes(field_at(&body, 8, "timestamp")?);
        let captured_length = byte_order.u32_from_bytes(field_at(&body, 12, "captured length")?);
        let original_length = byte_order.u32_from_bytes(field_at(&body, 16, "original length")?);
        let (data, options_start) = locate_packet_data(&body, 20, captured_length)?;
        let options = EnhancedPacketOptions::parse(&body[options_start..], byte_order)?;
        Ok(Self {
            interface_id,
            timestamp: join_timestamp(timestamp_high, timestamp_low),
            original_length,
            options,
            buffer: body,
            data,
        })
    }

    fn encode_body(&self, byte_order: Endianness) -> Result<Vec<u8>, FormatError> {
        let data = self.packet_data();
        let mut body = Vec::with_capacity(20 + data.len() + 4);
        body.extend_from_slice(&byte_order.u32_to_bytes(self.interface_id));
        body.extend_from_slice(&byte_order.u32_to_bytes(self.timestamp_high()));
        body.extend_from_slice(&byte_order.u32_to_bytes(self.timestamp_low()));
        body.extend_from_slice(&byte_order.u32_to_bytes(self.captured_length()));
        body.extend_from_slice(&byte_order.u32_to_bytes(self.original_length));
        push_packet_data(&mut body, data);
        body.extend_from_slice(&self.options.to_bytes(byte_order)?);
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn test_enhanced_packet_write() -> anyhow::Result<()> {
        let content = vec![1; 2047];
        let packet = EnhancedPacketBlock::new(1, 0x0000_0001_0000_0002, content.clone(), 2047);
        let buffer = packet.to_bytes(Endianness::LittleEndian)?;
        // 12 envelope, 20 fixed, 2048 padded data
        assert_eq!(buffer.len(), 12 + 20 + 2048);

        let mut reader = Cursor::new(&buffer);
        let read = EnhancedPacketBlock::read(&mut reader, Endianness::LittleEndian)?;
        assert_eq!(read.packet_data(), &content[..]);
        assert_eq!(read.captured_length(), 2047);
        assert_eq!(read.original_length, 2047);
        assert_eq!(read.timestamp_high(), 1);
        assert_eq!(read.timestamp_low(), 2);
        assert_eq!(read.options, EnhancedPacketOptions::default());
        assert_eq!(read, packet);
        Ok(())
    }

    #[test]
    fn options_after_padded_data() -> anyhow::Result<()> {
        let mut packet = EnhancedPacketBlock::new(0, 7, vec![0xAA; 5], 60);
        packet.options.flags = Some(PacketFlags(0b1_0000_0110 | (3 << 16)));
        packet.options.drop_count = Some(12);
        packet.options.hashes.push(vec![2, 0xDE, 0xAD, 0xBE, 0xEF]);
        packet.options.comments.push("retransmission".into());

        let bytes = packet.to_bytes(Endianness::BigEndian)?;
        let read = EnhancedPacketBlock::read(&mut Cursor::new(&bytes), Endianness::BigEndian)?;
        assert_eq!(read, packet);
        let flags = read.options.flags.unwrap_or_default();
        assert_eq!(flags.direction(), PacketDirection::Outbound);
        assert_eq!(flags.reception_type(), 1);
        assert_eq!(flags.fcs_length(), 8);
        assert_eq!(flags.link_layer_errors(), 3);
        assert_eq!(read.into_packet_data(), vec![0xAA; 5]);
        Ok(())
    }

    #[test]
    fn captured_length_past_body_is_truncated() {
        let mut body = vec![0u8; 24];
        body[12] = 200;
        let result = EnhancedPacketBlock::decode_body(body, Endianness::LittleEndian);
        assert!(matches!(
            result,
            Err(FormatError::Truncated {
                name: "packet data",
                needed: 220,
                available: 24
            })
        ));
    }
}
