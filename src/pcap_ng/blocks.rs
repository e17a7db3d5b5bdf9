//! Block Types for pcap-ng files
//!
//! Every block is framed as `type (4) | total length (4) | body | total length (4)`.
//! [read_raw_block] validates that envelope, the per-type [BlockCodec] implementations
//! decode the body.
use std::io::Read;

use crate::{
    byte_order::{ByteOrder, Endianness, ReadExt},
    error::FormatError,
    pcap_ng::{PCAP_NG_MAGIC, pad_length_to_32_bits},
};

mod enhanced_packet;
mod generic;
mod header;
mod interface;
mod interface_statistics;
mod name_resolution;
mod packet;
mod simple_packet;
pub use enhanced_packet::{
    EnhancedPacketBlock, EnhancedPacketOptionCodes, EnhancedPacketOptions, PacketDirection,
    PacketFlags,
};
pub use generic::UnknownBlock;
pub use header::{SHBOptionCodes, SectionHeaderBlock, SectionHeaderOptions};
pub use interface::{InterfaceDescriptionBlock, InterfaceOptionCodes, InterfaceOptions};
pub use interface_statistics::{
    InterfaceStatisticsBlock, InterfaceStatisticsOptionCodes, InterfaceStatisticsOptions,
};
pub use name_resolution::{NameRecord, NameResolutionBlock, NameResolutionOptions};
pub use packet::PacketBlock;
pub use simple_packet::SimplePacketBlock;

/// Size of the type and the two length fields
pub const BLOCK_ENVELOPE_SIZE: u32 = 12;

/// A block whose envelope has been validated but whose body has not been decoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBlock {
    pub block_type: u32,
    pub total_length: u32,
    /// The byte order the block was read with
    ///
    /// For section headers this comes from the block itself.
    pub byte_order: Endianness,
    pub body: Vec<u8>,
}

/// Reads the next block envelope
///
/// Returns `Ok(None)` at the end of the stream. A stream that ends part way through a block
/// is also treated as the end of input, after logging a warning.
pub fn read_raw_block<R: Read>(
    reader: &mut R,
    byte_order: Endianness,
) -> Result<Option<RawBlock>, FormatError> {
    let Some(type_bytes) = read_or_end::<_, 4>(reader, true)? else {
        return Ok(None);
    };
    let Some(length_bytes) = read_or_end::<_, 4>(reader, false)? else {
        return Ok(None);
    };
    // A section header carries its own byte order right after the length
    let (byte_order, prefix) = if type_bytes == PCAP_NG_MAGIC {
        let Some(magic) = read_or_end::<_, 4>(reader, false)? else {
            return Ok(None);
        };
        (Endianness::from_pcap_ng_bytes(&magic)?, Some(magic))
    } else {
        (byte_order, None)
    };
    let block_type = byte_order.u32_from_bytes(type_bytes);
    let total_length = byte_order.u32_from_bytes(length_bytes);
    if total_length < BLOCK_ENVELOPE_SIZE {
        return Err(FormatError::BlockTooShort {
            block_type,
            length: total_length,
        });
    }
    if !total_length.is_multiple_of(4) {
        return Err(FormatError::UnalignedBlockLength {
            block_type,
            length: total_length,
        });
    }
    let body_length = (total_length - BLOCK_ENVELOPE_SIZE) as usize;
    let mut body = Vec::with_capacity(body_length.min(1 << 16));
    let expected_remaining = match prefix {
        Some(magic) => {
            if body_length < 4 {
                return Err(FormatError::BlockTooShort {
                    block_type,
                    length: total_length,
                });
            }
            body.extend_from_slice(&magic);
            body_length - 4
        }
        None => body_length,
    };
    // take() keeps a corrupt length from allocating the whole size up front
    let read = Read::take(&mut *reader, expected_remaining as u64).read_to_end(&mut body)?;
    if read < expected_remaining {
        log::warn!(
            "Stream ended inside block {block_type:#010x}: {} of {body_length} body bytes",
            body.len()
        );
        return Ok(None);
    }
    let Some(trailing) = read_or_end::<_, 4>(reader, false)? else {
        return Ok(None);
    };
    let trailing = byte_order.u32_from_bytes(trailing);
    if trailing != total_length {
        return Err(FormatError::BlockLengthMismatch {
            leading: total_length,
            trailing,
        });
    }
    Ok(Some(RawBlock {
        block_type,
        total_length,
        byte_order,
        body,
    }))
}

fn read_or_end<R: Read, const SIZE: usize>(
    reader: &mut R,
    at_block_start: bool,
) -> Result<Option<[u8; SIZE]>, FormatError> {
    match reader.read_bytes::<SIZE>() {
        Ok(bytes) => Ok(Some(bytes)),
        Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => {
            if !at_block_start {
                log::warn!("Stream ended inside a block header");
            }
            Ok(None)
        }
        Err(err) => Err(FormatError::IO(err)),
    }
}

/// Frames a body: pads it to 32 bits and writes both length fields
pub fn encode_block(
    block_type: u32,
    body: &[u8],
    byte_order: Endianness,
) -> Result<Vec<u8>, FormatError> {
    let padded = pad_length_to_32_bits(body.len());
    let total_length = u32::try_from(padded + BLOCK_ENVELOPE_SIZE as usize).map_err(|_| {
        FormatError::Truncated {
            name: "block body",
            needed: padded,
            available: u32::MAX as usize,
        }
    })?;
    let mut bytes = Vec::with_capacity(total_length as usize);
    bytes.extend_from_slice(&byte_order.u32_to_bytes(block_type));
    bytes.extend_from_slice(&byte_order.u32_to_bytes(total_length));
    bytes.extend_from_slice(body);
    bytes.resize(bytes.len() + (padded - body.len()), 0);
    bytes.extend_from_slice(&byte_order.u32_to_bytes(total_length));
    Ok(bytes)
}

/// Decoding and encoding of one block type
pub trait BlockCodec: Sized {
    /// Returns the block ID for this block type
    const BLOCK_TYPE: u32;

    fn decode_body(body: Vec<u8>, byte_order: Endianness) -> Result<Self, FormatError>;

    fn encode_body(&self, byte_order: Endianness) -> Result<Vec<u8>, FormatError>;

    fn from_raw(raw: RawBlock) -> Result<Self, FormatError> {
        if raw.block_type != Self::BLOCK_TYPE {
            return Err(FormatError::UnexpectedBlockType {
                expected: Self::BLOCK_TYPE,
                got: raw.block_type,
            });
        }
        Self::decode_body(raw.body, raw.byte_order)
    }
    /// Reads one complete block of this type
    fn read<R: Read>(reader: &mut R, byte_order: Endianness) -> Result<Self, FormatError> {
        let raw = read_raw_block(reader, byte_order)?.ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "Stream ended before the block",
            )
        })?;
        Self::from_raw(raw)
    }
    fn to_bytes(&self, byte_order: Endianness) -> Result<Vec<u8>, FormatError> {
        encode_block(Self::BLOCK_TYPE, &self.encode_body(byte_order)?, byte_order)
    }
}

/// Any block that can appear in a pcap-ng stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    SectionHeader(SectionHeaderBlock),
    InterfaceDescription(InterfaceDescriptionBlock),
    EnhancedPacket(EnhancedPacketBlock),
    /// The obsolete packet block
    Packet(PacketBlock),
    SimplePacket(SimplePacketBlock),
    NameResolution(NameResolutionBlock),
    InterfaceStatistics(InterfaceStatisticsBlock),
    Unknown(UnknownBlock),
}
impl Block {
    /// Decodes the body of a validated envelope
    pub fn from_raw(raw: RawBlock) -> Result<Self, FormatError> {
        let block = match raw.block_type {
            SectionHeaderBlock::BLOCK_TYPE => {
                Block::SectionHeader(SectionHeaderBlock::from_raw(raw)?)
            }
            InterfaceDescriptionBlock::BLOCK_TYPE => {
                Block::InterfaceDescription(InterfaceDescriptionBlock::from_raw(raw)?)
            }
            EnhancedPacketBlock::BLOCK_TYPE => {
                Block::EnhancedPacket(EnhancedPacketBlock::from_raw(raw)?)
            }
            PacketBlock::BLOCK_TYPE => Block::Packet(PacketBlock::from_raw(raw)?),
            SimplePacketBlock::BLOCK_TYPE => Block::SimplePacket(SimplePacketBlock::from_raw(raw)?),
            NameResolutionBlock::BLOCK_TYPE => {
                Block::NameResolution(NameResolutionBlock::from_raw(raw)?)
            }
            InterfaceStatisticsBlock::BLOCK_TYPE => {
                Block::InterfaceStatistics(InterfaceStatisticsBlock::from_raw(raw)?)
            }
            other => {
                log::debug!("Keeping unknown block type {other:#010x} as raw bytes");
                Block::Unknown(UnknownBlock::from_raw(raw))
            }
        };
        Ok(block)
    }
    /// Reads and decodes the next block, `Ok(None)` at the end of the stream
    pub fn read<R: Read>(
        reader: &mut R,
        byte_order: Endianness,
    ) -> Result<Option<Self>, FormatError> {
        read_raw_block(reader, byte_order)?
            .map(Self::from_raw)
            .transpose()
    }
    pub fn block_type(&self) -> u32 {
        match self {
            Block::SectionHeader(_) => SectionHeaderBlock::BLOCK_TYPE,
            Block::InterfaceDescription(_) => InterfaceDescriptionBlock::BLOCK_TYPE,
            Block::EnhancedPacket(_) => EnhancedPacketBlock::BLOCK_TYPE,
            Block::Packet(_) => PacketBlock::BLOCK_TYPE,
            Block::SimplePacket(_) => SimplePacketBlock::BLOCK_TYPE,
            Block::NameResolution(_) => NameResolutionBlock::BLOCK_TYPE,
            Block::InterfaceStatistics(_) => InterfaceStatisticsBlock::BLOCK_TYPE,
            Block::Unknown(block) => block.block_type,
        }
    }
    pub fn to_bytes(&self, byte_order: Endianness) -> Result<Vec<u8>, FormatError> {
        match self {
            Block::SectionHeader(block) => block.to_bytes(byte_order),
            Block::InterfaceDescription(block) => block.to_bytes(byte_order),
            Block::EnhancedPacket(block) => block.to_bytes(byte_order),
            Block::Packet(block) => block.to_bytes(byte_order),
            Block::SimplePacket(block) => block.to_bytes(byte_order),
            Block::NameResolution(block) => block.to_bytes(byte_order),
            Block::InterfaceStatistics(block) => block.to_bytes(byte_order),
            Block::Unknown(block) => encode_block(block.block_type, &block.body, byte_order),
        }
    }
    /// The captured bytes of packet-bearing blocks
    pub fn packet_data(&self) -> Option<&[u8]> {
        match self {
            Block::EnhancedPacket(block) => Some(block.packet_data()),
            Block::Packet(block) => Some(block.packet_data()),
            Block::SimplePacket(block) => Some(block.packet_data()),
            _ => None,
        }
    }
    /// The interface a packet-bearing or statistics block refers to
    ///
    /// Simple packet blocks always belong to the first interface of the section.
    pub fn interface_id(&self) -> Option<u32> {
        match self {
            Block::EnhancedPacket(block) => Some(block.interface_id),
            Block::Packet(block) => Some(u32::from(block.interface_id)),
            Block::SimplePacket(_) => Some(0),
            Block::InterfaceStatistics(block) => Some(block.interface_id),
            _ => None,
        }
    }
    pub fn is_packet(&self) -> bool {
        self.packet_data().is_some()
    }
}

/// Splits a 64 bit timestamp into the high and low halves stored in packet blocks
pub(crate) fn split_timestamp(timestamp: u64) -> (u32, u32) {
    ((timestamp >> 32) as u32, timestamp as u32)
}
pub(crate) fn join_timestamp(high: u32, low: u32) -> u64 {
    (u64::from(high) << 32) | u64::from(low)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn rejects_length_below_minimum() {
        let bytes = [1, 0, 0, 0, 11, 0, 0, 0, 0, 0, 0, 0, 11, 0, 0, 0];
        let result = read_raw_block(&mut Cursor::new(bytes), Endianness::LittleEndian);
        assert!(matches!(
            result,
            Err(FormatError::BlockTooShort {
                block_type: 1,
                length: 11
            })
        ));
    }

    #[test]
    fn rejects_unaligned_length() {
        let bytes = [0, 0, 0, 9, 0, 0, 0, 13, 0, 0, 0, 0, 0, 0, 0, 0, 13];
        let result = read_raw_block(&mut Cursor::new(bytes), Endianness::BigEndian);
        assert!(matches!(
            result,
            Err(FormatError::UnalignedBlockLength { length: 13, .. })
        ));
    }

    #[test]
    fn rejects_trailing_length_mismatch() {
        let bytes = [9, 0, 0, 0, 16, 0, 0, 0, 1, 2, 3, 4, 20, 0, 0, 0];
        let result = read_raw_block(&mut Cursor::new(bytes), Endianness::LittleEndian);
        assert!(matches!(
            result,
            Err(FormatError::BlockLengthMismatch {
                leading: 16,
                trailing: 20
            })
        ));
    }

    #[test]
    fn end_of_stream_is_a_clean_end() -> anyhow::Result<()> {
        let empty: [u8; 0] = [];
        assert!(read_raw_block(&mut Cursor::new(empty), Endianness::LittleEndian)?.is_none());
        // Cut off inside the body
        let partial = [9, 0, 0, 0, 32, 0, 0, 0, 1, 2];
        assert!(read_raw_block(&mut Cursor::new(partial), Endianness::LittleEndian)?.is_none());
        Ok(())
    }

    #[test]
    fn unknown_blocks_are_kept() -> anyhow::Result<()> {
        let bytes = encode_block(0x0BAD, &[1, 2, 3], Endianness::BigEndian)?;
        assert_eq!(bytes.len(), 16);
        assert_eq!(&bytes[4..8], &[0, 0, 0, 16]);
        assert_eq!(&bytes[12..16], &[0, 0, 0, 16]);

        let block = Block::read(&mut Cursor::new(&bytes), Endianness::BigEndian)?;
        let Some(Block::Unknown(unknown)) = block else {
            panic!("Expected an unknown block, got {block:?}");
        };
        assert_eq!(unknown.block_type, 0x0BAD);
        assert_eq!(unknown.body, vec![1, 2, 3, 0]);
        Ok(())
    }

    #[test]
    fn encoded_blocks_are_aligned() -> anyhow::Result<()> {
        for body_length in 0..9 {
            let body = vec![0xAB; body_length];
            let bytes = encode_block(6, &body, Endianness::LittleEndian)?;
            assert_eq!(bytes.len() % 4, 0);
            let raw = read_raw_block(&mut Cursor::new(&bytes), Endianness::LittleEndian)?;
            let raw = raw.ok_or_else(|| anyhow::anyhow!("missing block"))?;
            assert_eq!(raw.total_length as usize, bytes.len());
            assert_eq!(&raw.body[..body_length], &body[..]);
        }
        Ok(())
    }
}
