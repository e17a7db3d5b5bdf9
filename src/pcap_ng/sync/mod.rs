//! Synchronous PCAP-NG reader and writer
use std::io::{Cursor, Read};

mod writer;
pub use writer::SyncPcapNgWriter;

use crate::{
    byte_order::{Endianness, ReadExt},
    captured_packet::CapturedPacket,
    error::FormatError,
    pcap_ng::{
        PCAP_NG_MAGIC,
        blocks::{
            Block, BlockCodec, InterfaceDescriptionBlock, RawBlock, SectionHeaderBlock,
            read_raw_block,
        },
    },
    timestamp::CaptureTimestamp,
};

/// A synchronous reader for PCAP-NG files
///
/// Blocks are read one at a time. The reader keeps the current section header and the
/// interfaces described since it, which is what is needed to interpret packet blocks.
#[derive(Debug)]
pub struct SyncPcapNgReader<R: Read> {
    reader: R,
    byte_order: Endianness,
    /// The current section header block
    current_section: SectionHeaderBlock,
    /// The interfaces described in the current section, by interface id
    ///
    /// `None` marks a description whose body could not be decoded, so later ids keep their
    /// place. Will reset each time a section header block envelope is read
    interfaces: Vec<Option<InterfaceDescriptionBlock>>,
    position: u64,
    last_block_offset: u64,
}
impl<R: Read> SyncPcapNgReader<R> {
    /// Creates a new reader, consuming the first section header
    ///
    /// Fails with [FormatError::InvalidMagicNumber] if the stream does not start with one.
    pub fn new(mut reader: R) -> Result<Self, FormatError> {
        let magic = match reader.read_bytes::<4>() {
            Ok(magic) => magic,
            Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => {
                return Err(FormatError::InvalidMagicNumber(None));
            }
            Err(err) => return Err(err.into()),
        };
        if magic != PCAP_NG_MAGIC {
            return Err(FormatError::InvalidMagicNumber(Some(magic)));
        }
        let raw = read_raw_block(
            &mut Cursor::new(magic).chain(&mut reader),
            Endianness::LittleEndian,
        )?
        .ok_or(FormatError::InvalidMagicNumber(Some(magic)))?;
        let total_length = raw.total_length;
        let current_section = SectionHeaderBlock::from_raw(raw)?;
        Ok(Self {
            reader,
            byte_order: current_section.byte_order,
            current_section,
            interfaces: Vec::with_capacity(1),
            position: u64::from(total_length),
            last_block_offset: 0,
        })
    }
    /// Returns the section header that applies to the next block
    pub fn current_section(&self) -> &SectionHeaderBlock {
        &self.current_section
    }
    /// Returns the interfaces described in the current section
    ///
    /// Descriptions that failed to decode are `None`.
    pub fn interfaces(&self) -> &[Option<InterfaceDescriptionBlock>] {
        &self.interfaces
    }
    pub fn interface(&self, interface_id: u32) -> Option<&InterfaceDescriptionBlock> {
        self.interfaces
            .get(interface_id as usize)
            .and_then(Option::as_ref)
    }
    /// Logs why a packet on `interface_id` can not be interpreted
    pub(crate) fn warn_unusable_interface(&self, interface_id: u32) {
        if self.interfaces.len() > interface_id as usize {
            log::warn!(
                "Packet block at offset {} references malformed interface {interface_id}",
                self.last_block_offset
            );
        } else {
            log::warn!(
                "Packet block at offset {} references undescribed interface {interface_id}",
                self.last_block_offset
            );
        }
    }
    pub fn byte_order(&self) -> Endianness {
        self.byte_order
    }
    /// Stream offset of the most recently read block
    pub fn last_block_offset(&self) -> u64 {
        self.last_block_offset
    }
    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Reads the next block envelope without decoding its body
    ///
    /// A section header switches the byte order used for the blocks after it and forgets the
    /// interfaces of the previous section, even if its body later fails to decode.
    pub fn next_raw_block(&mut self) -> Result<Option<RawBlock>, FormatError> {
        let Some(raw) = read_raw_block(&mut self.reader, self.byte_order)? else {
            return Ok(None);
        };
        self.last_block_offset = self.position;
        self.position += u64::from(raw.total_length);
        if raw.block_type == SectionHeaderBlock::BLOCK_TYPE {
            self.byte_order = raw.byte_order;
            self.interfaces.clear();
        }
        Ok(Some(raw))
    }
    /// Decodes a block read by [Self::next_raw_block] and updates the section state
    ///
    /// Errors here only concern this block. The stream is already positioned at the next one.
    pub fn decode_block(&mut self, raw: RawBlock) -> Result<Block, FormatError> {
        let block_type = raw.block_type;
        let block = match Block::from_raw(raw) {
            Ok(block) => block,
            Err(err) => {
                if block_type == InterfaceDescriptionBlock::BLOCK_TYPE {
                    // Keeps the ids of the interfaces described after this one
                    self.interfaces.push(None);
                }
                return Err(err);
            }
        };
        match &block {
            Block::SectionHeader(section_header) => {
                self.current_section = section_header.clone();
            }
            Block::InterfaceDescription(interface) => {
                self.interfaces.push(Some(interface.clone()));
            }
            _ => {}
        }
        Ok(block)
    }
    pub fn next_block(&mut self) -> Result<Option<Block>, FormatError> {
        let Some(raw) = self.next_raw_block()? else {
            return Ok(None);
        };
        self.decode_block(raw).map(Some)
    }
    /// Reads the next packet from the pcapng file
    ///
    /// If any other block types are encountered, they will be skipped until a packet block is
    /// found. Packets referencing an interface that was never described are logged and skipped.
    ///
    /// When Ok(None) is returned, it indicates the end of the file has been reached
    pub fn next_packet(&mut self) -> Result<Option<CapturedPacket>, FormatError> {
        while let Some(block) = self.next_block()? {
            if !block.is_packet() {
                continue;
            }
            if let Some(packet) = self.to_captured_packet(block)? {
                return Ok(Some(packet));
            }
        }
        Ok(None)
    }
    /// Converts a packet-bearing block using the interface it was captured on
    ///
    /// Returns `Ok(None)` when the interface is unknown in the current section or its
    /// description could not be decoded.
    pub fn to_captured_packet(&self, block: Block) -> Result<Option<CapturedPacket>, FormatError> {
        let Some(interface_id) = block.interface_id().filter(|_| block.is_packet()) else {
            return Err(FormatError::NotPacketBearing(block.block_type()));
        };
        let Some(interface) = self.interface(interface_id) else {
            self.warn_unusable_interface(interface_id);
            return Ok(None);
        };
        let (units, original_length, data) = match block {
            Block::EnhancedPacket(packet) => (
                packet.timestamp,
                packet.original_length,
                packet.into_packet_data(),
            ),
            Block::Packet(packet) => (
                packet.timestamp,
                packet.original_length,
                packet.into_packet_data(),
            ),
            // No timestamp is stored, the packet is placed at the interface's offset
            Block::SimplePacket(packet) => (0, packet.original_length, packet.into_packet_data()),
            other => return Err(FormatError::NotPacketBearing(other.block_type())),
        };
        let timestamp = CaptureTimestamp::from_units(
            units,
            interface.timestamp_resolution(),
            interface.timestamp_offset(),
        );
        let packet = CapturedPacket::new(timestamp, original_length, data, interface.link_type)?
            .with_stream_offset(self.last_block_offset)
            .with_interface_id(interface_id);
        Ok(Some(packet))
    }
}
