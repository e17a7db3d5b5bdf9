use std::io::Write;

use crate::{
    byte_order::Endianness,
    error::FormatError,
    pcap_ng::blocks::{
        Block, BlockCodec, EnhancedPacketBlock, InterfaceDescriptionBlock, SectionHeaderBlock,
    },
    timestamp::CaptureTimestamp,
};

/// A Sync PCAP-NG Writer
///
/// Every block is written in the byte order of the section it belongs to. Packets are written as
/// enhanced packet blocks with their timestamp converted to the interface's resolution.
#[derive(Debug)]
pub struct SyncPcapNgWriter<W: Write> {
    target: W,
    byte_order: Endianness,
    /// Interfaces written since the last section header
    interfaces: Vec<InterfaceDescriptionBlock>,
}

impl<W: Write> SyncPcapNgWriter<W> {
    /// Writes `section` and starts it
    pub fn new(mut target: W, section: SectionHeaderBlock) -> Result<Self, FormatError> {
        target.write_all(&section.to_bytes(section.byte_order)?)?;
        Ok(Self {
            target,
            byte_order: section.byte_order,
            interfaces: Vec::new(),
        })
    }
    /// Ends the current section and starts another, which may use a different byte order
    pub fn new_section(&mut self, section: SectionHeaderBlock) -> Result<(), FormatError> {
        self.target
            .write_all(&section.to_bytes(section.byte_order)?)?;
        self.byte_order = section.byte_order;
        self.interfaces.clear();
        Ok(())
    }
    /// Writes an interface description and returns the id packets should reference
    pub fn add_interface(
        &mut self,
        interface: InterfaceDescriptionBlock,
    ) -> Result<u32, FormatError> {
        self.target
            .write_all(&interface.to_bytes(self.byte_order)?)?;
        self.interfaces.push(interface);
        Ok(self.interfaces.len() as u32 - 1)
    }
    /// Writes one packet
    ///
    /// `original_length` defaults to the length of `data`.
    pub fn write_packet(
        &mut self,
        interface_id: u32,
        timestamp: CaptureTimestamp,
        data: &[u8],
        original_length: Option<u32>,
    ) -> Result<(), FormatError> {
        let interface = self
            .interfaces
            .get(interface_id as usize)
            .ok_or(FormatError::UnknownInterface(interface_id))?;
        let captured = data.len() as u32;
        let original_length = original_length.unwrap_or(captured);
        if captured > original_length {
            return Err(FormatError::CapturedExceedsOriginal {
                captured,
                original: original_length,
            });
        }
        let units =
            timestamp.to_units(interface.timestamp_resolution(), interface.timestamp_offset());
        let packet = EnhancedPacketBlock::new(interface_id, units, data.to_vec(), original_length);
        self.target.write_all(&packet.to_bytes(self.byte_order)?)?;
        Ok(())
    }
    /// Writes any block
    ///
    /// Section headers and interface descriptions update the writer's state the same way
    /// [Self::new_section] and [Self::add_interface] do.
    pub fn write_block(&mut self, block: &Block) -> Result<(), FormatError> {
        match block {
            Block::SectionHeader(section) => self.new_section(section.clone()),
            Block::InterfaceDescription(interface) => {
                self.add_interface(interface.clone()).map(|_| ())
            }
            other => {
                self.target.write_all(&other.to_bytes(self.byte_order)?)?;
                Ok(())
            }
        }
    }
    pub fn byte_order(&self) -> Endianness {
        self.byte_order
    }
    pub fn flush(&mut self) -> Result<(), FormatError> {
        self.target.flush()?;
        Ok(())
    }
    pub fn into_inner(self) -> W {
        self.target
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::{
        link_type::LinkType,
        pcap_ng::{
            blocks::{NameRecord, NameResolutionBlock},
            sync::SyncPcapNgReader,
        },
    };

    #[test]
    fn blocks_come_back_in_order() -> anyhow::Result<()> {
        let mut section = SectionHeaderBlock::new(Endianness::BigEndian);
        section.options.user_application = Some("writer test".into());
        let mut writer = SyncPcapNgWriter::new(Vec::new(), section.clone())?;
        let interface = InterfaceDescriptionBlock::new(LinkType::Ethernet, 65535);
        assert_eq!(writer.add_interface(interface.clone())?, 0);
        let names = Block::NameResolution(NameResolutionBlock {
            records: vec![NameRecord::Ipv4 {
                address: [10, 0, 0, 1].into(),
                names: vec!["host".into()],
            }],
            options: Default::default(),
        });
        writer.write_block(&names)?;
        writer.write_packet(0, CaptureTimestamp::from_micros(5, 6), &[1, 2, 3], Some(60))?;

        let mut reader = SyncPcapNgReader::new(Cursor::new(writer.into_inner()))?;
        assert_eq!(reader.current_section(), &section);
        assert_eq!(
            reader.next_block()?,
            Some(Block::InterfaceDescription(interface))
        );
        assert_eq!(reader.next_block()?, Some(names));
        let Some(Block::EnhancedPacket(packet)) = reader.next_block()? else {
            panic!("Expected an enhanced packet block");
        };
        assert_eq!(packet.timestamp, 5_000_006);
        assert_eq!(packet.original_length, 60);
        assert_eq!(packet.packet_data(), &[1, 2, 3]);
        Ok(())
    }

    #[test]
    fn interface_offset_survives_a_round_trip() -> anyhow::Result<()> {
        let mut writer =
            SyncPcapNgWriter::new(Vec::new(), SectionHeaderBlock::new(Endianness::LittleEndian))?;
        let mut interface = InterfaceDescriptionBlock::new(LinkType::Ethernet, 0);
        interface.options.timestamp_offset = Some(1_000);
        writer.add_interface(interface)?;
        let timestamp = CaptureTimestamp::from_micros(1_500, 42);
        writer.write_packet(0, timestamp, &[1, 2, 3], None)?;

        let mut reader = SyncPcapNgReader::new(Cursor::new(writer.into_inner()))?;
        let packet = reader
            .next_packet()?
            .ok_or_else(|| anyhow::anyhow!("missing packet"))?;
        assert_eq!(packet.timestamp(), timestamp);
        Ok(())
    }

    #[test]
    fn packets_need_an_interface() -> anyhow::Result<()> {
        let mut writer =
            SyncPcapNgWriter::new(Vec::new(), SectionHeaderBlock::new(Endianness::LittleEndian))?;
        let result = writer.write_packet(0, CaptureTimestamp::from_micros(0, 0), &[0], None);
        assert!(matches!(result, Err(FormatError::UnknownInterface(0))));
        Ok(())
    }
}
