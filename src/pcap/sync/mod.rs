//! Synchronous PCAP reader and writer
use std::io::Read;
pub mod writer;
pub use writer::SyncPcapWriter;

use crate::{
    Version,
    captured_packet::CapturedPacket,
    error::FormatError,
    pcap::{
        check_record, file_header::PcapFileHeader, packet_header::PacketHeader,
        to_captured_packet,
    },
};
/// A synchronous reader for PCAP files
#[derive(Debug)]
pub struct SyncPcapReader<R: Read> {
    reader: R,
    /// Buffer for packet data
    ///
    /// Grows to the largest record read, never past the snap length
    buffer: Vec<u8>,
    header_buffer: [u8; 16],
    file_header: PcapFileHeader,
    position: u64,
}
impl<R: Read> SyncPcapReader<R> {
    /// Creates a new `SyncPcapReader` from a reader
    /// Returns `Ok(Self)` on success, or `Err` if there was an error
    /// reading the file header
    pub fn new(mut reader: R) -> Result<Self, FormatError> {
        let file_header = PcapFileHeader::read(&mut reader)?;
        Ok(Self {
            reader,
            buffer: Vec::new(),
            file_header,
            header_buffer: [0; 16],
            position: PcapFileHeader::SIZE as u64,
        })
    }
    /// Returns the file header of the pcap file
    pub fn file_header(&self) -> &PcapFileHeader {
        &self.file_header
    }
    /// Returns the version of the pcap file
    pub fn version(&self) -> &Version {
        &self.file_header.version
    }
    /// Reads the next record, borrowing its data from the reader's buffer
    ///
    /// Returns `Ok(None)` at the end of the stream. A stream ending inside a record is logged
    /// and also treated as the end.
    pub fn next_record(&mut self) -> Result<Option<(PacketHeader, &[u8])>, FormatError> {
        if let Err(err) = self.reader.read_exact(&mut self.header_buffer) {
            if err.kind() == std::io::ErrorKind::UnexpectedEof {
                return Ok(None); // No more packets
            } else {
                return Err(FormatError::IO(err));
            }
        }
        let packet_header =
            PacketHeader::parse_bytes(&self.header_buffer, self.file_header.endianness())?;
        check_record(&packet_header, &self.file_header)?;
        let length = packet_header.include_len as usize;
        if self.buffer.len() < length {
            self.buffer.resize(length, 0);
        }
        if let Err(err) = self.reader.read_exact(&mut self.buffer[..length]) {
            if err.kind() == std::io::ErrorKind::UnexpectedEof {
                log::warn!(
                    "Stream ended inside the record at offset {}, expected {length} bytes",
                    self.position
                );
                return Ok(None);
            }
            return Err(FormatError::IO(err));
        }
        self.position += (PacketHeader::SIZE + length) as u64;

        Ok(Some((packet_header, &self.buffer[..length])))
    }
    /// Reads the next record into an owned [CapturedPacket]
    pub fn next_packet(&mut self) -> Result<Option<CapturedPacket>, FormatError> {
        let offset = self.position;
        let Some((header, data)) = self.next_record()? else {
            return Ok(None);
        };
        let data = data.to_vec();
        to_captured_packet(&header, &self.file_header, data, offset).map(Some)
    }
}
#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::{
        link_type::LinkType,
        pcap::file_header::{MagicNumber, MagicNumberAndEndianness},
        test_helpers::udp_frame,
    };

    fn nanosecond_capture() -> anyhow::Result<Vec<u8>> {
        let header = PcapFileHeader {
            magic_number_and_endianness: MagicNumberAndEndianness {
                magic_number: MagicNumber::Nanosecond,
                endianness: crate::byte_order::Endianness::BigEndian,
            },
            ..Default::default()
        };
        let mut bytes = Vec::new();
        header.write(&mut bytes)?;
        for i in 0..3u32 {
            let frame = udp_frame(&[i as u8; 8]);
            PacketHeader::new(100 + i, 2_500, frame.len() as u32, frame.len() as u32)
                .write(&mut bytes, header.endianness())?;
            bytes.extend_from_slice(&frame);
        }
        Ok(bytes)
    }

    #[test]
    fn reads_records_until_end() -> anyhow::Result<()> {
        let mut reader = SyncPcapReader::new(Cursor::new(nanosecond_capture()?))?;
        assert_eq!(reader.file_header().link_type, LinkType::Ethernet);
        let mut offsets = Vec::new();
        while let Some(packet) = reader.next_packet()? {
            assert_eq!(packet.link_type(), LinkType::Ethernet);
            // 2500 ns
            assert_eq!(packet.timestamp().subsec_micros(), 2);
            assert_eq!(packet.captured_length(), packet.original_length());
            offsets.push(packet.stream_offset());
        }
        let record = 16 + udp_frame(&[0; 8]).len() as u64;
        assert_eq!(offsets, vec![24, 24 + record, 24 + 2 * record]);
        Ok(())
    }

    #[test]
    fn record_cut_short_ends_the_stream() -> anyhow::Result<()> {
        let mut bytes = nanosecond_capture()?;
        bytes.truncate(bytes.len() - 5);
        let mut reader = SyncPcapReader::new(Cursor::new(bytes))?;
        assert!(reader.next_packet()?.is_some());
        assert!(reader.next_packet()?.is_some());
        assert!(reader.next_packet()?.is_none());
        Ok(())
    }

    #[test]
    fn record_larger_than_snap_length() -> anyhow::Result<()> {
        let header = PcapFileHeader {
            snap_length: 4,
            ..Default::default()
        };
        let mut bytes = Vec::new();
        header.write(&mut bytes)?;
        PacketHeader::new(0, 0, 8, 8).write(&mut bytes, header.endianness())?;
        bytes.extend_from_slice(&[0; 8]);

        let mut reader = SyncPcapReader::new(Cursor::new(bytes))?;
        assert!(matches!(
            reader.next_record(),
            Err(FormatError::InvalidPacketLength {
                snap_length: 4,
                incl_len: 8
            })
        ));
        Ok(())
    }

    #[test]
    fn captured_longer_than_original() -> anyhow::Result<()> {
        let header = PcapFileHeader::default();
        let mut bytes = Vec::new();
        header.write(&mut bytes)?;
        PacketHeader::new(0, 0, 8, 4).write(&mut bytes, header.endianness())?;
        bytes.extend_from_slice(&[0; 8]);

        let mut reader = SyncPcapReader::new(Cursor::new(bytes))?;
        assert!(matches!(
            reader.next_packet(),
            Err(FormatError::CapturedExceedsOriginal {
                captured: 8,
                original: 4
            })
        ));
        Ok(())
    }
}
