use std::io::{Seek, SeekFrom, Write};

use crate::{
    captured_packet::CapturedPacket,
    error::FormatError,
    pcap::{
        file_header::{MagicNumber, PcapFileHeader},
        packet_header::PacketHeader,
    },
    timestamp::CaptureTimestamp,
};

/// A Sync Pcap Writer
///
/// ## Why is Seek Required?
///
/// If you write a packet larger than the snap_length then the header has to be rewritten
pub struct SyncPcapWriter<W: Write + Seek> {
    target: W,
    header: PcapFileHeader,
    /// If a written packet size exceeds snap_len then this will flip to true
    requires_header_rewrite: bool,
}

impl<W: Write + Seek> SyncPcapWriter<W> {
    pub fn new(mut target: W, header: PcapFileHeader) -> Result<Self, FormatError> {
        header.write(&mut target)?;
        Ok(Self {
            target,
            header,
            requires_header_rewrite: false,
        })
    }
    pub fn file_header(&self) -> &PcapFileHeader {
        &self.header
    }

    /// Writes one record
    ///
    /// The fraction of `timestamp` is written in the resolution of the file's magic number.
    /// `original_length` defaults to the length of `content`.
    pub fn write_packet(
        &mut self,
        timestamp: CaptureTimestamp,
        content: &[u8],
        original_length: Option<u32>,
    ) -> Result<(), FormatError> {
        let include_len = content.len() as u32;
        let orig_len = original_length.unwrap_or(include_len);
        if include_len > orig_len {
            return Err(FormatError::CapturedExceedsOriginal {
                captured: include_len,
                original: orig_len,
            });
        }
        let ts_frac = match self.header.magic_number() {
            MagicNumber::Microsecond => timestamp.subsec_micros(),
            MagicNumber::Nanosecond => timestamp.subsec_nanos(),
        };
        let ts_sec = u32::try_from(timestamp.seconds).unwrap_or_else(|_| {
            log::warn!(
                "Timestamp {} does not fit a pcap record, writing 0",
                timestamp.seconds
            );
            0
        });
        let new_header = PacketHeader::new(ts_sec, ts_frac, include_len, orig_len);
        if new_header.include_len > self.header.snap_length {
            self.requires_header_rewrite = true;
            self.header.snap_length = new_header.include_len;
        }

        new_header.write(&mut self.target, self.header.endianness())?;
        self.target.write_all(content)?;
        Ok(())
    }
    pub fn write_captured(&mut self, packet: &CapturedPacket) -> Result<(), FormatError> {
        self.write_packet(
            packet.timestamp(),
            packet.data(),
            Some(packet.original_length()),
        )
    }

    /// Rewrites the file header if needed and hands back the target
    pub fn finish(mut self) -> Result<W, FormatError> {
        if self.requires_header_rewrite {
            let end = self.target.stream_position()?;
            self.target.seek(SeekFrom::Start(0))?;
            self.header.write(&mut self.target)?;
            self.target.seek(SeekFrom::Start(end))?;
        }
        self.target.flush()?;
        Ok(self.target)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use etherparse::PacketBuilder;

    use super::*;
    use crate::{byte_order::Endianness, link_type::LinkType, pcap::sync::SyncPcapReader};

    #[test]
    fn test_write() -> anyhow::Result<()> {
        let mut packets_written = Vec::with_capacity(100);
        let mut writer = SyncPcapWriter::new(
            Cursor::new(Vec::new()),
            PcapFileHeader {
                link_type: LinkType::Ethernet,
                snap_length: 48,
                ..Default::default()
            },
        )?;
        // 2025-11-27 10:30:00 UTC
        let start = 1_764_239_400u32;
        for i in 0..100u32 {
            let builder = PacketBuilder::ethernet2([1, 2, 3, 4, 5, 6], [7, 8, 9, 10, 11, 12])
                .ipv4([192, 168, 1, 1], [192, 168, 1, 2], 20)
                .udp(21, 1234);
            let payload = [1, 2, 3, 4, 5, 6, 7, 8];
            let mut result = Vec::<u8>::with_capacity(builder.size(payload.len()));
            builder.write(&mut result, &payload)?;

            let timestamp = CaptureTimestamp::from_micros(start + i, i * 10);
            writer.write_packet(timestamp, &result, None)?;
            packets_written.push((timestamp, result))
        }
        let target = writer.finish()?;

        let mut packet_reader = SyncPcapReader::new(Cursor::new(target.into_inner()))?;
        // Frames are 50 bytes so the snap length was raised
        assert_eq!(packet_reader.file_header().snap_length, 50);
        assert_eq!(packet_reader.file_header().endianness(), Endianness::LittleEndian);
        let mut written_packets_iter = packets_written.into_iter();
        while let Some(packet) = packet_reader.next_packet()? {
            let Some((expected_ts, expected_bytes)) = written_packets_iter.next() else {
                panic!("Read more packets than were written");
            };
            assert_eq!(packet.timestamp(), expected_ts);
            assert_eq!(packet.data(), &expected_bytes[..]);
        }
        assert!(
            written_packets_iter.next().is_none(),
            "Not all packets were written"
        );
        Ok(())
    }
}
