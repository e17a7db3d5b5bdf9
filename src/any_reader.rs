use std::io::Read;

use crate::{
    captured_packet::CapturedPacket,
    error::FormatError,
    pcap::{SyncPcapReader, file_header::MagicNumberAndEndianness},
    pcap_ng::{PCAP_NG_MAGIC, sync::SyncPcapNgReader},
    utils::PeakableReader,
};

/// The two container formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureFormat {
    Pcap,
    PcapNg,
}
impl CaptureFormat {
    /// Bytes needed to recognise either format
    pub const SNIFF_LENGTH: usize = 12;

    /// Determines the format from the first bytes of a stream
    ///
    /// PCAP-NG needs the section header type followed, after the length, by a valid byte-order
    /// magic. PCAP needs one of its four magic numbers.
    pub fn sniff(prefix: &[u8]) -> Result<Self, FormatError> {
        let Some(magic) = prefix.get(0..4) else {
            return Err(FormatError::InvalidMagicNumber(None));
        };
        let magic: [u8; 4] = magic.try_into()?;
        if magic == PCAP_NG_MAGIC {
            let byte_order_magic = prefix
                .get(8..12)
                .ok_or(FormatError::InvalidMagicNumber(Some(magic)))?;
            let byte_order_magic: [u8; 4] = byte_order_magic.try_into()?;
            return match crate::byte_order::Endianness::from_pcap_ng_bytes(&byte_order_magic) {
                Ok(_) => Ok(CaptureFormat::PcapNg),
                Err(_) => Err(FormatError::InvalidMagicNumber(Some(magic))),
            };
        }
        MagicNumberAndEndianness::try_from(magic).map(|_| CaptureFormat::Pcap)
    }
}

#[derive(Debug)]
enum SyncAnyCaptureReaderInner<R: Read> {
    Pcap(SyncPcapReader<PeakableReader<R>>),
    PcapNg(SyncPcapNgReader<PeakableReader<R>>),
}

/// A reader that can read both pcap and pcapng files
///
/// # When Should I use this?
///
/// When the only requirement is to read packets from either pcap or pcapng files,
/// and you do not need to access file-specific metadata or features.
///
/// # How is is the the file type determined?
///
/// The first twelve bytes are peeked and given to [CaptureFormat::sniff]. They are replayed to
/// the format's own reader, so nothing is read twice from the source.
#[derive(Debug)]
pub struct SyncAnyCaptureReader<R: Read> {
    inner: SyncAnyCaptureReaderInner<R>,
}
impl<R: Read> SyncAnyCaptureReader<R> {
    pub fn new(reader: R) -> Result<Self, FormatError> {
        let peakable = PeakableReader::new(reader, CaptureFormat::SNIFF_LENGTH)?;
        let format = CaptureFormat::sniff(peakable.peak().unwrap_or_default())?;
        log::debug!("Reading capture as {format:?}");
        let inner = match format {
            CaptureFormat::Pcap => SyncAnyCaptureReaderInner::Pcap(SyncPcapReader::new(peakable)?),
            CaptureFormat::PcapNg => {
                SyncAnyCaptureReaderInner::PcapNg(SyncPcapNgReader::new(peakable)?)
            }
        };
        Ok(Self { inner })
    }
    /// Reads the next packet from the pcap or pcapng file
    ///
    /// Non-packet PCAP-NG blocks are consumed on the way.
    pub fn next_packet(&mut self) -> Result<Option<CapturedPacket>, FormatError> {
        match &mut self.inner {
            SyncAnyCaptureReaderInner::Pcap(reader) => reader.next_packet(),
            SyncAnyCaptureReaderInner::PcapNg(reader) => reader.next_packet(),
        }
    }
    /// Returns the type of the pcap file
    pub fn format(&self) -> CaptureFormat {
        match &self.inner {
            SyncAnyCaptureReaderInner::Pcap(_) => CaptureFormat::Pcap,
            SyncAnyCaptureReaderInner::PcapNg(_) => CaptureFormat::PcapNg,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::{
        byte_order::Endianness,
        link_type::LinkType,
        pcap::{SyncPcapWriter, file_header::PcapFileHeader},
        pcap_ng::{
            blocks::{InterfaceDescriptionBlock, SectionHeaderBlock},
            sync::SyncPcapNgWriter,
        },
        test_helpers::udp_frame,
        timestamp::CaptureTimestamp,
    };

    #[test]
    fn sniff_prefixes() -> anyhow::Result<()> {
        let pcapng = [0x0A, 0x0D, 0x0D, 0x0A, 28, 0, 0, 0, 0x4D, 0x3C, 0x2B, 0x1A];
        assert_eq!(CaptureFormat::sniff(&pcapng)?, CaptureFormat::PcapNg);
        for magic in [
            [0xA1, 0xB2, 0xC3, 0xD4],
            [0xD4, 0xC3, 0xB2, 0xA1],
            [0xA1, 0xB2, 0x3C, 0x4D],
            [0x4D, 0x3C, 0xB2, 0xA1],
        ] {
            assert_eq!(CaptureFormat::sniff(&magic)?, CaptureFormat::Pcap);
        }
        assert!(matches!(
            CaptureFormat::sniff(&[1, 2, 3, 4, 5]),
            Err(FormatError::InvalidMagicNumber(Some([1, 2, 3, 4])))
        ));
        // Section header type without room for the byte-order magic
        assert!(CaptureFormat::sniff(&pcapng[..8]).is_err());
        assert!(matches!(
            CaptureFormat::sniff(&[0xA1]),
            Err(FormatError::InvalidMagicNumber(None))
        ));
        Ok(())
    }

    #[test]
    fn reads_either_format() -> anyhow::Result<()> {
        let frame = udp_frame(b"either");
        let timestamp = CaptureTimestamp::from_micros(42, 7);

        let mut pcap = SyncPcapWriter::new(Cursor::new(Vec::new()), PcapFileHeader::default())?;
        pcap.write_packet(timestamp, &frame, None)?;
        let pcap = pcap.finish()?.into_inner();

        let mut pcapng =
            SyncPcapNgWriter::new(Vec::new(), SectionHeaderBlock::new(Endianness::BigEndian))?;
        pcapng.add_interface(InterfaceDescriptionBlock::new(LinkType::Ethernet, 0))?;
        pcapng.write_packet(0, timestamp, &frame, None)?;
        let pcapng = pcapng.into_inner();

        for (bytes, format) in [(pcap, CaptureFormat::Pcap), (pcapng, CaptureFormat::PcapNg)] {
            let mut reader = SyncAnyCaptureReader::new(Cursor::new(bytes))?;
            assert_eq!(reader.format(), format);
            let packet = reader
                .next_packet()?
                .ok_or_else(|| anyhow::anyhow!("no packet in {format:?}"))?;
            assert_eq!(packet.data(), &frame[..]);
            assert_eq!(packet.timestamp(), timestamp);
            assert!(reader.next_packet()?.is_none());
        }
        Ok(())
    }
}
