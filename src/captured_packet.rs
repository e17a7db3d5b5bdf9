use crate::{error::FormatError, link_type::LinkType, timestamp::CaptureTimestamp};

/// A packet record independent of the container it was read from
///
/// The record owns the captured bytes. Every protocol view produced by
/// [crate::dissect] borrows a sub-range of [CapturedPacket::data].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedPacket {
    timestamp: CaptureTimestamp,
    original_length: u32,
    data: Vec<u8>,
    stream_offset: u64,
    link_type: LinkType,
    interface_id: Option<u32>,
}

impl CapturedPacket {
    /// Fails if more bytes were captured than the packet originally had
    pub fn new(
        timestamp: CaptureTimestamp,
        original_length: u32,
        data: Vec<u8>,
        link_type: LinkType,
    ) -> Result<Self, FormatError> {
        let captured = u32::try_from(data.len()).unwrap_or(u32::MAX);
        if captured > original_length {
            return Err(FormatError::CapturedExceedsOriginal {
                captured,
                original: original_length,
            });
        }
        Ok(Self {
            timestamp,
            original_length,
            data,
            stream_offset: 0,
            link_type,
            interface_id: None,
        })
    }
    pub(crate) fn with_stream_offset(mut self, offset: u64) -> Self {
        self.stream_offset = offset;
        self
    }
    pub(crate) fn with_interface_id(mut self, interface_id: u32) -> Self {
        self.interface_id = Some(interface_id);
        self
    }
    pub fn timestamp(&self) -> CaptureTimestamp {
        self.timestamp
    }
    /// Always equal to `data().len()`
    pub fn captured_length(&self) -> u32 {
        self.data.len() as u32
    }
    pub fn original_length(&self) -> u32 {
        self.original_length
    }
    pub fn data(&self) -> &[u8] {
        &self.data
    }
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
    /// Byte offset of the record in the capture stream, for diagnostics
    pub fn stream_offset(&self) -> u64 {
        self.stream_offset
    }
    pub fn link_type(&self) -> LinkType {
        self.link_type
    }
    /// The PCAP-NG interface the packet was captured on
    pub fn interface_id(&self) -> Option<u32> {
        self.interface_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_captured_longer_than_original() {
        let result = CapturedPacket::new(
            CaptureTimestamp::from_micros(0, 0),
            2,
            vec![0; 3],
            LinkType::Ethernet,
        );
        assert!(matches!(
            result,
            Err(FormatError::CapturedExceedsOriginal {
                captured: 3,
                original: 2
            })
        ));
    }

    #[test]
    fn truncated_capture() -> anyhow::Result<()> {
        let packet = CapturedPacket::new(
            CaptureTimestamp::from_micros(1, 2),
            1500,
            vec![0; 64],
            LinkType::Ethernet,
        )?
        .with_stream_offset(24);
        assert_eq!(packet.captured_length(), 64);
        assert_eq!(packet.original_length(), 1500);
        assert_eq!(packet.stream_offset(), 24);
        assert_eq!(packet.interface_id(), None);
        Ok(())
    }
}
