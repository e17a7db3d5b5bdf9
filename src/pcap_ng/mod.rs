//! This module provides pcap-ng parsing functionality
//!
//! [Source](https://www.ietf.org/archive/id/draft-tuexen-opsawg-pcapng-03.html)
//!
//! Currently, only supports reading files from beginning to end and does not support reverse
//! reading.
use crate::{byte_order::Endianness, error::FormatError};
pub mod blocks;
pub mod options;
pub mod sync;
/// Magic number for pcap-ng files
///
/// All pcap-ng files should start with this magic number
pub const PCAP_NG_MAGIC: [u8; 4] = [0x0A, 0x0D, 0x0D, 0x0A];
/// The byte-order magic stored at the start of every section header body
pub const BYTE_ORDER_MAGIC: u32 = 0x1A2B3C4D;

impl Endianness {
    pub fn from_pcap_ng_bytes(bytes: &[u8; 4]) -> Result<Self, FormatError> {
        match bytes {
            [0x1A, 0x2B, 0x3C, 0x4D] => Ok(Self::BigEndian),
            [0x4D, 0x3C, 0x2B, 0x1A] => Ok(Self::LittleEndian),
            _ => Err(FormatError::InvalidEndianness { got: *bytes }),
        }
    }
}

/// Pads the length to the next multiple of 32 bits
pub(crate) fn pad_length_to_32_bits(length: usize) -> usize {
    if length.is_multiple_of(4) {
        length
    } else {
        length + (4 - (length % 4))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn test_pad_length_to_32_bits() {
        assert_eq!(pad_length_to_32_bits(0), 0);
        assert_eq!(pad_length_to_32_bits(1), 4);
        assert_eq!(pad_length_to_32_bits(3), 4);
        assert_eq!(pad_length_to_32_bits(4), 4);
        assert_eq!(pad_length_to_32_bits(5), 8);
        assert_eq!(pad_length_to_32_bits(9), 12);
    }
    #[test]
    fn byte_order_magic() {
        assert_eq!(
            Endianness::from_pcap_ng_bytes(&BYTE_ORDER_MAGIC.to_le_bytes()).ok(),
            Some(Endianness::LittleEndian)
        );
        assert_eq!(
            Endianness::from_pcap_ng_bytes(&BYTE_ORDER_MAGIC.to_be_bytes()).ok(),
            Some(Endianness::BigEndian)
        );
        assert!(Endianness::from_pcap_ng_bytes(&[0; 4]).is_err());
    }
}
