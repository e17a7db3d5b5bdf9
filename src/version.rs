use crate::byte_order::ByteOrder;

/// Major and minor format version, shared by the pcap file header and the section header block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Version {
    pub major: u16,
    pub minor: u16,
}
impl Version {
    pub const PCAP: Version = Version { major: 2, minor: 4 };
    pub const PCAP_NG: Version = Version { major: 1, minor: 0 };
    /// Parses the version from the bytes
    #[inline(always)]
    pub(crate) fn from_bytes(bytes: [u8; 4], byte_order: impl ByteOrder) -> Self {
        let major = byte_order.u16_from_bytes([bytes[0], bytes[1]]);
        let minor = byte_order.u16_from_bytes([bytes[2], bytes[3]]);
        Self { major, minor }
    }
    pub(crate) fn to_bytes(self, byte_order: impl ByteOrder) -> [u8; 4] {
        let [a, b] = byte_order.u16_to_bytes(self.major);
        let [c, d] = byte_order.u16_to_bytes(self.minor);
        [a, b, c, d]
    }
}
