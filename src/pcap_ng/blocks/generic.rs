use crate::pcap_ng::blocks::RawBlock;

/// A block with a type this crate does not decode
///
/// Used for unknown block ids or custom blocks. The body is kept as read, including any padding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownBlock {
    pub block_type: u32,
    pub body: Vec<u8>,
}
impl UnknownBlock {
    pub fn new(block_type: u32, body: Vec<u8>) -> Self {
        Self { block_type, body }
    }
    pub(crate) fn from_raw(raw: RawBlock) -> Self {
        Self::new(raw.block_type, raw.body)
    }
}
