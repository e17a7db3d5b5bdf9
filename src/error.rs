//! Errors shared by the container codecs and the dissection chain
use thiserror::Error;

/// A fixed size field or option had the wrong length.
///
/// Only the block or header containing the field is lost, readers keep going with the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Unexpected Size for {name}: expected {expected}, got {got}")]
pub struct FieldLengthError {
    pub name: &'static str,
    pub expected: usize,
    pub got: usize,
}

/// Malformed or truncated framing.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error(transparent)]
    IO(#[from] std::io::Error),
    #[error("Invalid magic number got {0:?}")]
    InvalidMagicNumber(Option<[u8; 4]>),
    #[error("Invalid endianness: got {got:?}")]
    InvalidEndianness { got: [u8; 4] },
    #[error("Block {block_type:#010x} has a total length of {length}, the minimum is 12")]
    BlockTooShort { block_type: u32, length: u32 },
    #[error("Block {block_type:#010x} has a total length of {length} which is not a multiple of 4")]
    UnalignedBlockLength { block_type: u32, length: u32 },
    #[error("Block length mismatch: leading {leading}, trailing {trailing}")]
    BlockLengthMismatch { leading: u32, trailing: u32 },
    #[error("Expected block type {expected:#010x}, got {got:#010x}")]
    UnexpectedBlockType { expected: u32, got: u32 },
    #[error("{name} needs {needed} bytes but only {available} are available")]
    Truncated {
        name: &'static str,
        needed: usize,
        available: usize,
    },
    #[error("Option {code} is {length} bytes long, the maximum is 65535")]
    OptionTooLong { code: u16, length: usize },
    #[error(
        "Invalid packet length: snap length {snap_length} is smaller than included length {incl_len}"
    )]
    InvalidPacketLength { snap_length: u32, incl_len: u32 },
    #[error("Captured length {captured} is greater than the original length {original}")]
    CapturedExceedsOriginal { captured: u32, original: u32 },
    #[error("Invalid header length of {0} bytes")]
    InvalidHeaderLength(usize),
    #[error("Block {0:#010x} does not carry packet data")]
    NotPacketBearing(u32),
    #[error("Interface {0} has not been described in this section")]
    UnknownInterface(u32),
    #[error(transparent)]
    FieldLength(#[from] FieldLengthError),
    /// This should never happen. But preventing panics
    #[error(transparent)]
    TryFromSliceError(#[from] std::array::TryFromSliceError),
}

impl FormatError {
    /// Errors that only invalidate the block being decoded.
    ///
    /// Envelope errors leave the stream position unknown and end reading.
    pub fn is_block_local(&self) -> bool {
        matches!(
            self,
            FormatError::FieldLength(_)
                | FormatError::Truncated { .. }
                | FormatError::CapturedExceedsOriginal { .. }
                | FormatError::UnexpectedBlockType { .. }
        )
    }
}
