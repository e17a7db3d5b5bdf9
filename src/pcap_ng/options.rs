//! Type-length-value options carried at the end of most block bodies
//!
//! Each record is `code (2) | length (2) | value | padding to 32 bits`, terminated by a record with
//! code 0. [read_options] yields borrowed views over the block body. The typed option sets of each
//! block (see [crate::pcap_ng::blocks]) copy out only what they keep.
use crate::{
    byte_order::{ByteOrder, Endianness, exact_array},
    error::{FieldLengthError, FormatError},
    pcap_ng::pad_length_to_32_bits,
};

macro_rules! define_options_enum {
    (
        $(#[$docs:meta])*
        enum $name:ident {
            $(
                $(#[$variant_docs:meta])*
                $variant:ident = $value:literal,
            )*
        }
    ) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        $(#[$docs])*
        pub enum $name {
            $(
                $(#[$variant_docs])*
                $variant = $value,
            )*
        }

        impl TryFrom<u16> for $name {
            type Error = ();

            fn try_from(value: u16) -> Result<Self, Self::Error> {
                match value {
                    $(
                        $value => Ok(Self::$variant),
                    )*
                    _ => Err(()),
                }
            }
        }

    };
}
pub(crate) use define_options_enum;
define_options_enum! {
    /// Codes valid in every block
    enum StandardOptions {
        EndOfOptions = 0,
        Comment = 1,
        CustomUTF8Copied = 2988,
        CustomBinaryCopied = 2989,
        CustomUTF8NotCopied = 19372,
        CustomBinaryNotCopied = 19373,
    }
}
impl StandardOptions {
    pub fn is_custom(&self) -> bool {
        matches!(
            self,
            Self::CustomBinaryCopied
                | Self::CustomBinaryNotCopied
                | Self::CustomUTF8Copied
                | Self::CustomUTF8NotCopied
        )
    }
}

/// One option record, borrowing its value from the block body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockOption<'a> {
    pub code: u16,
    pub value: &'a [u8],
}
impl<'a> BlockOption<'a> {
    /// UTF-8 value with any trailing NUL padding some writers include
    pub fn string_lossy(&self) -> String {
        let trimmed = match self.value.iter().rposition(|byte| *byte != 0) {
            Some(last) => &self.value[..=last],
            None => &[],
        };
        String::from_utf8_lossy(trimmed).into_owned()
    }
    pub fn fixed<const SIZE: usize>(
        &self,
        name: &'static str,
    ) -> Result<[u8; SIZE], FieldLengthError> {
        exact_array(self.value, name)
    }
    pub fn u8(&self, name: &'static str) -> Result<u8, FieldLengthError> {
        Ok(self.fixed::<1>(name)?[0])
    }
    pub fn u32(&self, byte_order: Endianness, name: &'static str) -> Result<u32, FieldLengthError> {
        Ok(byte_order.u32_from_bytes(self.fixed(name)?))
    }
    pub fn u64(&self, byte_order: Endianness, name: &'static str) -> Result<u64, FieldLengthError> {
        Ok(byte_order.u64_from_bytes(self.fixed(name)?))
    }
    /// Timestamps inside options use the same high/low split as packet blocks
    pub fn timestamp(
        &self,
        byte_order: Endianness,
        name: &'static str,
    ) -> Result<u64, FieldLengthError> {
        let bytes: [u8; 8] = self.fixed(name)?;
        let high = byte_order.u32_from_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let low = byte_order.u32_from_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        Ok((u64::from(high) << 32) | u64::from(low))
    }
}

/// An option the typed sets do not interpret, kept so it survives a rewrite
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawOption {
    pub code: u16,
    pub value: Vec<u8>,
}
impl RawOption {
    /// Private Enterprise Number (PEN)
    ///
    /// Only present if the option is a custom option
    pub fn custom_pen(&self, byte_order: Endianness) -> Option<u32> {
        let custom = StandardOptions::try_from(self.code).is_ok_and(|code| code.is_custom());
        if !custom {
            return None;
        }
        let pen = self.value.get(0..4)?;
        Some(byte_order.u32_from_bytes([pen[0], pen[1], pen[2], pen[3]]))
    }
}
impl From<&BlockOption<'_>> for RawOption {
    fn from(option: &BlockOption<'_>) -> Self {
        Self {
            code: option.code,
            value: option.value.to_vec(),
        }
    }
}

/// Reads options until the end-of-options record or the end of `buffer`
///
/// Returns the options and the number of bytes consumed, which never exceeds `buffer.len()`.
pub fn read_options(
    buffer: &[u8],
    byte_order: Endianness,
) -> Result<(Vec<BlockOption<'_>>, usize), FormatError> {
    let mut options = Vec::new();
    let mut offset = 0;
    while offset < buffer.len() {
        let remaining = &buffer[offset..];
        if remaining.len() < 4 {
            return Err(FormatError::Truncated {
                name: "option header",
                needed: 4,
                available: remaining.len(),
            });
        }
        let code = byte_order.u16_from_bytes([remaining[0], remaining[1]]);
        let length = byte_order.u16_from_bytes([remaining[2], remaining[3]]) as usize;
        offset += 4;
        if code == StandardOptions::EndOfOptions as u16 {
            break;
        }
        let value = buffer
            .get(offset..offset + length)
            .ok_or(FormatError::Truncated {
                name: "option value",
                needed: length,
                available: buffer.len() - offset,
            })?;
        options.push(BlockOption { code, value });
        // A final option missing its padding is tolerated
        offset = (offset + pad_length_to_32_bits(length)).min(buffer.len());
    }
    Ok((options, offset))
}

/// Encodes options one record at a time
///
/// The end-of-options record is only appended by [OptionsWriter::finish] when at least one
/// option was written, so blocks without options end right after their fixed fields.
#[derive(Debug)]
pub struct OptionsWriter {
    byte_order: Endianness,
    buffer: Vec<u8>,
    written: bool,
}
impl OptionsWriter {
    pub fn new(byte_order: Endianness) -> Self {
        Self {
            byte_order,
            buffer: Vec::new(),
            written: false,
        }
    }
    pub fn byte_order(&self) -> Endianness {
        self.byte_order
    }
    pub fn push(&mut self, code: u16, value: &[u8]) -> Result<(), FormatError> {
        let length = u16::try_from(value.len()).map_err(|_| FormatError::OptionTooLong {
            code,
            length: value.len(),
        })?;
        self.buffer
            .extend_from_slice(&self.byte_order.u16_to_bytes(code));
        self.buffer
            .extend_from_slice(&self.byte_order.u16_to_bytes(length));
        self.buffer.extend_from_slice(value);
        let padding = pad_length_to_32_bits(value.len()) - value.len();
        self.buffer.extend(std::iter::repeat_n(0u8, padding));
        self.written = true;
        Ok(())
    }
    pub fn push_str(&mut self, code: u16, value: &str) -> Result<(), FormatError> {
        self.push(code, value.as_bytes())
    }
    pub fn push_u32(&mut self, code: u16, value: u32) -> Result<(), FormatError> {
        let bytes = self.byte_order.u32_to_bytes(value);
        self.push(code, &bytes)
    }
    pub fn push_u64(&mut self, code: u16, value: u64) -> Result<(), FormatError> {
        let bytes = self.byte_order.u64_to_bytes(value);
        self.push(code, &bytes)
    }
    pub fn push_timestamp(&mut self, code: u16, value: u64) -> Result<(), FormatError> {
        let mut bytes = [0u8; 8];
        bytes[..4].copy_from_slice(&self.byte_order.u32_to_bytes((value >> 32) as u32));
        bytes[4..].copy_from_slice(&self.byte_order.u32_to_bytes(value as u32));
        self.push(code, &bytes)
    }
    pub(crate) fn push_common(
        &mut self,
        comments: &[String],
        unknown: &[RawOption],
    ) -> Result<(), FormatError> {
        for comment in comments {
            self.push_str(StandardOptions::Comment as u16, comment)?;
        }
        for option in unknown {
            self.push(option.code, &option.value)?;
        }
        Ok(())
    }
    pub fn is_empty(&self) -> bool {
        !self.written
    }
    pub fn finish(mut self) -> Vec<u8> {
        if self.written {
            self.buffer.extend_from_slice(&[0u8; 4]);
        }
        self.buffer
    }
}

/// Encodes untyped options
pub fn write_options(
    options: &[BlockOption<'_>],
    byte_order: Endianness,
) -> Result<Vec<u8>, FormatError> {
    let mut writer = OptionsWriter::new(byte_order);
    for option in options {
        writer.push(option.code, option.value)?;
    }
    Ok(writer.finish())
}

/// The typed options of one block type
pub trait OptionSet: Sized + Default {
    /// Used in diagnostics
    const BLOCK_NAME: &'static str;

    fn decode(options: &[BlockOption<'_>], byte_order: Endianness) -> Result<Self, FormatError>;

    fn encode(&self, writer: &mut OptionsWriter) -> Result<(), FormatError>;

    /// Reads the options region of a block body
    fn parse(buffer: &[u8], byte_order: Endianness) -> Result<Self, FormatError> {
        let (options, _) = read_options(buffer, byte_order)?;
        Self::decode(&options, byte_order)
    }

    fn to_bytes(&self, byte_order: Endianness) -> Result<Vec<u8>, FormatError> {
        let mut writer = OptionsWriter::new(byte_order);
        self.encode(&mut writer)?;
        Ok(writer.finish())
    }
}

/// Handles the comment option and keeps anything else as a [RawOption]
pub(crate) fn decode_common(
    block_name: &'static str,
    option: &BlockOption<'_>,
    comments: &mut Vec<String>,
    unknown: &mut Vec<RawOption>,
) {
    match StandardOptions::try_from(option.code) {
        Ok(StandardOptions::Comment) => comments.push(option.string_lossy()),
        Ok(code) if code.is_custom() => unknown.push(option.into()),
        _ => {
            log::debug!(
                "Unknown {block_name} option code {} ({} bytes)",
                option.code,
                option.value.len()
            );
            unknown.push(option.into());
        }
    }
}
