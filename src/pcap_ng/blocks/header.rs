use crate::{
    Version,
    byte_order::{ByteOrder, Endianness},
    error::FormatError,
    pcap_ng::{
        BYTE_ORDER_MAGIC,
        blocks::BlockCodec,
        options::{
            BlockOption, OptionSet, OptionsWriter, RawOption, decode_common, define_options_enum,
        },
    },
    utils::{field_at, require_len},
};
define_options_enum! {
    enum SHBOptionCodes {
        Hardware = 2,
        OS = 3,
        UserApplication = 4,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SectionHeaderOptions {
    pub comments: Vec<String>,
    pub hardware: Option<String>,
    pub os: Option<String>,
    pub user_application: Option<String>,
    pub unknown: Vec<RawOption>,
}
impl OptionSet for SectionHeaderOptions {
    const BLOCK_NAME: &'static str = "section header";

    fn decode(options: &[BlockOption<'_>], _byte_order: Endianness) -> Result<Self, FormatError> {
        let mut result = Self::default();
        for option in options {
            match SHBOptionCodes::try_from(option.code) {
                Ok(SHBOptionCodes::Hardware) => result.hardware = Some(option.string_lossy()),
                Ok(SHBOptionCodes::OS) => result.os = Some(option.string_lossy()),
                Ok(SHBOptionCodes::UserApplication) => {
                    result.user_application = Some(option.string_lossy())
                }
                Err(()) => decode_common(
                    Self::BLOCK_NAME,
                    option,
                    &mut result.comments,
                    &mut result.unknown,
                ),
            }
        }
        Ok(result)
    }

    fn encode(&self, writer: &mut OptionsWriter) -> Result<(), FormatError> {
        if let Some(hardware) = &self.hardware {
            writer.push_str(SHBOptionCodes::Hardware as u16, hardware)?;
        }
        if let Some(os) = &self.os {
            writer.push_str(SHBOptionCodes::OS as u16, os)?;
        }
        if let Some(application) = &self.user_application {
            writer.push_str(SHBOptionCodes::UserApplication as u16, application)?;
        }
        writer.push_common(&self.comments, &self.unknown)
    }
}

/// Starts a section and fixes the byte order of every block until the next one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionHeaderBlock {
    pub byte_order: Endianness,
    pub version: Version,
    /// `None` when the file stores -1, meaning the length was not known when writing
    pub section_length: Option<u64>,
    pub options: SectionHeaderOptions,
}
impl SectionHeaderBlock {
    pub fn new(byte_order: Endianness) -> Self {
        Self {
            byte_order,
            version: Version::PCAP_NG,
            section_length: None,
            options: SectionHeaderOptions::default(),
        }
    }
}
impl BlockCodec for SectionHeaderBlock {
    const BLOCK_TYPE: u32 = 0x0A0D0D0A;

    fn decode_body(body: Vec<u8>, _byte_order: Endianness) -> Result<Self, FormatError> {
        require_len(&body, 16, "section header")?;
        let byte_order = Endianness::from_pcap_ng_bytes(&field_at(&body, 0, "byte order magic")?)?;
        let version = Version::from_bytes(field_at(&body, 4, "version")?, byte_order);
        let section_length: [u8; 8] = field_at(&body, 8, "section length")?;
        let section_length = if section_length == [0xFF; 8] {
            None
        } else {
            Some(byte_order.u64_from_bytes(section_length))
        };
        let options = SectionHeaderOptions::parse(&body[16..], byte_order)?;
        Ok(Self {
            byte_order,
            version,
            section_length,
            options,
        })
    }

    fn encode_body(&self, byte_order: Endianness) -> Result<Vec<u8>, FormatError> {
        let mut body = Vec::with_capacity(16);
        body.extend_from_slice(&byte_order.u32_to_bytes(BYTE_ORDER_MAGIC));
        body.extend_from_slice(&self.version.to_bytes(byte_order));
        body.extend_from_slice(&byte_order.u64_to_bytes(self.section_length.unwrap_or(u64::MAX)));
        body.extend_from_slice(&self.options.to_bytes(byte_order)?);
        Ok(body)
    }
}
