use std::io::{Read, Write};

use crate::{
    Version,
    byte_order::{ByteOrder, Endianness, WriteExt},
    error::FormatError,
    link_type::LinkType,
    utils::field_at,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MagicNumber {
    #[default]
    Microsecond,
    Nanosecond,
}
impl MagicNumber {
    pub fn units_per_second(self) -> u32 {
        match self {
            MagicNumber::Microsecond => 1_000_000,
            MagicNumber::Nanosecond => 1_000_000_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MagicNumberAndEndianness {
    pub magic_number: MagicNumber,
    pub endianness: Endianness,
}
impl MagicNumberAndEndianness {
    /// The bytes as they appear at the start of the file
    pub fn to_bytes(self) -> [u8; 4] {
        let magic = match self.magic_number {
            MagicNumber::Microsecond => 0xA1B2_C3D4u32,
            MagicNumber::Nanosecond => 0xA1B2_3C4Du32,
        };
        self.endianness.u32_to_bytes(magic)
    }
}
impl Default for MagicNumberAndEndianness {
    fn default() -> Self {
        Self {
            magic_number: MagicNumber::Microsecond,
            endianness: Endianness::LittleEndian,
        }
    }
}

impl TryFrom<[u8; 4]> for MagicNumberAndEndianness {
    type Error = FormatError;

    fn try_from(value: [u8; 4]) -> Result<Self, Self::Error> {
        match value {
            [0xa1, 0xb2, 0xc3, 0xd4] => Ok(Self {
                magic_number: MagicNumber::Microsecond,
                endianness: Endianness::BigEndian,
            }),
            [0xd4, 0xc3, 0xb2, 0xa1] => Ok(Self {
                magic_number: MagicNumber::Microsecond,
                endianness: Endianness::LittleEndian,
            }),
            [0xA1, 0xB2, 0x3C, 0x4D] => Ok(Self {
                magic_number: MagicNumber::Nanosecond,
                endianness: Endianness::BigEndian,
            }),
            [0x4d, 0x3c, 0xb2, 0xa1] => Ok(Self {
                magic_number: MagicNumber::Nanosecond,
                endianness: Endianness::LittleEndian,
            }),
            _ => Err(FormatError::InvalidMagicNumber(Some(value))),
        }
    }
}
impl TryFrom<&[u8]> for MagicNumberAndEndianness {
    type Error = FormatError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        if value.len() < 4 {
            return Err(FormatError::InvalidMagicNumber(None));
        }
        let array: [u8; 4] = value[0..4].try_into()?;
        Self::try_from(array)
    }
}

/// The 24 byte global header of a pcap file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcapFileHeader {
    /// First 4 bytes are the magic number and endianness
    pub magic_number_and_endianness: MagicNumberAndEndianness,
    /// 4..8
    pub version: Version,
    /// 8..12, GMT to local correction. Always 0 in practice
    pub timezone: u32,
    /// 12..16
    pub sig_figs: u32,
    /// 16..20
    pub snap_length: u32,
    /// 20..24
    pub link_type: LinkType,
}
impl Default for PcapFileHeader {
    fn default() -> Self {
        Self {
            magic_number_and_endianness: MagicNumberAndEndianness::default(),
            version: Version::PCAP,
            timezone: 0,
            sig_figs: 0,
            snap_length: 65535,
            link_type: LinkType::Ethernet,
        }
    }
}

impl PcapFileHeader {
    pub const SIZE: usize = 24;
    /// Reads the file header from the reader
    ///
    /// A stream shorter than the header is an `UnexpectedEof` IO error.
    pub fn read<R: Read>(reader: &mut R) -> Result<Self, FormatError> {
        let mut header = [0u8; Self::SIZE];
        reader.read_exact(&mut header)?;
        Self::try_from(&header)
    }
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<(), std::io::Error> {
        let endianness = self.endianness();
        writer.write_all(&self.magic_number_and_endianness.to_bytes())?;
        writer.write_all(&self.version.to_bytes(endianness))?;
        writer.write_u32(self.timezone, endianness)?;
        writer.write_u32(self.sig_figs, endianness)?;
        writer.write_u32(self.snap_length, endianness)?;
        writer.write_u32(u32::from(self.link_type.code()), endianness)?;
        Ok(())
    }
    pub fn endianness(&self) -> Endianness {
        self.magic_number_and_endianness.endianness
    }
    pub fn magic_number(&self) -> MagicNumber {
        self.magic_number_and_endianness.magic_number
    }
}
impl TryFrom<&[u8; 24]> for PcapFileHeader {
    type Error = FormatError;

    fn try_from(bytes: &[u8; 24]) -> Result<Self, Self::Error> {
        let magic_number_and_endianness = MagicNumberAndEndianness::try_from(&bytes[0..4])?;
        let endianness = magic_number_and_endianness.endianness;

        let version = Version::from_bytes(field_at(bytes, 4, "version")?, endianness);
        let timezone = endianness.u32_from_bytes(field_at(bytes, 8, "timezone")?);
        let sig_figs = endianness.u32_from_bytes(field_at(bytes, 12, "sig figs")?);
        let snap_length = endianness.u32_from_bytes(field_at(bytes, 16, "snap length")?);
        let link_type =
            LinkType::from(endianness.u32_from_bytes(field_at(bytes, 20, "link type")?));
        if version != Version::PCAP {
            log::debug!("Unusual pcap version {}.{}", version.major, version.minor);
        }
        Ok(Self {
            magic_number_and_endianness,
            version,
            timezone,
            sig_figs,
            snap_length,
            link_type,
        })
    }
}
