use std::net::{Ipv4Addr, Ipv6Addr};

use crate::{
    byte_order::{ByteOrder, Endianness},
    error::FormatError,
    pcap_ng::{
        blocks::BlockCodec,
        options::{
            BlockOption, OptionSet, OptionsWriter, RawOption, decode_common, define_options_enum,
        },
        pad_length_to_32_bits,
    },
};

define_options_enum! {
    enum NameResolutionOptionCodes {
        DnsName = 2,
        DnsIpv4Address = 3,
        DnsIpv6Address = 4,
    }
}

/// One entry of a name resolution block
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameRecord {
    Ipv4 {
        address: Ipv4Addr,
        names: Vec<String>,
    },
    Ipv6 {
        address: Ipv6Addr,
        names: Vec<String>,
    },
    /// Any other record type, including the EUI address records
    Unknown { record_type: u16, value: Vec<u8> },
}
impl NameRecord {
    const END: u16 = 0;
    const IPV4: u16 = 1;
    const IPV6: u16 = 2;

    pub fn record_type(&self) -> u16 {
        match self {
            NameRecord::Ipv4 { .. } => Self::IPV4,
            NameRecord::Ipv6 { .. } => Self::IPV6,
            NameRecord::Unknown { record_type, .. } => *record_type,
        }
    }
    fn decode(record_type: u16, value: &[u8]) -> Result<Self, FormatError> {
        let record = match record_type {
            Self::IPV4 if value.len() >= 4 => NameRecord::Ipv4 {
                address: Ipv4Addr::new(value[0], value[1], value[2], value[3]),
                names: split_names(&value[4..]),
            },
            Self::IPV6 if value.len() >= 16 => {
                let octets: [u8; 16] = value[..16].try_into()?;
                NameRecord::Ipv6 {
                    address: Ipv6Addr::from(octets),
                    names: split_names(&value[16..]),
                }
            }
            Self::IPV4 | Self::IPV6 => {
                return Err(FormatError::Truncated {
                    name: "name record address",
                    needed: if record_type == Self::IPV4 { 4 } else { 16 },
                    available: value.len(),
                });
            }
            other => NameRecord::Unknown {
                record_type: other,
                value: value.to_vec(),
            },
        };
        Ok(record)
    }
    fn encode_value(&self) -> Vec<u8> {
        let (mut value, names) = match self {
            NameRecord::Ipv4 { address, names } => (address.octets().to_vec(), names),
            NameRecord::Ipv6 { address, names } => (address.octets().to_vec(), names),
            NameRecord::Unknown { value, .. } => return value.clone(),
        };
        for name in names {
            value.extend_from_slice(name.as_bytes());
            value.push(0);
        }
        value
    }
}

fn split_names(bytes: &[u8]) -> Vec<String> {
    bytes
        .split(|byte| *byte == 0)
        .filter(|name| !name.is_empty())
        .map(|name| String::from_utf8_lossy(name).into_owned())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NameResolutionOptions {
    pub comments: Vec<String>,
    pub dns_name: Option<String>,
    pub dns_ipv4_address: Option<Ipv4Addr>,
    pub dns_ipv6_address: Option<Ipv6Addr>,
    pub unknown: Vec<RawOption>,
}
impl OptionSet for NameResolutionOptions {
    const BLOCK_NAME: &'static str = "name resolution";

    fn decode(options: &[BlockOption<'_>], _byte_order: Endianness) -> Result<Self, FormatError> {
        let mut result = Self::default();
        for option in options {
            match NameResolutionOptionCodes::try_from(option.code) {
                Ok(NameResolutionOptionCodes::DnsName) => {
                    result.dns_name = Some(option.string_lossy())
                }
                Ok(NameResolutionOptionCodes::DnsIpv4Address) => {
                    let octets: [u8; 4] = option.fixed("ns_dnsIP4addr")?;
                    result.dns_ipv4_address = Some(Ipv4Addr::from(octets));
                }
                Ok(NameResolutionOptionCodes::DnsIpv6Address) => {
                    let octets: [u8; 16] = option.fixed("ns_dnsIP6addr")?;
                    result.dns_ipv6_address = Some(Ipv6Addr::from(octets));
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
        if let Some(name) = &self.dns_name {
            writer.push_str(NameResolutionOptionCodes::DnsName as u16, name)?;
        }
        if let Some(address) = self.dns_ipv4_address {
            writer.push(
                NameResolutionOptionCodes::DnsIpv4Address as u16,
                &address.octets(),
            )?;
        }
        if let Some(address) = self.dns_ipv6_address {
            writer.push(
                NameResolutionOptionCodes::DnsIpv6Address as u16,
                &address.octets(),
            )?;
        }
        writer.push_common(&self.comments, &self.unknown)
    }
}

/// Address to name mappings, as a list of records followed by options
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NameResolutionBlock {
    pub records: Vec<NameRecord>,
    pub options: NameResolutionOptions,
}
impl BlockCodec for NameResolutionBlock {
    const BLOCK_TYPE: u32 = 4;

    fn decode_body(body: Vec<u8>, byte_order: Endianness) -> Result<Self, FormatError> {
        let mut records = Vec::new();
        let mut offset = 0;
        // Records run until the end record, or the end of the body if it is missing
        while offset + 4 <= body.len() {
            let record_type = byte_order.u16_from_bytes([body[offset], body[offset + 1]]);
            let length = byte_order.u16_from_bytes([body[offset + 2], body[offset + 3]]) as usize;
            offset += 4;
            if record_type == NameRecord::END {
                break;
            }
            let value = body
                .get(offset..offset + length)
                .ok_or(FormatError::Truncated {
                    name: "name record",
                    needed: length,
                    available: body.len() - offset,
                })?;
            records.push(NameRecord::decode(record_type, value)?);
            offset = (offset + pad_length_to_32_bits(length)).min(body.len());
        }
        let options = NameResolutionOptions::parse(&body[offset.min(body.len())..], byte_order)?;
        Ok(Self { records, options })
    }

    fn encode_body(&self, byte_order: Endianness) -> Result<Vec<u8>, FormatError> {
        let mut body = Vec::new();
        for record in &self.records {
            let value = record.encode_value();
            let length = u16::try_from(value.len()).map_err(|_| FormatError::OptionTooLong {
                code: record.record_type(),
                length: value.len(),
            })?;
            body.extend_from_slice(&byte_order.u16_to_bytes(record.record_type()));
            body.extend_from_slice(&byte_order.u16_to_bytes(length));
            body.extend_from_slice(&value);
            body.resize(body.len() + pad_length_to_32_bits(value.len()) - value.len(), 0);
        }
        // The end record is required even without records
        body.extend_from_slice(&[0u8; 4]);
        body.extend_from_slice(&self.options.to_bytes(byte_order)?);
        Ok(body)
    }
}
