use std::net::{Ipv4Addr, Ipv6Addr};

use crate::{
    byte_order::{ByteOrder, Endianness},
    error::FormatError,
    link_type::LinkType,
    pcap_ng::{
        blocks::BlockCodec,
        options::{
            BlockOption, OptionSet, OptionsWriter, RawOption, decode_common, define_options_enum,
        },
    },
    timestamp::TimestampResolution,
    utils::{field_at, require_len},
};
define_options_enum! {
    /// Options for the Interface Description Block
    enum InterfaceOptionCodes {
        /// Name of the capturing device, UTF-8 without a terminating zero
        IfName = 2,
        /// Description of the capturing device, UTF-8 without a terminating zero
        IfDescription = 3,
        /// Address and netmask, 8 bytes
        IfIPv4Address = 4,
        /// Address and prefix length, 17 bytes
        IfIPv6Address = 5,
        IfMACAddress = 6,
        IfEuiAddr = 7,
        /// Interface speed in bits per second
        IfSpeed = 8,
        IfTimestampResolution = 9,
        IfTZone = 10,
        IfFilter = 11,
        IfOS = 12,
        IfFcsLength = 13,
        IfTsOffset = 14,
        IfHardware = 15,
        IfTxSpeed = 16,
        IfRxSpeed = 17,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InterfaceOptions {
    pub comments: Vec<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub ipv4_addresses: Vec<(Ipv4Addr, Ipv4Addr)>,
    pub ipv6_addresses: Vec<(Ipv6Addr, u8)>,
    pub mac_address: Option<[u8; 6]>,
    pub eui_address: Option<[u8; 8]>,
    pub speed: Option<u64>,
    pub timestamp_resolution: Option<TimestampResolution>,
    pub timezone: Option<i32>,
    /// First byte is the filter type, the rest is the filter itself
    pub filter: Option<Vec<u8>>,
    pub os: Option<String>,
    pub fcs_length: Option<u8>,
    /// Seconds added to every timestamp of the interface
    pub timestamp_offset: Option<i64>,
    pub hardware: Option<String>,
    pub tx_speed: Option<u64>,
    pub rx_speed: Option<u64>,
    pub unknown: Vec<RawOption>,
}
impl OptionSet for InterfaceOptions {
    const BLOCK_NAME: &'static str = "interface description";

    fn decode(options: &[BlockOption<'_>], byte_order: Endianness) -> Result<Self, FormatError> {
        let mut result = Self::default();
        for option in options {
            let Ok(code) = InterfaceOptionCodes::try_from(option.code) else {
                decode_common(
                    Self::BLOCK_NAME,
                    option,
                    &mut result.comments,
                    &mut result.unknown,
                );
                continue;
            };
            match code {
                InterfaceOptionCodes::IfName => result.name = Some(option.string_lossy()),
                InterfaceOptionCodes::IfDescription => {
                    result.description = Some(option.string_lossy())
                }
                InterfaceOptionCodes::IfIPv4Address => {
                    let value: [u8; 8] = option.fixed("if_IPv4addr")?;
                    result.ipv4_addresses.push((
                        Ipv4Addr::new(value[0], value[1], value[2], value[3]),
                        Ipv4Addr::new(value[4], value[5], value[6], value[7]),
                    ));
                }
                InterfaceOptionCodes::IfIPv6Address => {
                    let value: [u8; 17] = option.fixed("if_IPv6addr")?;
                    let mut address = [0u8; 16];
                    address.copy_from_slice(&value[..16]);
                    result
                        .ipv6_addresses
                        .push((Ipv6Addr::from(address), value[16]));
                }
                InterfaceOptionCodes::IfMACAddress => {
                    result.mac_address = Some(option.fixed("if_MACaddr")?)
                }
                InterfaceOptionCodes::IfEuiAddr => {
                    result.eui_address = Some(option.fixed("if_EUIaddr")?)
                }
                InterfaceOptionCodes::IfSpeed => {
                    result.speed = Some(option.u64(byte_order, "if_speed")?)
                }
                InterfaceOptionCodes::IfTimestampResolution => {
                    result.timestamp_resolution =
                        Some(TimestampResolution(option.u8("if_tsresol")?))
                }
                InterfaceOptionCodes::IfTZone => {
                    result.timezone = Some(option.u32(byte_order, "if_tzone")? as i32)
                }
                InterfaceOptionCodes::IfFilter => result.filter = Some(option.value.to_vec()),
                InterfaceOptionCodes::IfOS => result.os = Some(option.string_lossy()),
                InterfaceOptionCodes::IfFcsLength => {
                    result.fcs_length = Some(option.u8("if_fcslen")?)
                }
                InterfaceOptionCodes::IfTsOffset => {
                    result.timestamp_offset = Some(option.u64(byte_order, "if_tsoffset")? as i64)
                }
                InterfaceOptionCodes::IfHardware => result.hardware = Some(option.string_lossy()),
                InterfaceOptionCodes::IfTxSpeed => {
                    result.tx_speed = Some(option.u64(byte_order, "if_txspeed")?)
                }
                InterfaceOptionCodes::IfRxSpeed => {
                    result.rx_speed = Some(option.u64(byte_order, "if_rxspeed")?)
                }
            }
        }
        Ok(result)
    }

    fn encode(&self, writer: &mut OptionsWriter) -> Result<(), FormatError> {
        let byte_order = writer.byte_order();
        if let Some(name) = &self.name {
            writer.push_str(InterfaceOptionCodes::IfName as u16, name)?;
        }
        if let Some(description) = &self.description {
            writer.push_str(InterfaceOptionCodes::IfDescription as u16, description)?;
        }
        for (address, mask) in &self.ipv4_addresses {
            let mut value = [0u8; 8];
            value[..4].copy_from_slice(&address.octets());
            value[4..].copy_from_slice(&mask.octets());
            writer.push(InterfaceOptionCodes::IfIPv4Address as u16, &value)?;
        }
        for (address, prefix) in &self.ipv6_addresses {
            let mut value = [0u8; 17];
            value[..16].copy_from_slice(&address.octets());
            value[16] = *prefix;
            writer.push(InterfaceOptionCodes::IfIPv6Address as u16, &value)?;
        }
        if let Some(mac) = &self.mac_address {
            writer.push(InterfaceOptionCodes::IfMACAddress as u16, mac)?;
        }
        if let Some(eui) = &self.eui_address {
            writer.push(InterfaceOptionCodes::IfEuiAddr as u16, eui)?;
        }
        if let Some(speed) = self.speed {
            writer.push_u64(InterfaceOptionCodes::IfSpeed as u16, speed)?;
        }
        if let Some(resolution) = self.timestamp_resolution {
            writer.push(InterfaceOptionCodes::IfTimestampResolution as u16, &[resolution.0])?;
        }
        if let Some(timezone) = self.timezone {
            writer.push(
                InterfaceOptionCodes::IfTZone as u16,
                &byte_order.u32_to_bytes(timezone as u32),
            )?;
        }
        if let Some(filter) = &self.filter {
            writer.push(InterfaceOptionCodes::IfFilter as u16, filter)?;
        }
        if let Some(os) = &self.os {
            writer.push_str(InterfaceOptionCodes::IfOS as u16, os)?;
        }
        if let Some(fcs_length) = self.fcs_length {
            writer.push(InterfaceOptionCodes::IfFcsLength as u16, &[fcs_length])?;
        }
        if let Some(offset) = self.timestamp_offset {
            writer.push_u64(InterfaceOptionCodes::IfTsOffset as u16, offset as u64)?;
        }
        if let Some(hardware) = &self.hardware {
            writer.push_str(InterfaceOptionCodes::IfHardware as u16, hardware)?;
        }
        if let Some(speed) = self.tx_speed {
            writer.push_u64(InterfaceOptionCodes::IfTxSpeed as u16, speed)?;
        }
        if let Some(speed) = self.rx_speed {
            writer.push_u64(InterfaceOptionCodes::IfRxSpeed as u16, speed)?;
        }
        writer.push_common(&self.comments, &self.unknown)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceDescriptionBlock {
    pub link_type: LinkType,
    pub reserved: u16,
    /// 0 means no limit
    pub snap_length: u32,
    pub options: InterfaceOptions,
}
impl InterfaceDescriptionBlock {
    pub fn new(link_type: LinkType, snap_length: u32) -> Self {
        Self {
            link_type,
            reserved: 0,
            snap_length,
            options: InterfaceOptions::default(),
        }
    }
    /// Microseconds when the interface does not say otherwise
    pub fn timestamp_resolution(&self) -> TimestampResolution {
        self.options.timestamp_resolution.unwrap_or_default()
    }
    pub fn timestamp_offset(&self) -> i64 {
        self.options.timestamp_offset.unwrap_or(0)
    }
}
impl BlockCodec for InterfaceDescriptionBlock {
    const BLOCK_TYPE: u32 = 1;

    fn decode_body(body: Vec<u8>, byte_order: Endianness) -> Result<Self, FormatError> {
        require_len(&body, 8, "interface description")?;
        let link_type = LinkType::from(byte_order.u16_from_bytes(field_at(&body, 0, "link type")?));
        let reserved = byte_order.u16_from_bytes(field_at(&body, 2, "reserved")?);
        let snap_length = byte_order.u32_from_bytes(field_at(&body, 4, "snap length")?);
        let options = InterfaceOptions::parse(&body[8..], byte_order)?;
        Ok(Self {
            link_type,
            reserved,
            snap_length,
            options,
        })
    }

    fn encode_body(&self, byte_order: Endianness) -> Result<Vec<u8>, FormatError> {
        let mut body = Vec::with_capacity(8);
        body.extend_from_slice(&byte_order.u16_to_bytes(self.link_type.code()));
        body.extend_from_slice(&byte_order.u16_to_bytes(self.reserved));
        body.extend_from_slice(&byte_order.u32_to_bytes(self.snap_length));
        body.extend_from_slice(&self.options.to_bytes(byte_order)?);
        Ok(body)
    }
}
