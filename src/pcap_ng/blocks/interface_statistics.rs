use crate::{
    byte_order::{ByteOrder, Endianness},
    error::FormatError,
    pcap_ng::{
        blocks::{BlockCodec, join_timestamp, split_timestamp},
        options::{
            BlockOption, OptionSet, OptionsWriter, RawOption, decode_common, define_options_enum,
        },
    },
    utils::{field_at, require_len},
};

define_options_enum! {
    enum InterfaceStatisticsOptionCodes {
        StartTime = 2,
        EndTime = 3,
        IfReceived = 4,
        IfDropped = 5,
        FilterAccepted = 6,
        OsDropped = 7,
        UserDelivered = 8,
    }
}

/// Counters reported for one interface
///
/// Start and end times use the interface's timestamp resolution, like packet timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InterfaceStatisticsOptions {
    pub comments: Vec<String>,
    pub start_time: Option<u64>,
    pub end_time: Option<u64>,
    pub if_received: Option<u64>,
    pub if_dropped: Option<u64>,
    pub filter_accepted: Option<u64>,
    pub os_dropped: Option<u64>,
    pub user_delivered: Option<u64>,
    pub unknown: Vec<RawOption>,
}
impl OptionSet for InterfaceStatisticsOptions {
    const BLOCK_NAME: &'static str = "interface statistics";

    fn decode(options: &[BlockOption<'_>], byte_order: Endianness) -> Result<Self, FormatError> {
        use InterfaceStatisticsOptionCodes as Code;
        let mut result = Self::default();
        for option in options {
            match Code::try_from(option.code) {
                Ok(Code::StartTime) => {
                    result.start_time = Some(option.timestamp(byte_order, "isb_starttime")?)
                }
                Ok(Code::EndTime) => {
                    result.end_time = Some(option.timestamp(byte_order, "isb_endtime")?)
                }
                Ok(Code::IfReceived) => {
                    result.if_received = Some(option.u64(byte_order, "isb_ifrecv")?)
                }
                Ok(Code::IfDropped) => {
                    result.if_dropped = Some(option.u64(byte_order, "isb_ifdrop")?)
                }
                Ok(Code::FilterAccepted) => {
                    result.filter_accepted = Some(option.u64(byte_order, "isb_filteraccept")?)
                }
                Ok(Code::OsDropped) => {
                    result.os_dropped = Some(option.u64(byte_order, "isb_osdrop")?)
                }
                Ok(Code::UserDelivered) => {
                    result.user_delivered = Some(option.u64(byte_order, "isb_usrdeliv")?)
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
        use InterfaceStatisticsOptionCodes as Code;
        if let Some(time) = self.start_time {
            writer.push_timestamp(Code::StartTime as u16, time)?;
        }
        if let Some(time) = self.end_time {
            writer.push_timestamp(Code::EndTime as u16, time)?;
        }
        let counters = [
            (Code::IfReceived, self.if_received),
            (Code::IfDropped, self.if_dropped),
            (Code::FilterAccepted, self.filter_accepted),
            (Code::OsDropped, self.os_dropped),
            (Code::UserDelivered, self.user_delivered),
        ];
        for (code, value) in counters {
            if let Some(value) = value {
                writer.push_u64(code as u16, value)?;
            }
        }
        writer.push_common(&self.comments, &self.unknown)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceStatisticsBlock {
    pub interface_id: u32,
    pub timestamp: u64,
    pub options: InterfaceStatisticsOptions,
}
impl BlockCodec for InterfaceStatisticsBlock {
    const BLOCK_TYPE: u32 = 5;

    fn decode_body(body: Vec<u8>, byte_order: Endianness) -> Result<Self, FormatError> {
        require_len(&body, 12, "interface statistics")?;
        let interface_id = byte_order.u32_from_bytes(field_at(&body, 0, "interface id")?);
        let high = byte_order.u32_from_bytes(field_at(&body, 4, "timestamp")?);
        let low = byte_order.u32_from_bytes(field_at(&body, 8, "timestamp")?);
        let options = InterfaceStatisticsOptions::parse(&body[12..], byte_order)?;
        Ok(Self {
            interface_id,
            timestamp: join_timestamp(high, low),
            options,
        })
    }

    fn encode_body(&self, byte_order: Endianness) -> Result<Vec<u8>, FormatError> {
        let (high, low) = split_timestamp(self.timestamp);
        let mut body = Vec::with_capacity(12);
        body.extend_from_slice(&byte_order.u32_to_bytes(self.interface_id));
        body.extend_from_slice(&byte_order.u32_to_bytes(high));
        body.extend_from_slice(&byte_order.u32_to_bytes(low));
        body.extend_from_slice(&self.options.to_bytes(byte_order)?);
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn counters_round_trip() -> anyhow::Result<()> {
        let block = InterfaceStatisticsBlock {
            interface_id: 0,
            timestamp: 1_700_000_000_000_000,
            options: InterfaceStatisticsOptions {
                start_time: Some(1_699_999_000_000_000),
                end_time: Some(1_700_000_000_000_000),
                if_received: Some(1000),
                if_dropped: Some(3),
                os_dropped: Some(1),
                ..Default::default()
            },
        };
        let bytes = block.to_bytes(Endianness::LittleEndian)?;
        let read =
            InterfaceStatisticsBlock::read(&mut Cursor::new(&bytes), Endianness::LittleEndian)?;
        assert_eq!(read, block);
        Ok(())
    }

    #[test]
    fn start_time_is_split_like_packet_timestamps() -> anyhow::Result<()> {
        let mut writer = OptionsWriter::new(Endianness::LittleEndian);
        writer.push_timestamp(InterfaceStatisticsOptionCodes::StartTime as u16, 0x1_0000_0002)?;
        let bytes = writer.finish();
        assert_eq!(&bytes[4..12], &[1, 0, 0, 0, 2, 0, 0, 0]);
        Ok(())
    }
}
