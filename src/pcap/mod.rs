//! Parsing for PCAP Files based on the libpcap format
//!
//! Sources
//! - [Wireshark Wiki - File Format](https://wiki.wireshark.org/Development/LibpcapFileFormat)
pub mod file_header;
pub mod packet_header;
mod sync;
pub use sync::*;
#[cfg(feature = "tokio-async")]
mod tokio_impl;
#[cfg(feature = "tokio-async")]
pub use tokio_impl::AsyncPcapReader;

use crate::{
    captured_packet::CapturedPacket,
    error::FormatError,
    pcap::{file_header::PcapFileHeader, packet_header::PacketHeader},
};

/// Checks a record header against the file header before its data is read
pub(crate) fn check_record(
    header: &PacketHeader,
    file_header: &PcapFileHeader,
) -> Result<(), FormatError> {
    if header.include_len > file_header.snap_length {
        return Err(FormatError::InvalidPacketLength {
            snap_length: file_header.snap_length,
            incl_len: header.include_len,
        });
    }
    if header.include_len > header.orig_len {
        return Err(FormatError::CapturedExceedsOriginal {
            captured: header.include_len,
            original: header.orig_len,
        });
    }
    Ok(())
}

pub(crate) fn to_captured_packet(
    header: &PacketHeader,
    file_header: &PcapFileHeader,
    data: Vec<u8>,
    stream_offset: u64,
) -> Result<CapturedPacket, FormatError> {
    let packet = CapturedPacket::new(
        header.timestamp(file_header.magic_number()),
        header.orig_len,
        data,
        file_header.link_type,
    )?;
    Ok(packet.with_stream_offset(stream_offset))
}
