//! Asynchronous reader for PCAP files
use crate::{
    captured_packet::CapturedPacket,
    error::FormatError,
    pcap::{
        check_record, file_header::PcapFileHeader, packet_header::PacketHeader,
        to_captured_packet,
    },
};
use tokio::io::{AsyncRead, AsyncReadExt};
#[derive(Debug)]
pub struct AsyncPcapReader<R: AsyncRead + Unpin> {
    reader: R,
    /// Buffer for packet data
    buffer: Vec<u8>,
    /// Buffer for packet header
    header_buffer: [u8; 16],
    file_header: PcapFileHeader,
    position: u64,
}
impl<R: AsyncRead + Unpin> AsyncPcapReader<R> {
    /// Creates a new `AsyncPcapReader` from a reader
    /// Returns `Ok(Self)` on success, or `Err` if there was an error
    /// reading the file header
    pub async fn new(mut reader: R) -> Result<Self, FormatError> {
        let mut file_header = [0u8; 24];
        reader.read_exact(&mut file_header).await?;
        let file_header = PcapFileHeader::try_from(&file_header)?;
        Ok(Self {
            reader,
            buffer: Vec::new(),
            file_header,
            header_buffer: [0; 16],
            position: PcapFileHeader::SIZE as u64,
        })
    }
    /// Returns the file header of the pcap file
    pub fn file_header(&self) -> &PcapFileHeader {
        &self.file_header
    }
    /// Reads the next packet from the pcap file
    /// Returns `Ok(None)` if there are no more packets to read, a record cut short included
    /// Returns `Err` if there was an error reading the packet
    pub async fn next_record(&mut self) -> Result<Option<(PacketHeader, &[u8])>, FormatError> {
        if let Err(err) = self.reader.read_exact(&mut self.header_buffer).await {
            if err.kind() == std::io::ErrorKind::UnexpectedEof {
                return Ok(None); // No more packets
            } else {
                return Err(FormatError::IO(err));
            }
        }
        let packet_header =
            PacketHeader::parse_bytes(&self.header_buffer, self.file_header.endianness())?;
        check_record(&packet_header, &self.file_header)?;
        let length = packet_header.include_len as usize;
        if self.buffer.len() < length {
            self.buffer.resize(length, 0);
        }
        if let Err(err) = self.reader.read_exact(&mut self.buffer[..length]).await {
            if err.kind() == std::io::ErrorKind::UnexpectedEof {
                log::warn!(
                    "Stream ended inside the record at offset {}, expected {length} bytes",
                    self.position
                );
                return Ok(None);
            }
            return Err(FormatError::IO(err));
        }
        self.position += (PacketHeader::SIZE + length) as u64;

        Ok(Some((packet_header, &self.buffer[..length])))
    }
    pub async fn next_packet(&mut self) -> Result<Option<CapturedPacket>, FormatError> {
        let offset = self.position;
        let Some((header, data)) = self.next_record().await? else {
            return Ok(None);
        };
        let data = data.to_vec();
        to_captured_packet(&header, &self.file_header, data, offset).map(Some)
    }
}
