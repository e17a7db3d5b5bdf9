use std::io::{Cursor, Read, Write};

use crate::{
    byte_order::{Endianness, ReadExt, WriteExt},
    pcap::file_header::MagicNumber,
    timestamp::CaptureTimestamp,
};

/// The 16 byte header in front of every packet record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    pub ts_sec: u32,
    /// Micro or nanoseconds depending on the file's magic number
    pub ts_frac: u32,
    /// The length of the packet data included in the file
    pub include_len: u32,
    /// The original length of the packet data
    pub orig_len: u32,
}

impl PacketHeader {
    pub const SIZE: usize = 16;

    pub fn new(ts_sec: u32, ts_frac: u32, incl_len: u32, orig_len: u32) -> Self {
        Self {
            ts_sec,
            ts_frac,
            include_len: incl_len,
            orig_len,
        }
    }
    /// Reads the packet header from the reader
    ///
    /// The endianness is used to determine how to read the bytes
    #[inline(always)]
    pub fn read<R: Read>(reader: &mut R, endianness: Endianness) -> Result<Self, std::io::Error> {
        let header = reader.read_bytes::<16>()?;
        Self::parse_bytes(&header, endianness)
    }
    #[inline(always)]
    pub fn parse_bytes(bytes: &[u8; 16], endianness: Endianness) -> Result<Self, std::io::Error> {
        let mut cursor = Cursor::new(bytes);
        let ts_sec = cursor.read_u32(endianness)?;
        let ts_frac = cursor.read_u32(endianness)?;
        let include_len = cursor.read_u32(endianness)?;
        let orig_len = cursor.read_u32(endianness)?;
        Ok(Self {
            ts_sec,
            ts_frac,
            include_len,
            orig_len,
        })
    }
    pub fn write<W: Write>(
        &self,
        writer: &mut W,
        endianness: Endianness,
    ) -> Result<(), std::io::Error> {
        writer.write_u32(self.ts_sec, endianness)?;
        writer.write_u32(self.ts_frac, endianness)?;
        writer.write_u32(self.include_len, endianness)?;
        writer.write_u32(self.orig_len, endianness)?;
        Ok(())
    }
    /// Seconds and microseconds, nanosecond files are divided down
    pub fn timestamp(&self, magic_number: MagicNumber) -> CaptureTimestamp {
        let micros = match magic_number {
            MagicNumber::Microsecond => self.ts_frac,
            MagicNumber::Nanosecond => self.ts_frac / 1000,
        };
        CaptureTimestamp::from_micros(self.ts_sec, micros)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_test() -> anyhow::Result<()> {
        let header = PacketHeader::new(1_764_239_400, 999_999_999, 100, 100);
        let mut target: [u8; 16] = [0; 16];
        {
            let mut writer: Cursor<&mut [u8]> = Cursor::new(&mut target);
            header.write(&mut writer, Endianness::BigEndian)?;
        }
        let result = PacketHeader::parse_bytes(&target, Endianness::BigEndian)?;
        assert_eq!(result, header);
        Ok(())
    }

    #[test]
    fn nanoseconds_are_reported_as_micros() {
        let header = PacketHeader::new(7, 123_456_789, 0, 0);
        let ts = header.timestamp(MagicNumber::Nanosecond);
        assert_eq!(ts.seconds, 7);
        assert_eq!(ts.subsec_micros(), 123_456);
        assert_eq!(header.timestamp(MagicNumber::Microsecond).fraction, 123_456_789);
    }
}
