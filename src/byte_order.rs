//! Byte Order handling for pcap and pcap-ng files

use std::io::{Read, Write};

use crate::error::FieldLengthError;

/// Represents a trait for byte order operations
pub trait ByteOrder: Clone + Copy {
    /// Converts a byte array to a u16
    fn u16_from_bytes(self, bytes: [u8; 2]) -> u16;
    fn u16_to_bytes(self, value: u16) -> [u8; 2];
    /// Converts a byte array to a u32
    fn u32_from_bytes(self, bytes: [u8; 4]) -> u32;
    fn u32_to_bytes(self, value: u32) -> [u8; 4];
    fn u64_from_bytes(self, bytes: [u8; 8]) -> u64;
    fn u64_to_bytes(self, value: u64) -> [u8; 8];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BigEndian;
impl ByteOrder for BigEndian {
    fn u16_from_bytes(self, bytes: [u8; 2]) -> u16 {
        u16::from_be_bytes(bytes)
    }
    fn u16_to_bytes(self, value: u16) -> [u8; 2] {
        value.to_be_bytes()
    }
    fn u32_from_bytes(self, bytes: [u8; 4]) -> u32 {
        u32::from_be_bytes(bytes)
    }
    fn u32_to_bytes(self, value: u32) -> [u8; 4] {
        value.to_be_bytes()
    }
    fn u64_from_bytes(self, bytes: [u8; 8]) -> u64 {
        u64::from_be_bytes(bytes)
    }
    fn u64_to_bytes(self, value: u64) -> [u8; 8] {
        value.to_be_bytes()
    }
}
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LittleEndian;
impl ByteOrder for LittleEndian {
    fn u16_from_bytes(self, bytes: [u8; 2]) -> u16 {
        u16::from_le_bytes(bytes)
    }
    fn u16_to_bytes(self, value: u16) -> [u8; 2] {
        value.to_le_bytes()
    }
    fn u32_from_bytes(self, bytes: [u8; 4]) -> u32 {
        u32::from_le_bytes(bytes)
    }
    fn u32_to_bytes(self, value: u32) -> [u8; 4] {
        value.to_le_bytes()
    }
    fn u64_from_bytes(self, bytes: [u8; 8]) -> u64 {
        u64::from_le_bytes(bytes)
    }
    fn u64_to_bytes(self, value: u64) -> [u8; 8] {
        value.to_le_bytes()
    }
}

/// Represents the endianness of the byte order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endianness {
    /// Little-endian byte order
    #[default]
    LittleEndian,
    /// Big-endian byte order
    BigEndian,
}

macro_rules! dispatch_endianness {
    ($self:ident, $method:ident($arg:expr)) => {
        match $self {
            Endianness::BigEndian => BigEndian.$method($arg),
            Endianness::LittleEndian => LittleEndian.$method($arg),
        }
    };
}
impl ByteOrder for Endianness {
    fn u16_from_bytes(self, bytes: [u8; 2]) -> u16 {
        dispatch_endianness!(self, u16_from_bytes(bytes))
    }
    fn u16_to_bytes(self, value: u16) -> [u8; 2] {
        dispatch_endianness!(self, u16_to_bytes(value))
    }
    fn u32_from_bytes(self, bytes: [u8; 4]) -> u32 {
        dispatch_endianness!(self, u32_from_bytes(bytes))
    }
    fn u32_to_bytes(self, value: u32) -> [u8; 4] {
        dispatch_endianness!(self, u32_to_bytes(value))
    }
    fn u64_from_bytes(self, bytes: [u8; 8]) -> u64 {
        dispatch_endianness!(self, u64_from_bytes(bytes))
    }
    fn u64_to_bytes(self, value: u64) -> [u8; 8] {
        dispatch_endianness!(self, u64_to_bytes(value))
    }
}

/// Copies a slice into an array, failing if the slice is not exactly `SIZE` long
pub(crate) fn exact_array<const SIZE: usize>(
    bytes: &[u8],
    name: &'static str,
) -> Result<[u8; SIZE], FieldLengthError> {
    bytes.try_into().map_err(|_| FieldLengthError {
        name,
        expected: SIZE,
        got: bytes.len(),
    })
}

pub trait ReadExt {
    /// Reads a u32 from the reader
    fn read_u32<B: ByteOrder>(&mut self, byte_order: B) -> Result<u32, std::io::Error>;
    /// Has nothing to do with byte order, just reads a fixed number of bytes
    ///
    /// But exists for simplicity
    fn read_bytes<const SIZE: usize>(&mut self) -> Result<[u8; SIZE], std::io::Error>;
}
impl<R: Read> ReadExt for R {
    fn read_u32<B: ByteOrder>(&mut self, byte_order: B) -> Result<u32, std::io::Error> {
        Ok(byte_order.u32_from_bytes(self.read_bytes()?))
    }
    fn read_bytes<const SIZE: usize>(&mut self) -> Result<[u8; SIZE], std::io::Error> {
        let mut buffer = [0u8; SIZE];
        self.read_exact(&mut buffer)?;
        Ok(buffer)
    }
}

pub trait WriteExt {
    fn write_u32<B: ByteOrder>(&mut self, value: u32, byte_order: B) -> Result<(), std::io::Error>;
}
impl<W: Write> WriteExt for W {
    fn write_u32<B: ByteOrder>(&mut self, value: u32, byte_order: B) -> Result<(), std::io::Error> {
        self.write_all(&byte_order.u32_to_bytes(value))
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn test_big_endian() {
        let bytes: [u8; 2] = [0x12, 0x34];
        assert_eq!(BigEndian.u16_from_bytes(bytes), 0x1234);
        let bytes: [u8; 4] = [0x12, 0x34, 0x56, 0x78];
        assert_eq!(BigEndian.u32_from_bytes(bytes), 0x12345678);
        assert_eq!(BigEndian.u32_to_bytes(0x12345678), bytes);
    }
    #[test]
    fn test_little_endian() {
        let bytes: [u8; 2] = [0x34, 0x12];
        assert_eq!(LittleEndian.u16_from_bytes(bytes), 0x1234);
        let bytes: [u8; 4] = [0x78, 0x56, 0x34, 0x12];
        assert_eq!(LittleEndian.u32_from_bytes(bytes), 0x12345678);
        assert_eq!(LittleEndian.u32_to_bytes(0x12345678), bytes);
    }
    #[test]
    fn wrong_size_is_field_length_error() {
        assert_eq!(
            exact_array::<4>(&[1, 2, 3], "u32"),
            Err(FieldLengthError {
                name: "u32",
                expected: 4,
                got: 3
            })
        );
        assert_eq!(exact_array::<2>(&[1, 0], "u16"), Ok([1, 0]));
    }
}
