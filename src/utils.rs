use std::io::Read;

use crate::error::FormatError;

/// A reader that allows peaking into the first N bytes without consuming them
#[derive(Debug)]
pub struct PeakableReader<R: Read> {
    inner: R,
    peeked: Option<Vec<u8>>,
}
impl<R: Read> PeakableReader<R> {
    /// Creates a new `PeakableReader` that reads the first `peek_size` bytes
    ///
    /// Fewer bytes are kept only if the inner reader ends first.
    pub fn new(mut inner: R, peek_size: usize) -> std::io::Result<Self> {
        let mut peeked = Vec::with_capacity(peek_size);
        (&mut inner)
            .take(peek_size as u64)
            .read_to_end(&mut peeked)?;
        Ok(Self {
            inner,
            peeked: Some(peeked),
        })
    }
    /// Returns a reference to the peeked bytes
    pub fn peak(&self) -> Option<&[u8]> {
        self.peeked.as_deref()
    }
}
impl<R: Read> Read for PeakableReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if let Some(peeked) = &mut self.peeked {
            let to_read = std::cmp::min(buf.len(), peeked.len());
            buf[..to_read].copy_from_slice(&peeked[..to_read]);
            peeked.drain(..to_read);
            if peeked.is_empty() {
                self.peeked = None;
            }
            Ok(to_read)
        } else {
            self.inner.read(buf)
        }
    }
}

/// Reads `SIZE` bytes at `offset`, reporting a truncated `name` when they are not there
#[inline]
pub(crate) fn field_at<const SIZE: usize>(
    bytes: &[u8],
    offset: usize,
    name: &'static str,
) -> Result<[u8; SIZE], FormatError> {
    let slice = bytes
        .get(offset..offset + SIZE)
        .ok_or(FormatError::Truncated {
            name,
            needed: offset + SIZE,
            available: bytes.len(),
        })?;
    Ok(slice.try_into()?)
}

/// Fails unless `bytes` holds at least `needed` bytes
#[inline]
pub(crate) fn require_len(
    bytes: &[u8],
    needed: usize,
    name: &'static str,
) -> Result<(), FormatError> {
    if bytes.len() < needed {
        return Err(FormatError::Truncated {
            name,
            needed,
            available: bytes.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use super::*;

    #[test]
    fn test_peak_reader() -> anyhow::Result<()> {
        let data = b"Hello, world!";

        let mut reader = PeakableReader::new(&data[..], 5)?;
        assert_eq!(reader.peak(), Some(&b"Hello"[..]));

        let mut buffer = [0u8; 3];
        assert_eq!(reader.read(&mut buffer)?, 3);
        assert_eq!(&buffer, b"Hel");

        let mut rest = String::new();
        reader.read_to_string(&mut rest)?;
        assert_eq!(rest, "lo, world!");
        Ok(())
    }

    #[test]
    fn short_input_peeks_what_is_there() -> anyhow::Result<()> {
        let reader = PeakableReader::new(&b"ab"[..], 12)?;
        assert_eq!(reader.peak(), Some(&b"ab"[..]));
        Ok(())
    }

    #[test]
    fn field_at_reports_truncation() {
        let bytes = [1u8, 2, 3];
        assert!(matches!(field_at::<2>(&bytes, 1, "test"), Ok([2, 3])));
        assert!(matches!(
            field_at::<2>(&bytes, 2, "test"),
            Err(FormatError::Truncated {
                name: "test",
                needed: 4,
                available: 3
            })
        ));
    }
}
