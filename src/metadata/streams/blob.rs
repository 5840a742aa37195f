//! The '#Blob' heap: length-prefixed byte sequences addressed by byte offset.
//!
//! The length uses the compressed unsigned integer encoding of ECMA-335 Partition II, 23.2:
//! one byte `0xxxxxxx`, two bytes `10xxxxxx xxxxxxxx` or four bytes
//! `110xxxxx xxxxxxxx xxxxxxxx xxxxxxxx`, big-endian.

use crate::{Error::OutOfBounds, Result};

/// A view over the '#Blob' heap. Offset 0 always holds the empty blob.
pub struct Blob<'a> {
    data: &'a [u8],
}

/// Decodes a compressed unsigned integer at the start of `data`, returning the value and the
/// number of bytes it occupied.
fn read_compressed_uint(data: &[u8]) -> Result<(usize, usize)> {
    let first = *data.first().ok_or(OutOfBounds)?;

    match first {
        0x00..=0x7F => Ok((usize::from(first), 1)),
        0x80..=0xBF => {
            let second = *data.get(1).ok_or(OutOfBounds)?;
            Ok(((usize::from(first & 0x3F) << 8) | usize::from(second), 2))
        }
        0xC0..=0xDF => {
            let bytes = data.get(1..4).ok_or(OutOfBounds)?;
            let value = (usize::from(first & 0x1F) << 24)
                | (usize::from(bytes[0]) << 16)
                | (usize::from(bytes[1]) << 8)
                | usize::from(bytes[2]);
            Ok((value, 4))
        }
        _ => Err(malformed_error!(
            "Invalid compressed length prefix 0x{:02x}",
            first
        )),
    }
}

impl<'a> Blob<'a> {
    /// Creates the heap view.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if `data` is empty or does not start with a 0 byte.
    pub fn from(data: &'a [u8]) -> Result<Blob<'a>> {
        if data.is_empty() || data[0] != 0 {
            return Err(malformed_error!("Invalid memory for #Blob heap"));
        }

        Ok(Blob { data })
    }

    /// Returns the blob starting at `index`, without its length prefix.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the prefix or the payload run past the heap.
    pub fn get(&self, index: usize) -> Result<&'a [u8]> {
        if index >= self.data.len() {
            return Err(OutOfBounds);
        }

        let (len, skip) = read_compressed_uint(&self.data[index..])?;
        let start = index + skip;
        let end = start.checked_add(len).ok_or(OutOfBounds)?;
        if end > self.data.len() {
            return Err(OutOfBounds);
        }

        Ok(&self.data[start..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crafted() {
        let mut data = vec![0u8];
        data.push(0x03);
        data.extend_from_slice(&[0x0A, 0x0B, 0x0C]);
        // 0x100 bytes, two byte prefix
        data.extend_from_slice(&[0x81, 0x00]);
        data.extend_from_slice(&[0xBA; 0x100]);

        let blobs = Blob::from(&data).unwrap();
        assert_eq!(blobs.get(0).unwrap(), &[] as &[u8]);
        assert_eq!(blobs.get(1).unwrap(), &[0x0A, 0x0B, 0x0C]);
        assert_eq!(blobs.get(5).unwrap().len(), 0x100);
    }

    #[test]
    fn compressed_lengths() {
        assert_eq!(read_compressed_uint(&[0x03]).unwrap(), (3, 1));
        assert_eq!(read_compressed_uint(&[0x80, 0x80]).unwrap(), (0x80, 2));
        assert_eq!(read_compressed_uint(&[0xBF, 0xFF]).unwrap(), (0x3FFF, 2));
        assert_eq!(
            read_compressed_uint(&[0xC0, 0x00, 0x40, 0x00]).unwrap(),
            (0x4000, 4)
        );
        assert!(read_compressed_uint(&[0xFF]).is_err());
        assert!(read_compressed_uint(&[0x81]).is_err());
    }

    #[test]
    fn truncated_payload() {
        let blobs = Blob::from(&[0x00, 0x05, 0x01]).unwrap();
        assert!(matches!(blobs.get(1), Err(OutOfBounds)));
    }
}
