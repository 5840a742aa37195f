//! Bounds-checked little-endian reads and writes over byte buffers.
//!
//! Every multi-byte value in the tables stream is little-endian. Heap, table and coded index
//! columns are either 2 or 4 bytes wide depending on the stream, which is what the `_dyn`
//! variants are for: they always hand out a `u32`.

use crate::{Error::OutOfBounds, Result};

/// Primitive integers that can be moved in and out of little-endian byte arrays.
pub trait CilIO: Sized + Copy {
    /// Fixed-size byte array backing this type
    type Bytes: AsRef<[u8]> + for<'a> TryFrom<&'a [u8]>;

    /// Builds the value from little-endian bytes
    fn from_le_bytes(bytes: Self::Bytes) -> Self;

    /// Produces the little-endian byte representation
    fn to_le_bytes(self) -> Self::Bytes;
}

macro_rules! impl_cil_io {
    ($($ty:ty),+) => {
        $(
            impl CilIO for $ty {
                type Bytes = [u8; std::mem::size_of::<$ty>()];

                fn from_le_bytes(bytes: Self::Bytes) -> Self {
                    <$ty>::from_le_bytes(bytes)
                }

                fn to_le_bytes(self) -> Self::Bytes {
                    <$ty>::to_le_bytes(self)
                }
            }
        )+
    };
}

impl_cil_io!(u8, i8, u16, i16, u32, i32, u64, i64);

/// Reads a `T` from the start of `data`.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if `data` is shorter than `T`.
pub fn read_le<T: CilIO>(data: &[u8]) -> Result<T> {
    let mut offset = 0_usize;
    read_le_at(data, &mut offset)
}

/// Reads a `T` at `offset` and advances `offset` past it.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if the read would go past the end of `data`.
pub fn read_le_at<T: CilIO>(data: &[u8], offset: &mut usize) -> Result<T> {
    let type_len = std::mem::size_of::<T>();
    let end = offset.checked_add(type_len).ok_or(OutOfBounds)?;
    if end > data.len() {
        return Err(OutOfBounds);
    }

    let Ok(read) = <T::Bytes>::try_from(&data[*offset..end]) else {
        return Err(OutOfBounds);
    };

    *offset = end;
    Ok(T::from_le_bytes(read))
}

/// Reads a 2 or 4 byte value at `offset`, widened to `u32`.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if the read would go past the end of `data`.
pub fn read_le_at_dyn(data: &[u8], offset: &mut usize, is_large: bool) -> Result<u32> {
    if is_large {
        read_le_at::<u32>(data, offset)
    } else {
        Ok(u32::from(read_le_at::<u16>(data, offset)?))
    }
}

/// Writes `value` at `offset` and advances `offset` past it.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if the value does not fit into `data`.
pub fn write_le_at<T: CilIO>(data: &mut [u8], offset: &mut usize, value: T) -> Result<()> {
    let bytes = value.to_le_bytes();
    let bytes = bytes.as_ref();
    let end = offset.checked_add(bytes.len()).ok_or(OutOfBounds)?;
    if end > data.len() {
        return Err(OutOfBounds);
    }

    data[*offset..end].copy_from_slice(bytes);
    *offset = end;
    Ok(())
}

/// Writes `value` as 2 or 4 bytes at `offset`.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if the value does not fit into `data`, or
/// [`crate::Error::Malformed`] if `value` does not fit into 2 bytes for a small column.
pub fn write_le_at_dyn(data: &mut [u8], offset: &mut usize, value: u32, is_large: bool) -> Result<()> {
    if is_large {
        write_le_at::<u32>(data, offset, value)
    } else {
        let Ok(small) = u16::try_from(value) else {
            return Err(malformed_error!(
                "Value 0x{:x} does not fit into a 2 byte column",
                value
            ));
        };
        write_le_at::<u16>(data, offset, small)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    const TEST_BUFFER: [u8; 8] = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];

    #[test]
    fn read_le_primitives() {
        assert_eq!(read_le::<u8>(&TEST_BUFFER).unwrap(), 0x01);
        assert_eq!(read_le::<u16>(&TEST_BUFFER).unwrap(), 0x0201);
        assert_eq!(read_le::<u32>(&TEST_BUFFER).unwrap(), 0x0403_0201);
        assert_eq!(read_le::<u64>(&TEST_BUFFER).unwrap(), 0x0807_0605_0403_0201);
    }

    #[test]
    fn read_le_at_advances() {
        let mut offset = 1;
        assert_eq!(read_le_at::<u16>(&TEST_BUFFER, &mut offset).unwrap(), 0x0302);
        assert_eq!(offset, 3);
        assert_eq!(read_le_at::<i8>(&TEST_BUFFER, &mut offset).unwrap(), 0x04);
        assert_eq!(offset, 4);
    }

    #[test]
    fn read_le_at_dyn_widths() {
        let mut offset = 0;
        assert_eq!(read_le_at_dyn(&TEST_BUFFER, &mut offset, false).unwrap(), 0x0201);
        assert_eq!(read_le_at_dyn(&TEST_BUFFER, &mut offset, true).unwrap(), 0x0605_0403);
        assert_eq!(offset, 6);
    }

    #[test]
    fn read_past_end() {
        let mut offset = 6;
        assert!(matches!(
            read_le_at::<u32>(&TEST_BUFFER, &mut offset),
            Err(Error::OutOfBounds)
        ));
        assert_eq!(offset, 6);
    }

    #[test]
    fn write_le_at_dyn_widths() {
        let mut buffer = [0u8; 6];
        let mut offset = 0;
        write_le_at_dyn(&mut buffer, &mut offset, 0xBEEF, false).unwrap();
        write_le_at_dyn(&mut buffer, &mut offset, 0x0102_0304, true).unwrap();
        assert_eq!(buffer, [0xEF, 0xBE, 0x04, 0x03, 0x02, 0x01]);
    }

    #[test]
    fn write_small_overflow() {
        let mut buffer = [0u8; 2];
        let mut offset = 0;
        let result = write_le_at_dyn(&mut buffer, &mut offset, 0x1_0000, false);
        assert!(matches!(result, Err(Error::Malformed { .. })));
    }

    #[test]
    fn write_negative_i32() {
        let mut buffer = [0u8; 4];
        let mut offset = 0;
        write_le_at::<i32>(&mut buffer, &mut offset, -8).unwrap();
        assert_eq!(buffer, [0xF8, 0xFF, 0xFF, 0xFF]);
    }
}
