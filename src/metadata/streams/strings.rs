//! The '#Strings' heap: NUL-terminated UTF-8 strings addressed by byte offset.

use std::ffi::CStr;

use crate::{Error::OutOfBounds, Result};

/// A view over the '#Strings' heap.
///
/// Offset 0 always holds the empty string.
pub struct Strings<'a> {
    data: &'a [u8],
}

impl<'a> Strings<'a> {
    /// Creates the heap view.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if `data` is empty or does not start with a NUL byte.
    pub fn from(data: &'a [u8]) -> Result<Strings<'a>> {
        if data.is_empty() || data[0] != 0 {
            return Err(malformed_error!("Provided #Strings heap is empty"));
        }

        Ok(Strings { data })
    }

    /// Size of the heap in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True if the heap only holds the empty string
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.len() <= 1
    }

    /// Returns the string starting at `index`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] for an index past the heap, or
    /// [`crate::Error::Malformed`] if the string is unterminated or not UTF-8.
    pub fn get(&self, index: usize) -> Result<&'a str> {
        if index >= self.data.len() {
            return Err(OutOfBounds);
        }

        CStr::from_bytes_until_nul(&self.data[index..])
            .ok()
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| malformed_error!("Invalid string at index - {}", index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crafted() {
        let data = b"\0<Module>\0System.Runtime\0Outer\0Inner\0";

        let strings = Strings::from(data).unwrap();
        assert_eq!(strings.get(0).unwrap(), "");
        assert_eq!(strings.get(1).unwrap(), "<Module>");
        assert_eq!(strings.get(10).unwrap(), "System.Runtime");
        // Offsets may point into the middle of a string
        assert_eq!(strings.get(17).unwrap(), "Runtime");
        assert_eq!(strings.get(25).unwrap(), "Outer");
    }

    #[test]
    fn invalid() {
        assert!(Strings::from(b"").is_err());
        assert!(Strings::from(b"abc\0").is_err());

        let strings = Strings::from(b"\0abc").unwrap();
        assert!(strings.get(1).unwrap_err().is_format_error());
        assert!(matches!(strings.get(4), Err(OutOfBounds)));
    }
}
