use thiserror::Error;

use crate::metadata::tables::TableId;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

macro_rules! invariant_error {
    ($msg:expr) => {
        crate::Error::InvariantViolation {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::InvariantViolation {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which covers every failure this library can report.
///
/// # Error Categories
///
/// ## Format errors
/// - [`Error::Malformed`] - The header, a heap or the table region is structurally invalid
/// - [`Error::OutOfBounds`] - A read ran past the end of the backing buffer
///
/// Both are fatal to the decode of the affected stream. Retrying with the same bytes will fail
/// the same way.
///
/// ## Out of range
/// - [`Error::RowOutOfRange`] - A positional row request beyond the row count of its table
///
/// Recoverable at the call site. Token resolution in the object graph never reports it and
/// returns an absent result instead.
///
/// ## Invariant violations
/// - [`Error::InvariantViolation`] - The caller broke a documented protocol, e.g. writing a
///   code segment twice or reading a symbol address before assignment finished
///
/// These are programming errors and should not be caught-and-continued.
///
/// # Examples
///
/// ```rust
/// use cilmeta::{metadata::streams::TablesStream, Error};
///
/// match TablesStream::from(&[0u8; 4]) {
///     Err(error) if error.is_format_error() => println!("corrupt stream: {error}"),
///     Err(error) => println!("other failure: {error}"),
///     Ok(_) => unreachable!(),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The data is damaged and could not be parsed.
    ///
    /// Carries the source location where the malformation was detected.
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// An out of bound access was attempted while parsing the data.
    ///
    /// Raised when a read would go past the end of the buffer, e.g. for a truncated stream.
    #[error("Out of Bounds - attempted to access data beyond the available buffer")]
    OutOfBounds,

    /// A row was requested that does not exist in its table.
    #[error("Row {row} is out of range for table {table:?} with {rows} rows")]
    RowOutOfRange {
        /// The table that was accessed
        table: TableId,
        /// The requested 1-based row number
        row: u32,
        /// The number of rows the table actually has
        rows: u32,
    },

    /// A documented protocol was violated by the caller.
    ///
    /// Never a property of the input data. Examples are unknown fixup kinds, writing a code
    /// segment twice, or reading a symbol address before the global address assignment.
    #[error("Invariant violation - {file}:{line}: {message}")]
    InvariantViolation {
        /// Description of the violated invariant
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// A deferred field was resolved after the metadata image that backs it was dropped.
    #[error("The metadata image backing this entity has been dropped")]
    ImageDropped,

    /// Recursion limit reached.
    ///
    /// Nested-type chains deeper than the configured bound, which in practice means cyclic
    /// nesting data.
    #[error("Reach the maximum recursion level allowed - {0}")]
    RecursionLimit(usize),

    /// File I/O error.
    ///
    /// Wraps failures of the output stream used by the fixup writer.
    #[error("{0}")]
    FileError(#[from] std::io::Error),
}

impl Error {
    /// Returns true for errors that describe a malformed or truncated stream.
    #[must_use]
    pub fn is_format_error(&self) -> bool {
        matches!(self, Error::Malformed { .. } | Error::OutOfBounds)
    }

    /// Returns true for out-of-range row requests.
    #[must_use]
    pub fn is_out_of_range(&self) -> bool {
        matches!(self, Error::RowOutOfRange { .. })
    }

    /// Returns true for violated caller protocols.
    #[must_use]
    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, Error::InvariantViolation { .. })
    }
}
