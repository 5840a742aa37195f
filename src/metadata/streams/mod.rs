//! The metadata streams this crate decodes.
//!
//! - **`#~`** - the tables stream, see [`TablesStream`] and [`TablesHeader`]
//! - **`#Strings`** - NUL-terminated UTF-8 identifiers, see [`Strings`]
//! - **`#GUID`** - 16-byte GUIDs addressed by 1-based index, see [`Guid`]
//! - **`#Blob`** - length-prefixed binary values, see [`Blob`]
//!
//! Locating the streams inside an image is left to the caller; every type here works on the
//! stream bytes alone.
//!
//! # References
//!
//! - ECMA-335 6th Edition, Partition II, Section 24.2 - Metadata physical layout

mod blob;
mod guid;
mod strings;
mod tablesbuilder;
mod tablesheader;
mod tablesstream;

pub use blob::Blob;
pub use guid::Guid;
pub use strings::Strings;
pub use tablesbuilder::TablesStreamBuilder;
pub use tablesheader::{TablesHeader, TablesStreamFlags, TABLES_HEADER_FIXED_SIZE};
pub use tablesstream::TablesStream;
