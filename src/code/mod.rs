//! Native code segments and their address fixups.
//!
//! Segments are collected in a [`CodeImage`] together with the fixups that patch 4-byte
//! operands once the final addresses are known. Writing runs in three phases:
//!
//! 1. Add segments and record fixups against symbols from the image's [`SymbolTable`]
//! 2. Commit one [`AddressAssignment`] for all segments and symbols
//! 3. Write each segment once into any `Write + Seek` sink, e.g. [`crate::file::output::Output`]
//!
//! # Examples
//!
//! ```rust
//! use std::io::Cursor;
//! use cilmeta::code::{
//!     AddressAssignment, AddressFixup, AddressFixupKind, CodeImage, CodeSegment,
//! };
//!
//! # fn example() -> cilmeta::Result<()> {
//! let mut image = CodeImage::new(0x40_0000);
//! let callee = image.define_symbol("callee");
//!
//! let mut segment = CodeSegment::new(vec![0xE8, 0, 0, 0, 0, 0xC3]);
//! segment.add_fixup(AddressFixup::new(1, AddressFixupKind::Relative32, callee))?;
//! let stub = image.add_segment(segment);
//!
//! let mut assignment = AddressAssignment::new();
//! assignment.place_segment(stub, 0x200, 0x2000);
//! assignment.place_symbol(callee, 0x2100);
//! image.assign_addresses(&assignment)?;
//!
//! let mut output = Cursor::new(Vec::new());
//! image.write_all(&mut output)?;
//! assert_eq!(&output.get_ref()[0x201..0x205], &0xFB_i32.to_le_bytes());
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

mod assignment;
mod segment;
mod symbol;
mod writer;

pub use assignment::AddressAssignment;
pub use segment::{
    AddressFixup, AddressFixupKind, CodeSegment, SegmentId, SegmentPlacement, SegmentState,
};
pub use symbol::{SymbolId, SymbolTable};
pub use writer::CodeImage;
