//! Decoding and object graph of the ECMA-335 metadata tables.
//!
//! # Key Components
//!
//! - [`streams`] - the `#~` tables stream header, table ranges and the heaps
//! - [`tables`] - table kinds, index widths, column layouts and typed rows
//! - [`token`] - `(table, row)` identities used for every cross reference
//! - [`view`] - owned stream buffers with their decoders
//! - [`members`] - the token-addressed entity graph
//! - [`config`] - decoder settings
//!
//! # Examples
//!
//! ```rust,no_run
//! use cilmeta::metadata::{streams::TablesStream, tables::TableId};
//!
//! # fn example(data: &[u8]) -> cilmeta::Result<()> {
//! let tables = TablesStream::from(data)?;
//! for table in tables.header().present_tables() {
//!     println!("{:?}: {} rows", table, tables.row_count(table));
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # References
//!
//! - ECMA-335 6th Edition, Partition II, Section 22 - Metadata logical format: tables
//! - ECMA-335 6th Edition, Partition II, Section 24 - Metadata physical layout

/// Decoder settings
pub mod config;
/// The token-addressed object graph
pub mod members;
/// The metadata streams
pub mod streams;
/// Table kinds, layouts and rows
pub mod tables;
/// Metadata tokens
pub mod token;
/// Owned streams and their decoders
pub mod view;
