// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![allow(clippy::too_many_arguments)]

//! # cilmeta
//!
//! Decoding, object-graph materialization and address fixups for the ECMA-335 `#~` metadata
//! tables stream embedded in .NET PE images.
//!
//! The crate is organized bottom-up:
//!
//! - [`metadata::streams::TablesHeader`] parses the fixed stream header, the valid/sorted
//!   bitmasks and the row-count array
//! - [`metadata::tables::TableInfo`] resolves the 2 / 4 byte width of every heap, table and
//!   coded index reference for one stream instance
//! - [`metadata::tables::TableLayouts`] turns those widths into per-table column layouts
//! - [`metadata::streams::TablesStream`] carves the table region and hands out lazily decoded rows
//! - [`metadata::members::MetadataImage`] materializes token-addressed entities with deferred
//!   fields and bidirectionally consistent ownership edges
//! - [`code::CodeImage`] positions code segments and patches their address fixups on write
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cilmeta::prelude::*;
//!
//! # fn load() -> cilmeta::Result<()> {
//! let streams = MetadataStreams {
//!     tables: std::fs::read("tables.bin")?,
//!     strings: Some(std::fs::read("strings.bin")?),
//!     ..Default::default()
//! };
//!
//! let image = MetadataImage::from_streams(streams)?;
//! if let Some(module) = image.module()? {
//!     for ty in module.all_types() {
//!         println!("{}", ty?.full_name()?);
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! All fallible operations return [`Result<T>`] with the crate wide [`Error`] type. Format
//! problems, out-of-range rows and invariant violations are distinct variants, so callers can
//! decide which of them to tolerate.

#[macro_use]
pub(crate) mod macros;

#[macro_use]
pub(crate) mod error;

pub(crate) mod file;

#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types
pub mod prelude;

/// Tables stream decoding, heaps and the token-addressed object graph
pub mod metadata;

/// Code segments, address assignment and fixup writing
pub mod code;

pub use file::output::Output;

/// `cilmeta` Result type
///
/// A type alias for `std::result::Result<T, Error>` where the error type is always
/// [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `cilmeta` Error type
///
/// See [`error::Error`] for the variants and how they are classified.
pub use error::Error;
