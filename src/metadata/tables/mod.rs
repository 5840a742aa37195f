//! Metadata tables: ids, reference widths, layouts and typed rows.
//!
//! The tables stream stores up to 45 tables back to back. How many bytes a row occupies
//! depends on the stream: heap indexes, table indexes and coded indexes are 2 or 4 bytes wide
//! depending on the heap-size flags and the row counts. [`TableInfo`] resolves those widths,
//! [`TableLayouts`] applies them to the static column schemas, and the typed rows in this
//! module are read and written through the resulting [`TableLayout`]s.

mod rows;
mod types;

pub use rows::*;
pub use types::*;
