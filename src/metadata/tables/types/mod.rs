//! Shared building blocks of the metadata tables.
//!
//! - [`TableId`] names the table kinds
//! - [`TableInfo`] resolves reference widths for one stream
//! - [`CodedIndexType`] / [`CodedIndex`] describe and decode coded indexes
//! - [`TableLayouts`] holds the resolved column layout of every table
//! - [`MetadataTable`] gives positional, lazily decoded access to the rows of one table

mod codedindex;
mod layout;
mod tableid;
mod tableinfo;

use std::marker::PhantomData;

use rayon::prelude::*;

use crate::{Error, Result};

pub use codedindex::{CodedIndex, CodedIndexType, CodedIndexTypeIter};
pub use layout::{
    schema, ColumnKind, ColumnLayout, HeapKind, TableLayout, TableLayoutRef, TableLayouts,
    TableLayoutsRef,
};
pub use tableid::{TableId, TableIdIter, TABLE_COUNT};
pub use tableinfo::{TableInfo, TableInfoRef, TableRowInfo};

/// Decoding of a row from its resolved layout
pub trait RowReadable: Sized + Send {
    /// Reads one row starting at `offset`, advancing `offset` past it.
    ///
    /// ## Arguments
    /// * 'data'    - The table bytes
    /// * 'offset'  - Position of the row, advanced by the row size
    /// * 'rid'     - 1-based row number of the row being read
    /// * 'layout'  - Resolved layout of the table
    ///
    /// # Errors
    /// Returns an error if the row can't be read from `data`.
    fn row_read(data: &[u8], offset: &mut usize, rid: u32, layout: &TableLayout) -> Result<Self>;
}

/// Encoding of a row into its resolved layout
pub trait RowWritable {
    /// Writes this row at `offset`, advancing `offset` past it.
    ///
    /// # Errors
    /// Returns an error if the buffer is too small or a value does not fit its column.
    fn row_write(&self, data: &mut [u8], offset: &mut usize, layout: &TableLayout) -> Result<()>;
}

/// A typed row that belongs to exactly one table kind
pub trait TableRow: RowReadable + RowWritable {
    /// The table this row type is read from
    const TABLE_ID: TableId;
}

/// Positional access to the rows of one table.
///
/// Rows are decoded on demand from the borrowed table bytes, nothing is decoded eagerly.
pub struct MetadataTable<'a, T> {
    data: &'a [u8],
    row_count: u32,
    layout: TableLayoutRef,
    _phantom: PhantomData<fn() -> T>,
}

impl<'a, T> Clone for MetadataTable<'a, T> {
    fn clone(&self) -> Self {
        MetadataTable {
            data: self.data,
            row_count: self.row_count,
            layout: self.layout.clone(),
            _phantom: PhantomData,
        }
    }
}

impl<'a, T: RowReadable> MetadataTable<'a, T> {
    /// Creates a table over `data` with `row_count` rows of `layout`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `data` is shorter than
    /// `row_count * layout.row_size`.
    pub fn new(data: &'a [u8], row_count: u32, layout: TableLayoutRef) -> Result<Self> {
        let size = (row_count as usize)
            .checked_mul(layout.row_size as usize)
            .ok_or(Error::OutOfBounds)?;
        if data.len() < size {
            return Err(Error::OutOfBounds);
        }

        Ok(MetadataTable {
            data: &data[..size],
            row_count,
            layout,
            _phantom: PhantomData,
        })
    }

    /// Total size of this table in bytes
    #[must_use]
    pub fn size(&self) -> u64 {
        u64::from(self.row_count) * u64::from(self.layout.row_size)
    }

    /// Size of one row in bytes
    #[must_use]
    pub fn row_size(&self) -> u32 {
        self.layout.row_size
    }

    /// Number of rows
    #[must_use]
    pub fn row_count(&self) -> u32 {
        self.row_count
    }

    /// The layout rows are decoded with
    #[must_use]
    pub fn layout(&self) -> &TableLayoutRef {
        &self.layout
    }

    /// The raw bytes of this table
    #[must_use]
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Decodes row `rid`.
    ///
    /// # Errors
    /// Returns [`crate::Error::RowOutOfRange`] if `rid` is 0 or past the last row.
    pub fn row(&self, rid: u32) -> Result<T> {
        if rid == 0 || rid > self.row_count {
            return Err(Error::RowOutOfRange {
                table: self.layout.table,
                row: rid,
                rows: self.row_count,
            });
        }

        let mut offset = (rid as usize - 1) * self.layout.row_size as usize;
        T::row_read(self.data, &mut offset, rid, &self.layout)
    }

    /// Decodes row `rid`, `None` if it does not exist
    #[must_use]
    pub fn get(&self, rid: u32) -> Option<T> {
        self.row(rid).ok()
    }

    /// Iterates over all rows in order
    #[must_use]
    pub fn iter(&self) -> TableIterator<'_, 'a, T> {
        TableIterator {
            table: self,
            current_row: 0,
            current_offset: 0,
        }
    }

    /// Decodes the rows in parallel on the rayon thread pool
    pub fn par_iter(&self) -> impl ParallelIterator<Item = T> + 'a
    where
        T: 'a,
    {
        let table = self.clone();
        (1..=self.row_count)
            .into_par_iter()
            .filter_map(move |rid| table.get(rid))
    }

    /// Runs `op` for every row in parallel, stopping at the first error.
    ///
    /// # Errors
    /// Returns the first error produced by `op` or by decoding a row.
    pub fn try_for_each<F>(&self, op: F) -> Result<()>
    where
        F: Fn(T) -> Result<()> + Send + Sync,
    {
        (1..=self.row_count)
            .into_par_iter()
            .try_for_each(|rid| op(self.row(rid)?))
    }
}

impl<'t, 'a, T: RowReadable> IntoIterator for &'t MetadataTable<'a, T> {
    type Item = T;
    type IntoIter = TableIterator<'t, 'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Sequential iterator over the rows of a [`MetadataTable`]
pub struct TableIterator<'t, 'a, T> {
    table: &'t MetadataTable<'a, T>,
    current_row: u32,
    current_offset: usize,
}

impl<'t, 'a, T: RowReadable> Iterator for TableIterator<'t, 'a, T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current_row >= self.table.row_count {
            return None;
        }

        match T::row_read(
            self.table.data,
            &mut self.current_offset,
            self.current_row + 1,
            &self.table.layout,
        ) {
            Ok(row) => {
                self.current_row += 1;
                Some(row)
            }
            Err(_) => None,
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.table.row_count - self.current_row) as usize;
        (remaining, Some(remaining))
    }
}
