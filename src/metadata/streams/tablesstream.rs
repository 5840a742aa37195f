//! The `#~` tables stream: header, resolved layouts and the carved table ranges.
//!
//! Tables follow the header back to back, in table number order, each `row_count * row_size`
//! bytes long. Nothing is decoded up front; [`TablesStream::table`] and [`TablesStream::row`]
//! decode rows when they are asked for.
//!
//! # Examples
//!
//! ```rust,no_run
//! use cilmeta::metadata::{streams::TablesStream, tables::{TableId, TypeDefRaw}};
//!
//! # fn example(data: &[u8]) -> cilmeta::Result<()> {
//! let tables = TablesStream::from(data)?;
//! if let Some(types) = tables.table::<TypeDefRaw>() {
//!     for row in &types {
//!         println!("TypeDef {} name at #Strings+{}", row.rid, row.type_name);
//!     }
//! }
//! let module = tables.row(TableId::Module, 1)?;
//! # Ok(())
//! # }
//! ```

use std::{ops::Range, sync::Arc};

use strum::{EnumCount, IntoEnumIterator};
use tracing::{debug, trace, warn};

use crate::{
    metadata::{
        config::MetadataConfig,
        streams::TablesHeader,
        tables::{
            MetadataTable, RowReadable, RowWritable, TableId, TableInfo, TableInfoRef, TableLayouts,
            TableLayoutsRef, TableRow, TableRowData,
        },
    },
    Error, Result,
};

/// A decoded `#~` stream borrowing its bytes.
pub struct TablesStream<'a> {
    data: &'a [u8],
    header: TablesHeader,
    info: TableInfoRef,
    layouts: TableLayoutsRef,
    ranges: Vec<Option<Range<usize>>>,
    tables_end: usize,
}

impl<'a> TablesStream<'a> {
    /// Decodes `data` with the default [`MetadataConfig`].
    ///
    /// # Errors
    /// See [`TablesStream::with_config`].
    pub fn from(data: &'a [u8]) -> Result<TablesStream<'a>> {
        Self::with_config(data, &MetadataConfig::default())
    }

    /// Decodes the header of `data`, resolves all widths and layouts, and carves the byte range
    /// of every present table.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for a truncated header, a table range past the end of
    /// `data`, or a header the configuration rejects. Returns [`crate::Error::OutOfBounds`] if
    /// the row-count array itself is truncated.
    pub fn with_config(data: &'a [u8], config: &MetadataConfig) -> Result<TablesStream<'a>> {
        let header = TablesHeader::read(data)?;

        if header.reserved != 0 || !matches!(header.major_version, 1 | 2) {
            if config.strict_header {
                return Err(malformed_error!(
                    "Tables stream header rejected - reserved 0x{:x}, version {}.{}",
                    header.reserved,
                    header.major_version,
                    header.minor_version
                ));
            }
            warn!(
                reserved = header.reserved,
                major = header.major_version,
                minor = header.minor_version,
                "tolerating unusual tables stream header"
            );
        }

        if header.has_unknown_tables() {
            if !config.allow_unknown_tables {
                return Err(malformed_error!(
                    "Tables stream announces {} undefined tables",
                    header.unknown_row_counts().len()
                ));
            }
            warn!(
                unknown = ?header.unknown_row_counts(),
                "tolerating undefined table bits, their bytes are kept as trailing data"
            );
        }

        let info = Arc::new(TableInfo::new(header.row_counts(), header.flags));
        let layouts = Arc::new(TableLayouts::new(&info));

        let mut ranges = vec![None; TableId::COUNT];
        let mut offset = header.size();
        if offset > data.len() {
            return Err(Error::OutOfBounds);
        }

        for table in header.present_tables() {
            let size = u64::from(header.row_count(table)) * u64::from(layouts.row_size(table));
            let end = usize::try_from(size)
                .ok()
                .and_then(|size| offset.checked_add(size))
                .filter(|end| *end <= data.len())
                .ok_or_else(|| {
                    malformed_error!(
                        "Table {:?} needs {} bytes at offset {}, stream has {}",
                        table,
                        size,
                        offset,
                        data.len()
                    )
                })?;

            trace!(?table, start = offset, end, "carved table");
            ranges[table.index()] = Some(offset..end);
            offset = end;
        }

        debug!(
            major = header.major_version,
            minor = header.minor_version,
            tables = header.table_count(),
            str_bytes = info.str_bytes(),
            guid_bytes = info.guid_bytes(),
            blob_bytes = info.blob_bytes(),
            "decoded tables stream"
        );

        Ok(TablesStream {
            data,
            header,
            info,
            layouts,
            ranges,
            tables_end: offset,
        })
    }

    /// The decoded header
    #[must_use]
    pub fn header(&self) -> &TablesHeader {
        &self.header
    }

    /// Index widths resolved for this stream
    #[must_use]
    pub fn info(&self) -> &TableInfoRef {
        &self.info
    }

    /// Row layouts resolved for this stream
    #[must_use]
    pub fn layouts(&self) -> &TableLayoutsRef {
        &self.layouts
    }

    /// The complete stream bytes
    #[must_use]
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Number of tables marked present, undefined ones included
    #[must_use]
    pub fn table_count(&self) -> u32 {
        self.header.table_count()
    }

    /// Row count of `table`, 0 if it is not present
    #[must_use]
    pub fn row_count(&self, table: TableId) -> u32 {
        self.header.row_count(table)
    }

    /// Byte range of `table` within the stream
    #[must_use]
    pub fn table_range(&self, table: TableId) -> Option<Range<usize>> {
        self.ranges[table.index()].clone()
    }

    /// The raw bytes of `table`
    #[must_use]
    pub fn table_data(&self, table: TableId) -> Option<&'a [u8]> {
        self.ranges[table.index()]
            .clone()
            .map(|range| &self.data[range])
    }

    /// Bytes after the last defined table, usually empty or alignment padding
    #[must_use]
    pub fn trailing_data(&self) -> &'a [u8] {
        &self.data[self.tables_end..]
    }

    /// Typed access to the table of `T`, `None` if that table is not present
    #[must_use]
    pub fn table<T: TableRow>(&self) -> Option<MetadataTable<'a, T>> {
        self.typed(T::TABLE_ID)
    }

    /// Access to any table through the [`TableRowData`] union
    #[must_use]
    pub fn rows(&self, table: TableId) -> Option<MetadataTable<'a, TableRowData>> {
        self.typed(table)
    }

    fn typed<T: RowReadable>(&self, table: TableId) -> Option<MetadataTable<'a, T>> {
        let data = self.table_data(table)?;
        MetadataTable::new(
            data,
            self.header.row_count(table),
            self.layouts.get(table).clone(),
        )
        .ok()
    }

    /// Decodes row `rid` of `table`.
    ///
    /// # Errors
    /// Returns [`crate::Error::RowOutOfRange`] if the row does not exist, including every row of
    /// a table that is not present.
    pub fn row(&self, table: TableId, rid: u32) -> Result<TableRowData> {
        match self.rows(table) {
            Some(rows) => rows.row(rid),
            None => Err(Error::RowOutOfRange {
                table,
                row: rid,
                rows: 0,
            }),
        }
    }

    /// Re-encodes the stream: header, every row through its layout, then the trailing bytes.
    ///
    /// For a well formed stream the result equals the input.
    ///
    /// # Errors
    /// Returns an error if a row can't be decoded or written back.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buffer = vec![0_u8; self.data.len()];
        let mut offset = self.header.write(&mut buffer)?;

        for table in TableId::iter() {
            let Some(rows) = self.rows(table) else {
                continue;
            };

            for rid in 1..=rows.row_count() {
                rows.row(rid)?
                    .row_write(&mut buffer, &mut offset, rows.layout())?;
            }
        }

        let trailing = self.trailing_data();
        buffer[offset..offset + trailing.len()].copy_from_slice(trailing);
        Ok(buffer)
    }
}
