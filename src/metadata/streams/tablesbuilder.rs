//! Authoring of a fresh `#~` stream from typed rows.

use strum::{EnumCount, IntoEnumIterator};

use crate::{
    metadata::{
        streams::{TablesHeader, TablesStreamFlags},
        tables::{RowWritable, TableId, TableInfo, TableLayouts, TableRowData},
        token::Token,
    },
    Result,
};

/// Collects rows per table and encodes them into a tables stream.
///
/// Row counts, the valid mask and every index width are derived from the pushed rows, so the
/// values stored in reference columns only need to be right, not sized.
///
/// # Examples
///
/// ```rust
/// use cilmeta::metadata::{
///     streams::{TablesStream, TablesStreamBuilder},
///     tables::{ModuleRaw, TableId},
/// };
///
/// let mut builder = TablesStreamBuilder::new();
/// let token = builder.push(ModuleRaw { name: 1, mvid: 1, ..Default::default() });
/// assert_eq!(token.value(), 0x0000_0001);
///
/// let data = builder.build()?;
/// let tables = TablesStream::from(&data)?;
/// assert_eq!(tables.row_count(TableId::Module), 1);
/// # Ok::<(), cilmeta::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct TablesStreamBuilder {
    major_version: u8,
    minor_version: u8,
    flags: TablesStreamFlags,
    sorted: u64,
    extra_data: Option<u32>,
    tables: Vec<Vec<TableRowData>>,
}

impl Default for TablesStreamBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TablesStreamBuilder {
    /// An empty version 2.0 stream
    #[must_use]
    pub fn new() -> Self {
        TablesStreamBuilder {
            major_version: 2,
            minor_version: 0,
            flags: TablesStreamFlags::empty(),
            sorted: 0,
            extra_data: None,
            tables: vec![Vec::new(); TableId::COUNT],
        }
    }

    /// Sets the schema version
    pub fn version(&mut self, major: u8, minor: u8) -> &mut Self {
        self.major_version = major;
        self.minor_version = minor;
        self
    }

    /// Sets the header flags; `EXTRA_DATA` is managed by [`TablesStreamBuilder::extra_data`]
    pub fn flags(&mut self, flags: TablesStreamFlags) -> &mut Self {
        self.flags = flags;
        self
    }

    /// Sets the sorted mask
    pub fn sorted(&mut self, sorted: u64) -> &mut Self {
        self.sorted = sorted;
        self
    }

    /// Adds the optional extra data field after the row counts
    pub fn extra_data(&mut self, value: u32) -> &mut Self {
        self.extra_data = Some(value);
        self
    }

    /// Appends `row` to its table and returns its token. The row number of `row` is replaced
    /// with its position in the table.
    pub fn push(&mut self, row: impl Into<TableRowData>) -> Token {
        let mut row = row.into();
        let rows = &mut self.tables[row.table_id().index()];
        let rid = u32::try_from(rows.len() + 1).unwrap_or(u32::MAX);
        row.set_rid(rid);
        let token = row.token();
        rows.push(row);
        token
    }

    /// Number of rows pushed into `table`
    #[must_use]
    pub fn row_count(&self, table: TableId) -> u32 {
        u32::try_from(self.tables[table.index()].len()).unwrap_or(u32::MAX)
    }

    /// Encodes the header and all tables.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if a value does not fit the width of its column.
    pub fn build(&self) -> Result<Vec<u8>> {
        let row_counts: Vec<u32> = TableId::iter().map(|table| self.row_count(table)).collect();
        let header = TablesHeader::new(
            self.major_version,
            self.minor_version,
            self.flags,
            &row_counts,
            self.sorted,
            self.extra_data,
        );
        let info = TableInfo::new(&row_counts, header.flags);
        let layouts = TableLayouts::new(&info);

        let size = header.size()
            + TableId::iter()
                .map(|table| row_counts[table.index()] as usize * layouts.row_size(table) as usize)
                .sum::<usize>();

        let mut buffer = vec![0_u8; size];
        let mut offset = header.write(&mut buffer)?;
        for table in TableId::iter() {
            let layout = layouts.get(table);
            for row in &self.tables[table.index()] {
                row.row_write(&mut buffer, &mut offset, layout)?;
            }
        }

        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{
        streams::TablesStream,
        tables::{CodedIndexType, FieldRaw, TypeDefRaw, TypeRefRaw},
    };

    #[test]
    fn assigns_row_numbers() {
        let mut builder = TablesStreamBuilder::new();
        let first = builder.push(FieldRaw::default());
        let second = builder.push(FieldRaw {
            rid: 77,
            ..Default::default()
        });

        assert_eq!(first, Token::from_parts(TableId::Field, 1));
        assert_eq!(second, Token::from_parts(TableId::Field, 2));
        assert_eq!(builder.row_count(TableId::Field), 2);
    }

    #[test]
    fn widens_columns_with_row_counts() {
        let mut builder = TablesStreamBuilder::new();
        builder.flags(TablesStreamFlags::LARGE_STRINGS);
        builder.push(TypeDefRaw {
            type_name: 0x1_0000,
            field_list: 1,
            method_list: 1,
            ..Default::default()
        });
        let data = builder.build().unwrap();

        let tables = TablesStream::from(&data).unwrap();
        assert_eq!(tables.layouts().row_size(TableId::TypeDef), 18);
        let row = tables.table::<TypeDefRaw>().unwrap().row(1).unwrap();
        assert_eq!(row.type_name, 0x1_0000);
    }

    #[test]
    fn value_too_wide_for_column() {
        let mut builder = TablesStreamBuilder::new();
        builder.push(TypeRefRaw {
            resolution_scope: CodedIndexType::ResolutionScope
                .encode(TableId::AssemblyRef, 0x4000)
                .unwrap(),
            ..Default::default()
        });
        assert!(builder.build().unwrap_err().is_format_error());
    }

    #[test]
    fn extra_data_is_written() {
        let mut builder = TablesStreamBuilder::new();
        builder.extra_data(0xCAFE);
        let data = builder.build().unwrap();

        let tables = TablesStream::from(&data).unwrap();
        assert_eq!(tables.header().extra_data, Some(0xCAFE));
        assert!(tables.header().flags.contains(TablesStreamFlags::EXTRA_DATA));
    }
}
