use std::sync::Arc;

use strum::{EnumCount, IntoEnumIterator};

use crate::metadata::{
    streams::TablesStreamFlags,
    tables::{CodedIndexType, TableId, TABLE_COUNT},
};

/// Row count of one table and the width of indexes pointing into it
#[derive(Clone, Copy, Default, PartialEq, Eq, Debug)]
pub struct TableRowInfo {
    /// The count of rows in this table
    pub rows: u32,
    /// If the count is > `u16::MAX`, indexes into this table are 4 bytes instead of 2
    pub is_large: bool,
}

impl TableRowInfo {
    /// Creates the size information for a table with `rows` rows
    #[must_use]
    pub fn new(rows: u32) -> Self {
        Self {
            rows,
            is_large: rows > u32::from(u16::MAX),
        }
    }
}

/// `TableInfo` resolves the width of every reference column for one tables stream.
///
/// Widths are a property of the stream instance: they depend on the heap-size flags and on the
/// row count of every table, so this can only be built once the full row-count array of the
/// header is known.
///
/// - heap indexes are 4 bytes if the matching flag is set, otherwise 2
/// - a simple table index is 2 bytes if the target has at most `0xFFFF` rows
/// - a coded index is 2 bytes if every candidate table has fewer than
///   `0xFFFF >> tag_bits` rows, reserved slots counting as empty
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct TableInfo {
    rows: Vec<TableRowInfo>,
    coded_indexes: Vec<u8>,
    is_large_index_str: bool,
    is_large_index_guid: bool,
    is_large_index_blob: bool,
}

/// Cheap-copy reference to a `TableInfo` structure
pub type TableInfoRef = Arc<TableInfo>;

impl TableInfo {
    /// Builds the width information from a dense row-count array and the header flags.
    ///
    /// `row_counts` is indexed by table number; missing trailing entries count as 0.
    #[must_use]
    pub fn new(row_counts: &[u32], flags: TablesStreamFlags) -> Self {
        let rows = TableId::iter()
            .map(|table| TableRowInfo::new(row_counts.get(table.index()).copied().unwrap_or(0)))
            .collect();

        let mut table_info = TableInfo {
            rows,
            coded_indexes: vec![2; CodedIndexType::COUNT],
            is_large_index_str: flags.contains(TablesStreamFlags::LARGE_STRINGS),
            is_large_index_guid: flags.contains(TablesStreamFlags::LARGE_GUIDS),
            is_large_index_blob: flags.contains(TablesStreamFlags::LARGE_BLOBS),
        };

        table_info.calculate_coded_index_sizes();
        table_info
    }

    #[cfg(test)]
    /// Special constructor for unit-tests
    ///
    /// ## Arguments
    /// * 'valid_tables'    - A slice of tuples, which provides (table_id, row_count) of the valid tables
    /// * 'large_str'       - Specify if the #String heap indexes are 4 or 2 bytes
    /// * 'large_blob'      - Specify if the #Blob heap indexes are 4 or 2 bytes
    /// * 'large_guid'      - Specify if the #GUID heap indexes are 4 or 2 bytes
    pub fn new_test(
        valid_tables: &[(TableId, u32)],
        large_str: bool,
        large_blob: bool,
        large_guid: bool,
    ) -> Self {
        let mut row_counts = [0_u32; TABLE_COUNT];
        for (table, rows) in valid_tables {
            row_counts[table.index()] = *rows;
        }

        let mut flags = TablesStreamFlags::empty();
        flags.set(TablesStreamFlags::LARGE_STRINGS, large_str);
        flags.set(TablesStreamFlags::LARGE_BLOBS, large_blob);
        flags.set(TablesStreamFlags::LARGE_GUIDS, large_guid);

        TableInfo::new(&row_counts, flags)
    }

    /// Number of rows of `table`
    #[must_use]
    pub fn rows(&self, table: TableId) -> u32 {
        self.rows[table.index()].rows
    }

    /// Returns the size information of one table
    #[must_use]
    pub fn get(&self, table: TableId) -> &TableRowInfo {
        &self.rows[table.index()]
    }

    /// True if indexes into `table` need 4 bytes
    #[must_use]
    pub fn is_large(&self, table: TableId) -> bool {
        self.rows[table.index()].is_large
    }

    /// Indicates the size of indexes referring into the '#Strings' heap. True means 4 bytes, False is 2 bytes
    #[must_use]
    pub fn is_large_str(&self) -> bool {
        self.is_large_index_str
    }

    /// Indicates the size of indexes referring into the '#GUID' heap. True means 4 bytes, False is 2 bytes
    #[must_use]
    pub fn is_large_guid(&self) -> bool {
        self.is_large_index_guid
    }

    /// Indicates the size of indexes referring into the '#Blob' heap. True means 4 bytes, False is 2 bytes
    #[must_use]
    pub fn is_large_blob(&self) -> bool {
        self.is_large_index_blob
    }

    /// Width in bytes of a '#Strings' heap index
    #[must_use]
    pub fn str_bytes(&self) -> u8 {
        if self.is_large_index_str {
            4
        } else {
            2
        }
    }

    /// Width in bytes of a '#GUID' heap index
    #[must_use]
    pub fn guid_bytes(&self) -> u8 {
        if self.is_large_index_guid {
            4
        } else {
            2
        }
    }

    /// Width in bytes of a '#Blob' heap index
    #[must_use]
    pub fn blob_bytes(&self) -> u8 {
        if self.is_large_index_blob {
            4
        } else {
            2
        }
    }

    /// Width in bytes of a simple index into `table`
    #[must_use]
    pub fn table_index_bytes(&self, table: TableId) -> u8 {
        if self.is_large(table) {
            4
        } else {
            2
        }
    }

    /// Width in bytes of a coded index of the given category
    #[must_use]
    pub fn coded_index_bytes(&self, coded_index_type: CodedIndexType) -> u8 {
        self.coded_indexes[coded_index_type as usize]
    }

    /// True if coded indexes of the given category need 4 bytes
    #[must_use]
    pub fn is_large_coded(&self, coded_index_type: CodedIndexType) -> bool {
        self.coded_index_bytes(coded_index_type) == 4
    }

    fn coded_index_size(&self, coded_index_type: CodedIndexType) -> u8 {
        let threshold = 0xFFFF_u32 >> coded_index_type.tag_bits();
        let fits = coded_index_type
            .slots()
            .iter()
            .map(|slot| slot.map_or(0, |table| self.rows(table)))
            .all(|rows| rows < threshold);

        if fits {
            2
        } else {
            4
        }
    }

    fn calculate_coded_index_sizes(&mut self) {
        for coded_index in CodedIndexType::iter() {
            self.coded_indexes[coded_index as usize] = self.coded_index_size(coded_index);
        }
    }
}
