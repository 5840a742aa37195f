//! The fixed header of the `#~` tables stream, ECMA-335 Partition II, Section 24.2.6.
//!
//! ```text
//! offset  size  field
//! 0       4     reserved
//! 4       1     major version
//! 5       1     minor version
//! 6       1     flags (heap sizes and extensions)
//! 7       1     log2 of the largest row id
//! 8       8     valid mask, one bit per present table
//! 16      8     sorted mask
//! 24      4*n   row counts of the present tables, ascending table number
//! ...     4     extra data, only if the EXTRA_DATA flag is set
//! ```

use bitflags::bitflags;
use strum::IntoEnumIterator;

use crate::{
    file::io::{read_le_at, write_le_at},
    metadata::tables::{TableId, TABLE_COUNT},
    Result,
};

/// Size of the header fields before the row-count array
pub const TABLES_HEADER_FIXED_SIZE: usize = 24;

bitflags! {
    /// The flags byte of the tables stream header.
    ///
    /// Unknown bits are retained so that the header re-encodes bit-exact.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TablesStreamFlags: u8 {
        /// '#Strings' heap indexes are 4 bytes
        const LARGE_STRINGS = 0x01;
        /// '#GUID' heap indexes are 4 bytes
        const LARGE_GUIDS = 0x02;
        /// '#Blob' heap indexes are 4 bytes
        const LARGE_BLOBS = 0x04;
        /// Heaps were padded by an edit-and-continue aware compiler
        const PADDING_BIT = 0x08;
        /// The stream only holds edit-and-continue deltas
        const DELTA_ONLY = 0x20;
        /// A 4-byte extra data field follows the row counts
        const EXTRA_DATA = 0x40;
        /// The stream may contain `_Deleted` rows
        const HAS_DELETE = 0x80;
    }
}

/// The decoded tables stream header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TablesHeader {
    /// Reserved, should be 0
    pub reserved: u32,
    /// Major version of the table schema, 2 for current images
    pub major_version: u8,
    /// Minor version of the table schema
    pub minor_version: u8,
    /// Heap size and extension flags
    pub flags: TablesStreamFlags,
    /// Log2 of the largest row id, informational
    pub log2_largest_rid: u8,
    /// Bitmask of present tables
    pub valid: u64,
    /// Bitmask of tables sorted by their primary key
    pub sorted: u64,
    /// Optional trailing extra data value
    pub extra_data: Option<u32>,
    row_counts: Vec<u32>,
    unknown_row_counts: Vec<(u8, u32)>,
}

impl TablesHeader {
    /// Creates a header for the given row counts.
    ///
    /// The valid mask is derived from the non-zero entries of `row_counts`, indexed by table
    /// number. The `EXTRA_DATA` flag follows `extra_data`.
    #[must_use]
    pub fn new(
        major_version: u8,
        minor_version: u8,
        flags: TablesStreamFlags,
        row_counts: &[u32],
        sorted: u64,
        extra_data: Option<u32>,
    ) -> Self {
        let mut dense = vec![0_u32; TABLE_COUNT];
        let mut valid = 0_u64;
        for table in TableId::iter() {
            let rows = row_counts.get(table.index()).copied().unwrap_or(0);
            if rows != 0 {
                dense[table.index()] = rows;
                valid |= table.mask_bit();
            }
        }

        let mut flags = flags;
        flags.set(TablesStreamFlags::EXTRA_DATA, extra_data.is_some());

        TablesHeader {
            reserved: 0,
            major_version,
            minor_version,
            flags,
            log2_largest_rid: 1,
            valid,
            sorted,
            extra_data,
            row_counts: dense,
            unknown_row_counts: Vec::new(),
        }
    }

    /// Parses the header at the start of `data`.
    ///
    /// Valid-mask bits beyond the defined table kinds still own a row count, which is consumed
    /// and kept in [`TablesHeader::unknown_row_counts`].
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if `data` is shorter than the fixed header, and
    /// [`crate::Error::OutOfBounds`] if the row counts or extra data are truncated.
    pub fn read(data: &[u8]) -> Result<TablesHeader> {
        if data.len() < TABLES_HEADER_FIXED_SIZE {
            return Err(malformed_error!(
                "Tables stream of {} bytes is shorter than its {} byte header",
                data.len(),
                TABLES_HEADER_FIXED_SIZE
            ));
        }

        let mut offset = 0_usize;
        let reserved = read_le_at::<u32>(data, &mut offset)?;
        let major_version = read_le_at::<u8>(data, &mut offset)?;
        let minor_version = read_le_at::<u8>(data, &mut offset)?;
        let flags = TablesStreamFlags::from_bits_retain(read_le_at::<u8>(data, &mut offset)?);
        let log2_largest_rid = read_le_at::<u8>(data, &mut offset)?;
        let valid = read_le_at::<u64>(data, &mut offset)?;
        let sorted = read_le_at::<u64>(data, &mut offset)?;

        let mut row_counts = vec![0_u32; TABLE_COUNT];
        let mut unknown_row_counts = Vec::new();
        for bit in 0..64_u8 {
            if valid & (1_u64 << bit) == 0 {
                continue;
            }

            let rows = read_le_at::<u32>(data, &mut offset)?;
            match TableId::from_u8(bit) {
                Some(table) => row_counts[table.index()] = rows,
                None => unknown_row_counts.push((bit, rows)),
            }
        }

        let extra_data = if flags.contains(TablesStreamFlags::EXTRA_DATA) {
            Some(read_le_at::<u32>(data, &mut offset)?)
        } else {
            None
        };

        Ok(TablesHeader {
            reserved,
            major_version,
            minor_version,
            flags,
            log2_largest_rid,
            valid,
            sorted,
            extra_data,
            row_counts,
            unknown_row_counts,
        })
    }

    /// Size of the encoded header in bytes, which is also where the first table starts
    #[must_use]
    pub fn size(&self) -> usize {
        TABLES_HEADER_FIXED_SIZE
            + self.valid.count_ones() as usize * 4
            + if self.extra_data.is_some() { 4 } else { 0 }
    }

    /// Encodes the header into the start of `data`, returning the number of bytes written.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `data` is shorter than [`TablesHeader::size`].
    pub fn write(&self, data: &mut [u8]) -> Result<usize> {
        let mut offset = 0_usize;
        write_le_at(data, &mut offset, self.reserved)?;
        write_le_at(data, &mut offset, self.major_version)?;
        write_le_at(data, &mut offset, self.minor_version)?;
        write_le_at(data, &mut offset, self.flags.bits())?;
        write_le_at(data, &mut offset, self.log2_largest_rid)?;
        write_le_at(data, &mut offset, self.valid)?;
        write_le_at(data, &mut offset, self.sorted)?;

        for bit in 0..64_u8 {
            if self.valid & (1_u64 << bit) == 0 {
                continue;
            }

            let rows = match TableId::from_u8(bit) {
                Some(table) => self.row_counts[table.index()],
                None => self
                    .unknown_row_counts
                    .iter()
                    .find(|(unknown, _)| *unknown == bit)
                    .map_or(0, |(_, rows)| *rows),
            };
            write_le_at(data, &mut offset, rows)?;
        }

        if let Some(extra_data) = self.extra_data {
            write_le_at(data, &mut offset, extra_data)?;
        }

        Ok(offset)
    }

    /// Row count of `table`, 0 if the table is not present
    #[must_use]
    pub fn row_count(&self, table: TableId) -> u32 {
        self.row_counts[table.index()]
    }

    /// Dense row-count array indexed by table number
    #[must_use]
    pub fn row_counts(&self) -> &[u32] {
        &self.row_counts
    }

    /// Row counts announced for valid-mask bits that name no defined table
    #[must_use]
    pub fn unknown_row_counts(&self) -> &[(u8, u32)] {
        &self.unknown_row_counts
    }

    /// True if the valid mask announces tables beyond the defined kinds
    #[must_use]
    pub fn has_unknown_tables(&self) -> bool {
        !self.unknown_row_counts.is_empty()
    }

    /// True if `table` is marked present in the valid mask
    #[must_use]
    pub fn has_table(&self, table: TableId) -> bool {
        self.valid & table.mask_bit() != 0
    }

    /// True if `table` is marked sorted
    #[must_use]
    pub fn is_sorted(&self, table: TableId) -> bool {
        self.sorted & table.mask_bit() != 0
    }

    /// Number of bits set in the valid mask
    #[must_use]
    pub fn table_count(&self) -> u32 {
        self.valid.count_ones()
    }

    /// Iterates over the defined tables marked present, in table order
    pub fn present_tables(&self) -> impl Iterator<Item = TableId> + '_ {
        TableId::iter().filter(|table| self.has_table(*table))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[rustfmt::skip]
    fn crafted_header(flags: u8, valid: u64, rows: &[u32], extra: Option<u32>) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&0_u32.to_le_bytes());       // reserved
        data.extend_from_slice(&[0x02, 0x00, flags, 0x01]); // major, minor, flags, log2 rid
        data.extend_from_slice(&valid.to_le_bytes());
        data.extend_from_slice(&0x0000_1600_3301_FA00_u64.to_le_bytes()); // sorted
        for count in rows {
            data.extend_from_slice(&count.to_le_bytes());
        }
        if let Some(extra) = extra {
            data.extend_from_slice(&extra.to_le_bytes());
        }
        data
    }

    #[test]
    fn crafted() {
        // Module, TypeDef and NestedClass
        let valid = 0b101 | (1 << 0x29);
        let data = crafted_header(0x05, valid, &[1, 7, 3], None);

        let header = TablesHeader::read(&data).unwrap();
        assert_eq!(header.major_version, 2);
        assert_eq!(header.minor_version, 0);
        assert_eq!(header.flags, TablesStreamFlags::LARGE_STRINGS | TablesStreamFlags::LARGE_BLOBS);
        assert_eq!(header.log2_largest_rid, 1);
        assert_eq!(header.table_count(), 3);
        assert_eq!(header.row_count(TableId::Module), 1);
        assert_eq!(header.row_count(TableId::TypeRef), 0);
        assert_eq!(header.row_count(TableId::TypeDef), 7);
        assert_eq!(header.row_count(TableId::NestedClass), 3);
        assert_eq!(header.row_counts().len(), TABLE_COUNT);
        assert!(header.is_sorted(TableId::NestedClass));
        assert!(!header.is_sorted(TableId::TypeDef));
        assert_eq!(header.extra_data, None);
        assert_eq!(header.size(), 24 + 12);
        assert_eq!(
            header.present_tables().collect::<Vec<_>>(),
            vec![TableId::Module, TableId::TypeDef, TableId::NestedClass]
        );
    }

    #[test]
    fn extra_data() {
        let data = crafted_header(0x40, 0b1, &[1], Some(0xDEAD_BEEF));

        let header = TablesHeader::read(&data).unwrap();
        assert_eq!(header.extra_data, Some(0xDEAD_BEEF));
        assert_eq!(header.size(), 24 + 4 + 4);
    }

    #[test]
    fn unknown_bits_keep_their_counts() {
        let valid = 0b1 | (1 << 0x30);
        let data = crafted_header(0x00, valid, &[1, 9], None);

        let header = TablesHeader::read(&data).unwrap();
        assert!(header.has_unknown_tables());
        assert_eq!(header.unknown_row_counts(), &[(0x30, 9)]);
        assert_eq!(header.size(), 24 + 8);
    }

    #[test]
    fn short_header() {
        let data = crafted_header(0x00, 0b1, &[1], None);
        assert!(TablesHeader::read(&data[..23]).unwrap_err().is_format_error());
        // Valid mask announces a table but the row count is cut off
        assert!(TablesHeader::read(&data[..26]).unwrap_err().is_format_error());
    }

    #[test]
    fn missing_extra_data() {
        let data = crafted_header(0x40, 0b1, &[1], None);
        assert!(TablesHeader::read(&data).is_err());
    }

    #[test]
    fn write_reproduces_bytes() {
        let valid = 0b111 | (1 << 0x29) | (1 << 0x3F);
        let data = crafted_header(0xD7, valid, &[1, 2, 3, 4, 5], Some(7));

        let header = TablesHeader::read(&data).unwrap();
        let mut written = vec![0u8; header.size()];
        assert_eq!(header.write(&mut written).unwrap(), data.len());
        assert_eq!(written, data);
    }

    #[test]
    fn new_derives_valid_mask() {
        let mut rows = vec![0_u32; TABLE_COUNT];
        rows[TableId::Module.index()] = 1;
        rows[TableId::Field.index()] = 4;

        let header = TablesHeader::new(2, 0, TablesStreamFlags::EXTRA_DATA, &rows, 0, None);
        assert_eq!(header.valid, 0b1_0001);
        assert!(!header.flags.contains(TablesStreamFlags::EXTRA_DATA));
        assert_eq!(header.size(), 32);
    }
}
