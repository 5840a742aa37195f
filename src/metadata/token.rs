//! Metadata tokens.
//!
//! A token is the stable identity of a row: the table kind in the high byte and the 1-based row
//! number in the low 24 bits. Row 0 never names a row, a token with row 0 is a null reference.
//!
//! ```rust
//! use cilmeta::metadata::{tables::TableId, token::Token};
//!
//! let token = Token::from_parts(TableId::TypeDef, 5);
//! assert_eq!(token.value(), 0x0200_0005);
//! assert_eq!(token.table_id(), Some(TableId::TypeDef));
//! assert_eq!(token.row(), 5);
//! ```

use std::fmt;

use crate::metadata::tables::TableId;

/// The `Token` addresses one row of one metadata table.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Token(pub u32);

impl Token {
    /// Creates a token from its raw 32-bit value
    #[must_use]
    pub fn new(value: u32) -> Self {
        Token(value)
    }

    /// Creates a token from a table kind and a row number.
    ///
    /// Only the low 24 bits of `row` are kept.
    #[must_use]
    pub fn from_parts(table: TableId, row: u32) -> Self {
        Token((u32::from(table as u8) << 24) | (row & 0x00FF_FFFF))
    }

    /// Raw 32-bit value
    #[must_use]
    pub fn value(&self) -> u32 {
        self.0
    }

    /// Raw table byte
    #[must_use]
    pub fn table(&self) -> u8 {
        (self.0 >> 24) as u8
    }

    /// The table kind, or `None` if the table byte names no defined table
    #[must_use]
    pub fn table_id(&self) -> Option<TableId> {
        TableId::from_u8(self.table())
    }

    /// 1-based row number
    #[must_use]
    pub fn row(&self) -> u32 {
        self.0 & 0x00FF_FFFF
    }

    /// True if the token references no row
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.row() == 0
    }
}

impl From<u32> for Token {
    fn from(value: u32) -> Self {
        Token(value)
    }
}

impl From<Token> for u32 {
    fn from(token: Token) -> Self {
        token.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Token(0x{:08x}, table: 0x{:02x}, row: {})",
            self.0,
            self.table(),
            self.row()
        )
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}
