use std::collections::HashMap;

use crate::code::{SegmentId, SegmentPlacement, SymbolId};

/// The result of an address assignment pass: placements for segments and RVAs for symbols.
///
/// Produced by whatever lays out the image; consumed as a whole by
/// [`CodeImage::assign_addresses`](crate::code::CodeImage::assign_addresses).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressAssignment {
    segments: HashMap<SegmentId, SegmentPlacement>,
    symbols: HashMap<SymbolId, u32>,
}

impl AddressAssignment {
    /// An empty assignment
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Places `segment` at file `offset` and `rva`
    pub fn place_segment(&mut self, segment: SegmentId, offset: u64, rva: u32) -> &mut Self {
        self.segments.insert(segment, SegmentPlacement { offset, rva });
        self
    }

    /// Resolves `symbol` to `rva`
    pub fn place_symbol(&mut self, symbol: SymbolId, rva: u32) -> &mut Self {
        self.symbols.insert(symbol, rva);
        self
    }

    /// Placement of `segment`
    #[must_use]
    pub fn segment(&self, segment: SegmentId) -> Option<SegmentPlacement> {
        self.segments.get(&segment).copied()
    }

    /// RVA of `symbol`
    #[must_use]
    pub fn symbol(&self, symbol: SymbolId) -> Option<u32> {
        self.symbols.get(&symbol).copied()
    }
}
