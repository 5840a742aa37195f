use std::io::{Seek, SeekFrom, Write};

use tracing::debug;

use crate::{
    code::{
        AddressAssignment, AddressFixupKind, CodeSegment, SegmentId, SegmentPlacement,
        SegmentState, SymbolId, SymbolTable,
    },
    file::io::write_le_at,
    Result,
};

/// The native code segments of one image, their symbols and the assigned addresses.
///
/// Writing follows a strict order: every segment is added and every fixup recorded, then a
/// single [`CodeImage::assign_addresses`] call places all segments and symbols at once, and only
/// after that may segments be written, each exactly once.
#[derive(Debug)]
pub struct CodeImage {
    image_base: u64,
    segments: Vec<CodeSegment>,
    symbols: SymbolTable,
    symbol_rvas: Option<Vec<Option<u32>>>,
}

impl CodeImage {
    /// An empty image that will be loaded at `image_base`
    #[must_use]
    pub fn new(image_base: u64) -> Self {
        CodeImage {
            image_base,
            segments: Vec::new(),
            symbols: SymbolTable::new(),
            symbol_rvas: None,
        }
    }

    /// The preferred load address
    #[must_use]
    pub fn image_base(&self) -> u64 {
        self.image_base
    }

    /// The symbols fixups may refer to
    #[must_use]
    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Defines a new symbol
    pub fn define_symbol(&self, name: &str) -> SymbolId {
        self.symbols.define(name)
    }

    /// Adds a segment and returns its handle
    pub fn add_segment(&mut self, segment: CodeSegment) -> SegmentId {
        self.segments.push(segment);
        SegmentId(self.segments.len() - 1)
    }

    /// The segment for `id`
    #[must_use]
    pub fn segment(&self, id: SegmentId) -> Option<&CodeSegment> {
        self.segments.get(id.0)
    }

    /// Mutable access to a segment, for recording fixups before assignment
    pub fn segment_mut(&mut self, id: SegmentId) -> Option<&mut CodeSegment> {
        self.segments.get_mut(id.0)
    }

    /// Number of segments
    #[must_use]
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// True once addresses were assigned
    #[must_use]
    pub fn is_assigned(&self) -> bool {
        self.symbol_rvas.is_some()
    }

    /// Applies an address assignment to every segment and symbol at once.
    ///
    /// The assignment is checked in full before anything changes: every segment needs a
    /// placement and every symbol targeted by a fixup needs an RVA.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvariantViolation`] if addresses were already assigned or the
    /// assignment is incomplete. Nothing is changed in that case.
    pub fn assign_addresses(&mut self, assignment: &AddressAssignment) -> Result<()> {
        if self.is_assigned() {
            return Err(invariant_error!("Addresses were already assigned"));
        }

        let mut placements = Vec::with_capacity(self.segments.len());
        for (index, segment) in self.segments.iter().enumerate() {
            let placement = assignment.segment(SegmentId(index)).ok_or_else(|| {
                invariant_error!("Segment {} has no placement", index)
            })?;

            for fixup in segment.fixups() {
                if assignment.symbol(fixup.target).is_none() {
                    return Err(invariant_error!(
                        "Symbol {} referenced by segment {} has no address",
                        fixup.target,
                        index
                    ));
                }
            }
            placements.push(placement);
        }

        let symbol_rvas = (0..self.symbols.len())
            .map(|index| assignment.symbol(SymbolId(index)))
            .collect();

        for (segment, placement) in self.segments.iter_mut().zip(placements) {
            segment.state = SegmentState::Positioned(placement);
        }
        self.symbol_rvas = Some(symbol_rvas);

        debug!(
            segments = self.segments.len(),
            symbols = self.symbols.len(),
            image_base = self.image_base,
            "committed address assignment"
        );
        Ok(())
    }

    /// The assigned RVA of `symbol`.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvariantViolation`] before address assignment, or for a symbol
    /// the assignment left out.
    pub fn symbol_rva(&self, symbol: SymbolId) -> Result<u32> {
        let Some(rvas) = &self.symbol_rvas else {
            return Err(invariant_error!(
                "Address of {} read before address assignment",
                symbol
            ));
        };

        rvas.get(symbol.0)
            .copied()
            .flatten()
            .ok_or_else(|| invariant_error!("{} has no assigned address", symbol))
    }

    /// Writes segment `id` with its fixups applied at its assigned offset in `output`.
    ///
    /// The code is copied into a staging buffer and patched there, so a failing fixup leaves
    /// `output` untouched. Afterwards the stream position is the end of the segment.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvariantViolation`] for an unknown segment, a segment that is not
    /// positioned or was already written, and for operands that don't fit 32 bits. I/O failures
    /// are returned as [`crate::Error::FileError`].
    pub fn write_segment<W: Write + Seek>(&mut self, id: SegmentId, output: &mut W) -> Result<()> {
        let segment = self
            .segments
            .get(id.0)
            .ok_or_else(|| invariant_error!("Unknown segment {}", id.0))?;

        let placement = match segment.state() {
            SegmentState::Positioned(placement) => placement,
            SegmentState::Unpositioned => {
                return Err(invariant_error!("Segment {} written before placement", id.0))
            }
            SegmentState::Written(_) => {
                return Err(invariant_error!("Segment {} written twice", id.0))
            }
        };

        let staged = self.stage(segment, placement)?;

        output.seek(SeekFrom::Start(placement.offset))?;
        output.write_all(&staged)?;
        output.seek(SeekFrom::Start(placement.offset + staged.len() as u64))?;

        debug!(
            segment = id.0,
            offset = placement.offset,
            rva = placement.rva,
            size = staged.len(),
            fixups = segment.fixups().len(),
            "wrote code segment"
        );

        if let Some(segment) = self.segments.get_mut(id.0) {
            segment.state = SegmentState::Written(placement);
        }
        Ok(())
    }

    /// Writes every segment in the order they were added.
    ///
    /// # Errors
    /// See [`CodeImage::write_segment`].
    pub fn write_all<W: Write + Seek>(&mut self, output: &mut W) -> Result<()> {
        for index in 0..self.segments.len() {
            self.write_segment(SegmentId(index), output)?;
        }
        Ok(())
    }

    fn stage(&self, segment: &CodeSegment, placement: SegmentPlacement) -> Result<Vec<u8>> {
        let mut staged = segment.code().to_vec();

        for fixup in segment.fixups() {
            let target = self.symbol_rva(fixup.target)?;
            let mut offset = fixup.offset as usize;

            match fixup.kind {
                AddressFixupKind::Absolute32 => {
                    let value = self
                        .image_base
                        .checked_add(u64::from(target))
                        .and_then(|address| u32::try_from(address).ok())
                        .ok_or_else(|| {
                            invariant_error!(
                                "Absolute address 0x{:x} + 0x{:x} exceeds 32 bits",
                                self.image_base,
                                target
                            )
                        })?;
                    write_le_at(&mut staged, &mut offset, value)?;
                }
                AddressFixupKind::Relative32 => {
                    let site = i64::from(placement.rva) + i64::from(fixup.offset);
                    let displacement = i64::from(target) - (site + 4);
                    let value = i32::try_from(displacement).map_err(|_| {
                        invariant_error!("Displacement {} exceeds 32 bits", displacement)
                    })?;
                    write_le_at(&mut staged, &mut offset, value)?;
                }
            }
        }

        Ok(staged)
    }
}
