use crate::{code::SymbolId, Error, Result};

/// How a fixup turns a symbol address into operand bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressFixupKind {
    /// 4-byte virtual address, `image_base + rva`
    Absolute32,
    /// 4-byte signed displacement from the end of the operand, `rva - (site_rva + 4)`
    Relative32,
}

impl TryFrom<u8> for AddressFixupKind {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(AddressFixupKind::Absolute32),
            1 => Ok(AddressFixupKind::Relative32),
            other => Err(invariant_error!("Unknown address fixup kind {}", other)),
        }
    }
}

impl From<AddressFixupKind> for u8 {
    fn from(kind: AddressFixupKind) -> Self {
        match kind {
            AddressFixupKind::Absolute32 => 0,
            AddressFixupKind::Relative32 => 1,
        }
    }
}

/// A 4-byte operand within a segment that refers to a symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AddressFixup {
    /// Offset of the operand from the start of the segment
    pub offset: u32,
    /// How the operand is computed
    pub kind: AddressFixupKind,
    /// The symbol the operand refers to
    pub target: SymbolId,
}

impl AddressFixup {
    /// Creates a fixup
    #[must_use]
    pub fn new(offset: u32, kind: AddressFixupKind, target: SymbolId) -> Self {
        AddressFixup {
            offset,
            kind,
            target,
        }
    }
}

/// Handle of a segment in a [`CodeImage`](crate::code::CodeImage)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SegmentId(pub(crate) usize);

/// Where a segment ends up: file offset of its first byte and its RVA
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SegmentPlacement {
    /// Offset in the output stream
    pub offset: u64,
    /// Relative virtual address
    pub rva: u32,
}

/// Progress of a segment through address assignment and writing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegmentState {
    /// No address assigned yet; fixups may still be added
    Unpositioned,
    /// Placed with all referenced symbols resolved; ready to be written
    Positioned(SegmentPlacement),
    /// Emitted to the output; a second write is refused
    Written(SegmentPlacement),
}

/// A chunk of native code plus the fixups to apply when it is written
#[derive(Debug, Clone)]
pub struct CodeSegment {
    code: Vec<u8>,
    fixups: Vec<AddressFixup>,
    pub(crate) state: SegmentState,
}

impl CodeSegment {
    /// A segment holding `code` without fixups
    #[must_use]
    pub fn new(code: Vec<u8>) -> Self {
        CodeSegment {
            code,
            fixups: Vec::new(),
            state: SegmentState::Unpositioned,
        }
    }

    /// Records a fixup. Fixups are applied in the order they were added.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvariantViolation`] if the segment already has an address or the
    /// 4-byte operand does not lie within the code.
    pub fn add_fixup(&mut self, fixup: AddressFixup) -> Result<()> {
        if self.state != SegmentState::Unpositioned {
            return Err(invariant_error!(
                "Fixup at offset {} added after address assignment",
                fixup.offset
            ));
        }

        let end = u64::from(fixup.offset) + 4;
        if end > self.code.len() as u64 {
            return Err(invariant_error!(
                "Fixup operand at offset {} exceeds the {} byte segment",
                fixup.offset,
                self.code.len()
            ));
        }

        self.fixups.push(fixup);
        Ok(())
    }

    /// The raw code, without fixups applied
    #[must_use]
    pub fn code(&self) -> &[u8] {
        &self.code
    }

    /// The recorded fixups
    #[must_use]
    pub fn fixups(&self) -> &[AddressFixup] {
        &self.fixups
    }

    /// Size of the segment in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.code.len()
    }

    /// True if the segment holds no code
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> SegmentState {
        self.state
    }

    /// The assigned placement, once positioned
    #[must_use]
    pub fn placement(&self) -> Option<SegmentPlacement> {
        match self.state {
            SegmentState::Unpositioned => None,
            SegmentState::Positioned(placement) | SegmentState::Written(placement) => {
                Some(placement)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_from_byte() {
        assert_eq!(
            AddressFixupKind::try_from(1).unwrap(),
            AddressFixupKind::Relative32
        );
        assert_eq!(u8::from(AddressFixupKind::Absolute32), 0);
        assert!(AddressFixupKind::try_from(7)
            .unwrap_err()
            .is_invariant_violation());
    }

    #[test]
    fn fixup_bounds() {
        let mut segment = CodeSegment::new(vec![0; 8]);
        let target = SymbolId(0);

        assert!(segment
            .add_fixup(AddressFixup::new(4, AddressFixupKind::Absolute32, target))
            .is_ok());
        assert!(segment
            .add_fixup(AddressFixup::new(5, AddressFixupKind::Absolute32, target))
            .unwrap_err()
            .is_invariant_violation());
        assert_eq!(segment.fixups().len(), 1);
    }

    #[test]
    fn no_fixups_after_placement() {
        let mut segment = CodeSegment::new(vec![0; 8]);
        segment.state = SegmentState::Positioned(SegmentPlacement {
            offset: 0,
            rva: 0x1000,
        });

        assert!(segment
            .add_fixup(AddressFixup::new(0, AddressFixupKind::Relative32, SymbolId(0)))
            .is_err());
        assert_eq!(segment.placement().unwrap().rva, 0x1000);
    }
}
