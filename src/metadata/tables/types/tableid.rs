use strum::{EnumCount, EnumIter, IntoEnumIterator};

/// Identifies one of the metadata tables defined by ECMA-335 Partition II, Section 22.
///
/// The discriminant is the table number used in tokens, in the valid/sorted bitmasks of the
/// stream header, and as the canonical order in which tables are laid out in the table region.
/// The numbers are dense, `0x00..=0x2C`, so `TableId::COUNT` also sizes per-table arrays.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, EnumIter, EnumCount)]
#[repr(u8)]
pub enum TableId {
    /// `Module` (0x00), exactly one row describing the module itself
    Module = 0x00,
    /// `TypeRef` (0x01), references to types defined elsewhere
    TypeRef = 0x01,
    /// `TypeDef` (0x02), types defined in this module
    TypeDef = 0x02,
    /// `FieldPtr` (0x03), indirection into `Field` for unoptimized metadata
    FieldPtr = 0x03,
    /// `Field` (0x04)
    Field = 0x04,
    /// `MethodPtr` (0x05), indirection into `MethodDef` for unoptimized metadata
    MethodPtr = 0x05,
    /// `MethodDef` (0x06)
    MethodDef = 0x06,
    /// `ParamPtr` (0x07), indirection into `Param`
    ParamPtr = 0x07,
    /// `Param` (0x08)
    Param = 0x08,
    /// `InterfaceImpl` (0x09)
    InterfaceImpl = 0x09,
    /// `MemberRef` (0x0A)
    MemberRef = 0x0A,
    /// `Constant` (0x0B)
    Constant = 0x0B,
    /// `CustomAttribute` (0x0C)
    CustomAttribute = 0x0C,
    /// `FieldMarshal` (0x0D)
    FieldMarshal = 0x0D,
    /// `DeclSecurity` (0x0E)
    DeclSecurity = 0x0E,
    /// `ClassLayout` (0x0F)
    ClassLayout = 0x0F,
    /// `FieldLayout` (0x10)
    FieldLayout = 0x10,
    /// `StandAloneSig` (0x11)
    StandAloneSig = 0x11,
    /// `EventMap` (0x12)
    EventMap = 0x12,
    /// `EventPtr` (0x13)
    EventPtr = 0x13,
    /// `Event` (0x14)
    Event = 0x14,
    /// `PropertyMap` (0x15)
    PropertyMap = 0x15,
    /// `PropertyPtr` (0x16)
    PropertyPtr = 0x16,
    /// `Property` (0x17)
    Property = 0x17,
    /// `MethodSemantics` (0x18)
    MethodSemantics = 0x18,
    /// `MethodImpl` (0x19)
    MethodImpl = 0x19,
    /// `ModuleRef` (0x1A)
    ModuleRef = 0x1A,
    /// `TypeSpec` (0x1B)
    TypeSpec = 0x1B,
    /// `ImplMap` (0x1C), P/Invoke mappings
    ImplMap = 0x1C,
    /// `FieldRVA` (0x1D)
    FieldRva = 0x1D,
    /// `EncLog` (0x1E), edit-and-continue log
    EncLog = 0x1E,
    /// `EncMap` (0x1F), edit-and-continue token map
    EncMap = 0x1F,
    /// `Assembly` (0x20)
    Assembly = 0x20,
    /// `AssemblyProcessor` (0x21)
    AssemblyProcessor = 0x21,
    /// `AssemblyOS` (0x22)
    AssemblyOs = 0x22,
    /// `AssemblyRef` (0x23)
    AssemblyRef = 0x23,
    /// `AssemblyRefProcessor` (0x24)
    AssemblyRefProcessor = 0x24,
    /// `AssemblyRefOS` (0x25)
    AssemblyRefOs = 0x25,
    /// `File` (0x26)
    File = 0x26,
    /// `ExportedType` (0x27)
    ExportedType = 0x27,
    /// `ManifestResource` (0x28)
    ManifestResource = 0x28,
    /// `NestedClass` (0x29), nested/enclosing type pairs
    NestedClass = 0x29,
    /// `GenericParam` (0x2A)
    GenericParam = 0x2A,
    /// `MethodSpec` (0x2B)
    MethodSpec = 0x2B,
    /// `GenericParamConstraint` (0x2C)
    GenericParamConstraint = 0x2C,
}

impl TableId {
    /// Looks up a table kind by its table number.
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        TableId::iter().nth(usize::from(value))
    }

    /// Position of this table in dense per-table arrays
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Bit of this table in the valid / sorted masks of the stream header
    #[must_use]
    pub fn mask_bit(self) -> u64 {
        1_u64 << (self as u8)
    }
}

/// Number of defined table kinds
pub const TABLE_COUNT: usize = TableId::COUNT;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dense_numbering() {
        for (index, table) in TableId::iter().enumerate() {
            assert_eq!(table.index(), index);
            assert_eq!(TableId::from_u8(index as u8), Some(table));
        }
        assert_eq!(TABLE_COUNT, 0x2D);
        assert_eq!(TableId::from_u8(0x2D), None);
    }

    #[test]
    fn mask_bits() {
        assert_eq!(TableId::Module.mask_bit(), 1);
        assert_eq!(TableId::TypeDef.mask_bit(), 0b100);
        assert_eq!(TableId::GenericParamConstraint.mask_bit(), 1 << 0x2C);
    }
}
