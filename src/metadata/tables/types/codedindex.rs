use strum::{EnumCount, EnumIter};

use crate::{
    metadata::{tables::TableId, token::Token},
    Result,
};

/// The categories of coded indexes, ECMA-335 Partition II, Section 24.2.6.
///
/// A coded index column references a row in one of several candidate tables. The low
/// `tag_bits()` bits select the candidate by its position in [`CodedIndexType::slots`], the
/// remaining bits carry the row number.
#[derive(Debug, Hash, Eq, PartialEq, Clone, Copy, EnumIter, EnumCount)]
#[repr(usize)]
pub enum CodedIndexType {
    /// `TypeDef`, `TypeRef` or `TypeSpec`
    TypeDefOrRef,
    /// `Field`, `Param` or `Property`
    HasConstant,
    /// Any of the 22 tables that may carry custom attributes
    HasCustomAttribute,
    /// `Field` or `Param`
    HasFieldMarshal,
    /// `TypeDef`, `MethodDef` or `Assembly`
    HasDeclSecurity,
    /// `TypeDef`, `TypeRef`, `ModuleRef`, `MethodDef` or `TypeSpec`
    MemberRefParent,
    /// `Event` or `Property`
    HasSemantics,
    /// `MethodDef` or `MemberRef`
    MethodDefOrRef,
    /// `Field` or `MethodDef`
    MemberForwarded,
    /// `File`, `AssemblyRef` or `ExportedType`
    Implementation,
    /// Constructor of a custom attribute, `MethodDef` or `MemberRef` at tags 2 and 3
    CustomAttributeType,
    /// `Module`, `ModuleRef`, `AssemblyRef` or `TypeRef`
    ResolutionScope,
    /// `TypeDef` or `MethodDef`
    TypeOrMethodDef,
}

impl CodedIndexType {
    /// The candidate tables in tag order.
    ///
    /// `None` marks a reserved slot. It takes part in the tag width, counts as zero rows for
    /// the index width and is never produced by [`CodedIndexType::encode`]. Decoding a reserved
    /// tag is a format error.
    #[must_use]
    pub fn slots(&self) -> &'static [Option<TableId>] {
        match self {
            CodedIndexType::TypeDefOrRef => &[
                Some(TableId::TypeDef),
                Some(TableId::TypeRef),
                Some(TableId::TypeSpec),
            ],
            CodedIndexType::HasConstant => &[
                Some(TableId::Field),
                Some(TableId::Param),
                Some(TableId::Property),
            ],
            CodedIndexType::HasCustomAttribute => &[
                Some(TableId::MethodDef),
                Some(TableId::Field),
                Some(TableId::TypeRef),
                Some(TableId::TypeDef),
                Some(TableId::Param),
                Some(TableId::InterfaceImpl),
                Some(TableId::MemberRef),
                Some(TableId::Module),
                // Listed as 'Permission' in the standard, the table is DeclSecurity
                Some(TableId::DeclSecurity),
                Some(TableId::Property),
                Some(TableId::Event),
                Some(TableId::StandAloneSig),
                Some(TableId::ModuleRef),
                Some(TableId::TypeSpec),
                Some(TableId::Assembly),
                Some(TableId::AssemblyRef),
                Some(TableId::File),
                Some(TableId::ExportedType),
                Some(TableId::ManifestResource),
                Some(TableId::GenericParam),
                Some(TableId::GenericParamConstraint),
                Some(TableId::MethodSpec),
            ],
            CodedIndexType::HasFieldMarshal => &[Some(TableId::Field), Some(TableId::Param)],
            CodedIndexType::HasDeclSecurity => &[
                Some(TableId::TypeDef),
                Some(TableId::MethodDef),
                Some(TableId::Assembly),
            ],
            CodedIndexType::MemberRefParent => &[
                Some(TableId::TypeDef),
                Some(TableId::TypeRef),
                Some(TableId::ModuleRef),
                Some(TableId::MethodDef),
                Some(TableId::TypeSpec),
            ],
            CodedIndexType::HasSemantics => &[Some(TableId::Event), Some(TableId::Property)],
            CodedIndexType::MethodDefOrRef => &[Some(TableId::MethodDef), Some(TableId::MemberRef)],
            CodedIndexType::MemberForwarded => &[Some(TableId::Field), Some(TableId::MethodDef)],
            CodedIndexType::Implementation => &[
                Some(TableId::File),
                Some(TableId::AssemblyRef),
                Some(TableId::ExportedType),
            ],
            // Tags 0, 1 and 4 are "not used" in Partition II, 24.2.6
            CodedIndexType::CustomAttributeType => &[
                None,
                None,
                Some(TableId::MethodDef),
                Some(TableId::MemberRef),
                None,
            ],
            CodedIndexType::ResolutionScope => &[
                Some(TableId::Module),
                Some(TableId::ModuleRef),
                Some(TableId::AssemblyRef),
                Some(TableId::TypeRef),
            ],
            CodedIndexType::TypeOrMethodDef => &[Some(TableId::TypeDef), Some(TableId::MethodDef)],
        }
    }

    /// The tables that can actually be referenced, in tag order
    pub fn tables(&self) -> impl Iterator<Item = TableId> {
        self.slots().iter().filter_map(|slot| *slot)
    }

    /// Number of low bits holding the tag, `ceil(log2(slots))`
    #[must_use]
    pub fn tag_bits(&self) -> u32 {
        let slots = self.slots().len() as u32;
        if slots <= 1 {
            0
        } else {
            u32::BITS - (slots - 1).leading_zeros()
        }
    }

    /// Mask selecting the tag bits of an encoded value
    #[must_use]
    pub fn tag_mask(&self) -> u32 {
        (1_u32 << self.tag_bits()) - 1
    }

    /// The tag value that selects `table`, or `None` if `table` is no candidate
    #[must_use]
    pub fn tag_of(&self, table: TableId) -> Option<u32> {
        self.slots()
            .iter()
            .position(|slot| *slot == Some(table))
            .map(|position| position as u32)
    }

    /// Splits an encoded value into the referenced table and row.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the tag is past the candidate list or selects a
    /// reserved slot.
    pub fn decode(&self, value: u32) -> Result<CodedIndex> {
        let tag = value & self.tag_mask();
        let row = value >> self.tag_bits();

        match self.slots().get(tag as usize) {
            Some(Some(table)) => Ok(CodedIndex::new(*table, row)),
            Some(None) => Err(malformed_error!(
                "{:?} coded index 0x{:x} uses reserved tag {}",
                self,
                value,
                tag
            )),
            None => Err(malformed_error!(
                "{:?} coded index 0x{:x} has invalid tag {}",
                self,
                value,
                tag
            )),
        }
    }

    /// Packs a table and row into `(row << tag_bits) | tag`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the table is not a candidate of this category or
    /// the row does not fit next to the tag.
    pub fn encode(&self, table: TableId, row: u32) -> Result<u32> {
        let Some(tag) = self.tag_of(table) else {
            return Err(malformed_error!(
                "{:?} is not a valid target for a {:?} coded index",
                table,
                self
            ));
        };

        if row > (u32::MAX >> self.tag_bits()) {
            return Err(malformed_error!(
                "Row {} does not fit into a {:?} coded index",
                row,
                self
            ));
        }

        Ok((row << self.tag_bits()) | tag)
    }
}

/// A decoded coded index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CodedIndex {
    /// The referenced table
    pub tag: TableId,
    /// The referenced 1-based row, 0 for a null reference
    pub row: u32,
    /// Token of the referenced row
    pub token: Token,
}

impl CodedIndex {
    /// Creates a coded index for `row` in `tag`
    #[must_use]
    pub fn new(tag: TableId, row: u32) -> CodedIndex {
        CodedIndex {
            tag,
            row,
            token: Token::from_parts(tag, row),
        }
    }

    /// True if the index references no row
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.row == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn tag_bits() {
        assert_eq!(CodedIndexType::HasSemantics.tag_bits(), 1);
        assert_eq!(CodedIndexType::TypeDefOrRef.tag_bits(), 2);
        assert_eq!(CodedIndexType::ResolutionScope.tag_bits(), 2);
        assert_eq!(CodedIndexType::MemberRefParent.tag_bits(), 3);
        assert_eq!(CodedIndexType::CustomAttributeType.tag_bits(), 3);
        assert_eq!(CodedIndexType::HasCustomAttribute.tag_bits(), 5);
    }

    #[test]
    fn decode_type_def_or_ref() {
        // TypeRef row 3: (3 << 2) | 1
        let index = CodedIndexType::TypeDefOrRef.decode(0x0D).unwrap();
        assert_eq!(index.tag, TableId::TypeRef);
        assert_eq!(index.row, 3);
        assert_eq!(index.token, Token::new(0x0100_0003));
    }

    #[test]
    fn decode_invalid_tag() {
        // Tag 3 with only three candidates
        assert!(CodedIndexType::TypeDefOrRef.decode(0x07).is_err());
    }

    #[test]
    fn custom_attribute_type_reserved_tags() {
        let ci = CodedIndexType::CustomAttributeType;
        for reserved in [0_u32, 1, 4] {
            let value = (7 << 3) | reserved;
            assert!(ci.decode(value).unwrap_err().is_format_error());
        }
        // Tags past the list (5..=7) are rejected as well
        assert!(ci.decode((7 << 3) | 6).is_err());

        let ctor = ci.decode((7 << 3) | 2).unwrap();
        assert_eq!(ctor.tag, TableId::MethodDef);
        assert_eq!(ctor.row, 7);

        let member_ref = ci.decode((9 << 3) | 3).unwrap();
        assert_eq!(member_ref.tag, TableId::MemberRef);
        assert_eq!(member_ref.row, 9);
    }

    #[test]
    fn encode_picks_slot_position() {
        let ci = CodedIndexType::CustomAttributeType;
        assert_eq!(ci.encode(TableId::MethodDef, 7).unwrap(), (7 << 3) | 2);
        assert_eq!(ci.encode(TableId::MemberRef, 1).unwrap(), (1 << 3) | 3);
        assert!(ci.encode(TableId::TypeDef, 1).is_err());

        let hca = CodedIndexType::HasCustomAttribute;
        assert_eq!(hca.encode(TableId::MethodSpec, 2).unwrap(), (2 << 5) | 21);
    }

    #[test]
    fn encode_row_overflow() {
        let result = CodedIndexType::HasCustomAttribute.encode(TableId::Field, 1 << 28);
        assert!(result.is_err());
    }

    #[test]
    fn every_candidate_decodes_to_itself() {
        for ci in CodedIndexType::iter() {
            for table in ci.tables() {
                let value = ci.encode(table, 42).unwrap();
                let decoded = ci.decode(value).unwrap();
                assert_eq!((decoded.tag, decoded.row), (table, 42), "{ci:?}");
            }
        }
    }
}
