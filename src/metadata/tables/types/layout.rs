//! Per-table column layouts.
//!
//! The column schemas are static data taken from ECMA-335 Partition II, Section 22. A
//! [`TableLayouts`] catalog combines them with the widths of one [`TableInfo`] into concrete
//! layouts with byte sizes. Building the catalog can't fail: every column kind maps to exactly
//! one width.

use std::sync::Arc;

use strum::IntoEnumIterator;

use crate::metadata::tables::{CodedIndexType, TableId, TableInfo};

/// The heap a heap-index column points into
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HeapKind {
    /// '#Strings'
    String,
    /// '#GUID'
    Guid,
    /// '#Blob'
    Blob,
}

/// Semantic kind of a column, which decides its width
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ColumnKind {
    /// Fixed-width integer of 1, 2 or 4 bytes
    Fixed(u8),
    /// Index into one of the heaps
    Heap(HeapKind),
    /// Simple index into one table
    Table(TableId),
    /// Coded index into one of several tables
    Coded(CodedIndexType),
}

impl ColumnKind {
    /// Width of this column for the given stream
    #[must_use]
    pub fn width(&self, info: &TableInfo) -> u8 {
        match self {
            ColumnKind::Fixed(size) => *size,
            ColumnKind::Heap(HeapKind::String) => info.str_bytes(),
            ColumnKind::Heap(HeapKind::Guid) => info.guid_bytes(),
            ColumnKind::Heap(HeapKind::Blob) => info.blob_bytes(),
            ColumnKind::Table(table) => info.table_index_bytes(*table),
            ColumnKind::Coded(coded_index) => info.coded_index_bytes(*coded_index),
        }
    }
}

/// One column of a resolved table layout
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColumnLayout {
    /// Column name as used in Partition II
    pub name: &'static str,
    /// Semantic kind
    pub kind: ColumnKind,
    /// Resolved width in bytes
    pub size: u8,
}

/// The resolved layout of one table
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableLayout {
    /// The table this layout describes
    pub table: TableId,
    /// Columns in row order
    pub columns: Vec<ColumnLayout>,
    /// Sum of the column widths
    pub row_size: u32,
}

/// Cheap-copy reference to a `TableLayout`
pub type TableLayoutRef = Arc<TableLayout>;

impl TableLayout {
    /// Resolves the layout of `table` against the widths in `info`
    #[must_use]
    pub fn new(table: TableId, info: &TableInfo) -> Self {
        let columns: Vec<ColumnLayout> = schema(table)
            .iter()
            .map(|&(name, kind)| ColumnLayout {
                name,
                kind,
                size: kind.width(info),
            })
            .collect();
        let row_size = columns.iter().map(|column| u32::from(column.size)).sum();

        TableLayout {
            table,
            columns,
            row_size,
        }
    }

    /// Byte offset of the named column within a row
    #[must_use]
    pub fn column_offset(&self, name: &str) -> Option<usize> {
        let mut offset = 0_usize;
        for column in &self.columns {
            if column.name == name {
                return Some(offset);
            }
            offset += usize::from(column.size);
        }
        None
    }
}

/// The layouts of all tables of one stream
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableLayouts {
    layouts: Vec<TableLayoutRef>,
}

/// Cheap-copy reference to a `TableLayouts` catalog
pub type TableLayoutsRef = Arc<TableLayouts>;

impl TableLayouts {
    /// Resolves every table layout against `info`
    #[must_use]
    pub fn new(info: &TableInfo) -> Self {
        TableLayouts {
            layouts: TableId::iter()
                .map(|table| Arc::new(TableLayout::new(table, info)))
                .collect(),
        }
    }

    /// Layout of `table`
    #[must_use]
    pub fn get(&self, table: TableId) -> &TableLayoutRef {
        &self.layouts[table.index()]
    }

    /// Row size of `table` in bytes
    #[must_use]
    pub fn row_size(&self, table: TableId) -> u32 {
        self.layouts[table.index()].row_size
    }

    /// Iterates over all layouts in table order
    pub fn iter(&self) -> impl Iterator<Item = &TableLayoutRef> {
        self.layouts.iter()
    }
}

const U8: ColumnKind = ColumnKind::Fixed(1);
const U16: ColumnKind = ColumnKind::Fixed(2);
const U32: ColumnKind = ColumnKind::Fixed(4);
const STR: ColumnKind = ColumnKind::Heap(HeapKind::String);
const GUID: ColumnKind = ColumnKind::Heap(HeapKind::Guid);
const BLOB: ColumnKind = ColumnKind::Heap(HeapKind::Blob);

/// The static column schema of `table`, in row order.
#[must_use]
pub fn schema(id: TableId) -> &'static [(&'static str, ColumnKind)] {
    use CodedIndexType as Ci;
    use ColumnKind::{Coded, Table};
    use TableId as T;

    match id {
        T::Module => &[
            ("Generation", U16),
            ("Name", STR),
            ("Mvid", GUID),
            ("EncId", GUID),
            ("EncBaseId", GUID),
        ],
        T::TypeRef => &[
            ("ResolutionScope", Coded(Ci::ResolutionScope)),
            ("TypeName", STR),
            ("TypeNamespace", STR),
        ],
        T::TypeDef => &[
            ("Flags", U32),
            ("TypeName", STR),
            ("TypeNamespace", STR),
            ("Extends", Coded(Ci::TypeDefOrRef)),
            ("FieldList", Table(T::Field)),
            ("MethodList", Table(T::MethodDef)),
        ],
        T::FieldPtr => &[("Field", Table(T::Field))],
        T::Field => &[("Flags", U16), ("Name", STR), ("Signature", BLOB)],
        T::MethodPtr => &[("Method", Table(T::MethodDef))],
        T::MethodDef => &[
            ("RVA", U32),
            ("ImplFlags", U16),
            ("Flags", U16),
            ("Name", STR),
            ("Signature", BLOB),
            ("ParamList", Table(T::Param)),
        ],
        T::ParamPtr => &[("Param", Table(T::Param))],
        T::Param => &[("Flags", U16), ("Sequence", U16), ("Name", STR)],
        T::InterfaceImpl => &[
            ("Class", Table(T::TypeDef)),
            ("Interface", Coded(Ci::TypeDefOrRef)),
        ],
        T::MemberRef => &[
            ("Class", Coded(Ci::MemberRefParent)),
            ("Name", STR),
            ("Signature", BLOB),
        ],
        T::Constant => &[
            ("Type", U8),
            ("Padding", U8),
            ("Parent", Coded(Ci::HasConstant)),
            ("Value", BLOB),
        ],
        T::CustomAttribute => &[
            ("Parent", Coded(Ci::HasCustomAttribute)),
            ("Type", Coded(Ci::CustomAttributeType)),
            ("Value", BLOB),
        ],
        T::FieldMarshal => &[
            ("Parent", Coded(Ci::HasFieldMarshal)),
            ("NativeType", BLOB),
        ],
        T::DeclSecurity => &[
            ("Action", U16),
            ("Parent", Coded(Ci::HasDeclSecurity)),
            ("PermissionSet", BLOB),
        ],
        T::ClassLayout => &[
            ("PackingSize", U16),
            ("ClassSize", U32),
            ("Parent", Table(T::TypeDef)),
        ],
        T::FieldLayout => &[("Offset", U32), ("Field", Table(T::Field))],
        T::StandAloneSig => &[("Signature", BLOB)],
        T::EventMap => &[("Parent", Table(T::TypeDef)), ("EventList", Table(T::Event))],
        T::EventPtr => &[("Event", Table(T::Event))],
        T::Event => &[
            ("EventFlags", U16),
            ("Name", STR),
            ("EventType", Coded(Ci::TypeDefOrRef)),
        ],
        T::PropertyMap => &[
            ("Parent", Table(T::TypeDef)),
            ("PropertyList", Table(T::Property)),
        ],
        T::PropertyPtr => &[("Property", Table(T::Property))],
        T::Property => &[("Flags", U16), ("Name", STR), ("Type", BLOB)],
        T::MethodSemantics => &[
            ("Semantics", U16),
            ("Method", Table(T::MethodDef)),
            ("Association", Coded(Ci::HasSemantics)),
        ],
        T::MethodImpl => &[
            ("Class", Table(T::TypeDef)),
            ("MethodBody", Coded(Ci::MethodDefOrRef)),
            ("MethodDeclaration", Coded(Ci::MethodDefOrRef)),
        ],
        T::ModuleRef => &[("Name", STR)],
        T::TypeSpec => &[("Signature", BLOB)],
        T::ImplMap => &[
            ("MappingFlags", U16),
            ("MemberForwarded", Coded(Ci::MemberForwarded)),
            ("ImportName", STR),
            ("ImportScope", Table(T::ModuleRef)),
        ],
        T::FieldRva => &[("RVA", U32), ("Field", Table(T::Field))],
        T::EncLog => &[("Token", U32), ("FuncCode", U32)],
        T::EncMap => &[("Token", U32)],
        T::Assembly => &[
            ("HashAlgId", U32),
            ("MajorVersion", U16),
            ("MinorVersion", U16),
            ("BuildNumber", U16),
            ("RevisionNumber", U16),
            ("Flags", U32),
            ("PublicKey", BLOB),
            ("Name", STR),
            ("Culture", STR),
        ],
        T::AssemblyProcessor => &[("Processor", U32)],
        T::AssemblyOs => &[
            ("OSPlatformID", U32),
            ("OSMajorVersion", U32),
            ("OSMinorVersion", U32),
        ],
        T::AssemblyRef => &[
            ("MajorVersion", U16),
            ("MinorVersion", U16),
            ("BuildNumber", U16),
            ("RevisionNumber", U16),
            ("Flags", U32),
            ("PublicKeyOrToken", BLOB),
            ("Name", STR),
            ("Culture", STR),
            ("HashValue", BLOB),
        ],
        T::AssemblyRefProcessor => &[
            ("Processor", U32),
            ("AssemblyRef", Table(T::AssemblyRef)),
        ],
        T::AssemblyRefOs => &[
            ("OSPlatformID", U32),
            ("OSMajorVersion", U32),
            ("OSMinorVersion", U32),
            ("AssemblyRef", Table(T::AssemblyRef)),
        ],
        T::File => &[("Flags", U32), ("Name", STR), ("HashValue", BLOB)],
        T::ExportedType => &[
            ("Flags", U32),
            ("TypeDefId", U32),
            ("TypeName", STR),
            ("TypeNamespace", STR),
            ("Implementation", Coded(Ci::Implementation)),
        ],
        T::ManifestResource => &[
            ("Offset", U32),
            ("Flags", U32),
            ("Name", STR),
            ("Implementation", Coded(Ci::Implementation)),
        ],
        T::NestedClass => &[
            ("NestedClass", Table(T::TypeDef)),
            ("EnclosingClass", Table(T::TypeDef)),
        ],
        T::GenericParam => &[
            ("Number", U16),
            ("Flags", U16),
            ("Owner", Coded(Ci::TypeOrMethodDef)),
            ("Name", STR),
        ],
        T::MethodSpec => &[
            ("Method", Coded(Ci::MethodDefOrRef)),
            ("Instantiation", BLOB),
        ],
        T::GenericParamConstraint => &[
            ("Owner", Table(T::GenericParam)),
            ("Constraint", Coded(Ci::TypeDefOrRef)),
        ],
    }
}
