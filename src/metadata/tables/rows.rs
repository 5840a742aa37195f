//! Typed rows for every table kind.
//!
//! Each row type holds its column values as plain `u32`s in schema order, together with the
//! row number, token and byte offset it was read from. Heap, table and coded index columns are
//! kept raw; resolving them is left to the object graph.
//!
//! [`TableRowData`] is the closed union over all row types. Code that handles rows of any
//! table dispatches on it with `match`.

use crate::{
    file::io::{read_le_at, read_le_at_dyn, write_le_at, write_le_at_dyn},
    metadata::{
        tables::{ColumnLayout, RowReadable, RowWritable, TableId, TableLayout, TableRow},
        token::Token,
    },
    Result,
};

fn read_column(data: &[u8], offset: &mut usize, column: Option<&ColumnLayout>) -> Result<u32> {
    let Some(column) = column else {
        return Err(malformed_error!("Row layout has fewer columns than the row type"));
    };

    match column.size {
        1 => Ok(u32::from(read_le_at::<u8>(data, offset)?)),
        2 | 4 => read_le_at_dyn(data, offset, column.size == 4),
        size => Err(malformed_error!(
            "Column {} has unsupported width {}",
            column.name,
            size
        )),
    }
}

fn write_column(
    data: &mut [u8],
    offset: &mut usize,
    column: Option<&ColumnLayout>,
    value: u32,
) -> Result<()> {
    let Some(column) = column else {
        return Err(malformed_error!("Row layout has fewer columns than the row type"));
    };

    match column.size {
        1 => {
            let Ok(byte) = u8::try_from(value) else {
                return Err(malformed_error!(
                    "Value 0x{:x} does not fit into 1 byte column {}",
                    value,
                    column.name
                ));
            };
            write_le_at::<u8>(data, offset, byte)
        }
        2 | 4 => write_le_at_dyn(data, offset, value, column.size == 4),
        size => Err(malformed_error!(
            "Column {} has unsupported width {}",
            column.name,
            size
        )),
    }
}

macro_rules! table_rows {
    ($(
        $(#[$doc:meta])*
        $variant:ident => $raw:ident { $($field:ident),+ $(,)? }
    ),+ $(,)?) => {
        $(
            $(#[$doc])*
            #[derive(Clone, Debug, PartialEq, Eq, Default)]
            pub struct $raw {
                /// 1-based row number
                pub rid: u32,
                /// Token of this row
                pub token: Token,
                /// Byte offset of this row within its table
                pub offset: usize,
                $(
                    #[allow(missing_docs)]
                    pub $field: u32,
                )+
            }

            impl $raw {
                /// Column values in schema order
                #[must_use]
                pub fn columns(&self) -> Vec<u32> {
                    vec![$(self.$field),+]
                }
            }

            impl RowReadable for $raw {
                fn row_read(
                    data: &[u8],
                    offset: &mut usize,
                    rid: u32,
                    layout: &TableLayout,
                ) -> Result<Self> {
                    let start = *offset;
                    let mut columns = layout.columns.iter();
                    Ok($raw {
                        rid,
                        token: Token::from_parts(TableId::$variant, rid),
                        offset: start,
                        $($field: read_column(data, offset, columns.next())?,)+
                    })
                }
            }

            impl RowWritable for $raw {
                fn row_write(
                    &self,
                    data: &mut [u8],
                    offset: &mut usize,
                    layout: &TableLayout,
                ) -> Result<()> {
                    let mut columns = layout.columns.iter();
                    $(write_column(data, offset, columns.next(), self.$field)?;)+
                    Ok(())
                }
            }

            impl TableRow for $raw {
                const TABLE_ID: TableId = TableId::$variant;
            }

            impl From<$raw> for TableRowData {
                fn from(row: $raw) -> Self {
                    TableRowData::$variant(row)
                }
            }
        )+

        /// A row of any table, one variant per table kind
        #[derive(Clone, Debug, PartialEq, Eq)]
        pub enum TableRowData {
            $(
                #[allow(missing_docs)]
                $variant($raw),
            )+
        }

        impl TableRowData {
            /// The table this row belongs to
            #[must_use]
            pub fn table_id(&self) -> TableId {
                match self {
                    $(TableRowData::$variant(_) => TableId::$variant,)+
                }
            }

            /// 1-based row number
            #[must_use]
            pub fn rid(&self) -> u32 {
                match self {
                    $(TableRowData::$variant(row) => row.rid,)+
                }
            }

            /// Token of this row
            #[must_use]
            pub fn token(&self) -> Token {
                match self {
                    $(TableRowData::$variant(row) => row.token,)+
                }
            }

            /// Column values in schema order
            #[must_use]
            pub fn columns(&self) -> Vec<u32> {
                match self {
                    $(TableRowData::$variant(row) => row.columns(),)+
                }
            }

            pub(crate) fn set_rid(&mut self, rid: u32) {
                match self {
                    $(TableRowData::$variant(row) => {
                        row.rid = rid;
                        row.token = Token::from_parts(TableId::$variant, rid);
                    })+
                }
            }
        }

        impl RowReadable for TableRowData {
            fn row_read(
                data: &[u8],
                offset: &mut usize,
                rid: u32,
                layout: &TableLayout,
            ) -> Result<Self> {
                Ok(match layout.table {
                    $(TableId::$variant => {
                        TableRowData::$variant($raw::row_read(data, offset, rid, layout)?)
                    })+
                })
            }
        }

        impl RowWritable for TableRowData {
            fn row_write(
                &self,
                data: &mut [u8],
                offset: &mut usize,
                layout: &TableLayout,
            ) -> Result<()> {
                if self.table_id() != layout.table {
                    return Err(malformed_error!(
                        "Can't write a {:?} row with the {:?} layout",
                        self.table_id(),
                        layout.table
                    ));
                }

                match self {
                    $(TableRowData::$variant(row) => row.row_write(data, offset, layout),)+
                }
            }
        }
    };
}

table_rows! {
    /// `Module` row
    Module => ModuleRaw { generation, name, mvid, enc_id, enc_base_id },
    /// `TypeRef` row
    TypeRef => TypeRefRaw { resolution_scope, type_name, type_namespace },
    /// `TypeDef` row
    TypeDef => TypeDefRaw { flags, type_name, type_namespace, extends, field_list, method_list },
    /// `FieldPtr` row
    FieldPtr => FieldPtrRaw { field },
    /// `Field` row
    Field => FieldRaw { flags, name, signature },
    /// `MethodPtr` row
    MethodPtr => MethodPtrRaw { method },
    /// `MethodDef` row
    MethodDef => MethodDefRaw { rva, impl_flags, flags, name, signature, param_list },
    /// `ParamPtr` row
    ParamPtr => ParamPtrRaw { param },
    /// `Param` row
    Param => ParamRaw { flags, sequence, name },
    /// `InterfaceImpl` row
    InterfaceImpl => InterfaceImplRaw { class, interface },
    /// `MemberRef` row
    MemberRef => MemberRefRaw { class, name, signature },
    /// `Constant` row
    Constant => ConstantRaw { base, padding, parent, value },
    /// `CustomAttribute` row
    CustomAttribute => CustomAttributeRaw { parent, constructor, value },
    /// `FieldMarshal` row
    FieldMarshal => FieldMarshalRaw { parent, native_type },
    /// `DeclSecurity` row
    DeclSecurity => DeclSecurityRaw { action, parent, permission_set },
    /// `ClassLayout` row
    ClassLayout => ClassLayoutRaw { packing_size, class_size, parent },
    /// `FieldLayout` row
    FieldLayout => FieldLayoutRaw { field_offset, field },
    /// `StandAloneSig` row
    StandAloneSig => StandAloneSigRaw { signature },
    /// `EventMap` row
    EventMap => EventMapRaw { parent, event_list },
    /// `EventPtr` row
    EventPtr => EventPtrRaw { event },
    /// `Event` row
    Event => EventRaw { flags, name, event_type },
    /// `PropertyMap` row
    PropertyMap => PropertyMapRaw { parent, property_list },
    /// `PropertyPtr` row
    PropertyPtr => PropertyPtrRaw { property },
    /// `Property` row
    Property => PropertyRaw { flags, name, signature },
    /// `MethodSemantics` row
    MethodSemantics => MethodSemanticsRaw { semantics, method, association },
    /// `MethodImpl` row
    MethodImpl => MethodImplRaw { class, method_body, method_declaration },
    /// `ModuleRef` row
    ModuleRef => ModuleRefRaw { name },
    /// `TypeSpec` row
    TypeSpec => TypeSpecRaw { signature },
    /// `ImplMap` row
    ImplMap => ImplMapRaw { mapping_flags, member_forwarded, import_name, import_scope },
    /// `FieldRVA` row
    FieldRva => FieldRvaRaw { rva, field },
    /// `EncLog` row
    EncLog => EncLogRaw { token_value, func_code },
    /// `EncMap` row
    EncMap => EncMapRaw { token_value },
    /// `Assembly` row
    Assembly => AssemblyRaw {
        hash_alg_id, major_version, minor_version, build_number, revision_number,
        flags, public_key, name, culture,
    },
    /// `AssemblyProcessor` row
    AssemblyProcessor => AssemblyProcessorRaw { processor },
    /// `AssemblyOS` row
    AssemblyOs => AssemblyOsRaw { os_platform_id, os_major_version, os_minor_version },
    /// `AssemblyRef` row
    AssemblyRef => AssemblyRefRaw {
        major_version, minor_version, build_number, revision_number,
        flags, public_key_or_token, name, culture, hash_value,
    },
    /// `AssemblyRefProcessor` row
    AssemblyRefProcessor => AssemblyRefProcessorRaw { processor, assembly_ref },
    /// `AssemblyRefOS` row
    AssemblyRefOs => AssemblyRefOsRaw {
        os_platform_id, os_major_version, os_minor_version, assembly_ref,
    },
    /// `File` row
    File => FileRaw { flags, name, hash_value },
    /// `ExportedType` row
    ExportedType => ExportedTypeRaw { flags, type_def_id, type_name, type_namespace, implementation },
    /// `ManifestResource` row
    ManifestResource => ManifestResourceRaw { resource_offset, flags, name, implementation },
    /// `NestedClass` row
    NestedClass => NestedClassRaw { nested_class, enclosing_class },
    /// `GenericParam` row
    GenericParam => GenericParamRaw { number, flags, owner, name },
    /// `MethodSpec` row
    MethodSpec => MethodSpecRaw { method, instantiation },
    /// `GenericParamConstraint` row
    GenericParamConstraint => GenericParamConstraintRaw { owner, constraint },
}
