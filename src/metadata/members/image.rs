use std::{
    collections::HashMap,
    sync::{Arc, Weak},
};

use crossbeam_skiplist::SkipMap;
use tracing::trace;

use crate::{
    metadata::{
        config::MetadataConfig,
        members::{
            AssemblyReference, Deferred, FieldDefinition, MetadataMember, MethodDefinition,
            ModuleDefinition, ModuleReference, NestedClass, TypeDefinition, TypeReference,
        },
        tables::{
            AssemblyRefRaw, CodedIndexType, FieldPtrRaw, FieldRaw, MethodDefRaw, MethodPtrRaw,
            ModuleRaw, ModuleRefRaw, NestedClassRaw, TableId, TypeDefRaw, TypeRefRaw,
        },
        token::Token,
        view::{MetadataStreams, MetadataView},
    },
    Result,
};

/// The run-length member lists of a `TypeDef` row
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum MemberList {
    Fields,
    Methods,
}

impl MemberList {
    pub(crate) fn target(self) -> TableId {
        match self {
            MemberList::Fields => TableId::Field,
            MemberList::Methods => TableId::MethodDef,
        }
    }

    pub(crate) fn pointer(self) -> TableId {
        match self {
            MemberList::Fields => TableId::FieldPtr,
            MemberList::Methods => TableId::MethodPtr,
        }
    }

    pub(crate) fn start(self, row: &TypeDefRaw) -> u32 {
        match self {
            MemberList::Fields => row.field_list,
            MemberList::Methods => row.method_list,
        }
    }
}

/// Reverse lookups over the member lists and the `NestedClass` rows of one image
#[derive(Debug, Default)]
struct GraphIndex {
    /// `TypeDef` row owning each `Field` row, 0 for none
    field_owners: Vec<u32>,
    /// `TypeDef` row owning each `MethodDef` row, 0 for none
    method_owners: Vec<u32>,
    /// Nested `TypeDef` row to its enclosing row, first `NestedClass` row wins
    enclosing: HashMap<u32, u32>,
    /// Enclosing `TypeDef` row to its `NestedClass` rows in table order
    nested_records: HashMap<u32, Vec<u32>>,
}

/// The object graph over one set of metadata streams.
///
/// Always handled through an `Arc`; deferred fields of the entities keep a weak handle to the
/// image and fail with [`crate::Error::ImageDropped`] once it is gone.
pub struct MetadataImage {
    view: MetadataView,
    cache: SkipMap<Token, MetadataMember>,
    index: Deferred<Arc<GraphIndex>>,
    this: Weak<MetadataImage>,
}

impl MetadataImage {
    /// Wraps an already decoded view
    #[must_use]
    pub fn new(view: MetadataView) -> Arc<Self> {
        Arc::new_cyclic(|this: &Weak<MetadataImage>| {
            let image = this.clone();
            MetadataImage {
                view,
                cache: SkipMap::new(),
                index: Deferred::lazy(move || {
                    let image = upgrade_image!(image);
                    Ok(Arc::new(image.build_index()?))
                }),
                this: this.clone(),
            }
        })
    }

    /// Decodes `streams` with the default configuration.
    ///
    /// # Errors
    /// Returns an error if the tables stream or a heap is malformed.
    pub fn from_streams(streams: MetadataStreams) -> Result<Arc<Self>> {
        Ok(Self::new(MetadataView::from_streams(streams)?))
    }

    /// Decodes `streams` with `config`.
    ///
    /// # Errors
    /// Returns an error if the tables stream or a heap is malformed.
    pub fn with_config(streams: MetadataStreams, config: MetadataConfig) -> Result<Arc<Self>> {
        Ok(Self::new(MetadataView::from_streams_with_config(streams, config)?))
    }

    /// The decoded streams
    #[must_use]
    pub fn view(&self) -> &MetadataView {
        &self.view
    }

    /// The configuration the streams were decoded with
    #[must_use]
    pub fn config(&self) -> &MetadataConfig {
        self.view.config()
    }

    /// Number of entities materialized so far
    #[must_use]
    pub fn cached_count(&self) -> usize {
        self.cache.len()
    }

    /// Returns the entity for `token`, creating it on first request.
    ///
    /// A null row, a row past the end of its table, an unknown table and tables without an
    /// entity kind all yield `None`.
    ///
    /// # Errors
    /// Only fails if the backing row can't be decoded.
    pub fn resolve(&self, token: Token) -> Result<Option<MetadataMember>> {
        if let Some(entry) = self.cache.get(&token) {
            return Ok(Some(entry.value().clone()));
        }

        let Some(table) = token.table_id() else {
            return Ok(None);
        };
        let rid = token.row();
        let tables = self.view.tables();
        if rid == 0 || rid > tables.row_count(table) {
            return Ok(None);
        }

        let member = match table {
            TableId::Module => tables
                .table::<ModuleRaw>()
                .map(|rows| rows.row(rid))
                .transpose()?
                .map(|row| MetadataMember::Module(ModuleDefinition::from_row(self, &row))),
            TableId::TypeRef => tables
                .table::<TypeRefRaw>()
                .map(|rows| rows.row(rid))
                .transpose()?
                .map(|row| MetadataMember::TypeRef(TypeReference::from_row(self, &row))),
            TableId::TypeDef => tables
                .table::<TypeDefRaw>()
                .map(|rows| rows.row(rid))
                .transpose()?
                .map(|row| MetadataMember::TypeDef(TypeDefinition::from_row(self, &row))),
            TableId::Field => tables
                .table::<FieldRaw>()
                .map(|rows| rows.row(rid))
                .transpose()?
                .map(|row| MetadataMember::Field(FieldDefinition::from_row(self, &row))),
            TableId::MethodDef => tables
                .table::<MethodDefRaw>()
                .map(|rows| rows.row(rid))
                .transpose()?
                .map(|row| MetadataMember::MethodDef(MethodDefinition::from_row(self, &row))),
            TableId::NestedClass => tables
                .table::<NestedClassRaw>()
                .map(|rows| rows.row(rid))
                .transpose()?
                .map(|row| MetadataMember::NestedClass(NestedClass::from_row(self, &row))),
            TableId::ModuleRef => tables
                .table::<ModuleRefRaw>()
                .map(|rows| rows.row(rid))
                .transpose()?
                .map(|row| MetadataMember::ModuleRef(ModuleReference::from_row(self, &row))),
            TableId::AssemblyRef => tables
                .table::<AssemblyRefRaw>()
                .map(|rows| rows.row(rid))
                .transpose()?
                .map(|row| MetadataMember::AssemblyRef(AssemblyReference::from_row(self, &row))),
            _ => None,
        };

        let Some(member) = member else {
            return Ok(None);
        };

        trace!(%token, "materialized entity");
        let entry = self.cache.get_or_insert(token, member);
        Ok(Some(entry.value().clone()))
    }

    /// Resolves a coded index column value.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the value carries a tag that maps to no table.
    pub fn resolve_coded(
        &self,
        kind: CodedIndexType,
        value: u32,
    ) -> Result<Option<MetadataMember>> {
        let coded = kind.decode(value)?;
        if coded.is_null() {
            return Ok(None);
        }
        self.resolve(coded.token)
    }

    /// The first `Module` row.
    ///
    /// # Errors
    /// Only fails if the row can't be decoded.
    pub fn module(&self) -> Result<Option<Arc<ModuleDefinition>>> {
        Ok(match self.resolve(Token::from_parts(TableId::Module, 1))? {
            Some(MetadataMember::Module(module)) => Some(module),
            _ => None,
        })
    }

    /// The type definition for `token`.
    ///
    /// # Errors
    /// Only fails if the row can't be decoded.
    pub fn type_definition(&self, token: Token) -> Result<Option<Arc<TypeDefinition>>> {
        Ok(match self.resolve(token)? {
            Some(MetadataMember::TypeDef(ty)) => Some(ty),
            _ => None,
        })
    }

    /// The type reference for `token`.
    ///
    /// # Errors
    /// Only fails if the row can't be decoded.
    pub fn type_reference(&self, token: Token) -> Result<Option<Arc<TypeReference>>> {
        Ok(match self.resolve(token)? {
            Some(MetadataMember::TypeRef(ty)) => Some(ty),
            _ => None,
        })
    }

    /// The field for `token`.
    ///
    /// # Errors
    /// Only fails if the row can't be decoded.
    pub fn field(&self, token: Token) -> Result<Option<Arc<FieldDefinition>>> {
        Ok(match self.resolve(token)? {
            Some(MetadataMember::Field(field)) => Some(field),
            _ => None,
        })
    }

    /// The method for `token`.
    ///
    /// # Errors
    /// Only fails if the row can't be decoded.
    pub fn method(&self, token: Token) -> Result<Option<Arc<MethodDefinition>>> {
        Ok(match self.resolve(token)? {
            Some(MetadataMember::MethodDef(method)) => Some(method),
            _ => None,
        })
    }

    /// The nested class record for `token`.
    ///
    /// # Errors
    /// Only fails if the row can't be decoded.
    pub fn nested_class(&self, token: Token) -> Result<Option<Arc<NestedClass>>> {
        Ok(match self.resolve(token)? {
            Some(MetadataMember::NestedClass(nested)) => Some(nested),
            _ => None,
        })
    }

    /// The module reference for `token`.
    ///
    /// # Errors
    /// Only fails if the row can't be decoded.
    pub fn module_reference(&self, token: Token) -> Result<Option<Arc<ModuleReference>>> {
        Ok(match self.resolve(token)? {
            Some(MetadataMember::ModuleRef(module)) => Some(module),
            _ => None,
        })
    }

    /// The assembly reference for `token`.
    ///
    /// # Errors
    /// Only fails if the row can't be decoded.
    pub fn assembly_reference(&self, token: Token) -> Result<Option<Arc<AssemblyReference>>> {
        Ok(match self.resolve(token)? {
            Some(MetadataMember::AssemblyRef(assembly)) => Some(assembly),
            _ => None,
        })
    }

    pub(crate) fn weak(&self) -> Weak<MetadataImage> {
        self.this.clone()
    }

    /// A deferred value computed from this image on first access
    pub(crate) fn lazy<T, F>(&self, resolve: F) -> Deferred<T>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn(&MetadataImage) -> Result<T> + Send + Sync + 'static,
    {
        let image = self.weak();
        Deferred::lazy(move || {
            let image = upgrade_image!(image);
            resolve(&image)
        })
    }

    /// Row ids of the members listed by `TypeDef` row `type_rid`, after pointer indirection
    pub(crate) fn member_rids(&self, list: MemberList, type_rid: u32) -> Result<Vec<u32>> {
        let tables = self.view.tables();
        let Some(typedefs) = tables.table::<TypeDefRaw>() else {
            return Ok(Vec::new());
        };
        let Some(row) = typedefs.get(type_rid) else {
            return Ok(Vec::new());
        };

        let pointers = tables.row_count(list.pointer());
        let count = if pointers > 0 {
            pointers
        } else {
            tables.row_count(list.target())
        };

        let start = list.start(&row).max(1);
        let end = match typedefs.get(type_rid + 1) {
            Some(next) => list.start(&next).min(count + 1),
            None => count + 1,
        };
        if start >= end {
            return Ok(Vec::new());
        }

        if pointers == 0 {
            return Ok((start..end).collect());
        }

        let mut rids = Vec::with_capacity((end - start) as usize);
        for index in start..end {
            let target = match list {
                MemberList::Fields => tables
                    .table::<FieldPtrRaw>()
                    .map(|rows| rows.row(index))
                    .transpose()?
                    .map(|row| row.field),
                MemberList::Methods => tables
                    .table::<MethodPtrRaw>()
                    .map(|rows| rows.row(index))
                    .transpose()?
                    .map(|row| row.method),
            };
            rids.extend(target);
        }
        Ok(rids)
    }

    /// The `TypeDef` row whose member list contains `member_rid`, the first one if several do
    pub(crate) fn member_owner(&self, list: MemberList, member_rid: u32) -> Result<Option<u32>> {
        let index = self.index.get()?;
        let owners = match list {
            MemberList::Fields => &index.field_owners,
            MemberList::Methods => &index.method_owners,
        };
        Ok(owners
            .get(member_rid as usize)
            .copied()
            .filter(|&owner| owner != 0))
    }

    /// The enclosing `TypeDef` row of `type_rid`, if it is nested
    pub(crate) fn enclosing_rid(&self, type_rid: u32) -> Result<Option<u32>> {
        Ok(self.index.get()?.enclosing.get(&type_rid).copied())
    }

    /// The `NestedClass` rows whose enclosing side is `type_rid`, in table order
    pub(crate) fn nested_records(&self, type_rid: u32) -> Result<Vec<u32>> {
        Ok(self
            .index
            .get()?
            .nested_records
            .get(&type_rid)
            .cloned()
            .unwrap_or_default())
    }

    fn build_index(&self) -> Result<GraphIndex> {
        let tables = self.view.tables();
        let mut index = GraphIndex {
            field_owners: vec![0; tables.row_count(TableId::Field) as usize + 1],
            method_owners: vec![0; tables.row_count(TableId::MethodDef) as usize + 1],
            ..GraphIndex::default()
        };

        for type_rid in 1..=tables.row_count(TableId::TypeDef) {
            for (list, owners) in [
                (MemberList::Fields, &mut index.field_owners),
                (MemberList::Methods, &mut index.method_owners),
            ] {
                for member_rid in self.member_rids(list, type_rid)? {
                    if let Some(owner) = owners.get_mut(member_rid as usize) {
                        if *owner == 0 {
                            *owner = type_rid;
                        }
                    }
                }
            }
        }

        if let Some(rows) = tables.table::<NestedClassRaw>() {
            for row in rows.iter() {
                index
                    .enclosing
                    .entry(row.nested_class)
                    .or_insert(row.enclosing_class);
                index
                    .nested_records
                    .entry(row.enclosing_class)
                    .or_default()
                    .push(row.rid);
            }
        }

        trace!(
            fields = index.field_owners.len() - 1,
            methods = index.method_owners.len() - 1,
            nested = index.enclosing.len(),
            "built graph index"
        );
        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{metadata::members::Owned, test::crafted_streams, Error};

    fn image() -> Arc<MetadataImage> {
        MetadataImage::from_streams(crafted_streams()).unwrap()
    }

    #[test]
    fn same_token_same_entity() {
        let image = image();
        let token = Token::from_parts(TableId::TypeDef, 2);

        let first = image.type_definition(token).unwrap().unwrap();
        let second = image.type_definition(token).unwrap().unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let module = image.module().unwrap().unwrap();
        let listed = module
            .top_level_types
            .items()
            .unwrap()
            .into_iter()
            .find(|ty| ty.token == token)
            .unwrap();
        assert!(Arc::ptr_eq(&first, &listed));
    }

    #[test]
    fn absent_tokens() {
        let image = image();
        let rows = image.view().tables().row_count(TableId::TypeDef);

        assert!(image
            .resolve(Token::from_parts(TableId::TypeDef, rows + 1))
            .unwrap()
            .is_none());
        assert!(image
            .resolve(Token::from_parts(TableId::TypeDef, 0))
            .unwrap()
            .is_none());
        assert!(image.resolve(Token::new(0x7F00_0001)).unwrap().is_none());
        assert!(image
            .resolve(Token::from_parts(TableId::Event, 1))
            .unwrap()
            .is_none());
        assert!(image
            .type_definition(Token::from_parts(TableId::Field, 1))
            .unwrap()
            .is_none());
    }

    #[test]
    fn field_pointer_indirection() {
        let image = MetadataImage::from_streams(crate::test::crafted_streams_with_field_ptr())
            .unwrap();
        let outer = image
            .type_definition(Token::from_parts(TableId::TypeDef, 2))
            .unwrap()
            .unwrap();

        let fields = outer.fields.items().unwrap();
        let tokens: Vec<u32> = fields.iter().map(|field| field.token.row()).collect();
        assert_eq!(tokens, vec![2, 1]);
        assert_eq!(fields[0].name.get().unwrap(), "second");

        let owner = fields[1].owner().unwrap().unwrap();
        assert!(Arc::ptr_eq(&owner, &outer));
    }

    #[test]
    fn reverse_index_agrees_with_member_lists() {
        let image = image();
        let types = image.view().tables().row_count(TableId::TypeDef);

        for list in [MemberList::Fields, MemberList::Methods] {
            for type_rid in 1..=types {
                for member_rid in image.member_rids(list, type_rid).unwrap() {
                    assert_eq!(
                        image.member_owner(list, member_rid).unwrap(),
                        Some(type_rid)
                    );
                }
            }
        }
        assert_eq!(image.member_owner(MemberList::Fields, 99).unwrap(), None);

        assert_eq!(image.enclosing_rid(3).unwrap(), Some(2));
        assert_eq!(image.enclosing_rid(4).unwrap(), None);
        assert_eq!(image.nested_records(2).unwrap(), vec![1]);
        assert!(image.nested_records(4).unwrap().is_empty());
        assert!(image.index.is_evaluated());
    }

    #[test]
    fn thunk_after_drop() {
        let image = image();
        let ty = image
            .type_definition(Token::from_parts(TableId::TypeDef, 2))
            .unwrap()
            .unwrap();
        drop(image);

        assert!(matches!(ty.name.get(), Err(Error::ImageDropped)));
    }

    #[test]
    fn reserved_coded_tag() {
        let image = image();
        let error = image
            .resolve_coded(CodedIndexType::CustomAttributeType, (1 << 3) | 4)
            .unwrap_err();
        assert!(error.is_format_error());
    }
}
