use std::sync::{Arc, Weak};

use crate::{
    metadata::{
        members::{
            image::MemberList, Deferred, FieldDefinition, MetadataImage, MetadataMember,
            MethodDefinition, ModuleDefinition, NestedClass, Owned, OwnedCollection, Owner,
            WeakMember,
        },
        tables::{CodedIndexType, TableId, TypeDefRaw},
        token::Token,
    },
    Error, Result,
};

/// A `TypeDef` entity.
///
/// Owns its fields, methods and the [`NestedClass`] records of the types nested inside it.
/// Top-level types belong to the module; nested types have no module owner and point at their
/// enclosing type through `declaring_type` instead.
#[derive(Debug)]
pub struct TypeDefinition {
    /// Token of the row, row 0 for a type that was not read from a table
    pub token: Token,
    /// `TypeAttributes`
    pub flags: Deferred<u32>,
    /// Simple name
    pub name: Deferred<String>,
    /// Namespace, empty for nested types
    pub namespace: Deferred<String>,
    /// The type this one extends
    pub base_type: Deferred<Option<WeakMember>>,
    pub(crate) module: Deferred<Option<Weak<ModuleDefinition>>>,
    pub(crate) declaring_type: Deferred<Option<Weak<TypeDefinition>>>,
    /// Fields in declaration order
    pub fields: OwnedCollection<TypeDefinition, FieldDefinition>,
    /// Methods in declaration order
    pub methods: OwnedCollection<TypeDefinition, MethodDefinition>,
    /// Records of the types nested directly inside this one
    pub nested_classes: OwnedCollection<TypeDefinition, NestedClass>,
    max_nesting_depth: usize,
}

impl TypeDefinition {
    /// Creates a type that is not backed by a table row. It starts without owner and members.
    #[must_use]
    pub fn new(namespace: &str, name: &str, flags: u32) -> Arc<Self> {
        Arc::new_cyclic(|this| TypeDefinition {
            token: Token::from_parts(TableId::TypeDef, 0),
            flags: Deferred::new(flags),
            name: Deferred::new(name.to_string()),
            namespace: Deferred::new(namespace.to_string()),
            base_type: Deferred::new(None),
            module: Deferred::new(None),
            declaring_type: Deferred::new(None),
            fields: OwnedCollection::new(this.clone()),
            methods: OwnedCollection::new(this.clone()),
            nested_classes: OwnedCollection::new(this.clone()),
            max_nesting_depth: 64,
        })
    }

    pub(crate) fn from_row(image: &MetadataImage, row: &TypeDefRaw) -> Arc<Self> {
        let rid = row.rid;
        let (name, namespace, extends) = (row.type_name, row.type_namespace, row.extends);

        Arc::new_cyclic(|this: &Weak<TypeDefinition>| TypeDefinition {
            token: row.token,
            flags: Deferred::new(row.flags),
            name: image.lazy(move |image| Ok(image.view().string_at(name)?.to_string())),
            namespace: image.lazy(move |image| Ok(image.view().string_at(namespace)?.to_string())),
            base_type: image.lazy(move |image| {
                Ok(image
                    .resolve_coded(CodedIndexType::TypeDefOrRef, extends)?
                    .map(|member| member.downgrade()))
            }),
            module: image.lazy(move |image| {
                if image.enclosing_rid(rid)?.is_some() {
                    return Ok(None);
                }
                Ok(image.module()?.map(|module| Arc::downgrade(&module)))
            }),
            declaring_type: image.lazy(move |image| {
                let Some(enclosing) = image.enclosing_rid(rid)? else {
                    return Ok(None);
                };
                Ok(image
                    .type_definition(Token::from_parts(TableId::TypeDef, enclosing))?
                    .map(|ty| Arc::downgrade(&ty)))
            }),
            fields: member_collection(image, this, MemberList::Fields, rid, |member| {
                match member {
                    MetadataMember::Field(field) => Some(field),
                    _ => None,
                }
            }),
            methods: member_collection(image, this, MemberList::Methods, rid, |member| {
                match member {
                    MetadataMember::MethodDef(method) => Some(method),
                    _ => None,
                }
            }),
            nested_classes: OwnedCollection::lazy(this.clone(), {
                let image = image.weak();
                move || {
                    let image = upgrade_image!(image);
                    let mut records = Vec::new();
                    for record_rid in image.nested_records(rid)? {
                        let token = Token::from_parts(TableId::NestedClass, record_rid);
                        records.extend(image.nested_class(token)?);
                    }
                    Ok(records)
                }
            }),
            max_nesting_depth: image.config().max_nesting_depth,
        })
    }

    /// The owning module, set for top-level types only.
    ///
    /// # Errors
    /// Returns an error if the nesting rows can't be read.
    pub fn module(&self) -> Result<Option<Arc<ModuleDefinition>>> {
        self.owner()
    }

    /// The enclosing type, if this type is nested.
    ///
    /// # Errors
    /// Returns an error if the nesting rows can't be read.
    pub fn enclosing_type(&self) -> Result<Option<Arc<TypeDefinition>>> {
        Ok(self.declaring_type.get()?.and_then(|ty| ty.upgrade()))
    }

    /// The type this one extends, `None` for interfaces and `System.Object`.
    ///
    /// # Errors
    /// Returns an error if the extends column holds an invalid coded index.
    pub fn base(&self) -> Result<Option<MetadataMember>> {
        Ok(self.base_type.get()?.and_then(|base| base.upgrade()))
    }

    /// The types nested directly inside this one, in declaration order.
    ///
    /// # Errors
    /// Returns an error if the nesting rows can't be resolved.
    pub fn nested_types(&self) -> Result<Vec<Arc<TypeDefinition>>> {
        let mut types = Vec::new();
        for record in self.nested_classes.items()? {
            types.extend(record.class()?);
        }
        Ok(types)
    }

    /// The record in the enclosing type's `nested_classes` that names this type
    pub(crate) fn nesting_record(&self) -> Result<Option<Arc<NestedClass>>> {
        let Some(enclosing) = self.enclosing_type()? else {
            return Ok(None);
        };

        for record in enclosing.nested_classes.items()? {
            if record
                .class()?
                .is_some_and(|class| std::ptr::eq(Arc::as_ptr(&class), self))
            {
                return Ok(Some(record));
            }
        }
        Ok(None)
    }

    /// The name including namespace and enclosing types, `Namespace.Outer/Inner`.
    ///
    /// # Errors
    /// Returns [`crate::Error::RecursionLimit`] for an enclosing chain longer than the configured
    /// limit, or an error if a name can't be read.
    pub fn full_name(&self) -> Result<String> {
        let mut names = vec![self.name.get()?];
        let mut namespace = self.namespace.get()?;
        let mut current = self.enclosing_type()?;
        let mut depth = 0;

        while let Some(ty) = current {
            depth += 1;
            if depth > self.max_nesting_depth {
                return Err(Error::RecursionLimit(self.max_nesting_depth));
            }
            names.push(ty.name.get()?);
            namespace = ty.namespace.get()?;
            current = ty.enclosing_type()?;
        }

        names.reverse();
        let name = names.join("/");
        if namespace.is_empty() {
            Ok(name)
        } else {
            Ok(format!("{namespace}.{name}"))
        }
    }

    /// Nests `nested` directly inside this type and returns the record linking both.
    ///
    /// A top-level type leaves the module; a type nested elsewhere moves its existing record
    /// over.
    ///
    /// # Errors
    /// Returns an error if one of the involved member lists can't be resolved.
    pub fn add_nested_type(
        self: &Arc<Self>,
        nested: &Arc<TypeDefinition>,
    ) -> Result<Arc<NestedClass>> {
        if let Some(record) = nested.nesting_record()? {
            record.set_owner(self)?;
            return Ok(record);
        }

        let record = NestedClass::new(nested);
        record.set_owner(self)?;
        Ok(record)
    }
}

fn member_collection<M, F>(
    image: &MetadataImage,
    this: &Weak<TypeDefinition>,
    list: MemberList,
    rid: u32,
    select: F,
) -> OwnedCollection<TypeDefinition, M>
where
    M: Owned<TypeDefinition> + Send + Sync + 'static,
    TypeDefinition: Owner<M>,
    F: Fn(MetadataMember) -> Option<Arc<M>> + Send + Sync + 'static,
{
    let image = image.weak();
    OwnedCollection::lazy(this.clone(), move || {
        let image = upgrade_image!(image);
        let mut members = Vec::new();
        for member_rid in image.member_rids(list, rid)? {
            let token = Token::from_parts(list.target(), member_rid);
            if let Some(member) = image.resolve(token)? {
                members.extend(select(member));
            }
        }
        Ok(members)
    })
}

impl Owned<ModuleDefinition> for TypeDefinition {
    fn owner_slot(&self) -> &Deferred<Option<Weak<ModuleDefinition>>> {
        &self.module
    }

    fn before_attach(&self, _module: &Arc<ModuleDefinition>) -> Result<()> {
        if let Some(record) = self.nesting_record()? {
            record.detach()?;
        }
        Ok(())
    }
}

impl Owner<FieldDefinition> for TypeDefinition {
    fn members(&self) -> &OwnedCollection<TypeDefinition, FieldDefinition> {
        &self.fields
    }
}

impl Owner<MethodDefinition> for TypeDefinition {
    fn members(&self) -> &OwnedCollection<TypeDefinition, MethodDefinition> {
        &self.methods
    }
}

impl Owner<NestedClass> for TypeDefinition {
    fn members(&self) -> &OwnedCollection<TypeDefinition, NestedClass> {
        &self.nested_classes
    }
}
