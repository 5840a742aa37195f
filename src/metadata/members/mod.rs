//! The token-addressed object graph.
//!
//! [`MetadataImage`] turns tokens into long-lived entities. Entities are created on first
//! request, cached by token and handed out as `Arc`s, so two lookups of the same token return
//! the same instance. Their fields are [`Deferred`] values that read the heaps and tables only
//! when first accessed, and can be overwritten at any time.
//!
//! Ownership edges are kept consistent by [`OwnedCollection`]:
//! - [`ModuleDefinition::top_level_types`] and [`TypeDefinition::module`]
//! - [`TypeDefinition::fields`] / [`TypeDefinition::methods`] and the members' declaring type
//! - [`TypeDefinition::nested_classes`] and [`NestedClass::enclosing_type`], which also drives
//!   [`TypeDefinition::enclosing_type`] of the nested type
//!
//! A type is either top-level or nested, never both: joining the module drops its nesting
//! record, and nesting it takes it out of the module.
//!
//! Collections own their members, back-pointers are weak and can only be read from outside.
//! Changes go through [`Owned::set_owner`], [`Owned::detach`], the collections and
//! [`NestedClass::set_class`]. Cross references that are not
//! ownership edges, like a base type, are held as [`WeakMember`].
//!
//! # Examples
//!
//! ```rust,no_run
//! use cilmeta::metadata::{members::MetadataImage, token::Token, view::MetadataStreams};
//!
//! # fn example(streams: MetadataStreams) -> cilmeta::Result<()> {
//! let image = MetadataImage::from_streams(streams)?;
//! if let Some(ty) = image.type_definition(Token::new(0x0200_0002))? {
//!     println!("{}", ty.full_name()?);
//!     for field in ty.fields.items()? {
//!         println!("  {}", field.name.get()?);
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Thread Safety
//!
//! Readers may share an image freely. Mutations of ownership edges are not atomic across the
//! involved entities; keep to one mutating thread per image.

mod assemblyref;
mod collection;
mod deferred;
mod field;
mod image;
mod method;
mod module;
mod moduleref;
mod nestedclass;
mod typedef;
mod typeref;

use std::sync::{Arc, Weak};

pub use assemblyref::{AssemblyReference, AssemblyVersion};
pub use collection::{OwnedCollection, Owned, Owner};
pub use deferred::Deferred;
pub use field::FieldDefinition;
pub use image::MetadataImage;
pub use method::MethodDefinition;
pub use module::{ModuleDefinition, TypeTraversal};
pub use moduleref::ModuleReference;
pub use nestedclass::NestedClass;
pub use typedef::TypeDefinition;
pub use typeref::TypeReference;

use crate::metadata::{tables::TableId, token::Token};

/// A strong handle to any entity of the graph
#[derive(Clone, Debug)]
pub enum MetadataMember {
    /// A `Module` row
    Module(Arc<ModuleDefinition>),
    /// A `TypeDef` row
    TypeDef(Arc<TypeDefinition>),
    /// A `TypeRef` row
    TypeRef(Arc<TypeReference>),
    /// A `Field` row
    Field(Arc<FieldDefinition>),
    /// A `MethodDef` row
    MethodDef(Arc<MethodDefinition>),
    /// A `NestedClass` row
    NestedClass(Arc<NestedClass>),
    /// A `ModuleRef` row
    ModuleRef(Arc<ModuleReference>),
    /// An `AssemblyRef` row
    AssemblyRef(Arc<AssemblyReference>),
}

impl MetadataMember {
    /// Token of the entity
    #[must_use]
    pub fn token(&self) -> Token {
        match self {
            MetadataMember::Module(member) => member.token,
            MetadataMember::TypeDef(member) => member.token,
            MetadataMember::TypeRef(member) => member.token,
            MetadataMember::Field(member) => member.token,
            MetadataMember::MethodDef(member) => member.token,
            MetadataMember::NestedClass(member) => member.token,
            MetadataMember::ModuleRef(member) => member.token,
            MetadataMember::AssemblyRef(member) => member.token,
        }
    }

    /// The table this kind of entity is read from
    #[must_use]
    pub fn table_id(&self) -> TableId {
        match self {
            MetadataMember::Module(_) => TableId::Module,
            MetadataMember::TypeDef(_) => TableId::TypeDef,
            MetadataMember::TypeRef(_) => TableId::TypeRef,
            MetadataMember::Field(_) => TableId::Field,
            MetadataMember::MethodDef(_) => TableId::MethodDef,
            MetadataMember::NestedClass(_) => TableId::NestedClass,
            MetadataMember::ModuleRef(_) => TableId::ModuleRef,
            MetadataMember::AssemblyRef(_) => TableId::AssemblyRef,
        }
    }

    /// A non-owning handle to the same entity
    #[must_use]
    pub fn downgrade(&self) -> WeakMember {
        match self {
            MetadataMember::Module(member) => WeakMember::Module(Arc::downgrade(member)),
            MetadataMember::TypeDef(member) => WeakMember::TypeDef(Arc::downgrade(member)),
            MetadataMember::TypeRef(member) => WeakMember::TypeRef(Arc::downgrade(member)),
            MetadataMember::Field(member) => WeakMember::Field(Arc::downgrade(member)),
            MetadataMember::MethodDef(member) => WeakMember::MethodDef(Arc::downgrade(member)),
            MetadataMember::NestedClass(member) => WeakMember::NestedClass(Arc::downgrade(member)),
            MetadataMember::ModuleRef(member) => WeakMember::ModuleRef(Arc::downgrade(member)),
            MetadataMember::AssemblyRef(member) => WeakMember::AssemblyRef(Arc::downgrade(member)),
        }
    }

    /// True if both handles point at the same entity instance
    #[must_use]
    pub fn ptr_eq(&self, other: &MetadataMember) -> bool {
        match (self, other) {
            (MetadataMember::Module(a), MetadataMember::Module(b)) => Arc::ptr_eq(a, b),
            (MetadataMember::TypeDef(a), MetadataMember::TypeDef(b)) => Arc::ptr_eq(a, b),
            (MetadataMember::TypeRef(a), MetadataMember::TypeRef(b)) => Arc::ptr_eq(a, b),
            (MetadataMember::Field(a), MetadataMember::Field(b)) => Arc::ptr_eq(a, b),
            (MetadataMember::MethodDef(a), MetadataMember::MethodDef(b)) => Arc::ptr_eq(a, b),
            (MetadataMember::NestedClass(a), MetadataMember::NestedClass(b)) => Arc::ptr_eq(a, b),
            (MetadataMember::ModuleRef(a), MetadataMember::ModuleRef(b)) => Arc::ptr_eq(a, b),
            (MetadataMember::AssemblyRef(a), MetadataMember::AssemblyRef(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// A weak handle to any entity of the graph, used for references that don't own their target
#[derive(Clone, Debug)]
pub enum WeakMember {
    /// A `Module` row
    Module(Weak<ModuleDefinition>),
    /// A `TypeDef` row
    TypeDef(Weak<TypeDefinition>),
    /// A `TypeRef` row
    TypeRef(Weak<TypeReference>),
    /// A `Field` row
    Field(Weak<FieldDefinition>),
    /// A `MethodDef` row
    MethodDef(Weak<MethodDefinition>),
    /// A `NestedClass` row
    NestedClass(Weak<NestedClass>),
    /// A `ModuleRef` row
    ModuleRef(Weak<ModuleReference>),
    /// An `AssemblyRef` row
    AssemblyRef(Weak<AssemblyReference>),
}

impl WeakMember {
    /// The entity, if it is still alive
    #[must_use]
    pub fn upgrade(&self) -> Option<MetadataMember> {
        Some(match self {
            WeakMember::Module(member) => MetadataMember::Module(member.upgrade()?),
            WeakMember::TypeDef(member) => MetadataMember::TypeDef(member.upgrade()?),
            WeakMember::TypeRef(member) => MetadataMember::TypeRef(member.upgrade()?),
            WeakMember::Field(member) => MetadataMember::Field(member.upgrade()?),
            WeakMember::MethodDef(member) => MetadataMember::MethodDef(member.upgrade()?),
            WeakMember::NestedClass(member) => MetadataMember::NestedClass(member.upgrade()?),
            WeakMember::ModuleRef(member) => MetadataMember::ModuleRef(member.upgrade()?),
            WeakMember::AssemblyRef(member) => MetadataMember::AssemblyRef(member.upgrade()?),
        })
    }
}

impl From<&MetadataMember> for WeakMember {
    fn from(member: &MetadataMember) -> Self {
        member.downgrade()
    }
}
