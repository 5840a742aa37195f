use std::sync::{Arc, Weak};

use crate::{
    metadata::{
        members::{image::MemberList, Deferred, MetadataImage, Owned, TypeDefinition},
        tables::{FieldRaw, TableId},
        token::Token,
    },
    Result,
};

/// A `Field` entity, owned by the type whose field list contains it
#[derive(Debug)]
pub struct FieldDefinition {
    /// Token of the row, row 0 for a field that was not read from a table
    pub token: Token,
    /// `FieldAttributes`
    pub flags: Deferred<u16>,
    /// Field name
    pub name: Deferred<String>,
    /// Raw field signature blob
    pub signature: Deferred<Vec<u8>>,
    pub(crate) declaring_type: Deferred<Option<Weak<TypeDefinition>>>,
}

impl FieldDefinition {
    /// Creates a field that is not backed by a table row
    #[must_use]
    pub fn new(name: &str, flags: u16, signature: Vec<u8>) -> Arc<Self> {
        Arc::new(FieldDefinition {
            token: Token::from_parts(TableId::Field, 0),
            flags: Deferred::new(flags),
            name: Deferred::new(name.to_string()),
            signature: Deferred::new(signature),
            declaring_type: Deferred::new(None),
        })
    }

    /// The owning type. Move the field with [`Owned::set_owner`] or [`Owned::detach`].
    ///
    /// # Errors
    /// Returns an error if the owning type can't be resolved from the tables.
    pub fn declaring_type(&self) -> Result<Option<Arc<TypeDefinition>>> {
        self.owner()
    }

    pub(crate) fn from_row(image: &MetadataImage, row: &FieldRaw) -> Arc<Self> {
        let (rid, name, signature) = (row.rid, row.name, row.signature);

        Arc::new(FieldDefinition {
            token: row.token,
            flags: Deferred::new(u16::try_from(row.flags).unwrap_or(u16::MAX)),
            name: image.lazy(move |image| Ok(image.view().string_at(name)?.to_string())),
            signature: image.lazy(move |image| Ok(image.view().blob_at(signature)?.to_vec())),
            declaring_type: image.lazy(move |image| {
                let Some(owner) = image.member_owner(MemberList::Fields, rid)? else {
                    return Ok(None);
                };
                Ok(image
                    .type_definition(Token::from_parts(TableId::TypeDef, owner))?
                    .map(|ty| Arc::downgrade(&ty)))
            }),
        })
    }
}

impl Owned<TypeDefinition> for FieldDefinition {
    fn owner_slot(&self) -> &Deferred<Option<Weak<TypeDefinition>>> {
        &self.declaring_type
    }
}
