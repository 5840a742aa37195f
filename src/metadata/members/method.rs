use std::sync::{Arc, Weak};

use crate::{
    metadata::{
        members::{image::MemberList, Deferred, MetadataImage, Owned, TypeDefinition},
        tables::{MethodDefRaw, TableId},
        token::Token,
    },
    Result,
};

/// A `MethodDef` entity, owned by the type whose method list contains it
#[derive(Debug)]
pub struct MethodDefinition {
    /// Token of the row, row 0 for a method that was not read from a table
    pub token: Token,
    /// RVA of the method body, 0 for abstract and runtime-provided methods
    pub rva: Deferred<u32>,
    /// `MethodImplAttributes`
    pub impl_flags: Deferred<u16>,
    /// `MethodAttributes`
    pub flags: Deferred<u16>,
    /// Method name
    pub name: Deferred<String>,
    /// Raw method signature blob
    pub signature: Deferred<Vec<u8>>,
    pub(crate) declaring_type: Deferred<Option<Weak<TypeDefinition>>>,
}

impl MethodDefinition {
    /// Creates a method that is not backed by a table row
    #[must_use]
    pub fn new(name: &str, flags: u16, signature: Vec<u8>) -> Arc<Self> {
        Arc::new(MethodDefinition {
            token: Token::from_parts(TableId::MethodDef, 0),
            rva: Deferred::new(0),
            impl_flags: Deferred::new(0),
            flags: Deferred::new(flags),
            name: Deferred::new(name.to_string()),
            signature: Deferred::new(signature),
            declaring_type: Deferred::new(None),
        })
    }

    /// The owning type. Move the method with [`Owned::set_owner`] or [`Owned::detach`].
    ///
    /// # Errors
    /// Returns an error if the owning type can't be resolved from the tables.
    pub fn declaring_type(&self) -> Result<Option<Arc<TypeDefinition>>> {
        self.owner()
    }

    pub(crate) fn from_row(image: &MetadataImage, row: &MethodDefRaw) -> Arc<Self> {
        let (rid, name, signature) = (row.rid, row.name, row.signature);

        Arc::new(MethodDefinition {
            token: row.token,
            rva: Deferred::new(row.rva),
            impl_flags: Deferred::new(u16::try_from(row.impl_flags).unwrap_or(u16::MAX)),
            flags: Deferred::new(u16::try_from(row.flags).unwrap_or(u16::MAX)),
            name: image.lazy(move |image| Ok(image.view().string_at(name)?.to_string())),
            signature: image.lazy(move |image| Ok(image.view().blob_at(signature)?.to_vec())),
            declaring_type: image.lazy(move |image| {
                let Some(owner) = image.member_owner(MemberList::Methods, rid)? else {
                    return Ok(None);
                };
                Ok(image
                    .type_definition(Token::from_parts(TableId::TypeDef, owner))?
                    .map(|ty| Arc::downgrade(&ty)))
            }),
        })
    }
}

impl Owned<TypeDefinition> for MethodDefinition {
    fn owner_slot(&self) -> &Deferred<Option<Weak<TypeDefinition>>> {
        &self.declaring_type
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::crafted_streams;

    #[test]
    fn owner_by_reverse_lookup() {
        let image = MetadataImage::from_streams(crafted_streams()).unwrap();
        let m2 = image
            .method(Token::from_parts(TableId::MethodDef, 2))
            .unwrap()
            .unwrap();

        assert_eq!(m2.rva.get().unwrap(), 0x2050);
        let owner = m2.declaring_type().unwrap().unwrap();
        assert_eq!(owner.name.get().unwrap(), "Y");
        assert!(owner.methods.contains(&m2).unwrap());
    }

    #[test]
    fn authored_method() {
        let ty = TypeDefinition::new("", "T", 0);
        let method = MethodDefinition::new(".ctor", 0x1886, vec![0x20, 0x00, 0x01]);
        method.set_owner(&ty).unwrap();

        assert_eq!(ty.methods.len().unwrap(), 1);
        assert!(method.detach().unwrap());
        assert!(ty.methods.is_empty().unwrap());
    }
}
