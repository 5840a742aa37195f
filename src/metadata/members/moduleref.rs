use std::sync::Arc;

use crate::metadata::{
    members::{Deferred, MetadataImage},
    tables::{ModuleRefRaw, TableId},
    token::Token,
};

/// A `ModuleRef` entity, a module of the same assembly or a native library
#[derive(Debug)]
pub struct ModuleReference {
    /// Token of the row
    pub token: Token,
    /// Module file name
    pub name: Deferred<String>,
}

impl ModuleReference {
    /// Creates a reference that is not backed by a table row
    #[must_use]
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(ModuleReference {
            token: Token::from_parts(TableId::ModuleRef, 0),
            name: Deferred::new(name.to_string()),
        })
    }

    pub(crate) fn from_row(image: &MetadataImage, row: &ModuleRefRaw) -> Arc<Self> {
        let name = row.name;
        Arc::new(ModuleReference {
            token: row.token,
            name: image.lazy(move |image| Ok(image.view().string_at(name)?.to_string())),
        })
    }
}
