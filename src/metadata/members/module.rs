use std::sync::{Arc, Weak};

use crate::{
    metadata::{
        members::{Deferred, MetadataImage, MetadataMember, OwnedCollection, Owner, TypeDefinition},
        tables::{ModuleRaw, TableId, TypeDefRaw},
        token::Token,
    },
    Error, Result,
};

/// The `Module` entity, owner of the top-level types
#[derive(Debug)]
pub struct ModuleDefinition {
    /// Token of the module row, row 0 for a module that was not read from a table
    pub token: Token,
    /// Edit-and-continue generation
    pub generation: Deferred<u16>,
    /// Module name
    pub name: Deferred<String>,
    /// Module version id
    pub mvid: Deferred<Option<uguid::Guid>>,
    /// Edit-and-continue id
    pub enc_id: Deferred<Option<uguid::Guid>>,
    /// Edit-and-continue base id
    pub enc_base_id: Deferred<Option<uguid::Guid>>,
    /// Types not nested inside another type, in declaration order
    pub top_level_types: OwnedCollection<ModuleDefinition, TypeDefinition>,
    max_nesting_depth: usize,
}

impl ModuleDefinition {
    /// Creates a module that is not backed by a table row
    #[must_use]
    pub fn new(name: &str, mvid: Option<uguid::Guid>) -> Arc<Self> {
        Arc::new_cyclic(|this| ModuleDefinition {
            token: Token::from_parts(TableId::Module, 0),
            generation: Deferred::new(0),
            name: Deferred::new(name.to_string()),
            mvid: Deferred::new(mvid),
            enc_id: Deferred::new(None),
            enc_base_id: Deferred::new(None),
            top_level_types: OwnedCollection::new(this.clone()),
            max_nesting_depth: 64,
        })
    }

    pub(crate) fn from_row(image: &MetadataImage, row: &ModuleRaw) -> Arc<Self> {
        let (name, mvid, enc_id, enc_base_id) = (row.name, row.mvid, row.enc_id, row.enc_base_id);
        let generation = u16::try_from(row.generation).unwrap_or(u16::MAX);

        Arc::new_cyclic(|this: &Weak<ModuleDefinition>| ModuleDefinition {
            token: row.token,
            generation: Deferred::new(generation),
            name: image.lazy(move |image| Ok(image.view().string_at(name)?.to_string())),
            mvid: image.lazy(move |image| image.view().guid_at(mvid)),
            enc_id: image.lazy(move |image| image.view().guid_at(enc_id)),
            enc_base_id: image.lazy(move |image| image.view().guid_at(enc_base_id)),
            top_level_types: OwnedCollection::lazy(this.clone(), {
                let image = image.weak();
                move || {
                    let image = upgrade_image!(image);
                    top_level_types(&image)
                }
            }),
            max_nesting_depth: image.config().max_nesting_depth,
        })
    }

    /// Enumerates every type of this module, nested ones included, depth first in declaration
    /// order.
    ///
    /// Each call starts a new traversal. The iterator yields an error and stops if a nesting
    /// chain is deeper than the configured limit, which happens for cyclic nesting data.
    #[must_use]
    pub fn all_types(&self) -> TypeTraversal {
        let mut traversal = TypeTraversal {
            pending: Vec::new(),
            max_depth: self.max_nesting_depth,
            error: None,
        };

        match self.top_level_types.items() {
            Ok(types) => traversal
                .pending
                .extend(types.into_iter().rev().map(|ty| (ty, 0))),
            Err(error) => traversal.error = Some(error),
        }
        traversal
    }
}

impl Owner<TypeDefinition> for ModuleDefinition {
    fn members(&self) -> &OwnedCollection<ModuleDefinition, TypeDefinition> {
        &self.top_level_types
    }
}

fn top_level_types(image: &MetadataImage) -> Result<Vec<Arc<TypeDefinition>>> {
    let Some(typedefs) = image.view().tables().table::<TypeDefRaw>() else {
        return Ok(Vec::new());
    };

    let mut types = Vec::new();
    for rid in 1..=typedefs.row_count() {
        if image.enclosing_rid(rid)?.is_some() {
            continue;
        }
        if let Some(MetadataMember::TypeDef(ty)) =
            image.resolve(Token::from_parts(TableId::TypeDef, rid))?
        {
            types.push(ty);
        }
    }
    Ok(types)
}

/// Preorder iterator over a module's types, see [`ModuleDefinition::all_types`]
pub struct TypeTraversal {
    pending: Vec<(Arc<TypeDefinition>, usize)>,
    max_depth: usize,
    error: Option<Error>,
}

impl Iterator for TypeTraversal {
    type Item = Result<Arc<TypeDefinition>>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(error) = self.error.take() {
            self.pending.clear();
            return Some(Err(error));
        }

        let (ty, depth) = self.pending.pop()?;
        if depth > self.max_depth {
            self.pending.clear();
            return Some(Err(Error::RecursionLimit(self.max_depth)));
        }

        match ty.nested_types() {
            Ok(nested) => self
                .pending
                .extend(nested.into_iter().rev().map(|child| (child, depth + 1))),
            Err(error) => self.error = Some(error),
        }
        Some(Ok(ty))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        metadata::members::Owned,
        test::{crafted_streams, crafted_streams_with_nesting_cycle},
    };

    fn names(module: &ModuleDefinition) -> Vec<String> {
        module
            .all_types()
            .map(|ty| ty.unwrap().name.get().unwrap())
            .collect()
    }

    #[test]
    fn module_fields() {
        let image = MetadataImage::from_streams(crafted_streams()).unwrap();
        let module = image.module().unwrap().unwrap();

        assert_eq!(module.name.get().unwrap(), "app.dll");
        assert!(module.mvid.get().unwrap().is_some());
        assert_eq!(module.enc_id.get().unwrap(), None);
        assert_eq!(module.generation.get().unwrap(), 0);
    }

    #[test]
    fn preorder_is_restartable() {
        let image = MetadataImage::from_streams(crafted_streams()).unwrap();
        let module = image.module().unwrap().unwrap();

        let expected = vec!["<Module>", "X", "Z", "Y"];
        assert_eq!(names(&module), expected);
        assert_eq!(names(&module), expected);
    }

    #[test]
    fn top_level_excludes_nested() {
        let image = MetadataImage::from_streams(crafted_streams()).unwrap();
        let module = image.module().unwrap().unwrap();

        let top: Vec<String> = module
            .top_level_types
            .items()
            .unwrap()
            .iter()
            .map(|ty| ty.name.get().unwrap())
            .collect();
        assert_eq!(top, vec!["<Module>", "X", "Y"]);

        for ty in module.top_level_types.items().unwrap() {
            let owner = ty.owner().unwrap().unwrap();
            assert!(Arc::ptr_eq(&owner, &module));
        }
    }

    #[test]
    fn nesting_cycle_hits_limit() {
        let image = MetadataImage::from_streams(crafted_streams_with_nesting_cycle()).unwrap();
        let module = image.module().unwrap().unwrap();

        let results: Vec<_> = module.all_types().collect();
        assert!(matches!(
            results.last(),
            Some(Err(Error::RecursionLimit(64)))
        ));
    }

    #[test]
    fn authored_module() {
        let module = ModuleDefinition::new("fresh.dll", None);
        let ty = TypeDefinition::new("Fresh", "A", 0);
        ty.set_owner(&module).unwrap();

        let names = names(&module);
        assert_eq!(names, vec!["A"]);
    }
}
