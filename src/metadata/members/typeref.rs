use std::sync::Arc;

use crate::{
    metadata::{
        members::{Deferred, MetadataImage, MetadataMember, WeakMember},
        tables::{CodedIndexType, TableId, TypeRefRaw},
        token::Token,
    },
    Error, Result,
};

/// A `TypeRef` entity, a type defined in another module or assembly
#[derive(Debug)]
pub struct TypeReference {
    /// Token of the row
    pub token: Token,
    /// Where the type is defined: a module, module reference, assembly reference or, for a
    /// nested type, the enclosing type reference
    pub resolution_scope: Deferred<Option<WeakMember>>,
    /// Simple name
    pub name: Deferred<String>,
    /// Namespace
    pub namespace: Deferred<String>,
}

impl TypeReference {
    /// Creates a reference that is not backed by a table row
    #[must_use]
    pub fn new(namespace: &str, name: &str, scope: Option<&MetadataMember>) -> Arc<Self> {
        Arc::new(TypeReference {
            token: Token::from_parts(TableId::TypeRef, 0),
            resolution_scope: Deferred::new(scope.map(MetadataMember::downgrade)),
            name: Deferred::new(name.to_string()),
            namespace: Deferred::new(namespace.to_string()),
        })
    }

    pub(crate) fn from_row(image: &MetadataImage, row: &TypeRefRaw) -> Arc<Self> {
        let (scope, name, namespace) = (row.resolution_scope, row.type_name, row.type_namespace);

        Arc::new(TypeReference {
            token: row.token,
            resolution_scope: image.lazy(move |image| {
                Ok(image
                    .resolve_coded(CodedIndexType::ResolutionScope, scope)?
                    .map(|member| member.downgrade()))
            }),
            name: image.lazy(move |image| Ok(image.view().string_at(name)?.to_string())),
            namespace: image.lazy(move |image| Ok(image.view().string_at(namespace)?.to_string())),
        })
    }

    /// The resolution scope, if set and still alive.
    ///
    /// # Errors
    /// Returns an error if the scope column holds an invalid coded index.
    pub fn scope(&self) -> Result<Option<MetadataMember>> {
        Ok(self.resolution_scope.get()?.and_then(|scope| scope.upgrade()))
    }

    /// The name including namespace, with enclosing type references joined by `/`.
    ///
    /// # Errors
    /// Returns [`crate::Error::RecursionLimit`] for a chain of nested references deeper than 64,
    /// or an error if a name can't be read.
    pub fn full_name(&self) -> Result<String> {
        let mut names = vec![self.name.get()?];
        let mut namespace = self.namespace.get()?;
        let mut scope = self.scope()?;
        let mut depth = 0;

        while let Some(MetadataMember::TypeRef(outer)) = scope {
            depth += 1;
            if depth > 64 {
                return Err(Error::RecursionLimit(64));
            }
            names.push(outer.name.get()?);
            namespace = outer.namespace.get()?;
            scope = outer.scope()?;
        }

        names.reverse();
        let name = names.join("/");
        if namespace.is_empty() {
            Ok(name)
        } else {
            Ok(format!("{namespace}.{name}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::crafted_streams;

    #[test]
    fn scope_is_assembly_ref() {
        let image = MetadataImage::from_streams(crafted_streams()).unwrap();
        let object = image
            .type_reference(Token::from_parts(TableId::TypeRef, 1))
            .unwrap()
            .unwrap();

        assert_eq!(object.full_name().unwrap(), "System.Object");
        let Some(MetadataMember::AssemblyRef(assembly)) = object.scope().unwrap() else {
            panic!("System.Object should resolve to an assembly reference");
        };
        assert_eq!(assembly.name.get().unwrap(), "mscorlib");

        let direct = image
            .assembly_reference(Token::from_parts(TableId::AssemblyRef, 1))
            .unwrap()
            .unwrap();
        assert!(Arc::ptr_eq(&assembly, &direct));
    }

    #[test]
    fn nested_reference_name() {
        let outer = TypeReference::new("System", "Environment", None);
        let member = MetadataMember::TypeRef(outer);
        let inner = TypeReference::new("", "SpecialFolder", Some(&member));

        assert_eq!(inner.full_name().unwrap(), "System.Environment/SpecialFolder");
    }
}
