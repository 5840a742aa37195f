use std::sync::{Arc, Weak};

use crate::{
    metadata::{
        members::{Deferred, MetadataImage, ModuleDefinition, Owned, TypeDefinition},
        tables::{NestedClassRaw, TableId},
        token::Token,
    },
    Result,
};

/// A `NestedClass` entity linking a nested type to its enclosing type.
///
/// The record is owned by the enclosing type's `nested_classes`. Whenever either side of the
/// link changes, the nested type's `declaring_type` is updated to match.
#[derive(Debug)]
pub struct NestedClass {
    /// Token of the row, row 0 for a record that was not read from a table
    pub token: Token,
    pub(crate) class: Deferred<Option<Arc<TypeDefinition>>>,
    pub(crate) enclosing: Deferred<Option<Weak<TypeDefinition>>>,
}

impl NestedClass {
    /// Creates an unattached record for `class`
    #[must_use]
    pub fn new(class: &Arc<TypeDefinition>) -> Arc<Self> {
        Arc::new(NestedClass {
            token: Token::from_parts(TableId::NestedClass, 0),
            class: Deferred::new(Some(class.clone())),
            enclosing: Deferred::new(None),
        })
    }

    pub(crate) fn from_row(image: &MetadataImage, row: &NestedClassRaw) -> Arc<Self> {
        let (nested, enclosing) = (row.nested_class, row.enclosing_class);

        Arc::new(NestedClass {
            token: row.token,
            class: image.lazy(move |image| {
                image.type_definition(Token::from_parts(TableId::TypeDef, nested))
            }),
            enclosing: image.lazy(move |image| {
                Ok(image
                    .type_definition(Token::from_parts(TableId::TypeDef, enclosing))?
                    .map(|ty| Arc::downgrade(&ty)))
            }),
        })
    }

    /// The nested type, `None` if it is unset or its row does not exist. Change it through
    /// [`NestedClass::set_class`].
    ///
    /// # Errors
    /// Returns an error if the nested row can't be decoded.
    pub fn class(&self) -> Result<Option<Arc<TypeDefinition>>> {
        self.class.get()
    }

    /// The enclosing type, `None` if it is unset or its row does not exist. Change it through
    /// [`Owned::set_owner`].
    ///
    /// # Errors
    /// Returns an error if the enclosing row can't be decoded.
    pub fn enclosing_type(&self) -> Result<Option<Arc<TypeDefinition>>> {
        self.owner()
    }

    /// Replaces the nested type. The previous type loses its declaring type, the new one points
    /// at this record's enclosing type.
    ///
    /// If the record is attached, the new type leaves the module and any other record it was
    /// nested through.
    ///
    /// # Errors
    /// Returns an error if the current class, the enclosing type or one of the member lists the
    /// new type leaves can't be resolved.
    pub fn set_class(&self, class: Option<Arc<TypeDefinition>>) -> Result<()> {
        let previous = self.class.get()?;
        let enclosing = self.enclosing.get()?;

        if let (Some(previous), Some(class)) = (&previous, &class) {
            if Arc::ptr_eq(previous, class) {
                return Ok(());
            }
        }

        if let Some(class) = &class {
            if enclosing.as_ref().is_some_and(|owner| owner.upgrade().is_some()) {
                self.release(class)?;
            }
        }

        if let Some(previous) = previous {
            previous.declaring_type.set(None);
        }
        if let Some(class) = &class {
            class.declaring_type.set(enclosing);
        }
        self.class.set(class);
        Ok(())
    }

    /// Takes `class` out of the module and out of any other record nesting it
    fn release(&self, class: &Arc<TypeDefinition>) -> Result<()> {
        <TypeDefinition as Owned<ModuleDefinition>>::detach(class)?;

        if let Some(record) = class.nesting_record()? {
            if !std::ptr::eq(Arc::as_ptr(&record), self) {
                record.detach()?;
            }
        }
        Ok(())
    }
}

impl Owned<TypeDefinition> for NestedClass {
    fn owner_slot(&self) -> &Deferred<Option<Weak<TypeDefinition>>> {
        &self.enclosing
    }

    fn before_attach(&self, _enclosing: &Arc<TypeDefinition>) -> Result<()> {
        match self.class.get()? {
            Some(class) => self.release(&class),
            None => Ok(()),
        }
    }

    fn owner_changed(&self, owner: Option<&Arc<TypeDefinition>>) -> Result<()> {
        if let Some(class) = self.class.get()? {
            class.declaring_type.set(owner.map(Arc::downgrade));
        }
        Ok(())
    }
}
