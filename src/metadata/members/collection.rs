//! Member lists that keep their members' back-pointers in sync.
//!
//! The collection holds its members strongly; a member points back at its owner through a weak
//! slot. Every change goes through [`OwnedCollection::attach`] or [`OwnedCollection::remove`],
//! which update both sides together, so `member ∈ owner.members` holds exactly when
//! `member.owner == owner`.

use std::{
    fmt,
    sync::{Arc, Weak},
};

use crate::{metadata::members::Deferred, Result};

/// An entity that lives in the member collection of an `O`
pub trait Owned<O>: Sized {
    /// The back-pointer to the owning entity
    fn owner_slot(&self) -> &Deferred<Option<Weak<O>>>;

    /// Called before the entity joins `owner`, while nothing has changed yet. Releases edges
    /// that can't coexist with the new one.
    ///
    /// # Errors
    /// A failure aborts the attach.
    fn before_attach(&self, _owner: &Arc<O>) -> Result<()> {
        Ok(())
    }

    /// Called after the back-pointer changed, with the new owner if there is one.
    ///
    /// # Errors
    /// Implementations report failures to update dependent state.
    fn owner_changed(&self, _owner: Option<&Arc<O>>) -> Result<()> {
        Ok(())
    }

    /// The current owner, `None` if unowned or if the owner is gone.
    ///
    /// # Errors
    /// Returns an error if resolving the back-pointer from the tables fails.
    fn owner(&self) -> Result<Option<Arc<O>>> {
        Ok(self.owner_slot().get()?.and_then(|owner| owner.upgrade()))
    }

    /// Moves this entity into the members of `owner`, leaving its previous owner.
    ///
    /// # Errors
    /// See [`OwnedCollection::attach`].
    fn set_owner(self: &Arc<Self>, owner: &Arc<O>) -> Result<()>
    where
        O: Owner<Self>,
    {
        owner.members().attach(self)
    }

    /// Removes this entity from its owner. Returns false if it had none.
    ///
    /// # Errors
    /// See [`OwnedCollection::remove`].
    fn detach(self: &Arc<Self>) -> Result<bool>
    where
        O: Owner<Self>,
    {
        match self.owner()? {
            Some(owner) => owner.members().remove(self),
            None => Ok(false),
        }
    }
}

/// An entity holding a collection of `M`
pub trait Owner<M>: Sized {
    /// The collection of `M` members
    fn members(&self) -> &OwnedCollection<Self, M>;
}

/// The member list of an owner entity, see the [module documentation](self).
pub struct OwnedCollection<O, M> {
    owner: Weak<O>,
    items: Deferred<Vec<Arc<M>>>,
}

impl<O, M> OwnedCollection<O, M>
where
    O: Owner<M>,
    M: Owned<O>,
{
    /// An empty collection belonging to `owner`
    pub fn new(owner: Weak<O>) -> Self {
        OwnedCollection {
            owner,
            items: Deferred::new(Vec::new()),
        }
    }

    /// A collection whose initial members are produced by `thunk` on first access.
    ///
    /// The thunk must agree with the back-pointer thunks of the members it returns.
    pub fn lazy<F>(owner: Weak<O>, thunk: F) -> Self
    where
        F: Fn() -> Result<Vec<Arc<M>>> + Send + Sync + 'static,
    {
        OwnedCollection {
            owner,
            items: Deferred::lazy(thunk),
        }
    }

    /// The members in order.
    ///
    /// # Errors
    /// Returns an error if the initial members can't be resolved.
    pub fn items(&self) -> Result<Vec<Arc<M>>> {
        self.items.get()
    }

    /// Number of members.
    ///
    /// # Errors
    /// Returns an error if the initial members can't be resolved.
    pub fn len(&self) -> Result<usize> {
        self.items.update(|items| items.len())
    }

    /// True if there are no members.
    ///
    /// # Errors
    /// Returns an error if the initial members can't be resolved.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// True if `member` is in this collection, compared by identity.
    ///
    /// # Errors
    /// Returns an error if the initial members can't be resolved.
    pub fn contains(&self, member: &Arc<M>) -> Result<bool> {
        self.items
            .update(|items| items.iter().any(|item| Arc::ptr_eq(item, member)))
    }

    /// Makes `member` a member of this collection.
    ///
    /// The member leaves the collection of its previous owner, its back-pointer is set to this
    /// collection's owner, and it is appended at the end. Attaching a member to the owner it
    /// already has changes nothing.
    ///
    /// Both member lists and the back-pointer are resolved before the first change, so an
    /// attach that fails on one of them leaves the member where it was.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvariantViolation`] if the owner of this collection is gone, or
    /// an error if one of the involved member lists can't be resolved.
    pub fn attach(&self, member: &Arc<M>) -> Result<()> {
        let owner = self
            .owner
            .upgrade()
            .ok_or_else(|| invariant_error!("Attaching to a collection whose owner is gone"))?;

        self.len()?;
        let current = member.owner()?;
        if let Some(current) = &current {
            if Arc::ptr_eq(current, &owner) {
                self.push_unique(member)?;
                return Ok(());
            }
            current.members().len()?;
        }

        member.before_attach(&owner)?;
        if let Some(current) = current {
            current.members().take(member)?;
        }

        member.owner_slot().set(Some(Arc::downgrade(&owner)));
        self.push_unique(member)?;
        member.owner_changed(Some(&owner))
    }

    /// Removes `member` and clears its back-pointer. Returns false if it was not a member.
    ///
    /// # Errors
    /// Returns an error if the member list can't be resolved.
    pub fn remove(&self, member: &Arc<M>) -> Result<bool> {
        if !self.take(member)? {
            return Ok(false);
        }

        member.owner_slot().set(None);
        member.owner_changed(None)?;
        Ok(true)
    }

    fn push_unique(&self, member: &Arc<M>) -> Result<()> {
        self.items.update(|items| {
            if !items.iter().any(|item| Arc::ptr_eq(item, member)) {
                items.push(member.clone());
            }
        })
    }

    fn take(&self, member: &Arc<M>) -> Result<bool> {
        self.items.update(|items| {
            let before = items.len();
            items.retain(|item| !Arc::ptr_eq(item, member));
            items.len() != before
        })
    }
}

impl<O, M> fmt::Debug for OwnedCollection<O, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("OwnedCollection");
        match self.items.peek() {
            Some(items) => debug.field("len", &items.len()),
            None => debug.field("len", &"<unevaluated>"),
        };
        debug.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Folder {
        files: OwnedCollection<Folder, Document>,
    }

    impl Folder {
        fn new() -> Arc<Folder> {
            Arc::new_cyclic(|this| Folder {
                files: OwnedCollection::new(this.clone()),
            })
        }
    }

    impl Owner<Document> for Folder {
        fn members(&self) -> &OwnedCollection<Folder, Document> {
            &self.files
        }
    }

    struct Document {
        folder: Deferred<Option<Weak<Folder>>>,
    }

    impl Owned<Folder> for Document {
        fn owner_slot(&self) -> &Deferred<Option<Weak<Folder>>> {
            &self.folder
        }
    }

    fn document() -> Arc<Document> {
        Arc::new(Document {
            folder: Deferred::new(None),
        })
    }

    fn is_owned_by(document: &Arc<Document>, folder: &Arc<Folder>) -> bool {
        document
            .owner()
            .unwrap()
            .is_some_and(|owner| Arc::ptr_eq(&owner, folder))
    }

    #[test]
    fn reassign_moves_member() {
        let a = Folder::new();
        let b = Folder::new();
        let doc = document();

        doc.set_owner(&a).unwrap();
        assert!(a.files.contains(&doc).unwrap());
        assert!(is_owned_by(&doc, &a));

        doc.set_owner(&b).unwrap();
        assert!(!a.files.contains(&doc).unwrap());
        assert!(b.files.contains(&doc).unwrap());
        assert!(is_owned_by(&doc, &b));
    }

    #[test]
    fn same_owner_is_idempotent() {
        let a = Folder::new();
        let doc = document();

        doc.set_owner(&a).unwrap();
        doc.set_owner(&a).unwrap();
        a.files.attach(&doc).unwrap();
        assert_eq!(a.files.len().unwrap(), 1);
        assert!(is_owned_by(&doc, &a));
    }

    #[test]
    fn remove_clears_back_pointer() {
        let a = Folder::new();
        let doc = document();
        let other = document();

        a.files.attach(&doc).unwrap();
        assert!(!a.files.remove(&other).unwrap());
        assert!(doc.detach().unwrap());
        assert!(a.files.is_empty().unwrap());
        assert!(doc.owner().unwrap().is_none());
        assert!(!doc.detach().unwrap());
    }

    #[test]
    fn failed_attach_keeps_previous_owner() {
        let a = Folder::new();
        let broken = Arc::new_cyclic(|this| Folder {
            files: OwnedCollection::lazy(this.clone(), || Err(crate::Error::ImageDropped)),
        });
        let doc = document();
        doc.set_owner(&a).unwrap();

        assert!(matches!(
            broken.files.attach(&doc),
            Err(crate::Error::ImageDropped)
        ));
        assert!(is_owned_by(&doc, &a));
        assert!(a.files.contains(&doc).unwrap());
    }

    #[test]
    fn keeps_attach_order() {
        let a = Folder::new();
        let docs: Vec<_> = (0..3).map(|_| document()).collect();
        for doc in docs.iter().rev() {
            a.files.attach(doc).unwrap();
        }

        let items = a.files.items().unwrap();
        assert!(Arc::ptr_eq(&items[0], &docs[2]));
        assert!(Arc::ptr_eq(&items[2], &docs[0]));
    }
}
