//! Already-loaded object set
//!
//! A transient, caller-supplied set of materialized entities, consulted
//! before issuing a recursive foreign-key load within one top-level call.
//! Entries are matched by runtime type and primary-key equality.

use crate::entity::Entity;
use std::any::{Any, TypeId};
use std::sync::Arc;

#[derive(Default, Clone)]
pub struct LoadedSet {
    entries: Vec<(TypeId, Arc<dyn Any + Send + Sync>)>,
}

impl LoadedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<E: Entity>(&mut self, entity: E) {
        self.entries.push((TypeId::of::<E>(), Arc::new(entity)));
    }

    /// Builder-style insert.
    pub fn with<E: Entity>(mut self, entity: E) -> Self {
        self.insert(entity);
        self
    }

    /// Find an entry of type `E` whose primary key equals `key`.
    pub fn find<E: Entity>(&self, key: E::Key) -> Option<E> {
        self.entries
            .iter()
            .filter(|(type_id, _)| *type_id == TypeId::of::<E>())
            .filter_map(|(_, entry)| entry.downcast_ref::<E>())
            .find(|entity| entity.key() == Some(key))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for LoadedSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedSet")
            .field("entries", &self.entries.len())
            .finish()
    }
}
