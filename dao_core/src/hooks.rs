//! Cascade hooks
//!
//! Extension points invoked around CRUD operations to propagate changes to
//! dependent objects: the before-hooks run while the parent row does not yet
//! exist (or still exists), the after-hooks run once the parent key is known.
//! Context flows through a typed map instead of an untyped object array.

use crate::entity::Entity;
use crate::errors::DaoError;
use async_trait::async_trait;
use std::any::{Any, TypeId};
use std::collections::HashMap;

/// Typed context threaded through cascade hooks, one slot per type.
#[derive(Default)]
pub struct CascadeContext {
    entries: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl CascadeContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value, replacing any existing value of the same type.
    pub fn put<T: Any + Send + Sync>(&mut self, value: T) {
        self.entries.insert(TypeId::of::<T>(), Box::new(value));
    }

    pub fn get<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.entries
            .get(&TypeId::of::<T>())
            .and_then(|entry| entry.downcast_ref::<T>())
    }

    pub fn get_mut<T: Any + Send + Sync>(&mut self) -> Option<&mut T> {
        self.entries
            .get_mut(&TypeId::of::<T>())
            .and_then(|entry| entry.downcast_mut::<T>())
    }

    pub fn remove<T: Any + Send + Sync>(&mut self) -> Option<T> {
        self.entries
            .remove(&TypeId::of::<T>())
            .and_then(|entry| entry.downcast::<T>().ok())
            .map(|boxed| *boxed)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for CascadeContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CascadeContext")
            .field("entries", &self.entries.len())
            .finish()
    }
}

/// Cascade extension points. Every method is a no-op by default; DAOs opt in
/// per operation.
#[async_trait]
pub trait Cascade<E: Entity>: Send + Sync {
    async fn before_insert(
        &self,
        _entity: &mut E,
        _ctx: &mut CascadeContext,
    ) -> Result<(), DaoError> {
        Ok(())
    }

    async fn after_insert(
        &self,
        _entity: &mut E,
        _ctx: &mut CascadeContext,
    ) -> Result<(), DaoError> {
        Ok(())
    }

    async fn before_update(
        &self,
        _entity: &mut E,
        _ctx: &mut CascadeContext,
    ) -> Result<(), DaoError> {
        Ok(())
    }

    async fn after_update(
        &self,
        _entity: &mut E,
        _ctx: &mut CascadeContext,
    ) -> Result<(), DaoError> {
        Ok(())
    }

    async fn before_delete(
        &self,
        _entity: &mut E,
        _ctx: &mut CascadeContext,
    ) -> Result<(), DaoError> {
        Ok(())
    }

    async fn after_delete(
        &self,
        _entity: &mut E,
        _ctx: &mut CascadeContext,
    ) -> Result<(), DaoError> {
        Ok(())
    }
}
