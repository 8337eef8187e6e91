//! Pagination and batch contracts
//!
//! Offset pages for simple iteration, primary-key keyset pages for resumable
//! iteration, and the cursor store contract batch consumers use to persist
//! the last primary key seen between executions.

use crate::binding::TableBinding;
use crate::dao::Dao;
use crate::entity::{Entity, PrimaryKey};
use crate::errors::DaoError;
use crate::query::Query;
use param_bind::{Parameter, SqlValue};
use std::collections::HashMap;

/// Key-value store for resumable iteration state, typically backed by a batch
/// framework's execution context.
pub trait CursorStore {
    fn put(&mut self, slot: &str, value: serde_json::Value);
    fn get(&self, slot: &str) -> Option<serde_json::Value>;
}

impl CursorStore for HashMap<String, serde_json::Value> {
    fn put(&mut self, slot: &str, value: serde_json::Value) {
        self.insert(slot.to_string(), value);
    }

    fn get(&self, slot: &str) -> Option<serde_json::Value> {
        HashMap::get(self, slot).cloned()
    }
}

/// Tracks the last primary key seen, serialized to a [`CursorStore`] by the
/// key's kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeysetCursor<K: PrimaryKey> {
    last: Option<K>,
}

impl<K: PrimaryKey> KeysetCursor<K> {
    /// A cursor positioned before the first row.
    pub fn start() -> Self {
        Self { last: None }
    }

    pub fn after(key: K) -> Self {
        Self { last: Some(key) }
    }

    pub fn last(&self) -> Option<K> {
        self.last
    }

    pub fn advance(&mut self, key: K) {
        self.last = Some(key);
    }

    /// Advance past a loaded page; a no-op for an empty page.
    pub fn advance_past<E: Entity<Key = K>>(&mut self, page: &[E]) {
        if let Some(key) = page.last().and_then(|entity| entity.key()) {
            self.last = Some(key);
        }
    }

    pub fn save(&self, store: &mut dyn CursorStore, slot: &str) {
        let value = self
            .last
            .map(PrimaryKey::to_json)
            .unwrap_or(serde_json::Value::Null);
        store.put(slot, value);
    }

    pub fn restore(store: &dyn CursorStore, slot: &str) -> Result<Self, DaoError> {
        match store.get(slot) {
            None | Some(serde_json::Value::Null) => Ok(Self::start()),
            Some(value) => K::from_json(&value).map(Self::after).ok_or_else(|| {
                DaoError::UnsupportedPrimaryType {
                    type_name: std::any::type_name::<K>(),
                    value: value.to_string(),
                }
            }),
        }
    }
}

impl<K: PrimaryKey> Default for KeysetCursor<K> {
    fn default() -> Self {
        Self::start()
    }
}

/// AND a keyset predicate onto the query and append its parameter, keeping
/// placeholder and parameter order in sync.
fn with_keyset(mut query: Query, table: &str, primary_column: &str, last: Option<SqlValue>) -> Query {
    if let Some(last) = last {
        let keyset = format!("{}.{}>?", table, primary_column);
        query.where_clause = Some(match query.where_clause.take() {
            Some(existing) => format!("{} AND {}", existing, keyset),
            None => keyset,
        });
        query.params.push(Parameter::value(last));
    }
    query
}

impl<E: TableBinding> Dao<E> {
    fn primary_order() -> String {
        format!("{}.{} ASC", E::table(), E::primary_column())
    }

    /// Offset pagination, ordered by primary key unless the query orders
    /// otherwise. Page numbers start at zero.
    pub async fn load_page(
        &self,
        page_number: u32,
        page_size: u32,
        query: Query,
    ) -> Result<Vec<E>, DaoError> {
        let mut query = query;
        query.limit = Some(page_size);
        query.offset = Some(page_number.saturating_mul(page_size));
        if query.order.is_none() {
            query.order = Some(Self::primary_order());
        }
        self.load_all_where(query).await
    }

    /// Keyset pagination: rows strictly after `last`, ordered by primary
    /// key. Resumable through a [`KeysetCursor`].
    pub async fn load_page_from_primary(
        &self,
        last: Option<E::Key>,
        page_size: u32,
        query: Query,
    ) -> Result<Vec<E>, DaoError> {
        let mut query = with_keyset(
            query,
            E::table(),
            E::primary_column(),
            last.map(PrimaryKey::to_value),
        );
        query.limit = Some(page_size);
        query.order = Some(Self::primary_order());
        self.load_all_where(query).await
    }

    /// Save every item, dispatching to insert or update per key presence.
    pub async fn write(&self, items: &mut [E]) -> Result<(), DaoError> {
        for item in items.iter_mut() {
            self.save(item).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_store_roundtrip() {
        let mut store: HashMap<String, serde_json::Value> = HashMap::new();
        let mut cursor = KeysetCursor::<i64>::start();
        cursor.advance(41);
        cursor.save(&mut store, "reader.last_primary");

        let restored = KeysetCursor::<i64>::restore(&store, "reader.last_primary").unwrap();
        assert_eq!(restored.last(), Some(41));
    }

    #[test]
    fn test_cursor_restore_missing_slot() {
        let store: HashMap<String, serde_json::Value> = HashMap::new();
        let restored = KeysetCursor::<i32>::restore(&store, "absent").unwrap();
        assert_eq!(restored.last(), None);
    }

    #[test]
    fn test_cursor_restore_null_slot() {
        let mut store: HashMap<String, serde_json::Value> = HashMap::new();
        KeysetCursor::<f64>::start().save(&mut store, "slot");
        let restored = KeysetCursor::<f64>::restore(&store, "slot").unwrap();
        assert_eq!(restored.last(), None);
    }

    #[test]
    fn test_cursor_restore_type_mismatch() {
        let mut store: HashMap<String, serde_json::Value> = HashMap::new();
        store.put("slot", serde_json::Value::String("not a key".to_string()));
        let err = KeysetCursor::<i64>::restore(&store, "slot").unwrap_err();
        assert!(matches!(err, DaoError::UnsupportedPrimaryType { .. }));
    }

    #[test]
    fn test_with_keyset_appends_predicate_and_param() {
        let query = Query::new()
            .filter("name=?")
            .param(Parameter::of("alice"));
        let query = with_keyset(query, "users", "id", Some(SqlValue::BigInt(10)));
        assert_eq!(query.where_clause.as_deref(), Some("name=? AND users.id>?"));
        assert_eq!(query.params.len(), 2);
    }

    #[test]
    fn test_with_keyset_without_last_is_identity() {
        let query = with_keyset(Query::new(), "users", "id", None);
        assert_eq!(query.where_clause, None);
        assert!(query.params.is_empty());
    }
}
