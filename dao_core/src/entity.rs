//! Entities and primary keys
//!
//! A primary key lives in a [`Primary`] cell that enforces the key lifecycle:
//! absent until persisted, immutable once set, clearable on delete. The key
//! type itself is one of six numeric kinds, declared through an explicit
//! [`PrimaryKind`] descriptor rather than discovered at runtime.

use crate::errors::DaoError;
use conn_pool::SqlRow;
use param_bind::{Convertible, Resolved, SqlType, SqlValue};

/// Descriptor of a primary-key runtime type. Drives row decoding,
/// generated-key conversion, and cursor serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimaryKind {
    TinyInt,
    SmallInt,
    Int,
    BigInt,
    Real,
    Double,
}

impl PrimaryKind {
    /// The SQL type a key of this kind binds as.
    pub fn sql_type(&self) -> SqlType {
        match self {
            // i8 has no SQL counterpart of its own
            PrimaryKind::TinyInt | PrimaryKind::SmallInt => SqlType::SmallInt,
            PrimaryKind::Int => SqlType::Int,
            PrimaryKind::BigInt => SqlType::BigInt,
            PrimaryKind::Real => SqlType::Real,
            PrimaryKind::Double => SqlType::Double,
        }
    }
}

/// A numeric primary-key type with an explicit kind descriptor.
pub trait PrimaryKey:
    Copy + PartialEq + PartialOrd + Send + Sync + std::fmt::Debug + 'static
{
    const KIND: PrimaryKind;

    fn to_value(self) -> SqlValue;

    /// Convert a statement's last-insert id to this key type.
    fn from_generated(id: i64) -> Self;

    /// Null-aware positional read of a key column.
    fn read(row: &SqlRow, index: usize) -> Result<Option<Self>, sqlx::Error>;

    fn to_json(self) -> serde_json::Value;

    fn from_json(value: &serde_json::Value) -> Option<Self>;
}

impl PrimaryKey for i8 {
    const KIND: PrimaryKind = PrimaryKind::TinyInt;

    fn to_value(self) -> SqlValue {
        SqlValue::SmallInt(self as i16)
    }

    fn from_generated(id: i64) -> Self {
        id as i8
    }

    fn read(row: &SqlRow, index: usize) -> Result<Option<Self>, sqlx::Error> {
        Ok(row.read::<i16>(index)?.map(|v| v as i8))
    }

    fn to_json(self) -> serde_json::Value {
        serde_json::Value::from(self)
    }

    fn from_json(value: &serde_json::Value) -> Option<Self> {
        value.as_i64().map(|v| v as i8)
    }
}

impl PrimaryKey for i16 {
    const KIND: PrimaryKind = PrimaryKind::SmallInt;

    fn to_value(self) -> SqlValue {
        SqlValue::SmallInt(self)
    }

    fn from_generated(id: i64) -> Self {
        id as i16
    }

    fn read(row: &SqlRow, index: usize) -> Result<Option<Self>, sqlx::Error> {
        row.read::<i16>(index)
    }

    fn to_json(self) -> serde_json::Value {
        serde_json::Value::from(self)
    }

    fn from_json(value: &serde_json::Value) -> Option<Self> {
        value.as_i64().map(|v| v as i16)
    }
}

impl PrimaryKey for i32 {
    const KIND: PrimaryKind = PrimaryKind::Int;

    fn to_value(self) -> SqlValue {
        SqlValue::Int(self)
    }

    fn from_generated(id: i64) -> Self {
        id as i32
    }

    fn read(row: &SqlRow, index: usize) -> Result<Option<Self>, sqlx::Error> {
        row.read::<i32>(index)
    }

    fn to_json(self) -> serde_json::Value {
        serde_json::Value::from(self)
    }

    fn from_json(value: &serde_json::Value) -> Option<Self> {
        value.as_i64().map(|v| v as i32)
    }
}

impl PrimaryKey for i64 {
    const KIND: PrimaryKind = PrimaryKind::BigInt;

    fn to_value(self) -> SqlValue {
        SqlValue::BigInt(self)
    }

    fn from_generated(id: i64) -> Self {
        id
    }

    fn read(row: &SqlRow, index: usize) -> Result<Option<Self>, sqlx::Error> {
        row.read::<i64>(index)
    }

    fn to_json(self) -> serde_json::Value {
        serde_json::Value::from(self)
    }

    fn from_json(value: &serde_json::Value) -> Option<Self> {
        value.as_i64()
    }
}

impl PrimaryKey for f32 {
    const KIND: PrimaryKind = PrimaryKind::Real;

    fn to_value(self) -> SqlValue {
        SqlValue::Real(self)
    }

    fn from_generated(id: i64) -> Self {
        id as f32
    }

    fn read(row: &SqlRow, index: usize) -> Result<Option<Self>, sqlx::Error> {
        row.read::<f32>(index)
    }

    fn to_json(self) -> serde_json::Value {
        serde_json::Value::from(self as f64)
    }

    fn from_json(value: &serde_json::Value) -> Option<Self> {
        value.as_f64().map(|v| v as f32)
    }
}

impl PrimaryKey for f64 {
    const KIND: PrimaryKind = PrimaryKind::Double;

    fn to_value(self) -> SqlValue {
        SqlValue::Double(self)
    }

    fn from_generated(id: i64) -> Self {
        id as f64
    }

    fn read(row: &SqlRow, index: usize) -> Result<Option<Self>, sqlx::Error> {
        row.read::<f64>(index)
    }

    fn to_json(self) -> serde_json::Value {
        serde_json::Value::from(self)
    }

    fn from_json(value: &serde_json::Value) -> Option<Self> {
        value.as_f64()
    }
}

/// Primary-key cell: absent until persisted, immutable once set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Primary<K: PrimaryKey> {
    key: Option<K>,
}

impl<K: PrimaryKey> Primary<K> {
    /// An unset key, for entities not yet persisted.
    pub fn absent() -> Self {
        Self { key: None }
    }

    /// A cell holding an existing key, for rows read back from the database.
    pub fn from_key(key: K) -> Self {
        Self { key: Some(key) }
    }

    pub fn get(&self) -> Option<K> {
        self.key
    }

    pub fn is_set(&self) -> bool {
        self.key.is_some()
    }

    /// Set the key. Re-assigning a different value over a set key is an
    /// illegal-state error; an equal assignment is a no-op.
    pub fn assign(&mut self, key: K) -> Result<(), DaoError> {
        match self.key {
            Some(existing) if existing != key => Err(DaoError::IllegalState(format!(
                "primary key already set to {:?}, refusing to assign {:?}",
                existing, key
            ))),
            _ => {
                self.key = Some(key);
                Ok(())
            }
        }
    }

    /// Clear the key, marking the entity detached. Used by delete.
    pub fn clear(&mut self) {
        self.key = None;
    }
}

impl<K: PrimaryKey> Default for Primary<K> {
    fn default() -> Self {
        Self::absent()
    }
}

/// A domain object mapped to a table row, identified by a primary key.
pub trait Entity: Clone + Send + Sync + std::fmt::Debug + 'static {
    type Key: PrimaryKey;

    fn primary(&self) -> &Primary<Self::Key>;

    fn primary_mut(&mut self) -> &mut Primary<Self::Key>;

    fn key(&self) -> Option<Self::Key> {
        self.primary().get()
    }
}

/// Convertible form of an entity reference: resolves to the entity's primary
/// key, or to a typed NULL for a detached reference.
#[derive(Debug, Clone)]
pub struct KeyRef<K: PrimaryKey> {
    key: Option<K>,
}

impl<K: PrimaryKey> KeyRef<K> {
    pub fn of<E: Entity<Key = K>>(entity: &E) -> Self {
        Self { key: entity.key() }
    }

    pub fn absent() -> Self {
        Self { key: None }
    }

    pub fn from_key(key: K) -> Self {
        Self { key: Some(key) }
    }
}

impl<K: PrimaryKey> Convertible for KeyRef<K> {
    fn resolve(&self) -> Resolved {
        Resolved::Value(match self.key {
            Some(key) => key.to_value(),
            None => SqlValue::Null(K::KIND.sql_type()),
        })
    }
}
