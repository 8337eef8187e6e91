//! Adapter registry for parameter values
//!
//! The registry holds an ordered list of adapters; each adapter claims or
//! declines a value by its runtime type. The registry is constructed
//! explicitly at startup and appended to afterwards, never mutated through
//! load-order side effects.

use crate::value::{SqlType, SqlValue};
use chrono::{DateTime, NaiveDateTime, Utc};
use std::any::Any;

/// A single type adapter. Claims a value by downcasting, declines with `None`.
pub trait ParamAdapter: Send + Sync {
    /// Adapter name for diagnostics
    fn name(&self) -> &'static str;

    /// Return the bindable form of the value if this adapter understands its
    /// runtime type.
    fn claim(&self, value: &(dyn Any + Send + Sync)) -> Option<SqlValue>;
}

/// Ordered adapter registry, consulted front to back.
pub struct ParamTypeRegistry {
    adapters: Vec<Box<dyn ParamAdapter>>,
}

impl ParamTypeRegistry {
    /// A registry with no adapters registered.
    pub fn empty() -> Self {
        Self {
            adapters: Vec::new(),
        }
    }

    /// A registry seeded with adapters for the standard primitive types,
    /// their `Option` forms included.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(BoolAdapter));
        registry.register(Box::new(TinyIntAdapter));
        registry.register(Box::new(SmallIntAdapter));
        registry.register(Box::new(IntAdapter));
        registry.register(Box::new(BigIntAdapter));
        registry.register(Box::new(RealAdapter));
        registry.register(Box::new(DoubleAdapter));
        registry.register(Box::new(TextAdapter));
        registry.register(Box::new(StrAdapter));
        registry.register(Box::new(BlobAdapter));
        registry.register(Box::new(DateTimeAdapter));
        registry.register(Box::new(TimestampTzAdapter));
        registry.register(Box::new(PassthroughAdapter));
        registry
    }

    /// Append an adapter. Registration order is consultation order.
    pub fn register(&mut self, adapter: Box<dyn ParamAdapter>) {
        tracing::debug!(adapter = adapter.name(), "registering parameter adapter");
        self.adapters.push(adapter);
    }

    /// Ask each adapter in order to claim the value.
    pub fn claim(&self, value: &(dyn Any + Send + Sync)) -> Option<SqlValue> {
        self.adapters.iter().find_map(|adapter| adapter.claim(value))
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

impl Default for ParamTypeRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl std::fmt::Debug for ParamTypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParamTypeRegistry")
            .field(
                "adapters",
                &self.adapters.iter().map(|a| a.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

macro_rules! primitive_adapter {
    ($adapter:ident, $ty:ty, $sql_ty:expr, $variant:path) => {
        struct $adapter;

        impl ParamAdapter for $adapter {
            fn name(&self) -> &'static str {
                stringify!($ty)
            }

            fn claim(&self, value: &(dyn Any + Send + Sync)) -> Option<SqlValue> {
                if let Some(v) = value.downcast_ref::<$ty>() {
                    return Some($variant(v.clone()));
                }
                if let Some(v) = value.downcast_ref::<Option<$ty>>() {
                    return Some(match v {
                        Some(v) => $variant(v.clone()),
                        None => SqlValue::Null($sql_ty),
                    });
                }
                None
            }
        }
    };
}

primitive_adapter!(BoolAdapter, bool, SqlType::Bool, SqlValue::Bool);
primitive_adapter!(SmallIntAdapter, i16, SqlType::SmallInt, SqlValue::SmallInt);
primitive_adapter!(IntAdapter, i32, SqlType::Int, SqlValue::Int);
primitive_adapter!(BigIntAdapter, i64, SqlType::BigInt, SqlValue::BigInt);
primitive_adapter!(RealAdapter, f32, SqlType::Real, SqlValue::Real);
primitive_adapter!(DoubleAdapter, f64, SqlType::Double, SqlValue::Double);
primitive_adapter!(TextAdapter, String, SqlType::Text, SqlValue::Text);
primitive_adapter!(BlobAdapter, Vec<u8>, SqlType::Blob, SqlValue::Blob);
primitive_adapter!(
    DateTimeAdapter,
    NaiveDateTime,
    SqlType::DateTime,
    SqlValue::DateTime
);
primitive_adapter!(
    TimestampTzAdapter,
    DateTime<Utc>,
    SqlType::TimestampTz,
    SqlValue::TimestampTz
);

/// i8 has no SQL counterpart of its own; it binds as SMALLINT.
struct TinyIntAdapter;

impl ParamAdapter for TinyIntAdapter {
    fn name(&self) -> &'static str {
        "i8"
    }

    fn claim(&self, value: &(dyn Any + Send + Sync)) -> Option<SqlValue> {
        if let Some(v) = value.downcast_ref::<i8>() {
            return Some(SqlValue::SmallInt(*v as i16));
        }
        if let Some(v) = value.downcast_ref::<Option<i8>>() {
            return Some(match v {
                Some(v) => SqlValue::SmallInt(*v as i16),
                None => SqlValue::Null(SqlType::SmallInt),
            });
        }
        None
    }
}

struct StrAdapter;

impl ParamAdapter for StrAdapter {
    fn name(&self) -> &'static str {
        "&str"
    }

    fn claim(&self, value: &(dyn Any + Send + Sync)) -> Option<SqlValue> {
        value
            .downcast_ref::<&'static str>()
            .map(|v| SqlValue::Text((*v).to_string()))
    }
}

/// An already-primitive `SqlValue` claims itself.
struct PassthroughAdapter;

impl ParamAdapter for PassthroughAdapter {
    fn name(&self) -> &'static str {
        "SqlValue"
    }

    fn claim(&self, value: &(dyn Any + Send + Sync)) -> Option<SqlValue> {
        value.downcast_ref::<SqlValue>().cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_claim_primitives() {
        let registry = ParamTypeRegistry::with_defaults();
        assert_eq!(registry.claim(&5i32), Some(SqlValue::Int(5)));
        assert_eq!(registry.claim(&5i64), Some(SqlValue::BigInt(5)));
        assert_eq!(registry.claim(&true), Some(SqlValue::Bool(true)));
        assert_eq!(
            registry.claim(&"hello".to_string()),
            Some(SqlValue::Text("hello".to_string()))
        );
        assert_eq!(registry.claim(&3i8), Some(SqlValue::SmallInt(3)));
    }

    #[test]
    fn test_option_claims() {
        let registry = ParamTypeRegistry::with_defaults();
        assert_eq!(registry.claim(&Some(5i32)), Some(SqlValue::Int(5)));
        assert_eq!(
            registry.claim(&Option::<i32>::None),
            Some(SqlValue::Null(SqlType::Int))
        );
    }

    #[test]
    fn test_unclaimed_type() {
        let registry = ParamTypeRegistry::with_defaults();
        struct Opaque;
        // not Send + Sync issue: unit struct is both
        assert_eq!(registry.claim(&Opaque), None);
    }

    #[test]
    fn test_registration_order_wins() {
        struct Shadow;
        impl ParamAdapter for Shadow {
            fn name(&self) -> &'static str {
                "shadow"
            }
            fn claim(&self, value: &(dyn Any + Send + Sync)) -> Option<SqlValue> {
                value.downcast_ref::<i32>().map(|_| SqlValue::Int(-1))
            }
        }

        let mut registry = ParamTypeRegistry::empty();
        registry.register(Box::new(Shadow));
        registry.register(Box::new(IntAdapter));
        assert_eq!(registry.claim(&42i32), Some(SqlValue::Int(-1)));
    }

    #[test]
    fn test_passthrough() {
        let registry = ParamTypeRegistry::with_defaults();
        let value = SqlValue::Null(SqlType::Text);
        assert_eq!(registry.claim(&value), Some(SqlValue::Null(SqlType::Text)));
    }
}
