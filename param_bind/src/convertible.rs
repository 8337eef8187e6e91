//! Stepwise reduction of rich values to bindable primitives
//!
//! Entities reduce to their primary key, stored enums to their identifier,
//! column-encoded values to the raw column value. A resolution step may yield
//! another convertible, so reduction loops until a primitive is reached.

use crate::value::SqlValue;
use std::sync::Arc;

/// A value that resolves toward a primitive SQL-bindable form.
pub trait Convertible: Send + Sync + std::fmt::Debug {
    /// Resolve one step. The result may itself be convertible.
    fn resolve(&self) -> Resolved;
}

/// Outcome of one resolution step.
#[derive(Debug, Clone)]
pub enum Resolved {
    /// A primitive value (possibly a typed NULL)
    Value(SqlValue),
    /// Another convertible; reduction continues
    Next(Arc<dyn Convertible>),
}

/// Fully reduce a convertible to a primitive value.
pub(crate) fn reduce(convertible: &Arc<dyn Convertible>) -> SqlValue {
    let mut current = Arc::clone(convertible);
    loop {
        match current.resolve() {
            Resolved::Value(value) => return value,
            Resolved::Next(next) => current = next,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::SqlType;

    #[derive(Debug)]
    struct StoredEnum(&'static str);

    impl Convertible for StoredEnum {
        fn resolve(&self) -> Resolved {
            Resolved::Value(SqlValue::Text(self.0.to_string()))
        }
    }

    #[derive(Debug)]
    struct Wrapping(Arc<dyn Convertible>);

    impl Convertible for Wrapping {
        fn resolve(&self) -> Resolved {
            Resolved::Next(Arc::clone(&self.0))
        }
    }

    #[test]
    fn test_single_step_resolution() {
        let c: Arc<dyn Convertible> = Arc::new(StoredEnum("ACTIVE"));
        assert_eq!(reduce(&c), SqlValue::Text("ACTIVE".to_string()));
    }

    #[test]
    fn test_chained_resolution() {
        let inner: Arc<dyn Convertible> = Arc::new(StoredEnum("NESTED"));
        let c: Arc<dyn Convertible> = Arc::new(Wrapping(Arc::new(Wrapping(inner))));
        assert_eq!(reduce(&c), SqlValue::Text("NESTED".to_string()));
    }

    #[derive(Debug)]
    struct Detached;

    impl Convertible for Detached {
        fn resolve(&self) -> Resolved {
            Resolved::Value(SqlValue::Null(SqlType::BigInt))
        }
    }

    #[test]
    fn test_resolution_to_typed_null() {
        let c: Arc<dyn Convertible> = Arc::new(Detached);
        assert_eq!(reduce(&c), SqlValue::Null(SqlType::BigInt));
    }
}
