//! Statement parameters
//!
//! A `Parameter` wraps a value and an optional SQL type code for NULL
//! binding. A `ParameterList` is an ordered sequence whose insertion order
//! matches placeholder order in the generated SQL.

use crate::convertible::{self, Convertible};
use crate::errors::BindError;
use crate::registry::ParamTypeRegistry;
use crate::value::{SqlType, SqlValue};
use std::any::Any;
use std::sync::Arc;

/// The value side of a parameter before reduction.
#[derive(Clone)]
pub enum ParamValue {
    /// NULL; bindable only when a type code is attached to the parameter
    Null,
    /// Already a primitive bindable value
    Primitive(SqlValue),
    /// Dynamically typed; resolved through the adapter registry
    Dynamic {
        value: Arc<dyn Any + Send + Sync>,
        type_name: &'static str,
    },
    /// Reduced in a loop until a primitive or NULL is reached
    Convertible(Arc<dyn Convertible>),
}

impl std::fmt::Debug for ParamValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParamValue::Null => write!(f, "Null"),
            ParamValue::Primitive(v) => write!(f, "Primitive({:?})", v),
            ParamValue::Dynamic { type_name, .. } => write!(f, "Dynamic({})", type_name),
            ParamValue::Convertible(c) => write!(f, "Convertible({:?})", c),
        }
    }
}

/// One statement parameter: a value plus an optional SQL type code used when
/// the value reduces to NULL.
#[derive(Debug, Clone)]
pub struct Parameter {
    value: ParamValue,
    null_type: Option<SqlType>,
}

impl Parameter {
    /// A dynamically typed parameter, resolved through the adapter registry
    /// at bind time.
    pub fn of<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            value: ParamValue::Dynamic {
                value: Arc::new(value),
                type_name: std::any::type_name::<T>(),
            },
            null_type: None,
        }
    }

    /// A dynamically typed parameter with an explicit SQL type code for the
    /// NULL case.
    pub fn typed<T: Any + Send + Sync>(value: T, null_type: SqlType) -> Self {
        Self {
            value: ParamValue::Dynamic {
                value: Arc::new(value),
                type_name: std::any::type_name::<T>(),
            },
            null_type: Some(null_type),
        }
    }

    /// An already-primitive parameter.
    pub fn value(value: impl Into<SqlValue>) -> Self {
        Self {
            value: ParamValue::Primitive(value.into()),
            null_type: None,
        }
    }

    /// A typed NULL.
    pub fn null(null_type: SqlType) -> Self {
        Self {
            value: ParamValue::Null,
            null_type: Some(null_type),
        }
    }

    /// A NULL without a type code. Reducing this parameter fails with
    /// [`BindError::MissingNullType`]; it exists so callers that cannot name
    /// the column type fail loudly instead of sending an arbitrary NULL.
    pub fn null_untyped() -> Self {
        Self {
            value: ParamValue::Null,
            null_type: None,
        }
    }

    /// A convertible parameter, reduced stepwise at bind time.
    pub fn convertible(value: impl Convertible + 'static) -> Self {
        Self {
            value: ParamValue::Convertible(Arc::new(value)),
            null_type: None,
        }
    }

    /// A convertible parameter with an explicit SQL type code for the NULL
    /// case, for nullable foreign-key columns.
    pub fn convertible_typed(value: impl Convertible + 'static, null_type: SqlType) -> Self {
        Self {
            value: ParamValue::Convertible(Arc::new(value)),
            null_type: Some(null_type),
        }
    }

    pub fn null_type(&self) -> Option<SqlType> {
        self.null_type
    }

    /// Reduce this parameter to a primitive bindable value.
    ///
    /// Convertibles are resolved in a loop first; dynamic values are then
    /// offered to the registry's adapters in registration order. A NULL
    /// result takes the parameter's explicit type code when one was supplied.
    pub fn reduce(&self, registry: &ParamTypeRegistry) -> Result<SqlValue, BindError> {
        let reduced = match &self.value {
            ParamValue::Null => match self.null_type {
                Some(ty) => SqlValue::Null(ty),
                None => return Err(BindError::MissingNullType),
            },
            ParamValue::Primitive(v) => v.clone(),
            ParamValue::Convertible(c) => convertible::reduce(c),
            ParamValue::Dynamic { value, type_name } => registry
                .claim(value.as_ref())
                .ok_or(BindError::UnsupportedValue { type_name })?,
        };

        // An explicit type code overrides the type a reduction chose for NULL
        match (reduced, self.null_type) {
            (SqlValue::Null(_), Some(ty)) => Ok(SqlValue::Null(ty)),
            (value, _) => Ok(value),
        }
    }
}

/// Ordered parameter sequence. Order is significant: it matches placeholder
/// order in the generated SQL.
#[derive(Debug, Clone, Default)]
pub struct ParameterList {
    params: Vec<Parameter>,
}

impl ParameterList {
    pub fn new() -> Self {
        Self { params: Vec::new() }
    }

    /// Builder-style append.
    pub fn with(mut self, param: Parameter) -> Self {
        self.params.push(param);
        self
    }

    pub fn push(&mut self, param: Parameter) {
        self.params.push(param);
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Parameter> {
        self.params.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Parameter> {
        self.params.iter()
    }

    /// Reduce every parameter in order.
    ///
    /// The position of the first failing parameter is reported alongside the
    /// error so callers can name the offending placeholder.
    pub fn reduce_all(
        &self,
        registry: &ParamTypeRegistry,
    ) -> Result<Vec<SqlValue>, (usize, BindError)> {
        self.params
            .iter()
            .enumerate()
            .map(|(i, p)| p.reduce(registry).map_err(|e| (i, e)))
            .collect()
    }
}

impl From<Vec<Parameter>> for ParameterList {
    fn from(params: Vec<Parameter>) -> Self {
        Self { params }
    }
}

impl FromIterator<Parameter> for ParameterList {
    fn from_iter<I: IntoIterator<Item = Parameter>>(iter: I) -> Self {
        Self {
            params: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for ParameterList {
    type Item = Parameter;
    type IntoIter = std::vec::IntoIter<Parameter>;

    fn into_iter(self) -> Self::IntoIter {
        self.params.into_iter()
    }
}

/// Best-effort: the column name preceding the `index`-th placeholder (`?` or
/// `$n`) in `sql`. Returns `None` when the text does not parse; callers
/// render that as "unknown".
pub fn column_at_placeholder(sql: &str, index: usize) -> Option<String> {
    let bytes = sql.as_bytes();
    let mut seen = 0usize;
    let mut i = 0usize;
    while i < bytes.len() {
        let c = bytes[i] as char;
        let is_placeholder = c == '?'
            || (c == '$'
                && bytes
                    .get(i + 1)
                    .is_some_and(|b| (*b as char).is_ascii_digit()));
        if is_placeholder {
            if seen == index {
                return identifier_before(&sql[..i]);
            }
            seen += 1;
            if c == '$' {
                while i + 1 < bytes.len() && (bytes[i + 1] as char).is_ascii_digit() {
                    i += 1;
                }
            }
        }
        i += 1;
    }
    None
}

fn identifier_before(head: &str) -> Option<String> {
    let trimmed = head
        .trim_end()
        .trim_end_matches(['=', '<', '>', '!'])
        .trim_end();
    let mut start = trimmed.len();
    for (pos, c) in trimmed.char_indices().rev() {
        if c.is_ascii_alphanumeric() || c == '_' || c == '.' {
            start = pos;
        } else {
            break;
        }
    }
    let ident = &trimmed[start..];
    if ident.is_empty() {
        None
    } else {
        Some(ident.to_string())
    }
}
