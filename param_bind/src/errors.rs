use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum BindError {
    /// A NULL value was bound without an explicit SQL type code, so the type
    /// of NULL to send cannot be determined.
    #[error("null parameter bound without an SQL type code")]
    MissingNullType,

    /// The value's type has no registered adapter and is not convertible.
    #[error("no registered parameter adapter claims value of type {type_name}")]
    UnsupportedValue { type_name: &'static str },
}
