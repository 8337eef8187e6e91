//! Parameter binding layer for the RowHaus ecosystem
//!
//! This crate provides the tagged value union bound into prepared statements,
//! the `Parameter`/`ParameterList` pair whose insertion order matches
//! placeholder order in generated SQL, the `Convertible` resolution chain for
//! values that reduce to a bindable primitive in steps (foreign keys, stored
//! enum identifiers, column-encoded values), and the explicitly constructed
//! adapter registry consulted in registration order.

pub mod convertible;
pub mod errors;
pub mod parameter;
pub mod registry;
pub mod value;

pub use convertible::{Convertible, Resolved};
pub use errors::BindError;
pub use parameter::{column_at_placeholder, ParamValue, Parameter, ParameterList};
pub use registry::{ParamAdapter, ParamTypeRegistry};
pub use value::{SqlType, SqlValue};
