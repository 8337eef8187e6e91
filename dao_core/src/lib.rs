//! DAO Core - Generic CRUD and relationship engines for RowHaus
//!
//! This crate provides the foundational types and traits of the access
//! layer: primary-key cells and descriptors, the table binding contract, the
//! positional row loader, the generic CRUD/query engine, cross-table
//! relationship loaders, cascade hooks, and pagination contracts.

pub mod binding;
pub mod cross;
pub mod dao;
pub mod entity;
pub mod errors;
pub mod hooks;
pub mod loaded;
pub mod page;
pub mod query;
pub mod row_reader;

pub use binding::{LoadContext, TableBinding};
pub use cross::{CrossDao, CrossDao3, Relation2, Relation3};
pub use dao::Dao;
pub use entity::{Entity, KeyRef, Primary, PrimaryKey, PrimaryKind};
pub use errors::DaoError;
pub use hooks::{Cascade, CascadeContext};
pub use loaded::LoadedSet;
pub use page::{CursorStore, KeysetCursor};
pub use query::Query;
pub use row_reader::RowReader;
