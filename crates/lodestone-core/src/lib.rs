//! # lodestone-core
//!
//! Schema-driven data mapping primitives for a MySQL-flavored relational
//! store. This crate is the foundation layer of the lodestone workspace:
//!
//! - **Value model** - [`Value`], [`Row`], and [`QueryOutput`] carry
//!   attribute data and query results across the workspace.
//! - **Client contract** - the [`Client`] trait is the only interface this
//!   workspace has to the underlying store. Drivers (`lodestone-mysql`) and
//!   test doubles (`lodestone-testkit`) implement it; nothing in this crate
//!   executes SQL itself.
//! - **Field declarations** - [`FieldDecl`] is the tagged declaration
//!   surface (raw SQL, structured spec, generator, higher-order generator)
//!   resolved into canonical [`ColumnSpec`]s.
//! - **Schema compiler** - [`Schema::compile`] turns ordered field
//!   declarations into an immutable schema with derived keys and foreign
//!   key clauses.
//! - **DDL generator** - pure functions producing `CREATE TABLE` and
//!   `ALTER TABLE` statement text from a schema or an [`Alteration`].

pub mod client;
pub mod ddl;
pub mod error;
pub mod field;
pub mod schema;
pub mod value;

pub use client::{Client, QueryOutput, StoreError};
pub use ddl::{alter, create_table, quote, Alteration, KeyRequest};
pub use error::{Result, SchemaError};
pub use field::{
    resolve, Field, FieldDecl, GeneratorFn, GetterFn, HigherOrderFn, Invalid, SetterFn,
    ValidatorFn,
};
pub use schema::{
    ColumnSpec, ForeignClause, ForeignSpec, KeyColumn, KeyKind, KeySpec, Schema, SqlType, Unique,
};
pub use value::{Attributes, Row, Value};
