#![forbid(unsafe_code)]

//! Core in-memory data model for the datagrid engine.
//!
//! This crate holds the plain data types shared between the engine and its
//! hosts: cell values and column schemas, row identity, filter-criterion and
//! sort descriptors, and validation result types. Everything here is
//! serde-serializable; the engine crate (`datagrid-engine`) owns all behavior.

pub mod filter;
pub mod row;
pub mod sort;
pub mod validate;
pub mod value;

pub use filter::{FilterCriterion, FilterOp};
pub use row::{Row, RowId};
pub use sort::{SortDescriptor, SortDirection, SortScope};
pub use validate::{RuleResult, Severity};
pub use value::{CellValue, ColumnSchema, ColumnType, GridSchema, SchemaError};
