//! # pico-sql
//!
//! SQL front-end, table store, and query executor for picodb.
//!
//! This crate implements:
//! - Field types, schemas, and positional text records
//! - The SQL parser adapter producing [`ParsedQuery`] objects
//! - Per-table storage with reader/writer locking
//! - Query execution (select, insert, update, delete, create-index)
//! - The table registry mapping names to live tables
//!
//! # Example
//!
//! ```
//! use pico_sql::{parse, TableRegistry};
//!
//! let registry = TableRegistry::new();
//!
//! let create = parse("CREATE TABLE users (id INT, name TEXT)").unwrap();
//! registry.create_table(&create).unwrap();
//!
//! let insert = parse("INSERT INTO users (id, name) VALUES (1, 'alice')").unwrap();
//! let users = registry.get("users").unwrap();
//! users.insert(&insert).unwrap();
//!
//! let select = parse("SELECT * FROM users").unwrap();
//! let rows = users.select(&select).unwrap();
//! assert_eq!(rows.len(), 1);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Error types shared across the crate.
pub mod error;

/// Query execution over a single table.
pub mod executor;

/// SQL tokenizer/parser adapter producing `ParsedQuery`.
pub mod parser;

/// Table registry: name -> live table mapping.
pub mod registry;

/// Per-table storage: schema, rows, and their lock.
pub mod table;

/// Field types, schemas, and records.
pub mod types;

pub use error::{SqlError, SqlResult};
pub use parser::{
    parse, ColumnSpec, CommandKind, CompareOp, Condition, Operand, ParseError, ParsedQuery,
    WILDCARD,
};
pub use registry::TableRegistry;
pub use table::Table;
pub use types::{FieldType, Record, Schema};
