//! Table registry: the name -> table mapping.
//!
//! The registry is an explicit owned structure, guarded by its own lock,
//! logically separate from any single table's lock. Lookups clone the
//! `Arc<Table>` and release the registry lock before the caller touches the
//! table, so no task ever holds both lock scopes at once — registry
//! structure changes are independent of row mutations inside live tables.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{SqlError, SqlResult};
use crate::parser::ParsedQuery;
use crate::table::Table;
use crate::types::{FieldType, Schema};

/// Mapping from table name to live table, guarded by a reader/writer lock.
#[derive(Debug, Default)]
pub struct TableRegistry {
    tables: RwLock<HashMap<String, Arc<Table>>>,
}

impl TableRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a table by name.
    pub fn get(&self, name: &str) -> Option<Arc<Table>> {
        self.tables.read().get(name).cloned()
    }

    /// Returns the number of registered tables.
    pub fn len(&self) -> usize {
        self.tables.read().len()
    }

    /// Returns true if no tables are registered.
    pub fn is_empty(&self) -> bool {
        self.tables.read().is_empty()
    }

    /// Returns the registered table names.
    pub fn table_names(&self) -> Vec<String> {
        self.tables.read().keys().cloned().collect()
    }

    /// Creates a table from a CREATE command.
    ///
    /// Validates that the name is unused and that every declared column has
    /// a recognized field type, then inserts an empty table atomically under
    /// the registry's exclusive lock. Creating an existing name is a logic
    /// error and leaves the first table untouched.
    pub fn create_table(&self, query: &ParsedQuery) -> SqlResult<()> {
        let mut columns = Vec::with_capacity(query.columns.len());
        for spec in &query.columns {
            if spec.field_type == FieldType::Unknown {
                return Err(SqlError::UnknownFieldType(spec.type_name.clone()));
            }
            columns.push((spec.name.clone(), spec.field_type));
        }
        let schema = Schema::new(columns)?;

        let mut tables = self.tables.write();
        if tables.contains_key(&query.table) {
            return Err(SqlError::TableExists(query.table.clone()));
        }
        tables.insert(
            query.table.clone(),
            Arc::new(Table::new(query.table.clone(), schema)),
        );
        Ok(())
    }

    /// Drops a table: clears its rows and removes the registry entry, making
    /// the name immediately reusable.
    pub fn drop_table(&self, name: &str) -> SqlResult<()> {
        let table = self
            .tables
            .write()
            .remove(name)
            .ok_or_else(|| SqlError::TableNotFound(name.to_string()))?;
        // Clear after the registry lock is released so concurrent holders of
        // the Arc observe an empty table without lock nesting.
        table.clear();
        Ok(())
    }
}
