//! Per-table storage: one table's schema, rows, and their lock.
//!
//! A `Table` arbitrates concurrent access to its row collection with a
//! reader/writer lock: reads (select, create-index) take the shared side,
//! mutations (insert, update, delete, clear) take the exclusive side. The
//! registry hands out `Arc<Table>` clones, so the registry lock is never
//! held while a table lock is taken.

use parking_lot::RwLock;

use crate::error::{SqlError, SqlResult};
use crate::parser::{Condition, Operand, ParsedQuery, WILDCARD};
use crate::types::{Record, Schema};

/// A named, schema-typed collection of rows held in memory.
#[derive(Debug)]
pub struct Table {
    name: String,
    schema: Schema,
    pub(crate) rows: RwLock<Vec<Record>>,
}

impl Table {
    /// Creates an empty table.
    pub fn new(name: impl Into<String>, schema: Schema) -> Self {
        Self {
            name: name.into(),
            schema,
            rows: RwLock::new(Vec::new()),
        }
    }

    /// Returns the table name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the table schema.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Returns the current number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.read().len()
    }

    /// Removes all rows.
    pub fn clear(&self) {
        self.rows.write().clear();
    }

    /// Validates every field a query references against the schema:
    /// the requested field list (wildcard excepted), update targets, and
    /// both operands of every condition.
    ///
    /// Runs before any lock-protected row work mutates state, so a failure
    /// here leaves the table untouched.
    pub(crate) fn validate(&self, query: &ParsedQuery) -> SqlResult<()> {
        for field in &query.fields {
            if field != WILDCARD && self.schema.field_index(field).is_none() {
                return Err(SqlError::FieldNotFound(field.clone()));
            }
        }
        for field in query.updates.keys() {
            if self.schema.field_index(field).is_none() {
                return Err(SqlError::FieldNotFound(field.clone()));
            }
        }
        for condition in &query.conditions {
            self.validate_operand(&condition.lhs)?;
            self.validate_operand(&condition.rhs)?;
        }
        Ok(())
    }

    fn validate_operand(&self, operand: &Operand) -> SqlResult<()> {
        if let Operand::Field(field) = operand {
            if self.schema.field_index(field).is_none() {
                return Err(SqlError::FieldNotFound(field.clone()));
            }
        }
        Ok(())
    }

    /// Resolves a field name to its schema index, as a schema error if it
    /// does not exist.
    pub(crate) fn field_index(&self, field: &str) -> SqlResult<usize> {
        self.schema
            .field_index(field)
            .ok_or_else(|| SqlError::FieldNotFound(field.to_string()))
    }

    /// True if the record satisfies every condition in the conjunction.
    pub(crate) fn matches(&self, conditions: &[Condition], record: &Record) -> bool {
        conditions
            .iter()
            .all(|condition| crate::executor::eval_condition(&self.schema, condition, record))
    }
}
