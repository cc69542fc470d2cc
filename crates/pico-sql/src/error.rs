//! Error types for the SQL core.

use thiserror::Error;

/// Errors raised by the table store, executor, and registry.
///
/// The engine boundary maps these onto the wire status taxonomy: schema
/// violations become `schema error`, storage-rule violations become
/// `logic error`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SqlError {
    /// A referenced field does not exist in the target table's schema.
    #[error("schema violation: field '{0}' is not defined")]
    FieldNotFound(String),

    /// A declared column type does not resolve to a known field type.
    #[error("schema violation: unknown field type '{0}'")]
    UnknownFieldType(String),

    /// A declared column name appears more than once.
    #[error("schema violation: duplicate column '{0}'")]
    DuplicateColumn(String),

    /// An insert tuple does not line up with the declared column list.
    #[error("schema violation: expected {expected} values, got {actual}")]
    ArityMismatch {
        /// Number of columns in the insert field list.
        expected: usize,
        /// Number of values in the offending tuple.
        actual: usize,
    },

    /// A non-create command targeted a table that does not exist.
    #[error("table '{0}' does not exist")]
    TableNotFound(String),

    /// CREATE TABLE targeted a name that is already registered.
    #[error("table '{0}' already exists")]
    TableExists(String),
}

impl SqlError {
    /// Returns true if this is a schema-level violation (as opposed to a
    /// storage-rule violation).
    pub fn is_schema_error(&self) -> bool {
        matches!(
            self,
            SqlError::FieldNotFound(_)
                | SqlError::UnknownFieldType(_)
                | SqlError::DuplicateColumn(_)
                | SqlError::ArityMismatch { .. }
        )
    }
}

/// Result type for SQL core operations.
pub type SqlResult<T> = Result<T, SqlError>;
