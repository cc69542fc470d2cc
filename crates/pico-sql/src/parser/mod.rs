//! SQL parser adapter for picodb.
//!
//! This module parses SQL text with the `sqlparser` crate and transforms the
//! AST into the engine's flat [`ParsedQuery`] representation. The executor
//! never sees SQL text; it consumes `ParsedQuery` objects only, so anything
//! this module rejects surfaces as a syntax error before execution starts.
//!
//! # Supported SQL
//!
//! - `CREATE TABLE t (col TYPE, ...)` with TYPE one of TEXT, BOOL, INT,
//!   DATETIME (case-insensitive; anything else is rejected at creation)
//! - `SELECT a, b | * FROM t [WHERE ...]`
//! - `INSERT INTO t (a, b) VALUES (v, ...), (v, ...)`
//! - `UPDATE t SET a = v, ... [WHERE ...]`
//! - `DELETE FROM t [WHERE ...]`
//! - `DROP TABLE t`
//! - `CREATE INDEX [name] ON t (a, b, ...)`
//!
//! WHERE clauses are comparisons (`=`, `!=`, `<>`, `>`, `<`, `>=`, `<=`)
//! joined by `AND`; each operand is a field reference or a literal.

use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser as SqlParser;
use thiserror::Error;

mod query;

pub use query::{
    ColumnSpec, CommandKind, CompareOp, Condition, Operand, ParsedQuery, WILDCARD,
};

/// Errors that can occur while turning SQL text into a `ParsedQuery`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    /// Error from the underlying sqlparser crate.
    #[error("SQL syntax error: {0}")]
    Syntax(String),

    /// Syntactically valid SQL that the engine does not support.
    #[error("unsupported SQL: {0}")]
    Unsupported(String),

    /// A literal that cannot be carried as a text cell value.
    #[error("invalid literal: {0}")]
    InvalidLiteral(String),

    /// Empty input.
    #[error("empty query")]
    EmptyQuery,
}

impl From<sqlparser::parser::ParserError> for ParseError {
    fn from(err: sqlparser::parser::ParserError) -> Self {
        ParseError::Syntax(err.to_string())
    }
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Parses a single SQL statement into a [`ParsedQuery`].
pub fn parse(sql: &str) -> ParseResult<ParsedQuery> {
    if sql.trim().is_empty() {
        return Err(ParseError::EmptyQuery);
    }

    let dialect = PostgreSqlDialect {};
    let mut ast = SqlParser::parse_sql(&dialect, sql)?;

    match ast.len() {
        0 => Err(ParseError::EmptyQuery),
        1 => ParsedQuery::from_sql_ast(ast.remove(0)),
        n => Err(ParseError::Syntax(format!(
            "expected 1 statement, got {n}"
        ))),
    }
}
