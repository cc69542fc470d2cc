//! # pico-proto
//!
//! Wire protocol types for picodb client-server communication.
//!
//! The protocol is line-delimited JSON over TCP: each request and each
//! response is a single JSON object terminated by a newline. The protocol
//! defines:
//! - Query execution (`query`)
//! - Liveness checks (`ping`)
//! - Server identification (`server_info`)
//!
//! # Example
//!
//! ```
//! use pico_proto::{Request, Response};
//!
//! let frame = serde_json::to_string(&Request::Query {
//!     sql: "SELECT * FROM users".to_string(),
//! })
//! .unwrap();
//! assert_eq!(frame, r#"{"type":"query","sql":"SELECT * FROM users"}"#);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Protocol version spoken by this crate.
pub const PROTOCOL_VERSION: u32 = 1;

/// A request frame sent by a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Execute one SQL statement.
    Query {
        /// The SQL text.
        sql: String,
    },
    /// Liveness check.
    Ping,
    /// Ask for server version information.
    ServerInfo,
}

/// A response frame sent by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Result of a query request.
    Query {
        /// The query outcome.
        result: QueryResponse,
    },
    /// Answer to a ping.
    Pong,
    /// Server identification.
    ServerInfo {
        /// Server semantic version.
        server_version: String,
        /// Wire protocol version.
        protocol_version: u32,
    },
    /// The request frame itself could not be understood.
    Error {
        /// What went wrong.
        message: String,
    },
}

/// Classification of a query outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    /// The command executed.
    #[serde(rename = "OK")]
    Ok,
    /// The parser rejected the input text; the executor never ran.
    #[serde(rename = "syntax error")]
    SyntaxError,
    /// A referenced field or declared type violates the target schema; no
    /// row was mutated.
    #[serde(rename = "schema error")]
    SchemaError,
    /// A storage-level rule was violated: creating a table that exists, or
    /// targeting a table that does not.
    #[serde(rename = "logic error")]
    LogicError,
    /// Defensive default; a correctly implemented engine never returns it.
    #[serde(rename = "unexpected")]
    Unexpected,
    /// The caller's timeout won the race against the engine's reply.
    #[serde(rename = "query timeout")]
    Timeout,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Status::Ok => "OK",
            Status::SyntaxError => "syntax error",
            Status::SchemaError => "schema error",
            Status::LogicError => "logic error",
            Status::Unexpected => "unexpected",
            Status::Timeout => "query timeout",
        };
        f.write_str(text)
    }
}

/// One output row: a field -> value projection.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Row {
    /// Projected fields.
    pub fields: HashMap<String, String>,
}

impl Row {
    /// Creates a row from a projection map.
    pub fn new(fields: HashMap<String, String>) -> Self {
        Self { fields }
    }

    /// Returns the value of a field, if projected.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }
}

/// The outcome of one query: a status classification, an optional error
/// message, and (for reads) the projected rows. An empty row set is a valid
/// result, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResponse {
    /// Outcome classification.
    pub status: Status,
    /// Error detail when the status is not `Ok`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Projected rows for reads; empty for mutations.
    #[serde(default)]
    pub rows: Vec<Row>,
}

impl QueryResponse {
    /// A successful result carrying rows.
    pub fn ok(rows: Vec<Row>) -> Self {
        Self {
            status: Status::Ok,
            error: None,
            rows,
        }
    }

    /// A failed result with a status classification and message.
    pub fn failure(status: Status, error: impl Into<String>) -> Self {
        Self {
            status,
            error: Some(error.into()),
            rows: Vec::new(),
        }
    }

    /// Returns true if the query executed.
    pub fn is_ok(&self) -> bool {
        self.status == Status::Ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_frames() {
        let frame = serde_json::to_string(&Request::Ping).unwrap();
        assert_eq!(frame, r#"{"type":"ping"}"#);

        let parsed: Request =
            serde_json::from_str(r#"{"type":"query","sql":"SELECT 1"}"#).unwrap();
        assert_eq!(
            parsed,
            Request::Query {
                sql: "SELECT 1".to_string()
            }
        );
    }

    #[test]
    fn test_status_wire_strings() {
        assert_eq!(
            serde_json::to_string(&Status::SchemaError).unwrap(),
            r#""schema error""#
        );
        assert_eq!(serde_json::to_string(&Status::Ok).unwrap(), r#""OK""#);
        let status: Status = serde_json::from_str(r#""query timeout""#).unwrap();
        assert_eq!(status, Status::Timeout);
    }

    #[test]
    fn test_query_response_round_trip() {
        let mut fields = HashMap::new();
        fields.insert("id".to_string(), "1".to_string());
        let response = QueryResponse::ok(vec![Row::new(fields)]);

        let json = serde_json::to_string(&response).unwrap();
        assert!(!json.contains("error"));

        let back: QueryResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(back, response);
        assert_eq!(back.rows[0].get("id"), Some("1"));
    }

    #[test]
    fn test_failure_carries_message() {
        let response = QueryResponse::failure(Status::LogicError, "table 'x' does not exist");
        assert!(!response.is_ok());
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("logic error"));
        assert!(json.contains("does not exist"));
    }
}
