//! Typed error model for clause construction, metadata resolution, value fetching and row mutation.
//! Every fallible operation in the crate returns `QueryResult<T>`; callers decide how to surface it.

use thiserror::Error;

use crate::metadata::{FieldId, TableId};
use crate::query::SlotId;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    /// Clause shape could not be decoded, operator is unknown or arity is wrong.
    #[error("malformed clause: {0}")]
    MalformedClause(String),
    /// Field reference points at a field the current metadata snapshot does not know.
    #[error("unknown field {0}")]
    UnknownField(FieldId),
    #[error("unknown table {0}")]
    UnknownTable(TableId),
    #[error("unknown filter slot {0}")]
    UnknownSlot(SlotId),
    #[error("Cannot {action} row from table without a primary key")]
    NoPrimaryKey { table: TableId, action: &'static str },
    #[error("primary key value '{value}' is not an integer for numeric field {field}")]
    InvalidPrimaryKey { field: FieldId, value: String },
    #[error("field values fetch failed: {0}")]
    Fetch(String),
    #[error("field values fetch for field {0} timed out")]
    Timeout(FieldId),
    #[error("mutation transport failed: {0}")]
    Transport(String),
}

impl QueryError {
    pub fn malformed<S: Into<String>>(msg: S) -> Self { QueryError::MalformedClause(msg.into()) }
    pub fn fetch<S: Into<String>>(msg: S) -> Self { QueryError::Fetch(msg.into()) }
    pub fn transport<S: Into<String>>(msg: S) -> Self { QueryError::Transport(msg.into()) }

    /// Stable machine-readable code.
    pub fn code_str(&self) -> &'static str {
        match self {
            QueryError::MalformedClause(_) => "malformed_clause",
            QueryError::UnknownField(_) => "unknown_field",
            QueryError::UnknownTable(_) => "unknown_table",
            QueryError::UnknownSlot(_) => "unknown_slot",
            QueryError::NoPrimaryKey { .. } => "no_primary_key",
            QueryError::InvalidPrimaryKey { .. } => "invalid_primary_key",
            QueryError::Fetch(_) => "fetch_error",
            QueryError::Timeout(_) => "fetch_timeout",
            QueryError::Transport(_) => "transport_error",
        }
    }

    /// Map to HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            QueryError::MalformedClause(_) | QueryError::InvalidPrimaryKey { .. } => 400,
            QueryError::UnknownField(_) | QueryError::UnknownTable(_) | QueryError::UnknownSlot(_) => 404,
            QueryError::NoPrimaryKey { .. } => 422,
            QueryError::Fetch(_) | QueryError::Transport(_) => 502,
            QueryError::Timeout(_) => 504,
        }
    }

    /// Stale metadata and failed/slow fetches can be retried after a refresh; everything else aborts the edit.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, QueryError::UnknownField(_) | QueryError::Fetch(_) | QueryError::Timeout(_))
    }
}

pub type QueryResult<T> = Result<T, QueryError>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod error_tests;
