//! Shared Postgres plumbing: pool construction and sqlx error mapping.
//!
//! ## Error Mapping
//!
//! Every sqlx failure is flattened into a [`DatabaseError`] naming the
//! operation that failed:
//!
//! | SQLx Error | Mapped to | Scenario |
//! |------------|-----------|----------|
//! | Database | message + SQLSTATE code | Server rejected a statement (timeout `57014`, missing table `42P01`, ...) |
//! | PoolClosed | message | Pool was closed during shutdown |
//! | PoolTimedOut | message | No connection became available |
//! | Other | message | Network errors, protocol errors, decode errors |

use std::time::Duration;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

/// A failed database operation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("database error in {operation}: {message}")]
pub struct DatabaseError {
    pub operation: &'static str,
    pub message: String,
    /// SQLSTATE, when the server reported one.
    pub code: Option<String>,
}

impl DatabaseError {
    pub fn new(operation: &'static str, message: impl Into<String>) -> Self {
        Self {
            operation,
            message: message.into(),
            code: None,
        }
    }

    /// The statement ran past `statement_timeout`.
    pub fn is_timeout(&self) -> bool {
        self.code.as_deref() == Some("57014")
    }
}

pub(crate) fn map_sqlx_error(operation: &'static str, err: sqlx::Error) -> DatabaseError {
    match err {
        sqlx::Error::Database(db_err) => DatabaseError {
            operation,
            message: db_err.message().to_string(),
            code: db_err.code().map(|code| code.into_owned()),
        },
        sqlx::Error::PoolClosed => DatabaseError::new(operation, "connection pool closed"),
        sqlx::Error::PoolTimedOut => {
            DatabaseError::new(operation, "timed out waiting for a pooled connection")
        }
        other => DatabaseError::new(operation, other.to_string()),
    }
}

/// Open a lazily-connecting pool; the first query establishes the connection.
pub fn connect_lazy(
    connection_string: &str,
    max_connections: u32,
) -> Result<PgPool, DatabaseError> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(30))
        .connect_lazy(connection_string)
        .map_err(|e| map_sqlx_error("connect", e))
}
