//! Error types for db-console
//!
//! This module defines the error types used throughout the application.

use crate::database::session::SessionState;
use thiserror::Error;

/// Result type alias for db-console
pub type Result<T> = std::result::Result<T, DbConsoleError>;

/// Why a connection attempt was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionErrorKind {
    /// The target database does not exist on the server
    DatabaseNotFound,
    /// Any other refusal (bad credentials, unreachable host, ...)
    Other,
}

impl ConnectionErrorKind {
    /// Classify a driver failure raised while opening a connection
    ///
    /// Postgres reports SQLSTATE `3D000` (`database "x" does not exist`),
    /// MySQL reports `Unknown database 'x'` (error 1049).
    pub fn classify(code: Option<&str>, message: &str) -> Self {
        if code == Some("3D000") {
            return ConnectionErrorKind::DatabaseNotFound;
        }

        let message = message.to_lowercase();
        if message.contains("unknown database")
            || (message.contains("database") && message.contains("does not exist"))
        {
            ConnectionErrorKind::DatabaseNotFound
        } else {
            ConnectionErrorKind::Other
        }
    }
}

/// Main error type for db-console
#[derive(Error, Debug)]
pub enum DbConsoleError {
    /// Invalid settings or malformed persisted profile records
    #[error("Configuration error: {0}")]
    Config(String),

    /// A profile index that does not address a stored profile
    #[error("Configuration error: profile index {index} out of range ({len} profiles stored)")]
    IndexOutOfRange { index: usize, len: usize },

    /// The driver refused to open a connection
    #[error("Connection error: {message}")]
    Connection {
        kind: ConnectionErrorKind,
        message: String,
    },

    /// The driver rejected a statement
    #[error("Execution error: {0}")]
    Execution(String),

    /// A catalog query failed while building the schema tree
    #[error("Introspection error: {0}")]
    Introspection(String),

    /// Releasing a connection or cursor handle failed
    #[error("Resource error: {0}")]
    Resource(String),

    /// The operation needs a live connection
    #[error("Not connected (session is {0})")]
    NotConnected(SessionState),

    /// The operation is not allowed in the current session state
    #[error("Cannot {operation} while session is {state}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },

    /// IO-related errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML decoding errors
    #[error("Configuration error: {0}")]
    TomlDe(#[from] toml::de::Error),

    /// TOML encoding errors
    #[error("Serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    /// JSON encoding errors
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Command parsing errors
    #[error("Command parsing error: {0}")]
    CommandParse(String),
}

impl DbConsoleError {
    /// Build a connection error, classifying the driver failure
    pub fn connection(code: Option<&str>, message: impl Into<String>) -> Self {
        let message = message.into();
        DbConsoleError::Connection {
            kind: ConnectionErrorKind::classify(code, &message),
            message,
        }
    }

    /// Whether this is the recoverable "database does not exist" refusal
    pub fn is_database_not_found(&self) -> bool {
        matches!(
            self,
            DbConsoleError::Connection {
                kind: ConnectionErrorKind::DatabaseNotFound,
                ..
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_postgres_sqlstate() {
        assert_eq!(
            ConnectionErrorKind::classify(Some("3D000"), "whatever"),
            ConnectionErrorKind::DatabaseNotFound
        );
    }

    #[test]
    fn test_classify_messages() {
        assert_eq!(
            ConnectionErrorKind::classify(None, r#"database "shop" does not exist"#),
            ConnectionErrorKind::DatabaseNotFound
        );
        assert_eq!(
            ConnectionErrorKind::classify(Some("42000"), "Unknown database 'shop'"),
            ConnectionErrorKind::DatabaseNotFound
        );
        assert_eq!(
            ConnectionErrorKind::classify(Some("28P01"), "password authentication failed"),
            ConnectionErrorKind::Other
        );
        assert_eq!(
            ConnectionErrorKind::classify(None, r#"relation "users" does not exist"#),
            ConnectionErrorKind::Other
        );
    }

    #[test]
    fn test_is_database_not_found() {
        assert!(DbConsoleError::connection(Some("3D000"), "missing").is_database_not_found());
        assert!(!DbConsoleError::connection(None, "connection refused").is_database_not_found());
        assert!(!DbConsoleError::Execution("boom".to_string()).is_database_not_found());
    }
}
