//! Driver layer
//!
//! The session manager never speaks a wire protocol itself. It talks to
//! a [`Driver`] that opens [`DriverConnection`]s, which in turn hand out
//! one [`Cursor`] per executed statement. The production implementation
//! lives in [`crate::database::sqlx_driver`]; tests plug in their own.

use crate::config::profiles::ConnectionProfile;
use crate::error::DbConsoleError;
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use tracing::warn;

/// Result type for driver operations
pub type DriverResult<T> = std::result::Result<T, DriverError>;

/// Failure reported by a driver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverError {
    /// Backend error code (SQLSTATE for Postgres, SQLSTATE or error number for MySQL)
    pub code: Option<String>,
    /// Backend error message
    pub message: String,
}

impl DriverError {
    /// Create an error without a backend code
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    /// Create an error carrying a backend code
    pub fn with_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            message: message.into(),
        }
    }
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{} ({})", self.message, code),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for DriverError {}

/// Whether a statement reads rows or changes the database
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    /// `SELECT ...`
    Read,
    /// Everything else: DML and DDL
    Write,
}

impl StatementKind {
    /// Classify a raw statement by its leading keyword
    ///
    /// Case-insensitive prefix match on `SELECT` after trimming whitespace.
    pub fn classify(sql: &str) -> Self {
        let head = sql.trim_start();
        match head.get(..6) {
            Some(prefix) if prefix.eq_ignore_ascii_case("SELECT") => StatementKind::Read,
            _ => StatementKind::Write,
        }
    }
}

/// A single cell value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
}

impl Value {
    /// Lift a text-protocol cell into a typed value using the column's type name
    pub fn from_text(type_name: &str, text: String) -> Self {
        let upper = type_name.to_uppercase();
        let base = upper.trim_end_matches(" UNSIGNED");

        match base {
            "BOOL" | "BOOLEAN" => match text.as_str() {
                "t" | "true" | "1" => Value::Bool(true),
                "f" | "false" | "0" => Value::Bool(false),
                _ => Value::Text(text),
            },
            "INT2" | "INT4" | "INT8" | "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT"
            | "INTEGER" | "BIGINT" | "YEAR" => match text.parse::<i64>() {
                Ok(n) => Value::Int(n),
                Err(_) => Value::Text(text),
            },
            "FLOAT4" | "FLOAT8" | "FLOAT" | "DOUBLE" | "REAL" => match text.parse::<f64>() {
                Ok(n) => Value::Float(n),
                Err(_) => Value::Text(text),
            },
            _ => Value::Text(text),
        }
    }

    /// Whether the value is SQL NULL
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(n) => write!(f, "{}", n),
            Value::Text(s) => write!(f, "{}", s),
            Value::Bytes(bytes) => {
                write!(f, "\\x")?;
                for b in bytes {
                    write!(f, "{:02x}", b)?;
                }
                Ok(())
            }
        }
    }
}

/// Column names plus every fetched row
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowSet {
    pub column_names: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

/// Opens connections for a dialect
#[async_trait]
pub trait Driver: Send + Sync {
    /// Open a connection using the profile's fields and the given password
    async fn open(
        &self,
        profile: &ConnectionProfile,
        password: &str,
    ) -> DriverResult<Box<dyn DriverConnection>>;
}

/// A live connection handle
#[async_trait]
pub trait DriverConnection: Send {
    /// Execute a statement and return a cursor over its outcome
    ///
    /// For [`StatementKind::Write`] the driver opens a transaction that
    /// stays pending until [`DriverConnection::commit`].
    async fn execute(&mut self, sql: &str, kind: StatementKind) -> DriverResult<Box<dyn Cursor>>;

    /// Commit the pending transaction, if any
    async fn commit(&mut self) -> DriverResult<()>;

    /// Close the connection
    async fn close(self: Box<Self>) -> DriverResult<()>;
}

/// The outcome of one executed statement
pub trait Cursor: Send {
    /// Take every row along with the column names
    fn fetch_all(&mut self) -> DriverResult<RowSet>;

    /// Rows changed by a write, when the backend reports it
    fn rows_affected(&self) -> Option<u64>;

    /// Release the cursor. Must be idempotent.
    fn release(&mut self) -> DriverResult<()>;
}

/// Releases the wrapped cursor when dropped, on every exit path
///
/// Release failures are logged and swallowed.
pub struct CursorGuard {
    cursor: Box<dyn Cursor>,
}

impl CursorGuard {
    /// Take ownership of a cursor
    pub fn new(cursor: Box<dyn Cursor>) -> Self {
        Self { cursor }
    }
}

impl std::ops::Deref for CursorGuard {
    type Target = dyn Cursor;

    fn deref(&self) -> &Self::Target {
        self.cursor.as_ref()
    }
}

impl std::ops::DerefMut for CursorGuard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.cursor.as_mut()
    }
}

impl Drop for CursorGuard {
    fn drop(&mut self) {
        if let Err(e) = self.cursor.release() {
            warn!(error = %DbConsoleError::Resource(e.to_string()), "failed to release cursor");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_reads() {
        assert_eq!(StatementKind::classify("SELECT 1"), StatementKind::Read);
        assert_eq!(StatementKind::classify("  select * from users"), StatementKind::Read);
        assert_eq!(StatementKind::classify("\n\tSeLeCt now()"), StatementKind::Read);
    }

    #[test]
    fn test_classify_writes() {
        assert_eq!(StatementKind::classify("INSERT INTO t VALUES (1)"), StatementKind::Write);
        assert_eq!(StatementKind::classify("create table t (id int)"), StatementKind::Write);
        assert_eq!(StatementKind::classify("WITH x AS (SELECT 1) SELECT * FROM x"), StatementKind::Write);
        assert_eq!(StatementKind::classify("SEL"), StatementKind::Write);
        assert_eq!(StatementKind::classify(""), StatementKind::Write);
    }

    #[test]
    fn test_value_from_text() {
        assert_eq!(Value::from_text("INT4", "42".to_string()), Value::Int(42));
        assert_eq!(Value::from_text("BIGINT UNSIGNED", "7".to_string()), Value::Int(7));
        assert_eq!(Value::from_text("FLOAT8", "1.5".to_string()), Value::Float(1.5));
        assert_eq!(Value::from_text("BOOL", "t".to_string()), Value::Bool(true));
        assert_eq!(
            Value::from_text("NUMERIC", "10.25".to_string()),
            Value::Text("10.25".to_string())
        );
        assert_eq!(
            Value::from_text("INTERVAL", "1 day".to_string()),
            Value::Text("1 day".to_string())
        );
    }

    #[test]
    fn test_value_display() {
        assert_eq!(Value::Null.to_string(), "NULL");
        assert_eq!(Value::Bytes(vec![0xde, 0xad]).to_string(), "\\xdead");
        assert_eq!(Value::Text("hi".to_string()).to_string(), "hi");
    }

    struct CountingCursor {
        releases: std::sync::Arc<std::sync::atomic::AtomicUsize>,
    }

    impl Cursor for CountingCursor {
        fn fetch_all(&mut self) -> DriverResult<RowSet> {
            Err(DriverError::new("fetch failed"))
        }

        fn rows_affected(&self) -> Option<u64> {
            None
        }

        fn release(&mut self) -> DriverResult<()> {
            self.releases.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Err(DriverError::new("already gone"))
        }
    }

    #[test]
    fn test_cursor_guard_releases_on_error_path() {
        let releases = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let fetch = || -> DriverResult<RowSet> {
            let mut guard = CursorGuard::new(Box::new(CountingCursor {
                releases: releases.clone(),
            }));
            let rows = guard.fetch_all()?;
            Ok(rows)
        };

        assert!(fetch().is_err());
        assert_eq!(releases.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[test]
    fn test_driver_error_display() {
        assert_eq!(DriverError::new("boom").to_string(), "boom");
        assert_eq!(
            DriverError::with_code("3D000", "database \"x\" does not exist").to_string(),
            "database \"x\" does not exist (3D000)"
        );
    }
}
