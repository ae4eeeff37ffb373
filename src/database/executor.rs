//! Query execution
//!
//! Runs ad-hoc statements against a connected [`Session`]. Reads without a
//! limiting clause get the session's row limit appended; writes are
//! committed immediately, one statement per transaction.
//!
//! The limit check is textual: a statement containing the dialect's limit
//! keyword anywhere, including inside a string literal or an identifier,
//! is treated as already limited.

use crate::database::dialect::Dialect;
use crate::database::driver::{CursorGuard, StatementKind, Value};
use crate::database::session::Session;
use crate::error::{DbConsoleError, Result};
use tracing::debug;

/// Outcome of an executed statement
#[derive(Debug, Clone, PartialEq)]
pub enum QueryResult {
    /// Rows returned by a read
    Rows {
        column_names: Vec<String>,
        rows: Vec<Vec<Value>>,
    },
    /// Acknowledgement of a committed write
    Ack { rows_affected: Option<u64> },
}

impl QueryResult {
    /// Number of returned rows (0 for acknowledgements)
    pub fn row_count(&self) -> usize {
        match self {
            QueryResult::Rows { rows, .. } => rows.len(),
            QueryResult::Ack { .. } => 0,
        }
    }
}

/// Append the dialect's limit clause to a read that has none
///
/// Trailing `;` terminators are stripped and a single one is re-added after
/// the clause. The clause goes on its own line so a trailing `--` comment
/// cannot swallow it. Writes and statements already mentioning the limit
/// keyword are returned unchanged.
pub fn apply_limit(sql: &str, dialect: Dialect, limit: u64) -> String {
    if StatementKind::classify(sql) != StatementKind::Read {
        return sql.to_string();
    }
    if sql
        .to_uppercase()
        .contains(&dialect.limit_keyword().to_uppercase())
    {
        return sql.to_string();
    }

    let trimmed = sql.trim_end();
    let body = trimmed.trim_end_matches(|c: char| c == ';' || c.is_whitespace());
    let terminator = if body.len() < trimmed.len() { ";" } else { "" };

    format!("{}\n{}{}", body, dialect.limit_clause(limit), terminator)
}

/// Execute a raw statement on a connected session
///
/// Driver failures come back as [`DbConsoleError::Execution`] and leave the
/// session connected.
pub async fn execute(session: &mut Session, raw_statement: &str) -> Result<QueryResult> {
    let limit = session.result_limit();
    let dialect = session
        .dialect()
        .ok_or(DbConsoleError::NotConnected(session.state()))?;
    let connection = session.connection()?;

    let kind = StatementKind::classify(raw_statement);
    let statement = apply_limit(raw_statement, dialect, limit);
    debug!(?kind, %statement, "executing statement");

    let cursor = connection
        .execute(&statement, kind)
        .await
        .map_err(|e| DbConsoleError::Execution(e.to_string()))?;
    let mut cursor = CursorGuard::new(cursor);

    match kind {
        StatementKind::Read => {
            let row_set = cursor
                .fetch_all()
                .map_err(|e| DbConsoleError::Execution(e.to_string()))?;
            debug!(rows = row_set.rows.len(), "fetched rows");
            Ok(QueryResult::Rows {
                column_names: row_set.column_names,
                rows: row_set.rows,
            })
        }
        StatementKind::Write => {
            let rows_affected = cursor.rows_affected();
            drop(cursor);
            connection
                .commit()
                .await
                .map_err(|e| DbConsoleError::Execution(e.to_string()))?;
            debug!(?rows_affected, "committed");
            Ok(QueryResult::Ack { rows_affected })
        }
    }
}
