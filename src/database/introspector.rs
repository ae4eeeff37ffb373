//! Schema Introspector
//!
//! Runs the dialect's two catalog queries on a connected session and folds
//! the rows into a [`SchemaTree`]. A failure anywhere discards the partial
//! result and surfaces as [`DbConsoleError::Introspection`]; the session
//! stays connected.

use crate::database::dialect::Dialect;
use crate::database::driver::{CursorGuard, DriverConnection, RowSet, StatementKind, Value};
use crate::database::schema::{CatalogColumn, SchemaTree};
use crate::database::session::Session;
use crate::error::{DbConsoleError, Result};
use tracing::{debug, warn};

/// Build a fresh schema tree for the session's database
pub async fn introspect(session: &mut Session) -> Result<SchemaTree> {
    let (database, dialect) = match session.profile() {
        Some(profile) => (profile.database.clone(), profile.dialect),
        None => return Err(DbConsoleError::NotConnected(session.state())),
    };
    let connection = session.connection()?;

    let result = build_tree(connection, dialect, database).await;
    if let Err(e) = &result {
        warn!(error = %e, "introspection failed");
    }
    result
}

async fn build_tree(
    connection: &mut dyn DriverConnection,
    dialect: Dialect,
    database: String,
) -> Result<SchemaTree> {
    let column_rows = run_catalog_query(connection, dialect.table_catalog_query()).await?;
    let view_rows = run_catalog_query(connection, dialect.view_catalog_query()).await?;

    let columns = column_rows
        .rows
        .iter()
        .map(|row| dialect.parse_column_row(row))
        .collect::<Result<Vec<CatalogColumn>>>()?;

    let views = view_rows
        .rows
        .iter()
        .map(|row| match row.first() {
            Some(Value::Null) | None => Err(DbConsoleError::Introspection(
                "view catalog row is missing its name".to_string(),
            )),
            Some(value) => Ok(value.to_string()),
        })
        .collect::<Result<Vec<String>>>()?;

    debug!(columns = columns.len(), views = views.len(), "catalog loaded");
    Ok(SchemaTree::from_catalog(database, dialect, &columns, &views))
}

async fn run_catalog_query(connection: &mut dyn DriverConnection, query: &str) -> Result<RowSet> {
    let cursor = connection
        .execute(query, StatementKind::Read)
        .await
        .map_err(|e| DbConsoleError::Introspection(e.to_string()))?;
    let mut cursor = CursorGuard::new(cursor);

    cursor
        .fetch_all()
        .map_err(|e| DbConsoleError::Introspection(e.to_string()))
}
