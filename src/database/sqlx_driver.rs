//! sqlx-backed driver
//!
//! Opens a single PostgreSQL or MySQL connection per session. Statements go
//! through the simple/text query protocol so arbitrary ad-hoc SQL (DDL
//! included) can be run without preparing it first.

use crate::config::profiles::ConnectionProfile;
use crate::database::dialect::Dialect;
use crate::database::driver::{
    Cursor, Driver, DriverConnection, DriverError, DriverResult, RowSet, StatementKind, Value,
};
use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::{Column, ColumnIndex, Connection, Decode, Executor, Row, Statement, TypeInfo};
use tracing::{debug, warn};

/// Driver opening real connections with sqlx
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlxDriver;

impl SqlxDriver {
    /// Create the driver
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Driver for SqlxDriver {
    async fn open(
        &self,
        profile: &ConnectionProfile,
        password: &str,
    ) -> DriverResult<Box<dyn DriverConnection>> {
        let port = profile
            .port_number()
            .map_err(|e| DriverError::new(e.to_string()))?;

        let handle = match profile.dialect {
            Dialect::Postgres => {
                let options = PgConnectOptions::new()
                    .host(&profile.host)
                    .port(port)
                    .database(&profile.database)
                    .username(&profile.user)
                    .password(password);
                let conn = PgConnection::connect_with(&options)
                    .await
                    .map_err(driver_error)?;
                Handle::Postgres(conn)
            }
            Dialect::MySql => {
                let options = MySqlConnectOptions::new()
                    .host(&profile.host)
                    .port(port)
                    .database(&profile.database)
                    .username(&profile.user)
                    .password(password);
                let conn = MySqlConnection::connect_with(&options)
                    .await
                    .map_err(driver_error)?;
                Handle::MySql(conn)
            }
        };

        debug!(dialect = %profile.dialect, host = %profile.host, "opened connection");
        Ok(Box::new(SqlxConnection {
            handle,
            in_transaction: false,
        }))
    }
}

enum Handle {
    Postgres(PgConnection),
    MySql(MySqlConnection),
}

/// A live sqlx connection
pub struct SqlxConnection {
    handle: Handle,
    /// A write opened a transaction that has not been committed yet
    in_transaction: bool,
}

impl SqlxConnection {
    async fn run_raw(&mut self, sql: &str) -> DriverResult<()> {
        let result = match &mut self.handle {
            Handle::Postgres(conn) => conn.execute(sqlx::raw_sql(sql)).await.map(|_| ()),
            Handle::MySql(conn) => conn.execute(sqlx::raw_sql(sql)).await.map(|_| ()),
        };
        result.map_err(driver_error)
    }

    async fn run_write(&mut self, sql: &str) -> DriverResult<u64> {
        let result = match &mut self.handle {
            Handle::Postgres(conn) => conn
                .execute(sqlx::raw_sql(sql))
                .await
                .map(|r| r.rows_affected()),
            Handle::MySql(conn) => conn
                .execute(sqlx::raw_sql(sql))
                .await
                .map(|r| r.rows_affected()),
        };
        result.map_err(driver_error)
    }

    async fn run_read(&mut self, sql: &str) -> DriverResult<RowSet> {
        match &mut self.handle {
            Handle::Postgres(conn) => {
                let rows = conn
                    .fetch_all(sqlx::raw_sql(sql))
                    .await
                    .map_err(driver_error)?;
                if !rows.is_empty() {
                    return Ok(decode_rows(&rows));
                }
                // No rows to read the header from; describe the statement instead
                let column_names = match (&mut *conn).prepare(sql).await {
                    Ok(statement) => column_names_of(statement.columns()),
                    Err(_) => Vec::new(),
                };
                Ok(RowSet {
                    column_names,
                    rows: Vec::new(),
                })
            }
            Handle::MySql(conn) => {
                let rows = conn
                    .fetch_all(sqlx::raw_sql(sql))
                    .await
                    .map_err(driver_error)?;
                if !rows.is_empty() {
                    return Ok(decode_rows(&rows));
                }
                let column_names = match (&mut *conn).prepare(sql).await {
                    Ok(statement) => column_names_of(statement.columns()),
                    Err(_) => Vec::new(),
                };
                Ok(RowSet {
                    column_names,
                    rows: Vec::new(),
                })
            }
        }
    }
}

#[async_trait]
impl DriverConnection for SqlxConnection {
    async fn execute(&mut self, sql: &str, kind: StatementKind) -> DriverResult<Box<dyn Cursor>> {
        match kind {
            StatementKind::Read => {
                let row_set = self.run_read(sql).await?;
                Ok(Box::new(SqlxCursor::rows(row_set)))
            }
            StatementKind::Write => {
                if !self.in_transaction {
                    self.run_raw("BEGIN").await?;
                    self.in_transaction = true;
                }
                match self.run_write(sql).await {
                    Ok(rows_affected) => Ok(Box::new(SqlxCursor::ack(rows_affected))),
                    Err(e) => {
                        // Leave the connection usable for the next statement
                        if let Err(rollback) = self.run_raw("ROLLBACK").await {
                            warn!(error = %rollback, "rollback after failed statement failed");
                        }
                        self.in_transaction = false;
                        Err(e)
                    }
                }
            }
        }
    }

    async fn commit(&mut self) -> DriverResult<()> {
        if !self.in_transaction {
            return Ok(());
        }
        self.in_transaction = false;
        self.run_raw("COMMIT").await
    }

    async fn close(self: Box<Self>) -> DriverResult<()> {
        let result = match self.handle {
            Handle::Postgres(conn) => conn.close().await,
            Handle::MySql(conn) => conn.close().await,
        };
        result.map_err(driver_error)
    }
}

/// Fully materialised statement outcome
struct SqlxCursor {
    rows: Option<RowSet>,
    rows_affected: Option<u64>,
    released: bool,
}

impl SqlxCursor {
    fn rows(row_set: RowSet) -> Self {
        Self {
            rows: Some(row_set),
            rows_affected: None,
            released: false,
        }
    }

    fn ack(rows_affected: u64) -> Self {
        Self {
            rows: None,
            rows_affected: Some(rows_affected),
            released: false,
        }
    }
}

impl Cursor for SqlxCursor {
    fn fetch_all(&mut self) -> DriverResult<RowSet> {
        if self.released {
            return Err(DriverError::new("cursor already released"));
        }
        Ok(self.rows.take().unwrap_or_default())
    }

    fn rows_affected(&self) -> Option<u64> {
        self.rows_affected
    }

    fn release(&mut self) -> DriverResult<()> {
        self.rows = None;
        self.released = true;
        Ok(())
    }
}

fn driver_error(err: sqlx::Error) -> DriverError {
    match &err {
        sqlx::Error::Database(db) => match db.code() {
            Some(code) => DriverError::with_code(code.into_owned(), db.message()),
            None => DriverError::new(db.message()),
        },
        _ => DriverError::new(err.to_string()),
    }
}

fn column_names_of<C: Column>(columns: &[C]) -> Vec<String> {
    columns.iter().map(|c| c.name().to_string()).collect()
}

/// Decode text-protocol rows into values, typed by each column's type name
fn decode_rows<R>(rows: &[R]) -> RowSet
where
    R: Row,
    usize: ColumnIndex<R>,
    for<'r> Option<String>: Decode<'r, R::Database>,
    for<'r> Option<Vec<u8>>: Decode<'r, R::Database>,
{
    let column_names = rows
        .first()
        .map(|row| column_names_of(row.columns()))
        .unwrap_or_default();

    let rows = rows
        .iter()
        .map(|row| {
            row.columns()
                .iter()
                .enumerate()
                .map(|(idx, column)| {
                    match row.try_get_unchecked::<Option<String>, _>(idx) {
                        Ok(Some(text)) => Value::from_text(column.type_info().name(), text),
                        Ok(None) => Value::Null,
                        Err(_) => match row.try_get_unchecked::<Option<Vec<u8>>, _>(idx) {
                            Ok(Some(bytes)) => Value::Bytes(bytes),
                            _ => Value::Null,
                        },
                    }
                })
                .collect()
        })
        .collect();

    RowSet { column_names, rows }
}
