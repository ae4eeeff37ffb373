//! In-memory driver used by the integration tests
//!
//! Counts opened and closed connections, commits and cursor releases, and
//! records every statement it is asked to run.

#![allow(dead_code)]

use async_trait::async_trait;
use db_console::config::{ConnectionProfile, ProfileStore};
use db_console::database::{
    Cursor, Dialect, Driver, DriverConnection, DriverError, RowSet, StatementKind, Value,
};
use db_console::database::driver::DriverResult;
use db_console::database::session::CredentialProvider;
use db_console::error::Result;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Everything the mock observed
#[derive(Debug, Clone, Default)]
pub struct MockLog {
    pub open_attempts: usize,
    pub opens: usize,
    pub closes: usize,
    pub commits: usize,
    pub releases: usize,
    pub statements: Vec<(String, StatementKind)>,
    pub passwords: Vec<String>,
}

#[derive(Default)]
struct MockScript {
    open_failures: VecDeque<DriverError>,
    responses: Vec<(String, RowSet)>,
    failing: Vec<String>,
    rows_affected: Option<u64>,
}

/// Scriptable driver; clones share the same log and script
#[derive(Clone, Default)]
pub struct MockDriver {
    log: Arc<Mutex<MockLog>>,
    script: Arc<Mutex<MockScript>>,
}

impl MockDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `open` fail with `error`
    pub fn fail_next_open(&self, error: DriverError) {
        self.script.lock().unwrap().open_failures.push_back(error);
    }

    /// Answer reads containing `pattern` with `rows`
    pub fn respond(&self, pattern: &str, rows: RowSet) {
        self.script
            .lock()
            .unwrap()
            .responses
            .push((pattern.to_string(), rows));
    }

    /// Reject every statement containing `pattern`
    pub fn fail_statements_containing(&self, pattern: &str) {
        self.script.lock().unwrap().failing.push(pattern.to_string());
    }

    /// Row count reported by writes
    pub fn set_rows_affected(&self, rows_affected: Option<u64>) {
        self.script.lock().unwrap().rows_affected = rows_affected;
    }

    pub fn snapshot(&self) -> MockLog {
        self.log.lock().unwrap().clone()
    }
}

#[async_trait]
impl Driver for MockDriver {
    async fn open(
        &self,
        _profile: &ConnectionProfile,
        password: &str,
    ) -> DriverResult<Box<dyn DriverConnection>> {
        let mut log = self.log.lock().unwrap();
        log.open_attempts += 1;
        log.passwords.push(password.to_string());

        if let Some(error) = self.script.lock().unwrap().open_failures.pop_front() {
            return Err(error);
        }

        log.opens += 1;
        Ok(Box::new(MockConnection {
            log: Arc::clone(&self.log),
            script: Arc::clone(&self.script),
        }))
    }
}

struct MockConnection {
    log: Arc<Mutex<MockLog>>,
    script: Arc<Mutex<MockScript>>,
}

#[async_trait]
impl DriverConnection for MockConnection {
    async fn execute(&mut self, sql: &str, kind: StatementKind) -> DriverResult<Box<dyn Cursor>> {
        self.log
            .lock()
            .unwrap()
            .statements
            .push((sql.to_string(), kind));

        let script = self.script.lock().unwrap();
        if script.failing.iter().any(|p| sql.contains(p.as_str())) {
            return Err(DriverError::with_code("42P01", "relation does not exist"));
        }

        let cursor = match kind {
            StatementKind::Read => {
                let rows = script
                    .responses
                    .iter()
                    .find(|(pattern, _)| sql.contains(pattern.as_str()))
                    .map(|(_, rows)| rows.clone())
                    .unwrap_or_default();
                MockCursor {
                    log: Arc::clone(&self.log),
                    rows: Some(rows),
                    rows_affected: None,
                    released: false,
                }
            }
            StatementKind::Write => MockCursor {
                log: Arc::clone(&self.log),
                rows: None,
                rows_affected: script.rows_affected,
                released: false,
            },
        };
        Ok(Box::new(cursor))
    }

    async fn commit(&mut self) -> DriverResult<()> {
        self.log.lock().unwrap().commits += 1;
        Ok(())
    }

    async fn close(self: Box<Self>) -> DriverResult<()> {
        self.log.lock().unwrap().closes += 1;
        Ok(())
    }
}

struct MockCursor {
    log: Arc<Mutex<MockLog>>,
    rows: Option<RowSet>,
    rows_affected: Option<u64>,
    released: bool,
}

impl Cursor for MockCursor {
    fn fetch_all(&mut self) -> DriverResult<RowSet> {
        Ok(self.rows.take().unwrap_or_default())
    }

    fn rows_affected(&self) -> Option<u64> {
        self.rows_affected
    }

    fn release(&mut self) -> DriverResult<()> {
        if !self.released {
            self.released = true;
            self.log.lock().unwrap().releases += 1;
        }
        Ok(())
    }
}

/// Credential provider answering with a fixed password
pub struct StaticPassword {
    pub password: String,
    pub asked: usize,
}

impl StaticPassword {
    pub fn new(password: &str) -> Self {
        Self {
            password: password.to_string(),
            asked: 0,
        }
    }
}

impl CredentialProvider for StaticPassword {
    fn get_secret(&mut self, _prompt_label: &str) -> Result<String> {
        self.asked += 1;
        Ok(self.password.clone())
    }
}

pub fn pg_profile(database: &str) -> ConnectionProfile {
    ConnectionProfile::new("localhost", "5432", database, "app", Dialect::Postgres)
}

pub fn mysql_profile(database: &str) -> ConnectionProfile {
    ConnectionProfile::new("localhost", "3306", database, "app", Dialect::MySql)
}

/// A profile store in a fresh temporary directory
pub fn temp_store() -> (TempDir, ProfileStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = ProfileStore::load(dir.path().join("profiles.toml")).unwrap();
    (dir, store)
}

pub fn text(s: &str) -> Value {
    Value::Text(s.to_string())
}

pub fn row_set(column_names: &[&str], rows: Vec<Vec<Value>>) -> RowSet {
    RowSet {
        column_names: column_names.iter().map(|c| c.to_string()).collect(),
        rows,
    }
}
