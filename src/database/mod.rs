//! Database module
//!
//! This module provides the session state machine, dialect-aware query
//! execution, and schema introspection with tree rendering.

pub mod dialect;
pub mod driver;
pub mod executor;
pub mod introspector;
pub mod schema;
pub mod session;
pub mod sqlx_driver;
pub mod tree;

// Re-exports
pub use dialect::Dialect;
pub use driver::{Cursor, CursorGuard, Driver, DriverConnection, DriverError, RowSet, StatementKind, Value};
pub use executor::{apply_limit, execute, QueryResult};
pub use introspector::introspect;
pub use schema::{CatalogColumn, SchemaTree};
pub use session::{CredentialProvider, Session, SessionState};
pub use sqlx_driver::SqlxDriver;
pub use tree::render;
