//! SQL dialects
//!
//! This module isolates every dialect-specific string the session manager
//! needs: limit clauses, catalog queries and column label formatting.
//! Adding a backend means adding a variant here and nowhere else.

use crate::database::driver::Value;
use crate::database::schema::CatalogColumn;
use crate::error::{DbConsoleError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Supported database dialects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dialect {
    /// PostgreSQL
    #[serde(rename = "postgres", alias = "postgresql", alias = "pg")]
    Postgres,
    /// MySQL/MariaDB
    #[serde(rename = "mysql", alias = "mariadb")]
    MySql,
}

/// Tables, columns, length and primary-key membership for the `public` schema.
///
/// Rows are ordered by table name then ordinal position; the tree builder
/// depends on that ordering.
const POSTGRES_TABLE_CATALOG: &str = r#"
    SELECT
        c.table_name,
        c.column_name,
        c.data_type,
        COALESCE(
            c.character_maximum_length,
            CASE WHEN c.data_type = 'numeric' THEN c.numeric_precision END
        ) AS max_length,
        CASE WHEN kcu.column_name IS NOT NULL THEN 'YES' ELSE 'NO' END AS is_primary_key
    FROM information_schema.columns c
    JOIN information_schema.tables t
        ON t.table_schema = c.table_schema
        AND t.table_name = c.table_name
        AND t.table_type = 'BASE TABLE'
    LEFT JOIN information_schema.table_constraints tc
        ON tc.table_schema = c.table_schema
        AND tc.table_name = c.table_name
        AND tc.constraint_type = 'PRIMARY KEY'
    LEFT JOIN information_schema.key_column_usage kcu
        ON kcu.constraint_name = tc.constraint_name
        AND kcu.table_schema = tc.table_schema
        AND kcu.table_name = c.table_name
        AND kcu.column_name = c.column_name
    WHERE c.table_schema = 'public'
    ORDER BY c.table_name, c.ordinal_position
"#;

const POSTGRES_VIEW_CATALOG: &str = r#"
    SELECT table_name
    FROM information_schema.views
    WHERE table_schema = 'public'
    ORDER BY table_name
"#;

/// Tables and columns of the current database, with the composite type
/// (`varchar(255)`, `int unsigned`, ...) and the raw key flag.
const MYSQL_TABLE_CATALOG: &str = r#"
    SELECT
        c.TABLE_NAME,
        c.COLUMN_NAME,
        c.COLUMN_TYPE,
        c.COLUMN_KEY
    FROM information_schema.COLUMNS c
    JOIN information_schema.TABLES t
        ON t.TABLE_SCHEMA = c.TABLE_SCHEMA
        AND t.TABLE_NAME = c.TABLE_NAME
        AND t.TABLE_TYPE = 'BASE TABLE'
    WHERE c.TABLE_SCHEMA = DATABASE()
    ORDER BY c.TABLE_NAME, c.ORDINAL_POSITION
"#;

const MYSQL_VIEW_CATALOG: &str = r#"
    SELECT TABLE_NAME
    FROM information_schema.VIEWS
    WHERE TABLE_SCHEMA = DATABASE()
    ORDER BY TABLE_NAME
"#;

impl Dialect {
    /// All supported dialects
    pub const ALL: [Dialect; 2] = [Dialect::Postgres, Dialect::MySql];

    /// Get the default port for this database
    pub fn default_port(&self) -> u16 {
        match self {
            Dialect::Postgres => 5432,
            Dialect::MySql => 3306,
        }
    }

    /// Get the name of this dialect
    pub fn name(&self) -> &'static str {
        match self {
            Dialect::Postgres => "PostgreSQL",
            Dialect::MySql => "MySQL",
        }
    }

    /// Keyword whose presence marks a statement as already limited
    pub fn limit_keyword(&self) -> &'static str {
        match self {
            Dialect::Postgres | Dialect::MySql => "LIMIT",
        }
    }

    /// Row-limiting clause appended to unbounded reads
    pub fn limit_clause(&self, limit: u64) -> String {
        format!("{} {}", self.limit_keyword(), limit)
    }

    /// Catalog query enumerating table columns, ordered by table then position
    pub fn table_catalog_query(&self) -> &'static str {
        match self {
            Dialect::Postgres => POSTGRES_TABLE_CATALOG,
            Dialect::MySql => MYSQL_TABLE_CATALOG,
        }
    }

    /// Catalog query enumerating view names
    pub fn view_catalog_query(&self) -> &'static str {
        match self {
            Dialect::Postgres => POSTGRES_VIEW_CATALOG,
            Dialect::MySql => MYSQL_VIEW_CATALOG,
        }
    }

    /// Decode one row of [`Dialect::table_catalog_query`]
    pub fn parse_column_row(&self, row: &[Value]) -> Result<CatalogColumn> {
        let text = |idx: usize, field: &str| -> Result<String> {
            match row.get(idx) {
                Some(Value::Null) | None => Err(DbConsoleError::Introspection(format!(
                    "catalog row is missing {}",
                    field
                ))),
                Some(value) => Ok(value.to_string()),
            }
        };

        match self {
            Dialect::Postgres => {
                let max_length = match row.get(3) {
                    Some(Value::Null) | None => None,
                    Some(Value::Int(n)) => Some(*n),
                    Some(other) => Some(other.to_string().parse::<i64>().map_err(|_| {
                        DbConsoleError::Introspection(format!(
                            "catalog row has a non-numeric length: {}",
                            other
                        ))
                    })?),
                };
                Ok(CatalogColumn {
                    table_name: text(0, "table_name")?,
                    column_name: text(1, "column_name")?,
                    data_type: text(2, "data_type")?,
                    max_length,
                    key: text(4, "is_primary_key")?,
                })
            }
            Dialect::MySql => Ok(CatalogColumn {
                table_name: text(0, "TABLE_NAME")?,
                column_name: text(1, "COLUMN_NAME")?,
                data_type: text(2, "COLUMN_TYPE")?,
                max_length: None,
                key: match row.get(3) {
                    Some(Value::Null) | None => String::new(),
                    Some(value) => value.to_string(),
                },
            }),
        }
    }

    /// Label shown for a column node in the schema tree
    ///
    /// Postgres: `name type(length) PK`; MySQL: `name type key`, with the
    /// trailing space dropped when the key flag is empty.
    pub fn format_column_label(&self, column: &CatalogColumn) -> String {
        match self {
            Dialect::Postgres => {
                let mut label = format!("{} {}", column.column_name, column.data_type);
                if let Some(len) = column.max_length {
                    label.push_str(&format!("({})", len));
                }
                if column.key.eq_ignore_ascii_case("YES") {
                    label.push_str(" PK");
                }
                label
            }
            Dialect::MySql => format!(
                "{} {} {}",
                column.column_name, column.data_type, column.key
            )
            .trim_end()
            .to_string(),
        }
    }
}

impl FromStr for Dialect {
    type Err = DbConsoleError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "postgresql" | "postgres" | "pg" => Ok(Dialect::Postgres),
            "mysql" | "mariadb" => Ok(Dialect::MySql),
            _ => Err(DbConsoleError::Config(format!(
                "unsupported dialect '{}' (expected postgres or mysql)",
                s
            ))),
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
