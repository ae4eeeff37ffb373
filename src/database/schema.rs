//! Schema data structures
//!
//! This module defines the catalog rows returned by introspection and the
//! hierarchical tree they are folded into:
//!
//! ```text
//! shop
//! ├── Tables
//! │   └── users
//! │       ├── id integer PK
//! │       └── name varchar(255)
//! └── Views
//!     └── active_users
//! ```

use crate::database::dialect::Dialect;

/// Label of the node holding every table
pub const TABLES_LABEL: &str = "Tables";

/// Label of the node holding every view
pub const VIEWS_LABEL: &str = "Views";

/// One column as reported by a dialect's table catalog query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogColumn {
    /// Owning table
    pub table_name: String,
    /// Column name
    pub column_name: String,
    /// Base type (Postgres) or composite type string (MySQL)
    pub data_type: String,
    /// Maximum length / precision, when the dialect reports one separately
    pub max_length: Option<i64>,
    /// Key flag: `YES`/`NO` primary-key membership (Postgres) or the raw
    /// `COLUMN_KEY` value (MySQL, possibly empty)
    pub key: String,
}

impl CatalogColumn {
    /// Create a catalog column
    pub fn new(
        table_name: impl Into<String>,
        column_name: impl Into<String>,
        data_type: impl Into<String>,
        max_length: Option<i64>,
        key: impl Into<String>,
    ) -> Self {
        Self {
            table_name: table_name.into(),
            column_name: column_name.into(),
            data_type: data_type.into(),
            max_length,
            key: key.into(),
        }
    }
}

/// A node of the schema tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaTree {
    pub label: String,
    pub children: Vec<SchemaTree>,
}

impl SchemaTree {
    /// Create a node without children
    pub fn leaf(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            children: Vec::new(),
        }
    }

    /// Create a node with children
    pub fn branch(label: impl Into<String>, children: Vec<SchemaTree>) -> Self {
        Self {
            label: label.into(),
            children,
        }
    }

    /// Fold catalog rows into a tree rooted at `database`
    ///
    /// `columns` must be ordered by table name then ordinal position: a new
    /// table node is opened whenever the table name differs from the
    /// previous row's, so unordered input yields split table nodes.
    pub fn from_catalog(
        database: impl Into<String>,
        dialect: Dialect,
        columns: &[CatalogColumn],
        views: &[String],
    ) -> Self {
        let mut tables: Vec<SchemaTree> = Vec::new();

        for column in columns {
            let label = dialect.format_column_label(column);
            match tables.last_mut() {
                Some(table) if table.label == column.table_name => {
                    table.children.push(SchemaTree::leaf(label));
                }
                _ => {
                    tables.push(SchemaTree::branch(
                        column.table_name.clone(),
                        vec![SchemaTree::leaf(label)],
                    ));
                }
            }
        }

        let views = views.iter().map(SchemaTree::leaf).collect();

        SchemaTree::branch(
            database,
            vec![
                SchemaTree::branch(TABLES_LABEL, tables),
                SchemaTree::branch(VIEWS_LABEL, views),
            ],
        )
    }

    /// Find a direct child by label
    pub fn child(&self, label: &str) -> Option<&SchemaTree> {
        self.children.iter().find(|c| c.label == label)
    }

    /// Whether this node has no children
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(node: &SchemaTree) -> Vec<&str> {
        node.children.iter().map(|c| c.label.as_str()).collect()
    }

    #[test]
    fn test_groups_consecutive_rows() {
        let columns = vec![
            CatalogColumn::new("orders", "id", "integer", None, "YES"),
            CatalogColumn::new("orders", "total", "numeric", Some(10), "NO"),
            CatalogColumn::new("users", "id", "integer", None, "YES"),
        ];
        let tree = SchemaTree::from_catalog("shop", Dialect::Postgres, &columns, &[]);

        assert_eq!(tree.label, "shop");
        assert_eq!(labels(&tree), vec![TABLES_LABEL, VIEWS_LABEL]);

        let tables = tree.child(TABLES_LABEL).unwrap();
        assert_eq!(labels(tables), vec!["orders", "users"]);
        assert_eq!(
            labels(tables.child("orders").unwrap()),
            vec!["id integer PK", "total numeric(10)"]
        );
        assert!(tree.child(VIEWS_LABEL).unwrap().is_leaf());
    }

    #[test]
    fn test_unordered_rows_split_tables() {
        let columns = vec![
            CatalogColumn::new("a", "x", "int", None, ""),
            CatalogColumn::new("b", "y", "int", None, ""),
            CatalogColumn::new("a", "z", "int", None, ""),
        ];
        let tree = SchemaTree::from_catalog("db", Dialect::MySql, &columns, &[]);
        assert_eq!(labels(tree.child(TABLES_LABEL).unwrap()), vec!["a", "b", "a"]);
    }

    #[test]
    fn test_views_are_leaves() {
        let views = vec!["active_users".to_string(), "big_orders".to_string()];
        let tree = SchemaTree::from_catalog("db", Dialect::MySql, &[], &views);

        let view_node = tree.child(VIEWS_LABEL).unwrap();
        assert_eq!(labels(view_node), vec!["active_users", "big_orders"]);
        assert!(view_node.children.iter().all(SchemaTree::is_leaf));
        assert!(tree.child(TABLES_LABEL).unwrap().is_leaf());
    }
}
