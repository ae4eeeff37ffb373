//! Result display
//!
//! Formats query results and profile listings for the terminal.

use crate::config::profiles::ProfileStore;
use crate::database::executor::QueryResult;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};

/// Format a query result as a table or an acknowledgement line
pub fn format_result(result: &QueryResult) -> String {
    match result {
        QueryResult::Rows { column_names, rows } => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(column_names.clone());

            for row in rows {
                table.add_row(row.iter().map(|v| v.to_string()).collect::<Vec<String>>());
            }

            let noun = if rows.len() == 1 { "row" } else { "rows" };
            format!("{}\n({} {})", table, rows.len(), noun)
        }
        QueryResult::Ack {
            rows_affected: Some(n),
        } => format!("✓ {} row(s) affected", n),
        QueryResult::Ack {
            rows_affected: None,
        } => "✓ Statement executed".to_string(),
    }
}

/// Format the stored profiles, marking the selected one
pub fn format_profiles(store: &ProfileStore, selected: Option<usize>) -> String {
    if store.is_empty() {
        return "No profiles stored yet. Use /new to register one.".to_string();
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["#", "", "Dialect", "Host", "Port", "Database", "User"]);

    for (i, profile) in store.iter().enumerate() {
        let marker = if Some(i) == selected { "*" } else { "" };
        table.add_row(vec![
            i.to_string(),
            marker.to_string(),
            profile.dialect.to_string(),
            profile.host.clone(),
            profile.port.clone(),
            profile.database.clone(),
            profile.user.clone(),
        ]);
    }

    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::driver::Value;

    #[test]
    fn test_format_rows() {
        let result = QueryResult::Rows {
            column_names: vec!["id".to_string(), "name".to_string()],
            rows: vec![vec![Value::Int(1), Value::Null]],
        };
        let out = format_result(&result);
        assert!(out.contains("id"));
        assert!(out.contains("NULL"));
        assert!(out.ends_with("(1 row)"));
    }

    #[test]
    fn test_format_ack() {
        assert_eq!(
            format_result(&QueryResult::Ack {
                rows_affected: Some(3)
            }),
            "✓ 3 row(s) affected"
        );
        assert_eq!(
            format_result(&QueryResult::Ack {
                rows_affected: None
            }),
            "✓ Statement executed"
        );
    }
}
