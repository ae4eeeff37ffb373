//! Result export (CSV / JSON)
//!
//! Serialisation is pure; [`write_export`] does the file I/O. Exporting is
//! always the caller's decision after receiving a `Rows` result.

use crate::database::driver::Value;
use crate::error::Result;
use std::fs;
use std::path::{Path, PathBuf};

/// Export format selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    /// Pick the format from a path's extension (CSV unless `.json`)
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => ExportFormat::Json,
            _ => ExportFormat::Csv,
        }
    }

    /// File extension for this format (without leading dot)
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

/// Serialize rows as RFC 4180 CSV
pub fn to_csv(column_names: &[String], rows: &[Vec<Value>]) -> String {
    let mut out = String::new();

    for (i, col) in column_names.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        csv_escape_into(&mut out, col);
    }
    out.push('\n');

    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            // NULL exports as an empty field
            if !cell.is_null() {
                csv_escape_into(&mut out, &cell.to_string());
            }
        }
        out.push('\n');
    }

    out
}

/// Serialize rows as a JSON array of objects keyed by column name
pub fn to_json(column_names: &[String], rows: &[Vec<Value>]) -> Result<String> {
    let objects: Vec<serde_json::Map<String, serde_json::Value>> = rows
        .iter()
        .map(|row| {
            column_names
                .iter()
                .zip(row.iter())
                .map(|(name, cell)| serde_json::to_value(cell).map(|v| (name.clone(), v)))
                .collect::<std::result::Result<_, serde_json::Error>>()
        })
        .collect::<std::result::Result<_, serde_json::Error>>()?;

    Ok(serde_json::to_string_pretty(&objects)?)
}

/// Resolve the file an export should be written to
///
/// Directories (existing, or spelled with a trailing separator) get a
/// timestamped file name; relative paths are placed under `export_dir`.
pub fn resolve_export_path(path: &Path, export_dir: Option<&Path>) -> PathBuf {
    let path = match export_dir {
        Some(dir) if path.is_relative() => dir.join(path),
        _ => path.to_path_buf(),
    };

    let spelled_as_dir = path
        .to_str()
        .map(|s| s.ends_with('/') || s.ends_with(std::path::MAIN_SEPARATOR))
        .unwrap_or(false);

    if path.is_dir() || spelled_as_dir {
        let name = format!(
            "export_{}.{}",
            chrono::Local::now().format("%Y%m%d_%H%M%S"),
            ExportFormat::Csv.extension()
        );
        path.join(name)
    } else {
        path
    }
}

/// Write rows to `path` in the format implied by its extension
pub fn write_export(path: &Path, column_names: &[String], rows: &[Vec<Value>]) -> Result<()> {
    let content = match ExportFormat::from_path(path) {
        ExportFormat::Csv => to_csv(column_names, rows),
        ExportFormat::Json => to_json(column_names, rows)?,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, content)?;
    Ok(())
}

/// Quote a CSV field if it contains a delimiter, quote or line break
fn csv_escape_into(out: &mut String, field: &str) {
    if field.contains([',', '"', '\n', '\r']) {
        out.push('"');
        out.push_str(&field.replace('"', "\"\""));
        out.push('"');
    } else {
        out.push_str(field);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Vec<String>, Vec<Vec<Value>>) {
        (
            vec!["id".to_string(), "note".to_string()],
            vec![
                vec![Value::Int(1), Value::Text("plain".to_string())],
                vec![Value::Int(2), Value::Text("has, comma \"and\" quotes".to_string())],
                vec![Value::Int(3), Value::Null],
            ],
        )
    }

    #[test]
    fn test_to_csv() {
        let (cols, rows) = sample();
        assert_eq!(
            to_csv(&cols, &rows),
            "id,note\n1,plain\n2,\"has, comma \"\"and\"\" quotes\"\n3,\n"
        );
    }

    #[test]
    fn test_to_json() {
        let (cols, rows) = sample();
        let json: serde_json::Value = serde_json::from_str(&to_json(&cols, &rows).unwrap()).unwrap();
        assert_eq!(json[0]["id"], 1);
        assert_eq!(json[0]["note"], "plain");
        assert!(json[2]["note"].is_null());
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(ExportFormat::from_path(Path::new("a.json")), ExportFormat::Json);
        assert_eq!(ExportFormat::from_path(Path::new("a.JSON")), ExportFormat::Json);
        assert_eq!(ExportFormat::from_path(Path::new("a.csv")), ExportFormat::Csv);
        assert_eq!(ExportFormat::from_path(Path::new("a")), ExportFormat::Csv);
    }

    #[test]
    fn test_resolve_export_path() {
        let dir = tempfile::tempdir().unwrap();

        let file = resolve_export_path(Path::new("users.csv"), Some(dir.path()));
        assert_eq!(file, dir.path().join("users.csv"));

        let generated = resolve_export_path(dir.path(), None);
        assert_eq!(generated.parent(), Some(dir.path()));
        assert!(generated
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with("export_") && n.ends_with(".csv")));
    }

    #[test]
    fn test_write_export() {
        let dir = tempfile::tempdir().unwrap();
        let (cols, rows) = sample();

        let path = dir.path().join("out").join("rows.json");
        write_export(&path, &cols, &rows).unwrap();
        let written = fs::read_to_string(&path).unwrap();
        assert!(written.contains("\"plain\""));
    }
}
