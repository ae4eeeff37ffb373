//! Connection Profiles
//!
//! Named connection parameters, persisted as an ordered array of
//! `[[profiles]]` tables. Profiles never carry credentials.

use crate::database::dialect::Dialect;
use crate::error::{DbConsoleError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Connection parameters for one database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionProfile {
    /// Database host
    pub host: String,
    /// Port, kept as text the way it was entered
    pub port: String,
    /// Database name
    pub database: String,
    /// Username
    pub user: String,
    /// SQL dialect of the server
    pub dialect: Dialect,
}

impl ConnectionProfile {
    /// Create a profile
    pub fn new(
        host: impl Into<String>,
        port: impl Into<String>,
        database: impl Into<String>,
        user: impl Into<String>,
        dialect: Dialect,
    ) -> Self {
        Self {
            host: host.into(),
            port: port.into(),
            database: database.into(),
            user: user.into(),
            dialect,
        }
    }

    /// The port as a number, falling back to the dialect's default when empty
    pub fn port_number(&self) -> Result<u16> {
        let port = self.port.trim();
        if port.is_empty() {
            return Ok(self.dialect.default_port());
        }
        port.parse::<u16>()
            .map_err(|_| DbConsoleError::Config(format!("invalid port: {}", self.port)))
    }

    /// Display label: `user@host:port/database (Dialect)`
    pub fn label(&self) -> String {
        format!(
            "{}@{}:{}/{} ({})",
            self.user, self.host, self.port, self.database, self.dialect
        )
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ProfilesFile {
    #[serde(default)]
    profiles: Vec<ConnectionProfile>,
}

/// Ordered, index-addressed collection of profiles backed by a file
///
/// Indices are stable for the lifetime of the store: profiles are only
/// appended or replaced in place.
#[derive(Debug)]
pub struct ProfileStore {
    path: PathBuf,
    profiles: Vec<ConnectionProfile>,
}

impl ProfileStore {
    /// Load profiles from `path`, creating an empty file if it doesn't exist
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if !path.exists() {
            info!(path = %path.display(), "creating empty profile store");
            let store = Self {
                path,
                profiles: Vec::new(),
            };
            store.persist()?;
            return Ok(store);
        }

        let content = fs::read_to_string(&path)?;
        let file: ProfilesFile = toml::from_str(&content).map_err(|e| {
            DbConsoleError::Config(format!(
                "malformed profile record in {}: {}",
                path.display(),
                e
            ))
        })?;

        debug!(path = %path.display(), count = file.profiles.len(), "loaded profiles");
        Ok(Self {
            path,
            profiles: file.profiles,
        })
    }

    /// Add a profile at the end and persist; returns its index
    pub fn append(&mut self, profile: ConnectionProfile) -> Result<usize> {
        self.profiles.push(profile);
        if let Err(e) = self.persist() {
            self.profiles.pop();
            return Err(e);
        }
        Ok(self.profiles.len() - 1)
    }

    /// Overwrite the profile at `index` and persist
    pub fn replace(&mut self, index: usize, profile: ConnectionProfile) -> Result<()> {
        let len = self.profiles.len();
        let slot = self
            .profiles
            .get_mut(index)
            .ok_or(DbConsoleError::IndexOutOfRange { index, len })?;
        let previous = std::mem::replace(slot, profile);

        if let Err(e) = self.persist() {
            self.profiles[index] = previous;
            return Err(e);
        }
        Ok(())
    }

    /// Get the profile at `index`
    pub fn get(&self, index: usize) -> Result<&ConnectionProfile> {
        self.profiles.get(index).ok_or(DbConsoleError::IndexOutOfRange {
            index,
            len: self.profiles.len(),
        })
    }

    /// Number of stored profiles
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// Whether no profiles are stored
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Profiles in index order
    pub fn iter(&self) -> impl Iterator<Item = &ConnectionProfile> {
        self.profiles.iter()
    }

    /// Backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whole-file overwrite of the backing resource
    fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = ProfilesFile {
            profiles: self.profiles.clone(),
        };
        let content = toml::to_string_pretty(&file)?;
        fs::write(&self.path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pg(db: &str) -> ConnectionProfile {
        ConnectionProfile::new("localhost", "5432", db, "postgres", Dialect::Postgres)
    }

    #[test]
    fn test_load_missing_creates_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("profiles.toml");

        let store = ProfileStore::load(&path).unwrap();
        assert!(store.is_empty());
        assert!(path.exists());

        let reloaded = ProfileStore::load(&path).unwrap();
        assert_eq!(reloaded.len(), 0);
    }

    #[test]
    fn test_append_then_get() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ProfileStore::load(dir.path().join("profiles.toml")).unwrap();

        let first = store.append(pg("shop")).unwrap();
        let second = store
            .append(ConnectionProfile::new("db", "3306", "crm", "root", Dialect::MySql))
            .unwrap();

        assert_eq!(first, 0);
        assert_eq!(second, 1);
        assert_eq!(store.get(first).unwrap(), &pg("shop"));
        assert_eq!(store.get(second).unwrap().dialect, Dialect::MySql);
    }

    #[test]
    fn test_indices_survive_reload_and_replace() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profiles.toml");
        let mut store = ProfileStore::load(&path).unwrap();

        store.append(pg("a")).unwrap();
        store.append(pg("b")).unwrap();
        store.append(pg("c")).unwrap();
        store.replace(1, pg("b2")).unwrap();

        let reloaded = ProfileStore::load(&path).unwrap();
        let names: Vec<&str> = reloaded.iter().map(|p| p.database.as_str()).collect();
        assert_eq!(names, vec!["a", "b2", "c"]);
    }

    #[test]
    fn test_out_of_range() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ProfileStore::load(dir.path().join("profiles.toml")).unwrap();
        store.append(pg("a")).unwrap();

        assert!(matches!(
            store.get(3),
            Err(DbConsoleError::IndexOutOfRange { index: 3, len: 1 })
        ));
        assert!(matches!(
            store.replace(1, pg("x")),
            Err(DbConsoleError::IndexOutOfRange { index: 1, len: 1 })
        ));
        assert_eq!(store.get(0).unwrap().database, "a");
    }

    #[test]
    fn test_malformed_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profiles.toml");
        fs::write(&path, "[[profiles]]\nhost = \"localhost\"\n").unwrap();

        assert!(matches!(ProfileStore::load(&path), Err(DbConsoleError::Config(_))));
    }

    #[test]
    fn test_dialect_aliases_in_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profiles.toml");
        fs::write(
            &path,
            r#"
[[profiles]]
user = "app"
dialect = "postgresql"
host = "10.0.0.1"
port = "5433"
database = "shop"

[[profiles]]
host = "10.0.0.2"
port = "3306"
database = "crm"
user = "root"
dialect = "mariadb"
"#,
        )
        .unwrap();

        let store = ProfileStore::load(&path).unwrap();
        assert_eq!(store.get(0).unwrap().dialect, Dialect::Postgres);
        assert_eq!(store.get(1).unwrap().dialect, Dialect::MySql);
    }

    #[test]
    fn test_port_number() {
        assert_eq!(pg("a").port_number().unwrap(), 5432);

        let mut profile = pg("a");
        profile.port = String::new();
        assert_eq!(profile.port_number().unwrap(), 5432);

        profile.port = "abc".to_string();
        assert!(profile.port_number().is_err());
    }
}
