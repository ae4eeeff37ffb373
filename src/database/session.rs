//! Database Session
//!
//! This module implements the Session struct, which owns at most one live
//! connection and moves through
//! `Unconfigured → Configured → Connecting → Connected → Disconnected`.
//!
//! A connection attempt that fails because the database does not exist
//! leaves the session `Configured` so the profile can be corrected; any other
//! failure moves it to `Failed`, from which `connect()` may be retried.
//! Handles are released through [`Session::disconnect`] or
//! [`Session::close`]; release failures are logged, never returned.

use crate::config::profiles::{ConnectionProfile, ProfileStore};
use crate::config::storage::DEFAULT_RESULT_LIMIT;
use crate::database::dialect::Dialect;
use crate::database::driver::{Driver, DriverConnection};
use crate::error::{DbConsoleError, Result};
use std::fmt;
use tracing::{debug, info, warn};

/// Source of passwords for connection attempts
///
/// Called once per [`Session::connect`]. The returned secret is used for
/// the open call and then dropped.
pub trait CredentialProvider {
    /// Obtain a secret for the given prompt label
    fn get_secret(&mut self, prompt_label: &str) -> Result<String>;
}

/// Lifecycle state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No profile selected yet
    Unconfigured,
    /// A profile is selected, no connection
    Configured,
    /// A connection attempt is in progress
    Connecting,
    /// A connection handle is live
    Connected,
    /// The last connection attempt failed
    Failed,
    /// The connection was released
    Disconnected,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Unconfigured => "unconfigured",
            SessionState::Configured => "configured",
            SessionState::Connecting => "connecting",
            SessionState::Connected => "connected",
            SessionState::Failed => "failed",
            SessionState::Disconnected => "disconnected",
        };
        write!(f, "{}", name)
    }
}

/// A stateful wrapper around at most one open connection
pub struct Session {
    /// Driver used to open connections
    driver: Box<dyn Driver>,
    /// Selected profile and its index in the store
    profile: Option<(usize, ConnectionProfile)>,
    /// Live connection handle; present exactly while Connected
    handle: Option<Box<dyn DriverConnection>>,
    /// Row limit for unbounded reads
    result_limit: Option<u64>,
    state: SessionState,
}

impl Session {
    /// Create an unconfigured session
    pub fn new(driver: Box<dyn Driver>) -> Self {
        Self {
            driver,
            profile: None,
            handle: None,
            result_limit: None,
            state: SessionState::Unconfigured,
        }
    }

    /// Create a session with an explicit result limit
    pub fn with_result_limit(driver: Box<dyn Driver>, limit: u64) -> Self {
        let mut session = Self::new(driver);
        session.result_limit = Some(limit);
        session
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Whether a connection handle is live
    pub fn is_connected(&self) -> bool {
        self.state == SessionState::Connected
    }

    /// The selected profile
    pub fn profile(&self) -> Option<&ConnectionProfile> {
        self.profile.as_ref().map(|(_, p)| p)
    }

    /// Store index of the selected profile
    pub fn profile_index(&self) -> Option<usize> {
        self.profile.as_ref().map(|(i, _)| *i)
    }

    /// Dialect of the selected profile
    pub fn dialect(&self) -> Option<Dialect> {
        self.profile().map(|p| p.dialect)
    }

    /// Row limit applied to unbounded reads
    pub fn result_limit(&self) -> u64 {
        self.result_limit.unwrap_or(DEFAULT_RESULT_LIMIT)
    }

    /// Change the row limit applied to unbounded reads
    pub fn set_result_limit(&mut self, limit: u64) {
        self.result_limit = Some(limit);
    }

    /// Select a stored profile
    ///
    /// Not allowed while Connected: use [`Session::reconnect`] to switch the
    /// profile of a live session.
    pub fn select_profile(&mut self, store: &ProfileStore, index: usize) -> Result<()> {
        self.ensure_not_live("select a profile")?;
        let profile = store.get(index)?.clone();
        self.configure(index, profile);
        Ok(())
    }

    /// Register a new profile in the store and select it
    pub fn register_profile(
        &mut self,
        store: &mut ProfileStore,
        profile: ConnectionProfile,
    ) -> Result<usize> {
        self.ensure_not_live("register a profile")?;
        let index = store.append(profile.clone())?;
        info!(index, profile = %profile.label(), "registered profile");
        self.configure(index, profile);
        Ok(index)
    }

    /// Replace the selected profile in place and keep it selected
    ///
    /// This is the recovery path after a `DatabaseNotFound` refusal.
    pub fn modify_profile(
        &mut self,
        store: &mut ProfileStore,
        profile: ConnectionProfile,
    ) -> Result<()> {
        self.ensure_not_live("modify the profile")?;
        let index = self
            .profile_index()
            .ok_or(DbConsoleError::InvalidState {
                operation: "modify the profile",
                state: self.state,
            })?;
        store.replace(index, profile.clone())?;
        info!(index, profile = %profile.label(), "modified profile");
        self.configure(index, profile);
        Ok(())
    }

    /// Open a connection for the selected profile
    ///
    /// Accepted from `Configured` and `Failed`. Each call asks `credentials`
    /// for a password exactly once.
    pub async fn connect(&mut self, credentials: &mut dyn CredentialProvider) -> Result<()> {
        if !matches!(self.state, SessionState::Configured | SessionState::Failed) {
            return Err(DbConsoleError::InvalidState {
                operation: "connect",
                state: self.state,
            });
        }
        let profile = match &self.profile {
            Some((_, profile)) => profile.clone(),
            None => {
                return Err(DbConsoleError::InvalidState {
                    operation: "connect",
                    state: self.state,
                })
            }
        };

        // A cancelled prompt leaves the state untouched
        let password =
            credentials.get_secret(&format!("Password for {}@{}", profile.user, profile.host))?;

        if self.state == SessionState::Failed {
            self.transition(SessionState::Configured);
        }
        self.transition(SessionState::Connecting);
        info!(profile = %profile.label(), "connecting");

        match self.driver.open(&profile, &password).await {
            Ok(handle) => {
                self.handle = Some(handle);
                self.transition(SessionState::Connected);
                info!(database = %profile.database, "connected");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "connection attempt failed");
                let err = DbConsoleError::connection(e.code.as_deref(), e.message);
                if err.is_database_not_found() {
                    self.transition(SessionState::Configured);
                } else {
                    self.transition(SessionState::Failed);
                }
                Err(err)
            }
        }
    }

    /// Release the connection; a no-op unless Connected
    pub async fn disconnect(&mut self) {
        if self.state != SessionState::Connected {
            debug!(state = %self.state, "disconnect ignored");
            return;
        }
        self.release_handle().await;
        self.transition(SessionState::Disconnected);
    }

    /// Disconnect, select `index`, and connect again
    pub async fn reconnect(
        &mut self,
        store: &ProfileStore,
        index: usize,
        credentials: &mut dyn CredentialProvider,
    ) -> Result<()> {
        self.disconnect().await;
        self.select_profile(store, index)?;
        self.connect(credentials).await
    }

    /// Tear the session down, releasing any live handle
    pub async fn close(mut self) {
        self.release_handle().await;
        if self.state == SessionState::Connected {
            self.transition(SessionState::Disconnected);
        }
    }

    /// Borrow the live connection
    pub(crate) fn connection(&mut self) -> Result<&mut dyn DriverConnection> {
        match (&self.state, self.handle.as_mut()) {
            (SessionState::Connected, Some(handle)) => Ok(handle.as_mut()),
            _ => Err(DbConsoleError::NotConnected(self.state)),
        }
    }

    fn configure(&mut self, index: usize, profile: ConnectionProfile) {
        self.profile = Some((index, profile));
        if self.result_limit.is_none() {
            self.result_limit = Some(DEFAULT_RESULT_LIMIT);
        }
        self.transition(SessionState::Configured);
    }

    fn ensure_not_live(&self, operation: &'static str) -> Result<()> {
        match self.state {
            SessionState::Connected | SessionState::Connecting => {
                Err(DbConsoleError::InvalidState {
                    operation,
                    state: self.state,
                })
            }
            _ => Ok(()),
        }
    }

    async fn release_handle(&mut self) {
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.close().await {
                let err = DbConsoleError::Resource(e.to_string());
                warn!(error = %err, "failed to close connection");
            } else {
                debug!("connection closed");
            }
        }
    }

    fn transition(&mut self, to: SessionState) {
        debug!(from = %self.state, to = %to, "session state");
        self.state = to;
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.handle.take().is_some() {
            warn!("session dropped with a live connection; call Session::close");
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state)
            .field("profile", &self.profile)
            .field("result_limit", &self.result_limit)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::driver::DriverResult;
    use async_trait::async_trait;

    struct RefusingDriver;

    #[async_trait]
    impl Driver for RefusingDriver {
        async fn open(
            &self,
            _profile: &ConnectionProfile,
            _password: &str,
        ) -> DriverResult<Box<dyn DriverConnection>> {
            Err(crate::database::driver::DriverError::new("connection refused"))
        }
    }

    struct NoPassword;

    impl CredentialProvider for NoPassword {
        fn get_secret(&mut self, _prompt_label: &str) -> Result<String> {
            Ok(String::new())
        }
    }

    #[test]
    fn test_new_session_is_unconfigured() {
        let session = Session::new(Box::new(RefusingDriver));
        assert_eq!(session.state(), SessionState::Unconfigured);
        assert!(session.profile().is_none());
        assert_eq!(session.result_limit(), DEFAULT_RESULT_LIMIT);
    }

    #[test]
    fn test_disconnect_without_connection_is_noop() {
        let mut session = Session::new(Box::new(RefusingDriver));
        tokio_test::block_on(session.disconnect());
        tokio_test::block_on(session.disconnect());
        assert_eq!(session.state(), SessionState::Unconfigured);
    }

    #[test]
    fn test_connect_requires_profile() {
        let mut session = Session::new(Box::new(RefusingDriver));
        let result = tokio_test::block_on(session.connect(&mut NoPassword));
        assert!(matches!(
            result,
            Err(DbConsoleError::InvalidState {
                operation: "connect",
                state: SessionState::Unconfigured
            })
        ));
    }

    #[test]
    fn test_not_connected_connection() {
        let mut session = Session::new(Box::new(RefusingDriver));
        assert!(matches!(
            session.connection(),
            Err(DbConsoleError::NotConnected(SessionState::Unconfigured))
        ));
    }

    #[test]
    fn test_refused_connection_moves_to_failed() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ProfileStore::load(dir.path().join("profiles.toml")).unwrap();
        let mut session = Session::with_result_limit(Box::new(RefusingDriver), 10);

        session
            .register_profile(
                &mut store,
                ConnectionProfile::new("localhost", "5432", "shop", "app", Dialect::Postgres),
            )
            .unwrap();
        assert_eq!(session.state(), SessionState::Configured);
        assert_eq!(session.result_limit(), 10);

        let result = tokio_test::block_on(session.connect(&mut NoPassword));
        assert!(matches!(result, Err(DbConsoleError::Connection { .. })));
        assert_eq!(session.state(), SessionState::Failed);
    }

    struct CancelledPrompt;

    impl CredentialProvider for CancelledPrompt {
        fn get_secret(&mut self, _prompt_label: &str) -> Result<String> {
            Err(DbConsoleError::Io(std::io::Error::new(
                std::io::ErrorKind::Interrupted,
                "password entry cancelled",
            )))
        }
    }

    #[test]
    fn test_cancelled_retry_stays_failed() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ProfileStore::load(dir.path().join("profiles.toml")).unwrap();
        let mut session = Session::new(Box::new(RefusingDriver));
        session
            .register_profile(
                &mut store,
                ConnectionProfile::new("localhost", "5432", "shop", "app", Dialect::Postgres),
            )
            .unwrap();

        let _ = tokio_test::block_on(session.connect(&mut NoPassword));
        assert_eq!(session.state(), SessionState::Failed);

        let result = tokio_test::block_on(session.connect(&mut CancelledPrompt));
        assert!(matches!(result, Err(DbConsoleError::Io(_))));
        assert_eq!(session.state(), SessionState::Failed);
    }

    #[test]
    fn test_state_display() {
        assert_eq!(SessionState::Connected.to_string(), "connected");
        assert_eq!(SessionState::Unconfigured.to_string(), "unconfigured");
    }
}
