//! Configuration module
//!
//! This module handles application settings and the connection profile store.

pub mod profiles;
pub mod storage;

// Re-exports
pub use profiles::{ConnectionProfile, ProfileStore};
pub use storage::{Settings, DEFAULT_RESULT_LIMIT};
