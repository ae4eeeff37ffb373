//! Logging setup
//!
//! Installs a `tracing` subscriber writing to stderr. The filter is taken
//! from `DB_CONSOLE_LOG`, then `RUST_LOG`, then the configured filter, and
//! defaults to `warn` so log lines don't interleave with query output.

use tracing_subscriber::EnvFilter;

/// Environment variable overriding the log filter
pub const LOG_ENV: &str = "DB_CONSOLE_LOG";

const DEFAULT_FILTER: &str = "warn";

/// Initialize logging. Safe to call more than once; later calls are ignored.
pub fn init_logging(configured: Option<&str>) {
    let filter = build_env_filter(configured);

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Resolve the filter directive that will be used
pub fn resolve_filter(configured: Option<&str>) -> String {
    std::env::var(LOG_ENV)
        .ok()
        .or_else(|| std::env::var("RUST_LOG").ok())
        .filter(|f| !f.trim().is_empty())
        .or_else(|| configured.map(str::to_string))
        .unwrap_or_else(|| DEFAULT_FILTER.to_string())
}

fn build_env_filter(configured: Option<&str>) -> EnvFilter {
    let directive = resolve_filter(configured);
    EnvFilter::try_new(&directive).unwrap_or_else(|e| {
        eprintln!("Warning: invalid log filter '{}': {}. Using '{}'.", directive, e, DEFAULT_FILTER);
        EnvFilter::new(DEFAULT_FILTER)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configured_filter_used_without_env() {
        if std::env::var(LOG_ENV).is_ok() || std::env::var("RUST_LOG").is_ok() {
            return;
        }
        assert_eq!(resolve_filter(Some("db_console=debug")), "db_console=debug");
        assert_eq!(resolve_filter(None), DEFAULT_FILTER);
    }

    #[test]
    fn test_init_logging_twice() {
        init_logging(Some("info"));
        init_logging(Some("debug"));
    }
}
