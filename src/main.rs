// db-console: an interactive console for PostgreSQL and MySQL
//
// This is the main entry point for the db-console application.

use anyhow::{Context, Result};
use db_console::cli::Repl;
use db_console::config::{ProfileStore, Settings};
use db_console::database::{Session, SqlxDriver};
use db_console::logging::init_logging;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let settings = Settings::load().context("failed to load settings")?;
    init_logging(settings.log_filter.as_deref());

    let profiles_path = settings.profiles_path()?;
    let store = ProfileStore::load(&profiles_path)
        .with_context(|| format!("failed to open profiles at {}", profiles_path.display()))?;

    let session = Session::with_result_limit(Box::new(SqlxDriver::new()), settings.result_limit);

    let repl = Repl::new(session, store, settings)?;
    repl.run().await?;

    Ok(())
}
