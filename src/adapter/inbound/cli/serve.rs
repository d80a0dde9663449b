//! Handlers for `serve` and `migrate`.

use crate::adapter::inbound::http;
use crate::adapter::outbound::sqlite::database::connection::{create_pool, run_migrations};
use crate::error::Result;
use crate::infrastructure::bootstrap::build_services;
use crate::infrastructure::config::Config;

use super::command::ServeArgs;
use super::output;

/// Execute `augur serve`.
pub async fn execute(mut config: Config, args: &ServeArgs) -> Result<()> {
    if let Some(bind) = &args.bind {
        config.server.bind.clone_from(bind);
    }
    let services = build_services(&config)?;
    http::serve(&config.server, services).await
}

/// Execute `augur migrate`.
pub fn migrate(config: &Config) -> Result<()> {
    let database = &config.database;
    let pool = create_pool(
        &database.url,
        database.max_connections,
        database.connection_options(),
    )?;
    let applied = run_migrations(&pool)?;

    if output::is_json() {
        output::json_output(&serde_json::json!({
            "database": database.url,
            "applied": applied,
        }));
        return Ok(());
    }
    output::field("Database", &database.url);
    if applied == 0 {
        output::success("Schema is up to date");
    } else {
        output::success(&format!("Applied {applied} migration(s)"));
    }
    Ok(())
}
