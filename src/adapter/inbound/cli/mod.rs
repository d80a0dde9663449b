//! Command-line entry point.

pub mod command;
pub mod leaderboard;
pub mod output;
pub mod provision;
pub mod score;
pub mod serve;

use crate::error::{Error, Result};
use crate::infrastructure::config::Config;

use command::{Cli, Commands, ProvisionCommand};
use output::OutputConfig;

/// Run a parsed command line.
pub async fn run(cli: Cli) -> Result<()> {
    output::configure(OutputConfig {
        json: cli.json,
        quiet: cli.quiet,
    });

    let config = Config::load_or_default(&cli.config)?;
    if matches!(cli.command, Commands::Serve(_)) {
        config.init_logging();
    }

    match &cli.command {
        Commands::Serve(args) => serve::execute(config, args).await,
        Commands::Migrate => serve::migrate(&config),
        Commands::Leaderboard(args) => leaderboard::execute(&config, args).await,
        Commands::Provision(ProvisionCommand::Organization(args)) => {
            provision::organization(&config, args).await
        }
        Commands::Provision(ProvisionCommand::User(args)) => provision::user(&config, args).await,
        Commands::Score(args) => score::execute(&config, args).await,
    }
}

/// One-line description of a failed command. Validation failures list every
/// field message.
#[must_use]
pub fn describe(error: &Error) -> String {
    match error {
        Error::Validation(errors) => errors
            .iter()
            .map(|(field, messages)| format!("{field}: {}", messages.join(", ")))
            .collect::<Vec<_>>()
            .join("; "),
        other => other.to_string(),
    }
}
