//! Command-line interface definitions.
//!
//! Defines the `augur` CLI using `clap`: the HTTP server plus operator
//! commands that work directly against the configured database.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::leaderboard::LeaderboardParams;

/// Organization forecasting service
#[derive(Parser, Debug)]
#[command(name = "augur")]
#[command(version)]
pub struct Cli {
    /// Configuration file
    #[arg(
        short,
        long,
        global = true,
        env = "AUGUR_CONFIG",
        default_value = "config.toml"
    )]
    pub config: PathBuf,

    /// JSON output for scripting
    #[arg(long, global = true)]
    pub json: bool,

    /// Decrease output verbosity
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the augur CLI.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP server
    Serve(ServeArgs),

    /// Apply pending database migrations
    Migrate,

    /// Print a leaderboard for an organization
    Leaderboard(LeaderboardArgs),

    /// Create organizations and users
    #[command(subcommand)]
    Provision(ProvisionCommand),

    /// Record a forecast's actual value and score its predictions
    Score(ScoreArgs),
}

/// Arguments for `augur serve`.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Listen address, overriding `server.bind`
    #[arg(long)]
    pub bind: Option<String>,
}

/// Arguments for `augur leaderboard`.
#[derive(Args, Debug)]
pub struct LeaderboardArgs {
    /// Projection to build [users, groups, categories]
    pub kind: String,

    /// Organization id
    #[arg(long)]
    pub organization: String,

    /// Metric to sort by, e.g. accuracyRate or avgBrierScore
    #[arg(long)]
    pub sort_by: Option<String>,

    /// Sort direction [asc, desc]
    #[arg(long)]
    pub sort_order: Option<String>,

    /// Comma separated forecast ids
    #[arg(long)]
    pub forecast_ids: Option<String>,

    /// Comma separated category ids
    #[arg(long)]
    pub category_ids: Option<String>,

    /// Comma separated forecast types
    #[arg(long)]
    pub forecast_types: Option<String>,

    /// Only the N most recently due completed forecasts, or "all"
    #[arg(long)]
    pub recent: Option<String>,

    /// Drop entries with fewer scored forecasts, or "all"
    #[arg(long)]
    pub min_forecasts: Option<String>,

    /// Earliest due date (YYYY-MM-DD)
    #[arg(long)]
    pub from: Option<String>,

    /// Latest due date (YYYY-MM-DD)
    #[arg(long)]
    pub to: Option<String>,
}

impl LeaderboardArgs {
    /// The filter flags in query-string form.
    #[must_use]
    pub fn params(&self) -> LeaderboardParams {
        LeaderboardParams {
            sort_by: self.sort_by.clone(),
            sort_order: self.sort_order.clone(),
            forecast_ids: self.forecast_ids.clone(),
            category_ids: self.category_ids.clone(),
            forecast_types: self.forecast_types.clone(),
            recent_count: self.recent.clone(),
            min_forecasts: self.min_forecasts.clone(),
            date_from: self.from.clone(),
            date_to: self.to.clone(),
        }
    }
}

/// Subcommands for `augur provision`.
#[derive(Subcommand, Debug)]
pub enum ProvisionCommand {
    /// Create an organization and its first administrator
    Organization(ProvisionOrganizationArgs),
    /// Add a user to an existing organization
    User(ProvisionUserArgs),
}

#[derive(Args, Debug)]
pub struct ProvisionOrganizationArgs {
    /// Organization name
    #[arg(long)]
    pub name: String,

    /// Organization description
    #[arg(long)]
    pub description: Option<String>,

    /// Email of the organization administrator
    #[arg(long)]
    pub admin_email: String,

    /// Display name of the organization administrator
    #[arg(long)]
    pub admin_name: Option<String>,

    /// Model provider API key to store encrypted
    #[arg(long, env = "AUGUR_PROVIDER_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,
}

#[derive(Args, Debug)]
pub struct ProvisionUserArgs {
    /// Organization id
    #[arg(long)]
    pub organization: String,

    /// User email
    #[arg(long)]
    pub email: String,

    /// Display name
    #[arg(long)]
    pub name: Option<String>,

    /// Role [USER, ORG_ADMIN, ADMIN]
    #[arg(long, default_value = "USER")]
    pub role: String,
}

/// Arguments for `augur score`.
#[derive(Args, Debug)]
pub struct ScoreArgs {
    /// Forecast id
    pub forecast: String,

    /// Actual value, in the forecast's own format
    pub actual: String,

    /// Email of the organization admin recording the value
    #[arg(long = "as")]
    pub admin_email: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn leaderboard_flags_become_params() {
        let cli = Cli::parse_from([
            "augur",
            "leaderboard",
            "users",
            "--organization",
            "org-1",
            "--sort-by",
            "avgBrierScore",
            "--recent",
            "5",
            "--json",
        ]);
        assert!(cli.json);
        let Commands::Leaderboard(args) = cli.command else {
            panic!("expected leaderboard command");
        };
        let params = args.params();
        assert_eq!(args.kind, "users");
        assert_eq!(params.sort_by.as_deref(), Some("avgBrierScore"));
        assert_eq!(params.recent_count.as_deref(), Some("5"));
        assert!(params.min_forecasts.is_none());
    }

    #[test]
    fn score_requires_acting_admin() {
        let result = Cli::try_parse_from(["augur", "score", "f-1", "true"]);
        assert!(result.is_err());
    }
}
