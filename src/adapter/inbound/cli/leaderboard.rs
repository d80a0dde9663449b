//! Handler for the `leaderboard` command.

use std::sync::Arc;

use tabled::{Table, Tabled};

use super::command::LeaderboardArgs;
use super::output;
use crate::application::{Leaderboard, LeaderboardService};
use crate::domain::id::OrganizationId;
use crate::domain::leaderboard::format::{currency, decimal, integer, percent};
use crate::domain::leaderboard::{
    CategoryEntry, GroupEntry, LeaderboardFilter, LeaderboardKind, LeaderboardStats, UserEntry,
};
use crate::error::Result;
use crate::infrastructure::bootstrap::open_store;
use crate::infrastructure::config::Config;

#[derive(Tabled)]
struct UserRow {
    #[tabled(rename = "#")]
    rank: usize,
    #[tabled(rename = "User")]
    user: String,
    #[tabled(rename = "Predictions")]
    predictions: String,
    #[tabled(rename = "Scored")]
    scored: String,
    #[tabled(rename = "Accuracy")]
    accuracy: String,
    #[tabled(rename = "Avg Brier")]
    brier: String,
    #[tabled(rename = "Net Profit")]
    net_profit: String,
    #[tabled(rename = "ROI")]
    roi: String,
}

impl From<&UserEntry> for UserRow {
    fn from(entry: &UserEntry) -> Self {
        let stats = &entry.stats;
        Self {
            rank: entry.rank,
            user: entry.user_name.clone(),
            predictions: count(stats.total_predictions),
            scored: count(stats.total_completed_predictions),
            accuracy: percent(stats.accuracy_rate),
            brier: decimal(stats.avg_brier_score, 4),
            net_profit: currency(Some(stats.total_net_profit)),
            roi: percent(stats.roi_real),
        }
    }
}

#[derive(Tabled)]
struct GroupRow {
    #[tabled(rename = "#")]
    rank: usize,
    #[tabled(rename = "Group")]
    group: String,
    #[tabled(rename = "Members")]
    members: String,
    #[tabled(rename = "Predictions")]
    predictions: String,
    #[tabled(rename = "Accuracy")]
    accuracy: String,
    #[tabled(rename = "Avg Brier")]
    brier: String,
    #[tabled(rename = "Net Profit")]
    net_profit: String,
}

impl From<&GroupEntry> for GroupRow {
    fn from(entry: &GroupEntry) -> Self {
        let stats = &entry.stats;
        Self {
            rank: entry.rank,
            group: entry.group_name.clone(),
            members: integer(Some(entry.member_count)),
            predictions: count(stats.total_predictions),
            accuracy: percent(stats.accuracy_rate),
            brier: decimal(stats.avg_brier_score, 4),
            net_profit: currency(Some(stats.total_net_profit)),
        }
    }
}

#[derive(Tabled)]
struct CategoryRow {
    #[tabled(rename = "#")]
    rank: usize,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Forecasts")]
    forecasts: String,
    #[tabled(rename = "Completed")]
    completed: String,
    #[tabled(rename = "Participants")]
    participants: String,
    #[tabled(rename = "Per Forecast")]
    per_forecast: String,
    #[tabled(rename = "Accuracy")]
    accuracy: String,
    #[tabled(rename = "Avg Brier")]
    brier: String,
}

impl From<&CategoryEntry> for CategoryRow {
    fn from(entry: &CategoryEntry) -> Self {
        let stats: &LeaderboardStats = &entry.stats;
        Self {
            rank: entry.rank,
            category: entry.category_name.clone(),
            forecasts: count(entry.total_forecasts),
            completed: count(entry.completed_forecasts),
            participants: count(entry.total_participants),
            per_forecast: decimal(entry.avg_predictions_per_forecast, 1),
            accuracy: percent(stats.accuracy_rate),
            brier: decimal(stats.avg_brier_score, 4),
        }
    }
}

fn count(value: u32) -> String {
    integer(Some(i64::from(value)))
}

/// Render a leaderboard as a text table.
#[must_use]
pub fn render(board: &Leaderboard) -> String {
    match board {
        Leaderboard::Users(entries) => Table::new(entries.iter().map(UserRow::from)).to_string(),
        Leaderboard::Groups(entries) => {
            Table::new(entries.iter().map(GroupRow::from)).to_string()
        }
        Leaderboard::Categories(entries) => {
            Table::new(entries.iter().map(CategoryRow::from)).to_string()
        }
    }
}

/// Execute `augur leaderboard`.
pub async fn execute(config: &Config, args: &LeaderboardArgs) -> Result<()> {
    let kind: LeaderboardKind = args.kind.parse()?;
    let filter = LeaderboardFilter::from_params(&args.params())?;
    let organization = OrganizationId::from(args.organization.as_str());

    let service = LeaderboardService::new(Arc::new(open_store(&config.database)?));
    let board = service.for_organization(&organization, kind, &filter).await?;

    if output::is_json() {
        output::json_output(&board);
        return Ok(());
    }

    output::header();
    output::field("Organization", &organization);
    output::field("Leaderboard", kind);
    output::field("Entries", board.len());
    if board.is_empty() {
        output::warning("No entries match these filters");
        return Ok(());
    }
    output::section("Ranking");
    output::block(render(&board));
    Ok(())
}
