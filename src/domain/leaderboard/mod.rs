//! Read-only leaderboard projections.
//!
//! Predictions are grouped per user, per group or per category of the
//! forecasts selected by a [`LeaderboardFilter`], tallied into
//! [`LeaderboardStats`], cut by the minimum-forecast threshold and ranked.
//! Entries missing the sort metric always rank last.

mod filter;
pub mod format;
mod stats;

pub use filter::{LeaderboardFilter, LeaderboardParams, SortDirection, SortField};
pub use stats::{LeaderboardStats, Tally};

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use super::category::Category;
use super::error::DomainError;
use super::forecast::Forecast;
use super::group::GroupSummary;
use super::id::{CategoryId, ForecastId, GroupId, UserId};
use super::prediction::Prediction;

/// Which projection to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaderboardKind {
    Users,
    Groups,
    Categories,
}

impl fmt::Display for LeaderboardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Users => "users",
            Self::Groups => "groups",
            Self::Categories => "categories",
        })
    }
}

impl FromStr for LeaderboardKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "users" => Ok(Self::Users),
            "groups" => Ok(Self::Groups),
            "categories" => Ok(Self::Categories),
            other => Err(DomainError::InvalidFilter(format!("leaderboard {other}"))),
        }
    }
}

/// A prediction with the submitter details the projections display.
#[derive(Debug, Clone)]
pub struct LeaderboardRecord {
    pub prediction: Prediction,
    pub user_name: Option<String>,
    pub user_email: String,
}

/// Everything read from the store for one organization.
#[derive(Debug, Clone, Default)]
pub struct LeaderboardSource {
    pub forecasts: Vec<Forecast>,
    pub categories: Vec<Category>,
    pub groups: Vec<GroupSummary>,
    pub records: Vec<LeaderboardRecord>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserEntry {
    pub rank: usize,
    pub user_id: UserId,
    pub user_name: String,
    pub user_email: String,
    #[serde(flatten)]
    pub stats: LeaderboardStats,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupEntry {
    pub rank: usize,
    pub group_id: GroupId,
    pub group_name: String,
    pub member_count: i64,
    #[serde(flatten)]
    pub stats: LeaderboardStats,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryEntry {
    pub rank: usize,
    pub category_id: Option<CategoryId>,
    pub category_name: String,
    pub total_forecasts: u32,
    pub completed_forecasts: u32,
    pub total_participants: u32,
    pub avg_predictions_per_forecast: Option<f64>,
    #[serde(flatten)]
    pub stats: LeaderboardStats,
}

/// Label used for forecasts without a category.
pub const UNCATEGORIZED: &str = "Uncategorized";

/// An entry that can be ranked.
pub trait Ranked {
    fn name(&self) -> &str;
    fn stats(&self) -> &LeaderboardStats;
    fn set_rank(&mut self, rank: usize);

    /// Value of `field`, `None` when the entry has no value for it.
    fn metric(&self, field: SortField) -> Option<f64> {
        self.stats().metric(field)
    }
}

impl Ranked for UserEntry {
    fn name(&self) -> &str {
        &self.user_name
    }

    fn stats(&self) -> &LeaderboardStats {
        &self.stats
    }

    fn set_rank(&mut self, rank: usize) {
        self.rank = rank;
    }
}

impl Ranked for GroupEntry {
    fn name(&self) -> &str {
        &self.group_name
    }

    fn stats(&self) -> &LeaderboardStats {
        &self.stats
    }

    fn set_rank(&mut self, rank: usize) {
        self.rank = rank;
    }

    fn metric(&self, field: SortField) -> Option<f64> {
        match field {
            SortField::MemberCount => Some(self.member_count as f64),
            other => self.stats.metric(other),
        }
    }
}

impl Ranked for CategoryEntry {
    fn name(&self) -> &str {
        &self.category_name
    }

    fn stats(&self) -> &LeaderboardStats {
        &self.stats
    }

    fn set_rank(&mut self, rank: usize) {
        self.rank = rank;
    }

    fn metric(&self, field: SortField) -> Option<f64> {
        match field {
            SortField::TotalForecasts => Some(f64::from(self.total_forecasts)),
            SortField::CompletedForecasts => Some(f64::from(self.completed_forecasts)),
            SortField::TotalParticipants => Some(f64::from(self.total_participants)),
            SortField::AvgPredictionsPerForecast => self.avg_predictions_per_forecast,
            other => self.stats.metric(other),
        }
    }
}

/// Records whose forecast is selected by `filter`.
fn in_scope<'a>(
    source: &'a LeaderboardSource,
    filter: &LeaderboardFilter,
) -> (Vec<&'a Forecast>, Vec<&'a LeaderboardRecord>) {
    let forecasts = filter.select(&source.forecasts);
    let ids: HashSet<&ForecastId> = forecasts.iter().map(|f| &f.id).collect();
    let records = source
        .records
        .iter()
        .filter(|r| ids.contains(&r.prediction.forecast_id))
        .collect();
    (forecasts, records)
}

fn passes_minimum(stats: &LeaderboardStats, filter: &LeaderboardFilter) -> bool {
    filter
        .min_forecasts
        .map_or(true, |min| stats.total_completed_predictions as usize >= min)
}

/// Per-user ranking over individual predictions.
#[must_use]
pub fn user_leaderboard(source: &LeaderboardSource, filter: &LeaderboardFilter) -> Vec<UserEntry> {
    let (_, records) = in_scope(source, filter);
    let mut by_user: BTreeMap<&UserId, (&LeaderboardRecord, Tally)> = BTreeMap::new();
    for record in records.into_iter().filter(|r| r.prediction.group_id.is_none()) {
        by_user
            .entry(&record.prediction.user_id)
            .or_insert_with(|| (record, Tally::default()))
            .1
            .add(&record.prediction);
    }

    let mut entries: Vec<UserEntry> = by_user
        .into_iter()
        .map(|(user_id, (record, tally))| UserEntry {
            rank: 0,
            user_id: user_id.clone(),
            user_name: record
                .user_name
                .clone()
                .unwrap_or_else(|| record.user_email.clone()),
            user_email: record.user_email.clone(),
            stats: tally.finish(),
        })
        .filter(|e| passes_minimum(&e.stats, filter))
        .collect();
    rank(&mut entries, filter);
    entries
}

/// Per-group ranking over group predictions.
#[must_use]
pub fn group_leaderboard(source: &LeaderboardSource, filter: &LeaderboardFilter) -> Vec<GroupEntry> {
    let (_, records) = in_scope(source, filter);
    let mut tallies: HashMap<&GroupId, Tally> = HashMap::new();
    for record in &records {
        if let Some(group_id) = &record.prediction.group_id {
            tallies.entry(group_id).or_default().add(&record.prediction);
        }
    }

    let mut entries: Vec<GroupEntry> = source
        .groups
        .iter()
        .filter_map(|summary| {
            let tally = tallies.remove(&summary.group.id)?;
            Some(GroupEntry {
                rank: 0,
                group_id: summary.group.id.clone(),
                group_name: summary.group.name.clone(),
                member_count: summary.member_count,
                stats: tally.finish(),
            })
        })
        .filter(|e| passes_minimum(&e.stats, filter))
        .collect();
    rank(&mut entries, filter);
    entries
}

/// Per-category ranking over every prediction on the category's forecasts.
#[must_use]
pub fn category_leaderboard(
    source: &LeaderboardSource,
    filter: &LeaderboardFilter,
) -> Vec<CategoryEntry> {
    #[derive(Default)]
    struct Bucket<'a> {
        forecasts: u32,
        completed: u32,
        participants: HashSet<&'a UserId>,
        tally: Tally,
    }

    let (forecasts, records) = in_scope(source, filter);
    let category_of: HashMap<&ForecastId, Option<&CategoryId>> = forecasts
        .iter()
        .map(|f| (&f.id, f.category_id.as_ref()))
        .collect();

    let mut buckets: BTreeMap<Option<&CategoryId>, Bucket> = BTreeMap::new();
    for forecast in &forecasts {
        let bucket = buckets.entry(forecast.category_id.as_ref()).or_default();
        bucket.forecasts += 1;
        if forecast.actual_value.is_some() {
            bucket.completed += 1;
        }
    }
    for record in &records {
        let Some(category) = category_of.get(&record.prediction.forecast_id) else {
            continue;
        };
        let bucket = buckets.entry(*category).or_default();
        bucket.participants.insert(&record.prediction.user_id);
        bucket.tally.add(&record.prediction);
    }

    let names: HashMap<&CategoryId, &str> = source
        .categories
        .iter()
        .map(|c| (&c.id, c.name.as_str()))
        .collect();

    let mut entries: Vec<CategoryEntry> = buckets
        .into_iter()
        .map(|(category_id, bucket)| {
            let stats = bucket.tally.finish();
            CategoryEntry {
                rank: 0,
                category_id: category_id.cloned(),
                category_name: category_id
                    .and_then(|id| names.get(id).copied())
                    .unwrap_or(UNCATEGORIZED)
                    .to_string(),
                total_forecasts: bucket.forecasts,
                completed_forecasts: bucket.completed,
                total_participants: bucket.participants.len() as u32,
                avg_predictions_per_forecast: (bucket.forecasts > 0).then(|| {
                    f64::from(stats.total_predictions) / f64::from(bucket.forecasts)
                }),
                stats,
            }
        })
        .filter(|e| passes_minimum(&e.stats, filter))
        .collect();
    rank(&mut entries, filter);
    entries
}

/// Sort by the filter's field and direction, then number from 1.
pub fn rank<T: Ranked>(entries: &mut [T], filter: &LeaderboardFilter) {
    entries.sort_by(|a, b| compare(a, b, filter.sort, filter.direction));
    for (index, entry) in entries.iter_mut().enumerate() {
        entry.set_rank(index + 1);
    }
}

fn compare<T: Ranked>(a: &T, b: &T, field: SortField, direction: SortDirection) -> Ordering {
    let directed = |ordering: Ordering| match direction {
        SortDirection::Asc => ordering,
        SortDirection::Desc => ordering.reverse(),
    };
    let ordering = if field == SortField::Name {
        directed(a.name().to_lowercase().cmp(&b.name().to_lowercase()))
    } else {
        match (a.metric(field), b.metric(field)) {
            (Some(x), Some(y)) => directed(x.total_cmp(&y)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    };
    ordering.then_with(|| a.name().cmp(b.name()))
}
