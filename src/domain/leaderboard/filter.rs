//! Leaderboard query parameters.

use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

use crate::domain::error::DomainError;
use crate::domain::forecast::{parse_date, Forecast, ForecastType};
use crate::domain::id::{CategoryId, ForecastId};

/// Field a leaderboard is ordered by, named as callers send it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Name,
    MemberCount,
    TotalPredictions,
    TotalCompletedPredictions,
    CorrectPredictions,
    AccuracyRate,
    AvgBrierScore,
    AvgActualError,
    AvgForecastError,
    TotalEquityInvestment,
    TotalDebtFinancing,
    TotalInvestment,
    TotalNetProfit,
    RoiReal,
    RoiAverage,
    AvgTimePerForecastMinutes,
    TotalForecasts,
    CompletedForecasts,
    TotalParticipants,
    AvgPredictionsPerForecast,
}

impl FromStr for SortField {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "name" | "userName" | "groupName" | "categoryName" => Self::Name,
            "memberCount" => Self::MemberCount,
            "totalPredictions" => Self::TotalPredictions,
            "totalCompletedPredictions" => Self::TotalCompletedPredictions,
            "correctPredictions" => Self::CorrectPredictions,
            "accuracyRate" => Self::AccuracyRate,
            "avgBrierScore" => Self::AvgBrierScore,
            "avgActualError" => Self::AvgActualError,
            "avgForecastError" => Self::AvgForecastError,
            "totalEquityInvestment" => Self::TotalEquityInvestment,
            "totalDebtFinancing" => Self::TotalDebtFinancing,
            "totalInvestment" => Self::TotalInvestment,
            "totalNetProfit" => Self::TotalNetProfit,
            "roiReal" => Self::RoiReal,
            "roiAverage" => Self::RoiAverage,
            "avgTimePerForecastMinutes" => Self::AvgTimePerForecastMinutes,
            "totalForecasts" => Self::TotalForecasts,
            "completedForecasts" => Self::CompletedForecasts,
            "totalParticipants" => Self::TotalParticipants,
            "avgPredictionsPerForecast" => Self::AvgPredictionsPerForecast,
            other => return Err(DomainError::UnknownSortField(other.to_string())),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl FromStr for SortDirection {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(DomainError::InvalidFilter(format!("sortOrder={other}"))),
        }
    }
}

/// Raw leaderboard parameters as they arrive in a query string.
///
/// Id and type lists are comma separated. `all` is accepted wherever a count
/// is expected and means no cutoff.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardParams {
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub forecast_ids: Option<String>,
    pub category_ids: Option<String>,
    pub forecast_types: Option<String>,
    pub recent_count: Option<String>,
    pub min_forecasts: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
}

/// Parsed leaderboard filter and ordering.
#[derive(Debug, Clone, PartialEq)]
pub struct LeaderboardFilter {
    pub forecast_ids: Vec<ForecastId>,
    pub category_ids: Vec<CategoryId>,
    pub forecast_types: Vec<ForecastType>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    /// Keep only the N most recently due completed forecasts.
    pub recent_count: Option<usize>,
    /// Drop entries with fewer scored predictions than this.
    pub min_forecasts: Option<usize>,
    pub sort: SortField,
    pub direction: SortDirection,
}

impl Default for LeaderboardFilter {
    fn default() -> Self {
        Self {
            forecast_ids: Vec::new(),
            category_ids: Vec::new(),
            forecast_types: Vec::new(),
            date_from: None,
            date_to: None,
            recent_count: None,
            min_forecasts: None,
            sort: SortField::AccuracyRate,
            direction: SortDirection::Desc,
        }
    }
}

impl LeaderboardFilter {
    /// Parse query parameters.
    ///
    /// # Errors
    /// Fails on unknown sort fields or forecast types and malformed numbers
    /// or dates.
    pub fn from_params(params: &LeaderboardParams) -> Result<Self, DomainError> {
        let mut filter = Self::default();
        if let Some(sort) = non_empty(params.sort_by.as_deref()) {
            filter.sort = sort.parse()?;
        }
        if let Some(direction) = non_empty(params.sort_order.as_deref()) {
            filter.direction = direction.parse()?;
        }
        filter.forecast_ids = split(params.forecast_ids.as_deref())
            .map(ForecastId::from)
            .collect();
        filter.category_ids = split(params.category_ids.as_deref())
            .map(CategoryId::from)
            .collect();
        filter.forecast_types = split(params.forecast_types.as_deref())
            .map(str::parse)
            .collect::<Result<_, _>>()?;
        filter.recent_count = count(params.recent_count.as_deref(), "recentCount")?;
        filter.min_forecasts = count(params.min_forecasts.as_deref(), "minForecasts")?;
        filter.date_from = date(params.date_from.as_deref(), "dateFrom")?;
        filter.date_to = date(params.date_to.as_deref(), "dateTo")?.map(|to| {
            // A bare date includes the whole day.
            if params.date_to.as_deref().is_some_and(|raw| raw.trim().len() == 10) {
                to + Duration::days(1) - Duration::seconds(1)
            } else {
                to
            }
        });
        Ok(filter)
    }

    /// True if `forecast` passes the id, category, type and date filters.
    #[must_use]
    pub fn matches(&self, forecast: &Forecast) -> bool {
        if !self.forecast_ids.is_empty() && !self.forecast_ids.contains(&forecast.id) {
            return false;
        }
        if !self.category_ids.is_empty()
            && !forecast
                .category_id
                .as_ref()
                .is_some_and(|c| self.category_ids.contains(c))
        {
            return false;
        }
        if !self.forecast_types.is_empty() && !self.forecast_types.contains(&forecast.forecast_type)
        {
            return false;
        }
        if self.date_from.is_some_and(|from| forecast.due_date < from) {
            return false;
        }
        if self.date_to.is_some_and(|to| forecast.due_date > to) {
            return false;
        }
        true
    }

    /// Forecasts in scope for this filter, applying the recent cutoff last.
    #[must_use]
    pub fn select<'a>(&self, forecasts: &'a [Forecast]) -> Vec<&'a Forecast> {
        let mut selected: Vec<&Forecast> = forecasts.iter().filter(|f| self.matches(f)).collect();
        if let Some(recent) = self.recent_count {
            selected.retain(|f| f.actual_value.is_some());
            selected.sort_by(|a, b| b.due_date.cmp(&a.due_date));
            selected.truncate(recent);
        }
        selected
    }
}

fn non_empty(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}

fn split(raw: Option<&str>) -> impl Iterator<Item = &str> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn count(raw: Option<&str>, field: &str) -> Result<Option<usize>, DomainError> {
    match non_empty(raw) {
        None | Some("all") => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| DomainError::InvalidFilter(format!("{field}={value}"))),
    }
}

fn date(raw: Option<&str>, field: &str) -> Result<Option<DateTime<Utc>>, DomainError> {
    match non_empty(raw) {
        None => Ok(None),
        Some(value) => parse_date(value)
            .map(Some)
            .ok_or_else(|| DomainError::InvalidFilter(format!("{field}={value}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::id::OrganizationId;

    fn forecast(id: &str, due_days: i64, completed: bool) -> Forecast {
        let base = parse_date("2026-01-01").unwrap();
        Forecast {
            id: ForecastId::from(id),
            title: id.into(),
            description: None,
            forecast_type: ForecastType::Binary,
            data_type: None,
            due_date: base + Duration::days(due_days),
            data_release_date: base + Duration::days(due_days),
            actual_value: completed.then(|| "true".to_string()),
            organization_id: OrganizationId::from("org"),
            category_id: None,
            options: None,
            created_at: base,
        }
    }

    #[test]
    fn defaults_to_accuracy_descending() {
        let filter = LeaderboardFilter::from_params(&LeaderboardParams::default()).unwrap();
        assert_eq!(filter.sort, SortField::AccuracyRate);
        assert_eq!(filter.direction, SortDirection::Desc);
    }

    #[test]
    fn parses_lists_and_counts() {
        let params = LeaderboardParams {
            sort_by: Some("roiReal".into()),
            sort_order: Some("asc".into()),
            forecast_ids: Some("f1, f2,".into()),
            forecast_types: Some("BINARY,CONTINUOUS".into()),
            recent_count: Some("5".into()),
            min_forecasts: Some("all".into()),
            ..LeaderboardParams::default()
        };
        let filter = LeaderboardFilter::from_params(&params).unwrap();
        assert_eq!(filter.sort, SortField::RoiReal);
        assert_eq!(filter.direction, SortDirection::Asc);
        assert_eq!(filter.forecast_ids.len(), 2);
        assert_eq!(filter.forecast_types.len(), 2);
        assert_eq!(filter.recent_count, Some(5));
        assert_eq!(filter.min_forecasts, None);
    }

    #[test]
    fn rejects_unknown_sort_field() {
        let params = LeaderboardParams {
            sort_by: Some("luck".into()),
            ..LeaderboardParams::default()
        };
        assert!(LeaderboardFilter::from_params(&params).is_err());
    }

    #[test]
    fn bare_date_to_includes_whole_day() {
        let params = LeaderboardParams {
            date_to: Some("2026-01-02".into()),
            ..LeaderboardParams::default()
        };
        let filter = LeaderboardFilter::from_params(&params).unwrap();
        let due = forecast("f", 1, true);
        let mut late = due.clone();
        late.due_date += Duration::hours(23);
        assert!(filter.matches(&due));
        assert!(filter.matches(&late));
        assert!(!filter.matches(&forecast("g", 2, true)));
    }

    #[test]
    fn recent_count_keeps_latest_completed() {
        let forecasts = vec![
            forecast("old", 1, true),
            forecast("mid", 2, true),
            forecast("new", 3, true),
            forecast("open", 4, false),
        ];
        let filter = LeaderboardFilter {
            recent_count: Some(2),
            ..LeaderboardFilter::default()
        };
        let ids: Vec<&str> = filter.select(&forecasts).iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, ["new", "mid"]);
    }
}
