//! Forecast questions and their business rules.
//!
//! A forecast is BINARY (`true`/`false`), CONTINUOUS (a number interpreted
//! through its [`DataType`]) or CATEGORICAL (one of a declared option list).
//! Predictions are accepted until the due date; the actual value is recorded
//! after the data release date and drives scoring.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::error::{DomainError, FieldErrors};
use super::id::{CategoryId, ForecastId, OrganizationId};

/// Question shape of a forecast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ForecastType {
    Binary,
    Continuous,
    Categorical,
}

impl ForecastType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Binary => "BINARY",
            Self::Continuous => "CONTINUOUS",
            Self::Categorical => "CATEGORICAL",
        }
    }
}

impl fmt::Display for ForecastType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ForecastType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BINARY" => Ok(Self::Binary),
            "CONTINUOUS" => Ok(Self::Continuous),
            "CATEGORICAL" => Ok(Self::Categorical),
            other => Err(DomainError::UnknownForecastType(other.to_string())),
        }
    }
}

/// Numeric subtype of a CONTINUOUS forecast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataType {
    Currency,
    Percent,
    Integer,
    Number,
    Decimal,
}

impl DataType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Currency => "CURRENCY",
            Self::Percent => "PERCENT",
            Self::Integer => "INTEGER",
            Self::Number => "NUMBER",
            Self::Decimal => "DECIMAL",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CURRENCY" => Ok(Self::Currency),
            "PERCENT" => Ok(Self::Percent),
            "INTEGER" => Ok(Self::Integer),
            "NUMBER" => Ok(Self::Number),
            "DECIMAL" => Ok(Self::Decimal),
            other => Err(DomainError::UnknownDataType(other.to_string())),
        }
    }
}

/// A persisted forecast.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Forecast {
    pub id: ForecastId,
    pub title: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub forecast_type: ForecastType,
    pub data_type: Option<DataType>,
    pub due_date: DateTime<Utc>,
    pub data_release_date: DateTime<Utc>,
    pub actual_value: Option<String>,
    pub organization_id: OrganizationId,
    pub category_id: Option<CategoryId>,
    pub options: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
}

impl Forecast {
    /// True while predictions may still be submitted or changed.
    #[must_use]
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        self.due_date > now
    }

    /// True if `value` is one of the declared categorical options.
    ///
    /// Forecasts without an option list accept any value here.
    #[must_use]
    pub fn accepts_option(&self, value: &str) -> bool {
        match (&self.forecast_type, &self.options) {
            (ForecastType::Categorical, Some(options)) => options.iter().any(|o| o == value),
            _ => true,
        }
    }

    /// Check that `value` is well formed for this forecast's type.
    ///
    /// Used for both prediction values and the recorded actual value.
    pub fn check_value(&self, field: &str, value: &str) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        match self.forecast_type {
            ForecastType::Binary => {
                if parse_binary(value).is_none() {
                    errors.add(field, "Binary forecasts accept only true or false");
                }
            }
            ForecastType::Continuous => match value.trim().parse::<f64>() {
                Ok(number) if number.is_finite() => {
                    if self.data_type == Some(DataType::Integer) && number.fract() != 0.0 {
                        errors.add(field, "Value must be a whole number");
                    }
                }
                _ => errors.add(field, "Value must be a number"),
            },
            ForecastType::Categorical => {
                if !self.accepts_option(value) {
                    errors.add(field, "Selected option is not valid for this forecast");
                }
            }
        }
        errors.into_result()
    }
}

/// Parse a BINARY value.
#[must_use]
pub fn parse_binary(value: &str) -> Option<bool> {
    match value.trim() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

/// Parse a date as supplied by forms or the model.
///
/// Accepts RFC 3339 timestamps and bare `YYYY-MM-DD` dates (midnight UTC).
#[must_use]
pub fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Fields required to create a forecast.
#[derive(Debug, Clone, PartialEq)]
pub struct NewForecast {
    pub title: String,
    pub description: Option<String>,
    pub forecast_type: ForecastType,
    pub data_type: Option<DataType>,
    pub due_date: DateTime<Utc>,
    pub data_release_date: DateTime<Utc>,
    pub organization_id: OrganizationId,
    pub category_id: Option<CategoryId>,
    pub options: Option<Vec<String>>,
}

impl NewForecast {
    /// Business-rule validation that needs no store access.
    ///
    /// Title uniqueness is checked by the caller against the store.
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();

        let title = self.title.trim();
        if title.is_empty() {
            errors.add("title", "Title is required");
        } else if title.chars().count() > 200 {
            errors.add("title", "Title cannot exceed 200 characters");
        }

        if let Some(description) = &self.description {
            if description.chars().count() > 1000 {
                errors.add("description", "Description cannot exceed 1000 characters");
            }
        }

        match (self.forecast_type, self.data_type) {
            (ForecastType::Continuous, None) => errors.add(
                "dataType",
                "CONTINUOUS forecasts require a dataType (CURRENCY, PERCENT, INTEGER, NUMBER, or DECIMAL)",
            ),
            (ForecastType::Binary, Some(_)) => {
                errors.add("dataType", "BINARY forecasts should not have a dataType");
            }
            (ForecastType::Categorical, Some(_)) => {
                errors.add("dataType", "CATEGORICAL forecasts should not have a dataType");
            }
            _ => {}
        }

        match (self.forecast_type, &self.options) {
            (ForecastType::Categorical, Some(options)) => {
                let mut seen = std::collections::HashSet::new();
                let cleaned: Vec<&str> = options
                    .iter()
                    .map(|o| o.trim())
                    .filter(|o| !o.is_empty())
                    .collect();
                if cleaned.len() < 2 {
                    errors.add("options", "Categorical forecasts need at least two options");
                }
                if !cleaned.iter().all(|o| seen.insert(o.to_lowercase())) {
                    errors.add("options", "Options must be unique");
                }
            }
            (ForecastType::Categorical, None) => {
                errors.add("options", "Categorical forecasts need at least two options");
            }
            (_, Some(options)) if !options.is_empty() => {
                errors.add("options", "Only CATEGORICAL forecasts can have options");
            }
            _ => {}
        }

        if self.data_release_date < self.due_date {
            errors.add(
                "dataReleaseDate",
                "Data release date must be on or after the due date",
            );
        }

        errors.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn forecast(kind: ForecastType, options: Option<Vec<&str>>) -> Forecast {
        let now = Utc::now();
        Forecast {
            id: ForecastId::from("f1"),
            title: "Will it rain?".into(),
            description: None,
            forecast_type: kind,
            data_type: (kind == ForecastType::Continuous).then_some(DataType::Number),
            due_date: now + Duration::days(7),
            data_release_date: now + Duration::days(8),
            actual_value: None,
            organization_id: OrganizationId::from("o1"),
            category_id: None,
            options: options.map(|o| o.into_iter().map(String::from).collect()),
            created_at: now,
        }
    }

    fn new_forecast(kind: ForecastType) -> NewForecast {
        let now = Utc::now();
        NewForecast {
            title: "Apple above $200?".into(),
            description: None,
            forecast_type: kind,
            data_type: None,
            due_date: now + Duration::days(3),
            data_release_date: now + Duration::days(4),
            organization_id: OrganizationId::from("o1"),
            category_id: None,
            options: None,
        }
    }

    #[test]
    fn open_until_due_date() {
        let f = forecast(ForecastType::Binary, None);
        assert!(f.is_open(Utc::now()));
        assert!(!f.is_open(f.due_date));
        assert!(!f.is_open(f.due_date + Duration::seconds(1)));
    }

    #[test]
    fn categorical_value_must_be_option() {
        let f = forecast(ForecastType::Categorical, Some(vec!["red", "blue"]));
        assert!(f.check_value("value", "red").is_ok());
        assert!(f
            .check_value("value", "green")
            .unwrap_err()
            .mentions("value", "not valid"));
    }

    #[test]
    fn binary_value_must_be_boolean() {
        let f = forecast(ForecastType::Binary, None);
        assert!(f.check_value("value", "true").is_ok());
        assert!(f.check_value("value", "yes").is_err());
    }

    #[test]
    fn continuous_value_must_be_numeric() {
        let f = forecast(ForecastType::Continuous, None);
        assert!(f.check_value("value", "12.5").is_ok());
        assert!(f.check_value("value", "twelve").is_err());
        assert!(f.check_value("value", "NaN").is_err());
    }

    #[test]
    fn parse_date_accepts_rfc3339_and_plain_dates() {
        assert!(parse_date("2026-03-31T00:00:00Z").is_some());
        assert_eq!(
            parse_date("2026-03-31").unwrap().to_rfc3339(),
            "2026-03-31T00:00:00+00:00"
        );
        assert!(parse_date("next tuesday").is_none());
    }

    #[test]
    fn continuous_requires_data_type() {
        let draft = new_forecast(ForecastType::Continuous);
        assert!(draft.validate().unwrap_err().mentions("dataType", "require"));
    }

    #[test]
    fn binary_rejects_data_type() {
        let mut draft = new_forecast(ForecastType::Binary);
        draft.data_type = Some(DataType::Currency);
        assert!(draft
            .validate()
            .unwrap_err()
            .mentions("dataType", "should not"));
    }

    #[test]
    fn release_date_not_before_due_date() {
        let mut draft = new_forecast(ForecastType::Binary);
        draft.data_release_date = draft.due_date - Duration::hours(1);
        assert!(draft
            .validate()
            .unwrap_err()
            .mentions("dataReleaseDate", "on or after"));
    }

    #[test]
    fn categorical_needs_distinct_options() {
        let mut draft = new_forecast(ForecastType::Categorical);
        draft.options = Some(vec!["A".into(), "a".into()]);
        assert!(draft.validate().unwrap_err().mentions("options", "unique"));
        draft.options = Some(vec!["A".into(), "B".into()]);
        assert!(draft.validate().is_ok());
    }
}
