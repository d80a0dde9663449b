//! Forecast creation and resolution.
//!
//! Creation is shared by the admin form and the chat tools: both parse raw
//! fields into a [`NewForecast`], run the business rules and then persist.
//! Recording an actual value scores every prediction on the forecast.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::info;

use crate::domain::context::RequestContext;
use crate::domain::error::FieldErrors;
use crate::domain::forecast::{parse_date, DataType, Forecast, ForecastType, NewForecast};
use crate::domain::id::{CategoryId, ForecastId, OrganizationId};
use crate::domain::scoring::score_prediction;
use crate::error::{Error, Result};
use crate::port::outbound::store::Store;

pub const TITLE_TAKEN: &str = "A forecast with this title already exists in your organization";
pub const DUE_DATE_PAST: &str = "Due date must be in the future";

/// Forecast fields as submitted by the admin form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastInput {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub forecast_type: String,
    #[serde(default)]
    pub data_type: Option<String>,
    pub due_date: String,
    pub data_release_date: String,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub options: Option<Vec<String>>,
}

/// Parse the forecast type and optional data type.
pub(crate) fn parse_kind(
    forecast_type: &str,
    data_type: Option<&str>,
    errors: &mut FieldErrors,
) -> Option<(ForecastType, Option<DataType>)> {
    let kind = match forecast_type.trim().parse::<ForecastType>() {
        Ok(kind) => Some(kind),
        Err(_) => {
            errors.add("type", "Forecast type must be BINARY, CONTINUOUS or CATEGORICAL");
            None
        }
    };
    let data_type = match data_type.map(str::trim).filter(|d| !d.is_empty()) {
        None => Some(None),
        Some(raw) => match raw.parse::<DataType>() {
            Ok(parsed) => Some(Some(parsed)),
            Err(_) => {
                errors.add(
                    "dataType",
                    "Data type must be CURRENCY, PERCENT, INTEGER, NUMBER or DECIMAL",
                );
                None
            }
        },
    };
    kind.zip(data_type)
}

/// Parse the due and data-release dates, requiring a future due date.
pub(crate) fn parse_dates(
    due_date: &str,
    data_release_date: &str,
    now: DateTime<Utc>,
    errors: &mut FieldErrors,
) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let due = parse_date(due_date);
    match due {
        None => errors.add("dueDate", "Due date must be a valid date"),
        Some(due) if due <= now => errors.add("dueDate", DUE_DATE_PAST),
        Some(_) => {}
    }
    let release = parse_date(data_release_date);
    if release.is_none() {
        errors.add("dataReleaseDate", "Data release date must be a valid date");
    }
    due.zip(release)
}

pub struct ForecastService {
    store: Arc<dyn Store>,
}

impl ForecastService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn list(&self, ctx: &RequestContext) -> Result<Vec<Forecast>> {
        let organization = ctx.organization()?;
        self.store.forecasts(organization).await
    }

    /// Create a forecast from the admin form.
    pub async fn create(&self, ctx: &RequestContext, input: ForecastInput) -> Result<Forecast> {
        let organization = ctx.administered_organization()?;
        let now = Utc::now();

        let mut errors = FieldErrors::new();
        let kind = parse_kind(&input.forecast_type, input.data_type.as_deref(), &mut errors);
        let dates = parse_dates(&input.due_date, &input.data_release_date, now, &mut errors);
        let category_id = self
            .owned_category(organization, input.category_id.as_deref(), &mut errors)
            .await?;

        let (Some((forecast_type, data_type)), Some((due_date, data_release_date))) = (kind, dates)
        else {
            return Err(errors.into());
        };

        let new = NewForecast {
            title: input.title.trim().to_string(),
            description: input
                .description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
            forecast_type,
            data_type,
            due_date,
            data_release_date,
            organization_id: organization.clone(),
            category_id,
            options: input.options,
        };
        errors.extend(self.rule_errors(&new).await?);
        errors.into_result()?;

        self.insert(new, now).await
    }

    /// Business rules for a parsed forecast, including title uniqueness.
    ///
    /// Store failures are returned as errors; rule failures as the collected
    /// field messages.
    pub async fn rule_errors(&self, new: &NewForecast) -> Result<FieldErrors> {
        let mut errors = FieldErrors::new();
        if let Err(rules) = new.validate() {
            errors.extend(rules);
        }
        let title = new.title.trim();
        if !title.is_empty() && self.store.title_taken(&new.organization_id, title).await? {
            errors.add("title", TITLE_TAKEN);
        }
        Ok(errors)
    }

    /// Persist an already validated forecast.
    pub async fn insert(&self, new: NewForecast, now: DateTime<Utc>) -> Result<Forecast> {
        let forecast = Forecast {
            id: ForecastId::generate(),
            title: new.title,
            description: new.description,
            forecast_type: new.forecast_type,
            data_type: new.data_type,
            due_date: new.due_date,
            data_release_date: new.data_release_date,
            actual_value: None,
            organization_id: new.organization_id,
            category_id: new.category_id,
            options: new.options.map(|options| {
                options
                    .into_iter()
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            }),
            created_at: now,
        };
        self.store.create_forecast(&forecast).await?;

        info!(
            forecast_id = %forecast.id,
            organization_id = %forecast.organization_id,
            forecast_type = forecast.forecast_type.as_str(),
            "Created forecast"
        );
        Ok(forecast)
    }

    /// Record the actual outcome and score every prediction against it.
    pub async fn record_actual(
        &self,
        ctx: &RequestContext,
        id: &ForecastId,
        actual: &str,
    ) -> Result<Forecast> {
        let organization = ctx.administered_organization()?;
        let mut forecast = match self.store.forecast(id).await? {
            Some(forecast) if &forecast.organization_id == organization => forecast,
            _ => return Err(Error::NotFound("forecast")),
        };

        let actual = actual.trim();
        if actual.is_empty() {
            let mut errors = FieldErrors::new();
            errors.add("actualValue", "Actual value is required");
            return Err(errors.into());
        }
        forecast.check_value("actualValue", actual)?;

        let now = Utc::now();
        let scores: Vec<_> = self
            .store
            .forecast_predictions(id)
            .await?
            .iter()
            .map(|p| (p.id.clone(), score_prediction(&forecast, p, actual, now)))
            .collect();
        self.store.record_actual(id, actual, &scores).await?;

        info!(
            forecast_id = %id,
            predictions = scores.len(),
            "Recorded actual value"
        );
        forecast.actual_value = Some(actual.to_string());
        Ok(forecast)
    }

    async fn owned_category(
        &self,
        organization: &OrganizationId,
        category_id: Option<&str>,
        errors: &mut FieldErrors,
    ) -> Result<Option<CategoryId>> {
        let Some(raw) = category_id.map(str::trim).filter(|c| !c.is_empty()) else {
            return Ok(None);
        };
        let id = CategoryId::from(raw);
        let categories = self.store.categories(organization).await?;
        if categories.iter().any(|c| c.id == id) {
            Ok(Some(id))
        } else {
            errors.add("categoryId", "Category not found");
            Ok(None)
        }
    }
}
