//! Predictions submitted against forecasts.
//!
//! A prediction is either individual or attributed to a group. Values are
//! stored as strings and interpreted through the forecast type.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::error::FieldErrors;
use super::id::{ForecastId, GroupId, PredictionId, UserId};

/// Largest equity investment accepted on a single prediction.
pub const MAX_EQUITY_INVESTMENT: Decimal = dec!(20000000);
pub const MAX_DEBT_FINANCING: Decimal = dec!(20000000);

/// Longest reasoning text accepted.
pub const MAX_REASONING_CHARS: usize = 2_000;

/// Forecasting methods a predictor can tag a prediction with.
pub const METHOD_OPTIONS: [&str; 22] = [
    "Guess / POOMA",
    "Intuitive / Educated Guess / Feeling / SWAG",
    "Visual Extrapolation",
    "Experiential Judgment (Internal Source)",
    "Experiential Judgment (External / 3rd Party Source)",
    "Subject Matter Experts (Internal Source)",
    "Subject Matter Experts (External / 3rd Party Source)",
    "Survey / Interview / Dialogue",
    "Focus Group / Strategic Polylogue",
    "Blind Software Output",
    "Simple Statistics (Averages, Medians, etc.)",
    "Moving Averages / Weighted Moving Averages",
    "Exponential Smoothing",
    "Percentile Distributions",
    "ARIMA",
    "Bivariate Linear Regression",
    "Multivariate Regression",
    "Analogue / Other",
    "Ensemble – Multiple QUAL Methods / Scenarios",
    "Ensemble – Multiple QUANT Methods / Scenarios",
    "Ensemble – QUANT + QUAL Methods / Scenarios",
    "AI / Machine Learning Model",
];

/// Whether a prediction speaks for one user or for their group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PredictionScope {
    Individual,
    Group(GroupId),
}

/// Fields derived once the forecast's actual value is known.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionScore {
    pub is_correct: Option<bool>,
    pub absolute_error: Option<f64>,
    pub absolute_actual_error_pct: Option<f64>,
    pub absolute_forecast_error_pct: Option<f64>,
    pub brier_score: Option<f64>,
    pub net_profit: Option<Decimal>,
    pub roi: Option<f64>,
    pub scored_at: Option<DateTime<Utc>>,
}

impl PredictionScore {
    #[must_use]
    pub fn is_scored(&self) -> bool {
        self.scored_at.is_some()
    }
}

/// A persisted prediction.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    pub id: PredictionId,
    pub forecast_id: ForecastId,
    /// Submitter. Group predictions record the member who submitted.
    pub user_id: UserId,
    pub group_id: Option<GroupId>,
    pub value: String,
    pub confidence: Option<i32>,
    pub reasoning: Option<String>,
    pub method: Option<String>,
    /// Minutes spent producing the prediction.
    pub estimated_time: Option<i32>,
    pub equity_investment: Option<Decimal>,
    pub debt_financing: Option<Decimal>,
    #[serde(flatten)]
    pub score: PredictionScore,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Prediction {
    #[must_use]
    pub fn scope(&self) -> PredictionScope {
        match &self.group_id {
            Some(group_id) => PredictionScope::Group(group_id.clone()),
            None => PredictionScope::Individual,
        }
    }

    /// Capital put behind the prediction, if any.
    #[must_use]
    pub fn stake(&self) -> Option<Decimal> {
        stake(self.equity_investment, self.debt_financing)
    }
}

/// Sum of equity and debt, `None` when nothing positive was committed or the
/// sum is not representable.
#[must_use]
pub fn stake(equity: Option<Decimal>, debt: Option<Decimal>) -> Option<Decimal> {
    let total = equity
        .unwrap_or_default()
        .checked_add(debt.unwrap_or_default())?;
    (total > Decimal::ZERO).then_some(total)
}

/// Ancillary fields shared by creation and update.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionDetails {
    #[serde(default)]
    pub confidence: Option<i32>,
    #[serde(default)]
    pub reasoning: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub estimated_time: Option<i32>,
    #[serde(default)]
    pub equity_investment: Option<Decimal>,
    #[serde(default)]
    pub debt_financing: Option<Decimal>,
}

impl PredictionDetails {
    fn check(&self, errors: &mut FieldErrors) {
        if let Some(confidence) = self.confidence {
            if !(0..=100).contains(&confidence) {
                errors.add("confidence", "Confidence must be between 0 and 100");
            }
        }
        if self.estimated_time.is_some_and(|t| t < 0) {
            errors.add("estimatedTime", "Estimated time cannot be negative");
        }
        if let Some(equity) = self.equity_investment {
            if equity < Decimal::ZERO {
                errors.add("equityInvestment", "Equity investment cannot be negative");
            } else if equity > MAX_EQUITY_INVESTMENT {
                errors.add(
                    "equityInvestment",
                    "Equity investment cannot exceed $20,000,000",
                );
            }
        }
        if let Some(debt) = self.debt_financing {
            if debt < Decimal::ZERO {
                errors.add("debtFinancing", "Debt financing cannot be negative");
            } else if debt > MAX_DEBT_FINANCING {
                errors.add("debtFinancing", "Debt financing cannot exceed $20,000,000");
            }
        }
        if self
            .reasoning
            .as_deref()
            .is_some_and(|r| r.chars().count() > MAX_REASONING_CHARS)
        {
            errors.add("reasoning", "Reasoning cannot exceed 2000 characters");
        }
        if let Some(method) = self.method.as_deref().filter(|m| !m.is_empty()) {
            if !METHOD_OPTIONS.contains(&method) {
                errors.add("method", "Select a forecasting method from the list");
            }
        }
    }

    /// Blank text fields are stored as absent.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.reasoning = self
            .reasoning
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());
        self.method = self.method.filter(|m| !m.is_empty());
        self
    }
}

/// A prediction submission.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionInput {
    pub forecast_id: String,
    #[serde(default)]
    pub group_id: Option<String>,
    pub value: String,
    #[serde(flatten)]
    pub details: PredictionDetails,
}

impl PredictionInput {
    /// Shape checks that need no forecast or store access.
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if self.forecast_id.trim().is_empty() {
            errors.add("forecastId", "Forecast is required");
        }
        if self.value.trim().is_empty() {
            errors.add("value", "Prediction value is required");
        }
        self.details.check(&mut errors);
        errors.into_result()
    }

    /// Group id with blank strings treated as no group.
    #[must_use]
    pub fn group(&self) -> Option<GroupId> {
        self.group_id
            .as_deref()
            .map(str::trim)
            .filter(|g| !g.is_empty())
            .map(GroupId::from)
    }
}

/// Changes to an existing prediction.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionUpdate {
    pub value: String,
    #[serde(flatten)]
    pub details: PredictionDetails,
}

impl PredictionUpdate {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if self.value.trim().is_empty() {
            errors.add("value", "Prediction value is required");
        }
        self.details.check(&mut errors);
        errors.into_result()
    }
}
