//! Running totals over a set of predictions.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::prediction::Prediction;

use super::filter::SortField;

/// Aggregated performance of one leaderboard entry.
///
/// Rates are fractions in `0..=1`. Averages are `None` when nothing
/// contributed to them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardStats {
    pub total_predictions: u32,
    pub total_completed_predictions: u32,
    pub correct_predictions: u32,
    pub incorrect_predictions: u32,
    pub accuracy_rate: Option<f64>,
    pub avg_brier_score: Option<f64>,
    pub avg_actual_error: Option<f64>,
    pub avg_forecast_error: Option<f64>,
    pub total_equity_investment: Decimal,
    pub total_debt_financing: Decimal,
    pub total_investment: Decimal,
    pub total_net_profit: Decimal,
    /// Net profit over the capital staked on scored predictions.
    pub roi_real: Option<f64>,
    /// Mean of per-prediction ROI.
    pub roi_average: Option<f64>,
    pub total_time_minutes: i64,
    pub avg_time_per_forecast_minutes: Option<f64>,
}

impl LeaderboardStats {
    /// Numeric value of `field`, for sorting.
    #[must_use]
    pub fn metric(&self, field: SortField) -> Option<f64> {
        match field {
            SortField::TotalPredictions => Some(f64::from(self.total_predictions)),
            SortField::TotalCompletedPredictions => {
                Some(f64::from(self.total_completed_predictions))
            }
            SortField::CorrectPredictions => Some(f64::from(self.correct_predictions)),
            SortField::AccuracyRate => self.accuracy_rate,
            SortField::AvgBrierScore => self.avg_brier_score,
            SortField::AvgActualError => self.avg_actual_error,
            SortField::AvgForecastError => self.avg_forecast_error,
            SortField::TotalEquityInvestment => self.total_equity_investment.to_f64(),
            SortField::TotalDebtFinancing => self.total_debt_financing.to_f64(),
            SortField::TotalInvestment => self.total_investment.to_f64(),
            SortField::TotalNetProfit => self.total_net_profit.to_f64(),
            SortField::RoiReal => self.roi_real,
            SortField::RoiAverage => self.roi_average,
            SortField::AvgTimePerForecastMinutes => self.avg_time_per_forecast_minutes,
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct Mean {
    sum: f64,
    count: u32,
}

impl Mean {
    fn push(&mut self, value: Option<f64>) {
        if let Some(value) = value {
            self.sum += value;
            self.count += 1;
        }
    }

    fn value(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / f64::from(self.count))
    }
}

/// Accumulator fed one prediction at a time.
#[derive(Debug, Default)]
pub struct Tally {
    total: u32,
    completed: u32,
    correct: u32,
    incorrect: u32,
    brier: Mean,
    actual_error: Mean,
    forecast_error: Mean,
    roi: Mean,
    equity: Decimal,
    debt: Decimal,
    net_profit: Decimal,
    scored_stake: Decimal,
    time: Mean,
}

impl Tally {
    pub fn add(&mut self, prediction: &Prediction) {
        self.total += 1;
        self.equity = self
            .equity
            .saturating_add(prediction.equity_investment.unwrap_or_default());
        self.debt = self
            .debt
            .saturating_add(prediction.debt_financing.unwrap_or_default());
        self.time.push(prediction.estimated_time.map(f64::from));

        let score = &prediction.score;
        if !score.is_scored() {
            return;
        }
        self.completed += 1;
        match score.is_correct {
            Some(true) => self.correct += 1,
            Some(false) => self.incorrect += 1,
            None => {}
        }
        self.brier.push(score.brier_score);
        self.actual_error.push(score.absolute_actual_error_pct);
        self.forecast_error.push(score.absolute_forecast_error_pct);
        self.roi.push(score.roi);
        if let (Some(profit), Some(stake)) = (score.net_profit, prediction.stake()) {
            self.net_profit = self.net_profit.saturating_add(profit);
            self.scored_stake = self.scored_stake.saturating_add(stake);
        }
    }

    #[must_use]
    pub fn finish(self) -> LeaderboardStats {
        let judged = self.correct + self.incorrect;
        LeaderboardStats {
            total_predictions: self.total,
            total_completed_predictions: self.completed,
            correct_predictions: self.correct,
            incorrect_predictions: self.incorrect,
            accuracy_rate: (judged > 0).then(|| f64::from(self.correct) / f64::from(judged)),
            avg_brier_score: self.brier.value(),
            avg_actual_error: self.actual_error.value(),
            avg_forecast_error: self.forecast_error.value(),
            total_equity_investment: self.equity,
            total_debt_financing: self.debt,
            total_investment: self.equity.saturating_add(self.debt),
            total_net_profit: self.net_profit,
            roi_real: if self.scored_stake > Decimal::ZERO {
                self.net_profit
                    .checked_div(self.scored_stake)
                    .and_then(|r| r.to_f64())
            } else {
                None
            },
            roi_average: self.roi.value(),
            total_time_minutes: self.time.sum as i64,
            avg_time_per_forecast_minutes: self.time.value(),
        }
    }
}
