//! Per-prediction scoring once a forecast's actual value is known.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

use super::forecast::{parse_binary, Forecast, ForecastType};
use super::prediction::{Prediction, PredictionScore};

/// Confidence assumed when a prediction carries none.
pub const DEFAULT_CONFIDENCE: i32 = 50;

/// Lowest probability used when pricing a correct call.
const MIN_PROBABILITY: f64 = 0.01;

/// Score one prediction against the recorded `actual` value.
#[must_use]
pub fn score_prediction(
    forecast: &Forecast,
    prediction: &Prediction,
    actual: &str,
    now: DateTime<Utc>,
) -> PredictionScore {
    let mut score = PredictionScore {
        scored_at: Some(now),
        ..PredictionScore::default()
    };
    let stake = prediction.stake();
    let confidence = f64::from(prediction.confidence.unwrap_or(DEFAULT_CONFIDENCE)) / 100.0;

    match forecast.forecast_type {
        ForecastType::Binary => {
            let (Some(predicted), Some(outcome)) =
                (parse_binary(&prediction.value), parse_binary(actual))
            else {
                return score;
            };
            let correct = predicted == outcome;
            let p_true = if predicted { confidence } else { 1.0 - confidence };
            let o = if outcome { 1.0 } else { 0.0 };
            score.is_correct = Some(correct);
            score.brier_score = Some((p_true - o).powi(2));
            score.net_profit = stake.and_then(|s| priced_profit(s, confidence, correct));
        }
        ForecastType::Categorical => {
            let correct = prediction.value.trim() == actual.trim();
            score.is_correct = Some(correct);
            score.net_profit = stake.and_then(|s| priced_profit(s, confidence, correct));
        }
        ForecastType::Continuous => {
            let (Ok(v), Ok(a)) = (
                prediction.value.trim().parse::<f64>(),
                actual.trim().parse::<f64>(),
            ) else {
                return score;
            };
            let error = (v - a).abs();
            score.absolute_error = Some(error);
            score.is_correct = Some(error == 0.0);
            score.absolute_actual_error_pct = (a != 0.0).then(|| error / a.abs());
            score.absolute_forecast_error_pct = (v != 0.0).then(|| error / v.abs());
            score.net_profit = match (stake, score.absolute_actual_error_pct) {
                (Some(s), Some(pct)) => scaled(s, 1.0 - 2.0 * pct.min(1.0)),
                _ => None,
            };
        }
    }

    score.roi = match (score.net_profit, stake) {
        (Some(profit), Some(s)) => profit.checked_div(s).and_then(|r| r.to_f64()),
        _ => None,
    };
    score
}

/// Profit of a call priced at probability `p`: a correct call earns
/// `stake * (1 - p) / p`, an incorrect one loses the stake.
fn priced_profit(stake: Decimal, p: f64, correct: bool) -> Option<Decimal> {
    if !correct {
        return Some(-stake);
    }
    let p = p.max(MIN_PROBABILITY);
    scaled(stake, (1.0 - p) / p)
}

/// `None` when the product overflows.
fn scaled(stake: Decimal, factor: f64) -> Option<Decimal> {
    let factor = Decimal::from_f64(factor).unwrap_or_default();
    stake.checked_mul(factor).map(|v| v.round_dp(2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::forecast::DataType;
    use crate::domain::id::{ForecastId, OrganizationId, PredictionId, UserId};
    use rust_decimal_macros::dec;

    fn forecast(kind: ForecastType) -> Forecast {
        let now = Utc::now();
        Forecast {
            id: ForecastId::from("f1"),
            title: "t".into(),
            description: None,
            forecast_type: kind,
            data_type: (kind == ForecastType::Continuous).then_some(DataType::Number),
            due_date: now,
            data_release_date: now,
            actual_value: None,
            organization_id: OrganizationId::from("org"),
            category_id: None,
            options: None,
            created_at: now,
        }
    }

    fn prediction(value: &str, confidence: Option<i32>, equity: Option<Decimal>) -> Prediction {
        let now = Utc::now();
        Prediction {
            id: PredictionId::from("p1"),
            forecast_id: ForecastId::from("f1"),
            user_id: UserId::from("u1"),
            group_id: None,
            value: value.into(),
            confidence,
            reasoning: None,
            method: None,
            estimated_time: None,
            equity_investment: equity,
            debt_financing: None,
            score: PredictionScore::default(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn binary_brier_and_profit() {
        let f = forecast(ForecastType::Binary);
        let score = score_prediction(&f, &prediction("true", Some(80), Some(dec!(1000))), "true", Utc::now());
        assert_eq!(score.is_correct, Some(true));
        assert!((score.brier_score.unwrap() - 0.04).abs() < 1e-9);
        assert_eq!(score.net_profit, Some(dec!(250.00)));
        assert!((score.roi.unwrap() - 0.25).abs() < 1e-9);
    }

    #[test]
    fn binary_wrong_call_loses_stake() {
        let f = forecast(ForecastType::Binary);
        let score = score_prediction(&f, &prediction("false", Some(70), Some(dec!(500))), "true", Utc::now());
        assert_eq!(score.is_correct, Some(false));
        // Probability of "true" was 0.3.
        assert!((score.brier_score.unwrap() - 0.49).abs() < 1e-9);
        assert_eq!(score.net_profit, Some(dec!(-500)));
        assert_eq!(score.roi, Some(-1.0));
    }

    #[test]
    fn no_stake_means_no_profit() {
        let f = forecast(ForecastType::Binary);
        let score = score_prediction(&f, &prediction("true", None, None), "true", Utc::now());
        assert!((score.brier_score.unwrap() - 0.25).abs() < 1e-9);
        assert_eq!(score.net_profit, None);
        assert_eq!(score.roi, None);
    }

    #[test]
    fn continuous_errors_and_profit() {
        let f = forecast(ForecastType::Continuous);
        let score = score_prediction(&f, &prediction("110", None, Some(dec!(1000))), "100", Utc::now());
        assert_eq!(score.absolute_error, Some(10.0));
        assert!((score.absolute_actual_error_pct.unwrap() - 0.1).abs() < 1e-9);
        assert!((score.absolute_forecast_error_pct.unwrap() - 10.0 / 110.0).abs() < 1e-9);
        assert_eq!(score.net_profit, Some(dec!(800.00)));
        assert_eq!(score.is_correct, Some(false));
    }

    #[test]
    fn continuous_zero_actual_has_no_pct() {
        let f = forecast(ForecastType::Continuous);
        let score = score_prediction(&f, &prediction("5", None, Some(dec!(100))), "0", Utc::now());
        assert_eq!(score.absolute_actual_error_pct, None);
        assert_eq!(score.net_profit, None);
    }

    #[test]
    fn continuous_loss_capped_at_stake() {
        let f = forecast(ForecastType::Continuous);
        let score = score_prediction(&f, &prediction("400", None, Some(dec!(100))), "100", Utc::now());
        assert_eq!(score.net_profit, Some(dec!(-100)));
    }

    #[test]
    fn unrepresentable_profit_is_left_unset() {
        let f = forecast(ForecastType::Binary);
        let score = score_prediction(&f, &prediction("true", Some(1), Some(Decimal::MAX)), "true", Utc::now());
        assert_eq!(score.is_correct, Some(true));
        assert!(score.brier_score.is_some());
        assert_eq!(score.net_profit, None);
        assert_eq!(score.roi, None);
    }

    #[test]
    fn categorical_exact_match() {
        let f = forecast(ForecastType::Categorical);
        let score = score_prediction(&f, &prediction("high", None, None), "high", Utc::now());
        assert_eq!(score.is_correct, Some(true));
        assert!(score.is_scored());
    }
}
