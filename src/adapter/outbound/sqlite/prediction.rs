//! Prediction submission and updates.
//!
//! Both writes read their rule snapshot and write inside one `IMMEDIATE`
//! transaction, so two concurrent submissions cannot both pass the checks.
//! The unique indexes on `(forecast_id, user_id)` and `(forecast_id,
//! group_id)` back this up.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::dsl::exists;
use diesel::prelude::*;

use super::database::model::{ForecastRow, GroupRow, PredictionChangeset, PredictionRow};
use super::database::schema::{forecasts, group_members, org_groups, predictions};
use super::{is_unique_violation, SqliteStore};
use crate::domain::error::FieldErrors;
use crate::domain::forecast::Forecast;
use crate::domain::id::{ForecastId, GroupId, PredictionId, UserId};
use crate::domain::prediction::{Prediction, PredictionScore, PredictionScope, PredictionUpdate};
use crate::domain::submission::{
    check_submission, check_update, may_edit, SubmissionSnapshot, ALREADY_SUBMITTED_INDIVIDUAL,
    GROUP_ALREADY_SUBMITTED,
};
use crate::error::{Error, Result};
use crate::port::outbound::store::{NewPrediction, PredictionStore};

fn load_forecast(conn: &mut SqliteConnection, id: &str) -> Result<Option<Forecast>> {
    forecasts::table
        .find(id)
        .select(ForecastRow::as_select())
        .first::<ForecastRow>(conn)
        .optional()?
        .map(ForecastRow::into_domain)
        .transpose()
}

fn membership_of(conn: &mut SqliteConnection, user: &str) -> Result<Option<GroupId>> {
    Ok(group_members::table
        .filter(group_members::user_id.eq(user))
        .select(group_members::group_id)
        .first::<String>(conn)
        .optional()?
        .map(GroupId::from))
}

fn load_snapshot(conn: &mut SqliteConnection, new: &NewPrediction) -> Result<SubmissionSnapshot> {
    let Some(forecast) = load_forecast(conn, new.forecast_id.as_str())? else {
        return Ok(SubmissionSnapshot::default());
    };

    let own_prediction = predictions::table
        .filter(predictions::forecast_id.eq(new.forecast_id.as_str()))
        .filter(predictions::user_id.eq(new.user_id.as_str()))
        .select(predictions::group_id)
        .first::<Option<String>>(conn)
        .optional()?
        .map(|group| match group {
            Some(id) => PredictionScope::Group(GroupId::from(id)),
            None => PredictionScope::Individual,
        });

    let member_of = membership_of(conn, new.user_id.as_str())?;

    let requested_group = match &new.group_id {
        Some(id) => org_groups::table
            .find(id.as_str())
            .select(GroupRow::as_select())
            .first::<GroupRow>(conn)
            .optional()?
            .map(GroupRow::into_domain)
            .transpose()?,
        None => None,
    };

    let group_has_prediction = match new.group_id.as_ref().or(member_of.as_ref()) {
        Some(group) => diesel::select(exists(
            predictions::table
                .filter(predictions::forecast_id.eq(new.forecast_id.as_str()))
                .filter(predictions::group_id.eq(group.as_str())),
        ))
        .get_result::<bool>(conn)?,
        None => false,
    };

    Ok(SubmissionSnapshot {
        forecast: Some(forecast),
        own_prediction,
        member_of,
        requested_group,
        group_has_prediction,
    })
}

#[async_trait]
impl PredictionStore for SqliteStore {
    async fn prediction(&self, id: &PredictionId) -> Result<Option<Prediction>> {
        let mut conn = self.conn()?;
        predictions::table
            .find(id.as_str())
            .select(PredictionRow::as_select())
            .first::<PredictionRow>(&mut conn)
            .optional()?
            .map(PredictionRow::into_domain)
            .transpose()
    }

    async fn forecast_predictions(&self, forecast: &ForecastId) -> Result<Vec<Prediction>> {
        let mut conn = self.conn()?;
        predictions::table
            .filter(predictions::forecast_id.eq(forecast.as_str()))
            .order(predictions::created_at.asc())
            .select(PredictionRow::as_select())
            .load::<PredictionRow>(&mut conn)?
            .into_iter()
            .map(PredictionRow::into_domain)
            .collect()
    }

    async fn submit_prediction(
        &self,
        new: NewPrediction,
        now: DateTime<Utc>,
    ) -> Result<Prediction> {
        let mut conn = self.conn()?;
        conn.immediate_transaction::<_, Error, _>(|conn| {
            let snapshot = load_snapshot(conn, &new)?;
            check_submission(&snapshot, new.group_id.as_ref(), &new.value, now)?;

            let details = new.details.clone().normalized();
            let prediction = Prediction {
                id: PredictionId::generate(),
                forecast_id: new.forecast_id.clone(),
                user_id: new.user_id.clone(),
                group_id: new.group_id.clone(),
                value: new.value.trim().to_string(),
                confidence: details.confidence,
                reasoning: details.reasoning,
                method: details.method,
                estimated_time: details.estimated_time,
                equity_investment: details.equity_investment,
                debt_financing: details.debt_financing,
                score: PredictionScore::default(),
                created_at: now,
                updated_at: now,
            };

            match diesel::insert_into(predictions::table)
                .values(PredictionRow::from_domain(&prediction))
                .execute(conn)
            {
                Ok(_) => Ok(prediction),
                Err(err) if is_unique_violation(&err) => {
                    let message = if new.group_id.is_some() {
                        GROUP_ALREADY_SUBMITTED
                    } else {
                        ALREADY_SUBMITTED_INDIVIDUAL
                    };
                    Err(FieldErrors::form(message).into())
                }
                Err(err) => Err(err.into()),
            }
        })
    }

    async fn update_prediction(
        &self,
        id: &PredictionId,
        actor: &UserId,
        update: PredictionUpdate,
        now: DateTime<Utc>,
    ) -> Result<Prediction> {
        let mut conn = self.conn()?;
        conn.immediate_transaction::<_, Error, _>(|conn| {
            let mut prediction = predictions::table
                .find(id.as_str())
                .select(PredictionRow::as_select())
                .first::<PredictionRow>(conn)
                .optional()?
                .ok_or(Error::NotFound("prediction"))?
                .into_domain()?;

            let actor_group = membership_of(conn, actor.as_str())?;
            if !may_edit(&prediction, actor, actor_group.as_ref()) {
                return Err(Error::Forbidden(
                    "You are not authorized to update this prediction.".into(),
                ));
            }

            let forecast = load_forecast(conn, prediction.forecast_id.as_str())?
                .ok_or(Error::NotFound("forecast"))?;
            check_update(&forecast, &update.value, now)?;

            let details = update.details.normalized();
            prediction.value = update.value.trim().to_string();
            prediction.confidence = details.confidence;
            prediction.reasoning = details.reasoning;
            prediction.method = details.method;
            prediction.estimated_time = details.estimated_time;
            prediction.equity_investment = details.equity_investment;
            prediction.debt_financing = details.debt_financing;
            prediction.updated_at = now;

            diesel::update(predictions::table.find(id.as_str()))
                .set(PredictionChangeset::from_domain(&prediction))
                .execute(conn)?;
            Ok(prediction)
        })
    }
}
