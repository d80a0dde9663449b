//! Forecasts and actual-value recording.

use async_trait::async_trait;
use diesel::prelude::*;

use super::database::model::{ForecastRow, ScoreChangeset};
use super::database::schema::{forecasts, predictions};
use super::SqliteStore;
use crate::domain::forecast::Forecast;
use crate::domain::id::{ForecastId, OrganizationId, PredictionId};
use crate::domain::prediction::PredictionScore;
use crate::error::{Error, Result};
use crate::port::outbound::store::ForecastStore;

#[async_trait]
impl ForecastStore for SqliteStore {
    async fn forecast(&self, id: &ForecastId) -> Result<Option<Forecast>> {
        let mut conn = self.conn()?;
        forecasts::table
            .find(id.as_str())
            .select(ForecastRow::as_select())
            .first::<ForecastRow>(&mut conn)
            .optional()?
            .map(ForecastRow::into_domain)
            .transpose()
    }

    async fn forecasts(&self, organization: &OrganizationId) -> Result<Vec<Forecast>> {
        let mut conn = self.conn()?;
        forecasts::table
            .filter(forecasts::organization_id.eq(organization.as_str()))
            .order(forecasts::due_date.desc())
            .select(ForecastRow::as_select())
            .load::<ForecastRow>(&mut conn)?
            .into_iter()
            .map(ForecastRow::into_domain)
            .collect()
    }

    async fn title_taken(&self, organization: &OrganizationId, title: &str) -> Result<bool> {
        let mut conn = self.conn()?;
        let wanted = title.trim().to_lowercase();
        let titles = forecasts::table
            .filter(forecasts::organization_id.eq(organization.as_str()))
            .select(forecasts::title)
            .load::<String>(&mut conn)?;
        Ok(titles.iter().any(|t| t.trim().to_lowercase() == wanted))
    }

    async fn create_forecast(&self, forecast: &Forecast) -> Result<()> {
        let mut conn = self.conn()?;
        diesel::insert_into(forecasts::table)
            .values(ForecastRow::from_domain(forecast)?)
            .execute(&mut conn)?;
        Ok(())
    }

    async fn record_actual(
        &self,
        id: &ForecastId,
        actual: &str,
        scores: &[(PredictionId, PredictionScore)],
    ) -> Result<()> {
        let mut conn = self.conn()?;
        conn.immediate_transaction::<_, Error, _>(|conn| {
            let updated = diesel::update(forecasts::table.find(id.as_str()))
                .set(forecasts::actual_value.eq(actual))
                .execute(conn)?;
            if updated == 0 {
                return Err(Error::NotFound("forecast"));
            }
            for (prediction_id, score) in scores {
                diesel::update(
                    predictions::table
                        .find(prediction_id.as_str())
                        .filter(predictions::forecast_id.eq(id.as_str())),
                )
                .set(ScoreChangeset::from_domain(score))
                .execute(conn)?;
            }
            Ok(())
        })
    }
}
