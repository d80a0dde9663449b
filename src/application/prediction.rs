//! Prediction submission and update.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use crate::domain::context::RequestContext;
use crate::domain::error::FieldErrors;
use crate::domain::id::{ForecastId, PredictionId};
use crate::domain::prediction::{Prediction, PredictionInput, PredictionUpdate};
use crate::domain::submission::FORECAST_NOT_FOUND;
use crate::error::Result;
use crate::port::outbound::store::{NewPrediction, Store};

pub struct PredictionService {
    store: Arc<dyn Store>,
}

impl PredictionService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Submit a new individual or group prediction.
    ///
    /// Shape checks run first; the submission rules are then checked and the
    /// row written in one store transaction.
    pub async fn submit(&self, ctx: &RequestContext, input: PredictionInput) -> Result<Prediction> {
        let organization = ctx.organization()?;
        input.validate()?;

        let forecast_id = ForecastId::from(input.forecast_id.trim());
        match self.store.forecast(&forecast_id).await? {
            Some(forecast) if &forecast.organization_id == organization => {}
            _ => return Err(FieldErrors::form(FORECAST_NOT_FOUND).into()),
        }

        let group_id = input.group();
        let prediction = self
            .store
            .submit_prediction(
                NewPrediction {
                    forecast_id,
                    user_id: ctx.user_id.clone(),
                    group_id,
                    value: input.value,
                    details: input.details,
                },
                Utc::now(),
            )
            .await?;

        info!(
            prediction_id = %prediction.id,
            forecast_id = %prediction.forecast_id,
            user_id = %prediction.user_id,
            group_id = prediction.group_id.as_ref().map(|g| g.as_str()),
            "Submitted prediction"
        );
        Ok(prediction)
    }

    pub async fn update(
        &self,
        ctx: &RequestContext,
        id: &PredictionId,
        update: PredictionUpdate,
    ) -> Result<Prediction> {
        ctx.organization()?;
        update.validate()?;

        let prediction = self
            .store
            .update_prediction(id, &ctx.user_id, update, Utc::now())
            .await?;

        info!(prediction_id = %prediction.id, user_id = %ctx.user_id, "Updated prediction");
        Ok(prediction)
    }

    /// The caller's prediction for a forecast, whether individual or made by
    /// their group.
    pub async fn current(
        &self,
        ctx: &RequestContext,
        forecast: &ForecastId,
    ) -> Result<Option<Prediction>> {
        ctx.organization()?;
        let group = self
            .store
            .membership(&ctx.user_id)
            .await?
            .map(|m| m.group_id);
        let predictions = self.store.forecast_predictions(forecast).await?;
        Ok(predictions.into_iter().find(|p| {
            p.user_id == ctx.user_id || (p.group_id.is_some() && p.group_id == group)
        }))
    }
}
