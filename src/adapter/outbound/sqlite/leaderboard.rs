//! Leaderboard source loading.

use async_trait::async_trait;
use diesel::prelude::*;

use super::database::model::{PredictionRow, UserRow};
use super::database::schema::{forecasts, predictions, users};
use super::SqliteStore;
use crate::domain::id::OrganizationId;
use crate::domain::leaderboard::{LeaderboardRecord, LeaderboardSource};
use crate::error::Result;
use crate::port::outbound::store::{CategoryStore, ForecastStore, GroupStore, LeaderboardStore};

#[async_trait]
impl LeaderboardStore for SqliteStore {
    async fn leaderboard_source(&self, organization: &OrganizationId) -> Result<LeaderboardSource> {
        let forecasts = self.forecasts(organization).await?;
        let categories = self.categories(organization).await?;
        let groups = self.groups(organization).await?;

        let mut conn = self.conn()?;
        let records = predictions::table
            .inner_join(forecasts::table)
            .inner_join(users::table)
            .filter(forecasts::organization_id.eq(organization.as_str()))
            .select((PredictionRow::as_select(), UserRow::as_select()))
            .load::<(PredictionRow, UserRow)>(&mut conn)?
            .into_iter()
            .map(|(prediction, user)| {
                Ok(LeaderboardRecord {
                    prediction: prediction.into_domain()?,
                    user_name: user.name,
                    user_email: user.email,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(LeaderboardSource {
            forecasts,
            categories,
            groups,
            records,
        })
    }
}
