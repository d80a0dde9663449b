//! AI conversation persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;

use super::database::model::ConversationRow;
use super::database::schema::ai_conversations;
use super::SqliteStore;
use crate::domain::conversation::{Conversation, ConversationStatus, Transcript};
use crate::domain::id::{ConversationId, ForecastId, OrganizationId, UserId};
use crate::error::{Error, Result};
use crate::port::outbound::store::ConversationStore;

fn touched(updated: usize) -> Result<()> {
    if updated == 0 {
        return Err(Error::NotFound("conversation"));
    }
    Ok(())
}

#[async_trait]
impl ConversationStore for SqliteStore {
    async fn create_conversation(&self, conversation: &Conversation) -> Result<()> {
        let mut conn = self.conn()?;
        diesel::insert_into(ai_conversations::table)
            .values(ConversationRow::from_domain(conversation)?)
            .execute(&mut conn)?;
        Ok(())
    }

    async fn conversation(&self, id: &ConversationId) -> Result<Option<Conversation>> {
        let mut conn = self.conn()?;
        ai_conversations::table
            .find(id.as_str())
            .select(ConversationRow::as_select())
            .first::<ConversationRow>(&mut conn)
            .optional()?
            .map(ConversationRow::into_domain)
            .transpose()
    }

    async fn user_conversations(
        &self,
        user: &UserId,
        organization: &OrganizationId,
    ) -> Result<Vec<Conversation>> {
        let mut conn = self.conn()?;
        ai_conversations::table
            .filter(ai_conversations::user_id.eq(user.as_str()))
            .filter(ai_conversations::organization_id.eq(organization.as_str()))
            .order(ai_conversations::updated_at.desc())
            .select(ConversationRow::as_select())
            .load::<ConversationRow>(&mut conn)?
            .into_iter()
            .map(ConversationRow::into_domain)
            .collect()
    }

    async fn save_transcript(
        &self,
        id: &ConversationId,
        transcript: &Transcript,
        tokens: i64,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let json = transcript.to_json()?;
        let mut conn = self.conn()?;
        let updated = diesel::update(ai_conversations::table.find(id.as_str()))
            .set((
                ai_conversations::transcript.eq(json),
                ai_conversations::token_count.eq(ai_conversations::token_count + tokens),
                ai_conversations::updated_at.eq(now.to_rfc3339()),
            ))
            .execute(&mut conn)?;
        touched(updated)
    }

    async fn complete_conversation(
        &self,
        id: &ConversationId,
        forecast: &ForecastId,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let mut conn = self.conn()?;
        let updated = diesel::update(ai_conversations::table.find(id.as_str()))
            .set((
                ai_conversations::status.eq(ConversationStatus::Completed.as_str()),
                ai_conversations::forecast_id.eq(forecast.as_str()),
                ai_conversations::updated_at.eq(now.to_rfc3339()),
            ))
            .execute(&mut conn)?;
        touched(updated)
    }

    async fn abandon_conversation(&self, id: &ConversationId, now: DateTime<Utc>) -> Result<()> {
        let mut conn = self.conn()?;
        let updated = diesel::update(ai_conversations::table.find(id.as_str()))
            .set((
                ai_conversations::status.eq(ConversationStatus::Abandoned.as_str()),
                ai_conversations::updated_at.eq(now.to_rfc3339()),
            ))
            .execute(&mut conn)?;
        touched(updated)
    }
}
