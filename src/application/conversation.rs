//! AI conversation bookkeeping.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::domain::context::RequestContext;
use crate::domain::conversation::{
    conversation_title, Conversation, ConversationStatus, Transcript, TranscriptMessage,
};
use crate::domain::id::{ConversationId, ForecastId};
use crate::error::{Error, Result};
use crate::port::outbound::store::Store;

pub const NOT_OWNER: &str = "Conversation does not belong to user";

/// Conversation list row.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    #[serde(flatten)]
    pub conversation: Conversation,
    pub message_count: usize,
}

/// A conversation with its transcript.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationView {
    #[serde(flatten)]
    pub conversation: Conversation,
    pub messages: Vec<TranscriptMessage>,
}

impl From<Conversation> for ConversationView {
    fn from(conversation: Conversation) -> Self {
        let messages = conversation.transcript.messages().to_vec();
        Self {
            conversation,
            messages,
        }
    }
}

pub struct ConversationService {
    store: Arc<dyn Store>,
}

impl ConversationService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Open a conversation titled after the first user message.
    pub async fn start(&self, ctx: &RequestContext, first_message: &str) -> Result<Conversation> {
        let organization = ctx.organization()?;
        let now = Utc::now();
        let conversation = Conversation {
            id: ConversationId::generate(),
            organization_id: organization.clone(),
            user_id: ctx.user_id.clone(),
            title: conversation_title(first_message),
            transcript: Transcript::new(),
            token_count: 0,
            status: ConversationStatus::InProgress,
            forecast_id: None,
            created_at: now,
            updated_at: now,
        };
        self.store.create_conversation(&conversation).await?;
        info!(conversation_id = %conversation.id, user_id = %ctx.user_id, "Started conversation");
        Ok(conversation)
    }

    /// Load a conversation owned by the caller.
    pub async fn owned(&self, ctx: &RequestContext, id: &ConversationId) -> Result<Conversation> {
        let organization = ctx.organization()?;
        let conversation = self
            .store
            .conversation(id)
            .await?
            .ok_or(Error::NotFound("conversation"))?;
        if !conversation.is_owned_by(&ctx.user_id, organization) {
            return Err(Error::Forbidden(NOT_OWNER.into()));
        }
        Ok(conversation)
    }

    pub async fn get(&self, ctx: &RequestContext, id: &ConversationId) -> Result<ConversationView> {
        self.owned(ctx, id).await.map(ConversationView::from)
    }

    /// The caller's conversations, newest first.
    pub async fn list(&self, ctx: &RequestContext) -> Result<Vec<ConversationSummary>> {
        let organization = ctx.organization()?;
        let conversations = self
            .store
            .user_conversations(&ctx.user_id, organization)
            .await?;
        Ok(conversations
            .into_iter()
            .map(|conversation| ConversationSummary {
                message_count: conversation.transcript.len(),
                conversation,
            })
            .collect())
    }

    pub async fn message_count(&self, ctx: &RequestContext, id: &ConversationId) -> Result<usize> {
        Ok(self.owned(ctx, id).await?.transcript.len())
    }

    pub async fn abandon(&self, ctx: &RequestContext, id: &ConversationId) -> Result<()> {
        let conversation = self.owned(ctx, id).await?;
        if conversation.status == ConversationStatus::InProgress {
            self.store.abandon_conversation(id, Utc::now()).await?;
            info!(conversation_id = %id, "Abandoned conversation");
        }
        Ok(())
    }

    pub async fn save_turn(
        &self,
        id: &ConversationId,
        transcript: &Transcript,
        tokens: i64,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.store.save_transcript(id, transcript, tokens, now).await
    }

    /// Mark a conversation completed and link the forecast it produced.
    pub async fn complete(&self, id: &ConversationId, forecast: &ForecastId) -> Result<()> {
        self.store
            .complete_conversation(id, forecast, Utc::now())
            .await?;
        info!(conversation_id = %id, forecast_id = %forecast, "Completed conversation");
        Ok(())
    }
}
