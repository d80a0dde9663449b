//! Application services (use cases).
//!
//! These services enforce authorization against an explicit
//! [`RequestContext`], run the domain rules and coordinate the outbound
//! ports. [`Services`] wires them together over one store.

pub mod action;
pub mod chat;
pub mod conversation;
pub mod forecast;
pub mod group;
pub mod leaderboard;
pub mod organization;
pub mod prediction;
pub mod prompt;
pub mod tools;

use std::sync::Arc;

use crate::domain::context::RequestContext;
use crate::domain::id::UserId;
use crate::error::Result;
use crate::port::outbound::cipher::SecretCipher;
use crate::port::outbound::llm::ChatModelFactory;
use crate::port::outbound::store::Store;

pub use action::ActionState;
pub use chat::{ChatInput, ChatService, ChatSettings, ChatTurn};
pub use conversation::ConversationService;
pub use forecast::{ForecastInput, ForecastService};
pub use group::GroupService;
pub use leaderboard::{Leaderboard, LeaderboardService};
pub use organization::{OrganizationService, OrganizationSettings};
pub use prediction::PredictionService;
pub use tools::ForecastTools;

/// Every use case, sharing one store.
#[derive(Clone)]
pub struct Services {
    store: Arc<dyn Store>,
    pub groups: Arc<GroupService>,
    pub predictions: Arc<PredictionService>,
    pub forecasts: Arc<ForecastService>,
    pub organizations: Arc<OrganizationService>,
    pub conversations: Arc<ConversationService>,
    pub leaderboards: Arc<LeaderboardService>,
    pub chat: ChatService,
}

impl Services {
    pub fn new(
        store: Arc<dyn Store>,
        cipher: Arc<dyn SecretCipher>,
        models: Arc<dyn ChatModelFactory>,
        chat: ChatSettings,
    ) -> Self {
        let organizations = Arc::new(OrganizationService::new(store.clone(), cipher));
        let conversations = Arc::new(ConversationService::new(store.clone()));
        let forecasts = Arc::new(ForecastService::new(store.clone()));
        let tools = Arc::new(ForecastTools::new(
            store.clone(),
            forecasts.clone(),
            conversations.clone(),
        ));
        let chat = ChatService::new(
            organizations.clone(),
            conversations.clone(),
            tools,
            models,
            chat,
        );

        Self {
            groups: Arc::new(GroupService::new(store.clone())),
            predictions: Arc::new(PredictionService::new(store.clone())),
            leaderboards: Arc::new(LeaderboardService::new(store.clone())),
            forecasts,
            organizations,
            conversations,
            chat,
            store,
        }
    }

    /// Resolve the caller identified upstream into a request context.
    ///
    /// Returns `None` for unknown users.
    pub async fn request_context(&self, user_id: &str) -> Result<Option<RequestContext>> {
        let user_id = user_id.trim();
        if user_id.is_empty() {
            return Ok(None);
        }
        let user = self.store.user(&UserId::from(user_id)).await?;
        Ok(user.map(|u| RequestContext::new(u.id, u.organization_id, u.role)))
    }
}
