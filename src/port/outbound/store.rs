//! Persistence ports.
//!
//! Traits are split per concern; [`Store`] bundles them for callers that
//! need the whole database. Writes that must observe a consistent view
//! (prediction submission, category find-or-create) are single trait methods
//! so implementations can run them inside one transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::category::Category;
use crate::domain::conversation::{Conversation, Transcript};
use crate::domain::forecast::Forecast;
use crate::domain::group::{Group, GroupDetail, GroupMember, GroupSummary};
use crate::domain::id::{
    ConversationId, ForecastId, GroupId, OrganizationId, PredictionId, UserId,
};
use crate::domain::leaderboard::LeaderboardSource;
use crate::domain::organization::{Organization, User};
use crate::domain::prediction::{Prediction, PredictionDetails, PredictionScore, PredictionUpdate};
use crate::error::Result;

#[async_trait]
pub trait OrganizationStore: Send + Sync {
    async fn organization(&self, id: &OrganizationId) -> Result<Option<Organization>>;

    async fn create_organization(&self, organization: &Organization) -> Result<()>;

    async fn update_organization_profile(
        &self,
        id: &OrganizationId,
        name: &str,
        description: Option<&str>,
    ) -> Result<()>;

    async fn set_encrypted_api_key(&self, id: &OrganizationId, encrypted: &str) -> Result<()>;

    async fn set_token_limit(&self, id: &OrganizationId, limit: i64) -> Result<()>;

    /// Add `tokens` to the monthly counter in one statement.
    ///
    /// The counter restarts from zero when the stored usage month differs
    /// from `month`.
    async fn add_token_usage(&self, id: &OrganizationId, tokens: i64, month: &str) -> Result<()>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn user(&self, id: &UserId) -> Result<Option<User>>;

    async fn user_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn create_user(&self, user: &User) -> Result<()>;
}

#[async_trait]
pub trait CategoryStore: Send + Sync {
    async fn categories(&self, organization: &OrganizationId) -> Result<Vec<Category>>;

    /// Look a category up by name ignoring case, creating it when missing.
    ///
    /// Returns the category and whether it was created by this call.
    async fn find_or_create_category(
        &self,
        organization: &OrganizationId,
        name: &str,
    ) -> Result<(Category, bool)>;
}

#[async_trait]
pub trait ForecastStore: Send + Sync {
    async fn forecast(&self, id: &ForecastId) -> Result<Option<Forecast>>;

    async fn forecasts(&self, organization: &OrganizationId) -> Result<Vec<Forecast>>;

    /// True if another forecast in the organization has this title, ignoring case.
    async fn title_taken(&self, organization: &OrganizationId, title: &str) -> Result<bool>;

    async fn create_forecast(&self, forecast: &Forecast) -> Result<()>;

    /// Store the actual value together with every prediction's score.
    async fn record_actual(
        &self,
        id: &ForecastId,
        actual: &str,
        scores: &[(PredictionId, PredictionScore)],
    ) -> Result<()>;
}

#[async_trait]
pub trait GroupStore: Send + Sync {
    async fn group(&self, id: &GroupId) -> Result<Option<Group>>;

    async fn group_detail(&self, id: &GroupId) -> Result<Option<GroupDetail>>;

    async fn groups(&self, organization: &OrganizationId) -> Result<Vec<GroupSummary>>;

    async fn create_group(&self, group: &Group) -> Result<()>;

    async fn update_group(&self, group: &Group) -> Result<()>;

    /// Delete a group with its memberships and group predictions.
    async fn delete_group(&self, id: &GroupId) -> Result<bool>;

    /// The membership of `user`, if any.
    async fn membership(&self, user: &UserId) -> Result<Option<GroupMember>>;

    /// Add a member.
    ///
    /// # Errors
    ///
    /// Returns a validation error when the user already belongs to a group.
    async fn add_member(&self, member: &GroupMember) -> Result<()>;

    async fn remove_member(&self, group: &GroupId, user: &UserId) -> Result<bool>;
}

/// A prediction about to be submitted.
#[derive(Debug, Clone)]
pub struct NewPrediction {
    pub forecast_id: ForecastId,
    pub user_id: UserId,
    pub group_id: Option<GroupId>,
    pub value: String,
    pub details: PredictionDetails,
}

#[async_trait]
pub trait PredictionStore: Send + Sync {
    async fn prediction(&self, id: &PredictionId) -> Result<Option<Prediction>>;

    async fn forecast_predictions(&self, forecast: &ForecastId) -> Result<Vec<Prediction>>;

    /// Check the submission rules and insert in one transaction.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`](crate::error::Error::Validation) with the
    /// collected rule failures.
    async fn submit_prediction(&self, prediction: NewPrediction, now: DateTime<Utc>)
        -> Result<Prediction>;

    /// Check edit rights and the update rules, then write, in one transaction.
    async fn update_prediction(
        &self,
        id: &PredictionId,
        actor: &UserId,
        update: PredictionUpdate,
        now: DateTime<Utc>,
    ) -> Result<Prediction>;
}

#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn create_conversation(&self, conversation: &Conversation) -> Result<()>;

    async fn conversation(&self, id: &ConversationId) -> Result<Option<Conversation>>;

    /// Conversations of `user` in `organization`, newest first.
    async fn user_conversations(
        &self,
        user: &UserId,
        organization: &OrganizationId,
    ) -> Result<Vec<Conversation>>;

    /// Replace the transcript and add `tokens` to the running count.
    async fn save_transcript(
        &self,
        id: &ConversationId,
        transcript: &Transcript,
        tokens: i64,
        now: DateTime<Utc>,
    ) -> Result<()>;

    async fn complete_conversation(
        &self,
        id: &ConversationId,
        forecast: &ForecastId,
        now: DateTime<Utc>,
    ) -> Result<()>;

    async fn abandon_conversation(&self, id: &ConversationId, now: DateTime<Utc>) -> Result<()>;
}

#[async_trait]
pub trait LeaderboardStore: Send + Sync {
    /// Everything the leaderboard projections read for one organization.
    async fn leaderboard_source(&self, organization: &OrganizationId) -> Result<LeaderboardSource>;
}

/// The full persistence surface.
pub trait Store:
    OrganizationStore
    + UserStore
    + CategoryStore
    + ForecastStore
    + GroupStore
    + PredictionStore
    + ConversationStore
    + LeaderboardStore
{
}

impl<T> Store for T where
    T: OrganizationStore
        + UserStore
        + CategoryStore
        + ForecastStore
        + GroupStore
        + PredictionStore
        + ConversationStore
        + LeaderboardStore
{
}
