//! Storage-agnostic domain model and rules.

pub mod category;
pub mod context;
pub mod conversation;
pub mod error;
pub mod forecast;
pub mod group;
pub mod id;
pub mod leaderboard;
pub mod organization;
pub mod prediction;
pub mod scoring;
pub mod submission;

pub use category::Category;
pub use context::{RequestContext, Role};
pub use conversation::{Conversation, ConversationStatus, MessageRole, Transcript};
pub use error::{DomainError, FieldErrors, FORM_FIELD};
pub use forecast::{DataType, Forecast, ForecastType, NewForecast};
pub use group::{Group, GroupDetail, GroupMember, GroupSummary};
pub use id::{
    CategoryId, ConversationId, ForecastId, GroupId, OrganizationId, PredictionId, UserId,
};
pub use organization::{Organization, User};
pub use prediction::{Prediction, PredictionInput, PredictionScope, PredictionUpdate};
