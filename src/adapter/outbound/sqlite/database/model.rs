//! Database model types for Diesel ORM and their domain conversions.
//!
//! Timestamps are stored as RFC 3339 text, decimals as text and the
//! categorical option list as a JSON array.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use rust_decimal::Decimal;

use super::schema::{
    ai_conversations, categories, forecasts, group_members, org_groups, organizations,
    predictions, users,
};
use crate::domain::category::Category;
use crate::domain::conversation::{Conversation, Transcript};
use crate::domain::forecast::Forecast;
use crate::domain::group::{Group, GroupMember};
use crate::domain::id::{
    CategoryId, ConversationId, ForecastId, GroupId, OrganizationId, PredictionId, UserId,
};
use crate::domain::organization::{Organization, User};
use crate::domain::prediction::{Prediction, PredictionScore};
use crate::error::{Error, Result};

pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| Error::Parse(format!("timestamp {raw}: {e}")))
}

fn parse_decimal(raw: Option<String>) -> Result<Option<Decimal>> {
    raw.map(|s| Decimal::from_str(&s).map_err(|e| Error::Parse(format!("decimal {s}: {e}"))))
        .transpose()
}

fn parse_optional_timestamp(raw: Option<String>) -> Result<Option<DateTime<Utc>>> {
    raw.as_deref().map(parse_timestamp).transpose()
}

#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = organizations)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct OrganizationRow {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub encrypted_api_key: Option<String>,
    pub ai_token_limit: i64,
    pub ai_tokens_used_this_month: i64,
    pub ai_usage_month: String,
    pub created_at: String,
}

impl OrganizationRow {
    pub fn from_domain(org: &Organization) -> Self {
        Self {
            id: org.id.to_string(),
            name: org.name.clone(),
            description: org.description.clone(),
            encrypted_api_key: org.encrypted_api_key.clone(),
            ai_token_limit: org.ai_token_limit,
            ai_tokens_used_this_month: org.ai_tokens_used_this_month,
            ai_usage_month: org.ai_usage_month.clone(),
            created_at: org.created_at.to_rfc3339(),
        }
    }

    pub fn into_domain(self) -> Result<Organization> {
        Ok(Organization {
            id: OrganizationId::from(self.id),
            name: self.name,
            description: self.description,
            encrypted_api_key: self.encrypted_api_key,
            ai_token_limit: self.ai_token_limit,
            ai_tokens_used_this_month: self.ai_tokens_used_this_month,
            ai_usage_month: self.ai_usage_month,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct UserRow {
    pub id: String,
    pub name: Option<String>,
    pub email: String,
    pub role: String,
    pub organization_id: Option<String>,
    pub created_at: String,
}

impl UserRow {
    pub fn from_domain(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role.as_str().to_string(),
            organization_id: user.organization_id.as_ref().map(ToString::to_string),
            created_at: user.created_at.to_rfc3339(),
        }
    }

    pub fn into_domain(self) -> Result<User> {
        Ok(User {
            id: UserId::from(self.id),
            name: self.name,
            email: self.email,
            role: self.role.parse()?,
            organization_id: self.organization_id.map(OrganizationId::from),
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = categories)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct CategoryRow {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub color: Option<String>,
    pub organization_id: String,
    pub created_at: String,
}

impl CategoryRow {
    pub fn from_domain(category: &Category) -> Self {
        Self {
            id: category.id.to_string(),
            name: category.name.clone(),
            description: category.description.clone(),
            color: category.color.clone(),
            organization_id: category.organization_id.to_string(),
            created_at: category.created_at.to_rfc3339(),
        }
    }

    pub fn into_domain(self) -> Result<Category> {
        Ok(Category {
            id: CategoryId::from(self.id),
            name: self.name,
            description: self.description,
            color: self.color,
            organization_id: OrganizationId::from(self.organization_id),
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = forecasts)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ForecastRow {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub forecast_type: String,
    pub data_type: Option<String>,
    pub due_date: String,
    pub data_release_date: String,
    pub actual_value: Option<String>,
    pub organization_id: String,
    pub category_id: Option<String>,
    pub options: Option<String>,
    pub created_at: String,
}

impl ForecastRow {
    pub fn from_domain(forecast: &Forecast) -> Result<Self> {
        Ok(Self {
            id: forecast.id.to_string(),
            title: forecast.title.clone(),
            description: forecast.description.clone(),
            forecast_type: forecast.forecast_type.as_str().to_string(),
            data_type: forecast.data_type.map(|d| d.as_str().to_string()),
            due_date: forecast.due_date.to_rfc3339(),
            data_release_date: forecast.data_release_date.to_rfc3339(),
            actual_value: forecast.actual_value.clone(),
            organization_id: forecast.organization_id.to_string(),
            category_id: forecast.category_id.as_ref().map(ToString::to_string),
            options: forecast
                .options
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?,
            created_at: forecast.created_at.to_rfc3339(),
        })
    }

    pub fn into_domain(self) -> Result<Forecast> {
        Ok(Forecast {
            id: ForecastId::from(self.id),
            title: self.title,
            description: self.description,
            forecast_type: self.forecast_type.parse()?,
            data_type: self.data_type.as_deref().map(str::parse).transpose()?,
            due_date: parse_timestamp(&self.due_date)?,
            data_release_date: parse_timestamp(&self.data_release_date)?,
            actual_value: self.actual_value,
            organization_id: OrganizationId::from(self.organization_id),
            category_id: self.category_id.map(CategoryId::from),
            options: self
                .options
                .as_deref()
                .map(serde_json::from_str)
                .transpose()?,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

#[derive(Queryable, Selectable, Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = org_groups)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(treat_none_as_null = true)]
pub struct GroupRow {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub organization_id: String,
    pub created_at: String,
}

impl GroupRow {
    pub fn from_domain(group: &Group) -> Self {
        Self {
            id: group.id.to_string(),
            name: group.name.clone(),
            description: group.description.clone(),
            organization_id: group.organization_id.to_string(),
            created_at: group.created_at.to_rfc3339(),
        }
    }

    pub fn into_domain(self) -> Result<Group> {
        Ok(Group {
            id: GroupId::from(self.id),
            name: self.name,
            description: self.description,
            organization_id: OrganizationId::from(self.organization_id),
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = group_members)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct GroupMemberRow {
    pub group_id: String,
    pub user_id: String,
    pub joined_at: String,
}

impl GroupMemberRow {
    pub fn from_domain(member: &GroupMember) -> Self {
        Self {
            group_id: member.group_id.to_string(),
            user_id: member.user_id.to_string(),
            joined_at: member.joined_at.to_rfc3339(),
        }
    }

    pub fn into_domain(self) -> Result<GroupMember> {
        Ok(GroupMember {
            group_id: GroupId::from(self.group_id),
            user_id: UserId::from(self.user_id),
            joined_at: parse_timestamp(&self.joined_at)?,
        })
    }
}

#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = predictions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PredictionRow {
    pub id: String,
    pub forecast_id: String,
    pub user_id: String,
    pub group_id: Option<String>,
    pub value: String,
    pub confidence: Option<i32>,
    pub reasoning: Option<String>,
    pub method: Option<String>,
    pub estimated_time: Option<i32>,
    pub equity_investment: Option<String>,
    pub debt_financing: Option<String>,
    pub is_correct: Option<bool>,
    pub absolute_error: Option<f64>,
    pub absolute_actual_error_pct: Option<f64>,
    pub absolute_forecast_error_pct: Option<f64>,
    pub brier_score: Option<f64>,
    pub net_profit: Option<String>,
    pub roi: Option<f64>,
    pub scored_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl PredictionRow {
    pub fn from_domain(prediction: &Prediction) -> Self {
        let score = ScoreChangeset::from_domain(&prediction.score);
        Self {
            id: prediction.id.to_string(),
            forecast_id: prediction.forecast_id.to_string(),
            user_id: prediction.user_id.to_string(),
            group_id: prediction.group_id.as_ref().map(ToString::to_string),
            value: prediction.value.clone(),
            confidence: prediction.confidence,
            reasoning: prediction.reasoning.clone(),
            method: prediction.method.clone(),
            estimated_time: prediction.estimated_time,
            equity_investment: prediction.equity_investment.map(|d| d.to_string()),
            debt_financing: prediction.debt_financing.map(|d| d.to_string()),
            is_correct: score.is_correct,
            absolute_error: score.absolute_error,
            absolute_actual_error_pct: score.absolute_actual_error_pct,
            absolute_forecast_error_pct: score.absolute_forecast_error_pct,
            brier_score: score.brier_score,
            net_profit: score.net_profit,
            roi: score.roi,
            scored_at: score.scored_at,
            created_at: prediction.created_at.to_rfc3339(),
            updated_at: prediction.updated_at.to_rfc3339(),
        }
    }

    pub fn into_domain(self) -> Result<Prediction> {
        Ok(Prediction {
            id: PredictionId::from(self.id),
            forecast_id: ForecastId::from(self.forecast_id),
            user_id: UserId::from(self.user_id),
            group_id: self.group_id.map(GroupId::from),
            value: self.value,
            confidence: self.confidence,
            reasoning: self.reasoning,
            method: self.method,
            estimated_time: self.estimated_time,
            equity_investment: parse_decimal(self.equity_investment)?,
            debt_financing: parse_decimal(self.debt_financing)?,
            score: PredictionScore {
                is_correct: self.is_correct,
                absolute_error: self.absolute_error,
                absolute_actual_error_pct: self.absolute_actual_error_pct,
                absolute_forecast_error_pct: self.absolute_forecast_error_pct,
                brier_score: self.brier_score,
                net_profit: parse_decimal(self.net_profit)?,
                roi: self.roi,
                scored_at: parse_optional_timestamp(self.scored_at)?,
            },
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

/// Editable prediction fields.
#[derive(AsChangeset, Debug, Clone)]
#[diesel(table_name = predictions)]
#[diesel(treat_none_as_null = true)]
pub struct PredictionChangeset {
    pub value: String,
    pub confidence: Option<i32>,
    pub reasoning: Option<String>,
    pub method: Option<String>,
    pub estimated_time: Option<i32>,
    pub equity_investment: Option<String>,
    pub debt_financing: Option<String>,
    pub updated_at: String,
}

impl PredictionChangeset {
    pub fn from_domain(prediction: &Prediction) -> Self {
        Self {
            value: prediction.value.clone(),
            confidence: prediction.confidence,
            reasoning: prediction.reasoning.clone(),
            method: prediction.method.clone(),
            estimated_time: prediction.estimated_time,
            equity_investment: prediction.equity_investment.map(|d| d.to_string()),
            debt_financing: prediction.debt_financing.map(|d| d.to_string()),
            updated_at: prediction.updated_at.to_rfc3339(),
        }
    }
}

/// Derived scoring fields.
#[derive(AsChangeset, Debug, Clone)]
#[diesel(table_name = predictions)]
#[diesel(treat_none_as_null = true)]
pub struct ScoreChangeset {
    pub is_correct: Option<bool>,
    pub absolute_error: Option<f64>,
    pub absolute_actual_error_pct: Option<f64>,
    pub absolute_forecast_error_pct: Option<f64>,
    pub brier_score: Option<f64>,
    pub net_profit: Option<String>,
    pub roi: Option<f64>,
    pub scored_at: Option<String>,
}

impl ScoreChangeset {
    pub fn from_domain(score: &PredictionScore) -> Self {
        Self {
            is_correct: score.is_correct,
            absolute_error: score.absolute_error,
            absolute_actual_error_pct: score.absolute_actual_error_pct,
            absolute_forecast_error_pct: score.absolute_forecast_error_pct,
            brier_score: score.brier_score,
            net_profit: score.net_profit.map(|d| d.to_string()),
            roi: score.roi,
            scored_at: score.scored_at.map(|ts| ts.to_rfc3339()),
        }
    }
}

#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = ai_conversations)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ConversationRow {
    pub id: String,
    pub organization_id: String,
    pub user_id: String,
    pub title: String,
    pub transcript: String,
    pub token_count: i64,
    pub status: String,
    pub forecast_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl ConversationRow {
    pub fn from_domain(conversation: &Conversation) -> Result<Self> {
        Ok(Self {
            id: conversation.id.to_string(),
            organization_id: conversation.organization_id.to_string(),
            user_id: conversation.user_id.to_string(),
            title: conversation.title.clone(),
            transcript: conversation.transcript.to_json()?,
            token_count: conversation.token_count,
            status: conversation.status.as_str().to_string(),
            forecast_id: conversation.forecast_id.as_ref().map(ToString::to_string),
            created_at: conversation.created_at.to_rfc3339(),
            updated_at: conversation.updated_at.to_rfc3339(),
        })
    }

    pub fn into_domain(self) -> Result<Conversation> {
        Ok(Conversation {
            id: ConversationId::from(self.id),
            organization_id: OrganizationId::from(self.organization_id),
            user_id: UserId::from(self.user_id),
            title: self.title,
            transcript: Transcript::from_json(&self.transcript)?,
            token_count: self.token_count,
            status: self.status.parse()?,
            forecast_id: self.forecast_id.map(ForecastId::from),
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}
