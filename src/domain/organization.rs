//! Organizations, their members and the monthly AI token quota.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::context::Role;
use super::error::FieldErrors;
use super::id::{OrganizationId, UserId};

/// Default monthly AI token allowance for a new organization.
pub const DEFAULT_AI_TOKEN_LIMIT: i64 = 100_000;

/// Lowest token limit an administrator may configure.
pub const MIN_AI_TOKEN_LIMIT: i64 = 1_000;

/// Highest token limit an administrator may configure.
pub const MAX_AI_TOKEN_LIMIT: i64 = 10_000_000;

/// An organization owning users, groups, categories and forecasts.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub id: OrganizationId,
    pub name: String,
    pub description: Option<String>,
    /// API key in `iv:authTag:ciphertext` form. Never serialized.
    #[serde(skip)]
    pub encrypted_api_key: Option<String>,
    pub ai_token_limit: i64,
    pub ai_tokens_used_this_month: i64,
    /// Month (`YYYY-MM`) the usage counter belongs to.
    pub ai_usage_month: String,
    pub created_at: DateTime<Utc>,
}

impl Organization {
    /// Tokens consumed in the month containing `now`.
    ///
    /// A counter recorded for an earlier month counts as zero.
    #[must_use]
    pub fn tokens_used_at(&self, now: DateTime<Utc>) -> i64 {
        if self.ai_usage_month == usage_month(now) {
            self.ai_tokens_used_this_month
        } else {
            0
        }
    }

    /// Check the monthly quota before starting a model call.
    ///
    /// # Errors
    /// Returns a user-facing message when the quota is used up.
    pub fn check_token_quota(&self, now: DateTime<Utc>) -> Result<(), String> {
        let used = self.tokens_used_at(now);
        if used >= self.ai_token_limit {
            return Err(format!(
                "Monthly AI token limit exceeded ({used}/{} tokens used)",
                self.ai_token_limit
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn has_api_key(&self) -> bool {
        self.encrypted_api_key.is_some()
    }
}

/// Usage month key for a timestamp.
#[must_use]
pub fn usage_month(now: DateTime<Utc>) -> String {
    now.format("%Y-%m").to_string()
}

/// A platform user.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub name: Option<String>,
    pub email: String,
    pub role: Role,
    pub organization_id: Option<OrganizationId>,
    pub created_at: DateTime<Utc>,
}

/// Organization name and description update.
#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationSettingsInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl OrganizationSettingsInput {
    /// Schema validation for the settings form.
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        let name = self.name.trim();
        if name.chars().count() < 2 {
            errors.add("name", "Organization name must be at least 2 characters long");
        } else if name.chars().count() > 100 {
            errors.add("name", "Organization name cannot exceed 100 characters");
        }
        if let Some(description) = &self.description {
            if description.chars().count() > 600 {
                errors.add("description", "Description cannot exceed 600 characters");
            }
        }
        errors.into_result()
    }
}

/// Validate an OpenAI API key before it is encrypted and stored.
pub fn validate_api_key(api_key: &str) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();
    if api_key.is_empty() {
        errors.add("apiKey", "API key is required");
    } else if !api_key.starts_with("sk-") {
        errors.add("apiKey", "Invalid OpenAI API key format");
    }
    errors.into_result()
}

/// Validate a monthly token limit.
pub fn validate_token_limit(limit: i64) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();
    if limit < MIN_AI_TOKEN_LIMIT {
        errors.add("tokenLimit", "Token limit must be at least 1,000");
    } else if limit > MAX_AI_TOKEN_LIMIT {
        errors.add("tokenLimit", "Token limit cannot exceed 10,000,000");
    }
    errors.into_result()
}
