//! Organization settings and AI token accounting.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::domain::context::{RequestContext, Role};
use crate::domain::error::FieldErrors;
use crate::domain::id::{OrganizationId, UserId};
use crate::domain::organization::{
    usage_month, validate_api_key, validate_token_limit, Organization, OrganizationSettingsInput,
    User, DEFAULT_AI_TOKEN_LIMIT,
};
use crate::error::{Error, LlmError, Result};
use crate::port::outbound::cipher::SecretCipher;
use crate::port::outbound::store::Store;

/// Settings as shown to an organization admin. The API key itself is never
/// returned.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationSettings {
    pub id: OrganizationId,
    pub name: String,
    pub description: Option<String>,
    pub has_api_key: bool,
    pub ai_token_limit: i64,
    pub ai_tokens_used_this_month: i64,
}

impl OrganizationSettings {
    fn of(organization: &Organization, now: DateTime<Utc>) -> Self {
        Self {
            id: organization.id.clone(),
            name: organization.name.clone(),
            description: organization.description.clone(),
            has_api_key: organization.has_api_key(),
            ai_token_limit: organization.ai_token_limit,
            ai_tokens_used_this_month: organization.tokens_used_at(now),
        }
    }
}

pub struct OrganizationService {
    store: Arc<dyn Store>,
    cipher: Arc<dyn SecretCipher>,
}

impl OrganizationService {
    pub fn new(store: Arc<dyn Store>, cipher: Arc<dyn SecretCipher>) -> Self {
        Self { store, cipher }
    }

    pub async fn settings(&self, ctx: &RequestContext) -> Result<OrganizationSettings> {
        let organization = ctx.administered_organization()?;
        let organization = self.load(organization).await?;
        Ok(OrganizationSettings::of(&organization, Utc::now()))
    }

    pub async fn update_profile(
        &self,
        ctx: &RequestContext,
        input: OrganizationSettingsInput,
    ) -> Result<OrganizationSettings> {
        let id = ctx.administered_organization()?;
        input.validate()?;

        let description = input
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty());
        self.store
            .update_organization_profile(id, input.name.trim(), description)
            .await?;

        info!(organization_id = %id, "Updated organization settings");
        self.settings(ctx).await
    }

    /// Encrypt and store the provider API key.
    pub async fn update_api_key(&self, ctx: &RequestContext, api_key: &str) -> Result<()> {
        let id = ctx.administered_organization()?;
        let api_key = api_key.trim();
        validate_api_key(api_key)?;

        let encrypted = self.cipher.encrypt(api_key)?;
        self.store.set_encrypted_api_key(id, &encrypted).await?;

        info!(organization_id = %id, "Updated organization API key");
        Ok(())
    }

    pub async fn update_token_limit(&self, ctx: &RequestContext, limit: i64) -> Result<()> {
        let id = ctx.administered_organization()?;
        validate_token_limit(limit)?;
        self.store.set_token_limit(id, limit).await?;
        info!(organization_id = %id, limit, "Updated AI token limit");
        Ok(())
    }

    /// Fail with [`Error::QuotaExceeded`] once the monthly limit is used up.
    ///
    /// This reads the counter without reserving anything, so concurrent turns
    /// that pass together may overshoot the limit by one turn each.
    pub async fn check_token_quota(&self, id: &OrganizationId) -> Result<Organization> {
        let organization = self.load(id).await?;
        organization
            .check_token_quota(Utc::now())
            .map_err(Error::QuotaExceeded)?;
        Ok(organization)
    }

    pub async fn record_token_usage(&self, id: &OrganizationId, tokens: i64) -> Result<()> {
        if tokens <= 0 {
            return Ok(());
        }
        self.store
            .add_token_usage(id, tokens, &usage_month(Utc::now()))
            .await?;
        debug!(organization_id = %id, tokens, "Recorded AI token usage");
        Ok(())
    }

    /// Decrypt the organization's provider API key.
    pub fn api_key(&self, organization: &Organization) -> Result<String> {
        let encrypted = organization
            .encrypted_api_key
            .as_deref()
            .ok_or(LlmError::MissingApiKey)?;
        Ok(self.cipher.decrypt(encrypted)?)
    }

    /// Create an organization with its first administrator.
    ///
    /// Operator tooling only; there is no caller context.
    pub async fn provision(
        &self,
        settings: OrganizationSettingsInput,
        admin_email: &str,
        admin_name: Option<&str>,
    ) -> Result<(Organization, User)> {
        settings.validate()?;
        let email = self.unused_email(admin_email).await?;

        let now = Utc::now();
        let organization = Organization {
            id: OrganizationId::generate(),
            name: settings.name.trim().to_string(),
            description: settings
                .description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
            encrypted_api_key: None,
            ai_token_limit: DEFAULT_AI_TOKEN_LIMIT,
            ai_tokens_used_this_month: 0,
            ai_usage_month: usage_month(now),
            created_at: now,
        };
        self.store.create_organization(&organization).await?;

        let admin = new_user(&organization.id, email, admin_name, Role::OrgAdmin);
        self.store.create_user(&admin).await?;

        info!(
            organization_id = %organization.id,
            admin_id = %admin.id,
            "Provisioned organization"
        );
        Ok((organization, admin))
    }

    /// Add a user to an existing organization.
    pub async fn provision_user(
        &self,
        organization: &OrganizationId,
        email: &str,
        name: Option<&str>,
        role: Role,
    ) -> Result<User> {
        self.load(organization).await?;
        let email = self.unused_email(email).await?;
        let user = new_user(organization, email, name, role);
        self.store.create_user(&user).await?;
        info!(organization_id = %organization, user_id = %user.id, role = %role, "Provisioned user");
        Ok(user)
    }

    async fn unused_email(&self, email: &str) -> Result<String> {
        let email = email.trim().to_lowercase();
        let mut errors = FieldErrors::new();
        if !email.contains('@') {
            errors.add("email", "A valid email address is required");
        } else if self.store.user_by_email(&email).await?.is_some() {
            errors.add("email", "A user with this email already exists");
        }
        errors.into_result()?;
        Ok(email)
    }

    async fn load(&self, id: &OrganizationId) -> Result<Organization> {
        self.store
            .organization(id)
            .await?
            .ok_or(Error::NotFound("organization"))
    }
}

fn new_user(organization: &OrganizationId, email: String, name: Option<&str>, role: Role) -> User {
    User {
        id: UserId::generate(),
        name: name.map(str::trim).filter(|n| !n.is_empty()).map(str::to_string),
        email,
        role,
        organization_id: Some(organization.clone()),
        created_at: Utc::now(),
    }
}
