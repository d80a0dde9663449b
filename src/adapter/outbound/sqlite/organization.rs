//! Organizations and users.

use async_trait::async_trait;
use diesel::dsl::sql;
use diesel::prelude::*;
use diesel::sql_types::BigInt;

use super::database::model::{OrganizationRow, UserRow};
use super::database::schema::{organizations, users};
use super::SqliteStore;
use crate::domain::id::{OrganizationId, UserId};
use crate::domain::organization::{Organization, User};
use crate::error::{Error, Result};
use crate::port::outbound::store::{OrganizationStore, UserStore};

#[async_trait]
impl OrganizationStore for SqliteStore {
    async fn organization(&self, id: &OrganizationId) -> Result<Option<Organization>> {
        let mut conn = self.conn()?;
        organizations::table
            .find(id.as_str())
            .select(OrganizationRow::as_select())
            .first::<OrganizationRow>(&mut conn)
            .optional()?
            .map(OrganizationRow::into_domain)
            .transpose()
    }

    async fn create_organization(&self, organization: &Organization) -> Result<()> {
        let mut conn = self.conn()?;
        diesel::insert_into(organizations::table)
            .values(OrganizationRow::from_domain(organization))
            .execute(&mut conn)?;
        Ok(())
    }

    async fn update_organization_profile(
        &self,
        id: &OrganizationId,
        name: &str,
        description: Option<&str>,
    ) -> Result<()> {
        let mut conn = self.conn()?;
        let updated = diesel::update(organizations::table.find(id.as_str()))
            .set((
                organizations::name.eq(name),
                organizations::description.eq(description),
            ))
            .execute(&mut conn)?;
        found(updated)
    }

    async fn set_encrypted_api_key(&self, id: &OrganizationId, encrypted: &str) -> Result<()> {
        let mut conn = self.conn()?;
        let updated = diesel::update(organizations::table.find(id.as_str()))
            .set(organizations::encrypted_api_key.eq(encrypted))
            .execute(&mut conn)?;
        found(updated)
    }

    async fn set_token_limit(&self, id: &OrganizationId, limit: i64) -> Result<()> {
        let mut conn = self.conn()?;
        let updated = diesel::update(organizations::table.find(id.as_str()))
            .set(organizations::ai_token_limit.eq(limit))
            .execute(&mut conn)?;
        found(updated)
    }

    async fn add_token_usage(&self, id: &OrganizationId, tokens: i64, month: &str) -> Result<()> {
        let mut conn = self.conn()?;
        let counter = sql::<BigInt>("CASE WHEN ai_usage_month = ")
            .bind::<diesel::sql_types::Text, _>(month.to_string())
            .sql(" THEN ai_tokens_used_this_month + ")
            .bind::<BigInt, _>(tokens)
            .sql(" ELSE ")
            .bind::<BigInt, _>(tokens)
            .sql(" END");
        let updated = diesel::update(organizations::table.find(id.as_str()))
            .set((
                organizations::ai_tokens_used_this_month.eq(counter),
                organizations::ai_usage_month.eq(month),
            ))
            .execute(&mut conn)?;
        found(updated)
    }
}

fn found(updated: usize) -> Result<()> {
    if updated == 0 {
        return Err(Error::NotFound("organization"));
    }
    Ok(())
}

#[async_trait]
impl UserStore for SqliteStore {
    async fn user(&self, id: &UserId) -> Result<Option<User>> {
        let mut conn = self.conn()?;
        users::table
            .find(id.as_str())
            .select(UserRow::as_select())
            .first::<UserRow>(&mut conn)
            .optional()?
            .map(UserRow::into_domain)
            .transpose()
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>> {
        let mut conn = self.conn()?;
        users::table
            .filter(users::email.eq(email))
            .select(UserRow::as_select())
            .first::<UserRow>(&mut conn)
            .optional()?
            .map(UserRow::into_domain)
            .transpose()
    }

    async fn create_user(&self, user: &User) -> Result<()> {
        let mut conn = self.conn()?;
        diesel::insert_into(users::table)
            .values(UserRow::from_domain(user))
            .execute(&mut conn)?;
        Ok(())
    }
}
