//! Group management use cases.
//!
//! Every operation requires an organization administrator and only touches
//! groups of the caller's own organization. A group from another
//! organization is reported the same way as a missing one.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use crate::domain::context::RequestContext;
use crate::domain::error::FieldErrors;
use crate::domain::group::{
    normalize_description, CreateGroupInput, Group, GroupDetail, GroupMember, GroupSummary,
    UpdateGroupInput,
};
use crate::domain::id::{GroupId, OrganizationId, UserId};
use crate::error::Result;
use crate::port::outbound::store::Store;

pub const NOT_AUTHORIZED_UPDATE: &str = "You are not authorized to update this group.";
pub const NOT_AUTHORIZED_DELETE: &str = "You are not authorized to delete this group.";
pub const NOT_AUTHORIZED_MODIFY: &str = "You are not authorized to modify this group.";
pub const USER_NOT_FOUND: &str = "User not found.";
pub const USER_OUTSIDE_ORGANIZATION: &str =
    "User must belong to the same organization as the group.";

pub struct GroupService {
    store: Arc<dyn Store>,
}

impl GroupService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn list(&self, ctx: &RequestContext) -> Result<Vec<GroupSummary>> {
        let organization = ctx.administered_organization()?;
        self.store.groups(organization).await
    }

    pub async fn detail(&self, ctx: &RequestContext, id: &GroupId) -> Result<GroupDetail> {
        let organization = ctx.administered_organization()?;
        self.owned_group(organization, id, NOT_AUTHORIZED_MODIFY)
            .await?;
        self.store
            .group_detail(id)
            .await?
            .ok_or(crate::error::Error::NotFound("group"))
    }

    /// The caller's own group, if they belong to one.
    pub async fn my_group(&self, ctx: &RequestContext) -> Result<Option<GroupDetail>> {
        let Some(member) = self.store.membership(&ctx.user_id).await? else {
            return Ok(None);
        };
        self.store.group_detail(&member.group_id).await
    }

    pub async fn create(&self, ctx: &RequestContext, input: CreateGroupInput) -> Result<Group> {
        let organization = ctx.administered_organization()?;
        input.validate()?;

        let (name, description) = input.normalized();
        let group = Group {
            id: GroupId::generate(),
            name,
            description,
            organization_id: organization.clone(),
            created_at: Utc::now(),
        };
        self.store.create_group(&group).await?;

        info!(
            group_id = %group.id,
            organization_id = %organization,
            created_by = %ctx.user_id,
            "Created group"
        );
        Ok(group)
    }

    pub async fn update(
        &self,
        ctx: &RequestContext,
        id: &GroupId,
        input: UpdateGroupInput,
    ) -> Result<Group> {
        let organization = ctx.administered_organization()?;
        let mut group = self
            .owned_group(organization, id, NOT_AUTHORIZED_UPDATE)
            .await?;
        input.validate()?;

        if let Some(name) = input.name.as_deref().map(str::trim) {
            group.name = name.to_string();
        }
        if input.description.is_some() {
            group.description = normalize_description(input.description.as_deref());
        }
        self.store.update_group(&group).await?;

        info!(group_id = %group.id, "Updated group");
        Ok(group)
    }

    /// Delete a group together with its memberships and group predictions.
    pub async fn delete(&self, ctx: &RequestContext, id: &GroupId) -> Result<()> {
        let organization = ctx.administered_organization()?;
        self.owned_group(organization, id, NOT_AUTHORIZED_DELETE)
            .await?;
        self.store.delete_group(id).await?;
        info!(group_id = %id, "Deleted group");
        Ok(())
    }

    pub async fn add_member(
        &self,
        ctx: &RequestContext,
        id: &GroupId,
        user_id: &str,
    ) -> Result<GroupMember> {
        let organization = ctx.administered_organization()?;
        let group = self
            .owned_group(organization, id, NOT_AUTHORIZED_MODIFY)
            .await?;

        let user_id = user_id.trim();
        if user_id.is_empty() {
            let mut errors = FieldErrors::new();
            errors.add("userId", "User is required");
            return Err(errors.into());
        }
        let user_id = UserId::from(user_id);
        let Some(user) = self.store.user(&user_id).await? else {
            return Err(FieldErrors::form(USER_NOT_FOUND).into());
        };
        if user.organization_id.as_ref() != Some(&group.organization_id) {
            return Err(FieldErrors::form(USER_OUTSIDE_ORGANIZATION).into());
        }

        let member = GroupMember {
            group_id: group.id.clone(),
            user_id,
            joined_at: Utc::now(),
        };
        self.store.add_member(&member).await?;

        info!(group_id = %member.group_id, user_id = %member.user_id, "Added group member");
        Ok(member)
    }

    pub async fn remove_member(
        &self,
        ctx: &RequestContext,
        id: &GroupId,
        user_id: &UserId,
    ) -> Result<()> {
        let organization = ctx.administered_organization()?;
        self.owned_group(organization, id, NOT_AUTHORIZED_MODIFY)
            .await?;
        if self.store.remove_member(id, user_id).await? {
            info!(group_id = %id, user_id = %user_id, "Removed group member");
        }
        Ok(())
    }

    async fn owned_group(
        &self,
        organization: &OrganizationId,
        id: &GroupId,
        denial: &str,
    ) -> Result<Group> {
        match self.store.group(id).await? {
            Some(group) if &group.organization_id == organization => Ok(group),
            _ => Err(FieldErrors::form(denial).into()),
        }
    }
}
