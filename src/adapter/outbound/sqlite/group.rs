//! Groups and memberships.

use std::collections::HashMap;

use async_trait::async_trait;
use diesel::dsl::count_star;
use diesel::prelude::*;

use super::database::model::{GroupMemberRow, GroupRow, UserRow};
use super::database::schema::{group_members, org_groups, predictions, users};
use super::{is_unique_violation, SqliteStore};
use crate::domain::error::FieldErrors;
use crate::domain::group::{Group, GroupDetail, GroupMember, GroupMemberDetail, GroupSummary};
use crate::domain::id::{GroupId, OrganizationId, UserId};
use crate::error::{Error, Result};
use crate::port::outbound::store::GroupStore;

/// Shown when a user is added to a second group.
pub const ALREADY_IN_GROUP: &str = "User already belongs to a group.";

fn prediction_count(conn: &mut SqliteConnection, group: &str) -> Result<i64> {
    Ok(predictions::table
        .filter(predictions::group_id.eq(group))
        .select(count_star())
        .first::<i64>(conn)?)
}

#[async_trait]
impl GroupStore for SqliteStore {
    async fn group(&self, id: &GroupId) -> Result<Option<Group>> {
        let mut conn = self.conn()?;
        org_groups::table
            .find(id.as_str())
            .select(GroupRow::as_select())
            .first::<GroupRow>(&mut conn)
            .optional()?
            .map(GroupRow::into_domain)
            .transpose()
    }

    async fn group_detail(&self, id: &GroupId) -> Result<Option<GroupDetail>> {
        let mut conn = self.conn()?;
        let Some(row) = org_groups::table
            .find(id.as_str())
            .select(GroupRow::as_select())
            .first::<GroupRow>(&mut conn)
            .optional()?
        else {
            return Ok(None);
        };

        let members = group_members::table
            .inner_join(users::table)
            .filter(group_members::group_id.eq(id.as_str()))
            .order(group_members::joined_at.asc())
            .select((GroupMemberRow::as_select(), UserRow::as_select()))
            .load::<(GroupMemberRow, UserRow)>(&mut conn)?
            .into_iter()
            .map(|(member, user)| {
                Ok(GroupMemberDetail {
                    user: user.into_domain()?,
                    joined_at: member.into_domain()?.joined_at,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Some(GroupDetail {
            group: row.into_domain()?,
            members,
            prediction_count: prediction_count(&mut conn, id.as_str())?,
        }))
    }

    async fn groups(&self, organization: &OrganizationId) -> Result<Vec<GroupSummary>> {
        let mut conn = self.conn()?;
        let rows = org_groups::table
            .filter(org_groups::organization_id.eq(organization.as_str()))
            .order(org_groups::name.asc())
            .select(GroupRow::as_select())
            .load::<GroupRow>(&mut conn)?;

        let ids: Vec<&str> = rows.iter().map(|r| r.id.as_str()).collect();
        let member_counts: HashMap<String, i64> = group_members::table
            .filter(group_members::group_id.eq_any(ids.clone()))
            .group_by(group_members::group_id)
            .select((group_members::group_id, count_star()))
            .load::<(String, i64)>(&mut conn)?
            .into_iter()
            .collect();
        let prediction_counts: HashMap<Option<String>, i64> = predictions::table
            .filter(predictions::group_id.eq_any(ids))
            .group_by(predictions::group_id)
            .select((predictions::group_id, count_star()))
            .load::<(Option<String>, i64)>(&mut conn)?
            .into_iter()
            .collect();

        rows.into_iter()
            .map(|row| {
                let member_count = member_counts.get(&row.id).copied().unwrap_or(0);
                let prediction_count = prediction_counts
                    .get(&Some(row.id.clone()))
                    .copied()
                    .unwrap_or(0);
                Ok(GroupSummary {
                    group: row.into_domain()?,
                    member_count,
                    prediction_count,
                })
            })
            .collect()
    }

    async fn create_group(&self, group: &Group) -> Result<()> {
        let mut conn = self.conn()?;
        diesel::insert_into(org_groups::table)
            .values(GroupRow::from_domain(group))
            .execute(&mut conn)?;
        Ok(())
    }

    async fn update_group(&self, group: &Group) -> Result<()> {
        let mut conn = self.conn()?;
        let updated = diesel::update(org_groups::table.find(group.id.as_str()))
            .set(GroupRow::from_domain(group))
            .execute(&mut conn)?;
        if updated == 0 {
            return Err(Error::NotFound("group"));
        }
        Ok(())
    }

    async fn delete_group(&self, id: &GroupId) -> Result<bool> {
        let mut conn = self.conn()?;
        // Memberships and group predictions go with the group.
        let deleted = diesel::delete(org_groups::table.find(id.as_str())).execute(&mut conn)?;
        Ok(deleted > 0)
    }

    async fn membership(&self, user: &UserId) -> Result<Option<GroupMember>> {
        let mut conn = self.conn()?;
        group_members::table
            .filter(group_members::user_id.eq(user.as_str()))
            .select(GroupMemberRow::as_select())
            .first::<GroupMemberRow>(&mut conn)
            .optional()?
            .map(GroupMemberRow::into_domain)
            .transpose()
    }

    async fn add_member(&self, member: &GroupMember) -> Result<()> {
        let mut conn = self.conn()?;
        match diesel::insert_into(group_members::table)
            .values(GroupMemberRow::from_domain(member))
            .execute(&mut conn)
        {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => {
                let mut errors = FieldErrors::new();
                errors.add("userId", ALREADY_IN_GROUP);
                Err(Error::Validation(errors))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn remove_member(&self, group: &GroupId, user: &UserId) -> Result<bool> {
        let mut conn = self.conn()?;
        let deleted = diesel::delete(
            group_members::table
                .filter(group_members::group_id.eq(group.as_str()))
                .filter(group_members::user_id.eq(user.as_str())),
        )
        .execute(&mut conn)?;
        Ok(deleted > 0)
    }
}
