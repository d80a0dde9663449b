//! Organization sub-teams that share one prediction per forecast.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::FieldErrors;
use super::id::{GroupId, OrganizationId, UserId};
use super::organization::User;

/// A named subset of an organization's users.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub description: Option<String>,
    pub organization_id: OrganizationId,
    pub created_at: DateTime<Utc>,
}

/// Membership of one user in one group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupMember {
    pub group_id: GroupId,
    pub user_id: UserId,
    pub joined_at: DateTime<Utc>,
}

/// A group with its counts, as listed for administrators.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupSummary {
    #[serde(flatten)]
    pub group: Group,
    pub member_count: i64,
    pub prediction_count: i64,
}

/// A group with its members ordered by join time.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupDetail {
    #[serde(flatten)]
    pub group: Group,
    pub members: Vec<GroupMemberDetail>,
    pub prediction_count: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupMemberDetail {
    pub user: User,
    pub joined_at: DateTime<Utc>,
}

/// Group creation form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGroupInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl CreateGroupInput {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        check_name(&mut errors, &self.name);
        check_description(&mut errors, self.description.as_deref());
        errors.into_result()
    }

    /// Trimmed name and description, with a blank description dropped.
    #[must_use]
    pub fn normalized(&self) -> (String, Option<String>) {
        (self.name.trim().to_string(), normalize_description(self.description.as_deref()))
    }
}

/// Group update form. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateGroupInput {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl UpdateGroupInput {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if let Some(name) = &self.name {
            check_name(&mut errors, name);
        }
        check_description(&mut errors, self.description.as_deref());
        errors.into_result()
    }
}

/// Blank descriptions are stored as absent.
#[must_use]
pub fn normalize_description(description: Option<&str>) -> Option<String> {
    description
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
}

fn check_name(errors: &mut FieldErrors, name: &str) {
    let length = name.trim().chars().count();
    if length < 2 {
        errors.add("name", "Group name must be at least 2 characters long");
    } else if length > 100 {
        errors.add("name", "Group name cannot exceed 100 characters");
    }
}

fn check_description(errors: &mut FieldErrors, description: Option<&str>) {
    if description.is_some_and(|d| d.chars().count() > 600) {
        errors.add("description", "Description cannot exceed 600 characters");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_requires_two_character_name() {
        let input = CreateGroupInput {
            name: "A".into(),
            description: None,
        };
        assert!(input
            .validate()
            .unwrap_err()
            .mentions("name", "at least 2 characters"));
    }

    #[test]
    fn long_description_rejected() {
        let input = CreateGroupInput {
            name: "Quants".into(),
            description: Some("x".repeat(601)),
        };
        assert!(input.validate().unwrap_err().mentions("description", "600"));
    }

    #[test]
    fn normalized_trims_and_drops_blank_description() {
        let input = CreateGroupInput {
            name: "  Quants ".into(),
            description: Some("   ".into()),
        };
        assert_eq!(input.normalized(), ("Quants".to_string(), None));
    }

    #[test]
    fn update_without_fields_is_valid() {
        assert!(UpdateGroupInput::default().validate().is_ok());
    }
}
