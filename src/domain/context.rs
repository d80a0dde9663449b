//! Explicit per-request caller context.
//!
//! Every service call receives a [`RequestContext`] describing who is acting
//! and on behalf of which organization. Nothing reads the caller from ambient
//! state.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::DomainError;
use super::id::{OrganizationId, UserId};
use crate::error::{Error, Result};

/// Platform role of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Platform administrator.
    Admin,
    /// Administrator of a single organization.
    OrgAdmin,
    /// Regular organization member.
    User,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::OrgAdmin => "ORG_ADMIN",
            Self::User => "USER",
        }
    }

    /// True for roles allowed to manage an organization.
    #[must_use]
    pub const fn manages_organization(self) -> bool {
        matches!(self, Self::Admin | Self::OrgAdmin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "ADMIN" => Ok(Self::Admin),
            "ORG_ADMIN" => Ok(Self::OrgAdmin),
            "USER" => Ok(Self::User),
            other => Err(DomainError::UnknownRole(other.to_string())),
        }
    }
}

/// The authenticated caller of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub user_id: UserId,
    pub organization_id: Option<OrganizationId>,
    pub role: Role,
}

impl RequestContext {
    pub fn new(user_id: UserId, organization_id: Option<OrganizationId>, role: Role) -> Self {
        Self {
            user_id,
            organization_id,
            role,
        }
    }

    /// Organization the caller acts in.
    ///
    /// # Errors
    /// Returns [`Error::Forbidden`] when the caller has no organization.
    pub fn organization(&self) -> Result<&OrganizationId> {
        self.organization_id
            .as_ref()
            .ok_or_else(|| Error::Forbidden("No organization associated with user".into()))
    }

    /// Organization the caller administers.
    ///
    /// # Errors
    /// Returns [`Error::Forbidden`] when the caller has no organization or is
    /// not an organization administrator.
    pub fn administered_organization(&self) -> Result<&OrganizationId> {
        let organization = self.organization()?;
        if !self.role.manages_organization() {
            return Err(Error::Forbidden(
                "Organization admin access is required".into(),
            ));
        }
        Ok(organization)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(role: Role, org: Option<&str>) -> RequestContext {
        RequestContext::new(UserId::from("u1"), org.map(OrganizationId::from), role)
    }

    #[test]
    fn role_round_trips_through_str() {
        for role in [Role::Admin, Role::OrgAdmin, Role::User] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("OWNER".parse::<Role>().is_err());
    }

    #[test]
    fn organization_required() {
        assert!(matches!(
            context(Role::User, None).organization(),
            Err(Error::Forbidden(_))
        ));
        assert!(context(Role::User, Some("o1")).organization().is_ok());
    }

    #[test]
    fn plain_users_cannot_administer() {
        assert!(context(Role::User, Some("o1"))
            .administered_organization()
            .is_err());
        assert!(context(Role::OrgAdmin, Some("o1"))
            .administered_organization()
            .is_ok());
    }
}
