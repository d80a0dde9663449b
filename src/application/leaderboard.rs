//! Leaderboard queries.

use std::sync::Arc;

use serde::Serialize;

use crate::domain::context::RequestContext;
use crate::domain::id::OrganizationId;
use crate::domain::leaderboard::{
    category_leaderboard, group_leaderboard, user_leaderboard, CategoryEntry, GroupEntry,
    LeaderboardFilter, LeaderboardKind, UserEntry,
};
use crate::error::Result;
use crate::port::outbound::store::Store;

/// A ranked projection of one kind.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Leaderboard {
    Users(Vec<UserEntry>),
    Groups(Vec<GroupEntry>),
    Categories(Vec<CategoryEntry>),
}

impl Leaderboard {
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Users(entries) => entries.len(),
            Self::Groups(entries) => entries.len(),
            Self::Categories(entries) => entries.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct LeaderboardService {
    store: Arc<dyn Store>,
}

impl LeaderboardService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Build a leaderboard for the caller's organization.
    pub async fn query(
        &self,
        ctx: &RequestContext,
        kind: LeaderboardKind,
        filter: &LeaderboardFilter,
    ) -> Result<Leaderboard> {
        let organization = ctx.organization()?;
        self.for_organization(organization, kind, filter).await
    }

    /// Build a leaderboard without a caller, for operator tooling.
    pub async fn for_organization(
        &self,
        organization: &OrganizationId,
        kind: LeaderboardKind,
        filter: &LeaderboardFilter,
    ) -> Result<Leaderboard> {
        let source = self.store.leaderboard_source(organization).await?;
        let board = match kind {
            LeaderboardKind::Users => Leaderboard::Users(user_leaderboard(&source, filter)),
            LeaderboardKind::Groups => Leaderboard::Groups(group_leaderboard(&source, filter)),
            LeaderboardKind::Categories => {
                Leaderboard::Categories(category_leaderboard(&source, filter))
            }
        };
        tracing::debug!(
            organization_id = %organization,
            kind = %kind,
            entries = board.len(),
            "Built leaderboard"
        );
        Ok(board)
    }
}
