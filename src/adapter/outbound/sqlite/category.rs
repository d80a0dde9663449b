//! Categories with case-insensitive find-or-create.

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;

use super::database::model::CategoryRow;
use super::database::schema::categories;
use super::SqliteStore;
use crate::domain::category::Category;
use crate::domain::id::{CategoryId, OrganizationId};
use crate::error::{Error, Result};
use crate::port::outbound::store::CategoryStore;

#[async_trait]
impl CategoryStore for SqliteStore {
    async fn categories(&self, organization: &OrganizationId) -> Result<Vec<Category>> {
        let mut conn = self.conn()?;
        categories::table
            .filter(categories::organization_id.eq(organization.as_str()))
            .order(categories::name.asc())
            .select(CategoryRow::as_select())
            .load::<CategoryRow>(&mut conn)?
            .into_iter()
            .map(CategoryRow::into_domain)
            .collect()
    }

    async fn find_or_create_category(
        &self,
        organization: &OrganizationId,
        name: &str,
    ) -> Result<(Category, bool)> {
        let name = name.trim();
        let mut conn = self.conn()?;
        conn.immediate_transaction::<_, Error, _>(|conn| {
            let wanted = name.to_lowercase();
            let existing = categories::table
                .filter(categories::organization_id.eq(organization.as_str()))
                .select(CategoryRow::as_select())
                .load::<CategoryRow>(conn)?
                .into_iter()
                .find(|row| row.name.to_lowercase() == wanted);
            if let Some(row) = existing {
                return Ok((row.into_domain()?, false));
            }

            let category = Category {
                id: CategoryId::generate(),
                name: name.to_string(),
                description: None,
                color: None,
                organization_id: organization.clone(),
                created_at: Utc::now(),
            };
            diesel::insert_into(categories::table)
                .values(CategoryRow::from_domain(&category))
                .execute(conn)?;
            tracing::info!(
                category_id = %category.id,
                organization_id = %organization,
                name = %category.name,
                "Created category"
            );
            Ok((category, true))
        })
    }
}
