//! Forecast categories.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::error::FieldErrors;
use super::id::{CategoryId, OrganizationId};

/// A named bucket of forecasts inside an organization.
///
/// Names are unique per organization ignoring case.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub description: Option<String>,
    pub color: Option<String>,
    pub organization_id: OrganizationId,
    pub created_at: DateTime<Utc>,
}

/// Validate a category name as supplied by a form or the model.
pub fn validate_category_name(name: &str) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();
    let trimmed = name.trim();
    if trimmed.is_empty() {
        errors.add("name", "Category name is required");
    } else if trimmed.chars().count() > 100 {
        errors.add("name", "Category name cannot exceed 100 characters");
    }
    errors.into_result()
}
