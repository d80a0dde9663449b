//! Handlers for the `provision` command group.

use serde_json::json;

use super::command::{ProvisionOrganizationArgs, ProvisionUserArgs};
use super::output;
use crate::domain::context::{RequestContext, Role};
use crate::domain::id::OrganizationId;
use crate::domain::organization::OrganizationSettingsInput;
use crate::error::Result;
use crate::infrastructure::bootstrap::build_services;
use crate::infrastructure::config::Config;

/// Execute `augur provision organization`.
pub async fn organization(config: &Config, args: &ProvisionOrganizationArgs) -> Result<()> {
    let services = build_services(config)?;
    let settings = OrganizationSettingsInput {
        name: args.name.clone(),
        description: args.description.clone(),
    };
    let (organization, admin) = services
        .organizations
        .provision(settings, &args.admin_email, args.admin_name.as_deref())
        .await?;

    if let Some(api_key) = &args.api_key {
        let ctx = RequestContext::new(
            admin.id.clone(),
            Some(organization.id.clone()),
            admin.role,
        );
        services.organizations.update_api_key(&ctx, api_key).await?;
    }

    if output::is_json() {
        output::json_output(&json!({
            "organization": organization.id,
            "admin": admin.id,
            "apiKeyStored": args.api_key.is_some(),
        }));
        return Ok(());
    }
    output::success(&format!("Created organization {}", organization.name));
    output::field("Organization", &organization.id);
    output::field("Admin", format!("{} ({})", admin.email, admin.id));
    if args.api_key.is_none() {
        output::warning("No API key stored; AI forecast creation stays disabled");
    }
    Ok(())
}

/// Execute `augur provision user`.
pub async fn user(config: &Config, args: &ProvisionUserArgs) -> Result<()> {
    let role: Role = args.role.trim().to_uppercase().parse()?;
    let services = build_services(config)?;
    let organization = OrganizationId::from(args.organization.as_str());
    let user = services
        .organizations
        .provision_user(&organization, &args.email, args.name.as_deref(), role)
        .await?;

    if output::is_json() {
        output::json_output(&json!({ "user": user.id, "role": role.as_str() }));
        return Ok(());
    }
    output::success(&format!("Created user {}", user.email));
    output::field("User", &user.id);
    output::field("Role", role);
    Ok(())
}
