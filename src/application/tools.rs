//! Tools the chat model may call while drafting a forecast.
//!
//! Each tool returns a JSON object whose `message` is shown to the model
//! verbatim. Rule failures are reported inside that object so the model can
//! correct the draft; only store failures surface as errors.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::chat::CONVERSATION_COMPLETED;
use super::conversation::ConversationService;
use super::forecast::{parse_dates, parse_kind, ForecastService};
use crate::domain::category::{validate_category_name, Category};
use crate::domain::conversation::ConversationStatus;
use crate::domain::error::FieldErrors;
use crate::domain::forecast::{Forecast, ForecastType, NewForecast};
use crate::domain::id::{CategoryId, ConversationId, ForecastId, OrganizationId};
use crate::error::{Error, Result};
use crate::port::outbound::llm::{ToolCall, ToolSpec};
use crate::port::outbound::store::Store;

pub const FIND_OR_CREATE_CATEGORY: &str = "findOrCreateCategory";
pub const VALIDATE_FORECAST_DRAFT: &str = "validateForecastDraft";
pub const CREATE_FORECAST: &str = "createForecast";

pub const CATEGORICAL_UNSUPPORTED: &str = "CATEGORICAL forecasts are not supported by the AI agent. Please create a BINARY or CONTINUOUS forecast.";
pub const VALIDATION_FAILED: &str = "Validation failed. Please correct the errors and try again.";

/// A forecast as drafted by the model.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastDraft {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub forecast_type: String,
    #[serde(default)]
    pub data_type: Option<String>,
    pub due_date: String,
    pub data_release_date: String,
    pub category_name: String,
    #[serde(default)]
    pub options: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct CategoryArgs {
    name: String,
}

/// Result of checking a draft.
#[derive(Debug, Clone)]
pub enum DraftCheck {
    Valid(NewForecast),
    Invalid(FieldErrors),
}

/// Result of executing one tool call.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    /// JSON handed back to the model.
    pub content: Value,
    /// Forecast created by this call, if any.
    pub created: Option<ForecastId>,
}

impl ToolOutput {
    fn reply(content: Value) -> Self {
        Self {
            content,
            created: None,
        }
    }
}

/// Schemas for every tool, in the shape the model API expects.
#[must_use]
pub fn tool_specs() -> Vec<ToolSpec> {
    let draft = json!({
        "type": "object",
        "properties": {
            "title": {"type": "string", "minLength": 1, "maxLength": 200, "description": "Forecast title"},
            "description": {"type": ["string", "null"], "maxLength": 1000, "description": "Optional description"},
            "type": {"type": "string", "enum": ["BINARY", "CONTINUOUS", "CATEGORICAL"], "description": "BINARY or CONTINUOUS only"},
            "dataType": {
                "type": ["string", "null"],
                "enum": ["CURRENCY", "PERCENT", "INTEGER", "NUMBER", "DECIMAL", null],
                "description": "For CONTINUOUS: CURRENCY, PERCENT, INTEGER, NUMBER, or DECIMAL"
            },
            "dueDate": {"type": "string", "description": "ISO date string when predictions are due (must be future)"},
            "dataReleaseDate": {"type": "string", "description": "ISO date string when actual data will be known (must be >= dueDate)"},
            "categoryName": {"type": "string", "minLength": 1, "description": "Category name (will be looked up or created)"},
            "options": {"type": ["array", "null"], "items": {"type": "string"}, "description": "For CATEGORICAL only (not supported)"}
        },
        "required": ["title", "type", "dueDate", "dataReleaseDate", "categoryName"]
    });

    vec![
        ToolSpec {
            name: FIND_OR_CREATE_CATEGORY,
            description: "Find an existing category by name (case-insensitive) or create a new one if it doesn't exist. Call this when you've inferred a category from the forecast topic.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "name": {
                        "type": "string",
                        "minLength": 1,
                        "maxLength": 100,
                        "description": "Category name (e.g., 'Equities', 'Movies', 'Crypto')"
                    }
                },
                "required": ["name"]
            }),
        },
        ToolSpec {
            name: VALIDATE_FORECAST_DRAFT,
            description: "Validate a forecast draft against business rules before asking for user confirmation. Call this before presenting the forecast summary to the user.",
            parameters: draft.clone(),
        },
        ToolSpec {
            name: CREATE_FORECAST,
            description: "Create the forecast in the database. ONLY call this after the user has explicitly confirmed they want to create the forecast (e.g., they said 'yes', 'create it', 'go ahead', etc.).",
            parameters: draft,
        },
    ]
}

pub struct ForecastTools {
    store: Arc<dyn Store>,
    forecasts: Arc<ForecastService>,
    conversations: Arc<ConversationService>,
}

impl ForecastTools {
    pub fn new(
        store: Arc<dyn Store>,
        forecasts: Arc<ForecastService>,
        conversations: Arc<ConversationService>,
    ) -> Self {
        Self {
            store,
            forecasts,
            conversations,
        }
    }

    /// Case-insensitive lookup, creating the category when missing.
    pub async fn find_or_create_category(
        &self,
        organization: &OrganizationId,
        name: &str,
    ) -> Result<(Category, bool)> {
        validate_category_name(name)?;
        self.store
            .find_or_create_category(organization, name.trim())
            .await
    }

    /// Check a draft the way `createForecast` will.
    ///
    /// Resolving the category may create it even when other checks fail.
    pub async fn validate_draft(
        &self,
        organization: &OrganizationId,
        draft: &ForecastDraft,
        now: DateTime<Utc>,
    ) -> Result<DraftCheck> {
        let mut errors = FieldErrors::new();

        let Some((forecast_type, data_type)) =
            parse_kind(&draft.forecast_type, draft.data_type.as_deref(), &mut errors)
        else {
            return Ok(DraftCheck::Invalid(errors));
        };
        match (forecast_type, data_type) {
            (ForecastType::Categorical, _) => {
                errors.add("type", CATEGORICAL_UNSUPPORTED);
                return Ok(DraftCheck::Invalid(errors));
            }
            (ForecastType::Continuous, None) => {
                errors.add(
                    "dataType",
                    "CONTINUOUS forecasts require a dataType (CURRENCY, PERCENT, INTEGER, NUMBER, or DECIMAL)",
                );
                return Ok(DraftCheck::Invalid(errors));
            }
            (ForecastType::Binary, Some(_)) => {
                errors.add("dataType", "BINARY forecasts should not have a dataType");
                return Ok(DraftCheck::Invalid(errors));
            }
            _ => {}
        }

        let category_id: CategoryId = match self
            .find_or_create_category(organization, &draft.category_name)
            .await
        {
            Ok((category, _)) => category.id,
            Err(err) => {
                debug!(error = %err, "Category lookup failed during draft validation");
                errors.add("category", "Failed to find or create category");
                return Ok(DraftCheck::Invalid(errors));
            }
        };

        let Some((due_date, data_release_date)) =
            parse_dates(&draft.due_date, &draft.data_release_date, now, &mut errors)
        else {
            return Ok(DraftCheck::Invalid(errors));
        };

        let new = NewForecast {
            title: draft.title.trim().to_string(),
            description: draft
                .description
                .as_deref()
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string),
            forecast_type,
            data_type,
            due_date,
            data_release_date,
            organization_id: organization.clone(),
            category_id: Some(category_id),
            options: draft.options.clone().filter(|o| !o.is_empty()),
        };
        errors.extend(self.forecasts.rule_errors(&new).await?);

        if errors.is_empty() {
            Ok(DraftCheck::Valid(new))
        } else {
            Ok(DraftCheck::Invalid(errors))
        }
    }

    /// Re-validate, persist, and complete the conversation that asked.
    /// A conversation that already produced a forecast cannot create another.
    pub async fn create_forecast(
        &self,
        organization: &OrganizationId,
        conversation: &ConversationId,
        draft: &ForecastDraft,
    ) -> Result<std::result::Result<Forecast, FieldErrors>> {
        let completed = self
            .store
            .conversation(conversation)
            .await?
            .is_some_and(|c| c.status == ConversationStatus::Completed);
        if completed {
            return Ok(Err(FieldErrors::form(CONVERSATION_COMPLETED)));
        }
        let now = Utc::now();
        let new = match self.validate_draft(organization, draft, now).await? {
            DraftCheck::Valid(new) => new,
            DraftCheck::Invalid(errors) => return Ok(Err(errors)),
        };
        let forecast = self.forecasts.insert(new, now).await?;
        self.conversations
            .complete(conversation, &forecast.id)
            .await?;
        Ok(Ok(forecast))
    }

    /// Execute a model tool call and build the reply handed back to it.
    pub async fn execute(
        &self,
        organization: &OrganizationId,
        conversation: &ConversationId,
        call: &ToolCall,
    ) -> Result<ToolOutput> {
        debug!(tool = %call.name, call_id = %call.id, "Executing tool call");
        match call.name.as_str() {
            FIND_OR_CREATE_CATEGORY => {
                let args: CategoryArgs = match parse_arguments(call) {
                    Ok(args) => args,
                    Err(reply) => return Ok(reply),
                };
                match self.find_or_create_category(organization, &args.name).await {
                    Ok((category, created)) => {
                        let message = if created {
                            format!("✓ Created new category: \"{}\"", category.name)
                        } else {
                            format!("✓ Using existing category: \"{}\"", category.name)
                        };
                        Ok(ToolOutput::reply(json!({
                            "id": category.id,
                            "name": category.name,
                            "wasCreated": created,
                            "message": message,
                        })))
                    }
                    Err(Error::Validation(errors)) => {
                        Ok(ToolOutput::reply(json!({
                            "message": "⚠️ Validation errors found",
                            "errors": errors,
                        })))
                    }
                    Err(err) => Err(err),
                }
            }
            VALIDATE_FORECAST_DRAFT => {
                let draft: ForecastDraft = match parse_arguments(call) {
                    Ok(draft) => draft,
                    Err(reply) => return Ok(reply),
                };
                let reply = match self.validate_draft(organization, &draft, Utc::now()).await? {
                    DraftCheck::Valid(new) => json!({
                        "valid": true,
                        "message": "✓ Forecast validated successfully",
                        "categoryId": new.category_id,
                    }),
                    DraftCheck::Invalid(errors) => json!({
                        "valid": false,
                        "message": "⚠️ Validation errors found",
                        "errors": errors,
                    }),
                };
                Ok(ToolOutput::reply(reply))
            }
            CREATE_FORECAST => {
                let draft: ForecastDraft = match parse_arguments(call) {
                    Ok(draft) => draft,
                    Err(reply) => return Ok(reply),
                };
                match self.create_forecast(organization, conversation, &draft).await {
                    Ok(Ok(forecast)) => Ok(ToolOutput {
                        content: json!({
                            "success": true,
                            "message": format!("✓ Forecast \"{}\" created successfully!", forecast.title),
                            "forecastId": forecast.id,
                        }),
                        created: Some(forecast.id),
                    }),
                    Ok(Err(errors)) => Ok(ToolOutput::reply(json!({
                        "success": false,
                        "message": format!("⚠️ Failed to create forecast: {VALIDATION_FAILED}"),
                        "errors": errors,
                    }))),
                    Err(err) => {
                        warn!(error = %err, conversation_id = %conversation, "Forecast creation failed");
                        Ok(ToolOutput::reply(json!({
                            "success": false,
                            "message": format!("⚠️ Failed to create forecast: {err}"),
                        })))
                    }
                }
            }
            other => {
                warn!(tool = %other, "Model called an unknown tool");
                Ok(ToolOutput::reply(json!({
                    "message": format!("⚠️ Unknown tool: {other}"),
                })))
            }
        }
    }
}

/// Parse tool arguments, or build the reply explaining why they are invalid.
fn parse_arguments<T: for<'de> Deserialize<'de>>(call: &ToolCall) -> std::result::Result<T, ToolOutput> {
    let raw = if call.arguments.trim().is_empty() {
        "{}"
    } else {
        call.arguments.as_str()
    };
    serde_json::from_str(raw).map_err(|e| {
        ToolOutput::reply(json!({
            "message": format!("⚠️ Invalid arguments for {}: {e}", call.name),
        }))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn specs_cover_all_three_tools() {
        let names: Vec<_> = tool_specs().iter().map(|s| s.name).collect();
        assert_eq!(
            names,
            [FIND_OR_CREATE_CATEGORY, VALIDATE_FORECAST_DRAFT, CREATE_FORECAST]
        );
    }

    #[test]
    fn draft_schema_requires_category_name() {
        let specs = tool_specs();
        let required = specs[1].parameters["required"].as_array().unwrap();
        assert!(required.iter().any(|r| r == "categoryName"));
    }

    #[test]
    fn draft_deserializes_from_model_arguments() {
        let draft: ForecastDraft = serde_json::from_str(
            r#"{"title":"Will AAPL close above $200?","type":"BINARY","dataType":null,
                "dueDate":"2030-03-31","dataReleaseDate":"2030-04-01","categoryName":"Equities"}"#,
        )
        .unwrap();
        assert_eq!(draft.forecast_type, "BINARY");
        assert!(draft.data_type.is_none());
        assert_eq!(draft.category_name, "Equities");
    }

    #[test]
    fn bad_arguments_produce_a_reply() {
        let call = ToolCall {
            id: "c1".into(),
            name: FIND_OR_CREATE_CATEGORY.into(),
            arguments: "{\"nope\":1}".into(),
        };
        let reply = parse_arguments::<CategoryArgs>(&call).unwrap_err();
        assert!(reply.content["message"]
            .as_str()
            .unwrap()
            .starts_with("⚠️ Invalid arguments"));
    }
}
