//! Form-style action endpoints.
//!
//! Every handler answers with an [`ActionState`]. Validation failures are a
//! successful response with `success: false`; authorization and upstream
//! failures go through [`ApiError`](super::error::ApiError).

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;

use super::error::ApiResult;
use super::session::Session;
use crate::application::{ActionState, ForecastInput, OrganizationSettings, Services};
use crate::domain::forecast::Forecast;
use crate::domain::group::{CreateGroupInput, Group, GroupMember, UpdateGroupInput};
use crate::domain::id::{ForecastId, GroupId, PredictionId, UserId};
use crate::domain::organization::OrganizationSettingsInput;
use crate::domain::prediction::{Prediction, PredictionInput, PredictionUpdate};
use crate::error::Result;

type Action<T> = ApiResult<Json<ActionState<T>>>;

fn action<T>(result: Result<T>) -> Action<T> {
    Ok(Json(ActionState::from_result(result)?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMemberBody {
    #[serde(default)]
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActualValueBody {
    #[serde(default)]
    pub actual_value: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyBody {
    #[serde(default)]
    pub api_key: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenLimitBody {
    pub ai_token_limit: i64,
}

/// POST /actions/groups
pub async fn create_group(
    State(services): State<Services>,
    Session(ctx): Session,
    payload: std::result::Result<Json<CreateGroupInput>, JsonRejection>,
) -> Action<Group> {
    let Json(input) = payload?;
    action(services.groups.create(&ctx, input).await)
}

/// PUT /actions/groups/{id}
pub async fn update_group(
    State(services): State<Services>,
    Session(ctx): Session,
    Path(id): Path<String>,
    payload: std::result::Result<Json<UpdateGroupInput>, JsonRejection>,
) -> Action<Group> {
    let Json(input) = payload?;
    action(services.groups.update(&ctx, &GroupId::from(id), input).await)
}

/// DELETE /actions/groups/{id}
pub async fn delete_group(
    State(services): State<Services>,
    Session(ctx): Session,
    Path(id): Path<String>,
) -> Action<()> {
    action(services.groups.delete(&ctx, &GroupId::from(id)).await)
}

/// POST /actions/groups/{id}/members
pub async fn add_member(
    State(services): State<Services>,
    Session(ctx): Session,
    Path(id): Path<String>,
    payload: std::result::Result<Json<AddMemberBody>, JsonRejection>,
) -> Action<GroupMember> {
    let Json(body) = payload?;
    action(
        services
            .groups
            .add_member(&ctx, &GroupId::from(id), &body.user_id)
            .await,
    )
}

/// DELETE /actions/groups/{id}/members/{user_id}
pub async fn remove_member(
    State(services): State<Services>,
    Session(ctx): Session,
    Path((id, user_id)): Path<(String, String)>,
) -> Action<()> {
    action(
        services
            .groups
            .remove_member(&ctx, &GroupId::from(id), &UserId::from(user_id))
            .await,
    )
}

/// POST /actions/predictions
pub async fn submit_prediction(
    State(services): State<Services>,
    Session(ctx): Session,
    payload: std::result::Result<Json<PredictionInput>, JsonRejection>,
) -> Action<Prediction> {
    let Json(input) = payload?;
    action(services.predictions.submit(&ctx, input).await)
}

/// PUT /actions/predictions/{id}
pub async fn update_prediction(
    State(services): State<Services>,
    Session(ctx): Session,
    Path(id): Path<String>,
    payload: std::result::Result<Json<PredictionUpdate>, JsonRejection>,
) -> Action<Prediction> {
    let Json(update) = payload?;
    action(
        services
            .predictions
            .update(&ctx, &PredictionId::from(id), update)
            .await,
    )
}

/// POST /actions/forecasts
pub async fn create_forecast(
    State(services): State<Services>,
    Session(ctx): Session,
    payload: std::result::Result<Json<ForecastInput>, JsonRejection>,
) -> Action<Forecast> {
    let Json(input) = payload?;
    action(services.forecasts.create(&ctx, input).await)
}

/// POST /actions/forecasts/{id}/actual
pub async fn record_actual(
    State(services): State<Services>,
    Session(ctx): Session,
    Path(id): Path<String>,
    payload: std::result::Result<Json<ActualValueBody>, JsonRejection>,
) -> Action<Forecast> {
    let Json(body) = payload?;
    action(
        services
            .forecasts
            .record_actual(&ctx, &ForecastId::from(id), &body.actual_value)
            .await,
    )
}

/// PUT /actions/settings/organization
pub async fn update_organization(
    State(services): State<Services>,
    Session(ctx): Session,
    payload: std::result::Result<Json<OrganizationSettingsInput>, JsonRejection>,
) -> Action<OrganizationSettings> {
    let Json(input) = payload?;
    action(services.organizations.update_profile(&ctx, input).await)
}

/// PUT /actions/settings/api-key
pub async fn update_api_key(
    State(services): State<Services>,
    Session(ctx): Session,
    payload: std::result::Result<Json<ApiKeyBody>, JsonRejection>,
) -> Action<()> {
    let Json(body) = payload?;
    action(
        services
            .organizations
            .update_api_key(&ctx, &body.api_key)
            .await,
    )
}

/// PUT /actions/settings/token-limit
pub async fn update_token_limit(
    State(services): State<Services>,
    Session(ctx): Session,
    payload: std::result::Result<Json<TokenLimitBody>, JsonRejection>,
) -> Action<()> {
    let Json(body) = payload?;
    action(
        services
            .organizations
            .update_token_limit(&ctx, body.ai_token_limit)
            .await,
    )
}
