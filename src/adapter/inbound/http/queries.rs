//! Read endpoints.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::Json;
use serde_json::{json, Value};

use super::error::ApiResult;
use super::session::Session;
use crate::application::conversation::{ConversationSummary, ConversationView};
use crate::application::{Leaderboard, OrganizationSettings, Services};
use crate::domain::forecast::Forecast;
use crate::domain::group::{GroupDetail, GroupSummary};
use crate::domain::id::{ConversationId, ForecastId, GroupId};
use crate::domain::leaderboard::{LeaderboardFilter, LeaderboardKind, LeaderboardParams};
use crate::domain::prediction::Prediction;
use crate::error::Error;

/// GET /healthz
pub async fn health() -> &'static str {
    "OK"
}

/// GET /api/leaderboard/{kind}
pub async fn leaderboard(
    State(services): State<Services>,
    Session(ctx): Session,
    Path(kind): Path<String>,
    params: Result<Query<LeaderboardParams>, QueryRejection>,
) -> ApiResult<Json<Leaderboard>> {
    let Query(params) = params?;
    let kind: LeaderboardKind = kind.parse().map_err(Error::from)?;
    let filter = LeaderboardFilter::from_params(&params).map_err(Error::from)?;
    Ok(Json(services.leaderboards.query(&ctx, kind, &filter).await?))
}

/// GET /api/conversations
pub async fn conversations(
    State(services): State<Services>,
    Session(ctx): Session,
) -> ApiResult<Json<Vec<ConversationSummary>>> {
    Ok(Json(services.conversations.list(&ctx).await?))
}

/// GET /api/conversations/{id}
pub async fn conversation(
    State(services): State<Services>,
    Session(ctx): Session,
    Path(id): Path<String>,
) -> ApiResult<Json<ConversationView>> {
    let id = ConversationId::from(id);
    Ok(Json(services.conversations.get(&ctx, &id).await?))
}

/// POST /api/conversations/{id}/abandon
pub async fn abandon_conversation(
    State(services): State<Services>,
    Session(ctx): Session,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let id = ConversationId::from(id);
    services.conversations.abandon(&ctx, &id).await?;
    Ok(Json(json!({ "success": true })))
}

/// GET /api/forecasts
pub async fn forecasts(
    State(services): State<Services>,
    Session(ctx): Session,
) -> ApiResult<Json<Vec<Forecast>>> {
    Ok(Json(services.forecasts.list(&ctx).await?))
}

/// GET /api/forecasts/{id}/prediction
///
/// The caller's prediction on a forecast, individual or by their group.
pub async fn my_prediction(
    State(services): State<Services>,
    Session(ctx): Session,
    Path(id): Path<String>,
) -> ApiResult<Json<Option<Prediction>>> {
    let id = ForecastId::from(id);
    Ok(Json(services.predictions.current(&ctx, &id).await?))
}

/// GET /api/groups
pub async fn groups(
    State(services): State<Services>,
    Session(ctx): Session,
) -> ApiResult<Json<Vec<GroupSummary>>> {
    Ok(Json(services.groups.list(&ctx).await?))
}

/// GET /api/groups/mine
pub async fn my_group(
    State(services): State<Services>,
    Session(ctx): Session,
) -> ApiResult<Json<Option<GroupDetail>>> {
    Ok(Json(services.groups.my_group(&ctx).await?))
}

/// GET /api/groups/{id}
pub async fn group(
    State(services): State<Services>,
    Session(ctx): Session,
    Path(id): Path<String>,
) -> ApiResult<Json<GroupDetail>> {
    let id = GroupId::from(id);
    Ok(Json(services.groups.detail(&ctx, &id).await?))
}

/// GET /api/settings/organization
pub async fn organization_settings(
    State(services): State<Services>,
    Session(ctx): Session,
) -> ApiResult<Json<OrganizationSettings>> {
    Ok(Json(services.organizations.settings(&ctx).await?))
}
