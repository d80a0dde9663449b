//! Streaming chat endpoint.

use std::convert::Infallible;

use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::header::{HeaderName, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures_util::stream;
use tracing::debug;

use super::error::ApiResult;
use super::session::Session;
use crate::application::{ChatInput, Services};

/// Response header naming the conversation the turn belongs to.
pub const CONVERSATION_HEADER: &str = "x-conversation-id";

/// POST /api/chat/forecasts
///
/// Streams the assistant's reply as plain text. Dropping the response body
/// cancels the turn. An exhausted quota is reported ahead of a malformed body.
pub async fn forecast_chat(
    State(services): State<Services>,
    Session(ctx): Session,
    payload: Result<Json<ChatInput>, JsonRejection>,
) -> ApiResult<Response> {
    let input = match payload {
        Ok(Json(input)) => input,
        Err(rejection) => {
            services
                .organizations
                .check_token_quota(ctx.organization()?)
                .await?;
            return Err(rejection.into());
        }
    };
    let turn = services.chat.start_turn(&ctx, input).await?;
    let conversation_id = turn.conversation_id.to_string();
    debug!(conversation_id = %conversation_id, "Streaming chat turn");

    let chunks = stream::unfold(turn.into_chunks(), |mut rx| async move {
        rx.recv()
            .await
            .map(|chunk| (Ok::<_, Infallible>(chunk), rx))
    });

    Ok((
        [
            (CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (HeaderName::from_static(CONVERSATION_HEADER), conversation_id),
        ],
        Body::from_stream(chunks),
    )
        .into_response())
}
