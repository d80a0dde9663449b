//! HTTP surface.
//!
//! Callers are authenticated upstream and identified by the `x-user-id`
//! header (see [`session`]). Errors are JSON `{"error": ...}` bodies with the
//! status chosen in [`error::status_of`].

pub mod actions;
pub mod chat;
pub mod error;
pub mod queries;
pub mod session;

use axum::routing::{get, post, put};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::application::Services;
use crate::error::Result;
use crate::infrastructure::config::server::ServerConfig;

/// Build the application router.
pub fn router(services: Services, config: &ServerConfig) -> Router {
    Router::new()
        .route("/healthz", get(queries::health))
        .route("/api/chat/forecasts", post(chat::forecast_chat))
        .route("/api/leaderboard/{kind}", get(queries::leaderboard))
        .route("/api/conversations", get(queries::conversations))
        .route("/api/conversations/{id}", get(queries::conversation))
        .route(
            "/api/conversations/{id}/abandon",
            post(queries::abandon_conversation),
        )
        .route("/api/forecasts", get(queries::forecasts))
        .route("/api/forecasts/{id}/prediction", get(queries::my_prediction))
        .route("/api/groups", get(queries::groups))
        .route("/api/groups/mine", get(queries::my_group))
        .route("/api/groups/{id}", get(queries::group))
        .route(
            "/api/settings/organization",
            get(queries::organization_settings),
        )
        .route("/actions/groups", post(actions::create_group))
        .route(
            "/actions/groups/{id}",
            put(actions::update_group).delete(actions::delete_group),
        )
        .route("/actions/groups/{id}/members", post(actions::add_member))
        .route(
            "/actions/groups/{id}/members/{user_id}",
            axum::routing::delete(actions::remove_member),
        )
        .route("/actions/predictions", post(actions::submit_prediction))
        .route("/actions/predictions/{id}", put(actions::update_prediction))
        .route("/actions/forecasts", post(actions::create_forecast))
        .route("/actions/forecasts/{id}/actual", post(actions::record_actual))
        .route(
            "/actions/settings/organization",
            put(actions::update_organization),
        )
        .route("/actions/settings/api-key", put(actions::update_api_key))
        .route(
            "/actions/settings/token-limit",
            put(actions::update_token_limit),
        )
        .layer(RequestBodyLimitLayer::new(config.body_limit_bytes))
        .layer(TimeoutLayer::new(config.request_timeout()))
        .layer(TraceLayer::new_for_http())
        .with_state(services)
}

/// Serve the router until Ctrl-C.
pub async fn serve(config: &ServerConfig, services: Services) -> Result<()> {
    let listener = TcpListener::bind(&config.bind).await?;
    info!(address = %config.bind, "HTTP server listening");

    axum::serve(listener, router(services, config))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}
