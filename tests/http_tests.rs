//! HTTP router behavior, exercised in-process.

mod support;

use augur::adapter::inbound::http::chat::CONVERSATION_HEADER;
use augur::adapter::inbound::http::router;
use augur::adapter::inbound::http::session::USER_HEADER;
use augur::domain::context::RequestContext;
use augur::domain::organization::usage_month;
use augur::infrastructure::config::server::ServerConfig;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use chrono::Utc;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use support::fixtures::World;
use support::scripted_model::{text, usage};

fn app(world: &World) -> Router {
    router(world.services.clone(), &ServerConfig::default())
}

fn get(uri: &str, caller: Option<&RequestContext>) -> Request<Body> {
    let mut builder = Request::builder().method(Method::GET).uri(uri);
    if let Some(ctx) = caller {
        builder = builder.header(USER_HEADER, ctx.user_id.as_str());
    }
    builder.body(Body::empty()).unwrap()
}

fn send_json(method: Method, uri: &str, caller: &RequestContext, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(USER_HEADER, caller.user_id.as_str())
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_text(response: Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(response: Response) -> Value {
    serde_json::from_str(&body_text(response).await).unwrap()
}

#[tokio::test]
async fn health_needs_no_caller() {
    let world = World::new();
    let response = app(&world).oneshot(get("/healthz", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "OK");
}

#[tokio::test]
async fn unknown_or_missing_caller_is_unauthorized() {
    let world = World::new();

    let response = app(&world)
        .oneshot(get("/api/forecasts", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await, json!({ "error": "Unauthorized" }));

    let request = Request::builder()
        .uri("/api/forecasts")
        .header(USER_HEADER, "no-such-user")
        .body(Body::empty())
        .unwrap();
    let response = app(&world).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn chat_streams_plain_text_with_conversation_header() {
    let world = World::new();
    let (_org, admin) = world.organization("Acme").await;
    world.store_api_key(&admin).await;
    world
        .models
        .model
        .push_round(vec![text("What should "), text("we forecast?"), usage(10, 5)]);

    let request = send_json(
        Method::POST,
        "/api/chat/forecasts",
        &admin,
        json!({ "messages": [{ "role": "user", "content": "Help me write a forecast" }] }),
    );
    let response = app(&world).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/plain"));
    let conversation_id = response.headers()[CONVERSATION_HEADER]
        .to_str()
        .unwrap()
        .to_string();
    assert_eq!(body_text(response).await, "What should we forecast?");

    let response = app(&world)
        .oneshot(get(&format!("/api/conversations/{conversation_id}"), Some(&admin)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let view = body_json(response).await;
    assert_eq!(view["status"], "IN_PROGRESS");
    assert_eq!(view["tokenCount"], 15);
    assert_eq!(view["messages"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn chat_over_quota_is_429_json() {
    let world = World::new();
    let (org, admin) = world.organization("Acme").await;
    world.store_api_key(&admin).await;
    world
        .store
        .add_token_usage(&org.id, 100_000, &usage_month(Utc::now()))
        .await
        .unwrap();

    let request = send_json(
        Method::POST,
        "/api/chat/forecasts",
        &admin,
        json!({ "messages": [{ "role": "user", "content": "Hi" }] }),
    );
    let response = app(&world).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let body = body_json(response).await;
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("Monthly AI token limit exceeded"));
    assert_eq!(world.models.model.calls(), 0);
}

#[tokio::test]
async fn chat_with_malformed_body_is_400() {
    let world = World::new();
    let (_org, admin) = world.organization("Acme").await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/chat/forecasts")
        .header(USER_HEADER, admin.user_id.as_str())
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app(&world).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["error"].is_string());
}

#[tokio::test]
async fn chat_over_quota_with_malformed_body_is_still_429() {
    let world = World::new();
    let (org, admin) = world.organization("Acme").await;
    world
        .store
        .add_token_usage(&org.id, 100_000, &usage_month(Utc::now()))
        .await
        .unwrap();

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/chat/forecasts")
        .header(USER_HEADER, admin.user_id.as_str())
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app(&world).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(body_json(response).await["error"]
        .as_str()
        .unwrap()
        .contains("Monthly AI token limit exceeded"));
    assert_eq!(world.models.model.calls(), 0);
}

#[tokio::test]
async fn action_validation_failure_is_a_failed_state() {
    let world = World::new();
    let (_org, admin) = world.organization("Acme").await;

    let response = app(&world)
        .oneshot(send_json(
            Method::POST,
            "/actions/groups",
            &admin,
            json!({ "name": "x" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let state = body_json(response).await;
    assert_eq!(state["success"], false);
    assert!(state["errors"]["name"].is_array());
    assert!(state.get("data").is_none());

    let response = app(&world)
        .oneshot(send_json(
            Method::POST,
            "/actions/groups",
            &admin,
            json!({ "name": "Research", "description": "Macro desk" }),
        ))
        .await
        .unwrap();
    let state = body_json(response).await;
    assert_eq!(state["success"], true);
    assert_eq!(state["data"]["name"], "Research");
}

#[tokio::test]
async fn admin_actions_are_forbidden_for_regular_users() {
    let world = World::new();
    let (org, _admin) = world.organization("Acme").await;
    let alice = world.member(&org.id, "Alice").await;

    let response = app(&world)
        .oneshot(send_json(
            Method::PUT,
            "/actions/settings/token-limit",
            &alice,
            json!({ "aiTokenLimit": 5000 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn unknown_leaderboard_kind_is_400() {
    let world = World::new();
    let (_org, admin) = world.organization("Acme").await;

    let response = app(&world)
        .oneshot(get("/api/leaderboard/teams", Some(&admin)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app(&world)
        .oneshot(get("/api/leaderboard/users?sortBy=accuracyRate", Some(&admin)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!([]));
}

#[tokio::test]
async fn settings_never_expose_the_api_key() {
    let world = World::new();
    let (_org, admin) = world.organization("Acme").await;
    world.store_api_key(&admin).await;

    let response = app(&world)
        .oneshot(get("/api/settings/organization", Some(&admin)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let raw = body_text(response).await;
    assert!(!raw.contains("sk-test"));
    let settings: Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(settings["hasApiKey"], true);
    assert_eq!(settings["aiTokenLimit"], 100_000);
}
