//! Chat turns driven by a scripted model.

mod support;

use std::time::Duration;

use augur::application::chat::{IncomingMessage, CONVERSATION_COMPLETED, MESSAGES_REQUIRED};
use augur::application::tools::{CREATE_FORECAST, FIND_OR_CREATE_CATEGORY, VALIDATE_FORECAST_DRAFT};
use augur::application::{ChatInput, ChatSettings};
use augur::domain::conversation::{ConversationStatus, MessageRole};
use augur::domain::organization::usage_month;
use augur::error::Error;
use augur::port::outbound::llm::ChatMessage;
use chrono::Utc;
use serde_json::json;

use support::fixtures::{World, TEST_API_KEY};
use support::scripted_model::{text, tool_call, usage};

fn user_says(content: &str) -> ChatInput {
    ChatInput {
        messages: vec![IncomingMessage {
            role: "user".into(),
            content: content.into(),
        }],
        conversation_id: None,
    }
}

fn draft() -> serde_json::Value {
    json!({
        "title": "Will the policy rate be cut by June 2030?",
        "description": "Resolves YES if the central bank lowers its policy rate.",
        "type": "BINARY",
        "dueDate": "2030-06-01",
        "dataReleaseDate": "2030-06-15",
        "categoryName": "Economics"
    })
}

#[tokio::test]
async fn tool_pipeline_creates_forecast_and_completes_conversation() {
    let world = World::new();
    let (org, admin) = world.organization("Acme").await;
    world.store_api_key(&admin).await;

    let model = &world.models.model;
    model.push_round(vec![
        text("Let me set that up."),
        tool_call("c1", FIND_OR_CREATE_CATEGORY, json!({ "name": "Economics" })),
        usage(100, 20),
    ]);
    model.push_round(vec![
        tool_call("c2", VALIDATE_FORECAST_DRAFT, draft()),
        usage(100, 20),
    ]);
    model.push_round(vec![
        tool_call("c3", CREATE_FORECAST, draft()),
        usage(100, 20),
    ]);
    model.push_round(vec![text("Your forecast is live."), usage(100, 20)]);

    let turn = world
        .services
        .chat
        .start_turn(&admin, user_says("Create a forecast about rate cuts"))
        .await
        .unwrap();
    let conversation_id = turn.conversation_id.clone();
    let streamed = turn.collect().await;

    assert!(streamed.starts_with("Let me set that up."));
    assert!(streamed.ends_with("Your forecast is live."));
    assert_eq!(model.calls(), 4);
    assert_eq!(world.models.keys(), vec![TEST_API_KEY.to_string()]);

    let requests = model.requests();
    assert!(matches!(requests[0].messages[0], ChatMessage::System(_)));
    assert_eq!(requests[0].tools.len(), 3);
    assert!(requests[1]
        .messages
        .iter()
        .any(|m| matches!(m, ChatMessage::Tool { call_id, .. } if call_id == "c1")));

    let forecasts = world.services.forecasts.list(&admin).await.unwrap();
    assert_eq!(forecasts.len(), 1);
    let forecast = &forecasts[0];
    assert_eq!(forecast.title, "Will the policy rate be cut by June 2030?");
    let categories = world.store.categories(&org.id).await.unwrap();
    assert_eq!(categories.len(), 1);
    assert_eq!(forecast.category_id.as_ref(), Some(&categories[0].id));

    let view = world
        .services
        .conversations
        .get(&admin, &conversation_id)
        .await
        .unwrap();
    assert_eq!(view.conversation.status, ConversationStatus::Completed);
    assert_eq!(view.conversation.forecast_id.as_ref(), Some(&forecast.id));
    assert_eq!(view.conversation.token_count, 480);
    assert_eq!(view.messages.len(), 2);
    assert_eq!(view.messages[0].role, MessageRole::User);
    assert_eq!(view.messages[1].role, MessageRole::Assistant);

    let settings = world.services.organizations.settings(&admin).await.unwrap();
    assert_eq!(settings.ai_tokens_used_this_month, 480);
}

#[tokio::test]
async fn exhausted_quota_fails_before_the_model_is_called() {
    let world = World::new();
    let (org, admin) = world.organization("Acme").await;
    world.store_api_key(&admin).await;
    world
        .store
        .add_token_usage(&org.id, 100_000, &usage_month(Utc::now()))
        .await
        .unwrap();

    let result = world
        .services
        .chat
        .start_turn(&admin, user_says("One more forecast please"))
        .await;
    assert!(matches!(result, Err(Error::QuotaExceeded(_))));
    assert_eq!(world.models.model.calls(), 0);
    assert!(world
        .services
        .conversations
        .list(&admin)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn missing_api_key_fails_without_creating_a_conversation() {
    let world = World::new();
    let (_org, admin) = world.organization("Acme").await;

    let result = world
        .services
        .chat
        .start_turn(&admin, user_says("Hello"))
        .await;
    assert!(matches!(result, Err(Error::Llm(_))));
    assert!(world
        .services
        .conversations
        .list(&admin)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn malformed_histories_are_rejected() {
    let world = World::new();
    let (_org, admin) = world.organization("Acme").await;
    world.store_api_key(&admin).await;

    let result = world
        .services
        .chat
        .start_turn(&admin, ChatInput::default())
        .await;
    match result {
        Err(Error::BadRequest(message)) => assert_eq!(message, MESSAGES_REQUIRED),
        other => panic!("expected bad request, got {other:?}"),
    }

    let only_assistant = ChatInput {
        messages: vec![IncomingMessage {
            role: "assistant".into(),
            content: "Hi!".into(),
        }],
        conversation_id: None,
    };
    let result = world
        .services
        .chat
        .start_turn(&admin, only_assistant)
        .await;
    assert!(matches!(result, Err(Error::BadRequest(_))));
    assert_eq!(world.models.model.calls(), 0);
}

#[tokio::test]
async fn tool_rounds_are_bounded() {
    let world = World::with_chat(ChatSettings {
        max_tool_rounds: 2,
        turn_timeout: Duration::from_secs(10),
        channel_capacity: 8,
    });
    let (_org, admin) = world.organization("Acme").await;
    world.store_api_key(&admin).await;

    for i in 0..5 {
        world.models.model.push_round(vec![tool_call(
            &format!("c{i}"),
            FIND_OR_CREATE_CATEGORY,
            json!({ "name": "Loops" }),
        )]);
    }

    let turn = world
        .services
        .chat
        .start_turn(&admin, user_says("Keep calling tools"))
        .await
        .unwrap();
    turn.collect().await;
    assert_eq!(world.models.model.calls(), 3);
}

#[tokio::test]
async fn completed_conversation_cannot_continue() {
    let world = World::new();
    let (_org, admin) = world.organization("Acme").await;
    world.store_api_key(&admin).await;

    world.models.model.push_round(vec![tool_call("c1", CREATE_FORECAST, draft())]);
    let turn = world
        .services
        .chat
        .start_turn(&admin, user_says("Create it"))
        .await
        .unwrap();
    let conversation_id = turn.conversation_id.clone();
    turn.collect().await;

    let calls = world.models.model.calls();
    let mut follow_up = user_says("And another one");
    follow_up.conversation_id = Some(conversation_id.to_string());
    let result = world.services.chat.start_turn(&admin, follow_up).await;
    match result {
        Err(Error::BadRequest(message)) => assert_eq!(message, CONVERSATION_COMPLETED),
        other => panic!("expected bad request, got {other:?}"),
    }
    assert_eq!(world.models.model.calls(), calls);
}

#[tokio::test]
async fn second_create_in_a_completed_conversation_is_refused() {
    let world = World::new();
    let (_org, admin) = world.organization("Acme").await;
    world.store_api_key(&admin).await;

    let mut second = draft();
    second["title"] = json!("Will unemployment fall below 4% by June 2030?");
    let model = &world.models.model;
    model.push_round(vec![tool_call("c1", CREATE_FORECAST, draft())]);
    model.push_round(vec![tool_call("c2", CREATE_FORECAST, second)]);
    model.push_round(vec![text("Done.")]);

    let turn = world
        .services
        .chat
        .start_turn(&admin, user_says("Create two forecasts"))
        .await
        .unwrap();
    turn.collect().await;
    assert_eq!(model.calls(), 3);

    let forecasts = world.services.forecasts.list(&admin).await.unwrap();
    assert_eq!(forecasts.len(), 1);
    assert_eq!(forecasts[0].title, "Will the policy rate be cut by June 2030?");

    let requests = model.requests();
    let refusal = requests[2]
        .messages
        .iter()
        .find_map(|m| match m {
            ChatMessage::Tool { call_id, content } if call_id == "c2" => Some(content.clone()),
            _ => None,
        })
        .unwrap();
    assert!(refusal.contains("\"success\":false"));
    assert!(refusal.contains(CONVERSATION_COMPLETED));
}

#[tokio::test]
async fn other_users_cannot_continue_a_conversation() {
    let world = World::new();
    let (org, admin) = world.organization("Acme").await;
    let alice = world.member(&org.id, "Alice").await;
    world.store_api_key(&admin).await;

    let turn = world
        .services
        .chat
        .start_turn(&admin, user_says("Draft something"))
        .await
        .unwrap();
    let conversation_id = turn.conversation_id.clone();
    turn.collect().await;

    let mut hijack = user_says("Let me in");
    hijack.conversation_id = Some(conversation_id.to_string());
    let result = world.services.chat.start_turn(&alice, hijack).await;
    assert!(matches!(result, Err(Error::Forbidden(_))));
}
