//! OpenAI streaming chat client.
//!
//! Implements [`ChatModel`] against the Chat Completions API with
//! `stream: true`. Text deltas are forwarded as they arrive; tool call
//! fragments are assembled and emitted once the stream ends, followed by the
//! usage block requested through `stream_options.include_usage`.

use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::sse::{SseDecoder, ToolCallAccumulator, DONE};
use crate::error::{Error, LlmError, Result};
use crate::port::outbound::llm::{
    ChatEvent, ChatMessage, ChatModel, ChatModelFactory, ChatRequest, ChatStream, ToolCall,
    ToolSpec, Usage,
};

/// OpenAI Chat Completions API endpoint.
const API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Streaming OpenAI client bound to one API key.
#[derive(Debug, Clone)]
pub struct OpenAiChat {
    client: Client,
    api_key: String,
    model: String,
    max_tokens: usize,
    temperature: f64,
    url: String,
}

impl OpenAiChat {
    #[must_use]
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        max_tokens: usize,
        temperature: f64,
    ) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            max_tokens,
            temperature,
            url: API_URL.to_string(),
        }
    }

    /// Point the client at a compatible endpoint instead of api.openai.com.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    fn build_request(&self, request: ChatRequest) -> Request {
        Request {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            stream: true,
            stream_options: StreamOptions {
                include_usage: true,
            },
            messages: request.messages.into_iter().map(Message::from).collect(),
            tools: request.tools.iter().map(Tool::from).collect(),
        }
    }
}

#[derive(Serialize)]
struct Request {
    model: String,
    max_tokens: usize,
    temperature: f64,
    stream: bool,
    stream_options: StreamOptions,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool>,
}

#[derive(Serialize)]
struct StreamOptions {
    include_usage: bool,
}

#[derive(Serialize)]
struct Message {
    role: &'static str,
    content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<OutgoingToolCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl Message {
    fn text(role: &'static str, content: String) -> Self {
        Self {
            role,
            content: Some(content),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }
}

impl From<ChatMessage> for Message {
    fn from(message: ChatMessage) -> Self {
        match message {
            ChatMessage::System(content) => Self::text("system", content),
            ChatMessage::User(content) => Self::text("user", content),
            ChatMessage::Assistant {
                content,
                tool_calls,
            } => Self {
                role: "assistant",
                content: (!content.is_empty() || tool_calls.is_empty()).then_some(content),
                tool_calls: tool_calls.into_iter().map(OutgoingToolCall::from).collect(),
                tool_call_id: None,
            },
            ChatMessage::Tool { call_id, content } => Self {
                role: "tool",
                content: Some(content),
                tool_calls: Vec::new(),
                tool_call_id: Some(call_id),
            },
        }
    }
}

#[derive(Serialize)]
struct OutgoingToolCall {
    id: String,
    #[serde(rename = "type")]
    kind: &'static str,
    function: OutgoingFunction,
}

#[derive(Serialize)]
struct OutgoingFunction {
    name: String,
    arguments: String,
}

impl From<ToolCall> for OutgoingToolCall {
    fn from(call: ToolCall) -> Self {
        Self {
            id: call.id,
            kind: "function",
            function: OutgoingFunction {
                name: call.name,
                arguments: call.arguments,
            },
        }
    }
}

#[derive(Serialize)]
struct Tool {
    #[serde(rename = "type")]
    kind: &'static str,
    function: FunctionSpec,
}

#[derive(Serialize)]
struct FunctionSpec {
    name: &'static str,
    description: &'static str,
    parameters: Value,
}

impl From<&ToolSpec> for Tool {
    fn from(spec: &ToolSpec) -> Self {
        Self {
            kind: "function",
            function: FunctionSpec {
                name: spec.name,
                description: spec.description,
                parameters: spec.parameters.clone(),
            },
        }
    }
}

#[derive(Deserialize)]
struct Chunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    #[serde(default)]
    usage: Option<ChunkUsage>,
}

#[derive(Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: Delta,
}

#[derive(Deserialize, Default)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<DeltaToolCall>,
}

#[derive(Deserialize)]
struct DeltaToolCall {
    index: u32,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    function: Option<DeltaFunction>,
}

#[derive(Deserialize)]
struct DeltaFunction {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}

#[derive(Deserialize)]
struct ChunkUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

type ByteStream = Pin<Box<dyn Stream<Item = reqwest::Result<Vec<u8>>> + Send>>;

/// Decoder state threaded through the output stream.
struct StreamState {
    body: ByteStream,
    decoder: SseDecoder,
    calls: ToolCallAccumulator,
    usage: Usage,
    pending: VecDeque<ChatEvent>,
    finished: bool,
}

impl StreamState {
    fn new(body: ByteStream) -> Self {
        Self {
            body,
            decoder: SseDecoder::new(),
            calls: ToolCallAccumulator::default(),
            usage: Usage::default(),
            pending: VecDeque::new(),
            finished: false,
        }
    }

    fn apply(&mut self, payload: &str) -> Result<()> {
        if payload == DONE {
            self.finish();
            return Ok(());
        }
        let chunk: Chunk = serde_json::from_str(payload)
            .map_err(|e| LlmError::Stream(format!("{e}: {payload}")))?;

        for choice in chunk.choices {
            if let Some(text) = choice.delta.content.filter(|t| !t.is_empty()) {
                self.pending.push_back(ChatEvent::Text(text));
            }
            for call in choice.delta.tool_calls {
                let (name, arguments) = match &call.function {
                    Some(f) => (f.name.as_deref(), f.arguments.as_deref()),
                    None => (None, None),
                };
                self.calls
                    .push(call.index, call.id.as_deref(), name, arguments);
            }
        }
        if let Some(usage) = chunk.usage {
            self.usage = Usage {
                prompt_tokens: usage.prompt_tokens,
                completion_tokens: usage.completion_tokens,
            };
        }
        Ok(())
    }

    fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        for call in self.calls.drain() {
            self.pending.push_back(ChatEvent::ToolCall(call));
        }
        self.pending.push_back(ChatEvent::Usage(self.usage));
    }

    async fn next_event(&mut self) -> Option<Result<ChatEvent>> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(Ok(event));
            }
            if self.finished {
                return None;
            }
            match self.body.next().await {
                Some(Ok(bytes)) => {
                    for payload in self.decoder.feed(&bytes) {
                        if let Err(e) = self.apply(&payload) {
                            self.finished = true;
                            self.pending.clear();
                            return Some(Err(e));
                        }
                    }
                }
                Some(Err(e)) => {
                    self.finished = true;
                    return Some(Err(Error::Http(e)));
                }
                None => {
                    if let Some(payload) = self.decoder.finish() {
                        if let Err(e) = self.apply(&payload) {
                            self.finished = true;
                            return Some(Err(e));
                        }
                    }
                    self.finish();
                }
            }
        }
    }
}

fn into_events(body: ByteStream) -> ChatStream {
    Box::pin(futures_util::stream::unfold(
        StreamState::new(body),
        |mut state| async move { state.next_event().await.map(|event| (event, state)) },
    ))
}

#[async_trait]
impl ChatModel for OpenAiChat {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn stream(&self, request: ChatRequest) -> Result<ChatStream> {
        let body = self.build_request(request);

        let response = self
            .client
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&text)
                .map(|body| body.error.message)
                .unwrap_or(text);
            tracing::warn!(status = status.as_u16(), "Model provider rejected request");
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            }
            .into());
        }

        let bytes = response.bytes_stream().map(|chunk| chunk.map(|b| b.to_vec()));
        Ok(into_events(Box::pin(bytes)))
    }
}

/// Creates [`OpenAiChat`] clients sharing one connection pool.
#[derive(Debug, Clone)]
pub struct OpenAiChatFactory {
    client: Client,
    model: String,
    max_tokens: usize,
    temperature: f64,
    url: String,
}

impl OpenAiChatFactory {
    #[must_use]
    pub fn new(model: impl Into<String>, max_tokens: usize, temperature: f64) -> Self {
        Self {
            client: Client::new(),
            model: model.into(),
            max_tokens,
            temperature,
            url: API_URL.to_string(),
        }
    }

    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}

impl ChatModelFactory for OpenAiChatFactory {
    fn model(&self, api_key: &str) -> Result<Arc<dyn ChatModel>> {
        if api_key.trim().is_empty() {
            return Err(LlmError::MissingApiKey.into());
        }
        Ok(Arc::new(OpenAiChat {
            client: self.client.clone(),
            api_key: api_key.to_string(),
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            url: self.url.clone(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn client() -> OpenAiChat {
        OpenAiChat::new("sk-test", "gpt-4o", 1024, 0.3)
    }

    fn body_of(chunks: &[&str]) -> ByteStream {
        let owned: Vec<reqwest::Result<Vec<u8>>> =
            chunks.iter().map(|c| Ok(c.as_bytes().to_vec())).collect();
        Box::pin(futures_util::stream::iter(owned))
    }

    async fn collect(chunks: &[&str]) -> Vec<ChatEvent> {
        into_events(body_of(chunks))
            .map(|event| event.unwrap())
            .collect()
            .await
    }

    // ==================== Request Serialization Tests ====================

    #[test]
    fn request_enables_streaming_with_usage() {
        let request = client().build_request(ChatRequest {
            messages: vec![ChatMessage::User("Hello".into())],
            tools: vec![],
        });
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["model"], "gpt-4o");
        assert_eq!(json["stream"], true);
        assert_eq!(json["stream_options"]["include_usage"], true);
        assert_eq!(json["messages"][0]["role"], "user");
        assert!(json.get("tools").is_none());
    }

    #[test]
    fn request_serializes_tools_as_functions() {
        let request = client().build_request(ChatRequest {
            messages: vec![ChatMessage::System("be brief".into())],
            tools: vec![ToolSpec {
                name: "findOrCreateCategory",
                description: "Find a category",
                parameters: json!({"type": "object"}),
            }],
        });
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["tools"][0]["type"], "function");
        assert_eq!(json["tools"][0]["function"]["name"], "findOrCreateCategory");
        assert_eq!(json["tools"][0]["function"]["parameters"]["type"], "object");
    }

    #[test]
    fn assistant_tool_call_message_has_null_content() {
        let message = Message::from(ChatMessage::Assistant {
            content: String::new(),
            tool_calls: vec![ToolCall {
                id: "call_1".into(),
                name: "createForecast".into(),
                arguments: "{}".into(),
            }],
        });
        let json = serde_json::to_value(&message).unwrap();

        assert!(json["content"].is_null());
        assert_eq!(json["tool_calls"][0]["id"], "call_1");
        assert_eq!(json["tool_calls"][0]["type"], "function");
        assert_eq!(json["tool_calls"][0]["function"]["arguments"], "{}");
    }

    #[test]
    fn tool_result_message_carries_call_id() {
        let message = Message::from(ChatMessage::Tool {
            call_id: "call_9".into(),
            content: "{\"success\":true}".into(),
        });
        let json = serde_json::to_value(&message).unwrap();

        assert_eq!(json["role"], "tool");
        assert_eq!(json["tool_call_id"], "call_9");
    }

    #[test]
    fn error_body_extracts_message() {
        let body: ErrorBody =
            serde_json::from_str(r#"{"error":{"message":"Incorrect API key","type":"x"}}"#)
                .unwrap();
        assert_eq!(body.error.message, "Incorrect API key");
    }

    // ==================== Stream Decoding Tests ====================

    #[tokio::test]
    async fn text_deltas_then_usage() {
        let events = collect(&[
            "data: {\"choices\":[{\"index\":0,\"delta\":{\"role\":\"assistant\",\"content\":\"Hel\"}}]}\n\n",
            "data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"lo\"}}]}\n\n",
            "data: {\"choices\":[],\"usage\":{\"prompt_tokens\":12,\"completion_tokens\":3,\"total_tokens\":15}}\n\n",
            "data: [DONE]\n\n",
        ])
        .await;

        assert_eq!(
            events,
            vec![
                ChatEvent::Text("Hel".into()),
                ChatEvent::Text("lo".into()),
                ChatEvent::Usage(Usage {
                    prompt_tokens: 12,
                    completion_tokens: 3
                }),
            ]
        );
    }

    #[tokio::test]
    async fn tool_call_fragments_are_assembled() {
        let events = collect(&[
            "data: {\"choices\":[{\"delta\":{\"tool_calls\":[{\"index\":0,\"id\":\"call_1\",\"type\":\"function\",\"function\":{\"name\":\"findOrCreateCategory\",\"arguments\":\"\"}}]}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"tool_calls\":[{\"index\":0,\"function\":{\"arguments\":\"{\\\"name\\\":\"}}]}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"tool_calls\":[{\"index\":0,\"function\":{\"arguments\":\"\\\"Economy\\\"}\"}}]}}]}\n\n",
            "data: [DONE]\n\n",
        ])
        .await;

        assert_eq!(events.len(), 2);
        match &events[0] {
            ChatEvent::ToolCall(call) => {
                assert_eq!(call.id, "call_1");
                assert_eq!(call.name, "findOrCreateCategory");
                assert_eq!(call.arguments, "{\"name\":\"Economy\"}");
            }
            other => panic!("expected tool call, got {other:?}"),
        }
        assert!(matches!(events[1], ChatEvent::Usage(_)));
    }

    #[tokio::test]
    async fn stream_without_done_still_finishes() {
        let events = collect(&["data: {\"choices\":[{\"delta\":{\"content\":\"ok\"}}]}\n\n"]).await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], ChatEvent::Text("ok".into()));
    }

    #[tokio::test]
    async fn malformed_chunk_is_a_stream_error() {
        let results: Vec<Result<ChatEvent>> = into_events(body_of(&["data: {not json\n\n"]))
            .collect()
            .await;
        assert_eq!(results.len(), 1);
        assert!(matches!(results[0], Err(Error::Llm(LlmError::Stream(_)))));
    }

    #[test]
    fn factory_rejects_blank_key() {
        let factory = OpenAiChatFactory::new("gpt-4o", 1024, 0.3);
        assert!(matches!(
            factory.model("  "),
            Err(Error::Llm(LlmError::MissingApiKey))
        ));
        assert_eq!(factory.model("sk-abc").unwrap().name(), "openai");
    }
}

// ==================== Integration Tests ====================
// These tests require a valid OPENAI_API_KEY environment variable.
// Run with: cargo test --features integration-tests
