//! Streaming chat-completion port with tool calling.
//!
//! A [`ChatModel`] turns a [`ChatRequest`] into a stream of [`ChatEvent`]s:
//! text deltas as they arrive, then any tool calls the model requested and
//! the token usage of the call.

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::Stream;
use serde_json::Value;

use crate::error::Result;

/// A tool the model may call, described by a JSON schema.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Value,
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    /// Raw JSON arguments as produced by the model.
    pub arguments: String,
}

/// One message of the model-facing conversation.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatMessage {
    System(String),
    User(String),
    Assistant {
        content: String,
        tool_calls: Vec<ToolCall>,
    },
    Tool {
        call_id: String,
        content: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub tools: Vec<ToolSpec>,
}

/// Token usage reported for one model call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl Usage {
    #[must_use]
    pub fn total(&self) -> u32 {
        self.prompt_tokens + self.completion_tokens
    }
}

impl std::ops::AddAssign for Usage {
    fn add_assign(&mut self, other: Self) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    /// A chunk of assistant text.
    Text(String),
    /// A fully assembled tool call.
    ToolCall(ToolCall),
    /// Usage for the call, emitted once at the end.
    Usage(Usage),
}

pub type ChatStream = Pin<Box<dyn Stream<Item = Result<ChatEvent>> + Send>>;

/// A hosted chat model bound to one API key.
///
/// Implementations must be thread-safe (`Send + Sync`); one instance may
/// serve concurrent turns.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Provider name for logging.
    fn name(&self) -> &'static str;

    /// Start a streamed completion.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be sent or the provider
    /// rejects it before streaming starts.
    async fn stream(&self, request: ChatRequest) -> Result<ChatStream>;
}

/// Builds a [`ChatModel`] for an organization's decrypted API key.
pub trait ChatModelFactory: Send + Sync {
    fn model(&self, api_key: &str) -> Result<Arc<dyn ChatModel>>;
}
