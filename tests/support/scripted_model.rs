use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use augur::error::{Error, Result};
use augur::port::outbound::llm::{
    ChatEvent, ChatModel, ChatModelFactory, ChatRequest, ChatStream, ToolCall, Usage,
};
use futures_util::stream;

/// Deterministic chat model: each call replays the next scripted round.
///
/// Once the script runs out every call answers with a short text.
#[derive(Debug, Default)]
pub struct ScriptedModel {
    rounds: Mutex<VecDeque<Vec<ChatEvent>>>,
    requests: Mutex<Vec<ChatRequest>>,
    calls: AtomicUsize,
}

impl ScriptedModel {
    pub fn push_round(&self, events: Vec<ChatEvent>) {
        self.rounds.lock().unwrap().push_back(events);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn stream(&self, request: ChatRequest) -> Result<ChatStream> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request);
        let events = self
            .rounds
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| vec![text("Done.")]);
        Ok(Box::pin(stream::iter(events.into_iter().map(Ok::<_, Error>))))
    }
}

/// Hands out one shared [`ScriptedModel`] and remembers the keys it saw.
#[derive(Debug, Default)]
pub struct ScriptedFactory {
    pub model: Arc<ScriptedModel>,
    keys: Mutex<Vec<String>>,
}

impl ScriptedFactory {
    pub fn keys(&self) -> Vec<String> {
        self.keys.lock().unwrap().clone()
    }
}

impl ChatModelFactory for ScriptedFactory {
    fn model(&self, api_key: &str) -> Result<Arc<dyn ChatModel>> {
        self.keys.lock().unwrap().push(api_key.to_string());
        let model: Arc<dyn ChatModel> = self.model.clone();
        Ok(model)
    }
}

pub fn text(chunk: &str) -> ChatEvent {
    ChatEvent::Text(chunk.to_string())
}

pub fn tool_call(id: &str, name: &str, arguments: serde_json::Value) -> ChatEvent {
    ChatEvent::ToolCall(ToolCall {
        id: id.to_string(),
        name: name.to_string(),
        arguments: arguments.to_string(),
    })
}

pub fn usage(prompt_tokens: u32, completion_tokens: u32) -> ChatEvent {
    ChatEvent::Usage(Usage {
        prompt_tokens,
        completion_tokens,
    })
}
