//! Hosted language model adapters.
//!
//! Implements [`ChatModel`](crate::port::outbound::llm::ChatModel) for the
//! OpenAI streaming Chat Completions API.

pub mod openai;
mod sse;

pub use openai::{OpenAiChat, OpenAiChatFactory};
