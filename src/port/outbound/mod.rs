//! Outbound ports (driven side): interfaces implemented by outbound adapters.

pub mod cipher;
pub mod llm;
pub mod store;

pub use cipher::SecretCipher;
pub use llm::{
    ChatEvent, ChatMessage, ChatModel, ChatModelFactory, ChatRequest, ChatStream, ToolCall,
    ToolSpec, Usage,
};
pub use store::{
    CategoryStore, ConversationStore, ForecastStore, GroupStore, LeaderboardStore, NewPrediction,
    OrganizationStore, PredictionStore, Store, UserStore,
};
