//! Chat turn limits.

use std::time::Duration;

use serde::Deserialize;

use crate::application::ChatSettings;

#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    /// Model calls allowed after tool results within one turn. Defaults to 5.
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: usize,

    /// Wall-clock limit of one turn in seconds. Defaults to 60.
    #[serde(default = "default_turn_timeout_secs")]
    pub turn_timeout_secs: u64,

    /// Text chunks buffered ahead of a slow client. Defaults to 64.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl ChatConfig {
    #[must_use]
    pub fn settings(&self) -> ChatSettings {
        ChatSettings {
            max_tool_rounds: self.max_tool_rounds,
            turn_timeout: Duration::from_secs(self.turn_timeout_secs),
            channel_capacity: self.channel_capacity,
        }
    }
}

fn default_max_tool_rounds() -> usize {
    5
}

fn default_turn_timeout_secs() -> u64 {
    60
}

fn default_channel_capacity() -> usize {
    64
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_tool_rounds: default_max_tool_rounds(),
            turn_timeout_secs: default_turn_timeout_secs(),
            channel_capacity: default_channel_capacity(),
        }
    }
}
