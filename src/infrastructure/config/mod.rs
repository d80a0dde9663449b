//! Configuration sections loaded from `config.toml`.

pub mod chat;
pub mod database;
pub mod llm;
pub mod logging;
pub mod server;
pub mod settings;

pub use settings::Config;
