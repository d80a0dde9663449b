//! Outbound adapters (driven side).

pub mod crypto;
pub mod llm;
pub mod sqlite;
