//! Composition root for runtime wiring.

use std::sync::Arc;

use tracing::info;

use crate::adapter::outbound::crypto::ApiKeyCipher;
use crate::adapter::outbound::llm::OpenAiChatFactory;
use crate::adapter::outbound::sqlite::database::connection::{create_pool, run_migrations};
use crate::adapter::outbound::sqlite::SqliteStore;
use crate::application::Services;
use crate::error::Result;
use crate::infrastructure::config::database::DatabaseConfig;
use crate::infrastructure::config::llm::LlmConfig;
use crate::infrastructure::config::Config;
use crate::port::outbound::cipher::SecretCipher;
use crate::port::outbound::llm::ChatModelFactory;
use crate::port::outbound::store::Store;

/// Open the database pool and apply pending migrations.
pub fn open_store(config: &DatabaseConfig) -> Result<SqliteStore> {
    let pool = create_pool(
        &config.url,
        config.max_connections,
        config.connection_options(),
    )?;
    let applied = run_migrations(&pool)?;
    if applied > 0 {
        info!(database = %config.url, applied, "Applied database migrations");
    }
    Ok(SqliteStore::new(pool))
}

/// Build the model client factory from provider settings.
#[must_use]
pub fn build_chat_models(config: &LlmConfig) -> OpenAiChatFactory {
    let factory = OpenAiChatFactory::new(&config.model, config.max_tokens, config.temperature);
    match &config.base_url {
        Some(url) => factory.with_url(url),
        None => factory,
    }
}

/// Wire every service from configuration.
///
/// Reads `ENCRYPTION_KEY` from the environment.
pub fn build_services(config: &Config) -> Result<Services> {
    let store: Arc<dyn Store> = Arc::new(open_store(&config.database)?);
    let cipher: Arc<dyn SecretCipher> = Arc::new(ApiKeyCipher::from_env()?);
    let models: Arc<dyn ChatModelFactory> = Arc::new(build_chat_models(&config.llm));

    info!(
        database = %config.database.url,
        model = %config.llm.model,
        "Services ready"
    );
    Ok(Services::new(store, cipher, models, config.chat.settings()))
}
