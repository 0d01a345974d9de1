//! Application state wiring the chat engine to its infrastructure.
//!
//! AppState holds the concrete service instance used by both the CLI and
//! the REST API. `ChatService` is generic over its ports; AppState pins it
//! to the SQLite repositories.

use std::path::PathBuf;
use std::sync::Arc;

use spendscope_core::chat::service::ChatService;
use spendscope_core::llm::box_provider::BoxLlmProvider;
use spendscope_infra::config::{load_assistant_config, load_or_create_user_id, resolve_data_dir};
use spendscope_infra::llm::provider_from_env;
use spendscope_infra::sqlite::chat::SqliteChatRepository;
use spendscope_infra::sqlite::pool::{DatabasePool, database_url};
use spendscope_infra::sqlite::receipt::SqliteReceiptRepository;
use spendscope_types::config::AssistantConfig;
use spendscope_types::user::UserId;

/// Chat service pinned to the SQLite adapters.
pub type ConcreteChatService = ChatService<SqliteChatRepository, SqliteReceiptRepository>;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub chat_service: Arc<ConcreteChatService>,
    pub db_pool: DatabasePool,
    pub data_dir: PathBuf,
    /// The local user CLI commands act as. HTTP requests use the user bound
    /// to their API key instead.
    pub user_id: UserId,
}

impl AppState {
    /// Initialize the application state: load config, connect to the DB,
    /// build the model client, wire the chat service.
    pub async fn init(user_override: Option<UserId>) -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        tokio::fs::create_dir_all(&data_dir).await?;

        let config = load_assistant_config(&data_dir).await;

        let db_url = format!("{}?mode=rwc", database_url(&data_dir));
        let db_pool = DatabasePool::new(&db_url).await?;

        let user_id = match user_override {
            Some(user_id) => user_id,
            None => load_or_create_user_id(&data_dir).await?,
        };

        let provider = provider_from_env(&config.model);

        tracing::debug!(
            data_dir = %data_dir.display(),
            user_id = %user_id,
            provider = provider.name(),
            "Application state initialized"
        );

        Ok(Self::from_parts(db_pool, provider, config, data_dir, user_id))
    }

    /// Wire the state from already-built parts.
    pub fn from_parts(
        db_pool: DatabasePool,
        provider: BoxLlmProvider,
        config: AssistantConfig,
        data_dir: PathBuf,
        user_id: UserId,
    ) -> Self {
        let chat_service = ChatService::new(
            SqliteChatRepository::new(db_pool.clone()),
            SqliteReceiptRepository::new(db_pool.clone()),
            provider,
            config,
        );

        Self {
            chat_service: Arc::new(chat_service),
            db_pool,
            data_dir,
            user_id,
        }
    }
}
