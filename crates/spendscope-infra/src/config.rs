//! Configuration loader for SpendScope.
//!
//! Reads `config.toml` from the data directory (`~/.spendscope/` in production)
//! and deserializes it into [`AssistantConfig`]. Falls back to defaults when the
//! file is missing or malformed.
//!
//! Also resolves the data directory itself and the local user identity the
//! CLI acts as.

use std::path::{Path, PathBuf};

use spendscope_types::config::AssistantConfig;
use spendscope_types::user::UserId;

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "SPENDSCOPE_DATA_DIR";

const USER_ID_FILE: &str = "user.id";

/// Resolve the data directory: `SPENDSCOPE_DATA_DIR` if set, otherwise
/// `~/.spendscope` (or `./.spendscope` when no home directory exists).
pub fn resolve_data_dir() -> PathBuf {
    match std::env::var_os(DATA_DIR_ENV) {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".spendscope"),
    }
}

/// Load configuration from `{data_dir}/config.toml`.
///
/// - Missing file: [`AssistantConfig::default()`].
/// - Unreadable or unparseable file: logs a warning and returns the default.
pub async fn load_assistant_config(data_dir: &Path) -> AssistantConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return AssistantConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return AssistantConfig::default();
        }
    };

    match toml::from_str::<AssistantConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            AssistantConfig::default()
        }
    }
}

/// Load the local user identity from `{data_dir}/user.id`, generating and
/// persisting a fresh one on first use.
///
/// A file that exists but does not hold a UUID is an error rather than being
/// silently replaced, since that would orphan every existing session.
pub async fn load_or_create_user_id(data_dir: &Path) -> std::io::Result<UserId> {
    let path = data_dir.join(USER_ID_FILE);

    match tokio::fs::read_to_string(&path).await {
        Ok(content) => content.trim().parse::<UserId>().map_err(|e| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("{} is not a valid user id: {e}", path.display()),
            )
        }),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tokio::fs::create_dir_all(data_dir).await?;
            let user_id = UserId::new();
            tokio::fs::write(&path, format!("{user_id}\n")).await?;
            tracing::info!(user_id = %user_id, "Created local user identity");
            Ok(user_id)
        }
        Err(err) => Err(err),
    }
}
