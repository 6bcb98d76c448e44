//! Configuration loading and root folder resolution

use crate::{Error, Result};
use std::path::PathBuf;

/// Environment variable naming the ERSA root folder
pub const ROOT_FOLDER_ENV: &str = "ERSA_ROOT_FOLDER";

/// Database file name inside the root folder
pub const DATABASE_FILE: &str = "ersa.db";

/// Sync service configuration from the settings table
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Base URL of the remote document store; empty disables remote sync
    pub remote_base_url: String,
    /// Spreadsheet mirror webhook URL; empty disables mirroring
    pub mirror_url: String,
    pub listen_port: u16,
    pub http_timeout_ms: u64,
    /// Post-write confirmation reads before giving up
    pub confirm_read_attempts: u32,
    pub confirm_read_delay_ms: u64,
}

/// Root folder resolution priority order:
/// 1. Command-line argument (highest priority)
/// 2. `ERSA_ROOT_FOLDER` environment variable
/// 3. TOML config file (`root_folder` key)
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_root_folder(cli_arg: Option<&str>) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return PathBuf::from(path);
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
        return PathBuf::from(path);
    }

    // Priority 3: TOML config file
    if let Ok(config_path) = locate_config_file() {
        if let Ok(toml_content) = std::fs::read_to_string(&config_path) {
            if let Ok(config) = toml::from_str::<toml::Value>(&toml_content) {
                if let Some(root_folder) = config.get("root_folder").and_then(|v| v.as_str()) {
                    return PathBuf::from(root_folder);
                }
            }
        }
    }

    // Priority 4: OS-dependent compiled default
    default_root_folder()
}

/// Path to the sqlite database inside the root folder
pub fn database_path(root_folder: &std::path::Path) -> PathBuf {
    root_folder.join(DATABASE_FILE)
}

/// Get configuration file path for the platform
fn locate_config_file() -> Result<PathBuf> {
    if cfg!(target_os = "linux") {
        // Try ~/.config/ersa/config.toml first, then /etc/ersa/config.toml
        let user_config = dirs::config_dir().map(|d| d.join("ersa").join("config.toml"));
        let system_config = PathBuf::from("/etc/ersa/config.toml");

        if let Some(path) = user_config {
            if path.exists() {
                return Ok(path);
            }
        }
        if system_config.exists() {
            return Ok(system_config);
        }
        Err(Error::Config("No config file found".to_string()))
    } else {
        let path = dirs::config_dir()
            .map(|d| d.join("ersa").join("config.toml"))
            .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))?;

        if path.exists() {
            Ok(path)
        } else {
            Err(Error::Config(format!("Config file not found: {:?}", path)))
        }
    }
}

/// OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        dirs::data_local_dir()
            .map(|d| d.join("ersa"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/ersa"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("ersa"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/ersa"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("ersa"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\ersa"))
    } else {
        PathBuf::from("./ersa_data")
    }
}

/// Load sync service configuration from the settings table
pub async fn load_sync_config(db: &sqlx::SqlitePool) -> Result<SyncConfig> {
    Ok(SyncConfig {
        remote_base_url: setting(db, "remote_base_url").await?,
        mirror_url: setting(db, "mirror_url").await?,
        listen_port: setting(db, "http_listen_port")
            .await?
            .parse()
            .map_err(|_| Error::Config("http_listen_port is not a port number".to_string()))?,
        http_timeout_ms: parse_ms(db, "http_timeout_ms").await?,
        confirm_read_attempts: setting(db, "confirm_read_attempts")
            .await?
            .parse()
            .map_err(|_| Error::Config("confirm_read_attempts is not an integer".to_string()))?,
        confirm_read_delay_ms: parse_ms(db, "confirm_read_delay_ms").await?,
    })
}

async fn setting(db: &sqlx::SqlitePool, key: &str) -> Result<String> {
    let value: Option<String> =
        sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(db)
            .await?;

    value.ok_or_else(|| Error::Config(format!("Missing setting: {}", key)))
}

async fn parse_ms(db: &sqlx::SqlitePool, key: &str) -> Result<u64> {
    setting(db, key)
        .await?
        .parse()
        .map_err(|_| Error::Config(format!("{} is not a millisecond count", key)))
}
