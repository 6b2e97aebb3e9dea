//! Configuration management for the Bookshelf client

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::PathBuf;

/// Server page size for paginated list endpoints
pub const PAGE_SIZE: u32 = 20;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ApiConfig {
    pub library_url: String,
    pub user_url: String,
    pub page_size: u32,
    /// Request timeout; the transport default applies when unset
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SessionConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let config = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // BOOKSHELF__API__LIBRARY_URL, BOOKSHELF__SESSION__PATH, ...
            .add_source(
                Environment::with_prefix("BOOKSHELF")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("api.library_url", env::var("LIBRARY_API_URL").ok())?
            .set_override_option("api.user_url", env::var("USER_API_URL").ok())?
            .build()?;

        Self::from_config(config)
    }

    fn from_config(config: Config) -> Result<Self, ConfigError> {
        let app: Self = config.try_deserialize()?;
        if app.api.page_size == 0 {
            return Err(ConfigError::Message("api.page_size must be at least 1".to_string()));
        }
        Ok(app)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            library_url: "http://localhost:5000/api".to_string(),
            user_url: "http://localhost:5001/api".to_string(),
            page_size: PAGE_SIZE,
            timeout_secs: None,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        let base = env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))
            .unwrap_or_else(|| PathBuf::from("."));
        Self {
            path: base.join("bookshelf").join("session.json"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
