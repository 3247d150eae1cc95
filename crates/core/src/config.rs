//! TOML-based configuration for gitdeck.
//!
//! Secrets are never stored in the file. The backend token is referenced by
//! the name of an environment variable (`token_env`) and resolved at runtime
//! via [`AppConfig::resolve_env_vars`].

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::ConfigError;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level application configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Git backend service settings.
    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub log: LogConfig,

    /// Front-end behaviour settings.
    #[serde(default)]
    pub ui: UiConfig,
}

// ---------------------------------------------------------------------------
// Backend
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the backend service.
    #[serde(default = "default_backend_url")]
    pub url: String,

    /// Environment variable holding an optional bearer token.
    #[serde(default)]
    pub token_env: Option<String>,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Path prefix of the Git API on the backend.
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,

    /// Resolved token (not serialized).
    #[serde(skip)]
    pub token: Option<String>,
}

fn default_backend_url() -> String {
    "http://127.0.0.1:6868".into()
}
fn default_timeout() -> u64 {
    30
}
fn default_api_prefix() -> String {
    "/api/git".into()
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: default_backend_url(),
            token_env: None,
            timeout_secs: default_timeout(),
            api_prefix: default_api_prefix(),
            token: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Minimum tracing level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ---------------------------------------------------------------------------
// UI
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    /// Key that turns a click into a range gesture.
    #[serde(default = "default_range_modifier")]
    pub range_modifier: String,

    /// Buffered notifications per subscriber before old ones are dropped.
    #[serde(default = "default_notification_capacity")]
    pub notification_capacity: usize,
}

fn default_range_modifier() -> String {
    "shift".into()
}
fn default_notification_capacity() -> usize {
    64
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            range_modifier: default_range_modifier(),
            notification_capacity: default_notification_capacity(),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading, env resolution & validation
// ---------------------------------------------------------------------------

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading configuration");

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config = Self::parse(&contents)?;
        debug!("configuration parsed successfully");
        Ok(config)
    }

    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Resolve `*_env` references into their secret values.
    pub fn resolve_env_vars(&mut self) -> Result<(), ConfigError> {
        if let Some(ref env_name) = self.backend.token_env {
            self.backend.token = resolve_optional_env(env_name, "backend.token_env");
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.backend.url.trim();
        if url.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "backend.url".into(),
                detail: "backend URL must not be empty".into(),
            });
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::InvalidValue {
                field: "backend.url".into(),
                detail: format!("'{url}' must start with http:// or https://"),
            });
        }
        if self.backend.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "backend.timeout_secs".into(),
                detail: "timeout must be > 0".into(),
            });
        }
        if self.ui.notification_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "ui.notification_capacity".into(),
                detail: "capacity must be > 0".into(),
            });
        }
        if !LOG_LEVELS.contains(&self.log.level.to_ascii_lowercase().as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "log.level".into(),
                detail: format!(
                    "unknown level '{}', expected one of: {}",
                    self.log.level,
                    LOG_LEVELS.join(", ")
                ),
            });
        }
        Ok(())
    }

    /// Load, resolve env vars, and validate in one step.
    pub fn load_and_resolve<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut config = Self::load_from_file(path)?;
        config.resolve_env_vars()?;
        config.validate()?;
        Ok(config)
    }

    /// A commented starter file, as written by `gitdeck init`.
    pub fn template() -> String {
        format!(
            r#"[backend]
url = "{url}"
# token_env = "GITDECK_TOKEN"
timeout_secs = {timeout}
api_prefix = "{prefix}"

[log]
level = "{level}"

[ui]
range_modifier = "{modifier}"
notification_capacity = {capacity}
"#,
            url = default_backend_url(),
            timeout = default_timeout(),
            prefix = default_api_prefix(),
            level = default_log_level(),
            modifier = default_range_modifier(),
            capacity = default_notification_capacity(),
        )
    }
}

fn resolve_optional_env(env_name: &str, field: &str) -> Option<String> {
    match std::env::var(env_name) {
        Ok(val) if !val.is_empty() => {
            debug!(field, env_name, "resolved env var");
            Some(val)
        }
        Ok(_) => {
            warn!(field, env_name, "env var is set but empty");
            None
        }
        Err(_) => {
            warn!(field, env_name, "env var not set");
            None
        }
    }
}
