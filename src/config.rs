//! Configuration loading and management.
//!
//! Loads concierge configuration from `./concierge.toml`, the `--config`
//! path, or `$CONCIERGE_CONFIG_PATH`. Environment variables override file
//! values; file values override defaults.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::persona::DEFAULT_ASSISTANT_NAME;
use crate::providers::gemini::{DEFAULT_GEMINI_MODEL, DEFAULT_GEMINI_URL};

/// Config file used when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "concierge.toml";

// ── Top-level config ────────────────────────────────────────────

/// Top-level concierge configuration loaded from TOML.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConciergeConfig {
    /// Tenant registry location and default selection.
    pub registry: RegistryConfig,
    /// Persona template settings.
    pub persona: PersonaConfig,
    /// Remote model settings.
    pub model: ModelConfig,
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

impl ConciergeConfig {
    /// Load configuration with precedence: env vars > TOML file > defaults.
    ///
    /// `explicit` is the `--config` flag. `$CONCIERGE_CONFIG_PATH` wins over
    /// it. An explicitly named file must exist; the default
    /// `./concierge.toml` may be absent.
    ///
    /// # Errors
    ///
    /// Returns an error if a named file is missing or any file fails to parse.
    pub fn load(explicit: Option<PathBuf>) -> Result<Self> {
        Self::load_with(explicit, |key| std::env::var(key).ok())
    }

    /// [`ConciergeConfig::load`] with a custom env resolver (for testing).
    ///
    /// # Errors
    ///
    /// Same as [`ConciergeConfig::load`].
    pub fn load_with(
        explicit: Option<PathBuf>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let (path, required) = Self::config_path_with(explicit, &env);
        let mut config = match std::fs::read_to_string(&path) {
            Ok(contents) => {
                tracing::info!(path = %path.display(), "loading config from file");
                Self::from_toml(&contents)
                    .with_context(|| format!("invalid config file {}", path.display()))?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && !required => {
                tracing::info!("no config file found, using defaults");
                Self::default()
            }
            Err(e) => {
                return Err(anyhow::anyhow!(
                    "failed to read config file {}: {e}",
                    path.display()
                ))
            }
        };
        config.apply_overrides(env);
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make the service unusable.
    ///
    /// # Errors
    ///
    /// Returns an error for a zero request timeout or a zero session limit.
    pub fn validate(&self) -> Result<()> {
        if self.model.request_timeout_secs == 0 {
            anyhow::bail!("model.request_timeout_secs must be greater than zero");
        }
        if self.server.max_sessions == 0 {
            anyhow::bail!("server.max_sessions must be greater than zero");
        }
        Ok(())
    }

    /// Resolve the config path and whether it must exist.
    fn config_path_with(
        explicit: Option<PathBuf>,
        env: &impl Fn(&str) -> Option<String>,
    ) -> (PathBuf, bool) {
        if let Some(p) = env("CONCIERGE_CONFIG_PATH") {
            return (PathBuf::from(p), true);
        }
        match explicit {
            Some(p) => (p, true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        }
    }

    /// Apply environment variable overrides (env > config > defaults).
    ///
    /// Takes a resolver function for testability (avoids unsafe `set_var` in tests).
    pub fn apply_overrides(&mut self, env: impl Fn(&str) -> Option<String>) {
        if let Some(v) = env("CONCIERGE_REGISTRY_PATH") {
            self.registry.path = PathBuf::from(v);
        }
        if let Some(v) = env("CONCIERGE_DEFAULT_TENANT") {
            self.registry.default_tenant = v;
        }
        if let Some(v) = env("CONCIERGE_MODEL") {
            self.model.name = v;
        }
        if let Some(v) = env("CONCIERGE_MODEL_BASE_URL") {
            self.model.base_url = v;
        }
        if let Some(v) = env("CONCIERGE_TIMEOUT_SECS") {
            match v.parse() {
                Ok(n) => self.model.request_timeout_secs = n,
                Err(_) => tracing::warn!(
                    var = "CONCIERGE_TIMEOUT_SECS",
                    value = %v,
                    "ignoring invalid env override"
                ),
            }
        }
        if let Some(v) = env("CONCIERGE_BIND") {
            self.server.bind = v;
        }
        if let Some(v) = env("CONCIERGE_LOG_DIR") {
            self.logging.dir = Some(PathBuf::from(v));
        }
    }

    /// Parse a TOML string into config.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or has wrongly typed values.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: ConciergeConfig =
            toml::from_str(toml_str).context("failed to parse config TOML")?;
        Ok(config)
    }
}

// ── Registry config ─────────────────────────────────────────────

/// Tenant registry settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Path to the tenant JSON file.
    pub path: PathBuf,
    /// Tenant used when a request names none.
    pub default_tenant: String,
    /// Query parameter carrying the tenant identifier.
    pub query_param: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("tenants.json"),
            default_tenant: "riad_ziz".to_string(),
            query_param: "hotel".to_string(),
        }
    }
}

// ── Persona config ──────────────────────────────────────────────

/// Persona template settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PersonaConfig {
    /// Concierge display name.
    pub assistant_name: String,
    /// Custom template file. The built-in template is used when unset.
    pub template_path: Option<PathBuf>,
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            assistant_name: DEFAULT_ASSISTANT_NAME.to_string(),
            template_path: None,
        }
    }
}

// ── Model config ────────────────────────────────────────────────

/// Remote model settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Model name, e.g. `gemini-2.5-flash`.
    pub name: String,
    /// API base URL.
    pub base_url: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Maximum reply tokens.
    pub max_output_tokens: Option<u32>,
    /// Sampling temperature.
    pub temperature: Option<f32>,
}

impl ModelConfig {
    /// Per-request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_GEMINI_MODEL.to_string(),
            base_url: DEFAULT_GEMINI_URL.to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            request_timeout_secs: 60,
            max_output_tokens: None,
            temperature: None,
        }
    }
}

// ── Server config ───────────────────────────────────────────────

/// HTTP server settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address.
    pub bind: String,
    /// Seconds of inactivity after which a session is discarded.
    pub session_idle_timeout_secs: u64,
    /// Maximum number of live sessions.
    pub max_sessions: usize,
}

impl ServerConfig {
    /// Session idle timeout.
    pub fn session_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.session_idle_timeout_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8501".to_string(),
            session_idle_timeout_secs: 1800,
            max_sessions: 1000,
        }
    }
}

// ── Logging config ──────────────────────────────────────────────

/// Logging settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    pub level: String,
    /// Directory for rotated JSON logs. Console only when unset.
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            dir: None,
        }
    }
}
