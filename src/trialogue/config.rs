//! Configuration for Trialogue.
//!
//! [`TrialogueConfig`] is a plain struct: construct it by hand, start from
//! [`TrialogueConfig::default`], or read it from the process environment with
//! [`TrialogueConfig::from_env`]. [`TrialogueConfig::load`] first merges a `.env` file into the
//! environment; variables already set in the process take precedence over the file.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `TRIALOGUE_BIND_ADDR` | `0.0.0.0:3000` |
//! | `ANTHROPIC_API_KEY` | unset |
//! | `DEEPSEEK_API_KEY` | unset |
//! | `TRIALOGUE_CLAUDE_MODEL` | `claude-sonnet-4-20250514` |
//! | `TRIALOGUE_DEEPSEEK_MODEL` | `deepseek-chat` |
//! | `ANTHROPIC_BASE_URL` | `https://api.anthropic.com` |
//! | `DEEPSEEK_BASE_URL` | `https://api.deepseek.com` |
//! | `TRIALOGUE_BACKEND_TIMEOUT_SECS` | `120` |
//! | `TRIALOGUE_CONVERSATION_TTL_SECS` | unset (conversations never expire) |
//! | `TRIALOGUE_SNAPSHOT_DIR` | `conversations` |
//! | `TRIALOGUE_FAILURE_POLICY` | `agent-turn` (or `system-notice`) |
//!
//! ```rust
//! use trialogue::TrialogueConfig;
//! use std::time::Duration;
//!
//! let config = TrialogueConfig {
//!     backend_timeout: Duration::from_secs(30),
//!     ..TrialogueConfig::default()
//! };
//! assert!(config.anthropic_api_key.is_none());
//! ```

use crate::clients::{claude, deepseek};
use crate::orchestrator::BackendFailurePolicy;
use std::error::Error;
use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Invalid value found while reading the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidValue { variable: String, value: String },
    /// A `.env` file exists but could not be read or parsed.
    InvalidDotenv { path: String, reason: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidValue { variable, value } => {
                write!(f, "Invalid value for {}: {:?}", variable, value)
            }
            ConfigError::InvalidDotenv { path, reason } => {
                write!(f, "Invalid dotenv file {}: {}", path, reason)
            }
        }
    }
}

impl Error for ConfigError {}

/// Process-wide settings for the orchestrator, its backends and the HTTP server.
#[derive(Clone)]
pub struct TrialogueConfig {
    /// Address the HTTP server binds to.
    pub bind_addr: SocketAddr,
    pub anthropic_api_key: Option<String>,
    pub deepseek_api_key: Option<String>,
    pub claude_model: String,
    pub deepseek_model: String,
    pub anthropic_base_url: String,
    pub deepseek_base_url: String,
    /// Upper bound for a single backend call; elapsing counts as a backend failure.
    pub backend_timeout: Duration,
    /// Idle time after which a conversation is evicted. `None` keeps conversations forever.
    pub conversation_ttl: Option<Duration>,
    /// Directory for conversation snapshot files.
    pub snapshot_dir: PathBuf,
    pub failure_policy: BackendFailurePolicy,
}

impl Default for TrialogueConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            anthropic_api_key: None,
            deepseek_api_key: None,
            claude_model: claude::model_to_string(claude::Model::ClaudeSonnet4),
            deepseek_model: deepseek::model_to_string(deepseek::Model::DeepSeekChat),
            anthropic_base_url: claude::DEFAULT_BASE_URL.to_string(),
            deepseek_base_url: deepseek::DEFAULT_BASE_URL.to_string(),
            backend_timeout: Duration::from_secs(120),
            conversation_ttl: None,
            snapshot_dir: PathBuf::from("conversations"),
            failure_policy: BackendFailurePolicy::AgentTurn,
        }
    }
}

impl fmt::Debug for TrialogueConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |key: &Option<String>| key.as_ref().map(|_| "<redacted>");
        f.debug_struct("TrialogueConfig")
            .field("bind_addr", &self.bind_addr)
            .field("anthropic_api_key", &redact(&self.anthropic_api_key))
            .field("deepseek_api_key", &redact(&self.deepseek_api_key))
            .field("claude_model", &self.claude_model)
            .field("deepseek_model", &self.deepseek_model)
            .field("anthropic_base_url", &self.anthropic_base_url)
            .field("deepseek_base_url", &self.deepseek_base_url)
            .field("backend_timeout", &self.backend_timeout)
            .field("conversation_ttl", &self.conversation_ttl)
            .field("snapshot_dir", &self.snapshot_dir)
            .field("failure_policy", &self.failure_policy)
            .finish()
    }
}

impl TrialogueConfig {
    /// Load `.env` from the working directory (or a parent) into the process environment, then
    /// read the environment. A missing `.env` is not an error.
    pub fn load() -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(_) => {}
            Err(err) if err.not_found() => {}
            Err(err) => return Err(dotenv_error(".env", err)),
        }
        Self::from_env()
    }

    /// Like [`TrialogueConfig::load`] with an explicit dotenv file.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        match dotenvy::from_path(path) {
            Ok(()) => {}
            Err(err) if err.not_found() => {}
            Err(err) => return Err(dotenv_error(&path.display().to_string(), err)),
        }
        Self::from_env()
    }

    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable lookup. Unset and blank variables
    /// keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let mut config = Self::default();

        if let Some(value) = get("TRIALOGUE_BIND_ADDR") {
            config.bind_addr = parse_value("TRIALOGUE_BIND_ADDR", &value)?;
        }
        config.anthropic_api_key = get("ANTHROPIC_API_KEY");
        config.deepseek_api_key = get("DEEPSEEK_API_KEY");
        if let Some(value) = get("TRIALOGUE_CLAUDE_MODEL") {
            config.claude_model = value;
        }
        if let Some(value) = get("TRIALOGUE_DEEPSEEK_MODEL") {
            config.deepseek_model = value;
        }
        if let Some(value) = get("ANTHROPIC_BASE_URL") {
            config.anthropic_base_url = value;
        }
        if let Some(value) = get("DEEPSEEK_BASE_URL") {
            config.deepseek_base_url = value;
        }
        if let Some(value) = get("TRIALOGUE_BACKEND_TIMEOUT_SECS") {
            let secs: u64 = parse_value("TRIALOGUE_BACKEND_TIMEOUT_SECS", &value)?;
            if secs == 0 {
                return Err(invalid("TRIALOGUE_BACKEND_TIMEOUT_SECS", &value));
            }
            config.backend_timeout = Duration::from_secs(secs);
        }
        if let Some(value) = get("TRIALOGUE_CONVERSATION_TTL_SECS") {
            let secs: u64 = parse_value("TRIALOGUE_CONVERSATION_TTL_SECS", &value)?;
            config.conversation_ttl = if secs == 0 {
                None
            } else {
                Some(Duration::from_secs(secs))
            };
        }
        if let Some(value) = get("TRIALOGUE_SNAPSHOT_DIR") {
            config.snapshot_dir = PathBuf::from(value);
        }
        if let Some(value) = get("TRIALOGUE_FAILURE_POLICY") {
            config.failure_policy = value
                .parse()
                .map_err(|_| invalid("TRIALOGUE_FAILURE_POLICY", &value))?;
        }

        Ok(config)
    }
}

fn dotenv_error(path: &str, err: dotenvy::Error) -> ConfigError {
    ConfigError::InvalidDotenv {
        path: path.to_string(),
        reason: err.to_string(),
    }
}

fn invalid(variable: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        variable: variable.to_string(),
        value: value.to_string(),
    }
}

fn parse_value<T: std::str::FromStr>(variable: &str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| invalid(variable, value))
}
