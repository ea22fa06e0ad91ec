//! Configuration loading for sioscope.
//!
//! Configuration is a YAML file with three sections: `transport`, `logging`
//! and `builders`. Every field has a default, so an empty file (or no file at
//! all) yields a usable configuration.

use crate::builder::{MessageBuilderTemplate, bundled_builders};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SioscopeConfig {
    #[serde(default)]
    pub transport: TransportConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Extra builder templates, appended after the bundled ones.
    #[serde(default)]
    pub builders: Vec<BuilderConfig>,
}

impl SioscopeConfig {
    /// Loads configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        debug!(path = %path_ref.display(), "Loading configuration from file");
        let content = std::fs::read_to_string(path_ref)?;
        let config = Self::parse_yaml(&content)?;
        debug!(
            url = %config.transport.url,
            builders = config.builders.len(),
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Parses configuration from YAML text. Empty text yields the defaults.
    pub fn parse_yaml(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Validates the configuration.
    ///
    /// Returns warnings for questionable settings and an error for settings
    /// the console cannot run with.
    pub fn validate(&self) -> Result<Vec<ConfigWarning>, ConfigError> {
        let mut warnings = Vec::new();

        let url = self.transport.url.as_str();
        let scheme = url.split_once("://").map(|(scheme, _)| scheme.to_ascii_lowercase());
        if !matches!(scheme.as_deref(), Some("ws" | "wss")) {
            return Err(ConfigError::InvalidUrl {
                url: url.to_string(),
            });
        }

        if self.transport.connect_timeout_secs == 0 {
            warnings.push(ConfigWarning::InvalidValue {
                field: "transport.connect_timeout_secs".to_string(),
                message: "0 disables the connect timeout".to_string(),
            });
        }
        if self.transport.send_timeout_secs == 0 {
            warnings.push(ConfigWarning::InvalidValue {
                field: "transport.send_timeout_secs".to_string(),
                message: "0 disables the send timeout".to_string(),
            });
        }

        let bundled: HashSet<String> = bundled_builders()
            .into_iter()
            .map(|t| t.event_name)
            .collect();
        let mut seen = HashSet::new();
        for (index, builder) in self.builders.iter().enumerate() {
            if builder.event.trim().is_empty() {
                return Err(ConfigError::EmptyBuilderName { index });
            }
            if !seen.insert(builder.event.as_str()) {
                return Err(ConfigError::DuplicateBuilder {
                    name: builder.event.clone(),
                });
            }
            if bundled.contains(&builder.event) {
                warnings.push(ConfigWarning::OverridesBundled {
                    builder: builder.event.clone(),
                });
            }
        }

        Ok(warnings)
    }

    /// Config-declared builders as templates, in file order.
    pub fn builder_templates(&self) -> Vec<MessageBuilderTemplate> {
        self.builders
            .iter()
            .map(|b| MessageBuilderTemplate::new(b.event.clone(), b.fields.clone()))
            .collect()
    }
}

/// WebSocket transport settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Endpoint to connect to. Must use `ws` or `wss`.
    #[serde(default = "default_url")]
    pub url: String,

    /// Extra headers sent with the handshake.
    #[serde(default)]
    pub headers: IndexMap<String, String>,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_send_timeout")]
    pub send_timeout_secs: u64,
}

fn default_url() -> String {
    "ws://127.0.0.1:3080/ws".to_string()
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_send_timeout() -> u64 {
    10
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            headers: IndexMap::new(),
            connect_timeout_secs: default_connect_timeout(),
            send_timeout_secs: default_send_timeout(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    #[serde(default = "default_level")]
    pub level: String,

    /// Log file used while the TUI owns the terminal.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "sioscope.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            file: default_log_file(),
        }
    }
}

/// A builder template declared in the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuilderConfig {
    pub event: String,

    /// Field defaults. Scalar YAML values are kept as their text.
    #[serde(default, deserialize_with = "scalar_fields")]
    pub fields: IndexMap<String, String>,
}

fn scalar_fields<'de, D>(deserializer: D) -> Result<IndexMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error as _;
    use serde_yaml::Value;

    let raw = IndexMap::<String, Value>::deserialize(deserializer)?;
    raw.into_iter()
        .map(|(name, value)| {
            let text = match value {
                Value::Null => String::new(),
                Value::Bool(b) => b.to_string(),
                Value::Number(n) => n.to_string(),
                Value::String(s) => s,
                _ => {
                    return Err(D::Error::custom(format!(
                        "field {name}: default must be a scalar"
                    )));
                }
            };
            Ok((name, text))
        })
        .collect()
}

/// Configuration warnings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    /// A config builder replaces a bundled definition.
    OverridesBundled { builder: String },
    /// Field has a questionable value.
    InvalidValue { field: String, message: String },
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigWarning::OverridesBundled { builder } => {
                write!(f, "Warning [builders.{builder}]: replaces the bundled builder")
            }
            ConfigWarning::InvalidValue { field, message } => {
                write!(f, "Warning [{field}]: {message}")
            }
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("transport.url must use ws:// or wss://, got '{url}'")]
    InvalidUrl { url: String },

    #[error("builder '{name}' is declared more than once")]
    DuplicateBuilder { name: String },

    #[error("builders[{index}] has an empty event name")]
    EmptyBuilderName { index: usize },
}
