use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::AsyncReadExt;

use crate::rules::LabelRule;

#[cfg(test)]
#[path = "./config.tests.rs"]
mod config_tests;

pub const APP_NAME: &str = "kwatch";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

const MAX_FILE_MODE: u32 = 0o7777;

/// Possible errors from configuration loading.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// Cannot read the configuration file.
    #[error("cannot read configuration file")]
    IoError(#[from] std::io::Error),

    /// Cannot deserialize the configuration.
    #[error("cannot deserialize configuration")]
    SerializationError(#[from] serde_yaml::Error),

    /// Configuration was read but does not describe a runnable watcher.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Watcher configuration loaded once at startup.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Config {
    pub output: OutputConfig,

    #[serde(default)]
    pub kubernetes: KubernetesConfig,

    pub resources: ResourcesConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Loads and validates the configuration from a YAML file.
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut file = File::open(path).await?;

        let mut config_str = String::new();
        file.read_to_string(&mut config_str).await?;

        let config = serde_yaml::from_str::<Config>(&config_str)?;
        config.validate()?;

        Ok(config)
    }

    /// Checks invariants that serde alone cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.output.folder.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("output.folder must not be empty".into()));
        }

        self.output.file_mode()?;

        let watch = &self.resources.watch_config;
        if watch.server_timeout == 0 {
            return Err(ConfigError::Invalid("watchConfig.serverTimeout must be positive".into()));
        }
        if watch.client_timeout <= watch.server_timeout {
            return Err(ConfigError::Invalid(
                "watchConfig.clientTimeout must exceed watchConfig.serverTimeout".into(),
            ));
        }

        if self.resources.labels.is_empty() {
            return Err(ConfigError::Invalid("resources.labels must contain at least one rule".into()));
        }

        for rule in &self.resources.labels {
            rule.validate()?;
        }

        Ok(())
    }
}

/// Where and how resource payloads are written.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct OutputConfig {
    /// Default write root for materialized files.
    pub folder: PathBuf,

    /// Annotation key whose value replaces the per-resource target directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_annotation: Option<String>,

    /// Flat `<name>-<key>` naming instead of a `<name>/` directory per resource.
    #[serde(default)]
    pub unique_filenames: bool,

    #[serde(default = "default_file_mode")]
    pub default_file_mode: String,
}

impl OutputConfig {
    /// Parses `defaultFileMode` as an octal permission set.
    pub fn file_mode(&self) -> Result<u32, ConfigError> {
        u32::from_str_radix(&self.default_file_mode, 8)
            .ok()
            .filter(|mode| *mode <= MAX_FILE_MODE)
            .ok_or_else(|| ConfigError::Invalid(format!("output.defaultFileMode '{}' is not an octal mode", self.default_file_mode)))
    }
}

fn default_file_mode() -> String {
    "0644".to_owned()
}

/// Cluster scoping.
#[derive(Serialize, Deserialize, Clone, Default, Debug)]
pub struct KubernetesConfig {
    /// Namespace to watch; empty means all namespaces.
    #[serde(default)]
    pub namespace: String,
}

/// What to watch and how.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ResourcesConfig {
    #[serde(rename = "type", default)]
    pub kind: ResourceType,

    #[serde(default)]
    pub method: WatchMethod,

    #[serde(default)]
    pub watch_config: WatchSettings,

    pub labels: Vec<LabelRule>,
}

/// Resource kinds the watcher may observe.
#[derive(Serialize, Deserialize, Clone, Copy, Default, Debug, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    ConfigMap,
    Secret,
    #[default]
    Both,
}

/// Event acquisition strategy.
#[derive(Serialize, Deserialize, Clone, Copy, Default, Debug, PartialEq)]
pub enum WatchMethod {
    /// Long-poll watch streams with resume tokens.
    #[default]
    #[serde(rename = "WATCH")]
    Watch,

    /// Periodic list with a local diff.
    #[serde(rename = "SLEEP")]
    Sleep,
}

/// Watch stream tuning.
#[derive(Serialize, Deserialize, Clone, Copy, Debug)]
#[serde(rename_all = "camelCase")]
pub struct WatchSettings {
    /// Server-side inactivity bound for one watch request, in seconds.
    #[serde(default = "default_server_timeout")]
    pub server_timeout: u64,

    /// Client read deadline, in seconds; must exceed `server_timeout`.
    #[serde(default = "default_client_timeout")]
    pub client_timeout: u64,

    /// Base sleep after a watch error, in seconds.
    #[serde(default = "default_error_throttle_time")]
    pub error_throttle_time: u64,

    /// Skip events whose resource version was already dispatched.
    #[serde(default)]
    pub ignore_processed: bool,
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            server_timeout: default_server_timeout(),
            client_timeout: default_client_timeout(),
            error_throttle_time: default_error_throttle_time(),
            ignore_processed: false,
        }
    }
}

fn default_server_timeout() -> u64 {
    60
}

fn default_client_timeout() -> u64 {
    66
}

fn default_error_throttle_time() -> u64 {
    5
}

/// Log emission settings.
#[derive(Serialize, Deserialize, Clone, Copy, Default, Debug)]
pub struct LoggingConfig {
    #[serde(default)]
    pub level: LogLevel,

    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Serialize, Deserialize, Clone, Copy, Default, Debug, PartialEq)]
pub enum LogLevel {
    #[serde(rename = "DEBUG")]
    Debug,
    #[default]
    #[serde(rename = "INFO")]
    Info,
    #[serde(rename = "WARN")]
    Warn,
    #[serde(rename = "ERROR")]
    Error,
}

impl LogLevel {
    /// Returns the level as a tracing filter directive.
    pub fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Default, Debug, PartialEq)]
pub enum LogFormat {
    #[default]
    #[serde(rename = "LOGFMT")]
    Logfmt,
    #[serde(rename = "JSON")]
    Json,
}

impl LogFormat {
    pub fn is_json(self) -> bool {
        self == LogFormat::Json
    }
}
