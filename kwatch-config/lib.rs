pub use self::config::{
    APP_NAME, APP_VERSION, Config, ConfigError, KubernetesConfig, LogFormat, LogLevel, LoggingConfig, OutputConfig,
    ResourceType, ResourcesConfig, WatchMethod, WatchSettings,
};
pub use self::rules::{AuthSpec, BasicAuth, LabelRule, RequestMethod, RequestSpec, RetrySpec, ScriptSpec, matching_rules};

mod config;
mod rules;
