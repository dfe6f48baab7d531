use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::ConfigError;

#[cfg(test)]
#[path = "./rules.tests.rs"]
mod rules_tests;

/// Operator-declared trigger: a resource is synced when one of its labels matches
/// a rule's key and value exactly.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct LabelRule {
    /// Label key.
    pub name: String,

    /// Label value; compared byte for byte.
    pub value: String,

    /// Webhook fired after the resource is materialized.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<RequestSpec>,

    /// Local command run after the resource is materialized.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<ScriptSpec>,
}

impl LabelRule {
    /// Returns `true` if the label map contains this rule's key with exactly this rule's value.
    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        labels.get(&self.name).is_some_and(|value| *value == self.value)
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.name.is_empty() {
            return Err(ConfigError::Invalid("label rule name must not be empty".into()));
        }

        if let Some(request) = &self.request {
            request.validate(&self.name)?;
        }

        if let Some(script) = &self.script {
            script.validate(&self.name)?;
        }

        Ok(())
    }
}

/// Returns all rules matched by the given label map, in configuration order.
pub fn matching_rules<'a>(rules: &'a [LabelRule], labels: &BTreeMap<String, String>) -> Vec<&'a LabelRule> {
    rules.iter().filter(|rule| rule.matches(labels)).collect()
}

/// How to notify a consumer over HTTP.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RequestSpec {
    pub url: String,

    #[serde(default)]
    pub method: RequestMethod,

    /// Per-attempt bound covering connect and read, in seconds.
    #[serde(default = "default_request_timeout")]
    pub timeout: u64,

    /// Disable certificate verification for this rule's requests.
    #[serde(default, rename = "skipTLSVerify")]
    pub skip_tls_verify: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthSpec>,

    #[serde(default)]
    pub retry: RetrySpec,

    /// Also fire for deletion events.
    #[serde(default)]
    pub on_delete: bool,
}

impl RequestSpec {
    fn validate(&self, rule: &str) -> Result<(), ConfigError> {
        if self.url.is_empty() {
            return Err(ConfigError::Invalid(format!("request url for rule '{rule}' must not be empty")));
        }
        if self.timeout == 0 {
            return Err(ConfigError::Invalid(format!("request timeout for rule '{rule}' must be positive")));
        }
        if self.retry.total == 0 {
            return Err(ConfigError::Invalid(format!("retry total for rule '{rule}' must be positive")));
        }
        if !self.retry.backoff_factor.is_finite() || self.retry.backoff_factor < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "retry backoffFactor for rule '{rule}' must be a non-negative number"
            )));
        }

        Ok(())
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Default, Debug, PartialEq)]
pub enum RequestMethod {
    #[default]
    #[serde(rename = "GET")]
    Get,
    #[serde(rename = "POST")]
    Post,
    #[serde(rename = "PUT")]
    Put,
    #[serde(rename = "PATCH")]
    Patch,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct AuthSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub basic: Option<BasicAuth>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

/// Webhook retry policy: at most `total` attempts, attempt `n` delayed by
/// `backoff_factor * 2^(n-1)` seconds.
#[derive(Serialize, Deserialize, Clone, Copy, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RetrySpec {
    #[serde(default = "default_retry_total")]
    pub total: u32,

    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,
}

impl Default for RetrySpec {
    fn default() -> Self {
        Self {
            total: default_retry_total(),
            backoff_factor: default_backoff_factor(),
        }
    }
}

/// Local reload command run with `sh -c` after a successful write.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ScriptSpec {
    pub command: String,

    /// Seconds before the child process is killed.
    #[serde(default = "default_script_timeout")]
    pub timeout: u64,
}

impl ScriptSpec {
    fn validate(&self, rule: &str) -> Result<(), ConfigError> {
        if self.command.is_empty() {
            return Err(ConfigError::Invalid(format!("script command for rule '{rule}' must not be empty")));
        }
        if self.timeout == 0 {
            return Err(ConfigError::Invalid(format!("script timeout for rule '{rule}' must be positive")));
        }

        Ok(())
    }
}

fn default_request_timeout() -> u64 {
    10
}

fn default_retry_total() -> u32 {
    1
}

fn default_backoff_factor() -> f64 {
    1.0
}

fn default_script_timeout() -> u64 {
    60
}
