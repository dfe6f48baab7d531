use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use kube::api::ApiResource;

#[cfg(test)]
#[path = "./kind.tests.rs"]
mod kind_tests;

pub const CONFIG_MAPS: &str = "configmaps";
pub const SECRETS: &str = "secrets";

/// Resource kind the watcher can observe.\
/// Each variant knows how to address its collection and how its payload is encoded on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatchedKind {
    ConfigMaps,
    Secrets,
}

impl WatchedKind {
    /// Returns the [`ApiResource`] used to build a dynamic API for this kind.
    pub fn api_resource(self) -> ApiResource {
        match self {
            WatchedKind::ConfigMaps => ApiResource::erase::<ConfigMap>(&()),
            WatchedKind::Secrets => ApiResource::erase::<Secret>(&()),
        }
    }

    /// Returns the singular `PascalCase` kind name.
    pub fn kind_name(self) -> &'static str {
        match self {
            WatchedKind::ConfigMaps => "ConfigMap",
            WatchedKind::Secrets => "Secret",
        }
    }

    /// Returns the plural lowercase collection name.
    pub fn as_str(self) -> &'static str {
        match self {
            WatchedKind::ConfigMaps => CONFIG_MAPS,
            WatchedKind::Secrets => SECRETS,
        }
    }
}

impl std::fmt::Display for WatchedKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
