use std::hash::{DefaultHasher, Hash, Hasher};

use super::WatchedKind;

#[cfg(test)]
#[path = "./resource_ref.tests.rs"]
mod resource_ref_tests;

/// Identity of a watched Kubernetes object.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceRef {
    pub kind: WatchedKind,
    pub namespace: String,
    pub name: String,
}

impl ResourceRef {
    /// Creates new [`ResourceRef`] instance.
    pub fn new(kind: WatchedKind, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind,
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Maps this reference to one of `shards` buckets.\
    /// Stable within a process, which keeps per-resource event ordering on one worker.
    pub fn shard(&self, shards: usize) -> usize {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        (hasher.finish() % shards.max(1) as u64) as usize
    }
}

impl std::fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.kind, self.namespace, self.name)
    }
}
