use std::collections::HashMap;
use std::sync::RwLock;

use kwatch_kube::ResourceRef;

#[cfg(test)]
#[path = "./dedup.tests.rs"]
mod dedup_tests;

/// Process-wide map from resource identity to the last successfully dispatched
/// resource version. Entries are never evicted; the working set is bounded by the
/// number of live resources.
#[derive(Default)]
pub struct DedupCache {
    seen: RwLock<HashMap<ResourceRef, String>>,
}

impl DedupCache {
    /// Creates new empty [`DedupCache`] instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if `resource_version` is the recorded version for `resource`.
    pub fn seen(&self, resource: &ResourceRef, resource_version: &str) -> bool {
        self.seen
            .read()
            .is_ok_and(|map| map.get(resource).is_some_and(|version| version == resource_version))
    }

    /// Records a successful dispatch, replacing any previously recorded version.
    pub fn mark(&self, resource: &ResourceRef, resource_version: &str) {
        if let Ok(mut map) = self.seen.write() {
            map.insert(resource.clone(), resource_version.to_owned());
        }
    }
}
