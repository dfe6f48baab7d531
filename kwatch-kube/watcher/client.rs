use kube::api::{Api, ApiResource, DynamicObject};
use kube::Client;

use crate::core::WatchedKind;

/// Keeps the pieces needed to rebuild an [`Api`] for one watched kind.
pub struct KindClient {
    client: Client,
    ar: ApiResource,
    kind: WatchedKind,
    namespace: Option<String>,
}

impl KindClient {
    /// Creates new [`KindClient`] instance.\
    /// `namespace: None` addresses the collection across all namespaces.
    pub fn new(client: Client, kind: WatchedKind, namespace: Option<String>) -> Self {
        Self {
            client,
            ar: kind.api_resource(),
            kind,
            namespace,
        }
    }

    pub fn kind(&self) -> WatchedKind {
        self.kind
    }

    /// Returns a new [`Api`] object scoped to the configured namespace.
    pub fn api(&self) -> Api<DynamicObject> {
        match self.namespace.as_deref() {
            Some(ns) => Api::namespaced_with(self.client.clone(), ns, &self.ar),
            None => Api::all_with(self.client.clone(), &self.ar),
        }
    }
}
