use kube::api::DynamicObject;
use kube::runtime::watcher;
use std::time::{Duration, Instant};

use crate::core::{ResourceRef, WatchedKind};

#[cfg(test)]
#[path = "./utils.tests.rs"]
mod utils_tests;

/// Checks if the watcher error is an authentication or authorization rejection.
pub fn is_auth_error(error: &watcher::Error) -> bool {
    match error {
        watcher::Error::InitialListFailed(error)
        | watcher::Error::WatchStartFailed(error)
        | watcher::Error::WatchFailed(error) => is_auth_client_error(error),
        watcher::Error::WatchError(response) => response.code == 401 || response.code == 403,
        _ => false,
    }
}

/// Checks if the client error is an authentication or authorization rejection.
pub fn is_auth_client_error(error: &kube::Error) -> bool {
    match error {
        kube::Error::Api(response) => response.code == 401 || response.code == 403,
        kube::Error::Auth(_) => true,
        _ => false,
    }
}

/// Builds the [`ResourceRef`] identity of an observed object.
pub fn object_ref(kind: WatchedKind, object: &DynamicObject) -> Option<ResourceRef> {
    let name = object.metadata.name.clone()?;
    let namespace = object.metadata.namespace.clone().unwrap_or_default();
    Some(ResourceRef::new(kind, namespace, name))
}

/// Counts authentication failures; trips after three within a 60 second window.
#[derive(Default)]
pub struct AuthFailureTracker {
    window_start: Option<Instant>,
    failures: u32,
}

impl AuthFailureTracker {
    const WINDOW: Duration = Duration::from_secs(60);
    const LIMIT: u32 = 3;

    /// Records a failure and returns `true` when the in-window limit is reached.
    pub fn record(&mut self) -> bool {
        let now = Instant::now();
        match self.window_start {
            Some(start) if now.duration_since(start) <= Self::WINDOW => self.failures += 1,
            _ => {
                self.window_start = Some(now);
                self.failures = 1;
            },
        }

        self.failures >= Self::LIMIT
    }

    /// Clears the failure streak after a healthy response.
    pub fn reset(&mut self) {
        self.window_start = None;
        self.failures = 0;
    }
}
