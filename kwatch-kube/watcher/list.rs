use kube::ResourceExt;
use kube::api::{DynamicObject, ListParams};
use kwatch_common::ThrottleBackoff;
use std::collections::HashMap;
use std::sync::atomic::Ordering;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

use crate::core::{ResourcePayload, ResourceRef};
use crate::watcher::result::{EventAction, NormalizedEvent, WatchNotice};
use crate::watcher::state::WatcherState;
use crate::watcher::utils::{AuthFailureTracker, is_auth_client_error, object_ref};
use crate::watcher::watch::WatchInput;

#[cfg(test)]
#[path = "./list.tests.rs"]
mod list_tests;

/// Runs the poll loop for one kind until cancelled: a full list every `server_timeout`,
/// diffed against the previous listing to recover add/modify/delete events.
pub async fn list(input: WatchInput, cancellation_token: CancellationToken) {
    let kind = input.client.kind();
    let mut throttle = ThrottleBackoff::new(input.tuning.error_throttle);
    let mut auth_failures = AuthFailureTracker::default();
    let mut snapshot: HashMap<ResourceRef, String> = HashMap::new();
    let mut ready = false;

    input.state.store(WatcherState::Connecting.into(), Ordering::Relaxed);

    while !cancellation_token.is_cancelled() {
        match input.client.api().list(&ListParams::default()).await {
            Ok(objects) => {
                throttle.reset();
                auth_failures.reset();

                let mut listed: HashMap<ResourceRef, DynamicObject> = HashMap::new();
                let mut current: HashMap<ResourceRef, String> = HashMap::new();
                for object in objects {
                    let Some(resource) = object_ref(kind, &object) else {
                        continue;
                    };
                    current.insert(resource.clone(), object.resource_version().unwrap_or_default());
                    listed.insert(resource, object);
                }

                for (resource, resource_version, action) in diff_snapshot(&snapshot, &current) {
                    let payload = match action {
                        EventAction::Deleted => None,
                        _ => match listed.get(&resource).map(|object| ResourcePayload::decode(kind, object)) {
                            Some(Ok(payload)) => Some(payload),
                            Some(Err(error)) => {
                                error!("Cannot decode payload of {}: {}", resource, error);
                                continue;
                            },
                            None => continue,
                        },
                    };

                    let event = NormalizedEvent {
                        resource,
                        resource_version,
                        action,
                        payload,
                    };
                    if input.notices_tx.send(WatchNotice::Event(Box::new(event))).await.is_err() {
                        return; // pipeline is gone
                    }
                }

                snapshot = current;
                input.state.store(WatcherState::Ready.into(), Ordering::Relaxed);
                if !ready {
                    ready = true;
                    if input.notices_tx.send(WatchNotice::Ready(kind)).await.is_err() {
                        return;
                    }
                }
            },
            Err(error) => {
                if is_auth_client_error(&error) && auth_failures.record() {
                    error!("List {}: giving up after repeated authentication failures", kind);
                    let _ = input
                        .notices_tx
                        .send(WatchNotice::Fatal(format!("list {kind}: {error}")))
                        .await;
                    return;
                }

                warn!("Cannot list {}: {}", kind, error);

                let delay = throttle.next_delay();
                tokio::select! {
                    () = cancellation_token.cancelled() => return,
                    () = tokio::time::sleep(delay) => (),
                }
                continue;
            },
        }

        tokio::select! {
            () = cancellation_token.cancelled() => (),
            () = tokio::time::sleep(input.tuning.server_timeout) => (),
        }
    }
}

/// Classifies the current listing against the previous snapshot.\
/// Unchanged resource versions produce no event.
fn diff_snapshot(
    previous: &HashMap<ResourceRef, String>,
    current: &HashMap<ResourceRef, String>,
) -> Vec<(ResourceRef, String, EventAction)> {
    let mut changes = Vec::new();

    for (resource, resource_version) in current {
        match previous.get(resource) {
            None => changes.push((resource.clone(), resource_version.clone(), EventAction::Added)),
            Some(previous_version) if previous_version != resource_version => {
                changes.push((resource.clone(), resource_version.clone(), EventAction::Modified));
            },
            Some(_) => (),
        }
    }

    for (resource, resource_version) in previous {
        if !current.contains_key(resource) {
            changes.push((resource.clone(), resource_version.clone(), EventAction::Deleted));
        }
    }

    changes
}
