use futures::{StreamExt, TryStreamExt};
use kube::ResourceExt;
use kube::api::DynamicObject;
use kube::runtime::watcher::{self, Event, watcher};
use kwatch_common::ThrottleBackoff;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

use crate::core::{ResourcePayload, ResourceRef, WatchedKind};
use crate::watcher::client::KindClient;
use crate::watcher::result::{EventAction, NormalizedEvent, WatchNotice, WatchNoticeSender};
use crate::watcher::state::WatcherState;
use crate::watcher::utils::{AuthFailureTracker, is_auth_error, object_ref};
use crate::watcher::WatchTuning;

pub struct WatchInput {
    pub client: KindClient,
    pub tuning: WatchTuning,
    pub notices_tx: WatchNoticeSender,
    pub state: Arc<AtomicU8>,
}

/// Runs the long-poll watch loop for one kind until cancelled.\
/// The underlying stream resumes from the last seen resource version and re-lists on
/// a rejected resume token, surfacing every listed item as a synthetic add.
pub async fn watch(input: WatchInput, cancellation_token: CancellationToken) {
    let kind = input.client.kind();
    let mut processor = EventsProcessor::new(kind, input.notices_tx.clone(), Arc::clone(&input.state));
    let mut throttle = ThrottleBackoff::new(input.tuning.error_throttle);
    let mut auth_failures = AuthFailureTracker::default();

    while !cancellation_token.is_cancelled() {
        input.state.store(WatcherState::Connecting.into(), Ordering::Relaxed);

        let config = watcher::Config::default().timeout(input.tuning.server_timeout.as_secs().min(u32::MAX.into()) as u32);
        let mut stream = watcher(input.client.api(), config).boxed();

        loop {
            tokio::select! {
                () = cancellation_token.cancelled() => return,
                result = stream.try_next() => match result {
                    Ok(Some(event)) => {
                        // Init is also emitted right after an error forced a re-list.
                        if !matches!(event, Event::Init) {
                            throttle.reset();
                            auth_failures.reset();
                        }

                        if processor.process(event).await.is_err() {
                            return; // pipeline is gone
                        }
                    },
                    Ok(None) => break, // stream closed; reconnect with a fresh one
                    Err(error) => {
                        if is_auth_error(&error) && auth_failures.record() {
                            error!("Watch {}: giving up after repeated authentication failures", kind);
                            let _ = input
                                .notices_tx
                                .send(WatchNotice::Fatal(format!("watch {kind}: {error}")))
                                .await;
                            return;
                        }

                        warn!("Watch {}: {}", kind, error);

                        let delay = throttle.next_delay();
                        tokio::select! {
                            () = cancellation_token.cancelled() => return,
                            () = tokio::time::sleep(delay) => (),
                        }
                    },
                },
            }
        }
    }
}

/// Internal watcher's events processor.\
/// Tracks which refs are live so apply events can be split into adds and modifications.
struct EventsProcessor {
    kind: WatchedKind,
    notices_tx: WatchNoticeSender,
    state: Arc<AtomicU8>,
    known: HashSet<ResourceRef>,
    incoming: HashSet<ResourceRef>,
}

impl EventsProcessor {
    fn new(kind: WatchedKind, notices_tx: WatchNoticeSender, state: Arc<AtomicU8>) -> Self {
        Self {
            kind,
            notices_tx,
            state,
            known: HashSet::new(),
            incoming: HashSet::new(),
        }
    }

    /// Processes one event from the kubernetes watcher stream.\
    /// Fails only when the receiving side of the pipeline is closed.
    async fn process(&mut self, event: Event<DynamicObject>) -> Result<(), ()> {
        match event {
            Event::Init => {
                self.state.store(WatcherState::Syncing.into(), Ordering::Relaxed);
                self.incoming.clear();
            },
            Event::InitApply(object) => {
                if let Some(event) = self.normalize(&object, EventAction::Added) {
                    self.incoming.insert(event.resource.clone());
                    self.send(event).await?;
                }
            },
            Event::InitDone => {
                self.known = std::mem::take(&mut self.incoming);
                self.state.store(WatcherState::Ready.into(), Ordering::Relaxed);
                self.notices_tx.send(WatchNotice::Ready(self.kind)).await.map_err(|_| ())?;
            },
            Event::Apply(object) => {
                let Some(resource) = object_ref(self.kind, &object) else {
                    return Ok(());
                };

                let action = if self.known.insert(resource) {
                    EventAction::Added
                } else {
                    EventAction::Modified
                };

                if let Some(event) = self.normalize(&object, action) {
                    self.send(event).await?;
                }
            },
            Event::Delete(object) => {
                let Some(resource) = object_ref(self.kind, &object) else {
                    return Ok(());
                };

                self.known.remove(&resource);
                // the final object is kept so deletion rules can still match its labels
                if let Some(event) = self.normalize(&object, EventAction::Deleted) {
                    self.send(event).await?;
                }
            },
        }

        Ok(())
    }

    fn normalize(&self, object: &DynamicObject, action: EventAction) -> Option<NormalizedEvent> {
        let resource = object_ref(self.kind, object)?;
        match ResourcePayload::decode(self.kind, object) {
            Ok(payload) => Some(NormalizedEvent {
                resource,
                resource_version: object.resource_version().unwrap_or_default(),
                action,
                payload: Some(payload),
            }),
            Err(error) => {
                error!("Cannot decode payload of {}: {}", resource, error);
                None
            },
        }
    }

    async fn send(&self, event: NormalizedEvent) -> Result<(), ()> {
        self.notices_tx.send(WatchNotice::Event(Box::new(event))).await.map_err(|_| ())
    }
}
