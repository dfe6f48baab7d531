use tokio::sync::mpsc::{Receiver, Sender};

use crate::core::{ResourcePayload, ResourceRef, WatchedKind};

pub type WatchNoticeSender = Sender<WatchNotice>;
pub type WatchNoticeReceiver = Receiver<WatchNotice>;

/// What happened to a watched resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventAction {
    Added,
    Modified,
    Deleted,
}

impl EventAction {
    /// Returns the action name used in webhook bodies and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            EventAction::Added => "added",
            EventAction::Modified => "modified",
            EventAction::Deleted => "deleted",
        }
    }
}

impl std::fmt::Display for EventAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resource change normalized from the raw watch or list protocol.
#[derive(Debug)]
pub struct NormalizedEvent {
    pub resource: ResourceRef,
    pub resource_version: String,
    pub action: EventAction,

    /// Decoded content. Deletions observed through the watch stream still carry the
    /// final object; poll-mode deletions have `None`.
    pub payload: Option<ResourcePayload>,
}

/// Message from a background watcher to the event pipeline.
#[derive(Debug)]
pub enum WatchNotice {
    /// Normalized resource event.
    Event(Box<NormalizedEvent>),

    /// Initial listing for the kind is complete.
    Ready(WatchedKind),

    /// Watcher cannot continue and the process should exit.
    Fatal(String),
}
