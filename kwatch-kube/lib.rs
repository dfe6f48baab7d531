pub use self::client::{ClientError, new_client};
pub use self::core::{CONFIG_MAPS, PayloadError, ResourcePayload, ResourceRef, SECRETS, WatchedKind};
pub use self::watcher::{
    BgWatcher, BgWatcherError, EventAction, NormalizedEvent, WatchMode, WatchNotice, WatchNoticeReceiver, WatchNoticeSender,
    WatchTuning, WatcherState,
};

mod client;
mod core;
mod watcher;
