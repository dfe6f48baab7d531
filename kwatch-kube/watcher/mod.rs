use std::time::Duration;

pub use self::observer::{BgWatcher, BgWatcherError};
pub use self::result::{EventAction, NormalizedEvent, WatchNotice, WatchNoticeReceiver, WatchNoticeSender};
pub use self::state::WatcherState;

mod client;
mod list;
mod observer;
mod result;
mod state;
mod utils;
mod watch;

/// Event acquisition strategy for a background watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchMode {
    /// Long-poll watch stream with resume tokens.
    Stream,

    /// Periodic list with a local diff.
    Poll,
}

/// Engine tuning shared by both watch modes.
#[derive(Debug, Clone, Copy)]
pub struct WatchTuning {
    /// Server-side inactivity bound for one watch request; also the poll interval.
    pub server_timeout: Duration,

    /// Base sleep after a failed API call.
    pub error_throttle: Duration,
}
