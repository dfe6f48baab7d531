/// Background watcher connection state.
#[derive(Clone, Copy, PartialEq)]
pub enum WatcherState {
    Idle,
    Connecting,
    Syncing,
    Ready,
}

impl From<u8> for WatcherState {
    fn from(value: u8) -> Self {
        match value {
            1 => WatcherState::Connecting,
            2 => WatcherState::Syncing,
            3 => WatcherState::Ready,
            _ => WatcherState::Idle,
        }
    }
}

impl From<WatcherState> for u8 {
    fn from(value: WatcherState) -> Self {
        match value {
            WatcherState::Idle => 0,
            WatcherState::Connecting => 1,
            WatcherState::Syncing => 2,
            WatcherState::Ready => 3,
        }
    }
}
