use kube::Client;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::core::WatchedKind;
use crate::watcher::client::KindClient;
use crate::watcher::list::list;
use crate::watcher::result::WatchNoticeSender;
use crate::watcher::state::WatcherState;
use crate::watcher::watch::{WatchInput, watch};
use crate::watcher::{WatchMode, WatchTuning};

/// Possible errors from [`BgWatcher`].
#[derive(thiserror::Error, Debug)]
pub enum BgWatcherError {
    /// Watcher is already started
    #[error("watcher is already started")]
    AlreadyStarted,
}

/// Background watcher task for a single resource kind.
pub struct BgWatcher {
    kind: WatchedKind,
    task: Option<JoinHandle<()>>,
    cancellation_token: Option<CancellationToken>,
    state: Arc<AtomicU8>,
}

impl BgWatcher {
    /// Creates new [`BgWatcher`] instance.
    pub fn new(kind: WatchedKind) -> Self {
        Self {
            kind,
            task: None,
            cancellation_token: None,
            state: Arc::new(AtomicU8::new(WatcherState::Idle.into())),
        }
    }

    /// Starts new [`BgWatcher`] task emitting onto `notices_tx`.
    pub fn start(
        &mut self,
        client: Client,
        namespace: Option<String>,
        mode: WatchMode,
        tuning: WatchTuning,
        notices_tx: WatchNoticeSender,
    ) -> Result<(), BgWatcherError> {
        if self.cancellation_token.is_some() {
            return Err(BgWatcherError::AlreadyStarted);
        }

        self.state.store(WatcherState::Connecting.into(), Ordering::Relaxed);

        let cancellation_token = CancellationToken::new();
        let input = WatchInput {
            client: KindClient::new(client, self.kind, namespace),
            tuning,
            notices_tx,
            state: Arc::clone(&self.state),
        };

        let task = match mode {
            WatchMode::Stream => tokio::spawn(watch(input, cancellation_token.clone())),
            WatchMode::Poll => tokio::spawn(list(input, cancellation_token.clone())),
        };

        self.cancellation_token = Some(cancellation_token);
        self.task = Some(task);

        Ok(())
    }

    /// Returns the observed kind.
    pub fn kind(&self) -> WatchedKind {
        self.kind
    }

    /// Returns `true` if the watcher has received the initial list of resources.
    pub fn is_ready(&self) -> bool {
        WatcherState::from(self.state.load(Ordering::Relaxed)) == WatcherState::Ready
    }

    /// Requests task cancellation without waiting for it.
    pub fn cancel(&mut self) {
        if let Some(cancellation_token) = self.cancellation_token.take() {
            cancellation_token.cancel();
        }

        self.state.store(WatcherState::Idle.into(), Ordering::Relaxed);
    }

    /// Cancels the task and waits until it is finished.
    pub async fn stop(&mut self) {
        self.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for BgWatcher {
    fn drop(&mut self) {
        self.cancel();
    }
}
