use kwatch_config::{LabelRule, OutputConfig, matching_rules};
use kwatch_kube::{EventAction, NormalizedEvent};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::dedup::DedupCache;
use crate::notifier::{Notifier, NotifyJob};
use crate::script::run_script;
use crate::sink;

#[cfg(test)]
#[path = "./dispatcher.tests.rs"]
mod dispatcher_tests;

pub const DEFAULT_DISPATCH_WORKERS: usize = 4;

const WORKER_QUEUE_SIZE: usize = 64;

/// Everything a dispatcher worker needs to turn an event into side effects.
pub struct DispatcherContext {
    pub rules: Vec<LabelRule>,
    pub output: OutputConfig,
    pub file_mode: u32,
    pub ignore_processed: bool,
    pub dedup: DedupCache,
    pub notifier: Notifier,
}

/// Sharded worker pool turning normalized events into filesystem and webhook side effects.\
/// Events for the same resource always land on the same worker, which keeps their
/// file writes ordered; no ordering is promised across resources.
pub struct Dispatcher {
    workers_tx: Vec<mpsc::Sender<Box<NormalizedEvent>>>,
    tasks: Vec<JoinHandle<()>>,
}

impl Dispatcher {
    /// Spawns `workers` dispatcher tasks sharing `context`.
    pub fn start(context: Arc<DispatcherContext>, workers: usize) -> Self {
        let workers = workers.max(1);
        let mut workers_tx = Vec::with_capacity(workers);
        let mut tasks = Vec::with_capacity(workers);

        for _ in 0..workers {
            let (tx, rx) = mpsc::channel(WORKER_QUEUE_SIZE);
            tasks.push(tokio::spawn(worker_loop(Arc::clone(&context), rx)));
            workers_tx.push(tx);
        }

        Self { workers_tx, tasks }
    }

    /// Routes one event to its shard.
    pub async fn dispatch(&self, event: Box<NormalizedEvent>) {
        let shard = event.resource.shard(self.workers_tx.len());
        let _ = self.workers_tx[shard].send(event).await;
    }

    /// Closes the shard queues and waits until every worker has drained its backlog.
    pub async fn stop(self) {
        drop(self.workers_tx);
        for task in self.tasks {
            let _ = task.await;
        }
    }
}

async fn worker_loop(context: Arc<DispatcherContext>, mut events_rx: mpsc::Receiver<Box<NormalizedEvent>>) {
    while let Some(event) = events_rx.recv().await {
        process_event(&context, &event).await;
    }
}

/// Applies one event: resolve rules, write files, mark, fan out notifications.
async fn process_event(context: &DispatcherContext, event: &NormalizedEvent) {
    let Some(payload) = &event.payload else {
        if event.action == EventAction::Deleted {
            info!("Resource {} deleted; its files are kept", event.resource);
        }
        return;
    };

    let matched = matching_rules(&context.rules, &payload.labels);
    if matched.is_empty() {
        debug!("Resource {} matches no label rule", event.resource);
        return;
    }

    if event.action == EventAction::Deleted {
        // files are never removed; a deletion only notifies rules that opted in
        info!("Resource {} deleted; its files are kept", event.resource);
        notify_rules(context, event, &matched, true).await;
        return;
    }

    if context.ignore_processed && context.dedup.seen(&event.resource, &event.resource_version) {
        debug!(
            "Skipping {} at version {}: already processed",
            event.resource, event.resource_version
        );
        return;
    }

    info!(version = %event.resource_version, event = %event.action, "Processing resource {}", event.resource);

    let target = resolve_target_dir(&context.output, event);
    let files = file_batch(&context.output, event);
    if let Err(error) = sink::write_files(&target, &files, context.file_mode).await {
        // no mark, so the next event for this version gets another chance
        error!("Cannot write files for {}: {}", event.resource, error);
        return;
    }

    context.dedup.mark(&event.resource, &event.resource_version);

    notify_rules(context, event, &matched, false).await;
}

async fn notify_rules(context: &DispatcherContext, event: &NormalizedEvent, matched: &[&LabelRule], deletion: bool) {
    for rule in matched {
        if let Some(request) = &rule.request
            && (!deletion || request.on_delete)
        {
            context.notifier.dispatch(NotifyJob {
                resource: event.resource.clone(),
                resource_version: event.resource_version.clone(),
                action: event.action,
                rule: format!("{}={}", rule.name, rule.value),
                request: request.clone(),
            });
        }

        if !deletion && let Some(script) = &rule.script {
            run_script(script, &event.resource, event.action).await;
        }
    }
}

/// Resolves the directory receiving this event's files: the resource's folder
/// annotation names the exact consumer directory, otherwise the configured root
/// gains `<namespace>` and, unless filenames are unique, `<name>`.
fn resolve_target_dir(output: &OutputConfig, event: &NormalizedEvent) -> PathBuf {
    let annotation_dir = output
        .folder_annotation
        .as_ref()
        .and_then(|key| event.payload.as_ref()?.annotations.get(key))
        .map(PathBuf::from);

    match annotation_dir {
        Some(dir) => dir,
        None => {
            let mut dir = output.folder.join(&event.resource.namespace);
            if !output.unique_filenames {
                dir.push(&event.resource.name);
            }
            dir
        },
    }
}

/// Returns the batch to write, applying the `<name>-<key>` naming scheme when
/// unique filenames are requested.
fn file_batch(output: &OutputConfig, event: &NormalizedEvent) -> BTreeMap<String, Vec<u8>> {
    let Some(payload) = &event.payload else {
        return BTreeMap::new();
    };

    if output.unique_filenames {
        payload
            .files
            .iter()
            .map(|(key, bytes)| (format!("{}-{}", event.resource.name, key), bytes.clone()))
            .collect()
    } else {
        payload.files.clone()
    }
}
