use kwatch_common::RetrySchedule;
use kwatch_config::{RequestMethod, RequestSpec};
use kwatch_kube::{EventAction, ResourceRef};
use reqwest::StatusCode;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[cfg(test)]
#[path = "./notifier.tests.rs"]
mod notifier_tests;

pub const DEFAULT_NOTIFY_WORKERS: usize = 8;

/// One webhook delivery for a (resource event, label rule) pair.
#[derive(Clone)]
pub struct NotifyJob {
    pub resource: ResourceRef,
    pub resource_version: String,
    pub action: EventAction,

    /// Identity of the rule that fired, e.g. `app=test`. Deliveries are serialized
    /// per (resource, rule), so distinct rules for one resource run side by side.
    pub rule: String,

    pub request: RequestSpec,
}

/// Webhook delivery pool.\
/// Deliveries for distinct resources run in parallel up to the worker bound; a newer
/// event for the same resource preempts an in-flight retry loop for the older one.
pub struct Notifier {
    permits: Arc<Semaphore>,
    in_flight: Arc<Mutex<HashMap<(ResourceRef, String), (u64, CancellationToken)>>>,
    next_id: AtomicU64,
    shutdown: CancellationToken,
}

impl Notifier {
    /// Creates new [`Notifier`] instance whose deliveries stop when `shutdown` is cancelled.
    pub fn new(shutdown: CancellationToken) -> Self {
        Self::with_workers(shutdown, DEFAULT_NOTIFY_WORKERS)
    }

    /// Creates new [`Notifier`] instance with a custom concurrency bound.
    pub fn with_workers(shutdown: CancellationToken, workers: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(workers.max(1))),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(0),
            shutdown,
        }
    }

    /// Enqueues one delivery, cancelling any in-flight delivery for the same resource and rule.
    pub fn dispatch(&self, job: NotifyJob) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let token = self.shutdown.child_token();
        let key = (job.resource.clone(), job.rule.clone());

        if let Ok(mut in_flight) = self.in_flight.lock()
            && let Some((_, previous)) = in_flight.insert(key.clone(), (id, token.clone()))
        {
            previous.cancel();
        }

        let permits = Arc::clone(&self.permits);
        let registry = Arc::clone(&self.in_flight);

        tokio::spawn(async move {
            let Ok(_permit) = permits.acquire().await else {
                return;
            };

            // preempted while still queued
            if !token.is_cancelled() {
                deliver(&job, &token).await;
            }

            if let Ok(mut in_flight) = registry.lock()
                && in_flight.get(&key).is_some_and(|(owner, _)| *owner == id)
            {
                in_flight.remove(&key);
            }
        });
    }
}

/// Runs the bounded retry loop for one delivery.
async fn deliver(job: &NotifyJob, cancel: &CancellationToken) {
    let client = match build_client(&job.request) {
        Ok(client) => client,
        Err(error) => {
            warn!("Request failed for {}: cannot build http client: {}", job.resource, error);
            return;
        },
    };

    let body = json!({
        "namespace": job.resource.namespace,
        "name": job.resource.name,
        "kind": job.resource.kind.kind_name(),
        "resourceVersion": job.resource_version,
        "event": job.action.as_str(),
    });

    let mut schedule = RetrySchedule::new(job.request.retry.total, job.request.retry.backoff_factor);
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;

        let outcome = tokio::select! {
            () = cancel.cancelled() => return,
            result = send_once(&client, &job.request, &body) => result,
        };

        match outcome {
            Ok(status) if status.is_success() => {
                info!("Request completed successfully for {}: {} {}", job.resource, status, job.request.url);
                return;
            },
            Ok(status) if !retryable_status(status) => {
                warn!("Request failed for {}: {} {}", job.resource, status, job.request.url);
                return;
            },
            Ok(status) => {
                debug!("Attempt {} for {} returned {}", attempt, job.resource, status);
            },
            Err(error) => {
                debug!("Attempt {} for {} failed: {}", attempt, job.resource, error);
            },
        }

        match schedule.next_delay() {
            Some(delay) => {
                tokio::select! {
                    () = cancel.cancelled() => return,
                    () = tokio::time::sleep(delay) => (),
                }
            },
            None => {
                warn!(
                    "Request failed for {}: {} attempts exhausted for {}",
                    job.resource, job.request.retry.total, job.request.url
                );
                return;
            },
        }
    }
}

async fn send_once(client: &reqwest::Client, request: &RequestSpec, body: &serde_json::Value) -> Result<StatusCode, reqwest::Error> {
    let mut builder = match request.method {
        RequestMethod::Get => client.get(&request.url),
        RequestMethod::Post => client.post(&request.url),
        RequestMethod::Put => client.put(&request.url),
        RequestMethod::Patch => client.patch(&request.url),
    };

    if let Some(basic) = request.auth.as_ref().and_then(|auth| auth.basic.as_ref()) {
        builder = builder.basic_auth(&basic.username, Some(&basic.password));
    }

    let response = builder.json(body).send().await?;
    Ok(response.status())
}

/// Retry only network errors, server errors, request timeouts and throttling.
fn retryable_status(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::REQUEST_TIMEOUT || status == StatusCode::TOO_MANY_REQUESTS
}

fn build_client(request: &RequestSpec) -> Result<reqwest::Client, reqwest::Error> {
    let mut builder = reqwest::Client::builder().timeout(Duration::from_secs(request.timeout));
    if request.skip_tls_verify {
        builder = builder.danger_accept_invalid_certs(true);
    }

    builder.build()
}
