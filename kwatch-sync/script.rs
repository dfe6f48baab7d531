use kwatch_config::ScriptSpec;
use kwatch_kube::{EventAction, ResourceRef};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

#[cfg(test)]
#[path = "./script.tests.rs"]
mod script_tests;

/// Runs a rule's reload command with the event context in the environment.\
/// The child is killed when it outlives the configured timeout; failures are logged
/// and never affect the processing outcome of the event.
pub async fn run_script(spec: &ScriptSpec, resource: &ResourceRef, action: EventAction) {
    let mut command = Command::new("sh");
    command
        .arg("-c")
        .arg(&spec.command)
        .env("KWATCH_KIND", resource.kind.kind_name())
        .env("KWATCH_NAMESPACE", &resource.namespace)
        .env("KWATCH_NAME", &resource.name)
        .env("KWATCH_EVENT", action.as_str())
        .stdin(Stdio::null())
        .kill_on_drop(true);

    match tokio::time::timeout(Duration::from_secs(spec.timeout), command.status()).await {
        Ok(Ok(status)) if status.success() => debug!("Script finished for {}: {}", resource, spec.command),
        Ok(Ok(status)) => warn!("Script '{}' for {} exited with {}", spec.command, resource, status),
        Ok(Err(error)) => warn!("Cannot run script '{}' for {}: {}", spec.command, resource, error),
        Err(_) => warn!("Script '{}' for {} timed out after {} seconds", spec.command, resource, spec.timeout),
    }
}
