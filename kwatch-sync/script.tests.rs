use kwatch_kube::WatchedKind;
use tempfile::tempdir;

use super::*;

fn spec(command: &str, timeout: u64) -> ScriptSpec {
    ScriptSpec {
        command: command.to_owned(),
        timeout,
    }
}

fn resource() -> ResourceRef {
    ResourceRef::new(WatchedKind::ConfigMaps, "default", "test-cm")
}

#[tokio::test]
async fn script_receives_event_context() {
    let dir = tempdir().unwrap();
    let marker = dir.path().join("marker");
    let command = format!("echo \"$KWATCH_KIND/$KWATCH_NAMESPACE/$KWATCH_NAME/$KWATCH_EVENT\" > {}", marker.display());

    run_script(&spec(&command, 10), &resource(), EventAction::Modified).await;

    let written = std::fs::read_to_string(&marker).unwrap();
    assert_eq!("ConfigMap/default/test-cm/modified\n", written);
}

#[tokio::test]
async fn failing_script_does_not_panic() {
    run_script(&spec("exit 3", 10), &resource(), EventAction::Added).await;
}

#[tokio::test]
async fn hanging_script_is_killed_at_the_timeout() {
    let started = std::time::Instant::now();

    run_script(&spec("sleep 30", 1), &resource(), EventAction::Added).await;

    assert!(started.elapsed() < Duration::from_secs(5));
}
