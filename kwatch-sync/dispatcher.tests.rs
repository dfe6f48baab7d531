use kwatch_config::{RequestSpec, RetrySpec};
use kwatch_kube::{ResourcePayload, ResourceRef, WatchedKind};
use std::path::Path;
use std::time::Duration;
use tempfile::tempdir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_partial_json, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::*;

fn rule(name: &str, value: &str) -> LabelRule {
    LabelRule {
        name: name.to_owned(),
        value: value.to_owned(),
        request: None,
        script: None,
    }
}

fn webhook_rule(name: &str, value: &str, url: &str, on_delete: bool) -> LabelRule {
    let mut rule = rule(name, value);
    rule.request = Some(RequestSpec {
        url: url.to_owned(),
        method: kwatch_config::RequestMethod::Post,
        timeout: 5,
        skip_tls_verify: false,
        auth: None,
        retry: RetrySpec {
            total: 3,
            backoff_factor: 0.01,
        },
        on_delete,
    });
    rule
}

fn context(root: &Path, rules: Vec<LabelRule>, ignore_processed: bool) -> DispatcherContext {
    DispatcherContext {
        rules,
        output: OutputConfig {
            folder: root.to_path_buf(),
            folder_annotation: Some("kwatch-target-dir".to_owned()),
            unique_filenames: false,
            default_file_mode: "0644".to_owned(),
        },
        file_mode: 0o644,
        ignore_processed,
        dedup: DedupCache::new(),
        notifier: Notifier::new(CancellationToken::new()),
    }
}

fn event(name: &str, version: &str, action: EventAction, labels: &[(&str, &str)], files: &[(&str, &[u8])]) -> NormalizedEvent {
    NormalizedEvent {
        resource: ResourceRef::new(WatchedKind::ConfigMaps, "default", name),
        resource_version: version.to_owned(),
        action,
        payload: Some(ResourcePayload {
            files: files.iter().map(|(k, v)| ((*k).to_owned(), v.to_vec())).collect(),
            labels: labels.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect(),
            annotations: BTreeMap::new(),
        }),
    }
}

async fn wait_for_requests(server: &MockServer, count: usize) {
    for _ in 0..100 {
        if server.received_requests().await.unwrap_or_default().len() >= count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("mock server did not receive {count} requests in time");
}

#[tokio::test]
async fn matching_event_is_materialized() {
    let root = tempdir().unwrap();
    let context = context(root.path(), vec![rule("app", "test")], true);
    let event = event("test-cm", "1", EventAction::Added, &[("app", "test")], &[("config.txt", b"test content")]);

    process_event(&context, &event).await;

    let target = root.path().join("default").join("test-cm").join("config.txt");
    assert_eq!(b"test content".to_vec(), std::fs::read(&target).unwrap());
    assert!(context.dedup.seen(&event.resource, "1"));
}

#[tokio::test]
async fn non_matching_event_is_ignored() {
    let root = tempdir().unwrap();
    let context = context(root.path(), vec![rule("app", "test")], true);
    let event = event(
        "test-cm-ignored",
        "1",
        EventAction::Added,
        &[("app", "other")],
        &[("ignored.txt", b"should not be synced")],
    );

    process_event(&context, &event).await;

    assert!(!root.path().join("default").exists());
    assert!(!context.dedup.seen(&event.resource, "1"));
}

#[tokio::test]
async fn update_replaces_file_content() {
    let root = tempdir().unwrap();
    let context = context(root.path(), vec![rule("app", "test")], true);

    process_event(
        &context,
        &event("test-cm-update", "1", EventAction::Added, &[("app", "test")], &[("data.txt", b"initial content")]),
    )
    .await;
    process_event(
        &context,
        &event("test-cm-update", "2", EventAction::Modified, &[("app", "test")], &[("data.txt", b"updated content")]),
    )
    .await;

    let target = root.path().join("default").join("test-cm-update").join("data.txt");
    assert_eq!(b"updated content".to_vec(), std::fs::read(&target).unwrap());
}

#[tokio::test]
async fn folder_annotation_names_the_exact_directory() {
    let root = tempdir().unwrap();
    let custom = root.path().join("custom-path");
    let context = context(root.path(), vec![rule("app", "test")], true);

    let mut event = event(
        "test-cm-annotation",
        "1",
        EventAction::Added,
        &[("app", "test")],
        &[("custom.txt", b"custom content")],
    );
    event.payload.as_mut().unwrap().annotations =
        [("kwatch-target-dir".to_owned(), custom.to_str().unwrap().to_owned())].into();

    process_event(&context, &event).await;

    assert_eq!(b"custom content".to_vec(), std::fs::read(custom.join("custom.txt")).unwrap());
    assert!(!root.path().join("default").join("test-cm-annotation").exists());
}

#[tokio::test]
async fn unique_filenames_flatten_the_layout() {
    let root = tempdir().unwrap();
    let mut context = context(root.path(), vec![rule("app", "test")], true);
    context.output.unique_filenames = true;

    process_event(
        &context,
        &event("test-cm", "1", EventAction::Added, &[("app", "test")], &[("config.txt", b"flat")]),
    )
    .await;

    let target = root.path().join("default").join("test-cm-config.txt");
    assert_eq!(b"flat".to_vec(), std::fs::read(&target).unwrap());
}

#[tokio::test]
async fn unique_filenames_with_annotation_strip_the_namespace() {
    let root = tempdir().unwrap();
    let custom = root.path().join("flat-target");
    let mut context = context(root.path(), vec![rule("app", "test")], true);
    context.output.unique_filenames = true;

    let mut event = event("test-cm", "1", EventAction::Added, &[("app", "test")], &[("config.txt", b"flat")]);
    event.payload.as_mut().unwrap().annotations =
        [("kwatch-target-dir".to_owned(), custom.to_str().unwrap().to_owned())].into();

    process_event(&context, &event).await;

    assert_eq!(b"flat".to_vec(), std::fs::read(custom.join("test-cm-config.txt")).unwrap());
}

#[tokio::test]
async fn processed_version_is_skipped_when_configured() {
    let root = tempdir().unwrap();
    let context = context(root.path(), vec![rule("app", "test")], true);
    let target = root.path().join("default").join("test-cm").join("config.txt");

    let first = event("test-cm", "1", EventAction::Added, &[("app", "test")], &[("config.txt", b"v1")]);
    process_event(&context, &first).await;
    assert!(target.exists());

    std::fs::remove_file(&target).unwrap();
    process_event(&context, &first).await;

    assert!(!target.exists(), "already processed version must not be re-materialized");
}

#[tokio::test]
async fn every_event_is_processed_without_dedup() {
    let root = tempdir().unwrap();
    let context = context(root.path(), vec![rule("app", "test")], false);
    let target = root.path().join("default").join("test-cm").join("config.txt");

    let first = event("test-cm", "1", EventAction::Added, &[("app", "test")], &[("config.txt", b"v1")]);
    process_event(&context, &first).await;
    std::fs::remove_file(&target).unwrap();
    process_event(&context, &first).await;

    assert!(target.exists());
}

#[tokio::test]
async fn deletion_keeps_files_in_place() {
    let root = tempdir().unwrap();
    let context = context(root.path(), vec![rule("app", "test")], true);
    let target = root.path().join("default").join("test-cm-delete").join("delete-test.txt");

    process_event(
        &context,
        &event("test-cm-delete", "1", EventAction::Added, &[("app", "test")], &[("delete-test.txt", b"test content")]),
    )
    .await;
    process_event(
        &context,
        &event("test-cm-delete", "2", EventAction::Deleted, &[("app", "test")], &[]),
    )
    .await;

    assert_eq!(b"test content".to_vec(), std::fs::read(&target).unwrap());
}

#[tokio::test]
async fn sink_failure_leaves_the_version_unmarked() {
    let root = tempdir().unwrap();
    let blocker = root.path().join("blocked");
    std::fs::write(&blocker, b"a file where a directory should be").unwrap();

    let context = context(&blocker, vec![rule("app", "test")], true);
    let event = event("test-cm", "1", EventAction::Added, &[("app", "test")], &[("config.txt", b"x")]);

    process_event(&context, &event).await;

    assert!(!context.dedup.seen(&event.resource, "1"));
}

#[tokio::test]
async fn webhook_fires_once_per_matching_rule() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(serde_json::json!({"name": "test-webhook-cm", "event": "added"})))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&server)
        .await;

    let root = tempdir().unwrap();
    let rules = vec![
        webhook_rule("app", "webhook-test", &format!("{}/webhook", server.uri()), false),
        webhook_rule("team", "obs", &format!("{}/webhook", server.uri()), false),
    ];
    let context = context(root.path(), rules, true);

    process_event(
        &context,
        &event(
            "test-webhook-cm",
            "1",
            EventAction::Added,
            &[("app", "webhook-test"), ("team", "obs")],
            &[("test.txt", b"webhook test content")],
        ),
    )
    .await;

    wait_for_requests(&server, 2).await;
}

#[tokio::test]
async fn deletion_webhook_requires_opt_in() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(serde_json::json!({"event": "deleted"})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let root = tempdir().unwrap();
    let rules = vec![
        webhook_rule("app", "test", &format!("{}/optin", server.uri()), true),
        webhook_rule("team", "obs", &format!("{}/optout", server.uri()), false),
    ];
    let context = context(root.path(), rules, true);

    process_event(
        &context,
        &event("test-cm", "9", EventAction::Deleted, &[("app", "test"), ("team", "obs")], &[]),
    )
    .await;

    wait_for_requests(&server, 1).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(1, server.received_requests().await.unwrap_or_default().len());
}

#[tokio::test]
async fn pool_routes_and_drains_events() {
    let root = tempdir().unwrap();
    let context = Arc::new(context(root.path(), vec![rule("app", "test")], true));
    let dispatcher = Dispatcher::start(Arc::clone(&context), 2);

    for i in 0..5 {
        dispatcher
            .dispatch(Box::new(event(
                &format!("test-concurrent-{i}"),
                "1",
                EventAction::Added,
                &[("app", "test")],
                &[("file.txt", format!("content {i}").as_bytes())],
            )))
            .await;
    }

    dispatcher.stop().await;

    for i in 0..5 {
        let target = root.path().join("default").join(format!("test-concurrent-{i}")).join("file.txt");
        assert_eq!(format!("content {i}").into_bytes(), std::fs::read(&target).unwrap());
    }
}
