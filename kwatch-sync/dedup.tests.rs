use kwatch_kube::WatchedKind;

use super::*;

fn resource(name: &str) -> ResourceRef {
    ResourceRef::new(WatchedKind::ConfigMaps, "default", name)
}

#[test]
fn unseen_resource_is_not_reported() {
    let cache = DedupCache::new();
    assert!(!cache.seen(&resource("test-cm"), "1"));
}

#[test]
fn mark_records_the_version() {
    let cache = DedupCache::new();
    let cm = resource("test-cm");

    cache.mark(&cm, "41");

    assert!(cache.seen(&cm, "41"));
    assert!(!cache.seen(&cm, "42"));
}

#[test]
fn mark_replaces_the_previous_version() {
    let cache = DedupCache::new();
    let cm = resource("test-cm");

    cache.mark(&cm, "41");
    cache.mark(&cm, "42");

    assert!(cache.seen(&cm, "42"));
    assert!(!cache.seen(&cm, "41"));
}

#[test]
fn entries_are_keyed_by_full_identity() {
    let cache = DedupCache::new();
    cache.mark(&resource("a"), "7");

    assert!(!cache.seen(&resource("b"), "7"));
    assert!(!cache.seen(&ResourceRef::new(WatchedKind::Secrets, "default", "a"), "7"));
    assert!(!cache.seen(&ResourceRef::new(WatchedKind::ConfigMaps, "other", "a"), "7"));
}
