use super::*;

#[test]
fn shard_is_stable_for_equal_refs() {
    let a = ResourceRef::new(WatchedKind::ConfigMaps, "default", "grafana-dashboards");
    let b = ResourceRef::new(WatchedKind::ConfigMaps, "default", "grafana-dashboards");

    for shards in [1, 2, 4, 8] {
        assert_eq!(a.shard(shards), b.shard(shards));
    }
}

#[test]
fn shard_stays_in_range() {
    for i in 0..64 {
        let r = ResourceRef::new(WatchedKind::Secrets, "ns", format!("res-{i}"));
        assert!(r.shard(4) < 4);
        assert_eq!(0, r.shard(1));
        assert_eq!(0, r.shard(0));
    }
}

#[test]
fn kind_distinguishes_refs() {
    let cm = ResourceRef::new(WatchedKind::ConfigMaps, "default", "creds");
    let secret = ResourceRef::new(WatchedKind::Secrets, "default", "creds");

    assert_ne!(cm, secret);
    assert_eq!("configmaps/default/creds", cm.to_string());
}
