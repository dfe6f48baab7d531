use super::*;

#[test]
fn auth_tracker_trips_on_third_failure() {
    let mut tracker = AuthFailureTracker::default();

    assert!(!tracker.record());
    assert!(!tracker.record());
    assert!(tracker.record());
    assert!(tracker.record());
}

#[test]
fn auth_tracker_reset_clears_the_streak() {
    let mut tracker = AuthFailureTracker::default();
    tracker.record();
    tracker.record();

    tracker.reset();

    assert!(!tracker.record());
    assert!(!tracker.record());
    assert!(tracker.record());
}

#[test]
fn object_ref_requires_a_name() {
    let object = DynamicObject::new("watched", &WatchedKind::ConfigMaps.api_resource()).within("default");
    let resource = object_ref(WatchedKind::ConfigMaps, &object).unwrap();
    assert_eq!(ResourceRef::new(WatchedKind::ConfigMaps, "default", "watched"), resource);

    let mut nameless = object;
    nameless.metadata.name = None;
    assert!(object_ref(WatchedKind::ConfigMaps, &nameless).is_none());
}
