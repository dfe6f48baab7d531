use std::collections::HashMap;

use super::*;
use crate::core::WatchedKind;

fn refs(entries: &[(&str, &str)]) -> HashMap<ResourceRef, String> {
    entries
        .iter()
        .map(|(name, rv)| (ResourceRef::new(WatchedKind::ConfigMaps, "default", *name), (*rv).to_owned()))
        .collect()
}

fn actions_of(changes: &[(ResourceRef, String, EventAction)], name: &str) -> Vec<EventAction> {
    changes.iter().filter(|(r, _, _)| r.name == name).map(|(_, _, a)| *a).collect()
}

#[test]
fn first_listing_is_all_adds() {
    let changes = diff_snapshot(&HashMap::new(), &refs(&[("a", "1"), ("b", "2")]));

    assert_eq!(2, changes.len());
    assert!(changes.iter().all(|(_, _, action)| *action == EventAction::Added));
}

#[test]
fn version_bump_is_a_modification() {
    let previous = refs(&[("a", "1"), ("b", "2")]);
    let current = refs(&[("a", "3"), ("b", "2")]);

    let changes = diff_snapshot(&previous, &current);

    assert_eq!(vec![EventAction::Modified], actions_of(&changes, "a"));
    assert!(actions_of(&changes, "b").is_empty());
    assert_eq!("3", changes[0].1);
}

#[test]
fn missing_resource_is_a_deletion() {
    let previous = refs(&[("a", "1"), ("b", "2")]);
    let current = refs(&[("b", "2")]);

    let changes = diff_snapshot(&previous, &current);

    assert_eq!(vec![EventAction::Deleted], actions_of(&changes, "a"));
}

#[test]
fn identical_listings_are_quiet() {
    let listing = refs(&[("a", "1"), ("b", "2")]);
    assert!(diff_snapshot(&listing, &listing.clone()).is_empty());
}

#[test]
fn mixed_changes_are_all_reported() {
    let previous = refs(&[("kept", "1"), ("bumped", "5"), ("gone", "9")]);
    let current = refs(&[("kept", "1"), ("bumped", "6"), ("new", "1")]);

    let changes = diff_snapshot(&previous, &current);

    assert_eq!(3, changes.len());
    assert_eq!(vec![EventAction::Modified], actions_of(&changes, "bumped"));
    assert_eq!(vec![EventAction::Added], actions_of(&changes, "new"));
    assert_eq!(vec![EventAction::Deleted], actions_of(&changes, "gone"));
    assert!(actions_of(&changes, "kept").is_empty());
}
