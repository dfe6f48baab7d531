use super::*;

#[test]
fn api_resources_address_core_v1_collections() {
    let cm = WatchedKind::ConfigMaps.api_resource();
    assert_eq!(("", "v1", "configmaps"), (cm.group.as_str(), cm.version.as_str(), cm.plural.as_str()));

    let secret = WatchedKind::Secrets.api_resource();
    assert_eq!("secrets", secret.plural);
    assert_eq!("Secret", secret.kind);
}

#[test]
fn names_are_stable() {
    assert_eq!("ConfigMap", WatchedKind::ConfigMaps.kind_name());
    assert_eq!("Secret", WatchedKind::Secrets.kind_name());
    assert_eq!("configmaps", WatchedKind::ConfigMaps.to_string());
    assert_eq!("secrets", WatchedKind::Secrets.to_string());
}
