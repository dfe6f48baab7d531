use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use kube::api::DynamicObject;
use serde_json::json;

use super::*;

fn object(kind: WatchedKind, data: serde_json::Value) -> DynamicObject {
    let mut object = DynamicObject::new("test-resource", &kind.api_resource()).within("default");
    object.data = data;
    object
}

#[test]
fn configmap_data_is_utf8() {
    let object = object(WatchedKind::ConfigMaps, json!({"data": {"config.txt": "test content"}}));

    let payload = ResourcePayload::decode(WatchedKind::ConfigMaps, &object).unwrap();

    assert_eq!(b"test content".to_vec(), payload.files["config.txt"]);
}

#[test]
fn configmap_binary_data_is_base64() {
    let object = object(
        WatchedKind::ConfigMaps,
        json!({
            "data": {"plain.txt": "plain"},
            "binaryData": {"logo.png": BASE64.encode([0x89, 0x50, 0x4e, 0x47])},
        }),
    );

    let payload = ResourcePayload::decode(WatchedKind::ConfigMaps, &object).unwrap();

    assert_eq!(b"plain".to_vec(), payload.files["plain.txt"]);
    assert_eq!(vec![0x89, 0x50, 0x4e, 0x47], payload.files["logo.png"]);
}

#[test]
fn secret_data_decodes_to_raw_bytes() {
    let bytes: Vec<u8> = (0..=255).collect();
    let object = object(WatchedKind::Secrets, json!({"data": {"binary.dat": BASE64.encode(&bytes)}}));

    let payload = ResourcePayload::decode(WatchedKind::Secrets, &object).unwrap();

    assert_eq!(bytes, payload.files["binary.dat"]);
}

#[test]
fn secret_invalid_base64_is_an_error() {
    let object = object(WatchedKind::Secrets, json!({"data": {"broken": "not base64!"}}));

    let error = ResourcePayload::decode(WatchedKind::Secrets, &object).unwrap_err();

    assert!(matches!(error, PayloadError::InvalidBase64(key, _) if key == "broken"));
}

#[test]
fn configmap_non_string_value_is_an_error() {
    let object = object(WatchedKind::ConfigMaps, json!({"data": {"count": 3}}));

    let error = ResourcePayload::decode(WatchedKind::ConfigMaps, &object).unwrap_err();

    assert!(matches!(error, PayloadError::NotAString(key) if key == "count"));
}

#[test]
fn metadata_maps_are_carried_over() {
    let mut object = object(WatchedKind::ConfigMaps, json!({"data": {}}));
    object.metadata.labels = Some([("app".to_owned(), "test".to_owned())].into());
    object.metadata.annotations = Some([("kwatch-target-dir".to_owned(), "/tmp/custom".to_owned())].into());

    let payload = ResourcePayload::decode(WatchedKind::ConfigMaps, &object).unwrap();

    assert_eq!("test", payload.labels["app"]);
    assert_eq!("/tmp/custom", payload.annotations["kwatch-target-dir"]);
    assert!(payload.files.is_empty());
}

#[test]
fn missing_data_section_yields_empty_files() {
    let object = object(WatchedKind::ConfigMaps, json!({}));

    let payload = ResourcePayload::decode(WatchedKind::ConfigMaps, &object).unwrap();

    assert!(payload.files.is_empty());
}
