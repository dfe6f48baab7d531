use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use kube::api::DynamicObject;
use std::collections::BTreeMap;

use super::WatchedKind;

#[cfg(test)]
#[path = "./payload.tests.rs"]
mod payload_tests;

/// Possible errors from payload decoding.
#[derive(thiserror::Error, Debug)]
pub enum PayloadError {
    /// Payload entry holds something other than a string.
    #[error("key '{0}' is not a string value")]
    NotAString(String),

    /// Payload entry cannot be base64-decoded.
    #[error("key '{0}' is not valid base64: {1}")]
    InvalidBase64(String, base64::DecodeError),
}

/// Observed content of a ConfigMap or Secret, decoded to raw file bytes.
#[derive(Debug, Default, Clone)]
pub struct ResourcePayload {
    pub files: BTreeMap<String, Vec<u8>>,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
}

impl ResourcePayload {
    /// Decodes the wire representation of a resource.\
    /// ConfigMap `data` values are UTF-8 strings and `binaryData` values are base64;
    /// Secret `data` values are always base64. TLS secrets are not special-cased.
    pub fn decode(kind: WatchedKind, object: &DynamicObject) -> Result<Self, PayloadError> {
        let mut files = BTreeMap::new();

        match kind {
            WatchedKind::ConfigMaps => {
                for (key, value) in entries(object, "data") {
                    let text = value.as_str().ok_or_else(|| PayloadError::NotAString(key.clone()))?;
                    files.insert(key.clone(), text.as_bytes().to_vec());
                }
                for (key, value) in entries(object, "binaryData") {
                    files.insert(key.clone(), decode_base64(key, value)?);
                }
            },
            WatchedKind::Secrets => {
                for (key, value) in entries(object, "data") {
                    files.insert(key.clone(), decode_base64(key, value)?);
                }
            },
        }

        Ok(Self {
            files,
            labels: object.metadata.labels.clone().unwrap_or_default(),
            annotations: object.metadata.annotations.clone().unwrap_or_default(),
        })
    }
}

fn entries<'a>(object: &'a DynamicObject, field: &str) -> impl Iterator<Item = (&'a String, &'a serde_json::Value)> {
    object.data.get(field).and_then(|value| value.as_object()).into_iter().flatten()
}

fn decode_base64(key: &str, value: &serde_json::Value) -> Result<Vec<u8>, PayloadError> {
    let text = value.as_str().ok_or_else(|| PayloadError::NotAString(key.to_owned()))?;
    BASE64.decode(text).map_err(|error| PayloadError::InvalidBase64(key.to_owned(), error))
}
