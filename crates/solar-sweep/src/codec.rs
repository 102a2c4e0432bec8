//! JSON and YAML encoding of plans and reports.

use serde::{de::DeserializeOwned, Serialize};
use sha2::{Digest, Sha256};
use solar_core::errors::{ErrorInfo, SweepError};

fn codec_error(code: &str, err: impl ToString) -> SweepError {
    SweepError::Serde(ErrorInfo::new(code, err.to_string()))
}

/// Encodes `value` as pretty JSON with object keys in sorted order, so equal
/// values always produce equal bytes.
pub fn to_canonical_json_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, SweepError> {
    // Going through `Value` sorts struct fields: `serde_json::Map` is a
    // BTreeMap unless `preserve_order` is enabled.
    let value = serde_json::to_value(value).map_err(|err| codec_error("serde.json_serialize", err))?;
    let mut bytes =
        serde_json::to_vec_pretty(&value).map_err(|err| codec_error("serde.json_write", err))?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Hex SHA-256 of the canonical JSON encoding of `value`.
pub fn canonical_hash<T: Serialize>(value: &T) -> Result<String, SweepError> {
    let digest = Sha256::digest(to_canonical_json_bytes(value)?);
    Ok(format!("{digest:x}"))
}

/// Decodes JSON bytes.
pub fn from_json_slice<T: DeserializeOwned>(data: &[u8]) -> Result<T, SweepError> {
    serde_json::from_slice(data).map_err(|err| codec_error("serde.json_deserialize", err))
}

/// Encodes `value` as YAML.
pub fn to_yaml_string<T: Serialize>(value: &T) -> Result<String, SweepError> {
    serde_yaml::to_string(value).map_err(|err| codec_error("serde.yaml_serialize", err))
}

/// Decodes a YAML payload.
pub fn from_yaml_slice<T: DeserializeOwned>(data: &[u8]) -> Result<T, SweepError> {
    serde_yaml::from_slice(data).map_err(|err| codec_error("serde.yaml_deserialize", err))
}
