//! Base64 and JSON helpers.

use crate::error::{EdgeKitError, Result};
use base64::{engine::general_purpose, Engine as _};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;

/// Decoded JSON object.
pub type JsonMap = serde_json::Map<String, JsonValue>;

pub fn encode_string_to_base64(input: &str) -> String {
    general_purpose::STANDARD.encode(input.as_bytes())
}

pub fn decode_base64_to_string(encoded: &str) -> Result<String> {
    let bytes = general_purpose::STANDARD.decode(encoded)?;
    Ok(String::from_utf8(bytes)?)
}

/// Serialize `data` as compact JSON, then base64 it.
pub fn encode_json_to_base64<T: Serialize + ?Sized>(data: &T) -> Result<String> {
    let json = serde_json::to_vec(data)?;
    Ok(general_purpose::STANDARD.encode(json))
}

pub fn decode_base64_json<T: DeserializeOwned>(encoded: &str) -> Result<T> {
    let bytes = general_purpose::STANDARD.decode(encoded)?;
    Ok(serde_json::from_slice(&bytes)?)
}

pub fn decode_base64_json_to_map(encoded: &str) -> Result<JsonMap> {
    let bytes = general_purpose::STANDARD.decode(encoded)?;
    from_json_to_map(&bytes)
}

pub fn to_json<T: Serialize + ?Sized>(data: &T) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(data)?)
}

/// Pretty-printed JSON, two-space indent.
pub fn to_json_string<T: Serialize + ?Sized>(data: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(data)?)
}

pub fn from_json<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    Ok(serde_json::from_slice(bytes)?)
}

pub fn from_json_str<T: DeserializeOwned>(s: &str) -> Result<T> {
    Ok(serde_json::from_str(s)?)
}

pub fn from_json_to_map(bytes: &[u8]) -> Result<JsonMap> {
    match serde_json::from_slice(bytes)? {
        JsonValue::Object(map) => Ok(map),
        other => Err(EdgeKitError::InvalidTarget(format!(
            "expected a JSON object, found {}",
            json_kind(&other)
        ))),
    }
}

pub fn get_str<'a>(data: &'a JsonMap, key: &str) -> Option<&'a str> {
    data.get(key).and_then(JsonValue::as_str)
}

pub fn get_f64(data: &JsonMap, key: &str) -> Option<f64> {
    data.get(key).and_then(JsonValue::as_f64)
}

pub fn get_bool(data: &JsonMap, key: &str) -> Option<bool> {
    data.get(key).and_then(JsonValue::as_bool)
}

/// Flatten nested objects into `("a.b.c", value)` pairs.
///
/// Arrays are leaves and are rendered as compact JSON.
pub fn flatten_json(data: &JsonMap) -> Vec<(String, String)> {
    let mut out = Vec::new();
    walk(data, None, &mut out);
    out
}

fn walk(data: &JsonMap, prefix: Option<&str>, out: &mut Vec<(String, String)>) {
    for (key, value) in data {
        let full_key = match prefix {
            Some(p) => format!("{}.{}", p, key),
            None => key.clone(),
        };
        match value {
            JsonValue::Object(nested) => walk(nested, Some(&full_key), out),
            JsonValue::String(s) => out.push((full_key, s.clone())),
            other => out.push((full_key, other.to_string())),
        }
    }
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}
