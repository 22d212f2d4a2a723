//! JSON snapshot codec -- converts container trees to and from `serde_json::Value`.
//!
//! Plain JSON covers most variants directly. The rest are written as marker
//! objects carrying a `"@type"` key so that reloading restores the same
//! variant:
//!
//! - **Date**: `{"@type":"date","value":"2017-02-09T18:30:00.000000000Z"}`
//! - **Blob**: `{"@type":"blob","content_type":"text/plain","length":5,"content":[49,50,51,52,53]}`
//! - **Float** (single precision): `{"@type":"float","value":3.140000104904175}`
//!
//! A nested object that itself has a `"@type"` key is wrapped as
//! `{"@type":"map","value":{...}}` so user content is never read back as a
//! marker. Document bodies are not wrapped: their keys are always literal.
//!
//! Sub-documents are inlined as nested objects. Decoding never creates
//! sub-documents: nested objects come back as [`Value::Map`] and are
//! materialized lazily when first read through a `Properties` façade.

use crate::blob::Blob;
use crate::date::{format_date, parse_date};
use crate::error::{PropsError, Result};
use crate::graph::{ContainerId, DocumentGraph, RawMap};
use crate::value::{float_to_json, Value};
use serde_json::{json, Map, Number};
use std::collections::BTreeMap;

/// Key marking an object as an encoded non-JSON value.
pub const TYPE_KEY: &str = "@type";

/// Encode one container, with every sub-document beneath it inlined.
///
/// # Errors
/// Returns `PropsError::UnknownDocument` / `UnknownSubdocument` if `owner` or
/// a referenced sub-document is not live in `graph`.
pub fn encode_container(graph: &DocumentGraph, owner: ContainerId) -> Result<serde_json::Value> {
    let backing = graph.backing(owner).ok_or_else(|| match owner {
        ContainerId::Document(id) => PropsError::UnknownDocument(id.to_string()),
        ContainerId::Subdocument(id) => PropsError::UnknownSubdocument(id),
    })?;
    let mut out = Map::new();
    for (key, value) in backing.iter() {
        out.insert(key.clone(), encode_value(graph, value)?);
    }
    Ok(serde_json::Value::Object(out))
}

/// Encode a single value, inlining any sub-documents it references.
pub fn encode_value(graph: &DocumentGraph, value: &Value) -> Result<serde_json::Value> {
    encode(Some(graph), value)
}

/// Encode a value that does not belong to any graph.
///
/// # Errors
/// Returns `PropsError::UnknownSubdocument` for any sub-document handle in `value`.
pub(crate) fn encode_detached(value: &Value) -> Result<serde_json::Value> {
    encode(None, value)
}

fn encode(graph: Option<&DocumentGraph>, value: &Value) -> Result<serde_json::Value> {
    Ok(match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Int(n) => serde_json::Value::Number(Number::from(*n)),
        Value::Double(d) => float_to_json(*d),
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Float(f) => json!({ TYPE_KEY: "float", "value": float_to_json(f64::from(*f)) }),
        Value::Date(d) => json!({ TYPE_KEY: "date", "value": format_date(d) }),
        Value::Blob(blob) => json!({
            TYPE_KEY: "blob",
            "content_type": blob.content_type(),
            "length": blob.length(),
            "content": &blob.content()[..],
        }),
        Value::Array(items) => serde_json::Value::Array(
            items
                .iter()
                .map(|item| encode(graph, item))
                .collect::<Result<Vec<_>>>()?,
        ),
        Value::Map(map) => {
            let mut out = Map::new();
            for (key, item) in map {
                out.insert(key.clone(), encode(graph, item)?);
            }
            escape_object(out)
        }
        Value::Subdocument(id) => {
            let graph = graph.ok_or(PropsError::UnknownSubdocument(*id))?;
            match encode_container(graph, ContainerId::Subdocument(*id))? {
                serde_json::Value::Object(out) => escape_object(out),
                other => other,
            }
        }
    })
}

fn escape_object(out: Map<String, serde_json::Value>) -> serde_json::Value {
    if out.contains_key(TYPE_KEY) {
        json!({ TYPE_KEY: "map", "value": out })
    } else {
        serde_json::Value::Object(out)
    }
}

/// Decode a stored document body into a backing map.
///
/// `id` is only used to label errors.
///
/// # Errors
/// Returns `PropsError::Corrupt` if the body is not a JSON object or contains
/// a malformed marker object.
pub fn decode_document(id: &str, json: &serde_json::Value) -> Result<RawMap> {
    let corrupt = |message: String| PropsError::Corrupt {
        id: id.to_string(),
        message,
    };
    let object = json
        .as_object()
        .ok_or_else(|| corrupt(format!("expected an object, found {}", json_kind(json))))?;

    let mut content = RawMap::new();
    for (key, item) in object {
        let value = decode_value(item).map_err(|message| corrupt(format!("{}: {}", key, message)))?;
        content.raw_set(key, Some(value));
    }
    Ok(content)
}

fn decode_value(json: &serde_json::Value) -> std::result::Result<Value, String> {
    Ok(match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => Value::Double(n.as_f64().unwrap_or(0.0)),
        },
        serde_json::Value::String(s) => Value::String(s.clone()),
        serde_json::Value::Array(items) => Value::Array(
            items
                .iter()
                .map(decode_value)
                .collect::<std::result::Result<Vec<_>, _>>()?,
        ),
        serde_json::Value::Object(object) => match object.get(TYPE_KEY).and_then(|t| t.as_str()) {
            Some("date") => decode_date(object)?,
            Some("blob") => decode_blob(object)?,
            Some("float") => decode_float(object)?,
            Some("map") => {
                let inner = object
                    .get("value")
                    .and_then(|v| v.as_object())
                    .ok_or("map marker without an object value")?;
                decode_map(inner)?
            }
            _ => decode_map(object)?,
        },
    })
}

/// Decode every entry of `object`, taking its keys literally.
fn decode_map(object: &Map<String, serde_json::Value>) -> std::result::Result<Value, String> {
    let mut map = BTreeMap::new();
    for (key, item) in object {
        map.insert(key.clone(), decode_value(item)?);
    }
    Ok(Value::Map(map))
}

fn decode_date(object: &Map<String, serde_json::Value>) -> std::result::Result<Value, String> {
    let text = object
        .get("value")
        .and_then(|v| v.as_str())
        .ok_or("date marker without a text value")?;
    parse_date(text)
        .map(Value::Date)
        .ok_or_else(|| format!("invalid ISO-8601 date '{}'", text))
}

fn decode_float(object: &Map<String, serde_json::Value>) -> std::result::Result<Value, String> {
    object
        .get("value")
        .and_then(|v| v.as_f64())
        .map(|f| Value::Float(f as f32))
        .ok_or_else(|| "float marker without a numeric value".to_string())
}

fn decode_blob(object: &Map<String, serde_json::Value>) -> std::result::Result<Value, String> {
    let content_type = object
        .get("content_type")
        .and_then(|v| v.as_str())
        .ok_or("blob marker without a content type")?;
    let content: Vec<u8> = object
        .get("content")
        .cloned()
        .map(serde_json::from_value::<Vec<u8>>)
        .transpose()
        .map_err(|e| format!("invalid blob content: {}", e))?
        .ok_or("blob marker without content")?;
    if let Some(length) = object.get("length").and_then(|v| v.as_u64()) {
        if length != content.len() as u64 {
            return Err(format!(
                "blob length {} does not match content of {} bytes",
                length,
                content.len()
            ));
        }
    }
    Ok(Value::Blob(Blob::new(content_type, content)))
}

fn json_kind(json: &serde_json::Value) -> &'static str {
    match json {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
