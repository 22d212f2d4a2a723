//! Snapshot codec and date wire format.

use chrono::{TimeZone, Utc};
use docprops_core::date::{format_date, parse_date};
use docprops_core::persist::{decode_document, encode_container, TYPE_KEY};
use docprops_core::{Blob, DocumentGraph, PropsError, Value};
use serde_json::json;

// ============================================================================
// Date text
// ============================================================================

#[test]
fn date_format_is_fixed_width_utc() {
    let date = Utc.with_ymd_and_hms(2017, 2, 9, 18, 30, 0).unwrap();
    assert_eq!(format_date(&date), "2017-02-09T18:30:00.000000000Z");
}

#[test]
fn date_parse_accepts_offsets_and_normalizes_to_utc() {
    let parsed = parse_date("2017-02-09T20:30:00+02:00").unwrap();
    assert_eq!(parsed, Utc.with_ymd_and_hms(2017, 2, 9, 18, 30, 0).unwrap());
}

#[test]
fn date_parse_rejects_timezone_less_text() {
    assert!(parse_date("2017-02-09T18:30:00").is_none());
    assert!(parse_date("2017-02-09").is_none());
    assert!(parse_date("not a date").is_none());
}

// ============================================================================
// Encoding
// ============================================================================

#[test]
fn encodes_non_json_variants_as_markers() {
    let mut graph = DocumentGraph::new();
    let doc = graph.create_document();
    {
        let mut props = graph.properties(doc).unwrap();
        props
            .set("when", Utc.with_ymd_and_hms(2017, 2, 9, 18, 30, 0).unwrap())
            .unwrap()
            .set("data", Blob::new("text/plain", &b"hi"[..]))
            .unwrap()
            .set("single", 0.5f32)
            .unwrap()
            .set("plain", 0.5f64)
            .unwrap();
    }

    let body = encode_container(&graph, doc.into()).unwrap();

    assert_eq!(
        body,
        json!({
            "when": {TYPE_KEY: "date", "value": "2017-02-09T18:30:00.000000000Z"},
            "data": {TYPE_KEY: "blob", "content_type": "text/plain", "length": 2, "content": [104, 105]},
            "single": {TYPE_KEY: "float", "value": 0.5},
            "plain": 0.5
        })
    );
}

#[test]
fn nested_objects_with_type_key_are_wrapped() {
    let mut graph = DocumentGraph::new();
    let doc = graph.create_document();
    graph
        .properties(doc)
        .unwrap()
        .set("meta", json!({TYPE_KEY: "date", "value": "soon"}))
        .unwrap()
        .set(TYPE_KEY, "float")
        .unwrap();

    let body = encode_container(&graph, doc.into()).unwrap();
    assert_eq!(
        body,
        json!({
            "meta": {TYPE_KEY: "map", "value": {TYPE_KEY: "date", "value": "soon"}},
            TYPE_KEY: "float"
        })
    );

    let content = decode_document("doc", &body).unwrap();
    assert_eq!(content.raw_get(TYPE_KEY), Some(&Value::String("float".into())));
    let Some(Value::Map(meta)) = content.raw_get("meta") else {
        panic!("wrapped object should decode to a map");
    };
    assert_eq!(meta.get(TYPE_KEY), Some(&Value::String("date".into())));
    assert_eq!(meta.get("value"), Some(&Value::String("soon".into())));
}

#[test]
fn detached_values_export_in_snapshot_form() {
    let date = Utc.with_ymd_and_hms(2017, 2, 9, 18, 30, 0).unwrap();
    let value = Value::Array(vec![Value::Date(date), Value::Float(0.5), Value::Int(3)]);
    assert_eq!(
        value.to_json().unwrap(),
        json!([
            {TYPE_KEY: "date", "value": "2017-02-09T18:30:00.000000000Z"},
            {TYPE_KEY: "float", "value": 0.5},
            3
        ])
    );

    let literal = Value::from(json!({TYPE_KEY: "blob"}));
    assert_eq!(
        literal.to_json().unwrap(),
        json!({TYPE_KEY: "map", "value": {TYPE_KEY: "blob"}})
    );

    let mut graph = DocumentGraph::new();
    let sub = graph.new_subdocument();
    assert!(matches!(
        Value::Subdocument(sub).to_json(),
        Err(PropsError::UnknownSubdocument(_))
    ));
}

#[test]
fn encoding_unknown_container_fails() {
    let mut graph = DocumentGraph::new();
    let doc = graph.create_document();
    graph.remove_document(doc);

    assert!(matches!(
        encode_container(&graph, doc.into()),
        Err(PropsError::UnknownDocument(_))
    ));
}

// ============================================================================
// Decoding
// ============================================================================

#[test]
fn decodes_nested_objects_as_raw_maps() {
    let content = decode_document("doc", &json!({"a": {"b": [1, {"c": 2.5}]}})).unwrap();

    let Some(Value::Map(a)) = content.raw_get("a") else {
        panic!("nested object should decode to a map");
    };
    let Some(Value::Array(items)) = a.get("b") else {
        panic!("nested array should decode to an array");
    };
    assert_eq!(items[0], Value::Int(1));
    assert!(matches!(&items[1], Value::Map(m) if m.get("c") == Some(&Value::Double(2.5))));
}

#[test]
fn unknown_marker_type_is_plain_map() {
    let content = decode_document("doc", &json!({"x": {TYPE_KEY: "widget", "v": 1}})).unwrap();
    assert!(matches!(content.raw_get("x"), Some(Value::Map(_))));
}

#[test]
fn malformed_markers_are_corrupt() {
    for body in [
        json!({"d": {TYPE_KEY: "date", "value": "2017-02-09T18:30:00"}}),
        json!({"d": {TYPE_KEY: "date"}}),
        json!({"b": {TYPE_KEY: "blob", "content_type": "x", "length": 3, "content": [1]}}),
        json!({"b": {TYPE_KEY: "blob", "content": [1]}}),
        json!({"b": {TYPE_KEY: "blob", "content_type": "x", "content": [300]}}),
        json!({"f": {TYPE_KEY: "float", "value": "one"}}),
        json!({"m": {TYPE_KEY: "map", "value": [1]}}),
    ] {
        let err = decode_document("doc7", &body).unwrap_err();
        match err {
            PropsError::Corrupt { id, .. } => assert_eq!(id, "doc7"),
            other => panic!("expected corrupt error for {}, got {}", body, other),
        }
    }
}

#[test]
fn non_object_body_is_corrupt() {
    let err = decode_document("doc", &json!("text")).unwrap_err();
    assert!(err.to_string().contains("expected an object, found a string"));
}
