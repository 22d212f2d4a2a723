//! Properties façade: typed get/set, removal, bulk access, and validation.

use docprops_core::{DocumentGraph, PropsError, Value};
use serde_json::json;
use std::collections::{BTreeMap, HashMap};

/// Run `f` against the properties of a fresh document.
fn with_doc<R>(f: impl FnOnce(&mut docprops_core::Properties<'_>) -> R) -> R {
    let mut graph = DocumentGraph::new();
    let doc = graph.create_document();
    let mut props = graph.properties(doc).unwrap();
    f(&mut props)
}

// ============================================================================
// Basic get/set
// ============================================================================

#[test]
fn set_then_get_returns_same_scalar() {
    with_doc(|doc| {
        for (key, value) in [
            ("null", Value::Null),
            ("bool", Value::Bool(true)),
            ("int", Value::Int(-42)),
            ("float", Value::Float(1.5)),
            ("double", Value::Double(2.25)),
            ("string", Value::String("moe".into())),
        ] {
            doc.set(key, value.clone()).unwrap();
            assert_eq!(doc.get(key), Some(value));
        }
    });
}

#[test]
fn setters_chain() {
    with_doc(|doc| {
        doc.set("a", 1).unwrap().set("b", 2).unwrap().set("c", 3).unwrap();
        assert_eq!(doc.keys(), vec!["a", "b", "c"]);
        assert_eq!(doc.count(), 3);
    });
}

#[test]
fn setting_none_removes_key() {
    with_doc(|doc| {
        doc.set("k", "v").unwrap();
        assert!(doc.contains("k"));

        doc.set_value("k", None).unwrap();

        assert!(!doc.contains("k"));
        assert!(doc.get("k").is_none());
        assert_eq!(doc.count(), 0);
    });
}

#[test]
fn removing_missing_key_is_noop() {
    with_doc(|doc| {
        doc.remove("nothing").unwrap();
        assert_eq!(doc.count(), 0);
    });
}

#[test]
fn typed_getters_default_on_mismatch() {
    with_doc(|doc| {
        doc.set("s", "text").unwrap();

        assert!(!doc.get_bool("s"));
        assert_eq!(doc.get_int("s"), 0);
        assert_eq!(doc.get_float("s"), 0.0);
        assert_eq!(doc.get_double("s"), 0.0);
        assert!(doc.get_date("s").is_none());
        assert!(doc.get_blob("s").is_none());
        assert!(doc.get_subdocument("s").is_none());
        assert_eq!(doc.get_string("s").as_deref(), Some("text"));
    });
}

#[test]
fn array_elements_keep_order_and_types() {
    with_doc(|doc| {
        doc.set("array", json!([1, 2, "three", 4.4])).unwrap();

        let Some(Value::Array(items)) = doc.get("array") else {
            panic!("array should read back as an array");
        };
        assert_eq!(
            items,
            vec![
                Value::Int(1),
                Value::Int(2),
                Value::String("three".into()),
                Value::Double(4.4)
            ]
        );
    });
}

#[test]
fn all_properties_returns_subdocument_handles_for_maps() {
    with_doc(|doc| {
        doc.set("n", 1).unwrap();
        doc.set("m", json!({"x": 1})).unwrap();

        let all = doc.all_properties().unwrap();
        assert_eq!(all.get("n"), Some(&Value::Int(1)));
        assert!(matches!(all.get("m"), Some(Value::Subdocument(_))));
    });
}

#[test]
fn literal_conversions() {
    let mut hash = HashMap::new();
    hash.insert("k".to_string(), 1u8);
    let mut tree = BTreeMap::new();
    tree.insert("k".to_string(), "v");

    with_doc(|doc| {
        doc.set("hash", hash).unwrap();
        doc.set("tree", tree).unwrap();
        doc.set("list", vec!["a", "b"]).unwrap();
        doc.set("big", json!(u64::MAX)).unwrap();

        assert_eq!(doc.view("hash").get("k").int(), 1);
        assert_eq!(doc.view("tree").get("k").string(), Some("v"));
        assert_eq!(doc.view("list").at(1).string(), Some("b"));
        assert_eq!(doc.get("big"), Some(Value::Double(u64::MAX as f64)));
    });
}

// ============================================================================
// Validation
// ============================================================================

#[test]
fn non_finite_numbers_are_rejected() {
    with_doc(|doc| {
        let err = doc.set("nan", f64::NAN).unwrap_err();
        assert!(matches!(err, PropsError::InvalidValueType { .. }));

        let err = doc.set("inf", f32::INFINITY).unwrap_err();
        assert!(matches!(err, PropsError::InvalidValueType { .. }));
        assert_eq!(doc.count(), 0);
    });
}

#[test]
fn nested_invalid_value_rejects_whole_write() {
    with_doc(|doc| {
        doc.set("list", json!([1])).unwrap();

        let bad = Value::Array(vec![Value::Int(2), Value::Double(f64::NAN)]);
        assert!(doc.set("list", bad).is_err());

        assert_eq!(doc.get("list"), Some(Value::Array(vec![Value::Int(1)])));
    });
}

#[test]
fn bulk_set_is_atomic() {
    with_doc(|doc| {
        doc.set("keep", "me").unwrap();

        let mut replacement = BTreeMap::new();
        replacement.insert("ok".to_string(), Value::Int(1));
        let mut nested = BTreeMap::new();
        nested.insert("deep".to_string(), Value::Float(f32::NAN));
        replacement.insert("bad".to_string(), Value::Map(nested));

        let err = doc.set_all_properties(Some(replacement)).unwrap_err();
        match err {
            PropsError::InvalidValueType { key, reason } => {
                assert_eq!(key, "bad");
                assert!(reason.contains("non-finite"));
            }
            other => panic!("unexpected error: {}", other),
        }
        assert_eq!(doc.keys(), vec!["keep"]);
    });
}

// ============================================================================
// Nested assignment
// ============================================================================

#[test]
fn assign_nested_writes_into_subdocument() {
    with_doc(|doc| {
        doc.set("address", json!({"city": "galaxy city"})).unwrap();

        assert!(doc.assign_nested("address", "zip", 12345).unwrap());

        assert_eq!(doc.view("address").get("zip").int(), 12345);
        assert_eq!(doc.view("address").get("city").string(), Some("galaxy city"));
    });
}

#[test]
fn assign_nested_on_scalar_is_silent_noop() {
    with_doc(|doc| {
        doc.set("name", "Jim").unwrap();

        assert!(!doc.assign_nested("name", "first", "J").unwrap());
        assert!(!doc.assign_nested("missing", "first", "J").unwrap());

        assert_eq!(doc.get("name"), Some(Value::String("Jim".into())));
        assert!(!doc.contains("missing"));
    });
}

// ============================================================================
// Export
// ============================================================================

#[test]
fn to_json_inlines_subdocuments() {
    with_doc(|doc| {
        doc.set("name", "Jim").unwrap();
        doc.set("address", json!({"zip": 12345, "tags": ["a"]})).unwrap();

        assert_eq!(
            doc.to_json().unwrap(),
            json!({"address": {"tags": ["a"], "zip": 12345}, "name": "Jim"})
        );
    });
}
