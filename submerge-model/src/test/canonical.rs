use crate::canonical::{canonicalize, check_strict_canonical};
use serde_json::json;
use test_log::test;

#[test]
fn canonicalize_sorts_keys_and_drops_whitespace() {
    let v = json!({"b": 1, "a": {"d": 2, "c": 3}});
    assert_eq!(canonicalize(&v), r#"{"a":{"c":3,"d":2},"b":1}"#);
}

#[test]
fn canonicalize_is_order_independent() {
    let a = json!({"x": 1, "y": 2});
    let b = json!({"y": 2, "x": 1});
    assert_eq!(canonicalize(&a), canonicalize(&b));
}

#[test]
fn strict_canonical_rejects_floats() {
    assert!(check_strict_canonical(r#"{"a": 1.5}"#).is_err());
    assert!(check_strict_canonical(r#"{"a": 1}"#).is_ok());
}

#[test]
fn strict_canonical_rejects_unsafe_integers() {
    assert!(check_strict_canonical(r#"{"a": 9007199254740993}"#).is_err());
    assert!(check_strict_canonical(r#"{"a": 9007199254740991}"#).is_ok());
}
