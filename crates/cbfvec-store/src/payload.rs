//! Point payloads.
//!
//! Payloads are flat records of primitive values. Anything else (null,
//! arrays, nested objects) is rejected at conversion time.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// A primitive payload value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PayloadValue {
    /// Boolean flag.
    Bool(bool),
    /// Signed integer.
    Integer(i64),
    /// Floating point number.
    Float(f64),
    /// UTF-8 string.
    String(String),
}

/// String-keyed payload record, ordered by key.
pub type Payload = BTreeMap<String, PayloadValue>;

impl PayloadValue {
    /// Returns the string value, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PayloadValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer value, if this is an integer.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PayloadValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Convert a JSON value, failing on non-primitive types.
    pub fn from_json(key: &str, value: &serde_json::Value) -> StoreResult<Self> {
        use serde_json::Value;

        let unsupported = |kind| StoreError::UnsupportedPayload {
            key: key.to_string(),
            kind,
        };

        match value {
            Value::Bool(b) => Ok(PayloadValue::Bool(*b)),
            Value::Number(n) => n
                .as_i64()
                .map(PayloadValue::Integer)
                .or_else(|| n.as_f64().map(PayloadValue::Float))
                .ok_or_else(|| unsupported("number")),
            Value::String(s) => Ok(PayloadValue::String(s.clone())),
            Value::Null => Err(unsupported("null")),
            Value::Array(_) => Err(unsupported("array")),
            Value::Object(_) => Err(unsupported("object")),
        }
    }
}

impl std::fmt::Display for PayloadValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PayloadValue::Bool(b) => write!(f, "{}", b),
            PayloadValue::Integer(i) => write!(f, "{}", i),
            PayloadValue::Float(x) => write!(f, "{}", x),
            PayloadValue::String(s) => write!(f, "{}", s),
        }
    }
}

impl From<bool> for PayloadValue {
    fn from(v: bool) -> Self {
        PayloadValue::Bool(v)
    }
}

impl From<i64> for PayloadValue {
    fn from(v: i64) -> Self {
        PayloadValue::Integer(v)
    }
}

impl From<i32> for PayloadValue {
    fn from(v: i32) -> Self {
        PayloadValue::Integer(i64::from(v))
    }
}

impl From<u32> for PayloadValue {
    fn from(v: u32) -> Self {
        PayloadValue::Integer(i64::from(v))
    }
}

impl From<f64> for PayloadValue {
    fn from(v: f64) -> Self {
        PayloadValue::Float(v)
    }
}

impl From<&str> for PayloadValue {
    fn from(v: &str) -> Self {
        PayloadValue::String(v.to_string())
    }
}

impl From<String> for PayloadValue {
    fn from(v: String) -> Self {
        PayloadValue::String(v)
    }
}

/// Convert a JSON object into a [`Payload`], failing on the first
/// non-primitive value.
pub fn payload_from_json(object: &serde_json::Map<String, serde_json::Value>) -> StoreResult<Payload> {
    object
        .iter()
        .map(|(k, v)| PayloadValue::from_json(k, v).map(|value| (k.clone(), value)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_primitive_json_converts() {
        let value = json!({"name": "a.cbf", "width": 2463, "gain": 1.5, "ok": true});
        let payload = payload_from_json(value.as_object().unwrap()).unwrap();
        assert_eq!(payload["name"], PayloadValue::from("a.cbf"));
        assert_eq!(payload["width"], PayloadValue::Integer(2463));
        assert_eq!(payload["gain"], PayloadValue::Float(1.5));
        assert_eq!(payload["ok"], PayloadValue::Bool(true));
    }

    #[test]
    fn test_nested_json_rejected() {
        let value = json!({"good": 1, "tags": ["a", "b"]});
        let err = payload_from_json(value.as_object().unwrap()).unwrap_err();
        match err {
            StoreError::UnsupportedPayload { key, kind } => {
                assert_eq!(key, "tags");
                assert_eq!(kind, "array");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_null_rejected() {
        assert!(PayloadValue::from_json("k", &serde_json::Value::Null).is_err());
    }

    #[test]
    fn test_serializes_untagged() {
        let mut payload = Payload::new();
        payload.insert("height".into(), 2527i64.into());
        payload.insert("path".into(), "/data/a.cbf".into());
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({"height": 2527, "path": "/data/a.cbf"})
        );
    }

    #[test]
    fn test_deserialize_prefers_integer() {
        let v: PayloadValue = serde_json::from_str("42").unwrap();
        assert_eq!(v, PayloadValue::Integer(42));
        let v: PayloadValue = serde_json::from_str("4.5").unwrap();
        assert_eq!(v, PayloadValue::Float(4.5));
    }
}
