//! Structural cache keys.
//!
//! A [`QueryKey`] is an ordered tuple: the resource name followed by any
//! number of JSON segments (ids, filter objects). Two keys built from equal
//! values are equal no matter how the values were constructed: object fields
//! are sorted and `null` fields dropped before encoding, so the encoded
//! string is the identity.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::Serialize;
use serde_json::{Map, Value};

/// Cache key for one query result.
#[derive(Debug, Clone)]
pub struct QueryKey {
    segments: Vec<Value>,
    encoded: String,
}

impl QueryKey {
    /// Key for a whole resource family, e.g. `["cashLogs"]`.
    pub fn new(resource: &str) -> Self {
        Self::from_segments(vec![Value::String(resource.to_string())])
    }

    /// Append one positional segment (an id, a flag).
    pub fn with(mut self, segment: impl Into<Value>) -> Self {
        self.segments.push(canonicalize(segment.into()));
        self.encoded = encode(&self.segments);
        self
    }

    /// Append a serialized filter object.
    pub fn with_params<P: Serialize + ?Sized>(self, params: &P) -> Self {
        let value = match serde_json::to_value(params) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(error = %err, "Query params failed to serialize; keying on null");
                Value::Null
            }
        };
        self.with(value)
    }

    fn from_segments(segments: Vec<Value>) -> Self {
        let segments: Vec<Value> = segments.into_iter().map(canonicalize).collect();
        let encoded = encode(&segments);
        Self { segments, encoded }
    }

    /// The resource name (first segment).
    pub fn resource(&self) -> &str {
        self.segments
            .first()
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    pub fn segments(&self) -> &[Value] {
        &self.segments
    }

    /// Canonical string form, e.g. `["owner-payment-logs",7]`.
    pub fn encoded(&self) -> &str {
        &self.encoded
    }

    /// True when `prefix`'s segments are a leading run of this key's.
    ///
    /// `["owner-logs", 7]` matches `["owner-logs"]` and itself, never
    /// `["owner-logs", 8]`.
    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        prefix.segments.len() <= self.segments.len()
            && prefix
                .segments
                .iter()
                .zip(&self.segments)
                .all(|(a, b)| a == b)
    }
}

impl PartialEq for QueryKey {
    fn eq(&self, other: &Self) -> bool {
        self.encoded == other.encoded
    }
}

impl Eq for QueryKey {}

impl Hash for QueryKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.encoded.hash(state);
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encoded)
    }
}

/// Sort object fields and drop nulls inside objects, recursively.
///
/// Maps are rebuilt in sorted insertion order so the result is canonical even
/// when `serde_json` preserves insertion order.
fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map
                .into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, canonicalize(v)))
                .collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut sorted = Map::new();
            for (k, v) in entries {
                sorted.insert(k, v);
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

fn encode(segments: &[Value]) -> String {
    // Serializing a Vec<Value> cannot fail.
    serde_json::to_string(segments).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resource_only_key() {
        let key = QueryKey::new("dashboard");
        assert_eq!(key.encoded(), r#"["dashboard"]"#);
        assert_eq!(key.resource(), "dashboard");
    }

    #[test]
    fn test_id_segment() {
        let key = QueryKey::new("owner-payment-logs").with(7);
        assert_eq!(key.encoded(), r#"["owner-payment-logs",7]"#);
    }

    #[test]
    fn test_field_order_does_not_matter() {
        let a = QueryKey::new("reports").with(json!({"b": 1, "a": "x"}));
        let b = QueryKey::new("reports").with(json!({"a": "x", "b": 1}));
        assert_eq!(a, b);
        assert_eq!(a.encoded(), r#"["reports",{"a":"x","b":1}]"#);
    }

    #[test]
    fn test_null_fields_are_dropped() {
        let a = QueryKey::new("reports").with(json!({"a": "x", "b": null}));
        let b = QueryKey::new("reports").with(json!({"a": "x"}));
        assert_eq!(a, b);
    }

    #[test]
    fn test_nested_objects_are_canonical() {
        let a = QueryKey::new("r").with(json!({"outer": {"z": 1, "y": [ {"k": 2, "j": 1} ]}}));
        let b = QueryKey::new("r").with(json!({"outer": {"y": [ {"j": 1, "k": 2} ], "z": 1}}));
        assert_eq!(a, b);
    }

    #[test]
    fn test_prefix_matching() {
        let family = QueryKey::new("owner-logs");
        let seven = QueryKey::new("owner-logs").with(7);
        let eight = QueryKey::new("owner-logs").with(8);

        assert!(seven.starts_with(&family));
        assert!(seven.starts_with(&seven));
        assert!(!eight.starts_with(&seven));
        assert!(!family.starts_with(&seven));
        assert!(!QueryKey::new("owner-logs-archive").starts_with(&family));
    }

    #[test]
    fn test_with_params_matches_with_value() {
        #[derive(Serialize)]
        struct Filters {
            business_id: Option<String>,
            site_id: Option<String>,
        }
        let filters = Filters {
            business_id: Some("9".to_string()),
            site_id: None,
        };
        let a = QueryKey::new("detailed-logs").with_params(&filters);
        let b = QueryKey::new("detailed-logs").with(json!({"business_id": "9"}));
        assert_eq!(a, b);
    }
}
