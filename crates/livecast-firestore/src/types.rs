//! Firestore REST API types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Document field map.
pub type Fields = HashMap<String, Value>;

/// Firestore document value types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Value {
    NullValue(()),
    BooleanValue(bool),
    IntegerValue(String), // Firestore sends integers as strings
    DoubleValue(f64),
    TimestampValue(String),
    StringValue(String),
    BytesValue(String),
    ReferenceValue(String),
    ArrayValue(ArrayValue),
    MapValue(MapValue),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayValue {
    pub values: Option<Vec<Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapValue {
    pub fields: Option<HashMap<String, Value>>,
}

/// Firestore document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Full resource name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Document fields
    pub fields: Option<Fields>,
    /// Create time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_time: Option<String>,
    /// Update time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_time: Option<String>,
}

impl Document {
    /// Create a new document with the given fields.
    pub fn new(fields: Fields) -> Self {
        Self {
            name: None,
            fields: Some(fields),
            create_time: None,
            update_time: None,
        }
    }

    /// Document ID: the last segment of the resource name.
    pub fn id(&self) -> Option<&str> {
        self.name
            .as_deref()
            .and_then(|name| name.rsplit('/').next())
            .filter(|id| !id.is_empty())
    }

    /// Raw field value.
    pub fn value(&self, field: &str) -> Option<&Value> {
        self.fields.as_ref()?.get(field)
    }

    /// Typed field value; `None` when absent or of another type.
    pub fn get<T: FromFirestoreValue>(&self, field: &str) -> Option<T> {
        self.value(field).and_then(T::from_firestore_value)
    }
}

// ============================================================================
// Query Types
// ============================================================================

/// Structured query, as accepted by `:runQuery`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<Vec<CollectionSelector>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_by: Option<Vec<Order>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<i32>,
}

impl StructuredQuery {
    /// Query over a single collection.
    pub fn collection(collection_id: impl Into<String>) -> Self {
        Self {
            from: Some(vec![CollectionSelector {
                collection_id: collection_id.into(),
                all_descendants: None,
            }]),
            ..Default::default()
        }
    }

    /// Append an ordering clause.
    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by.get_or_insert_with(Vec::new).push(Order {
            field: FieldReference {
                field_path: field.into(),
            },
            direction: direction.as_str().to_string(),
        });
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionSelector {
    pub collection_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub all_descendants: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldReference {
    pub field_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub field: FieldReference,
    pub direction: String,
}

/// Sort direction for ordered queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Ascending => "ASCENDING",
            Direction::Descending => "DESCENDING",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunQueryRequest {
    pub structured_query: StructuredQuery,
}

/// One element of the `:runQuery` response array.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunQueryResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<Document>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_time: Option<String>,
}

/// Write precondition, sent as `currentDocument.*` query parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Precondition {
    /// Document must (or must not) exist.
    pub exists: Option<bool>,
    /// Document must have this update time.
    pub update_time: Option<String>,
}

impl Precondition {
    pub fn must_exist() -> Self {
        Self {
            exists: Some(true),
            update_time: None,
        }
    }

    pub(crate) fn query_params(&self) -> Vec<String> {
        let mut params = Vec::new();
        if let Some(exists) = self.exists {
            params.push(format!("currentDocument.exists={}", exists));
        }
        if let Some(ts) = &self.update_time {
            params.push(format!("currentDocument.updateTime={}", urlencoding::encode(ts)));
        }
        params
    }
}

// ============================================================================
// Value Conversions
// ============================================================================

/// Convert a Rust value to Firestore Value.
pub trait ToFirestoreValue {
    fn to_firestore_value(&self) -> Value;
}

impl ToFirestoreValue for String {
    fn to_firestore_value(&self) -> Value {
        Value::StringValue(self.clone())
    }
}

impl ToFirestoreValue for &str {
    fn to_firestore_value(&self) -> Value {
        Value::StringValue(self.to_string())
    }
}

impl ToFirestoreValue for i64 {
    fn to_firestore_value(&self) -> Value {
        Value::IntegerValue(self.to_string())
    }
}

impl ToFirestoreValue for bool {
    fn to_firestore_value(&self) -> Value {
        Value::BooleanValue(*self)
    }
}

impl ToFirestoreValue for DateTime<Utc> {
    fn to_firestore_value(&self) -> Value {
        Value::TimestampValue(self.to_rfc3339())
    }
}

impl<T: ToFirestoreValue> ToFirestoreValue for Option<T> {
    fn to_firestore_value(&self) -> Value {
        match self {
            Some(v) => v.to_firestore_value(),
            None => Value::NullValue(()),
        }
    }
}

/// Convert Firestore Value to Rust type.
pub trait FromFirestoreValue: Sized {
    fn from_firestore_value(value: &Value) -> Option<Self>;
}

impl FromFirestoreValue for String {
    fn from_firestore_value(value: &Value) -> Option<Self> {
        match value {
            Value::StringValue(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl FromFirestoreValue for i64 {
    fn from_firestore_value(value: &Value) -> Option<Self> {
        match value {
            Value::IntegerValue(s) => s.parse().ok(),
            Value::DoubleValue(f) => Some(*f as i64),
            _ => None,
        }
    }
}

impl FromFirestoreValue for bool {
    fn from_firestore_value(value: &Value) -> Option<Self> {
        match value {
            Value::BooleanValue(b) => Some(*b),
            _ => None,
        }
    }
}

impl FromFirestoreValue for DateTime<Utc> {
    fn from_firestore_value(value: &Value) -> Option<Self> {
        match value {
            Value::TimestampValue(s) => DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.into()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_wire_format() {
        let json = serde_json::to_value(Value::IntegerValue("42".into())).unwrap();
        assert_eq!(json, serde_json::json!({"integerValue": "42"}));

        let value: Value = serde_json::from_str(r#"{"booleanValue": true}"#).unwrap();
        assert_eq!(value, Value::BooleanValue(true));

        let value: Value = serde_json::from_str(r#"{"nullValue": null}"#).unwrap();
        assert_eq!(value, Value::NullValue(()));
    }

    #[test]
    fn test_document_id_and_getters() {
        let mut fields = Fields::new();
        fields.insert("title".into(), "Hello".to_firestore_value());
        fields.insert("count".into(), 7i64.to_firestore_value());
        let mut doc = Document::new(fields);
        assert_eq!(doc.id(), None);

        doc.name = Some("projects/p/databases/(default)/documents/streams/abc123".into());
        assert_eq!(doc.id(), Some("abc123"));
        assert_eq!(doc.get::<String>("title").as_deref(), Some("Hello"));
        assert_eq!(doc.get::<i64>("count"), Some(7));
        assert_eq!(doc.get::<bool>("title"), None);
        assert_eq!(doc.get::<String>("missing"), None);
    }

    #[test]
    fn test_timestamp_round_trip() {
        let now = Utc::now();
        let parsed = DateTime::<Utc>::from_firestore_value(&now.to_firestore_value()).unwrap();
        assert_eq!(parsed, now);
    }

    #[test]
    fn test_structured_query_serialization() {
        let query = StructuredQuery::collection("streams").order_by("createdAt", Direction::Descending);
        let json = serde_json::to_value(&query).unwrap();
        assert_eq!(json["from"][0]["collectionId"], "streams");
        assert_eq!(json["orderBy"][0]["field"]["fieldPath"], "createdAt");
        assert_eq!(json["orderBy"][0]["direction"], "DESCENDING");
        assert!(json.get("limit").is_none());
    }

    #[test]
    fn test_precondition_params() {
        assert_eq!(
            Precondition::must_exist().query_params(),
            vec!["currentDocument.exists=true".to_string()]
        );
        let pre = Precondition {
            exists: None,
            update_time: Some("2024-01-01T00:00:00+00:00".into()),
        };
        assert_eq!(
            pre.query_params(),
            vec!["currentDocument.updateTime=2024-01-01T00%3A00%3A00%2B00%3A00".to_string()]
        );
    }
}
