//! Firestore REST documents and typed values.
//!
//! Firestore's REST API wraps every field in a single-key object naming its
//! type (`{"stringValue": "Hats"}`, `{"integerValue": "25"}`, ...). This
//! module converts between that encoding and plain `serde_json::Value`s so
//! the domain types only need ordinary serde derives.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::backend::BackendError;

/// A Firestore typed value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Value {
    NullValue(()),
    BooleanValue(bool),
    /// int64, transported as a decimal string.
    IntegerValue(String),
    DoubleValue(f64),
    /// RFC 3339 timestamp.
    TimestampValue(String),
    StringValue(String),
    MapValue(MapValue),
    ArrayValue(ArrayValue),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapValue {
    #[serde(default)]
    pub fields: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArrayValue {
    #[serde(default)]
    pub values: Vec<Value>,
}

/// Field map of a document.
pub type Fields = BTreeMap<String, Value>;

/// A Firestore document as returned by the REST API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Full resource name
    /// (`projects/{p}/databases/(default)/documents/{collection}/{id}`).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default)]
    pub fields: Fields,
}

impl Document {
    /// The last path segment of the resource name.
    #[must_use]
    pub fn id(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or_default()
    }

    /// Decode the fields into `T`.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Parse` if the fields do not match `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, BackendError> {
        decode_fields(self.fields.clone())
    }
}

/// Page of a collection listing.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListDocumentsResponse {
    #[serde(default)]
    pub documents: Vec<Document>,
    pub next_page_token: Option<String>,
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::NullValue(()),
            serde_json::Value::Bool(b) => Self::BooleanValue(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Self::IntegerValue(i.to_string()),
                None => Self::DoubleValue(n.as_f64().unwrap_or_default()),
            },
            serde_json::Value::String(s) => Self::StringValue(s),
            serde_json::Value::Array(values) => Self::ArrayValue(ArrayValue {
                values: values.into_iter().map(Self::from).collect(),
            }),
            serde_json::Value::Object(map) => Self::MapValue(MapValue {
                fields: map.into_iter().map(|(k, v)| (k, Self::from(v))).collect(),
            }),
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(value: Value) -> Self {
        match value {
            Value::NullValue(()) => Self::Null,
            Value::BooleanValue(b) => Self::Bool(b),
            Value::IntegerValue(s) => s
                .parse::<i64>()
                .map_or(Self::String(s), |i| Self::Number(i.into())),
            Value::DoubleValue(f) => serde_json::Number::from_f64(f).map_or(Self::Null, Self::Number),
            Value::TimestampValue(s) | Value::StringValue(s) => Self::String(s),
            Value::MapValue(map) => Self::Object(
                map.fields
                    .into_iter()
                    .map(|(k, v)| (k, Self::from(v)))
                    .collect(),
            ),
            Value::ArrayValue(array) => {
                Self::Array(array.values.into_iter().map(Self::from).collect())
            }
        }
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Self::TimestampValue(value.to_rfc3339_opts(SecondsFormat::Micros, true))
    }
}

/// Encode any serializable struct as document fields.
///
/// # Errors
///
/// Returns `BackendError::Unexpected` if `value` does not serialize to a JSON
/// object, or `BackendError::Parse` if it fails to serialize at all.
pub fn encode_fields<T: Serialize>(value: &T) -> Result<Fields, BackendError> {
    match serde_json::to_value(value)? {
        serde_json::Value::Object(map) => Ok(map
            .into_iter()
            .map(|(k, v)| (k, Value::from(v)))
            .collect()),
        other => Err(BackendError::Unexpected(format!(
            "document fields must be an object, got {other}"
        ))),
    }
}

/// Decode document fields into `T`.
///
/// # Errors
///
/// Returns `BackendError::Parse` if the fields do not match `T`.
pub fn decode_fields<T: DeserializeOwned>(fields: Fields) -> Result<T, BackendError> {
    let object: serde_json::Map<String, serde_json::Value> = fields
        .into_iter()
        .map(|(k, v)| (k, serde_json::Value::from(v)))
        .collect();
    Ok(serde_json::from_value(serde_json::Value::Object(object))?)
}
