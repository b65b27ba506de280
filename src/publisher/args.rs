// src/publisher/args.rs
//! Values a scripting host hands to `publish`, and the classification of
//! trailing arguments into headers or body chunks.

use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

pub type HeaderMap = BTreeMap<String, ScriptValue>;

/// A dynamically typed argument coming from the host environment.
///
/// Deserializes untagged, so any self-describing format (JSON in the CLI)
/// maps straight onto it. Arrays always come back as `List`; `Bytes` only
/// comes from the host side.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ScriptValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<ScriptValue>),
    Map(HeaderMap),
    Bytes(Vec<u8>),
}

impl ScriptValue {
    /// Build a `Map` value from key/value pairs.
    pub fn map<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, ScriptValue)>,
    {
        ScriptValue::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ScriptValue::Null => "null",
            ScriptValue::Bool(_) => "bool",
            ScriptValue::Int(_) => "int",
            ScriptValue::Float(_) => "float",
            ScriptValue::Text(_) => "text",
            ScriptValue::Bytes(_) => "bytes",
            ScriptValue::List(_) => "list",
            ScriptValue::Map(_) => "map",
        }
    }

    fn to_json(&self) -> Value {
        match self {
            ScriptValue::Null => Value::Null,
            ScriptValue::Bool(b) => Value::Bool(*b),
            ScriptValue::Int(i) => Value::from(*i),
            ScriptValue::Float(f) => Value::from(*f),
            ScriptValue::Text(s) => Value::String(s.clone()),
            ScriptValue::Bytes(b) => Value::String(String::from_utf8_lossy(b).into_owned()),
            ScriptValue::List(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            ScriptValue::Map(map) => Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }
}

/// The stringified form used for exchange names, routing keys and the
/// dedicated message properties.
impl fmt::Display for ScriptValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptValue::Null => f.write_str("null"),
            ScriptValue::Bool(b) => write!(f, "{}", b),
            ScriptValue::Int(i) => write!(f, "{}", i),
            ScriptValue::Float(x) => write!(f, "{}", x),
            ScriptValue::Text(s) => f.write_str(s),
            ScriptValue::Bytes(b) => f.write_str(&String::from_utf8_lossy(b)),
            ScriptValue::List(_) | ScriptValue::Map(_) => write!(f, "{}", self.to_json()),
        }
    }
}

impl From<Value> for ScriptValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => ScriptValue::Null,
            Value::Bool(b) => ScriptValue::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => ScriptValue::Int(i),
                // u64 beyond i64::MAX and real numbers both land here
                None => ScriptValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => ScriptValue::Text(s),
            Value::Array(items) => ScriptValue::List(items.into_iter().map(Into::into).collect()),
            Value::Object(map) => {
                ScriptValue::Map(map.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

impl From<&str> for ScriptValue {
    fn from(s: &str) -> Self {
        ScriptValue::Text(s.to_string())
    }
}

impl From<String> for ScriptValue {
    fn from(s: String) -> Self {
        ScriptValue::Text(s)
    }
}

impl From<Vec<u8>> for ScriptValue {
    fn from(b: Vec<u8>) -> Self {
        ScriptValue::Bytes(b)
    }
}

impl From<&[u8]> for ScriptValue {
    fn from(b: &[u8]) -> Self {
        ScriptValue::Bytes(b.to_vec())
    }
}

impl From<i64> for ScriptValue {
    fn from(i: i64) -> Self {
        ScriptValue::Int(i)
    }
}

impl From<i32> for ScriptValue {
    fn from(i: i32) -> Self {
        ScriptValue::Int(i64::from(i))
    }
}

impl From<f64> for ScriptValue {
    fn from(x: f64) -> Self {
        ScriptValue::Float(x)
    }
}

impl From<bool> for ScriptValue {
    fn from(b: bool) -> Self {
        ScriptValue::Bool(b)
    }
}

impl From<HeaderMap> for ScriptValue {
    fn from(map: HeaderMap) -> Self {
        ScriptValue::Map(map)
    }
}

/// What a trailing publish argument contributes to the message.
#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    Headers(HeaderMap),
    Binary(Vec<u8>),
    Text(String),
    /// Any other kind of value. Ignored by the publisher.
    Unrecognized(&'static str),
}

impl Part {
    pub fn classify(value: ScriptValue) -> Self {
        match value {
            ScriptValue::Map(map) => Part::Headers(map),
            ScriptValue::Bytes(bytes) => Part::Binary(bytes),
            ScriptValue::Text(text) => Part::Text(text),
            other => Part::Unrecognized(other.kind()),
        }
    }
}
