//! Dynamic values returned by handlers.
//!
//! Handlers return loosely typed data (maps, strings, status codes,
//! entities). `Value` is the closed set of shapes they can produce and
//! `to_json` is the encoder that turns it into a JSON document.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::error::SerializationError;

/// A record-like object handlers can return directly.
///
/// Entities either provide a custom serialization through [`Entity::to_value`]
/// or fall back to a dump of their fields.
pub trait Entity: Send + Sync + fmt::Debug {
    /// Type name used in error messages.
    fn class_name(&self) -> &str;

    /// Attribute dump used when there is no custom serialization.
    fn fields(&self) -> BTreeMap<String, Value>;

    /// Custom serialization. `None` means "use [`Entity::fields`]".
    fn to_value(&self) -> Option<Result<Value, EntityError>> {
        None
    }
}

/// Error raised by an entity's custom serialization.
#[derive(Debug, Clone)]
pub struct EntityError {
    pub error_type: String,
    pub message: String,
}

impl EntityError {
    pub fn new(error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_type: error_type.into(),
            message: message.into(),
        }
    }

    /// Capture an error together with its concrete type name.
    pub fn from_error<E: std::error::Error>(err: &E) -> Self {
        Self::new(std::any::type_name::<E>(), err.to_string())
    }
}

/// A dynamically typed handler value.
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Entity(Arc<dyn Entity>),
}

impl Value {
    /// Wrap an entity.
    pub fn entity<E: Entity + 'static>(entity: E) -> Self {
        Value::Entity(Arc::new(entity))
    }

    /// Short type name for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "none",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Text(_) => "str",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Entity(_) => "entity",
        }
    }

    /// Maps and entities are encoded as JSON documents.
    pub fn is_data(&self) -> bool {
        matches!(self, Value::Map(_) | Value::Entity(_))
    }

    /// Encode to JSON, calling entity serialization hooks on the way.
    pub fn to_json(&self) -> Result<serde_json::Value, SerializationError> {
        Ok(match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .ok_or_else(|| SerializationError {
                    class_name: "float".to_string(),
                    error_type: "NonFiniteFloat".to_string(),
                    message: format!("{f} has no JSON representation"),
                })?,
            Value::Text(s) => serde_json::Value::String(s.clone()),
            Value::List(items) => serde_json::Value::Array(
                items
                    .iter()
                    .map(Value::to_json)
                    .collect::<Result<_, _>>()?,
            ),
            Value::Map(map) => map_to_json(map)?,
            Value::Entity(entity) => entity_to_json(entity.as_ref())?,
        })
    }
}

fn map_to_json(map: &BTreeMap<String, Value>) -> Result<serde_json::Value, SerializationError> {
    let mut out = serde_json::Map::with_capacity(map.len());
    for (key, value) in map {
        out.insert(key.clone(), value.to_json()?);
    }
    Ok(serde_json::Value::Object(out))
}

fn entity_to_json(entity: &dyn Entity) -> Result<serde_json::Value, SerializationError> {
    match entity.to_value() {
        Some(Ok(value)) => value.to_json(),
        Some(Err(err)) => Err(SerializationError {
            class_name: entity.class_name().to_string(),
            error_type: err.error_type,
            message: err.message.split_whitespace().collect::<Vec<_>>().join(" "),
        }),
        None => map_to_json(&entity.fields()),
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or_default()),
            },
            serde_json::Value::String(s) => Value::Text(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Value::Map(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<u16> for Value {
    fn from(i: u16) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Null
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Value::Map(map)
    }
}
