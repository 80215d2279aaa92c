use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Dynamically typed value of a record field.
///
/// Records carry no schema, so every field value is one of these variants.
/// Maps keep the order their entries were inserted in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Absence of a value
    Null,
    /// A boolean
    Bool(bool),
    /// A signed 64 bit integer
    Int(i64),
    /// A 64 bit float
    Float(f64),
    /// UTF-8 text
    String(String),
    /// Opaque bytes
    Bytes(Vec<u8>),
    /// A list of values
    List(Vec<Value>),
    /// String keyed, insertion ordered map of values
    Map(IndexMap<String, Value>),
}

impl Value {
    /// Short name of the variant, used in logs and error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::List(_) => "list",
            Value::Map(_) => "map",
        }
    }

    /// Returns `true` if this is [`Value::Null`]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

macro_rules! impl_from_scalar {
    ($($source:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$source> for Value {
                fn from(value: $source) -> Self {
                    Value::$variant(value.into())
                }
            }
        )*
    };
}
impl_from_scalar!(
    bool => Bool,
    i64 => Int,
    i32 => Int,
    u32 => Int,
    f64 => Float,
    f32 => Float,
    String => String,
    &str => String,
    Vec<u8> => Bytes,
    Vec<Value> => List,
    IndexMap<String, Value> => Map,
);

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                // u64 beyond i64::MAX or a real float
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(entries) => Value::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect(),
            ),
        }
    }
}
