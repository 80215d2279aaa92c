use std::fmt::Display;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Value;

/// Identifies a record towards the pipeline when acknowledging it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId(pub u64);

impl From<u64> for RecordId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A single unit of data flowing through the pipeline.
///
/// A record is an ordered collection of named fields. The order is the order
/// in which fields were added and is never changed afterwards: setting a field
/// which already exists replaces its value in place.
///
/// ```rust
/// use sluice_core::{Record, Value};
///
/// let record = Record::new(7)
///     .with_field("user_id", "u42")
///     .with_field("score", 99);
///
/// let names: Vec<&str> = record.field_names().collect();
/// assert_eq!(names, vec!["user_id", "score"]);
/// assert_eq!(record.value_of("score"), Some(&Value::Int(99)));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    id: RecordId,
    fields: IndexMap<String, Value>,
}

impl Record {
    /// Create a record without any fields
    pub fn new(id: u64) -> Self {
        Self {
            id: RecordId(id),
            fields: IndexMap::new(),
        }
    }

    /// Build a record from a JSON object, keeping the key order of the object.
    /// Anything but an object is rejected.
    pub fn from_json(id: u64, json: serde_json::Value) -> Result<Self, RecordError> {
        match json {
            serde_json::Value::Object(entries) => Ok(entries
                .into_iter()
                .fold(Self::new(id), |record, (k, v)| record.with_field(k, v))),
            other => Err(RecordError::NotAnObject {
                id: RecordId(id),
                found: Value::from(other).kind(),
            }),
        }
    }

    /// Add a field, or replace the value of an existing one
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Set a field. Returns the previous value if the field already existed,
    /// in which case the field keeps its position.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(name.into(), value.into())
    }

    /// Id of this record
    pub fn id(&self) -> RecordId {
        self.id
    }

    /// Names of all fields in declared order
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Value of the field with the given name
    pub fn value_of(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// All `(name, value)` pairs in declared order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True if the record has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Errors when constructing records
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    /// Records can only be built from JSON objects
    #[error("Record {id} must be a JSON object, found {found}")]
    NotAnObject {
        /// Id the record would have had
        id: RecordId,
        /// Kind of the value which was found instead
        found: &'static str,
    },
}
