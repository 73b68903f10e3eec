use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::FlowError;

/// A flow-scoped attribute map, one per session frame.
///
/// States, actions, guards and attribute mappers read and write these
/// attributes for the duration of a flow run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scope {
    attributes: HashMap<String, Value>,
}

impl Scope {
    /// Creates an empty scope.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a scope seeded with the given attributes.
    pub fn from_map(attributes: HashMap<String, Value>) -> Self {
        Self { attributes }
    }

    /// Returns the attribute stored under `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// Returns the attribute stored under `key` as a string slice.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(Value::as_str)
    }

    /// Returns the attribute stored under `key` as an integer.
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.attributes.get(key).and_then(Value::as_i64)
    }

    /// Returns the attribute stored under `key`, failing with a
    /// configuration error when it is absent.
    pub fn required(&self, key: &str) -> Result<&Value, FlowError> {
        self.attributes
            .get(key)
            .ok_or_else(|| FlowError::MissingAttribute(key.to_string()))
    }

    /// Stores an attribute, returning the previous value if any.
    pub fn set(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.attributes.insert(key.into(), value)
    }

    /// Removes an attribute, returning it if present.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.attributes.remove(key)
    }

    /// True when an attribute is stored under `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.attributes.contains_key(key)
    }

    /// Number of attributes in scope.
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// True when no attributes are in scope.
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Iterates over the attributes.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.attributes.iter()
    }

    /// Copies a snapshot of all attributes, for view models.
    pub fn to_model(&self) -> HashMap<String, Value> {
        self.attributes.clone()
    }
}
