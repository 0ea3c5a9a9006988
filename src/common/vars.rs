//! Named JSON values exchanged between the engine and its callers.

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value as JsonValue};

/// An ordered map of named JSON values.
///
/// Used for trigger payloads, executor result objects and the serialized
/// output of a finished execution.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Vars {
    inner: Map<String, JsonValue>,
}

impl Vars {
    /// create an empty set of vars
    pub fn new() -> Self {
        Self::default()
    }

    /// set a value, serializing it to JSON
    pub fn set<T: Serialize>(
        &mut self,
        key: impl Into<String>,
        value: T,
    ) {
        if let Ok(value) = serde_json::to_value(value) {
            self.inner.insert(key.into(), value);
        }
    }

    /// get a value, deserializing it from JSON
    pub fn get<T: DeserializeOwned>(
        &self,
        key: &str,
    ) -> Option<T> {
        self.inner.get(key).and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn contains_key(
        &self,
        key: &str,
    ) -> bool {
        self.inner.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> serde_json::map::Iter<'_> {
        self.inner.iter()
    }
}

impl From<Map<String, JsonValue>> for Vars {
    fn from(inner: Map<String, JsonValue>) -> Self {
        Self {
            inner,
        }
    }
}

impl From<JsonValue> for Vars {
    fn from(value: JsonValue) -> Self {
        match value {
            JsonValue::Object(inner) => Self {
                inner,
            },
            _ => Self::default(),
        }
    }
}

impl From<Vars> for JsonValue {
    fn from(vars: Vars) -> Self {
        JsonValue::Object(vars.inner)
    }
}

impl From<Vars> for Map<String, JsonValue> {
    fn from(vars: Vars) -> Self {
        vars.inner
    }
}
