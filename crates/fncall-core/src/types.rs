//! Value model shared by both translators.
//!
//! Both syntaxes translate into the same [`Value`] tree, so downstream code never
//! needs to know whether a call was spelled `f(a=1)` or `{"name": "f", ...}`.
//! Maps are backed by `IndexMap` to keep source order; keys are unique, and
//! inserting a duplicate is an error rather than an overwrite.

use crate::error::{Result, ToolCallError};
use indexmap::map::Entry;
use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, Serializer};

/// A translated literal. Numbers are always `f64`: an integer literal and a
/// float literal with the same value are indistinguishable once translated.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    List(Vec<Value>),
    Map(Map),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Map> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<Map> for Value {
    fn from(map: Map) -> Self {
        Value::Map(map)
    }
}

/// Ordered key → value map with unique keys.
///
/// Equality ignores entry order: two maps are equal when they hold the same
/// keys bound to equal values.
#[derive(Debug, Clone, Default)]
pub struct Map {
    entries: IndexMap<String, Value>,
}

impl Map {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: IndexMap::with_capacity(capacity),
        }
    }

    /// Build a map from `(key, value)` pairs, failing on the first repeated key.
    pub fn from_entries<K, I>(entries: I) -> Result<Self>
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        let mut map = Map::new();
        for (key, value) in entries {
            map.try_insert(key, value)?;
        }
        Ok(map)
    }

    /// Append an entry. Returns [`ToolCallError::DuplicateKey`] if `key` is
    /// already present; the existing entry is left untouched.
    pub fn try_insert(&mut self, key: impl Into<String>, value: Value) -> Result<()> {
        match self.entries.entry(key.into()) {
            Entry::Occupied(entry) => Err(ToolCallError::DuplicateKey(entry.key().clone())),
            Entry::Vacant(entry) => {
                entry.insert(value);
                Ok(())
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl PartialEq for Map {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(key, value)| other.get(key) == Some(value))
    }
}

impl Serialize for Map {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut out = serializer.serialize_map(Some(self.len()))?;
        for (key, value) in self.iter() {
            out.serialize_entry(key, value)?;
        }
        out.end()
    }
}

/// One parsed function call: a name plus its ordered, duplicate-free arguments.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Invocation {
    pub name: String,
    pub arguments: Map,
}

impl Invocation {
    pub fn new(name: impl Into<String>, arguments: Map) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }

    /// An invocation with no arguments (`f()` or the bare `f`).
    pub fn empty(name: impl Into<String>) -> Self {
        Self::new(name, Map::new())
    }
}
