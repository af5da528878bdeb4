//! Caller-owned context carried alongside a workflow run.
//!
//! The controller never interprets keys or values. Each pipeline stage owns
//! its own key namespace (for example `specs_loaded` or `selected_agents`),
//! and later updates to a key overwrite earlier ones.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Accumulated context, ordered by key so checkpoints serialize stably.
pub type Context = BTreeMap<String, ContextValue>;

/// A single context value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContextValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<ContextValue>),
    Map(BTreeMap<String, ContextValue>),
}

impl ContextValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ContextValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ContextValue::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ContextValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// False if this value, or any value nested in it, is a NaN or infinite
    /// float. JSON has no representation for those.
    pub fn is_finite(&self) -> bool {
        match self {
            ContextValue::Float(f) => f.is_finite(),
            ContextValue::List(items) => items.iter().all(ContextValue::is_finite),
            ContextValue::Map(map) => map.values().all(ContextValue::is_finite),
            _ => true,
        }
    }

    /// Parse a CLI-style literal: `true`/`false`, `null`, integers, floats,
    /// and JSON arrays/objects; anything else is kept as a plain string.
    pub fn parse_literal(raw: &str) -> Self {
        match serde_json::from_str::<ContextValue>(raw) {
            Ok(value) => value,
            Err(_) => ContextValue::String(raw.to_string()),
        }
    }
}

/// Shallow merge: every key in `update` replaces the same key in `context`.
pub fn merge(context: &mut Context, update: &Context) {
    for (key, value) in update {
        context.insert(key.clone(), value.clone());
    }
}

/// Reject updates that cannot be written to a checkpoint unchanged.
pub fn validate(update: &Context) -> Result<()> {
    match update.iter().find(|(_, value)| !value.is_finite()) {
        Some((key, _)) => Err(Error::Validation(format!(
            "context key '{}' holds a non-finite number",
            key
        ))),
        None => Ok(()),
    }
}

impl From<bool> for ContextValue {
    fn from(value: bool) -> Self {
        ContextValue::Bool(value)
    }
}

impl From<i64> for ContextValue {
    fn from(value: i64) -> Self {
        ContextValue::Integer(value)
    }
}

impl From<i32> for ContextValue {
    fn from(value: i32) -> Self {
        ContextValue::Integer(value.into())
    }
}

impl From<f64> for ContextValue {
    fn from(value: f64) -> Self {
        ContextValue::Float(value)
    }
}

impl From<&str> for ContextValue {
    fn from(value: &str) -> Self {
        ContextValue::String(value.to_string())
    }
}

impl From<String> for ContextValue {
    fn from(value: String) -> Self {
        ContextValue::String(value)
    }
}

impl<T: Into<ContextValue>> From<Vec<T>> for ContextValue {
    fn from(values: Vec<T>) -> Self {
        ContextValue::List(values.into_iter().map(Into::into).collect())
    }
}

impl From<BTreeMap<String, ContextValue>> for ContextValue {
    fn from(map: BTreeMap<String, ContextValue>) -> Self {
        ContextValue::Map(map)
    }
}
