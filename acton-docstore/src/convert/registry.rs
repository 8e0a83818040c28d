//! Pluggable value coercions between field kinds

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use super::FieldKind;
use crate::ids::RecordId;

/// A coercion from one serialized field value to another.
///
/// Returns a message describing the failure when the value cannot be
/// converted.
pub type Coercion = Arc<dyn Fn(&Value) -> Result<Value, String> + Send + Sync>;

/// Coercions keyed by `(source kind, destination kind)`.
///
/// The default registry converts identifiers to and from text and
/// timestamps to and from epoch milliseconds.
///
/// ```rust
/// use acton_docstore::convert::{CoercionRegistry, FieldKind};
/// use serde_json::{json, Value};
///
/// let mut registry = CoercionRegistry::default();
/// registry.register(FieldKind::Bool, FieldKind::Text, |v: &Value| {
///     Ok(Value::String(v.to_string()))
/// });
///
/// let text = registry.coerce(FieldKind::Bool, FieldKind::Text, &json!(true));
/// assert_eq!(text, Some(Ok(json!("true"))));
/// ```
#[derive(Clone)]
pub struct CoercionRegistry {
    rules: HashMap<(FieldKind, FieldKind), Coercion>,
}

impl fmt::Debug for CoercionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut pairs: Vec<String> = self
            .rules
            .keys()
            .map(|(from, to)| format!("{from}->{to}"))
            .collect();
        pairs.sort();
        f.debug_struct("CoercionRegistry")
            .field("rules", &pairs)
            .finish()
    }
}

impl Default for CoercionRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry
            .register(FieldKind::Id, FieldKind::Text, id_to_text)
            .register(FieldKind::Text, FieldKind::Id, text_to_id)
            .register(FieldKind::Timestamp, FieldKind::Millis, timestamp_to_millis)
            .register(FieldKind::Millis, FieldKind::Timestamp, millis_to_timestamp)
            .register(FieldKind::Timestamp, FieldKind::Integer, timestamp_to_millis)
            .register(FieldKind::Integer, FieldKind::Timestamp, millis_to_timestamp)
            .register(FieldKind::Millis, FieldKind::Integer, integer_passthrough)
            .register(FieldKind::Integer, FieldKind::Millis, integer_passthrough);
        registry
    }
}

impl CoercionRegistry {
    /// A registry with no coercions.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            rules: HashMap::new(),
        }
    }

    /// Register (or replace) the coercion for a kind pair.
    pub fn register<F>(&mut self, from: FieldKind, to: FieldKind, coercion: F) -> &mut Self
    where
        F: Fn(&Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.rules.insert((from, to), Arc::new(coercion));
        self
    }

    /// Builder-style [`register`](Self::register).
    #[must_use]
    pub fn with<F>(mut self, from: FieldKind, to: FieldKind, coercion: F) -> Self
    where
        F: Fn(&Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.register(from, to, coercion);
        self
    }

    /// The coercion for a kind pair, if registered.
    #[must_use]
    pub fn get(&self, from: FieldKind, to: FieldKind) -> Option<&Coercion> {
        self.rules.get(&(from, to))
    }

    /// Whether a kind pair has a coercion.
    #[must_use]
    pub fn contains(&self, from: FieldKind, to: FieldKind) -> bool {
        self.rules.contains_key(&(from, to))
    }

    /// Apply the coercion for a kind pair; `None` if none is registered.
    pub fn coerce(
        &self,
        from: FieldKind,
        to: FieldKind,
        value: &Value,
    ) -> Option<Result<Value, String>> {
        self.get(from, to).map(|c| c(value))
    }
}

fn id_to_text(value: &Value) -> Result<Value, String> {
    match value {
        Value::String(_) => Ok(value.clone()),
        other => Err(format!("expected an id string, got {other}")),
    }
}

fn text_to_id(value: &Value) -> Result<Value, String> {
    match value {
        Value::String(s) if s.is_empty() => Ok(Value::String(RecordId::NIL.as_string())),
        Value::String(s) => RecordId::from_str(s)
            .map(|id| Value::String(id.as_string()))
            .map_err(|e| e.to_string()),
        other => Err(format!("expected a string, got {other}")),
    }
}

fn timestamp_to_millis(value: &Value) -> Result<Value, String> {
    let s = value
        .as_str()
        .ok_or_else(|| format!("expected an RFC 3339 string, got {value}"))?;
    let dt = DateTime::parse_from_rfc3339(s).map_err(|e| e.to_string())?;
    Ok(Value::from(dt.timestamp_millis()))
}

fn millis_to_timestamp(value: &Value) -> Result<Value, String> {
    let ms = value
        .as_i64()
        .ok_or_else(|| format!("expected integer milliseconds, got {value}"))?;
    let dt: DateTime<Utc> = Utc
        .timestamp_millis_opt(ms)
        .single()
        .ok_or_else(|| format!("{ms} ms is out of range"))?;
    serde_json::to_value(dt).map_err(|e| e.to_string())
}

fn integer_passthrough(value: &Value) -> Result<Value, String> {
    match value {
        Value::Number(n) if n.is_i64() || n.is_u64() => Ok(value.clone()),
        other => Err(format!("expected an integer, got {other}")),
    }
}
