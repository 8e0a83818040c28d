//! Filter documents and reserved field names
//!
//! A [`Document`] is the store-native representation shared by filters,
//! updates and persisted records: a JSON object keyed by field name. Filter
//! documents use a small operator vocabulary (`$ne`, `$regex`, `$in`, `$or`)
//! understood by every [`DocumentStore`](crate::store::DocumentStore).

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};

/// A store-native document (filter, update, or record).
pub type Document = Map<String, Value>;

/// Primary key field of every stored record.
pub const PRIMARY_KEY: &str = "_id";

/// Creation timestamp field; reads sort on it descending.
pub const CREATED_AT: &str = "created_at";

/// Last-update timestamp field.
pub const UPDATED_AT: &str = "updated_at";

/// Soft-delete timestamp field; `null` (or missing) means live.
pub const DELETED_AT: &str = "deleted_at";

/// Not-equal operator.
pub const OP_NE: &str = "$ne";

/// Pattern-match operator.
pub const OP_REGEX: &str = "$regex";

/// Set-membership operator.
pub const OP_IN: &str = "$in";

/// Boolean-or branch key.
pub const OP_OR: &str = "$or";

/// Partial-update operator.
pub const OP_SET: &str = "$set";

/// Returns a filter that only matches live (not soft-deleted) records.
#[must_use]
pub fn live_filter() -> Document {
    let mut doc = Document::new();
    doc.insert(DELETED_AT.to_string(), Value::Null);
    doc
}

/// Wraps `value` in a single-operator constraint, e.g. `{"$ne": value}`.
#[must_use]
pub fn constraint(op: &str, value: Value) -> Value {
    let mut doc = Document::new();
    doc.insert(op.to_string(), value);
    Value::Object(doc)
}

/// Builds a `{"$set": fields}` update document.
#[must_use]
pub fn set(fields: Document) -> Document {
    let mut doc = Document::new();
    doc.insert(OP_SET.to_string(), Value::Object(fields));
    doc
}

/// Builds a single-key document.
#[must_use]
pub fn single(key: impl Into<String>, value: Value) -> Document {
    let mut doc = Document::new();
    doc.insert(key.into(), value);
    doc
}

/// Returns `true` for the zero value of its JSON kind.
///
/// Zero values are `null`, `""`, `0`, `0.0`, `false`, `[]` and `{}`.
#[must_use]
pub fn is_zero(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

/// Formats a timestamp as stored: RFC 3339 in UTC with exactly three
/// fractional digits, so string order matches time order.
#[must_use]
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Rewrites an RFC 3339 string to the stored timestamp format.
///
/// Anything else (including `null`) is left untouched.
pub fn normalize_timestamp(value: &mut Value) {
    if let Some(at) = value.as_str().and_then(|s| DateTime::parse_from_rfc3339(s).ok()) {
        *value = Value::String(format_timestamp(at.with_timezone(&Utc)));
    }
}

/// Converts a field identifier to the store's snake_case naming.
///
/// All-uppercase names are lower-cased verbatim (`ID` → `id`); otherwise an
/// underscore is inserted before every interior uppercase letter.
///
/// ```rust
/// use acton_docstore::document::to_snake;
///
/// assert_eq!(to_snake("UserName"), "user_name");
/// assert_eq!(to_snake("ID"), "id");
/// assert_eq!(to_snake("created_at"), "created_at");
/// ```
#[must_use]
pub fn to_snake(name: &str) -> String {
    if name.to_uppercase() == name {
        return name.to_lowercase();
    }

    let mut out = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if i > 0 && c.is_ascii_uppercase() {
            out.push('_');
        }
        out.push(c);
    }
    out.to_lowercase()
}
