//! Tagged query structs
//!
//! A query struct describes its filterable fields as a list of
//! [`QueryField`]s, each carrying a `criteria` tag:
//!
//! | tag                | effect                                              |
//! |--------------------|-----------------------------------------------------|
//! | `""`, `eq`, `=`    | equality                                            |
//! | `ne`, `!=`         | `{"$ne": value}`                                    |
//! | `like`             | `{"$regex": value}`                                 |
//! | `in`               | `{"$in": value}`; value must be a sequence          |
//! | `-`                | field omitted                                       |
//! | `nil…`             | zero value becomes `key: null`                      |
//! | `empty…`           | zero value becomes `key: <zero value>`              |
//! | `op,name`          | store key renamed to `name`                         |
//!
//! Zero-valued fields are skipped unless tagged `nil` or `empty`. A field
//! declared through [`criteria_query!`](crate::criteria_query) is zero when
//! it equals its type's `Default` (so `RecordId::NIL` and the epoch
//! `DateTime` count), or when its JSON form is empty. Keys are the
//! snake_case form of the field name.

use serde::Serialize;
use serde_json::Value;

use super::operator::FilterOperator;
use super::CriteriaError;
use crate::document::{is_zero, live_filter, to_snake, Document, PRIMARY_KEY};
use crate::ids::RecordId;

/// Tag value that excludes a field from the filter.
pub const SKIP_TAG: &str = "-";

/// One filterable field of a query struct.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryField {
    /// Field identifier as written in the struct
    pub name: String,
    /// `criteria` tag, `op[,rename]`
    pub tag: String,
    /// Serialized field value
    pub value: Value,
    /// Whether the value is its type's zero value
    pub zero: bool,
}

impl QueryField {
    /// Creates an untagged (equality) field.
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self::tagged(name, "", value)
    }

    /// Creates a tagged field.
    ///
    /// The field is zero when its JSON form is empty (`null`, `""`, `0`,
    /// `false`, `[]`, `{}`).
    pub fn tagged(name: impl Into<String>, tag: impl Into<String>, value: Value) -> Self {
        let zero = is_zero(&value);
        Self {
            name: name.into(),
            tag: tag.into(),
            value,
            zero,
        }
    }

    /// Creates a tagged field from any serializable value.
    ///
    /// A value that fails to serialize is treated as the zero value and
    /// logged.
    pub fn from_serialize<T: Serialize + ?Sized>(name: &str, tag: &str, value: &T) -> Self {
        let value = serde_json::to_value(value).unwrap_or_else(|e| {
            tracing::warn!(field = name, error = %e, "Query field failed to serialize, treating as zero value");
            Value::Null
        });
        Self::tagged(name, tag, value)
    }

    /// Creates a tagged field from a typed struct field.
    ///
    /// Besides an empty JSON form, a value equal to `T::default()` counts as
    /// zero. Used by [`criteria_query!`](crate::criteria_query).
    pub fn from_field<T: Serialize + Default>(name: &str, tag: &str, value: &T) -> Self {
        let mut field = Self::from_serialize(name, tag, value);
        if !field.zero {
            field.zero = serde_json::to_value(T::default()).is_ok_and(|d| d == field.value);
        }
        field
    }

    /// Replaces the tag.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }
}

/// A struct whose fields translate into a filter document.
///
/// Implement by hand, or declare with [`criteria_query!`](crate::criteria_query):
///
/// ```rust
/// use acton_docstore::criteria::{Criteria, CriteriaQuery};
///
/// #[derive(Default)]
/// struct UserQuery {
///     user_name: String,
///     age: i64,
///     status: Vec<String>,
///     secret: String,
/// }
///
/// acton_docstore::criteria_query!(UserQuery {
///     user_name => "like",
///     age,
///     status => "in",
///     secret => "-",
/// });
///
/// let q = UserQuery {
///     user_name: "^jo".into(),
///     status: vec!["active".into()],
///     secret: "hidden".into(),
///     ..Default::default()
/// };
/// let filter = Criteria::query(&q).filter().unwrap();
/// assert!(filter.contains_key("user_name"));
/// assert!(!filter.contains_key("age"));
/// assert!(!filter.contains_key("secret"));
/// ```
pub trait CriteriaQuery {
    /// The struct's fields with their tags and current values.
    fn criteria_fields(&self) -> Vec<QueryField>;
}

impl<Q: CriteriaQuery + ?Sized> CriteriaQuery for &Q {
    fn criteria_fields(&self) -> Vec<QueryField> {
        (**self).criteria_fields()
    }
}

/// Declares a [`CriteriaQuery`] implementation for a struct.
///
/// Each listed field may carry a tag after `=>`; unlisted fields are not part
/// of the query. Listed field types must implement `Serialize` and `Default`.
#[macro_export]
macro_rules! criteria_query {
    (@tag $tag:literal) => { $tag };
    (@tag) => { "" };
    ($ty:ty { $($field:ident $(=> $tag:literal)?),* $(,)? }) => {
        impl $crate::criteria::CriteriaQuery for $ty {
            fn criteria_fields(&self) -> ::std::vec::Vec<$crate::criteria::QueryField> {
                ::std::vec![$(
                    $crate::criteria::QueryField::from_field(
                        ::std::stringify!($field),
                        $crate::criteria_query!(@tag $($tag)?),
                        &self.$field,
                    )
                ),*]
            }
        }
    };
}

/// Query by primary key.
///
/// A nil id produces a filter without an id constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IdentityQuery {
    /// Identifier to match
    pub id: RecordId,
}

impl IdentityQuery {
    /// Creates a query for `id`.
    #[must_use]
    pub fn new(id: RecordId) -> Self {
        Self { id }
    }
}

impl CriteriaQuery for IdentityQuery {
    fn criteria_fields(&self) -> Vec<QueryField> {
        let value = if self.id.is_nil() {
            Value::Null
        } else {
            Value::String(self.id.as_string())
        };
        vec![QueryField::tagged("id", "eq,_id", value)]
    }
}

fn split_tag(tag: &str) -> (&str, Option<&str>) {
    match tag.split_once(',') {
        Some((op, rename)) => {
            let rename = rename.trim();
            (op.trim(), (!rename.is_empty()).then_some(rename))
        }
        None => (tag.trim(), None),
    }
}

/// Translates query fields into a filter document.
pub(crate) fn translate(fields: &[QueryField]) -> Result<Document, CriteriaError> {
    let mut filter = live_filter();

    for field in fields {
        let tag = field.tag.trim();
        let (op, rename) = split_tag(tag);
        let key = rename.map_or_else(|| to_snake(&field.name), str::to_string);

        if tag == SKIP_TAG {
            continue;
        }

        if field.zero {
            if op.starts_with("nil") {
                filter.insert(key, Value::Null);
            } else if op.starts_with("empty") {
                filter.insert(key, field.value.clone());
            }
            continue;
        }

        let constrained = FilterOperator::from_tag(op).constrain(&key, field.value.clone())?;
        filter.insert(key, constrained);
    }

    if !filter.contains_key(PRIMARY_KEY) {
        if let Some(id) = filter.remove("id") {
            if id.is_null() {
                filter.insert("id".to_string(), id);
            } else {
                filter.insert(PRIMARY_KEY.to_string(), id);
            }
        }
    }

    Ok(filter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Default)]
    struct UserQuery {
        user_name: String,
        age: i64,
        status: Vec<String>,
        nick: String,
        email: String,
        secret: String,
        id: String,
    }

    crate::criteria_query!(UserQuery {
        user_name => "like",
        age => "ne",
        status => "in",
        nick => "nil",
        email => "empty,mail",
        secret => "-",
        id,
    });

    fn build(q: &impl CriteriaQuery) -> Value {
        Value::Object(translate(&q.criteria_fields()).unwrap())
    }

    #[test]
    fn test_zero_fields_skipped() {
        let filter = build(&UserQuery::default());
        assert_eq!(
            filter,
            json!({"deleted_at": null, "nick": null, "mail": ""})
        );
    }

    #[derive(Default)]
    struct AuditQuery {
        id: RecordId,
        since: chrono::DateTime<chrono::Utc>,
        actor: String,
        owner: RecordId,
    }

    crate::criteria_query!(AuditQuery {
        id,
        since => "ne",
        actor,
        owner => "nil",
    });

    #[test]
    fn test_typed_zero_values_skipped() {
        let filter = build(&AuditQuery::default());
        assert_eq!(filter, json!({"deleted_at": null, "owner": null}));

        let id = RecordId::new();
        let since = chrono::DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let q = AuditQuery {
            id,
            since,
            actor: "ada".into(),
            ..Default::default()
        };
        assert_eq!(
            build(&q),
            json!({
                "deleted_at": null,
                "_id": id.to_string(),
                "since": {"$ne": serde_json::to_value(since).unwrap()},
                "actor": "ada",
                "owner": null
            })
        );
    }

    #[test]
    fn test_untyped_fields_use_json_zero() {
        let nil = QueryField::new("ref", json!(RecordId::NIL.to_string()));
        assert!(!nil.zero);
        assert!(QueryField::new("ref", json!("")).zero);
        assert!(QueryField::from_field("ref", "", &RecordId::NIL).zero);
        assert!(!QueryField::from_field("n", "", &5_i64).zero);
    }

    #[test]
    fn test_tagged_operators() {
        let q = UserQuery {
            user_name: "^jo".into(),
            age: 30,
            status: vec!["active".into(), "pending".into()],
            nick: "jj".into(),
            email: "jo@example.com".into(),
            ..Default::default()
        };
        assert_eq!(
            build(&q),
            json!({
                "deleted_at": null,
                "user_name": {"$regex": "^jo"},
                "age": {"$ne": 30},
                "status": {"$in": ["active", "pending"]},
                "nick": "jj",
                "mail": "jo@example.com"
            })
        );
    }

    #[test]
    fn test_skip_tag_omits_field() {
        let q = UserQuery {
            secret: "s3cret".into(),
            ..Default::default()
        };
        let filter = translate(&q.criteria_fields()).unwrap();
        assert!(!filter.contains_key("secret"));
    }

    #[test]
    fn test_id_rewritten_to_primary_key() {
        let q = UserQuery {
            id: "abc".into(),
            ..Default::default()
        };
        let filter = translate(&q.criteria_fields()).unwrap();
        assert_eq!(filter.get("_id"), Some(&json!("abc")));
        assert!(!filter.contains_key("id"));
    }

    #[test]
    fn test_nil_id_is_not_rewritten() {
        let fields = vec![QueryField::tagged("id", "nil", Value::Null)];
        let filter = translate(&fields).unwrap();
        assert_eq!(filter.get("id"), Some(&Value::Null));
        assert!(!filter.contains_key("_id"));
    }

    #[test]
    fn test_field_names_snake_cased() {
        let fields = vec![QueryField::new("UserName", json!("x"))];
        let filter = translate(&fields).unwrap();
        assert_eq!(filter.get("user_name"), Some(&json!("x")));
    }

    #[test]
    fn test_in_requires_sequence() {
        let fields = vec![QueryField::tagged("status", "in", json!("active"))];
        assert_eq!(
            translate(&fields).unwrap_err(),
            CriteriaError::InRequiresSequence {
                field: "status".into()
            }
        );
    }

    #[test]
    fn test_identity_query() {
        let id = RecordId::new();
        let filter = build(&IdentityQuery::new(id));
        assert_eq!(filter, json!({"deleted_at": null, "_id": id.to_string()}));

        let filter = build(&IdentityQuery::default());
        assert_eq!(filter, json!({"deleted_at": null}));
    }

    #[test]
    fn test_split_tag() {
        assert_eq!(split_tag("ne,other"), ("ne", Some("other")));
        assert_eq!(split_tag("like"), ("like", None));
        assert_eq!(split_tag("eq, "), ("eq", None));
    }
}
