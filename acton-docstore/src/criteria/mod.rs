//! Criteria query translation
//!
//! [`Criteria`] captures *what* to match and turns it into a store filter
//! [`Document`]. Four input shapes are accepted:
//!
//! - a pseudo-SQL expression with positional `?` arguments
//!   ([`Criteria::expr`], [`criteria!`](crate::criteria));
//! - a tagged query struct ([`Criteria::query`], [`CriteriaQuery`]);
//! - any serializable struct, matched field by field ([`Criteria::object`]);
//! - a ready-made filter document ([`Criteria::document`]).
//!
//! Every filter starts from `{"deleted_at": null}` so soft-deleted records
//! are excluded unless the caller targets `deleted_at` explicitly.
//!
//! # Example
//!
//! ```rust
//! use acton_docstore::criteria;
//! use serde_json::json;
//!
//! let filter = criteria!("name like ? OR age = ?", "^jo", 30).filter().unwrap();
//! assert_eq!(
//!     serde_json::Value::Object(filter),
//!     json!({"deleted_at": null, "$or": [{"name": {"$regex": "^jo"}}, {"age": 30}]})
//! );
//!
//! // Argument count must match the number of placeholders
//! assert!(criteria!("name = ? AND age = ?", "jo").filter().is_none());
//! ```

mod descriptor;
mod expression;
mod operator;

pub use descriptor::{CriteriaQuery, IdentityQuery, QueryField, SKIP_TAG};
pub use operator::FilterOperator;

use serde::Serialize;
use serde_json::Value;

use crate::document::{live_filter, Document};

/// Error building a filter from criteria
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CriteriaError {
    /// Number of `?` placeholders differs from the number of arguments
    #[error("expression has {placeholders} placeholders but {args} arguments were supplied")]
    PlaceholderMismatch {
        /// Placeholders found in the expression
        placeholders: usize,
        /// Arguments supplied
        args: usize,
    },

    /// A clause is not exactly `field operator value`
    #[error("malformed clause '{0}': expected `field operator value`")]
    MalformedClause(String),

    /// The operator token is not one of `=`, `!=`, `like`, `in`
    #[error("unsupported operator '{operator}' in clause '{clause}'")]
    UnsupportedOperator {
        /// The offending clause
        clause: String,
        /// The unrecognized operator token
        operator: String,
    },

    /// An `in` constraint was given a non-sequence value
    #[error("'in' on field '{field}' requires a sequence value")]
    InRequiresSequence {
        /// Field the constraint applies to
        field: String,
    },

    /// A criteria value did not serialize to a JSON object
    #[error("criteria value is not an object")]
    NotAnObject,

    /// A criteria argument failed to serialize
    #[error("failed to serialize criteria value: {0}")]
    Serialization(String),
}

#[derive(Debug, Clone, PartialEq)]
enum Source {
    All,
    Document(Document),
    Fields(Vec<QueryField>),
    Expression { sql: String, args: Vec<Value> },
}

/// A query to translate into a store filter.
///
/// Construction never fails; errors are carried inside and surface from
/// [`build`](Self::build).
#[derive(Debug, Clone, PartialEq)]
pub struct Criteria {
    source: Source,
    error: Option<CriteriaError>,
}

impl Default for Criteria {
    fn default() -> Self {
        Self::all()
    }
}

impl Criteria {
    fn from_source(source: Source) -> Self {
        Self {
            source,
            error: None,
        }
    }

    fn failed(error: CriteriaError) -> Self {
        Self {
            source: Source::All,
            error: Some(error),
        }
    }

    /// Matches every live record.
    #[must_use]
    pub fn all() -> Self {
        Self::from_source(Source::All)
    }

    /// Builds criteria from an expression and positional arguments.
    ///
    /// The placeholder count is validated immediately; a mismatch is
    /// recorded and reported by [`build`](Self::build).
    pub fn expr(sql: impl Into<String>, args: Vec<Value>) -> Self {
        let sql = sql.into();
        let placeholders = expression::count_placeholders(&sql);
        if placeholders != args.len() {
            return Self::failed(CriteriaError::PlaceholderMismatch {
                placeholders,
                args: args.len(),
            });
        }
        Self::from_source(Source::Expression { sql, args })
    }

    /// Like [`expr`](Self::expr), for arguments that were serialized by the
    /// caller. The first serialization failure is recorded.
    pub fn expr_serialized(
        sql: impl Into<String>,
        args: Vec<Result<Value, CriteriaError>>,
    ) -> Self {
        match args.into_iter().collect::<Result<Vec<_>, _>>() {
            Ok(args) => Self::expr(sql, args),
            Err(e) => Self::failed(e),
        }
    }

    /// Builds criteria from a tagged query struct.
    pub fn query<Q: CriteriaQuery + ?Sized>(query: &Q) -> Self {
        Self::from_source(Source::Fields(query.criteria_fields()))
    }

    /// Builds criteria from an untagged serializable struct.
    ///
    /// Every field becomes an equality constraint; zero values are skipped.
    pub fn object<T: Serialize + ?Sized>(value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(Value::Object(map)) => Self::from_source(Source::Fields(
                map.into_iter()
                    .map(|(name, value)| QueryField::new(name, value))
                    .collect(),
            )),
            Ok(_) => Self::failed(CriteriaError::NotAnObject),
            Err(e) => Self::failed(CriteriaError::Serialization(e.to_string())),
        }
    }

    /// Uses a ready-made filter document, merged over the live filter.
    #[must_use]
    pub fn document(doc: Document) -> Self {
        Self::from_source(Source::Document(doc))
    }

    /// The recorded construction error, if any.
    #[must_use]
    pub fn error(&self) -> Option<&CriteriaError> {
        self.error.as_ref()
    }

    /// Builds the filter document.
    ///
    /// # Errors
    ///
    /// Returns the construction error, or the first translation error.
    pub fn build(&self) -> Result<Document, CriteriaError> {
        if let Some(e) = &self.error {
            return Err(e.clone());
        }

        match &self.source {
            Source::All => Ok(live_filter()),
            Source::Document(doc) => {
                let mut filter = live_filter();
                filter.extend(doc.clone());
                Ok(filter)
            }
            Source::Fields(fields) => descriptor::translate(fields),
            Source::Expression { sql, args } => expression::translate(sql, args),
        }
    }

    /// Builds the filter document, or `None` if the criteria are invalid.
    #[must_use]
    pub fn filter(&self) -> Option<Document> {
        self.build().ok()
    }
}

/// Serializes a criteria argument. Used by [`criteria!`](crate::criteria).
#[doc(hidden)]
pub fn to_arg<T: Serialize + ?Sized>(value: &T) -> Result<Value, CriteriaError> {
    serde_json::to_value(value).map_err(|e| CriteriaError::Serialization(e.to_string()))
}

impl From<&str> for Criteria {
    fn from(sql: &str) -> Self {
        Self::expr(sql, Vec::new())
    }
}

impl From<String> for Criteria {
    fn from(sql: String) -> Self {
        Self::expr(sql, Vec::new())
    }
}

impl From<Document> for Criteria {
    fn from(doc: Document) -> Self {
        Self::document(doc)
    }
}

impl From<IdentityQuery> for Criteria {
    fn from(query: IdentityQuery) -> Self {
        Self::query(&query)
    }
}

impl<Q: CriteriaQuery> From<&Q> for Criteria {
    fn from(query: &Q) -> Self {
        Self::query(query)
    }
}

/// Builds [`Criteria`] from an expression and positional arguments.
///
/// Arguments may be any serializable value.
///
/// ```rust
/// use acton_docstore::criteria;
///
/// let c = criteria!("status in ?", vec!["active", "pending"]);
/// assert!(c.filter().is_some());
///
/// let all = criteria!("");
/// assert_eq!(all.filter().unwrap().len(), 1);
/// ```
#[macro_export]
macro_rules! criteria {
    ($sql:expr $(,)?) => {
        $crate::criteria::Criteria::expr($sql, ::std::vec::Vec::new())
    };
    ($sql:expr, $($arg:expr),+ $(,)?) => {
        $crate::criteria::Criteria::expr_serialized(
            $sql,
            ::std::vec![$($crate::criteria::to_arg(&$arg)),+],
        )
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::RecordId;
    use serde_json::json;

    #[test]
    fn test_placeholder_mismatch() {
        let c = Criteria::expr("a = ? AND b = ?", vec![json!(1)]);
        assert_eq!(
            c.build().unwrap_err(),
            CriteriaError::PlaceholderMismatch {
                placeholders: 2,
                args: 1
            }
        );
        assert!(c.filter().is_none());
        assert!(c.error().is_some());
    }

    #[test]
    fn test_criteria_macro() {
        let filter = crate::criteria!("f1 = ? AND f2 != ?", "a", 2).filter().unwrap();
        assert_eq!(
            Value::Object(filter),
            json!({"deleted_at": null, "f1": "a", "f2": {"$ne": 2}})
        );

        let id = RecordId::new();
        let filter = crate::criteria!("id = ?", id).filter().unwrap();
        assert_eq!(filter.get("_id"), Some(&json!(id.to_string())));
    }

    #[test]
    fn test_all_and_default() {
        assert_eq!(Criteria::all().filter().unwrap(), live_filter());
        assert_eq!(Criteria::default(), Criteria::all());
    }

    #[test]
    fn test_document_merges_over_live_filter() {
        let mut doc = Document::new();
        doc.insert("name".into(), json!("x"));
        let filter = Criteria::from(doc).filter().unwrap();
        assert_eq!(
            Value::Object(filter),
            json!({"deleted_at": null, "name": "x"})
        );

        let mut doc = Document::new();
        doc.insert("deleted_at".into(), json!({"$ne": null}));
        let filter = Criteria::document(doc).filter().unwrap();
        assert_eq!(Value::Object(filter), json!({"deleted_at": {"$ne": null}}));
    }

    #[test]
    fn test_object_criteria() {
        #[derive(Serialize)]
        struct Filter {
            name: String,
            age: i64,
        }

        let filter = Criteria::object(&Filter {
            name: "jo".into(),
            age: 0,
        })
        .filter()
        .unwrap();
        assert_eq!(Value::Object(filter), json!({"deleted_at": null, "name": "jo"}));

        let c = Criteria::object(&42);
        assert_eq!(c.build().unwrap_err(), CriteriaError::NotAnObject);
    }

    #[test]
    fn test_from_str_without_placeholders() {
        let filter = Criteria::from("status = active").filter().unwrap();
        assert_eq!(filter.get("status"), Some(&json!("active")));

        assert!(Criteria::from("status = ?").filter().is_none());
    }

    #[test]
    fn test_identity_query_conversion() {
        let id = RecordId::new();
        let filter = Criteria::from(IdentityQuery::new(id)).filter().unwrap();
        assert_eq!(filter.get("_id"), Some(&json!(id.to_string())));
    }
}
