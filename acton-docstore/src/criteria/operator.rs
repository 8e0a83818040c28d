//! Filter operators shared by expressions and tagged queries

use std::fmt;

use serde_json::Value;

use super::CriteriaError;
use crate::document::{constraint, OP_IN, OP_NE, OP_REGEX};

/// Comparison operators for filter clauses
///
/// # Example
///
/// ```rust
/// use acton_docstore::criteria::FilterOperator;
///
/// assert_eq!(format!("{}", FilterOperator::Equal), "=");
/// assert_eq!(format!("{}", FilterOperator::Like), "like");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FilterOperator {
    /// Equal to (=)
    #[default]
    Equal,
    /// Not equal to (!=)
    NotEqual,
    /// Pattern matching (like), translated to `$regex`
    Like,
    /// Value is in a list (in), translated to `$in`
    In,
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equal => write!(f, "="),
            Self::NotEqual => write!(f, "!="),
            Self::Like => write!(f, "like"),
            Self::In => write!(f, "in"),
        }
    }
}

impl FilterOperator {
    /// Parses an operator token of an expression clause.
    ///
    /// Expression operators are case-sensitive: `=`, `!=`, `like`, `in`.
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "=" => Some(Self::Equal),
            "!=" => Some(Self::NotEqual),
            "like" => Some(Self::Like),
            "in" => Some(Self::In),
            _ => None,
        }
    }

    /// Parses the operator part of a `criteria` tag.
    ///
    /// Empty or unrecognized tags fall back to equality.
    #[must_use]
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim() {
            "ne" | "!=" => Self::NotEqual,
            "like" => Self::Like,
            "in" => Self::In,
            _ => Self::Equal,
        }
    }

    /// Wraps `value` in the store-native constraint for this operator.
    ///
    /// # Errors
    ///
    /// Returns [`CriteriaError::InRequiresSequence`] when `In` receives a
    /// value that is not an array.
    pub fn constrain(&self, field: &str, value: Value) -> Result<Value, CriteriaError> {
        match self {
            Self::Equal => Ok(value),
            Self::NotEqual => Ok(constraint(OP_NE, value)),
            Self::Like => Ok(constraint(OP_REGEX, value)),
            Self::In => match value {
                Value::Array(_) => Ok(constraint(OP_IN, value)),
                _ => Err(CriteriaError::InRequiresSequence {
                    field: field.to_string(),
                }),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_filter_operator_display() {
        assert_eq!(format!("{}", FilterOperator::Equal), "=");
        assert_eq!(format!("{}", FilterOperator::NotEqual), "!=");
        assert_eq!(format!("{}", FilterOperator::Like), "like");
        assert_eq!(format!("{}", FilterOperator::In), "in");
    }

    #[test]
    fn test_from_token_is_case_sensitive() {
        assert_eq!(FilterOperator::from_token("like"), Some(FilterOperator::Like));
        assert_eq!(FilterOperator::from_token("LIKE"), None);
        assert_eq!(FilterOperator::from_token(">"), None);
    }

    #[test]
    fn test_from_tag_defaults_to_equal() {
        assert_eq!(FilterOperator::from_tag(""), FilterOperator::Equal);
        assert_eq!(FilterOperator::from_tag("eq"), FilterOperator::Equal);
        assert_eq!(FilterOperator::from_tag("="), FilterOperator::Equal);
        assert_eq!(FilterOperator::from_tag("gte"), FilterOperator::Equal);
        assert_eq!(FilterOperator::from_tag("ne"), FilterOperator::NotEqual);
        assert_eq!(FilterOperator::from_tag("!="), FilterOperator::NotEqual);
        assert_eq!(FilterOperator::from_tag("in"), FilterOperator::In);
    }

    #[test]
    fn test_constrain() {
        assert_eq!(FilterOperator::Equal.constrain("a", json!(1)).unwrap(), json!(1));
        assert_eq!(
            FilterOperator::NotEqual.constrain("a", json!(1)).unwrap(),
            json!({"$ne": 1})
        );
        assert_eq!(
            FilterOperator::Like.constrain("a", json!("^fo")).unwrap(),
            json!({"$regex": "^fo"})
        );
        assert_eq!(
            FilterOperator::In.constrain("a", json!([1, 2])).unwrap(),
            json!({"$in": [1, 2]})
        );
    }

    #[test]
    fn test_in_requires_sequence() {
        let err = FilterOperator::In.constrain("status", json!("active")).unwrap_err();
        assert_eq!(
            err,
            CriteriaError::InRequiresSequence {
                field: "status".to_string()
            }
        );
    }
}
