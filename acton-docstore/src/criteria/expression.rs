//! Pseudo-SQL expression translation
//!
//! Grammar (no nesting, no parentheses):
//!
//! ```text
//! expression := group (" OR " group)*
//! group      := clause (" AND " clause)*
//! clause     := field operator value        ; exactly three tokens
//! operator   := "=" | "!=" | "like" | "in"
//! value      := "?" | literal
//! ```
//!
//! `OR` splits first and `AND` binds tighter. A single group is merged into
//! the top-level filter; several groups become the sub-documents of a `$or`
//! branch. Only one level of mixing is expressible.

use serde_json::Value;

use super::operator::FilterOperator;
use super::CriteriaError;
use crate::document::{live_filter, Document, OP_OR, PRIMARY_KEY};

const OR: &str = " OR ";
const AND: &str = " AND ";
const PLACEHOLDER: &str = "?";

#[derive(Debug, Clone, PartialEq)]
struct Clause<'a> {
    field: &'a str,
    operator: FilterOperator,
    value: &'a str,
}

/// Number of `?` placeholders anywhere in the expression.
pub(crate) fn count_placeholders(sql: &str) -> usize {
    sql.matches(PLACEHOLDER).count()
}

fn parse_clause(src: &str) -> Result<Clause<'_>, CriteriaError> {
    let tokens: Vec<&str> = src.split_whitespace().collect();
    let [field, operator, value] = tokens.as_slice() else {
        return Err(CriteriaError::MalformedClause(src.trim().to_string()));
    };

    let operator =
        FilterOperator::from_token(operator).ok_or_else(|| CriteriaError::UnsupportedOperator {
            clause: src.trim().to_string(),
            operator: (*operator).to_string(),
        })?;

    Ok(Clause {
        field,
        operator,
        value,
    })
}

fn parse(sql: &str) -> Result<Vec<Vec<Clause<'_>>>, CriteriaError> {
    sql.split(OR)
        .map(|group| group.split(AND).map(parse_clause).collect())
        .collect()
}

/// Translates an expression and its positional arguments into a filter.
pub(crate) fn translate(sql: &str, args: &[Value]) -> Result<Document, CriteriaError> {
    let mut filter = live_filter();
    if sql.trim().is_empty() {
        return Ok(filter);
    }

    let groups = parse(sql)?;
    let primary_key_targeted = groups.iter().flatten().any(|c| c.field == PRIMARY_KEY);

    let mut positional = args.iter();
    let mut docs = Vec::with_capacity(groups.len());
    for group in &groups {
        let mut doc = Document::new();
        for clause in group {
            let value = if clause.value == PLACEHOLDER {
                positional
                    .next()
                    .cloned()
                    .ok_or(CriteriaError::PlaceholderMismatch {
                        placeholders: count_placeholders(sql),
                        args: args.len(),
                    })?
            } else {
                Value::String(clause.value.to_string())
            };

            let field = if clause.field == "id" && !primary_key_targeted {
                PRIMARY_KEY
            } else {
                clause.field
            };

            doc.insert(field.to_string(), clause.operator.constrain(field, value)?);
        }
        docs.push(doc);
    }

    if docs.len() == 1 {
        filter.extend(docs.remove(0));
    } else {
        let branches = docs.into_iter().map(Value::Object).collect();
        filter.insert(OP_OR.to_string(), Value::Array(branches));
    }

    Ok(filter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn build(sql: &str, args: &[Value]) -> Value {
        Value::Object(translate(sql, args).unwrap())
    }

    #[test]
    fn test_count_placeholders() {
        assert_eq!(count_placeholders("a = ? AND b != ?"), 2);
        assert_eq!(count_placeholders("a = 1"), 0);
    }

    #[test]
    fn test_and_clauses_merge_flat() {
        let filter = build("f1 = ? AND f2 != ? ", &[json!("a"), json!(2)]);
        assert_eq!(
            filter,
            json!({"deleted_at": null, "f1": "a", "f2": {"$ne": 2}})
        );
    }

    #[test]
    fn test_and_last_write_wins() {
        let filter = build("a = 1 AND a = 2", &[]);
        assert_eq!(filter, json!({"deleted_at": null, "a": "2"}));
    }

    #[test]
    fn test_literals_are_strings() {
        let filter = build("age = 30", &[]);
        assert_eq!(filter, json!({"deleted_at": null, "age": "30"}));
    }

    #[test]
    fn test_id_rewritten_to_primary_key() {
        let filter = build("id = ?", &[json!("abc")]);
        assert_eq!(filter, json!({"deleted_at": null, "_id": "abc"}));
    }

    #[test]
    fn test_id_kept_when_primary_key_used() {
        let filter = build("id = 1 AND _id = 2", &[]);
        assert_eq!(filter, json!({"deleted_at": null, "id": "1", "_id": "2"}));
    }

    #[test]
    fn test_or_builds_single_key_branches() {
        let filter = build("name like ? OR age = ?", &[json!("foo"), json!("30")]);
        assert_eq!(
            filter,
            json!({
                "deleted_at": null,
                "$or": [{"name": {"$regex": "foo"}}, {"age": "30"}]
            })
        );
    }

    #[test]
    fn test_mixed_and_or_groups() {
        let filter = build(
            "username = ? AND password = ? AND id != 1 OR id = m OR item != ? AND tt = 1",
            &[json!("hancens"), json!("123456"), json!("asb")],
        );
        assert_eq!(
            filter,
            json!({
                "deleted_at": null,
                "$or": [
                    {"username": "hancens", "password": "123456", "_id": {"$ne": "1"}},
                    {"_id": "m"},
                    {"item": {"$ne": "asb"}, "tt": "1"}
                ]
            })
        );
    }

    #[test]
    fn test_in_uses_sequence_argument() {
        let filter = build("status in ?", &[json!(["a", "b"])]);
        assert_eq!(
            filter,
            json!({"deleted_at": null, "status": {"$in": ["a", "b"]}})
        );

        let err = translate("status in ?", &[json!("a")]).unwrap_err();
        assert!(matches!(err, CriteriaError::InRequiresSequence { .. }));
    }

    #[test]
    fn test_deleted_at_can_be_targeted() {
        let filter = build("deleted_at != ?", &[Value::Null]);
        assert_eq!(filter, json!({"deleted_at": {"$ne": null}}));
    }

    #[test]
    fn test_malformed_clause() {
        let err = translate("name = ? extra AND a = 1", &[json!("x")]).unwrap_err();
        assert_eq!(err, CriteriaError::MalformedClause("name = ? extra".to_string()));

        let err = translate("name =", &[]).unwrap_err();
        assert!(matches!(err, CriteriaError::MalformedClause(_)));
    }

    #[test]
    fn test_unsupported_operator() {
        let err = translate("age > 3", &[]).unwrap_err();
        assert_eq!(
            err,
            CriteriaError::UnsupportedOperator {
                clause: "age > 3".to_string(),
                operator: ">".to_string(),
            }
        );
    }

    #[test]
    fn test_empty_expression_is_live_filter() {
        assert_eq!(build("   ", &[]), json!({"deleted_at": null}));
    }
}
