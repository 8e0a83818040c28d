//! In-memory document store for testing and development.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde_json::Value;
use tokio::sync::RwLock;

use super::{DocumentStore, FindOptions, IndexModel, Namespace, StoreResult, UpdateOutcome};
use crate::document::{Document, OP_IN, OP_NE, OP_OR, OP_REGEX, OP_SET, PRIMARY_KEY};
use crate::error::{StoreError, StoreErrorKind, StoreOperation};
use crate::ids::RecordId;
use crate::pagination::OrderDirection;

#[derive(Debug, Default)]
struct Collection {
    docs: Vec<Document>,
    indexes: Vec<IndexModel>,
}

/// In-memory document store backed by a `HashMap` of collections.
///
/// Storage key is the namespace (`"database.collection"`). Clone-friendly via
/// `Arc`; clones share the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    collections: Arc<RwLock<HashMap<String, Collection>>>,
}

impl MemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in a collection, including soft-deleted ones.
    pub async fn len(&self, ns: &Namespace) -> usize {
        self.collections
            .read()
            .await
            .get(&ns.to_string())
            .map_or(0, |c| c.docs.len())
    }

    /// Whether a collection is empty or missing.
    pub async fn is_empty(&self, ns: &Namespace) -> bool {
        self.len(ns).await == 0
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

// `null` matches both an explicit null and a missing field.
fn field_equals(actual: Option<&Value>, expected: &Value) -> bool {
    match (actual, expected) {
        (None, Value::Null) => true,
        (None, _) => false,
        (Some(a), e) => values_equal(a, e),
    }
}

fn is_operator_doc(value: &Value) -> bool {
    matches!(value, Value::Object(m) if !m.is_empty() && m.keys().all(|k| k.starts_with('$')))
}

fn condition_matches(
    actual: Option<&Value>,
    op: &str,
    operand: &Value,
) -> StoreResult<bool> {
    match op {
        OP_NE => Ok(!field_equals(actual, operand)),
        "$eq" => Ok(field_equals(actual, operand)),
        OP_IN => match operand {
            Value::Array(candidates) => {
                Ok(candidates.iter().any(|c| field_equals(actual, c)))
            }
            _ => Err(StoreError::database_error(
                StoreOperation::Find,
                "$in needs an array",
            )),
        },
        OP_REGEX => {
            let pattern = operand.as_str().ok_or_else(|| {
                StoreError::database_error(StoreOperation::Find, "$regex needs a string")
            })?;
            let re = Regex::new(pattern).map_err(|e| {
                StoreError::database_error(StoreOperation::Find, format!("invalid $regex: {e}"))
            })?;
            Ok(actual.and_then(Value::as_str).is_some_and(|s| re.is_match(s)))
        }
        other => Err(StoreError::database_error(
            StoreOperation::Find,
            format!("unsupported filter operator '{other}'"),
        )),
    }
}

/// Evaluates a filter document against a stored document.
fn matches(doc: &Document, filter: &Document) -> StoreResult<bool> {
    for (key, cond) in filter {
        if key == OP_OR {
            let branches = cond.as_array().ok_or_else(|| {
                StoreError::database_error(StoreOperation::Find, "$or needs an array")
            })?;
            let mut any = false;
            for branch in branches {
                let branch = branch.as_object().ok_or_else(|| {
                    StoreError::database_error(StoreOperation::Find, "$or branch must be a document")
                })?;
                if matches(doc, branch)? {
                    any = true;
                    break;
                }
            }
            if !any {
                return Ok(false);
            }
            continue;
        }

        let actual = doc.get(key);
        if is_operator_doc(cond) {
            if let Value::Object(ops) = cond {
                for (op, operand) in ops {
                    if !condition_matches(actual, op, operand)? {
                        return Ok(false);
                    }
                }
            }
        } else if !field_equals(actual, cond) {
            return Ok(false);
        }
    }
    Ok(true)
}

fn parse_instant(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

// Missing and null sort before everything else.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => {
            match (parse_instant(x), parse_instant(y)) {
                (Some(dx), Some(dy)) => dx.cmp(&dy),
                _ => x.cmp(y),
            }
        }
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
    }
}

fn sort_documents(docs: &mut [Document], sort: &[(String, OrderDirection)]) {
    if sort.is_empty() {
        return;
    }
    docs.sort_by(|a, b| {
        for (field, direction) in sort {
            let ord = compare_values(a.get(field), b.get(field));
            let ord = match direction {
                OrderDirection::Ascending => ord,
                OrderDirection::Descending => ord.reverse(),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
}

fn id_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn index_key(doc: &Document, index: &IndexModel) -> Vec<Value> {
    index
        .keys
        .iter()
        .map(|(k, _)| doc.get(k).cloned().unwrap_or(Value::Null))
        .collect()
}

impl Collection {
    /// Checks `candidate` (at `position`, if already stored) against the
    /// primary key and every unique index.
    fn check_unique(
        &self,
        candidate: &Document,
        position: Option<usize>,
        ns: &Namespace,
        operation: StoreOperation,
    ) -> StoreResult<()> {
        let others = self
            .docs
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != position)
            .map(|(_, d)| d);

        for other in others {
            if let (Some(a), Some(b)) = (candidate.get(PRIMARY_KEY), other.get(PRIMARY_KEY)) {
                if a == b {
                    return Err(StoreError::already_exists(ns.to_string(), id_string(a))
                        .with_operation(operation));
                }
            }
            for index in self.indexes.iter().filter(|i| i.unique) {
                let key = index_key(candidate, index);
                if key == index_key(other, index) {
                    return Err(StoreError::new(
                        operation,
                        StoreErrorKind::AlreadyExists,
                        format!("duplicate key for index {}", index.index_name()),
                    )
                    .with_collection(ns.to_string()));
                }
            }
        }
        Ok(())
    }

    fn update(
        &mut self,
        ns: &Namespace,
        filter: &Document,
        update: &Document,
        many: bool,
        operation: StoreOperation,
    ) -> StoreResult<UpdateOutcome> {
        let fields = set_fields(update, operation)?;
        let mut outcome = UpdateOutcome::default();

        for i in 0..self.docs.len() {
            if !matches(&self.docs[i], filter)? {
                continue;
            }
            outcome.matched += 1;

            let mut next = self.docs[i].clone();
            for (k, v) in fields {
                if k == PRIMARY_KEY && next.get(k) != Some(v) {
                    return Err(StoreError::new(
                        operation,
                        StoreErrorKind::ConstraintViolation,
                        "the primary key is immutable",
                    )
                    .with_collection(ns.to_string()));
                }
                next.insert(k.clone(), v.clone());
            }

            if next != self.docs[i] {
                self.check_unique(&next, Some(i), ns, operation)?;
                self.docs[i] = next;
                outcome.modified += 1;
            }

            if !many {
                break;
            }
        }
        Ok(outcome)
    }
}

fn set_fields(update: &Document, operation: StoreOperation) -> StoreResult<&Document> {
    if let Some(op) = update.keys().find(|k| k.as_str() != OP_SET) {
        return Err(StoreError::database_error(
            operation,
            format!("unsupported update operator '{op}'"),
        ));
    }
    match update.get(OP_SET) {
        Some(Value::Object(fields)) => Ok(fields),
        _ => Err(StoreError::database_error(
            operation,
            "update must be a {\"$set\": {...}} document",
        )),
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert_one(&self, ns: &Namespace, doc: Document) -> StoreResult<String> {
        let mut ids = self.insert_many(ns, vec![doc]).await.map_err(|e| {
            e.with_operation(StoreOperation::InsertOne)
        })?;
        ids.pop().ok_or_else(|| {
            StoreError::database_error(StoreOperation::InsertOne, "no identifier assigned")
        })
    }

    async fn insert_many(&self, ns: &Namespace, docs: Vec<Document>) -> StoreResult<Vec<String>> {
        let mut collections = self.collections.write().await;
        let collection = collections.entry(ns.to_string()).or_default();

        let mut ids = Vec::with_capacity(docs.len());
        for mut doc in docs {
            let id = doc
                .entry(PRIMARY_KEY)
                .or_insert_with(|| Value::String(RecordId::new().as_string()))
                .clone();
            collection.check_unique(&doc, None, ns, StoreOperation::InsertMany)?;
            collection.docs.push(doc);
            ids.push(id_string(&id));
        }
        Ok(ids)
    }

    async fn update_one(
        &self,
        ns: &Namespace,
        filter: Document,
        update: Document,
    ) -> StoreResult<UpdateOutcome> {
        let mut collections = self.collections.write().await;
        match collections.get_mut(&ns.to_string()) {
            Some(c) => c.update(ns, &filter, &update, false, StoreOperation::UpdateOne),
            None => Ok(UpdateOutcome::default()),
        }
    }

    async fn update_many(
        &self,
        ns: &Namespace,
        filter: Document,
        update: Document,
    ) -> StoreResult<UpdateOutcome> {
        let mut collections = self.collections.write().await;
        match collections.get_mut(&ns.to_string()) {
            Some(c) => c.update(ns, &filter, &update, true, StoreOperation::UpdateMany),
            None => Ok(UpdateOutcome::default()),
        }
    }

    async fn find(
        &self,
        ns: &Namespace,
        filter: Document,
        options: FindOptions,
    ) -> StoreResult<Vec<Document>> {
        let collections = self.collections.read().await;
        let Some(collection) = collections.get(&ns.to_string()) else {
            return Ok(Vec::new());
        };

        let mut found = Vec::new();
        for doc in &collection.docs {
            if matches(doc, &filter)? {
                found.push(doc.clone());
            }
        }
        sort_documents(&mut found, &options.sort);

        let skip = usize::try_from(options.skip.unwrap_or(0)).unwrap_or(usize::MAX);
        let found = found.into_iter().skip(skip);
        Ok(match options.limit {
            Some(limit) if limit != 0 => {
                found.take(usize::try_from(limit.unsigned_abs()).unwrap_or(usize::MAX)).collect()
            }
            _ => found.collect(),
        })
    }

    async fn count(&self, ns: &Namespace, filter: Document) -> StoreResult<u64> {
        let collections = self.collections.read().await;
        let Some(collection) = collections.get(&ns.to_string()) else {
            return Ok(0);
        };

        let mut n = 0;
        for doc in &collection.docs {
            if matches(doc, &filter)? {
                n += 1;
            }
        }
        Ok(n)
    }

    async fn create_indexes(
        &self,
        ns: &Namespace,
        indexes: Vec<IndexModel>,
    ) -> StoreResult<Vec<String>> {
        let mut collections = self.collections.write().await;
        let collection = collections.entry(ns.to_string()).or_default();

        let mut names = Vec::with_capacity(indexes.len());
        for index in indexes {
            let name = index.index_name();
            if index.unique {
                let mut seen: Vec<Vec<Value>> = Vec::with_capacity(collection.docs.len());
                for doc in &collection.docs {
                    let key = index_key(doc, &index);
                    if seen.contains(&key) {
                        return Err(StoreError::new(
                            StoreOperation::CreateIndexes,
                            StoreErrorKind::AlreadyExists,
                            format!("existing documents violate unique index {name}"),
                        )
                        .with_collection(ns.to_string()));
                    }
                    seen.push(key);
                }
            }
            collection.indexes.retain(|i| i.index_name() != name);
            collection.indexes.push(index);
            names.push(name);
        }
        Ok(names)
    }
}
