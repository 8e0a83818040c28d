//! Document store abstraction
//!
//! [`DocumentStore`] is the seam between the DAO layer and a concrete
//! document database. Implementations receive ready-made filter and update
//! [`Document`]s and only execute them.
//!
//! Two implementations ship with the crate:
//!
//! - [`MemoryStore`]: in-process, for tests and local development
//! - `MongoStore` (feature `mongodb`): the official MongoDB driver
//!
//! The trait is object safe; DAOs hold an `Arc<dyn DocumentStore>`.

mod memory;
#[cfg(feature = "mongodb")]
mod mongo;

pub use memory::MemoryStore;
#[cfg(feature = "mongodb")]
pub use mongo::MongoStore;

use std::fmt;

use async_trait::async_trait;

use crate::document::Document;
use crate::error::StoreError;
use crate::pagination::OrderDirection;

/// Result type for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Database and collection a store operation targets
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace {
    /// Database name
    pub database: String,
    /// Collection name
    pub collection: String,
}

impl Namespace {
    /// Create a namespace
    pub fn new(database: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            collection: collection.into(),
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.database, self.collection)
    }
}

/// Sort, skip and limit for reads
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindOptions {
    /// Sort keys in priority order
    pub sort: Vec<(String, OrderDirection)>,
    /// Records to skip
    pub skip: Option<u64>,
    /// Maximum records to return
    pub limit: Option<i64>,
}

impl FindOptions {
    /// Options with no sort, skip or limit
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sort key
    #[must_use]
    pub fn sort_by(mut self, field: impl Into<String>, direction: OrderDirection) -> Self {
        self.sort.push((field.into(), direction));
        self
    }

    /// Set the number of records to skip
    #[must_use]
    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    /// Set the maximum number of records
    #[must_use]
    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Counts reported by an update
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateOutcome {
    /// Documents matched by the filter
    pub matched: u64,
    /// Documents actually changed
    pub modified: u64,
    /// Identifier of an upserted document
    pub upserted_id: Option<String>,
}

/// Index definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexModel {
    /// Indexed fields in order
    pub keys: Vec<(String, OrderDirection)>,
    /// Reject documents that duplicate the key
    pub unique: bool,
    /// Explicit index name
    pub name: Option<String>,
}

impl IndexModel {
    /// A non-unique index over `keys`
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = (S, OrderDirection)>,
        S: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(|(k, d)| (k.into(), d)).collect(),
            unique: false,
            name: None,
        }
    }

    /// Mark the index unique
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Name the index
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// The explicit name, or the conventional `field_1_other_-1` form
    #[must_use]
    pub fn index_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| {
            self.keys
                .iter()
                .map(|(k, d)| format!("{}_{}", k, d.as_i32()))
                .collect::<Vec<_>>()
                .join("_")
        })
    }
}

/// A document database driver
///
/// Filters use the operator vocabulary of [`crate::document`]; updates are
/// `{"$set": {...}}` documents. Inserted documents carry their primary key
/// under `_id`.
#[async_trait]
pub trait DocumentStore: Send + Sync + fmt::Debug {
    /// Insert one document, returning its identifier
    async fn insert_one(&self, ns: &Namespace, doc: Document) -> StoreResult<String>;

    /// Insert several documents, returning their identifiers in order
    async fn insert_many(&self, ns: &Namespace, docs: Vec<Document>) -> StoreResult<Vec<String>>;

    /// Apply `update` to the first document matching `filter`
    async fn update_one(
        &self,
        ns: &Namespace,
        filter: Document,
        update: Document,
    ) -> StoreResult<UpdateOutcome>;

    /// Apply `update` to every document matching `filter`
    async fn update_many(
        &self,
        ns: &Namespace,
        filter: Document,
        update: Document,
    ) -> StoreResult<UpdateOutcome>;

    /// Find documents matching `filter`
    async fn find(
        &self,
        ns: &Namespace,
        filter: Document,
        options: FindOptions,
    ) -> StoreResult<Vec<Document>>;

    /// Find the first document matching `filter`
    async fn find_one(
        &self,
        ns: &Namespace,
        filter: Document,
        options: FindOptions,
    ) -> StoreResult<Option<Document>> {
        let docs = self.find(ns, filter, options.limit(1)).await?;
        Ok(docs.into_iter().next())
    }

    /// Count documents matching `filter`
    async fn count(&self, ns: &Namespace, filter: Document) -> StoreResult<u64>;

    /// Create indexes, returning their names
    async fn create_indexes(
        &self,
        ns: &Namespace,
        indexes: Vec<IndexModel>,
    ) -> StoreResult<Vec<String>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespace_display() {
        assert_eq!(Namespace::new("app", "users").to_string(), "app.users");
    }

    #[test]
    fn test_find_options_builder() {
        let opts = FindOptions::new()
            .sort_by("created_at", OrderDirection::Descending)
            .skip(20)
            .limit(20);
        assert_eq!(opts.sort, vec![("created_at".to_string(), OrderDirection::Descending)]);
        assert_eq!(opts.skip, Some(20));
        assert_eq!(opts.limit, Some(20));
    }

    #[test]
    fn test_index_name() {
        let idx = IndexModel::new([("email", OrderDirection::Ascending)]).unique();
        assert!(idx.unique);
        assert_eq!(idx.index_name(), "email_1");

        let idx = IndexModel::new([
            ("tenant", OrderDirection::Ascending),
            ("created_at", OrderDirection::Descending),
        ]);
        assert_eq!(idx.index_name(), "tenant_1_created_at_-1");
        assert_eq!(idx.named("by_tenant").index_name(), "by_tenant");
    }
}
