//! Generic data access objects
//!
//! A [`Dao`] reads and writes one model type in one collection. Filters
//! arrive as ready-made [`Document`]s; the DAO only encodes models, applies
//! the default ordering (newest first), and forwards to the
//! [`DocumentStore`].
//!
//! Models keep their identifier in a field named `id`; in the store it lives
//! under the primary key `_id`.

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::StoreConfig;
use crate::convert::{FieldKind, Record};
use crate::document::{
    normalize_timestamp, set, single, Document, CREATED_AT, DELETED_AT, PRIMARY_KEY,
};
use crate::error::{Result, StoreError, StoreOperation};
use crate::ids::RecordId;
use crate::pagination::{OrderDirection, PagingQuery};
use crate::result::WriteResult;
use crate::store::{DocumentStore, FindOptions, IndexModel, Namespace};

const MODEL_ID: &str = "id";

/// A persisted record type.
///
/// The timestamp hooks default to no-ops; override them when the model
/// carries `created_at` / `updated_at` fields.
pub trait Model: Record {
    /// The record identifier; [`RecordId::NIL`] until first saved
    fn id(&self) -> RecordId;

    /// Assign the record identifier
    fn set_id(&mut self, id: RecordId);

    /// Called once, before the first insert
    fn stamp_created(&mut self, _now: DateTime<Utc>) {}

    /// Called before every insert and update
    fn stamp_updated(&mut self, _now: DateTime<Utc>) {}
}

/// Where a DAO stores its records
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaoOptions {
    /// Database name; falls back to the configured default
    #[serde(default)]
    pub database: Option<String>,
    /// Collection name
    pub collection: String,
}

impl DaoOptions {
    /// Options for a collection in the default database
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            database: None,
            collection: collection.into(),
        }
    }

    /// Use a specific database
    #[must_use]
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Resolve the namespace against the store configuration
    pub fn namespace(&self, config: &StoreConfig) -> Namespace {
        let database = self
            .database
            .as_deref()
            .filter(|db| !db.is_empty())
            .or_else(|| config.default_database())
            .unwrap_or_default();
        if database.is_empty() {
            tracing::warn!(
                collection = %self.collection,
                "No database configured for DAO; set store.database"
            );
        }
        Namespace::new(database, self.collection.clone())
    }
}

/// Data access for one model type
pub trait Dao<M: Model>: Send + Sync {
    /// Insert a model; a nil id is replaced with a fresh one
    fn insert(&self, model: M) -> impl Future<Output = Result<WriteResult>> + Send;

    /// Insert several models
    fn insert_many(&self, models: Vec<M>) -> impl Future<Output = Result<WriteResult>> + Send;

    /// `$set` fields on the first record matching `filter`
    fn update(
        &self,
        filter: Document,
        fields: Document,
    ) -> impl Future<Output = Result<WriteResult>> + Send;

    /// Overwrite a record's fields from `model`, keeping its id and
    /// `created_at`
    fn update_by_id(
        &self,
        id: RecordId,
        model: M,
    ) -> impl Future<Output = Result<WriteResult>> + Send;

    /// `$set` fields on every record matching `filter`
    fn update_many(
        &self,
        filter: Document,
        fields: Document,
    ) -> impl Future<Output = Result<WriteResult>> + Send;

    /// All records matching `filter`, newest first
    fn find(&self, filter: Document) -> impl Future<Output = Result<Vec<M>>> + Send;

    /// The newest record matching `filter`
    ///
    /// Fails with a `NotFound` store error when nothing matches.
    fn find_one(&self, filter: Document) -> impl Future<Output = Result<M>> + Send;

    /// One page of records matching `filter` and the total match count
    fn paging(
        &self,
        filter: Document,
        paging: PagingQuery,
    ) -> impl Future<Output = Result<(Vec<M>, i64)>> + Send;

    /// Create indexes on the collection
    fn create_indexes(
        &self,
        indexes: Vec<IndexModel>,
    ) -> impl Future<Output = Result<Vec<String>>> + Send;
}

/// [`Dao`] over any [`DocumentStore`]
pub struct DocumentDao<M> {
    store: Arc<dyn DocumentStore>,
    ns: Namespace,
    _model: PhantomData<fn() -> M>,
}

impl<M> Clone for DocumentDao<M> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            ns: self.ns.clone(),
            _model: PhantomData,
        }
    }
}

impl<M> std::fmt::Debug for DocumentDao<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentDao")
            .field("namespace", &self.ns)
            .field("store", &self.store)
            .finish()
    }
}

impl<M: Model> DocumentDao<M> {
    /// A DAO for `ns`
    pub fn new(store: Arc<dyn DocumentStore>, ns: Namespace) -> Self {
        Self {
            store,
            ns,
            _model: PhantomData,
        }
    }

    /// A DAO resolved from options and store configuration
    pub fn with_options(
        store: Arc<dyn DocumentStore>,
        options: &DaoOptions,
        config: &StoreConfig,
    ) -> Self {
        Self::new(store, options.namespace(config))
    }

    /// The target namespace
    pub fn namespace(&self) -> &Namespace {
        &self.ns
    }

    /// The underlying store
    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    fn sorted() -> FindOptions {
        FindOptions::new().sort_by(CREATED_AT, OrderDirection::Descending)
    }

    fn encode(&self, model: &M, operation: StoreOperation) -> Result<Document> {
        let mut doc = match serde_json::to_value(model) {
            Ok(Value::Object(map)) => map,
            Ok(_) => {
                return Err(StoreError::serialization_error(operation, "model is not a struct")
                    .with_collection(self.ns.to_string())
                    .into())
            }
            Err(e) => {
                return Err(StoreError::serialization_error(operation, e.to_string())
                    .with_collection(self.ns.to_string())
                    .into())
            }
        };
        doc.remove(MODEL_ID);
        doc.insert(PRIMARY_KEY.to_string(), Value::String(model.id().as_string()));
        for field in M::fields().iter().filter(|f| f.kind == FieldKind::Timestamp) {
            if let Some(value) = doc.get_mut(field.name) {
                normalize_timestamp(value);
            }
        }
        Ok(doc)
    }

    fn decode(&self, mut doc: Document, operation: StoreOperation) -> Result<M> {
        if let Some(id) = doc.remove(PRIMARY_KEY) {
            doc.insert(MODEL_ID.to_string(), id);
        }
        serde_json::from_value(Value::Object(doc)).map_err(|e| {
            StoreError::serialization_error(operation, e.to_string())
                .with_collection(self.ns.to_string())
                .into()
        })
    }

    fn decode_all(&self, docs: Vec<Document>, operation: StoreOperation) -> Result<Vec<M>> {
        docs.into_iter().map(|d| self.decode(d, operation)).collect()
    }
}

impl<M: Model> Dao<M> for DocumentDao<M> {
    async fn insert(&self, mut model: M) -> Result<WriteResult> {
        if model.id().is_nil() {
            model.set_id(RecordId::new());
        }
        let doc = self.encode(&model, StoreOperation::InsertOne)?;

        tracing::debug!(namespace = %self.ns, id = %model.id(), "Inserting record");
        let id = self.store.insert_one(&self.ns, doc).await?;
        Ok(WriteResult::inserted(id))
    }

    async fn insert_many(&self, models: Vec<M>) -> Result<WriteResult> {
        let docs = models
            .into_iter()
            .map(|mut m| {
                if m.id().is_nil() {
                    m.set_id(RecordId::new());
                }
                self.encode(&m, StoreOperation::InsertMany)
            })
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(namespace = %self.ns, count = docs.len(), "Inserting records");
        let ids = self.store.insert_many(&self.ns, docs).await?;
        Ok(WriteResult::inserted_many(ids))
    }

    async fn update(&self, filter: Document, fields: Document) -> Result<WriteResult> {
        tracing::debug!(namespace = %self.ns, "Updating first matching record");
        let outcome = self.store.update_one(&self.ns, filter, set(fields)).await?;

        let mut result = WriteResult::with_count(outcome.modified as i64);
        if let Some(id) = outcome.upserted_id {
            result = result.with_id(id);
        }
        Ok(result)
    }

    async fn update_by_id(&self, id: RecordId, model: M) -> Result<WriteResult> {
        let mut fields = self.encode(&model, StoreOperation::UpdateOne)?;
        fields.remove(PRIMARY_KEY);
        fields.remove(CREATED_AT);
        if fields.get(DELETED_AT).is_some_and(Value::is_null) {
            fields.remove(DELETED_AT);
        }

        tracing::debug!(namespace = %self.ns, %id, "Updating record by id");
        let filter = single(PRIMARY_KEY, Value::String(id.as_string()));
        let outcome = self.store.update_one(&self.ns, filter, set(fields)).await?;
        Ok(WriteResult::with_count(outcome.modified as i64).with_id(id.as_string()))
    }

    async fn update_many(&self, filter: Document, fields: Document) -> Result<WriteResult> {
        tracing::debug!(namespace = %self.ns, "Updating matching records");
        let outcome = self.store.update_many(&self.ns, filter, set(fields)).await?;

        let mut result = WriteResult::with_count(outcome.modified as i64);
        if let Some(id) = outcome.upserted_id {
            result = result.with_id(id);
        }
        Ok(result)
    }

    async fn find(&self, filter: Document) -> Result<Vec<M>> {
        tracing::debug!(namespace = %self.ns, "Finding records");
        let docs = self.store.find(&self.ns, filter, Self::sorted()).await?;
        self.decode_all(docs, StoreOperation::Find)
    }

    async fn find_one(&self, filter: Document) -> Result<M> {
        tracing::debug!(namespace = %self.ns, "Finding one record");
        match self.store.find_one(&self.ns, filter, Self::sorted()).await? {
            Some(doc) => self.decode(doc, StoreOperation::FindOne),
            None => Err(StoreError::not_found(self.ns.to_string()).into()),
        }
    }

    async fn paging(&self, filter: Document, paging: PagingQuery) -> Result<(Vec<M>, i64)> {
        let options = Self::sorted()
            .skip(u64::try_from(paging.skip()).unwrap_or(0))
            .limit(paging.limit());

        tracing::debug!(
            namespace = %self.ns,
            page = paging.page,
            count = paging.count,
            "Paging records"
        );
        let docs = self.store.find(&self.ns, filter.clone(), options).await?;
        let models = self.decode_all(docs, StoreOperation::Find)?;

        // Separate round-trip; may disagree with the page under concurrent writes
        let total = self.store.count(&self.ns, filter).await?;
        Ok((models, i64::try_from(total).unwrap_or(i64::MAX)))
    }

    async fn create_indexes(&self, indexes: Vec<IndexModel>) -> Result<Vec<String>> {
        tracing::debug!(namespace = %self.ns, count = indexes.len(), "Creating indexes");
        Ok(self.store.create_indexes(&self.ns, indexes).await?)
    }
}
