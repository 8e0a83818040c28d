//! Generic Model/Entity repositories
//!
//! A [`Repository`] works in terms of domain entities. It translates
//! [`Criteria`] into filters, hands persisted models to a [`Dao`], and maps
//! results back to entities, either through an injected
//! [`ModelConverter`] or field by field with a [`Copier`].
//!
//! # Example
//!
//! ```rust,ignore
//! let repo = DocumentRepository::new(DocumentDao::<UserModel>::new(store, ns));
//!
//! let saved = repo.save(User { name: "ada".into(), ..Default::default() }).await?;
//! let user = repo.find_one(&criteria!("id = ?", saved.id())).await?;
//! repo.remove(&criteria!("id = ?", user.id)).await?;
//! ```

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;

use crate::convert::{CoercionRegistry, ConversionPolicy, Copier, ModelConverter, Record};
use crate::criteria::Criteria;
use crate::dao::{Dao, Model};
use crate::document::{format_timestamp, Document, DELETED_AT};
use crate::error::Result;
use crate::ids::RecordId;
use crate::pagination::PagingQuery;
use crate::result::WriteResult;

/// Entity-level persistence operations
pub trait Repository<E>: Send + Sync {
    /// Insert a new entity or update an existing one
    ///
    /// An entity whose id converts to [`RecordId::NIL`] is inserted under a
    /// freshly minted id; any other entity updates the record with that id.
    fn save(&self, entity: E) -> impl Future<Output = Result<WriteResult>> + Send;

    /// Whether any live record matches
    ///
    /// Invalid criteria and store failures are logged and reported as
    /// `false`.
    fn exist(&self, criteria: &Criteria) -> impl Future<Output = bool> + Send;

    /// Soft-delete every matching record by setting `deleted_at`
    ///
    /// Removing already-removed records matches nothing and reports a count
    /// of zero.
    fn remove(&self, criteria: &Criteria) -> impl Future<Output = Result<WriteResult>> + Send;

    /// All matching entities, newest first
    fn find(&self, criteria: &Criteria) -> impl Future<Output = Result<Vec<E>>> + Send;

    /// The newest matching entity
    fn find_one(&self, criteria: &Criteria) -> impl Future<Output = Result<E>> + Send;

    /// One page of matching entities and the total match count
    fn paging(
        &self,
        criteria: &Criteria,
        paging: PagingQuery,
    ) -> impl Future<Output = Result<(Vec<E>, i64)>> + Send;
}

/// [`Repository`] over a [`Dao`] for model `M`, exposing entity `E`
pub struct DocumentRepository<M, E, D> {
    dao: D,
    converter: Option<Arc<dyn ModelConverter<M, E>>>,
    copier: Copier,
    _types: PhantomData<fn() -> (M, E)>,
}

impl<M, E, D: std::fmt::Debug> std::fmt::Debug for DocumentRepository<M, E, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentRepository")
            .field("dao", &self.dao)
            .field("custom_converter", &self.converter.is_some())
            .field("copier", &self.copier)
            .finish()
    }
}

impl<M: Model, E: Record, D: Dao<M>> DocumentRepository<M, E, D> {
    /// A repository converting with the default [`Copier`]
    pub fn new(dao: D) -> Self {
        Self {
            dao,
            converter: None,
            copier: Copier::default(),
            _types: PhantomData,
        }
    }

    /// Use a custom converter instead of the copier
    #[must_use]
    pub fn with_converter(mut self, converter: impl ModelConverter<M, E> + 'static) -> Self {
        self.converter = Some(Arc::new(converter));
        self
    }

    /// Replace the copier's coercion registry
    #[must_use]
    pub fn with_coercions(mut self, registry: CoercionRegistry) -> Self {
        self.copier = self.copier.with_registry(registry);
        self
    }

    /// Set how the copier handles failed coercions
    #[must_use]
    pub fn with_policy(mut self, policy: ConversionPolicy) -> Self {
        self.copier = self.copier.with_policy(policy);
        self
    }

    /// The underlying DAO
    pub fn dao(&self) -> &D {
        &self.dao
    }

    fn converter(&self) -> &dyn ModelConverter<M, E> {
        match &self.converter {
            Some(custom) => custom.as_ref(),
            None => &self.copier,
        }
    }
}

impl<M: Model, E: Record, D: Dao<M>> Repository<E> for DocumentRepository<M, E, D> {
    async fn save(&self, entity: E) -> Result<WriteResult> {
        let mut model = self.converter().to_model(entity)?;
        let now = Utc::now();

        if model.id().is_nil() {
            model.set_id(RecordId::new());
            model.stamp_created(now);
            model.stamp_updated(now);
            self.dao.insert(model).await
        } else {
            model.stamp_updated(now);
            let id = model.id();
            self.dao.update_by_id(id, model).await
        }
    }

    async fn exist(&self, criteria: &Criteria) -> bool {
        match self.find_one(criteria).await {
            Ok(_) => true,
            Err(e) if e.is_not_found() => false,
            Err(e) => {
                tracing::warn!(error = %e, "Existence check failed");
                false
            }
        }
    }

    async fn remove(&self, criteria: &Criteria) -> Result<WriteResult> {
        let filter = criteria.build()?;

        let mut fields = Document::new();
        fields.insert(
            DELETED_AT.to_string(),
            Value::String(format_timestamp(Utc::now())),
        );
        self.dao.update_many(filter, fields).await
    }

    async fn find(&self, criteria: &Criteria) -> Result<Vec<E>> {
        let filter = criteria.build()?;
        let models = self.dao.find(filter).await?;
        Ok(self.converter().to_entities(models)?)
    }

    async fn find_one(&self, criteria: &Criteria) -> Result<E> {
        let filter = criteria.build()?;
        let model = self.dao.find_one(filter).await?;
        Ok(self.converter().to_entity(model)?)
    }

    async fn paging(&self, criteria: &Criteria, paging: PagingQuery) -> Result<(Vec<E>, i64)> {
        let filter = criteria.build()?;
        let (models, total) = self.dao.paging(filter, paging).await?;
        Ok((self.converter().to_entities(models)?, total))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::criteria::IdentityQuery;
    use crate::dao::tests::NoteModel;
    use crate::dao::DocumentDao;
    use crate::error::{ConversionError, Error};
    use crate::store::{DocumentStore, MemoryStore, Namespace};
    use crate::time::UnixTime;
    use serde::{Deserialize, Serialize};

    crate::record! {
        #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
        pub struct Note {
            pub id: String,
            pub title: String,
            pub created_at: UnixTime,
            pub updated_at: UnixTime,
            pub deleted_at: Option<i64>,
        }
    }

    pub(crate) type NoteRepository = DocumentRepository<NoteModel, Note, DocumentDao<NoteModel>>;

    pub(crate) fn repository(store: &MemoryStore) -> NoteRepository {
        let store: Arc<dyn DocumentStore> = Arc::new(store.clone());
        DocumentRepository::new(DocumentDao::new(store, Namespace::new("test", "notes")))
    }

    fn note(title: &str) -> Note {
        Note {
            title: title.into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_save_then_find_one_by_id() {
        let repo = repository(&MemoryStore::new());

        let result = repo.save(note("first")).await.unwrap();
        assert_eq!(result.count, 1);
        let id = result.id().unwrap().to_string();
        assert_ne!(id, RecordId::NIL.to_string());

        let found = repo.find_one(&crate::criteria!("id = ?", id)).await.unwrap();
        assert_eq!(found.id, id);
        assert_eq!(found.title, "first");
        assert_eq!(found.deleted_at, None);
        assert!(found.created_at.millis() > 0);
        assert_eq!(found.created_at, found.updated_at);

        let by_identity = repo
            .find_one(&IdentityQuery::new(id.parse().unwrap()).into())
            .await
            .unwrap();
        assert_eq!(by_identity, found);
    }

    #[tokio::test]
    async fn test_save_existing_updates_in_place() {
        let store = MemoryStore::new();
        let repo = repository(&store);

        let id = repo.save(note("draft")).await.unwrap().id().unwrap().to_string();
        let mut saved = repo.find_one(&crate::criteria!("id = ?", id)).await.unwrap();
        let created = saved.created_at;

        saved.title = "final".into();
        saved.created_at = UnixTime::from_millis(0);
        let result = repo.save(saved).await.unwrap();
        assert_eq!(result.count, 1);
        assert_eq!(result.id(), Some(id.as_str()));

        let all = repo.find(&Criteria::all()).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].title, "final");
        assert_eq!(all[0].created_at, created);
        assert_eq!(store.len(&Namespace::new("test", "notes")).await, 1);
    }

    #[tokio::test]
    async fn test_remove_is_soft_and_idempotent() {
        let store = MemoryStore::new();
        let repo = repository(&store);
        repo.save(note("keep")).await.unwrap();
        repo.save(note("drop")).await.unwrap();

        let gone = crate::criteria!("title = ?", "drop");
        assert!(repo.exist(&gone).await);

        let first = repo.remove(&gone).await.unwrap();
        assert_eq!(first.count, 1);
        let second = repo.remove(&gone).await.unwrap();
        assert_eq!(second.count, 0);

        assert!(!repo.exist(&gone).await);
        assert_eq!(repo.find(&Criteria::all()).await.unwrap().len(), 1);
        assert_eq!(store.len(&Namespace::new("test", "notes")).await, 2);

        let tombstones = repo
            .find(&crate::criteria!("deleted_at != ?", Value::Null))
            .await
            .unwrap();
        assert_eq!(tombstones.len(), 1);
        assert!(tombstones[0].deleted_at.is_some());
    }

    #[tokio::test]
    async fn test_paging_reports_total() {
        let repo = repository(&MemoryStore::new());
        for i in 0..25 {
            repo.save(note(&format!("n{i}"))).await.unwrap();
        }

        let (items, total) = repo.paging(&Criteria::all(), PagingQuery::new(1, 20)).await.unwrap();
        assert_eq!(total, 25);
        assert_eq!(items.len(), 5);

        let (items, total) = repo
            .paging(&crate::criteria!("title like ?", "^n1"), PagingQuery::default())
            .await
            .unwrap();
        assert_eq!(total, 11);
        assert_eq!(items.len(), 11);
    }

    #[tokio::test]
    async fn test_invalid_criteria_propagates() {
        let repo = repository(&MemoryStore::new());
        let err = repo.find(&crate::criteria!("title = ? AND id = ?", "x")).await.unwrap_err();
        assert!(matches!(err, Error::Criteria(_)));
        assert!(!repo.exist(&crate::criteria!("title = ?")).await);
    }

    struct Shouting;

    impl ModelConverter<NoteModel, Note> for Shouting {
        fn to_model(&self, entity: Note) -> std::result::Result<NoteModel, ConversionError> {
            Ok(NoteModel {
                title: entity.title.to_uppercase(),
                ..Default::default()
            })
        }

        fn to_entity(&self, model: NoteModel) -> std::result::Result<Note, ConversionError> {
            Ok(Note {
                id: model.id.to_string(),
                title: model.title,
                ..Default::default()
            })
        }
    }

    #[tokio::test]
    async fn test_custom_converter_takes_precedence() {
        let repo = repository(&MemoryStore::new()).with_converter(Shouting);
        repo.save(note("quiet")).await.unwrap();

        let found = repo.find_one(&Criteria::all()).await.unwrap();
        assert_eq!(found.title, "QUIET");
        assert_eq!(found.created_at, UnixTime::default());
    }

    #[tokio::test]
    async fn test_strict_policy_rejects_bad_id() {
        let bad = Note {
            id: "not-an-id".into(),
            ..note("x")
        };

        let lenient = repository(&MemoryStore::new());
        assert_eq!(lenient.save(bad.clone()).await.unwrap().count, 1);

        let strict = repository(&MemoryStore::new()).with_policy(ConversionPolicy::Strict);
        let err = strict.save(bad).await.unwrap_err();
        assert!(matches!(err, Error::Conversion(ConversionError::Field { .. })));
    }
}
