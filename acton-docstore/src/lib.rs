//! # acton-docstore
//!
//! Criteria query translation and generic Model/Entity repositories for
//! document-store backed services.
//!
//! ## Features
//!
//! - **Criteria**: pseudo-SQL expressions (`"name like ? OR age = ?"`) or tagged
//!   query structs translated into store filter documents
//! - **Soft delete**: every filter excludes records with a `deleted_at`
//!   timestamp; removal only sets it
//! - **Generic persistence**: [`dao::DocumentDao`] over any
//!   [`store::DocumentStore`], with sorting, paging and index creation
//! - **Model/Entity mapping**: field-by-field copying with pluggable
//!   coercions, or an injected [`convert::ModelConverter`]
//! - **Backends**: an in-memory store, and MongoDB behind the `mongodb`
//!   feature
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use acton_docstore::prelude::*;
//! use chrono::{DateTime, Utc};
//! use serde::{Deserialize, Serialize};
//!
//! acton_docstore::record! {
//!     #[derive(Debug, Default, Serialize, Deserialize)]
//!     pub struct TaskModel {
//!         pub id: RecordId,
//!         pub title: String,
//!         pub created_at: DateTime<Utc>,
//!         pub deleted_at: Option<DateTime<Utc>>,
//!     }
//! }
//!
//! impl Model for TaskModel {
//!     fn id(&self) -> RecordId { self.id }
//!     fn set_id(&mut self, id: RecordId) { self.id = id; }
//!     fn stamp_created(&mut self, now: DateTime<Utc>) { self.created_at = now; }
//! }
//!
//! acton_docstore::record! {
//!     #[derive(Debug, Default, Serialize, Deserialize)]
//!     pub struct Task {
//!         pub id: String,
//!         pub title: String,
//!         pub created_at: UnixTime,
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
//!     let dao = DocumentDao::<TaskModel>::new(store, Namespace::new("app", "tasks"));
//!     let tasks = DocumentService::new(DocumentRepository::<_, Task, _>::new(dao));
//!
//!     let saved = tasks.save(Task { title: "write docs".into(), ..Default::default() }).await?;
//!     let id = saved.id().unwrap_or_default().to_string();
//!
//!     let task = tasks.find_one(criteria!("id = ?", id)).await?;
//!     assert_eq!(task.title, "write docs");
//!
//!     let page = tasks.paging(criteria!("title like ?", "docs$"), PagingQuery::default()).await?;
//!     assert_eq!(page.total, 1);
//!
//!     tasks.remove(criteria!("id = ?", task.id)).await?;
//!     assert!(!tasks.exist("").await);
//!     Ok(())
//! }
//! ```

pub mod codes;
pub mod config;
pub mod convert;
pub mod criteria;
pub mod dao;
pub mod document;
pub mod error;
pub mod ids;
pub mod observability;
pub mod pagination;
pub mod repository;
pub mod result;
pub mod service;
pub mod store;
pub mod time;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::codes::{ErrorCode, ErrorCodeRegistry};
    pub use crate::config::{Config, StoreConfig};
    pub use crate::convert::{
        CoercionRegistry, ConversionPolicy, Copier, FieldKind, ModelConverter, Record,
    };
    pub use crate::criteria::{Criteria, CriteriaError, CriteriaQuery, IdentityQuery};
    pub use crate::dao::{Dao, DaoOptions, DocumentDao, Model};
    pub use crate::document::Document;
    pub use crate::error::{Error, Result, StoreError, StoreErrorKind};
    pub use crate::ids::RecordId;
    pub use crate::observability::init_tracing;
    pub use crate::pagination::{OrderDirection, PagingQuery, PagingResult};
    pub use crate::repository::{DocumentRepository, Repository};
    pub use crate::result::WriteResult;
    pub use crate::service::{DocumentService, Service};
    pub use crate::store::{DocumentStore, FindOptions, IndexModel, MemoryStore, Namespace};
    pub use crate::time::UnixTime;

    #[cfg(feature = "mongodb")]
    pub use crate::store::MongoStore;

    pub use crate::{criteria, criteria_query, record};
}
