//! Entity services
//!
//! A [`Service`] is the entry point handlers call. It accepts anything that
//! converts into [`Criteria`] (expression strings, tagged query structs,
//! filter documents) and shapes paged reads into a [`PagingResult`].

use std::future::Future;

use crate::criteria::Criteria;
use crate::error::Result;
use crate::repository::Repository;
use crate::result::WriteResult;

pub use crate::pagination::{PagingQuery, PagingResult};

/// Entity operations keyed by criteria
pub trait Service<E>: Send + Sync {
    /// Insert or update an entity
    fn save(&self, entity: E) -> impl Future<Output = Result<WriteResult>> + Send;

    /// Whether any live record matches
    fn exist(&self, criteria: impl Into<Criteria> + Send) -> impl Future<Output = bool> + Send;

    /// The newest matching entity
    fn find_one(&self, criteria: impl Into<Criteria> + Send) -> impl Future<Output = Result<E>> + Send;

    /// All matching entities, newest first
    fn find(&self, criteria: impl Into<Criteria> + Send) -> impl Future<Output = Result<Vec<E>>> + Send;

    /// One page of matching entities
    ///
    /// The result echoes the requested page and count.
    fn paging(
        &self,
        criteria: impl Into<Criteria> + Send,
        paging: PagingQuery,
    ) -> impl Future<Output = Result<PagingResult<E>>> + Send;

    /// Soft-delete matching records
    fn remove(
        &self,
        criteria: impl Into<Criteria> + Send,
    ) -> impl Future<Output = Result<WriteResult>> + Send;
}

/// [`Service`] over any [`Repository`]
#[derive(Debug, Clone)]
pub struct DocumentService<R> {
    repository: R,
}

impl<R> DocumentService<R> {
    /// Wrap a repository
    pub fn new(repository: R) -> Self {
        Self { repository }
    }

    /// The wrapped repository
    pub fn repository(&self) -> &R {
        &self.repository
    }
}

impl<E: Send, R: Repository<E>> Service<E> for DocumentService<R> {
    async fn save(&self, entity: E) -> Result<WriteResult> {
        self.repository.save(entity).await.inspect_err(|e| {
            tracing::error!(error = %e, "Failed to save entity");
        })
    }

    async fn exist(&self, criteria: impl Into<Criteria> + Send) -> bool {
        self.repository.exist(&criteria.into()).await
    }

    async fn find_one(&self, criteria: impl Into<Criteria> + Send) -> Result<E> {
        self.repository.find_one(&criteria.into()).await
    }

    async fn find(&self, criteria: impl Into<Criteria> + Send) -> Result<Vec<E>> {
        self.repository.find(&criteria.into()).await
    }

    async fn paging(
        &self,
        criteria: impl Into<Criteria> + Send,
        paging: PagingQuery,
    ) -> Result<PagingResult<E>> {
        let criteria = criteria.into();
        match self.repository.paging(&criteria, paging).await {
            Ok((items, total)) => Ok(PagingResult::new(paging, total, items)),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    page = paging.page,
                    count = paging.count,
                    "Paging query failed"
                );
                Err(e)
            }
        }
    }

    async fn remove(&self, criteria: impl Into<Criteria> + Send) -> Result<WriteResult> {
        self.repository.remove(&criteria.into()).await.inspect_err(|e| {
            tracing::error!(error = %e, "Failed to remove records");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::criteria::{CriteriaQuery, IdentityQuery};
    use crate::document::single;
    use crate::error::Error;
    use crate::repository::tests::{repository, Note, NoteRepository};
    use crate::store::MemoryStore;
    use serde::Serialize;
    use serde_json::json;

    #[derive(Debug, Default, Serialize)]
    struct NoteQuery {
        title: String,
        body: String,
        author: String,
    }

    crate::criteria_query!(NoteQuery {
        title => "like",
        body => "-",
        author,
    });

    fn service() -> DocumentService<NoteRepository> {
        DocumentService::new(repository(&MemoryStore::new()))
    }

    async fn seed(service: &DocumentService<NoteRepository>, titles: &[&str]) {
        for title in titles {
            let note = Note {
                title: (*title).to_string(),
                ..Default::default()
            };
            service.save(note).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_paging_echoes_request() {
        let service = service();
        let titles: Vec<String> = (0..7).map(|i| format!("t{i}")).collect();
        let titles: Vec<&str> = titles.iter().map(String::as_str).collect();
        seed(&service, &titles).await;

        let page = service.paging("", PagingQuery::new(1, 3)).await.unwrap();
        assert_eq!(page.page, 1);
        assert_eq!(page.count, 3);
        assert_eq!(page.total, 7);
        assert_eq!(page.items.len(), 3);
        assert!(page.has_more());

        let last = service.paging("", PagingQuery::new(2, 3)).await.unwrap();
        assert_eq!(last.items.len(), 1);
        assert!(!last.has_more());
    }

    #[tokio::test]
    async fn test_tagged_query_skips_dash_field() {
        let service = service();
        seed(&service, &["alpha", "beta", "alphabet"]).await;

        let query = NoteQuery {
            title: "^alpha".into(),
            body: "ignored".into(),
            ..Default::default()
        };
        let filter = Criteria::query(&query).filter().unwrap();
        assert!(!filter.contains_key("body"));
        assert!(!filter.contains_key("author"));
        assert_eq!(query.criteria_fields().len(), 3);

        let found = service.find(&query).await.unwrap();
        assert_eq!(found.len(), 2);
    }

    #[tokio::test]
    async fn test_find_one_by_identity_and_document() -> anyhow::Result<()> {
        let service = service();
        let saved = service
            .save(Note {
                title: "x".into(),
                ..Default::default()
            })
            .await?;
        let id = saved.id().unwrap_or_default().to_string();

        let by_id = service.find_one(IdentityQuery::new(id.parse()?)).await?;
        assert_eq!(by_id.title, "x");

        let by_doc = service.find_one(single("title", json!("x"))).await?;
        assert_eq!(by_doc.id, id);

        assert!(service.exist(format!("title = {}", "x")).await);
        Ok(())
    }

    #[tokio::test]
    async fn test_remove_then_find_one_is_not_found() {
        let service = service();
        seed(&service, &["only"]).await;

        assert_eq!(service.remove("title = only").await.unwrap().count, 1);
        assert_eq!(service.remove("title = only").await.unwrap().count, 0);

        let err = service.find_one("title = only").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_paging_error_is_returned() {
        let service = service();
        let err = service
            .paging(crate::criteria!("title = ?"), PagingQuery::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Criteria(_)));
    }
}
