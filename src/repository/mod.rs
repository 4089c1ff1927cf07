//! Typed repository over one document collection.
//!
//! Point operations never fail with a store error: a missing document is
//! `None`, and any other remote fault is logged with its status, the action
//! and the document address before also becoming `None`. Only bootstrap
//! failures, and faults while paging through a query, reach the caller.

pub mod query;

pub use query::{DocumentQuery, Query};

use crate::connection::DocumentClientFactory;
use crate::core::{DocumentId, RepositoryResult, StoreResult};
use crate::document::{Document, Item};
use crate::store::{CollectionAddress, DocumentAddress, ResourceResponse};
use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, warn};

/// CRUD and query access to documents of type `T`
#[async_trait]
pub trait Repository<T: Document>: Send + Sync {
    /// Query over the whole collection; no I/O until it runs
    fn query(&self) -> Query<T>;

    /// Every result of `query`, draining all pages
    async fn run_query(&self, query: Query<T>) -> RepositoryResult<Vec<T>>;

    /// Number of results of `query`, fetching identifiers only
    async fn run_count(&self, query: Query<T>) -> RepositoryResult<usize>;

    async fn get(&self, id: DocumentId) -> RepositoryResult<Option<T>>;

    /// Store `entity` under a freshly generated identifier.
    ///
    /// Any identifier the caller set is overwritten.
    async fn add(&self, entity: T) -> RepositoryResult<Option<T>>;

    /// Replace the stored document with `entity`.
    ///
    /// Does nothing when the identifier is empty or no such document exists.
    async fn update(&self, entity: T) -> RepositoryResult<()>;

    /// Remove the document, returning the raw store response.
    ///
    /// `None` when the identifier is empty or no such document exists.
    async fn delete(&self, id: DocumentId) -> RepositoryResult<Option<ResourceResponse>>;
}

/// Single-document operation, named in logs the way the store names it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PointAction {
    Read,
    Create,
    Replace,
    Delete,
}

impl PointAction {
    fn name(self) -> &'static str {
        match self {
            PointAction::Read => "ReadDocument",
            PointAction::Create => "CreateDocument",
            PointAction::Replace => "ReplaceDocument",
            PointAction::Delete => "DeleteDocument",
        }
    }
}

impl fmt::Display for PointAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// [`Repository`] backed by the collection configured on a factory
pub struct DocumentRepository<T> {
    factory: Arc<DocumentClientFactory>,
    collection: CollectionAddress,
    _marker: PhantomData<fn() -> T>,
}

/// Repository of to-do items
pub type ItemRepository = DocumentRepository<Item>;

impl<T: Document> DocumentRepository<T> {
    pub fn new(factory: Arc<DocumentClientFactory>) -> Self {
        let collection = factory.collection().clone();
        Self {
            factory,
            collection,
            _marker: PhantomData,
        }
    }

    pub fn collection(&self) -> &CollectionAddress {
        &self.collection
    }

    pub fn factory(&self) -> &Arc<DocumentClientFactory> {
        &self.factory
    }

    /// Run one point call, absorbing every store fault
    async fn execute_point<F>(
        &self,
        action: PointAction,
        address: &DocumentAddress,
        call: F,
    ) -> Option<ResourceResponse>
    where
        F: Future<Output = StoreResult<ResourceResponse>> + Send,
    {
        match call.await {
            Ok(response) => {
                debug!(
                    action = %action,
                    address = %address,
                    status = response.status.as_u16(),
                    request_charge = ?response.request_charge,
                    "document call completed"
                );
                Some(response)
            }
            Err(err) if err.is_not_found() => {
                debug!(action = %action, address = %address, "document not found");
                None
            }
            Err(err) => {
                warn!(
                    status = ?err.status().map(|status| status.as_u16()),
                    action = %action,
                    address = %address,
                    retry_after = ?err.retry_after(),
                    error = %err,
                    "document call failed"
                );
                None
            }
        }
    }

    fn parse_document(
        action: PointAction,
        address: &DocumentAddress,
        response: ResourceResponse,
    ) -> Option<T> {
        let resource = response.resource?;
        match serde_json::from_value(resource) {
            Ok(entity) => Some(entity),
            Err(err) => {
                warn!(
                    action = %action,
                    address = %address,
                    error = %err,
                    "stored document does not match entity shape"
                );
                None
            }
        }
    }
}

impl<T> Clone for DocumentRepository<T> {
    fn clone(&self) -> Self {
        Self {
            factory: Arc::clone(&self.factory),
            collection: self.collection.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for DocumentRepository<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentRepository")
            .field("collection", &self.collection)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<T: Document> Repository<T> for DocumentRepository<T> {
    fn query(&self) -> Query<T> {
        Query::new()
    }

    async fn run_query(&self, query: Query<T>) -> RepositoryResult<Vec<T>> {
        let client = self.factory.get_client().await?;
        let mut cursor = query
            .with_default_page_size(self.factory.settings().page_size)
            .into_document_query(client, self.collection.clone());
        debug!(collection = %self.collection, sql = %cursor.spec(), "running query");

        let mut results = Vec::new();
        while cursor.has_more_results() {
            results.extend(cursor.execute_next().await?);
        }
        Ok(results)
    }

    async fn run_count(&self, query: Query<T>) -> RepositoryResult<usize> {
        let client = self.factory.get_client().await?;
        let mut cursor = query
            .with_default_page_size(self.factory.settings().page_size)
            .select_ids(client, self.collection.clone());
        debug!(collection = %self.collection, sql = %cursor.spec(), "counting query results");

        let mut count = 0;
        while cursor.has_more_results() {
            count += cursor.execute_next().await?.len();
        }
        Ok(count)
    }

    async fn get(&self, id: DocumentId) -> RepositoryResult<Option<T>> {
        let client = self.factory.get_client().await?;
        let address = self.collection.document(id);

        let response = self
            .execute_point(PointAction::Read, &address, client.read_document(&address))
            .await;
        Ok(response.and_then(|response| Self::parse_document(PointAction::Read, &address, response)))
    }

    async fn add(&self, mut entity: T) -> RepositoryResult<Option<T>> {
        let client = self.factory.get_client().await?;
        entity.set_id(DocumentId::generate());
        let address = self.collection.document(entity.id());

        let document = match serde_json::to_value(&entity) {
            Ok(document) => document,
            Err(err) => {
                warn!(
                    action = %PointAction::Create,
                    address = %address,
                    error = %err,
                    "entity could not be serialized"
                );
                return Ok(None);
            }
        };

        let response = self
            .execute_point(
                PointAction::Create,
                &address,
                client.create_document(&self.collection, document),
            )
            .await;
        Ok(response.and_then(|response| {
            Self::parse_document(PointAction::Create, &address, response)
        }))
    }

    async fn update(&self, entity: T) -> RepositoryResult<()> {
        let id = entity.id();
        if id.is_empty() {
            return Ok(());
        }
        if self.get(id).await?.is_none() {
            return Ok(());
        }

        let client = self.factory.get_client().await?;
        let address = self.collection.document(id);
        let document = match serde_json::to_value(&entity) {
            Ok(document) => document,
            Err(err) => {
                warn!(
                    action = %PointAction::Replace,
                    address = %address,
                    error = %err,
                    "entity could not be serialized"
                );
                return Ok(());
            }
        };

        self.execute_point(
            PointAction::Replace,
            &address,
            client.replace_document(&address, document),
        )
        .await;
        Ok(())
    }

    async fn delete(&self, id: DocumentId) -> RepositoryResult<Option<ResourceResponse>> {
        if id.is_empty() {
            return Ok(None);
        }
        if self.get(id).await?.is_none() {
            return Ok(None);
        }

        let client = self.factory.get_client().await?;
        let address = self.collection.document(id);
        Ok(self
            .execute_point(PointAction::Delete, &address, client.delete_document(&address))
            .await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_names() {
        assert_eq!(PointAction::Read.to_string(), "ReadDocument");
        assert_eq!(PointAction::Create.to_string(), "CreateDocument");
        assert_eq!(PointAction::Replace.to_string(), "ReplaceDocument");
        assert_eq!(PointAction::Delete.to_string(), "DeleteDocument");
    }

    #[test]
    fn test_unexpected_shape_is_absorbed() {
        let address = CollectionAddress::new("todo", "items").document_named("x");
        let response = ResourceResponse::new(
            http::StatusCode::OK,
            Some(serde_json::json!({"id": "not-a-uuid"})),
        );
        let parsed =
            DocumentRepository::<Item>::parse_document(PointAction::Read, &address, response);
        assert!(parsed.is_none());
    }
}
