//! Wire-level access to the document database.
//!
//! [`DocumentClient`] is the seam between the repository and a concrete
//! backend: [`RestDocumentClient`] talks to a remote account over HTTPS,
//! [`InMemoryDocumentClient`] keeps everything in process with the same
//! status-code semantics.

pub mod address;
pub mod memory;
pub mod query;
pub mod rest;

pub use address::{CollectionAddress, DocumentAddress};
pub use memory::{InMemoryDocumentClient, StoreStats};
pub use query::{Filter, Projection, QuerySpec, SqlParameter, SqlQuerySpec};
pub use rest::RestDocumentClient;

use crate::core::StoreResult;
use async_trait::async_trait;
use http::StatusCode;
use serde_json::Value;

/// Response of a point operation (read, create, replace, delete)
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceResponse {
    pub status: StatusCode,
    /// Resource body; absent for deletes
    pub resource: Option<Value>,
    /// Request units consumed, when the store reports them
    pub request_charge: Option<f64>,
    pub activity_id: Option<String>,
}

impl ResourceResponse {
    pub fn new(status: StatusCode, resource: Option<Value>) -> Self {
        Self {
            status,
            resource,
            request_charge: None,
            activity_id: None,
        }
    }
}

/// Paging options for one query round trip
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedOptions {
    pub max_item_count: Option<usize>,
    /// Token returned by the previous page, `None` for the first page
    pub continuation: Option<String>,
}

/// One page of query results
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryPage {
    pub documents: Vec<Value>,
    /// Present while the server has more pages
    pub continuation: Option<String>,
    pub request_charge: Option<f64>,
}

/// Client for one document database account.
///
/// Missing resources are reported as `StoreError::Remote` with status
/// `404 Not Found`; duplicate creates as `409 Conflict`.
#[async_trait]
pub trait DocumentClient: Send + Sync {
    /// Establish the session with the account
    async fn open(&self) -> StoreResult<()>;

    async fn read_database(&self, database: &str) -> StoreResult<ResourceResponse>;

    async fn create_database(&self, database: &str) -> StoreResult<ResourceResponse>;

    async fn read_collection(&self, collection: &CollectionAddress)
    -> StoreResult<ResourceResponse>;

    async fn create_collection(
        &self,
        collection: &CollectionAddress,
        offer_throughput: u32,
    ) -> StoreResult<ResourceResponse>;

    async fn read_document(&self, address: &DocumentAddress) -> StoreResult<ResourceResponse>;

    async fn create_document(
        &self,
        collection: &CollectionAddress,
        document: Value,
    ) -> StoreResult<ResourceResponse>;

    async fn replace_document(
        &self,
        address: &DocumentAddress,
        document: Value,
    ) -> StoreResult<ResourceResponse>;

    async fn delete_document(&self, address: &DocumentAddress) -> StoreResult<ResourceResponse>;

    /// Fetch one page of a query
    async fn query_documents(
        &self,
        collection: &CollectionAddress,
        query: &QuerySpec,
        options: &FeedOptions,
    ) -> StoreResult<QueryPage>;
}
