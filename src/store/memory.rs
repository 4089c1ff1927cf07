use super::{
    CollectionAddress, DocumentAddress, DocumentClient, FeedOptions, QueryPage, QuerySpec,
    ResourceResponse,
};
use crate::core::{StoreError, StoreResult};
use async_trait::async_trait;
use chrono::Utc;
use http::StatusCode;
use serde_json::{Value, json};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use tokio::sync::RwLock;
use uuid::Uuid;

const DEFAULT_PAGE_SIZE: usize = 100;

/// In-process document store.
///
/// Behaves like the remote service for everything the repository relies on:
/// 404 for missing databases, collections and documents, 409 for duplicate
/// creates, continuation-token paging, system properties on stored documents.
/// Counters and one-shot fault injection make it usable as a test double.
pub struct InMemoryDocumentClient {
    databases: RwLock<HashMap<String, DatabaseState>>,
    page_size: usize,
    faults: Mutex<VecDeque<StoreError>>,
    counters: OperationCounters,
}

#[derive(Default)]
struct DatabaseState {
    collections: HashMap<String, CollectionState>,
}

struct CollectionState {
    offer_throughput: u32,
    // ordered by id so that continuation offsets stay stable between pages
    documents: BTreeMap<String, Value>,
}

#[derive(Default)]
struct OperationCounters {
    opens: AtomicUsize,
    databases_created: AtomicUsize,
    collections_created: AtomicUsize,
    document_reads: AtomicUsize,
    document_writes: AtomicUsize,
    pages_served: AtomicUsize,
}

/// Snapshot of the operation counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub opens: usize,
    pub databases_created: usize,
    pub collections_created: usize,
    /// Point reads, successful or not
    pub document_reads: usize,
    /// Creates, replaces and deletes, successful or not
    pub document_writes: usize,
    pub pages_served: usize,
}

impl InMemoryDocumentClient {
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }

    /// Store that never returns more than `page_size` documents per query page
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            databases: RwLock::new(HashMap::new()),
            page_size: page_size.max(1),
            faults: Mutex::new(VecDeque::new()),
            counters: OperationCounters::default(),
        }
    }

    /// Make the next database, collection, document or query call fail with `error`.
    ///
    /// Faults queue up; each one is consumed by exactly one call. `open` never fails.
    pub fn fail_next(&self, error: StoreError) {
        self.faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(error);
    }

    pub fn stats(&self) -> StoreStats {
        let load = |counter: &AtomicUsize| counter.load(Ordering::SeqCst);
        StoreStats {
            opens: load(&self.counters.opens),
            databases_created: load(&self.counters.databases_created),
            collections_created: load(&self.counters.collections_created),
            document_reads: load(&self.counters.document_reads),
            document_writes: load(&self.counters.document_writes),
            pages_served: load(&self.counters.pages_served),
        }
    }

    /// Provisioned throughput of a collection, if it exists
    pub async fn collection_throughput(&self, collection: &CollectionAddress) -> Option<u32> {
        let databases = self.databases.read().await;
        databases
            .get(collection.database())
            .and_then(|db| db.collections.get(collection.collection()))
            .map(|coll| coll.offer_throughput)
    }

    /// Number of documents in a collection, 0 if it does not exist
    pub async fn document_count(&self, collection: &CollectionAddress) -> usize {
        let databases = self.databases.read().await;
        databases
            .get(collection.database())
            .and_then(|db| db.collections.get(collection.collection()))
            .map_or(0, |coll| coll.documents.len())
    }

    fn take_fault(&self) -> StoreResult<()> {
        let fault = self
            .faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        match fault {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn count(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::SeqCst);
    }

    fn stamp(document: &mut Value) -> StoreResult<String> {
        let object = document.as_object_mut().ok_or_else(|| {
            StoreError::remote(StatusCode::BAD_REQUEST, "Document must be a JSON object")
        })?;

        let id = match object.get("id").and_then(Value::as_str) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => {
                return Err(StoreError::remote(
                    StatusCode::BAD_REQUEST,
                    "Document must carry a non-empty string 'id'",
                ));
            }
        };

        object.insert("_ts".to_string(), json!(Utc::now().timestamp()));
        object.insert("_etag".to_string(), json!(format!("\"{}\"", Uuid::new_v4())));
        Ok(id)
    }
}

impl Default for InMemoryDocumentClient {
    fn default() -> Self {
        Self::new()
    }
}

fn collection_mut<'a>(
    databases: &'a mut HashMap<String, DatabaseState>,
    collection: &CollectionAddress,
) -> StoreResult<&'a mut CollectionState> {
    databases
        .get_mut(collection.database())
        .and_then(|db| db.collections.get_mut(collection.collection()))
        .ok_or_else(|| StoreError::not_found(collection))
}

fn collection_ref<'a>(
    databases: &'a HashMap<String, DatabaseState>,
    collection: &CollectionAddress,
) -> StoreResult<&'a CollectionState> {
    databases
        .get(collection.database())
        .and_then(|db| db.collections.get(collection.collection()))
        .ok_or_else(|| StoreError::not_found(collection))
}

#[async_trait]
impl DocumentClient for InMemoryDocumentClient {
    async fn open(&self) -> StoreResult<()> {
        Self::count(&self.counters.opens);
        Ok(())
    }

    async fn read_database(&self, database: &str) -> StoreResult<ResourceResponse> {
        self.take_fault()?;
        let databases = self.databases.read().await;
        if !databases.contains_key(database) {
            return Err(StoreError::not_found(super::address::database_link(database)));
        }
        Ok(ResourceResponse::new(StatusCode::OK, Some(json!({ "id": database }))))
    }

    async fn create_database(&self, database: &str) -> StoreResult<ResourceResponse> {
        self.take_fault()?;
        let mut databases = self.databases.write().await;
        if databases.contains_key(database) {
            return Err(StoreError::conflict(super::address::database_link(database)));
        }
        databases.insert(database.to_string(), DatabaseState::default());
        Self::count(&self.counters.databases_created);
        Ok(ResourceResponse::new(StatusCode::CREATED, Some(json!({ "id": database }))))
    }

    async fn read_collection(
        &self,
        collection: &CollectionAddress,
    ) -> StoreResult<ResourceResponse> {
        self.take_fault()?;
        let databases = self.databases.read().await;
        collection_ref(&databases, collection)?;
        Ok(ResourceResponse::new(
            StatusCode::OK,
            Some(json!({ "id": collection.collection() })),
        ))
    }

    async fn create_collection(
        &self,
        collection: &CollectionAddress,
        offer_throughput: u32,
    ) -> StoreResult<ResourceResponse> {
        self.take_fault()?;
        let mut databases = self.databases.write().await;
        let database = databases
            .get_mut(collection.database())
            .ok_or_else(|| StoreError::not_found(collection.database_link()))?;

        if database.collections.contains_key(collection.collection()) {
            return Err(StoreError::conflict(collection));
        }

        database.collections.insert(
            collection.collection().to_string(),
            CollectionState {
                offer_throughput,
                documents: BTreeMap::new(),
            },
        );
        Self::count(&self.counters.collections_created);
        Ok(ResourceResponse::new(
            StatusCode::CREATED,
            Some(json!({ "id": collection.collection() })),
        ))
    }

    async fn read_document(&self, address: &DocumentAddress) -> StoreResult<ResourceResponse> {
        Self::count(&self.counters.document_reads);
        self.take_fault()?;
        let databases = self.databases.read().await;
        let document = collection_ref(&databases, address.collection())?
            .documents
            .get(address.id())
            .cloned()
            .ok_or_else(|| StoreError::not_found(address))?;
        Ok(ResourceResponse::new(StatusCode::OK, Some(document)))
    }

    async fn create_document(
        &self,
        collection: &CollectionAddress,
        mut document: Value,
    ) -> StoreResult<ResourceResponse> {
        Self::count(&self.counters.document_writes);
        self.take_fault()?;
        let id = Self::stamp(&mut document)?;

        let mut databases = self.databases.write().await;
        let state = collection_mut(&mut databases, collection)?;
        if state.documents.contains_key(&id) {
            return Err(StoreError::conflict(collection.document_named(&id)));
        }
        state.documents.insert(id, document.clone());
        Ok(ResourceResponse::new(StatusCode::CREATED, Some(document)))
    }

    async fn replace_document(
        &self,
        address: &DocumentAddress,
        mut document: Value,
    ) -> StoreResult<ResourceResponse> {
        Self::count(&self.counters.document_writes);
        self.take_fault()?;
        let id = Self::stamp(&mut document)?;
        if id != address.id() {
            return Err(StoreError::remote(
                StatusCode::BAD_REQUEST,
                format!("Document id '{}' does not match address '{}'", id, address),
            ));
        }

        let mut databases = self.databases.write().await;
        let state = collection_mut(&mut databases, address.collection())?;
        let slot = state
            .documents
            .get_mut(address.id())
            .ok_or_else(|| StoreError::not_found(address))?;
        *slot = document.clone();
        Ok(ResourceResponse::new(StatusCode::OK, Some(document)))
    }

    async fn delete_document(&self, address: &DocumentAddress) -> StoreResult<ResourceResponse> {
        Self::count(&self.counters.document_writes);
        self.take_fault()?;
        let mut databases = self.databases.write().await;
        collection_mut(&mut databases, address.collection())?
            .documents
            .remove(address.id())
            .ok_or_else(|| StoreError::not_found(address))?;
        Ok(ResourceResponse::new(StatusCode::NO_CONTENT, None))
    }

    async fn query_documents(
        &self,
        collection: &CollectionAddress,
        query: &QuerySpec,
        options: &FeedOptions,
    ) -> StoreResult<QueryPage> {
        self.take_fault()?;

        let offset = match options.continuation.as_deref() {
            Some(token) => token.parse::<usize>().map_err(|_| {
                StoreError::remote(
                    StatusCode::BAD_REQUEST,
                    format!("Invalid continuation token '{}'", token),
                )
            })?,
            None => 0,
        };
        let page_size = options
            .max_item_count
            .map_or(self.page_size, |requested| requested.clamp(1, self.page_size));

        let databases = self.databases.read().await;
        let state = collection_ref(&databases, collection)?;

        let mut matching = state
            .documents
            .values()
            .filter(|document| query.matches(document))
            .skip(offset);

        let documents: Vec<Value> = matching
            .by_ref()
            .take(page_size)
            .map(|document| query.project_document(document))
            .collect();
        let has_more = matching.next().is_some();

        Self::count(&self.counters.pages_served);
        Ok(QueryPage {
            continuation: has_more.then(|| (offset + documents.len()).to_string()),
            documents,
            request_charge: None,
        })
    }
}
