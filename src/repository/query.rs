use crate::core::{DocumentId, StoreResult};
use crate::document::Document;
use crate::store::{CollectionAddress, DocumentClient, FeedOptions, Filter, Projection, QuerySpec};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Composable query over every document of `T`'s collection.
///
/// Building a query does no I/O; it runs through `Repository::run_query` or
/// `Repository::run_count`.
pub struct Query<T> {
    spec: QuerySpec,
    max_item_count: Option<usize>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Document> Query<T> {
    pub fn new() -> Self {
        Self {
            spec: QuerySpec::new(),
            max_item_count: None,
            _marker: PhantomData,
        }
    }

    /// Add a predicate on a wire property
    pub fn filter(mut self, filter: Filter) -> Self {
        self.spec = self.spec.filter(filter);
        self
    }

    /// `field == value`, with `field` given by its Rust name
    pub fn field_eq(self, field: &str, value: impl Into<Value>) -> Self {
        let wire = T::wire_name(field).to_string();
        self.filter(Filter::eq(wire, value))
    }

    /// `field != value`, with `field` given by its Rust name
    pub fn field_ne(self, field: &str, value: impl Into<Value>) -> Self {
        let wire = T::wire_name(field).to_string();
        self.filter(Filter::ne(wire, value))
    }

    /// Substring match on a string field given by its Rust name
    pub fn field_contains(self, field: &str, value: impl Into<String>) -> Self {
        let wire = T::wire_name(field).to_string();
        self.filter(Filter::contains(wire, value))
    }

    /// Upper bound on documents per page
    pub fn max_item_count(mut self, count: usize) -> Self {
        self.max_item_count = Some(count);
        self
    }

    pub fn spec(&self) -> &QuerySpec {
        &self.spec
    }

    /// Keep the caller's page size, otherwise use `page_size`
    pub(crate) fn with_default_page_size(mut self, page_size: Option<usize>) -> Self {
        self.max_item_count = self.max_item_count.or(page_size);
        self
    }

    /// Cursor returning whole entities
    pub fn into_document_query(
        self,
        client: Arc<dyn DocumentClient>,
        collection: CollectionAddress,
    ) -> DocumentQuery<T> {
        DocumentQuery::new(client, collection, self.spec, self.max_item_count)
    }

    /// Same filters, projected to the identifier only
    pub fn select_ids(
        self,
        client: Arc<dyn DocumentClient>,
        collection: CollectionAddress,
    ) -> DocumentQuery<DocumentId> {
        let spec = self.spec.project(Projection::Id);
        DocumentQuery::new(client, collection, spec, self.max_item_count)
    }
}

impl<T: Document> Default for Query<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Query<T> {
    fn clone(&self) -> Self {
        Self {
            spec: self.spec.clone(),
            max_item_count: self.max_item_count,
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Query<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("spec", &self.spec)
            .field("max_item_count", &self.max_item_count)
            .finish()
    }
}

impl<T> fmt::Display for Query<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.spec)
    }
}

/// Paginated server-side cursor.
///
/// Each `execute_next` fetches one page. A failed page leaves the
/// continuation untouched so the same page can be requested again.
pub struct DocumentQuery<R> {
    client: Arc<dyn DocumentClient>,
    collection: CollectionAddress,
    spec: QuerySpec,
    options: FeedOptions,
    exhausted: bool,
    _marker: PhantomData<fn() -> R>,
}

impl<R: DeserializeOwned> DocumentQuery<R> {
    fn new(
        client: Arc<dyn DocumentClient>,
        collection: CollectionAddress,
        spec: QuerySpec,
        max_item_count: Option<usize>,
    ) -> Self {
        Self {
            client,
            collection,
            spec,
            options: FeedOptions {
                max_item_count,
                continuation: None,
            },
            exhausted: false,
            _marker: PhantomData,
        }
    }

    pub fn spec(&self) -> &QuerySpec {
        &self.spec
    }

    /// True until the server has reported the last page
    pub fn has_more_results(&self) -> bool {
        !self.exhausted
    }

    pub async fn execute_next(&mut self) -> StoreResult<Vec<R>> {
        if self.exhausted {
            return Ok(Vec::new());
        }

        let page = self
            .client
            .query_documents(&self.collection, &self.spec, &self.options)
            .await?;

        let results = page
            .documents
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<R>, _>>()?;

        match page.continuation {
            Some(token) => self.options.continuation = Some(token),
            None => self.exhausted = true,
        }

        Ok(results)
    }
}
