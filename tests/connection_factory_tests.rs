/// Connection factory tests
///
/// Lazy bootstrap of the shared document client under concurrent callers.
/// Run with: cargo test --test connection_factory_tests

use async_trait::async_trait;
use doctodo::core::StoreResult;
use doctodo::store::{CollectionAddress, DocumentClient, InMemoryDocumentClient};
use doctodo::{
    Connector, DocumentClientFactory, DocumentDbSettings, InMemoryConnector, StoreError,
};
use futures::future::join_all;
use http::StatusCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Barrier;

/// Holds every caller inside `connect` long enough for the others to queue up
struct SlowConnector {
    inner: Arc<InMemoryConnector>,
}

#[async_trait]
impl Connector for SlowConnector {
    async fn connect(
        &self,
        settings: &DocumentDbSettings,
    ) -> StoreResult<Arc<dyn DocumentClient>> {
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.inner.connect(settings).await
    }
}

fn factory() -> (Arc<DocumentClientFactory>, Arc<InMemoryConnector>) {
    let connector = Arc::new(InMemoryConnector::default());
    let settings = DocumentDbSettings::default()
        .database("ToDoList")
        .collection("Items");
    let factory = Arc::new(DocumentClientFactory::new(settings, connector.clone()));
    (factory, connector)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_calls_bootstrap_once() {
    let connector = Arc::new(InMemoryConnector::default());
    let slow = Arc::new(SlowConnector {
        inner: connector.clone(),
    });
    let settings = DocumentDbSettings::default()
        .database("ToDoList")
        .collection("Items");
    let factory = Arc::new(DocumentClientFactory::new(settings, slow));
    let num_tasks = 16;
    let barrier = Arc::new(Barrier::new(num_tasks));

    let mut handles = vec![];
    for _ in 0..num_tasks {
        let factory = Arc::clone(&factory);
        let barrier = Arc::clone(&barrier);
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            factory.get_client().await.unwrap()
        }));
    }

    let mut clients = vec![];
    for handle in handles {
        clients.push(handle.await.unwrap());
    }

    assert_eq!(connector.connect_count(), 1);
    let stats = connector.client().stats();
    assert_eq!(stats.opens, 1);
    assert_eq!(stats.databases_created, 1);
    assert_eq!(stats.collections_created, 1);

    let first = &clients[0];
    assert!(clients.iter().all(|client| Arc::ptr_eq(client, first)));
}

#[tokio::test]
async fn test_concurrent_calls_on_one_task() {
    let (factory, connector) = factory();

    let results = join_all((0..8).map(|_| factory.get_client())).await;

    assert!(results.iter().all(|result| result.is_ok()));
    assert_eq!(connector.connect_count(), 1);
}

#[tokio::test]
async fn test_collection_created_with_default_throughput() {
    let (factory, connector) = factory();
    factory.get_client().await.unwrap();

    let collection = CollectionAddress::new("ToDoList", "Items");
    assert_eq!(
        connector.client().collection_throughput(&collection).await,
        Some(1000)
    );
}

#[tokio::test]
async fn test_existing_database_is_reused() {
    let client = Arc::new(InMemoryDocumentClient::new());
    client.create_database("ToDoList").await.unwrap();

    let connector = Arc::new(InMemoryConnector::new(client.clone()));
    let settings = DocumentDbSettings::default()
        .database("ToDoList")
        .collection("Items");
    let factory = DocumentClientFactory::new(settings, connector);
    factory.get_client().await.unwrap();

    assert_eq!(client.stats().databases_created, 1);
    assert_eq!(client.stats().collections_created, 1);
}

#[tokio::test]
async fn test_failure_is_not_cached() {
    let (factory, connector) = factory();
    connector
        .client()
        .fail_next(StoreError::remote(StatusCode::FORBIDDEN, "forbidden"));

    let err = factory.get_client().await.err().expect("bootstrap should fail");
    assert_eq!(err.source.status(), Some(StatusCode::FORBIDDEN));
    assert!(!factory.is_initialized().await);

    let handle = factory.get_client().await.unwrap();
    assert!(factory.is_initialized().await);
    assert!(Arc::ptr_eq(&handle, &factory.get_client().await.unwrap()));
    assert_eq!(connector.connect_count(), 2);
}

#[tokio::test]
async fn test_reset_then_reinitialize() {
    let (factory, connector) = factory();
    let first = factory.get_client().await.unwrap();

    factory.reset().await;
    assert!(!factory.is_initialized().await);

    let second = factory.get_client().await.unwrap();
    assert_eq!(connector.connect_count(), 2);
    // same in-process store underneath
    assert!(Arc::ptr_eq(&first, &second));
}
