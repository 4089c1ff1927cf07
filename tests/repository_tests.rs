/// Repository tests
///
/// CRUD, paging and fault handling of the item repository over the
/// in-process store.
/// Run with: cargo test --test repository_tests

use doctodo::document::Document;
use doctodo::store::InMemoryDocumentClient;
use doctodo::{
    DocumentClientFactory, DocumentDbSettings, DocumentId, DocumentRepository, InMemoryConnector,
    Item, ItemRepository, Repository, RepositoryError, StoreError,
};
use http::StatusCode;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_test::assert_ok;

fn repository_with(client: Arc<InMemoryDocumentClient>) -> ItemRepository {
    let settings = DocumentDbSettings::default()
        .database("ToDoList")
        .collection("Items");
    let connector = Arc::new(InMemoryConnector::new(client));
    ItemRepository::new(Arc::new(DocumentClientFactory::new(settings, connector)))
}

fn repository() -> (ItemRepository, Arc<InMemoryDocumentClient>) {
    let client = Arc::new(InMemoryDocumentClient::new());
    (repository_with(client.clone()), client)
}

#[tokio::test]
async fn test_add_assigns_fresh_id() {
    let (repo, _) = repository();
    let caller_id = DocumentId::generate();
    let mut item = Item::new("Buy milk").with_description("2 litres");
    item.id = caller_id;

    let stored = repo.add(item).await.unwrap().expect("item stored");
    assert!(!stored.id.is_empty());
    assert_ne!(stored.id, caller_id);

    let fetched = repo.get(stored.id).await.unwrap().expect("item readable");
    assert_eq!(fetched, stored);
    assert_eq!(fetched.name, "Buy milk");
    assert_eq!(fetched.description.as_deref(), Some("2 litres"));
    assert!(!fetched.completed);

    assert!(repo.get(caller_id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_get_missing_is_none() {
    let (repo, _) = repository();
    assert!(repo.get(DocumentId::generate()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_update_missing_is_noop() {
    let (repo, client) = repository();
    let mut ghost = Item::new("ghost");
    ghost.id = DocumentId::generate();

    assert_ok!(repo.update(ghost.clone()).await);

    assert!(repo.get(ghost.id).await.unwrap().is_none());
    assert_eq!(client.stats().document_writes, 0);
}

#[tokio::test]
async fn test_empty_id_makes_no_remote_call() {
    let (repo, client) = repository();
    // bootstrap first so the counters only reflect the calls under test
    repo.factory().get_client().await.unwrap();
    let before = client.stats();

    assert_ok!(repo.update(Item::new("no id")).await);
    assert!(repo.delete(DocumentId::EMPTY).await.unwrap().is_none());

    let after = client.stats();
    assert_eq!(after.document_reads, before.document_reads);
    assert_eq!(after.document_writes, before.document_writes);
}

#[tokio::test]
async fn test_delete() {
    let (repo, client) = repository();
    let stored = repo.add(Item::new("Walk dog")).await.unwrap().unwrap();

    let response = repo.delete(stored.id).await.unwrap().expect("raw response");
    assert_eq!(response.status, StatusCode::NO_CONTENT);
    assert!(repo.get(stored.id).await.unwrap().is_none());
    assert_eq!(client.document_count(repo.collection()).await, 0);

    // already gone
    assert!(repo.delete(stored.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_run_query_drains_every_page() {
    let pages = 4;
    let page_size = 3;
    let client = Arc::new(InMemoryDocumentClient::with_page_size(page_size));
    let repo = repository_with(client.clone());

    for n in 0..pages * page_size {
        repo.add(Item::new(format!("task {}", n))).await.unwrap().unwrap();
    }
    let before = client.stats().pages_served;

    let items = repo.run_query(repo.query()).await.unwrap();
    assert_eq!(items.len(), pages * page_size);
    assert_eq!(client.stats().pages_served - before, pages);
}

#[tokio::test]
async fn test_run_query_with_filters() {
    let (repo, _) = repository();
    repo.add(Item::new("Buy milk")).await.unwrap();
    repo.add(Item::new("Buy bread").completed(true)).await.unwrap();
    repo.add(Item::new("Call mum")).await.unwrap();

    let open = repo
        .run_query(repo.query().field_eq("completed", false))
        .await
        .unwrap();
    let mut names: Vec<_> = open.iter().map(|item| item.name.as_str()).collect();
    names.sort();
    assert_eq!(names, vec!["Buy milk", "Call mum"]);

    let shopping = repo
        .run_query(repo.query().field_contains("name", "Buy").max_item_count(1))
        .await
        .unwrap();
    assert_eq!(shopping.len(), 2);
}

#[tokio::test]
async fn test_run_count() {
    let (repo, _) = repository();
    for n in 0..5 {
        repo.add(Item::new(format!("task {}", n)).completed(n < 2))
            .await
            .unwrap();
    }

    assert_eq!(repo.run_count(repo.query()).await.unwrap(), 5);
    assert_eq!(
        repo.run_count(repo.query().field_eq("completed", true))
            .await
            .unwrap(),
        2
    );
}

#[tokio::test]
async fn test_buy_milk_scenario() {
    let (repo, _) = repository();

    let added = repo.add(Item::new("Buy milk")).await.unwrap().unwrap();
    let mut item = repo.get(added.id).await.unwrap().unwrap();
    assert!(!item.completed);

    item.completed = true;
    assert_ok!(repo.update(item.clone()).await);
    let item = repo.get(added.id).await.unwrap().unwrap();
    assert!(item.completed);
    assert_eq!(item.name, "Buy milk");

    assert!(repo.delete(added.id).await.unwrap().is_some());
    assert!(repo.get(added.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_point_faults_are_absorbed() {
    let (repo, client) = repository();
    let stored = repo.add(Item::new("Buy milk")).await.unwrap().unwrap();

    client.fail_next(
        StoreError::remote(StatusCode::TOO_MANY_REQUESTS, "Request rate is large")
            .with_retry_after(std::time::Duration::from_millis(100)),
    );
    assert!(repo.get(stored.id).await.unwrap().is_none());

    client.fail_next(StoreError::remote(
        StatusCode::SERVICE_UNAVAILABLE,
        "Service is currently unavailable",
    ));
    assert!(repo.add(Item::new("Buy bread")).await.unwrap().is_none());

    // the fault was consumed; the document is still there
    assert!(repo.get(stored.id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_query_fault_reaches_caller() {
    let (repo, client) = repository();
    repo.add(Item::new("Buy milk")).await.unwrap();

    client.fail_next(StoreError::remote(StatusCode::BAD_REQUEST, "Syntax error"));
    let err = repo.run_query(repo.query()).await.unwrap_err();
    assert!(matches!(err, RepositoryError::Query(_)));
}

#[tokio::test]
async fn test_bootstrap_failure_reaches_caller() {
    let (repo, client) = repository();
    client.fail_next(StoreError::remote(StatusCode::UNAUTHORIZED, "bad signature"));

    let err = repo.get(DocumentId::generate()).await.unwrap_err();
    assert!(matches!(err, RepositoryError::Initialization(_)));

    // nothing cached; the next call bootstraps normally
    assert!(repo.get(DocumentId::generate()).await.unwrap().is_none());
}

/// Entity whose identifier is not called `id` and whose fields are camelCased on the wire
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, Document)]
#[serde(rename_all = "camelCase")]
struct Task {
    #[document(id)]
    #[serde(rename = "id")]
    task_id: DocumentId,
    title: String,
    is_complete: bool,
}

#[tokio::test]
async fn test_renamed_fields_through_repository() {
    let client = Arc::new(InMemoryDocumentClient::new());
    let connector = Arc::new(InMemoryConnector::new(client.clone()));
    let factory = DocumentClientFactory::new(DocumentDbSettings::default(), connector);
    let repo = DocumentRepository::<Task>::new(Arc::new(factory));

    let open = Task {
        title: "Write report".to_string(),
        ..Task::default()
    };
    let done = Task {
        title: "File taxes".to_string(),
        is_complete: true,
        ..Task::default()
    };
    let open = repo.add(open).await.unwrap().expect("task stored");
    repo.add(done).await.unwrap().expect("task stored");
    assert!(!open.task_id.is_empty());

    let fetched = repo.get(open.task_id).await.unwrap().expect("task readable");
    assert_eq!(fetched, open);

    let pending = repo
        .run_query(repo.query().field_eq("is_complete", false))
        .await
        .unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].title, "Write report");

    assert_eq!(
        repo.run_count(repo.query().field_contains("title", "taxes"))
            .await
            .unwrap(),
        1
    );
}
