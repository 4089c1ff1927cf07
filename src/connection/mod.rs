//! Lazily created, process-wide document client handle.
//!
//! [`DocumentClientFactory::get_client`] connects on first use, makes sure
//! the configured database and collection exist, and then hands the same
//! handle to every caller until [`DocumentClientFactory::reset`].

pub mod config;
pub mod connector;

pub use config::DocumentDbSettings;
pub use connector::{Connector, InMemoryConnector, RestConnector};

use crate::core::{InitStage, InitializationError, StoreResult};
use crate::store::{CollectionAddress, DocumentClient};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

pub struct DocumentClientFactory {
    settings: DocumentDbSettings,
    collection: CollectionAddress,
    connector: Arc<dyn Connector>,
    client: RwLock<Option<Arc<dyn DocumentClient>>>,
    /// Serializes bootstrap; the slot lock is never held across remote calls
    init_lock: Mutex<()>,
}

impl DocumentClientFactory {
    pub fn new(settings: DocumentDbSettings, connector: Arc<dyn Connector>) -> Self {
        let collection = settings.collection_address();
        Self {
            settings,
            collection,
            connector,
            client: RwLock::new(None),
            init_lock: Mutex::new(()),
        }
    }

    /// Factory over a remote account
    pub fn rest(settings: DocumentDbSettings) -> Self {
        Self::new(settings, Arc::new(RestConnector))
    }

    pub fn settings(&self) -> &DocumentDbSettings {
        &self.settings
    }

    /// Collection every repository built on this factory works against
    pub fn collection(&self) -> &CollectionAddress {
        &self.collection
    }

    pub async fn is_initialized(&self) -> bool {
        self.client.read().await.is_some()
    }

    /// Shared client handle, bootstrapping it on first use.
    ///
    /// Concurrent first callers run the bootstrap exactly once and all get
    /// the same handle. A failed bootstrap is not remembered.
    pub async fn get_client(&self) -> Result<Arc<dyn DocumentClient>, InitializationError> {
        if let Some(client) = self.client.read().await.as_ref() {
            return Ok(Arc::clone(client));
        }

        let _init = self.init_lock.lock().await;

        // another caller may have finished while we waited
        if let Some(client) = self.client.read().await.as_ref() {
            return Ok(Arc::clone(client));
        }

        let client = self.bootstrap().await?;
        *self.client.write().await = Some(Arc::clone(&client));

        info!(
            endpoint = %self.settings.endpoint,
            collection = %self.collection,
            "document client initialized"
        );
        Ok(client)
    }

    /// Drop the cached handle; the next `get_client` bootstraps again
    pub async fn reset(&self) {
        let _init = self.init_lock.lock().await;
        if self.client.write().await.take().is_some() {
            debug!(collection = %self.collection, "document client reset");
        }
    }

    async fn bootstrap(&self) -> Result<Arc<dyn DocumentClient>, InitializationError> {
        let client = self
            .connector
            .connect(&self.settings)
            .await
            .map_err(|e| InitializationError::new(InitStage::Connect, e))?;

        self.ensure_database(client.as_ref())
            .await
            .map_err(|e| InitializationError::new(InitStage::Database, e))?;

        self.ensure_collection(client.as_ref())
            .await
            .map_err(|e| InitializationError::new(InitStage::Collection, e))?;

        Ok(client)
    }

    async fn ensure_database(&self, client: &dyn DocumentClient) -> StoreResult<()> {
        let database = self.collection.database();
        match client.read_database(database).await {
            Ok(_) => Ok(()),
            Err(err) if err.is_not_found() => {
                client.create_database(database).await?;
                info!(database, "created database");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    async fn ensure_collection(&self, client: &dyn DocumentClient) -> StoreResult<()> {
        match client.read_collection(&self.collection).await {
            Ok(_) => Ok(()),
            Err(err) if err.is_not_found() => {
                let throughput = self.settings.offer_throughput;
                client
                    .create_collection(&self.collection, throughput)
                    .await?;
                info!(
                    collection = %self.collection,
                    offer_throughput = throughput,
                    "created collection"
                );
                Ok(())
            }
            Err(err) => Err(err),
        }
    }
}

impl std::fmt::Debug for DocumentClientFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentClientFactory")
            .field("settings", &self.settings)
            .field("collection", &self.collection)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::StoreError;
    use crate::store::InMemoryDocumentClient;
    use http::StatusCode;

    fn factory() -> (DocumentClientFactory, Arc<InMemoryConnector>) {
        let connector = Arc::new(InMemoryConnector::default());
        let settings = DocumentDbSettings::default().database("todo").collection("items");
        (
            DocumentClientFactory::new(settings, connector.clone()),
            connector,
        )
    }

    #[tokio::test]
    async fn test_creates_missing_database_and_collection() {
        let (factory, connector) = factory();
        assert!(!factory.is_initialized().await);

        factory.get_client().await.unwrap();

        let stats = connector.client().stats();
        assert_eq!(stats.databases_created, 1);
        assert_eq!(stats.collections_created, 1);
        assert_eq!(
            connector.client().collection_throughput(factory.collection()).await,
            Some(1000)
        );
        assert!(factory.is_initialized().await);
    }

    #[tokio::test]
    async fn test_second_call_reuses_handle() {
        let (factory, connector) = factory();

        let first = factory.get_client().await.unwrap();
        let second = factory.get_client().await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(connector.connect_count(), 1);
    }

    #[tokio::test]
    async fn test_existing_resources_are_not_recreated() {
        let client = Arc::new(InMemoryDocumentClient::new());
        let collection = CollectionAddress::new("todo", "items");
        client.create_database("todo").await.unwrap();
        client.create_collection(&collection, 400).await.unwrap();

        let connector = Arc::new(InMemoryConnector::new(client.clone()));
        let settings = DocumentDbSettings::default().database("todo").collection("items");
        let factory = DocumentClientFactory::new(settings, connector);
        factory.get_client().await.unwrap();

        assert_eq!(client.stats().databases_created, 1);
        assert_eq!(client.stats().collections_created, 1);
        assert_eq!(client.collection_throughput(&collection).await, Some(400));
    }

    struct RefusingConnector;

    #[async_trait::async_trait]
    impl Connector for RefusingConnector {
        async fn connect(
            &self,
            _settings: &DocumentDbSettings,
        ) -> StoreResult<Arc<dyn DocumentClient>> {
            Err(StoreError::Transport("connection refused".into()))
        }
    }

    #[tokio::test]
    async fn test_connect_failure() {
        let factory =
            DocumentClientFactory::new(DocumentDbSettings::default(), Arc::new(RefusingConnector));
        let err = factory.get_client().await.err().unwrap();
        assert_eq!(err.stage, InitStage::Connect);
        assert!(!factory.is_initialized().await);
    }

    #[tokio::test]
    async fn test_failure_names_stage_and_is_not_cached() {
        let (factory, connector) = factory();
        connector
            .client()
            .fail_next(StoreError::remote(StatusCode::FORBIDDEN, "denied"));

        let err = factory.get_client().await.err().unwrap();
        assert_eq!(err.stage, InitStage::Database);
        assert_eq!(err.source.status(), Some(StatusCode::FORBIDDEN));
        assert!(!factory.is_initialized().await);

        factory.get_client().await.unwrap();
        assert_eq!(connector.connect_count(), 2);
    }

    #[tokio::test]
    async fn test_reset_forces_new_bootstrap() {
        let (factory, connector) = factory();
        factory.get_client().await.unwrap();
        factory.reset().await;
        assert!(!factory.is_initialized().await);

        factory.get_client().await.unwrap();
        assert_eq!(connector.connect_count(), 2);
        // resources already exist the second time
        assert_eq!(connector.client().stats().databases_created, 1);
    }
}
