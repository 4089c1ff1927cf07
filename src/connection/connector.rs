use super::DocumentDbSettings;
use crate::core::{StoreError, StoreResult};
use crate::store::{DocumentClient, InMemoryDocumentClient, RestDocumentClient};
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Opens a session with the document database account.
///
/// The factory calls this once per successful bootstrap.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, settings: &DocumentDbSettings)
    -> StoreResult<Arc<dyn DocumentClient>>;
}

/// Connects to a remote account over HTTPS
#[derive(Debug, Default, Clone, Copy)]
pub struct RestConnector;

#[async_trait]
impl Connector for RestConnector {
    async fn connect(
        &self,
        settings: &DocumentDbSettings,
    ) -> StoreResult<Arc<dyn DocumentClient>> {
        settings.validate().map_err(StoreError::Configuration)?;

        let client = RestDocumentClient::new(
            &settings.endpoint,
            &settings.key,
            settings.request_timeout,
        )?;
        client.open().await?;

        let client: Arc<dyn DocumentClient> = Arc::new(client);
        Ok(client)
    }
}

/// Hands out a shared in-process store
pub struct InMemoryConnector {
    client: Arc<InMemoryDocumentClient>,
    connects: AtomicUsize,
}

impl InMemoryConnector {
    pub fn new(client: Arc<InMemoryDocumentClient>) -> Self {
        Self {
            client,
            connects: AtomicUsize::new(0),
        }
    }

    pub fn client(&self) -> &Arc<InMemoryDocumentClient> {
        &self.client
    }

    /// Number of `connect` calls so far
    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

impl Default for InMemoryConnector {
    fn default() -> Self {
        Self::new(Arc::new(InMemoryDocumentClient::new()))
    }
}

#[async_trait]
impl Connector for InMemoryConnector {
    async fn connect(
        &self,
        _settings: &DocumentDbSettings,
    ) -> StoreResult<Arc<dyn DocumentClient>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        self.client.open().await?;
        let client: Arc<dyn DocumentClient> = self.client.clone();
        Ok(client)
    }
}
