use crate::core::{StoreError, StoreResult};
use crate::store::CollectionAddress;
use std::env;
use std::fmt;
use std::time::Duration;
use url::Url;

pub const DEFAULT_ENDPOINT: &str = "https://localhost:8081/";
/// Well-known key of the local emulator
pub const DEFAULT_KEY: &str =
    "C2y6yDjf5/R+ob0N8A7Cgv30VRDJIWEHLM+4QDU5DE2nQ9nDuVTqobD4b8mGGyPMbIZnqyMsEcaGQy67XIw/Jw==";
pub const DEFAULT_DATABASE: &str = "queuetms_db";
pub const DEFAULT_COLLECTION: &str = "queuetms_single_collection";
pub const DEFAULT_OFFER_THROUGHPUT: u32 = 1000;

/// Connection settings for the document database account
#[derive(Clone)]
pub struct DocumentDbSettings {
    /// Account endpoint URL
    pub endpoint: String,

    /// Base64 master key
    pub key: String,

    /// Database created on first use when missing
    pub database: String,

    /// Collection created on first use when missing
    pub collection: String,

    /// Provisioned throughput for a newly created collection
    pub offer_throughput: u32,

    /// Per-request timeout of the HTTP client
    pub request_timeout: Duration,

    /// Page size requested by queries that don't set one
    pub page_size: Option<usize>,
}

impl DocumentDbSettings {
    pub fn new(endpoint: &str, key: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            key: key.to_string(),
            ..Self::default()
        }
    }

    /// Settings from `DOCUMENTDB_*` variables, falling back to the defaults.
    ///
    /// A variable that is set but cannot be parsed is an error.
    pub fn from_env() -> StoreResult<Self> {
        let _ = dotenvy::dotenv();

        let mut settings = Self::default();
        if let Ok(endpoint) = env::var("DOCUMENTDB_ENDPOINT") {
            settings.endpoint = endpoint;
        }
        if let Ok(key) = env::var("DOCUMENTDB_KEY") {
            settings.key = key;
        }
        if let Ok(database) = env::var("DOCUMENTDB_DATABASE") {
            settings.database = database;
        }
        if let Ok(collection) = env::var("DOCUMENTDB_COLLECTION") {
            settings.collection = collection;
        }
        if let Ok(throughput) = env::var("DOCUMENTDB_THROUGHPUT") {
            settings.offer_throughput = parse_throughput(&throughput)?;
        }
        Ok(settings)
    }

    pub fn database(mut self, database: &str) -> Self {
        self.database = database.to_string();
        self
    }

    pub fn collection(mut self, collection: &str) -> Self {
        self.collection = collection.to_string();
        self
    }

    pub fn offer_throughput(mut self, throughput: u32) -> Self {
        self.offer_throughput = throughput;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size);
        self
    }

    pub fn collection_address(&self) -> CollectionAddress {
        CollectionAddress::new(&self.database, &self.collection)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.endpoint.trim().is_empty() {
            return Err("Endpoint cannot be empty".to_string());
        }

        Url::parse(&self.endpoint)
            .map_err(|e| format!("Endpoint '{}' is not a valid URL: {}", self.endpoint, e))?;

        if self.key.trim().is_empty() {
            return Err("Key cannot be empty".to_string());
        }

        if self.database.trim().is_empty() {
            return Err("Database name cannot be empty".to_string());
        }

        if self.collection.trim().is_empty() {
            return Err("Collection name cannot be empty".to_string());
        }

        if self.offer_throughput == 0 {
            return Err("offer_throughput must be greater than 0".to_string());
        }

        if self.page_size == Some(0) {
            return Err("page_size must be greater than 0".to_string());
        }

        Ok(())
    }
}

fn parse_throughput(raw: &str) -> StoreResult<u32> {
    raw.trim().parse::<u32>().map_err(|e| {
        StoreError::Configuration(format!(
            "DOCUMENTDB_THROUGHPUT must be a valid u32, got '{}': {}",
            raw, e
        ))
    })
}

impl Default for DocumentDbSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            key: DEFAULT_KEY.to_string(),
            database: DEFAULT_DATABASE.to_string(),
            collection: DEFAULT_COLLECTION.to_string(),
            offer_throughput: DEFAULT_OFFER_THROUGHPUT,
            request_timeout: Duration::from_secs(30),
            page_size: None,
        }
    }
}

impl fmt::Debug for DocumentDbSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentDbSettings")
            .field("endpoint", &self.endpoint)
            .field("key", &"<redacted>")
            .field("database", &self.database)
            .field("collection", &self.collection)
            .field("offer_throughput", &self.offer_throughput)
            .field("request_timeout", &self.request_timeout)
            .field("page_size", &self.page_size)
            .finish()
    }
}
