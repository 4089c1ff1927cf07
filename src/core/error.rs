use http::StatusCode;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Failure reported by a single call to the document store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Document store returned {status}: {message}")]
    Remote {
        status: StatusCode,
        message: String,
        /// Delay the store asked the caller to wait before retrying
        retry_after: Option<Duration>,
    },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

impl StoreError {
    pub fn remote(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Remote {
            status,
            message: message.into(),
            retry_after: None,
        }
    }

    pub fn not_found(resource: impl fmt::Display) -> Self {
        Self::remote(
            StatusCode::NOT_FOUND,
            format!("Resource '{}' not found", resource),
        )
    }

    pub fn conflict(resource: impl fmt::Display) -> Self {
        Self::remote(
            StatusCode::CONFLICT,
            format!("Resource '{}' already exists", resource),
        )
    }

    /// Attach a retry hint to a remote failure; other kinds are returned unchanged
    pub fn with_retry_after(self, delay: Duration) -> Self {
        match self {
            Self::Remote {
                status, message, ..
            } => Self::Remote {
                status,
                message,
                retry_after: Some(delay),
            },
            other => other,
        }
    }

    /// HTTP status of a remote failure
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Remote { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Remote { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

/// Bootstrap step of the client factory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitStage {
    Connect,
    Database,
    Collection,
}

impl fmt::Display for InitStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self {
            InitStage::Connect => "connect",
            InitStage::Database => "database check",
            InitStage::Collection => "collection check",
        };
        f.write_str(stage)
    }
}

/// Fatal failure while creating the shared client handle.
///
/// Never cached: the next `get_client()` call starts the bootstrap again.
#[derive(Error, Debug)]
#[error("Failed to initialize document client during {stage}: {source}")]
pub struct InitializationError {
    pub stage: InitStage,
    #[source]
    pub source: StoreError,
}

impl InitializationError {
    pub fn new(stage: InitStage, source: StoreError) -> Self {
        Self { stage, source }
    }
}

/// Errors that cross the repository boundary.
///
/// Single-document faults never show up here; they are logged and turned
/// into `None` by the repository.
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error(transparent)]
    Initialization(#[from] InitializationError),

    #[error("Query failed: {0}")]
    Query(#[from] StoreError),
}

pub type RepositoryResult<T> = std::result::Result<T, RepositoryError>;
