// ============================================================================
// doctodo Library
// ============================================================================

// generated `Document` impls refer to `::doctodo::...`
extern crate self as doctodo;

pub mod config;
pub mod connection;
pub mod core;
pub mod document;
pub mod repository;
pub mod store;
pub mod web;

// Re-export main types for convenience
pub use crate::core::{DocumentId, InitializationError, RepositoryError, RepositoryResult, StoreError};
pub use document::{Document, Item};

// Re-export connection API
pub use connection::{
    Connector, DocumentClientFactory, DocumentDbSettings, InMemoryConnector, RestConnector,
};

// Re-export repository API
pub use repository::{DocumentQuery, DocumentRepository, ItemRepository, Query, Repository};

pub use web::{AppState, build_router};
