pub mod error;
pub mod types;

pub use error::{
    InitStage, InitializationError, RepositoryError, RepositoryResult, StoreError, StoreResult,
};
pub use types::DocumentId;
