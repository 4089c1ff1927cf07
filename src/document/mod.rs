//! Entity contract for types stored in the document collection.
//!
//! Any type implementing [`Document`] can be persisted through
//! [`DocumentRepository`](crate::repository::DocumentRepository). The
//! repository only ever touches the identifier; every other field is carried
//! as opaque JSON through serde.

pub mod item;

pub use doctodo_derive::Document;
pub use item::Item;

use crate::core::DocumentId;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// One row of the internal-name to wire-name table of an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldMapping {
    pub field: &'static str,
    pub wire: &'static str,
}

/// A type that can be stored as a document.
///
/// Usually derived with `#[derive(Document)]`, which builds [`Document::FIELDS`]
/// from the struct's `#[serde(rename = "...")]` attributes.
pub trait Document: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Internal field name to wire property name, one entry per field
    const FIELDS: &'static [FieldMapping];

    fn id(&self) -> DocumentId;

    fn set_id(&mut self, id: DocumentId);

    /// Wire property name for an internal field name.
    ///
    /// Names that are not in the table are returned as given, so callers may
    /// also pass wire names directly.
    fn wire_name(field: &str) -> &str {
        Self::FIELDS
            .iter()
            .find(|mapping| mapping.field == field)
            .map(|mapping| mapping.wire)
            .unwrap_or(field)
    }
}
