use crate::core::DocumentId;
use std::fmt;

/// Resource link of a database: `dbs/{database}`
pub fn database_link(database: &str) -> String {
    format!("dbs/{}", database)
}

/// Address of one collection inside one database.
///
/// Renders as `dbs/{database}/colls/{collection}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionAddress {
    database: String,
    collection: String,
}

impl CollectionAddress {
    pub fn new(database: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            collection: collection.into(),
        }
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn database_link(&self) -> String {
        database_link(&self.database)
    }

    pub fn link(&self) -> String {
        format!("dbs/{}/colls/{}", self.database, self.collection)
    }

    /// Address of the document with the given identifier in this collection
    pub fn document(&self, id: DocumentId) -> DocumentAddress {
        self.document_named(&id.to_string())
    }

    /// Address of a document by its raw wire identifier
    pub fn document_named(&self, id: &str) -> DocumentAddress {
        DocumentAddress {
            collection: self.clone(),
            id: id.to_string(),
        }
    }
}

impl fmt::Display for CollectionAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.link())
    }
}

/// Address of a single document: `dbs/{database}/colls/{collection}/docs/{id}`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentAddress {
    collection: CollectionAddress,
    id: String,
}

impl DocumentAddress {
    pub fn collection(&self) -> &CollectionAddress {
        &self.collection
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn link(&self) -> String {
        format!("{}/docs/{}", self.collection.link(), self.id)
    }
}

impl fmt::Display for DocumentAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.link())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_links() {
        let collection = CollectionAddress::new("queuetms_db", "queuetms_single_collection");
        assert_eq!(collection.database_link(), "dbs/queuetms_db");
        assert_eq!(
            collection.link(),
            "dbs/queuetms_db/colls/queuetms_single_collection"
        );

        let id: DocumentId = "8e1f0a52-6c3d-4b7a-9f21-0c4d5e6f7a8b".parse().unwrap();
        let document = collection.document(id);
        assert_eq!(
            document.to_string(),
            "dbs/queuetms_db/colls/queuetms_single_collection/docs/8e1f0a52-6c3d-4b7a-9f21-0c4d5e6f7a8b"
        );
        assert_eq!(document.collection(), &collection);
    }
}
