use super::Document;
use crate::core::DocumentId;
use serde::{Deserialize, Serialize};

/// A to-do list entry
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, Document)]
pub struct Item {
    #[serde(rename = "id")]
    pub id: DocumentId,

    #[serde(rename = "name", default)]
    pub name: String,

    #[serde(rename = "description", default)]
    pub description: Option<String>,

    #[serde(rename = "isComplete", default)]
    pub completed: bool,
}

impl Item {
    /// New open item without an identifier
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn completed(mut self, completed: bool) -> Self {
        self.completed = completed;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_names() {
        let item = Item {
            id: "0d5c3a1e-2b4f-4e6a-8c9d-1a2b3c4d5e6f".parse().unwrap(),
            name: "Buy milk".into(),
            description: Some("2 litres".into()),
            completed: true,
        };

        let wire = serde_json::to_value(&item).unwrap();
        assert_eq!(
            wire,
            json!({
                "id": "0d5c3a1e-2b4f-4e6a-8c9d-1a2b3c4d5e6f",
                "name": "Buy milk",
                "description": "2 litres",
                "isComplete": true,
            })
        );
    }

    #[test]
    fn test_reads_stored_document_with_system_properties() {
        let stored = json!({
            "id": "0d5c3a1e-2b4f-4e6a-8c9d-1a2b3c4d5e6f",
            "name": "Walk the dog",
            "description": null,
            "isComplete": false,
            "_rid": "Z5xYAOqmQ8QBAAAAAAAAAA==",
            "_etag": "\"0000d986-0000-0000-0000-5f1b7c9a0000\"",
            "_ts": 1595636890
        });

        let item: Item = serde_json::from_value(stored).unwrap();
        assert_eq!(item.name, "Walk the dog");
        assert_eq!(item.description, None);
        assert!(!item.completed);
    }

    #[test]
    fn test_field_table() {
        assert_eq!(Item::wire_name("completed"), "isComplete");
        assert_eq!(Item::wire_name("name"), "name");
        assert_eq!(Item::wire_name("isComplete"), "isComplete");
        assert_eq!(Item::FIELDS.len(), 4);
    }

    #[test]
    fn test_id_accessors() {
        let mut item = Item::new("Buy milk");
        assert!(item.id().is_empty());

        let id = DocumentId::generate();
        item.set_id(id);
        assert_eq!(item.id(), id);
    }
}
