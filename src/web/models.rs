use crate::core::DocumentId;
use crate::document::Item;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T> {
    pub data: T,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApiMessage {
    pub message: String,
}

/// Body of `POST /items` and `PUT /items/:id`
#[derive(Debug, Clone, Deserialize)]
pub struct ItemRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "isComplete", alias = "completed")]
    pub completed: bool,
}

impl ItemRequest {
    pub fn into_item(self, id: DocumentId) -> Item {
        Item {
            id,
            name: self.name,
            description: self.description,
            completed: self.completed,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CountQuery {
    pub completed: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ItemCount {
    pub count: usize,
}
