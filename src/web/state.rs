use std::sync::Arc;

use crate::document::Item;
use crate::repository::Repository;

#[derive(Clone)]
pub struct AppState {
    pub items: Arc<dyn Repository<Item>>,
}

impl AppState {
    pub fn new(items: Arc<dyn Repository<Item>>) -> Self {
        Self { items }
    }
}
