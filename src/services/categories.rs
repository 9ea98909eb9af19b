use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::{ApiError, ApiRequest, Transport};

/// Pseudo-category meaning "no filter"
pub const ALL_CATEGORIES: &str = "All Categories";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoriesResponse {
    pub data: Vec<Category>,
    pub status: u16,
}

pub struct CategoriesService {
    public: Arc<dyn Transport>,
}

impl CategoriesService {
    pub fn new(public: Arc<dyn Transport>) -> Self {
        Self { public }
    }

    pub async fn get_categories(&self) -> Result<CategoriesResponse, ApiError> {
        let response = self
            .public
            .send(&ApiRequest::get("/categories"), None)
            .await?
            .into_result()?;
        let categories: CategoriesResponse = response.json()?;
        debug!(count = categories.data.len(), "Fetched categories");
        Ok(categories)
    }
}
