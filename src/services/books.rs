use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::{ApiError, ApiRequest, Transport};
use crate::pagination::Pagination;
use crate::rating::StarRating;
use crate::services::categories::ALL_CATEGORIES;

const DEFAULT_PAGE: u32 = 1;
const DEFAULT_LIMIT: u32 = 10;

// ============================================================================
// Query
// ============================================================================

/// Catalog listing filters. Unset fields are left out of the query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BooksQuery {
    pub category: Option<String>,
    pub limit: Option<u32>,
    pub page: Option<u32>,
    pub search: Option<String>,
}

impl Default for BooksQuery {
    fn default() -> Self {
        Self {
            category: None,
            limit: Some(DEFAULT_LIMIT),
            page: Some(DEFAULT_PAGE),
            search: None,
        }
    }
}

impl BooksQuery {
    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    /// Change the page size. Goes back to the first page.
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self.page = Some(DEFAULT_PAGE);
        self
    }

    /// Filter by category name. Goes back to the first page; `None` and
    /// "All Categories" both drop the filter.
    pub fn with_category(mut self, category: Option<String>) -> Self {
        self.category = category.filter(|c| c != ALL_CATEGORIES && !c.is_empty());
        self.page = Some(DEFAULT_PAGE);
        self
    }

    pub fn with_search(mut self, keyword: impl Into<String>) -> Self {
        let keyword = keyword.into();
        self.search = (!keyword.trim().is_empty()).then_some(keyword);
        self
    }

    fn to_request(&self) -> ApiRequest {
        ApiRequest::get("/books")
            .query("page", self.page)
            .query("limit", self.limit)
            .query("category", self.category.as_deref())
            .query("search", self.search.as_deref())
    }
}

// ============================================================================
// Response types
// ============================================================================

/// Catalog entry as listed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverallBook {
    pub author_name: String,
    pub id: i64,
    pub photo_path: String,
    pub title: String,
    pub total_rating_count: u64,
    pub total_rating_value: f64,
    pub unit_price: f64,
}

impl OverallBook {
    pub fn rating(&self) -> StarRating {
        StarRating::from_totals(self.total_rating_value, self.total_rating_count)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BooksPage {
    pub data: Vec<OverallBook>,
    pub pagination: Pagination,
    pub status: u16,
}

impl BooksPage {
    /// True when the requested page lies past the end of the listing
    pub fn is_out_of_range(&self, query: &BooksQuery) -> bool {
        self.data.is_empty()
            && query
                .page
                .is_some_and(|page| self.pagination.is_beyond_last_page(page))
    }
}

// ============================================================================
// Service
// ============================================================================

pub struct BooksService {
    public: Arc<dyn Transport>,
}

impl BooksService {
    pub fn new(public: Arc<dyn Transport>) -> Self {
        Self { public }
    }

    pub async fn get_books(&self, query: &BooksQuery) -> Result<BooksPage, ApiError> {
        let response = self
            .public
            .send(&query.to_request(), None)
            .await?
            .into_result()?;
        let page: BooksPage = response.json()?;
        debug!(
            count = page.data.len(),
            page = page.pagination.current_page,
            total_pages = page.pagination.total_pages,
            "Fetched books"
        );
        Ok(page)
    }
}
