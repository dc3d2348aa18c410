use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;

use liftlog_core::models::NewFood;
use liftlog_core::openfoodfacts::{
    CategoriesResponse, ProductResponse, SearchResponse, SuggestResponse, product_to_food,
    transform_to_food,
};
use liftlog_core::service::FoodLookupProvider;

pub const DEFAULT_BASE_URL: &str = "https://world.openfoodfacts.org";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Known product fetched by [`OpenFoodFactsClient::check_api_health`].
const HEALTH_CHECK_BARCODE: &str = "3017620422003";

/// Result of a remote lookup, keeping "unknown" apart from "could not ask".
#[derive(Debug, Clone, PartialEq)]
pub enum LookupOutcome<T> {
    Found(T),
    NotFound,
    Unavailable(String),
}

impl<T> LookupOutcome<T> {
    pub fn found(self) -> Option<T> {
        match self {
            LookupOutcome::Found(value) => Some(value),
            LookupOutcome::NotFound | LookupOutcome::Unavailable(_) => None,
        }
    }
}

pub struct OpenFoodFactsClient {
    client: reqwest::Client,
    base_url: String,
}

impl OpenFoodFactsClient {
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    /// Requests that take longer than `timeout` count as unavailable.
    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(format!("liftlog/{}", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(5)))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `Ok(None)` for a 404, `Err(reason)` for anything that kept us from an answer.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Option<T>, String> {
        let url = format!("{}{path}", self.base_url);
        let resp = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| format!("request to {url} failed: {e}"))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let resp = resp
            .error_for_status()
            .map_err(|e| format!("{url} answered {e}"))?;
        resp.json::<T>()
            .await
            .map(Some)
            .map_err(|e| format!("unreadable response from {url}: {e}"))
    }

    pub async fn fetch_product(&self, barcode: &str) -> LookupOutcome<NewFood> {
        let path = format!("/api/v0/product/{barcode}.json");
        match self.get_json::<ProductResponse>(&path, &[]).await {
            Ok(Some(data)) => {
                // the v0 API answers unknown barcodes with `status: 0`
                if data.status == Some(0) {
                    return LookupOutcome::NotFound;
                }
                let code = data.code.unwrap_or_else(|| barcode.to_string());
                data.product
                    .and_then(|product| transform_to_food(&code, product))
                    .map_or(LookupOutcome::NotFound, LookupOutcome::Found)
            }
            Ok(None) => LookupOutcome::NotFound,
            Err(reason) => LookupOutcome::Unavailable(reason),
        }
    }

    async fn product_search(&self, query: Vec<(&str, String)>) -> LookupOutcome<Vec<NewFood>> {
        match self.get_json::<SearchResponse>("/cgi/search.pl", &query).await {
            Ok(Some(data)) => {
                let foods: Vec<NewFood> = data
                    .products
                    .into_iter()
                    .filter_map(product_to_food)
                    .collect();
                if foods.is_empty() {
                    LookupOutcome::NotFound
                } else {
                    LookupOutcome::Found(foods)
                }
            }
            Ok(None) => LookupOutcome::NotFound,
            Err(reason) => LookupOutcome::Unavailable(reason),
        }
    }

    pub async fn search(&self, query: &str, page: u32, page_size: u32) -> LookupOutcome<Vec<NewFood>> {
        self.product_search(vec![
            ("search_terms", query.to_string()),
            ("search_simple", "1".to_string()),
            ("action", "process".to_string()),
            ("json", "1".to_string()),
            ("page", page.to_string()),
            ("page_size", page_size.to_string()),
        ])
        .await
    }

    pub async fn get_product_by_barcode(&self, barcode: &str) -> Option<NewFood> {
        match self.fetch_product(barcode).await {
            LookupOutcome::Unavailable(reason) => {
                tracing::warn!(barcode, %reason, "OpenFoodFacts product lookup failed");
                None
            }
            outcome => outcome.found(),
        }
    }

    pub async fn search_products(&self, query: &str, page: u32, page_size: u32) -> Vec<NewFood> {
        match self.search(query, page, page_size).await {
            LookupOutcome::Unavailable(reason) => {
                tracing::warn!(query, %reason, "OpenFoodFacts search failed");
                Vec::new()
            }
            outcome => outcome.found().unwrap_or_default(),
        }
    }

    pub async fn get_popular_products(&self, page_size: u32) -> Vec<NewFood> {
        let outcome = self
            .product_search(vec![
                ("sort_by", "popularity".to_string()),
                ("action", "process".to_string()),
                ("json", "1".to_string()),
                ("page_size", page_size.to_string()),
            ])
            .await;
        match outcome {
            LookupOutcome::Unavailable(reason) => {
                tracing::warn!(%reason, "OpenFoodFacts popular products failed");
                Vec::new()
            }
            outcome => outcome.found().unwrap_or_default(),
        }
    }

    /// Names of the categories holding enough products to browse.
    pub async fn get_categories(&self) -> Vec<String> {
        match self.get_json::<CategoriesResponse>("/categories.json", &[]).await {
            Ok(Some(data)) => data.popular_names(),
            Ok(None) => Vec::new(),
            Err(reason) => {
                tracing::warn!(%reason, "OpenFoodFacts categories failed");
                Vec::new()
            }
        }
    }

    pub async fn get_products_by_category(
        &self,
        category: &str,
        page: u32,
        page_size: u32,
    ) -> Vec<NewFood> {
        let outcome = self
            .product_search(vec![
                ("tagtype_0", "categories".to_string()),
                ("tag_contains_0", "contains".to_string()),
                ("tag_0", category.to_string()),
                ("action", "process".to_string()),
                ("json", "1".to_string()),
                ("page", page.to_string()),
                ("page_size", page_size.to_string()),
            ])
            .await;
        match outcome {
            LookupOutcome::Unavailable(reason) => {
                tracing::warn!(category, %reason, "OpenFoodFacts category search failed");
                Vec::new()
            }
            outcome => outcome.found().unwrap_or_default(),
        }
    }

    pub async fn get_product_suggestions(&self, query: &str, limit: u32) -> Vec<String> {
        let params = [
            ("tagtype", "products".to_string()),
            ("string", query.to_string()),
            ("limit", limit.to_string()),
        ];
        match self
            .get_json::<SuggestResponse>("/cgi/suggest.pl", &params)
            .await
        {
            Ok(Some(data)) => data
                .suggestions
                .into_iter()
                .map(liftlog_core::openfoodfacts::Suggestion::into_name)
                .collect(),
            Ok(None) => Vec::new(),
            Err(reason) => {
                tracing::warn!(query, %reason, "OpenFoodFacts suggestions failed");
                Vec::new()
            }
        }
    }

    /// HEAD request against a well-known product, with a 5 s budget.
    pub async fn check_api_health(&self) -> bool {
        let url = format!(
            "{}/api/v0/product/{HEALTH_CHECK_BARCODE}.json",
            self.base_url
        );
        match self
            .client
            .head(&url)
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                tracing::warn!(error = %e, "OpenFoodFacts health check failed");
                false
            }
        }
    }
}

#[async_trait]
impl FoodLookupProvider for OpenFoodFactsClient {
    async fn lookup_barcode(&self, barcode: &str) -> Option<NewFood> {
        self.get_product_by_barcode(barcode).await
    }

    async fn search(&self, query: &str, page: u32, page_size: u32) -> Vec<NewFood> {
        self.search_products(query, page, page_size).await
    }
}
