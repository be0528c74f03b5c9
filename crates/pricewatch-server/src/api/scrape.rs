use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use pricewatch_core::NormalizedProduct;
use pricewatch_scraper::{collect_products, StoreScrapeResult};

use crate::jobs;
use crate::middleware::RequestId;

use super::{ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct ScrapeParams {
    /// Store id, or `"all"` (the default) for every registered store.
    pub store: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ScheduleScrapeBody {
    pub store: String,
    pub category: Option<String>,
}

/// Per-store accounting for one scrape response.
#[derive(Debug, Serialize)]
pub(super) struct StoreSummary {
    pub store: String,
    pub product_count: usize,
    pub pages_fetched: u32,
    pub rejected: usize,
    pub error: Option<String>,
    pub cancelled: bool,
}

#[derive(Debug, Serialize)]
pub(super) struct ScrapeData {
    pub store: String,
    pub category: String,
    /// `false` when any store's crawl faulted or was cancelled; the gathered
    /// products are still returned.
    pub success: bool,
    pub product_count: usize,
    pub products: Vec<NormalizedProduct>,
    pub stores: Vec<StoreSummary>,
    pub scraped_at: DateTime<Utc>,
}

impl StoreSummary {
    fn from_result(result: &StoreScrapeResult) -> Self {
        Self {
            store: result.store.clone(),
            product_count: result.products.len(),
            pages_fetched: result.pages_fetched,
            rejected: result.rejected,
            error: result.fault.as_ref().map(ToString::to_string),
            cancelled: result.cancelled,
        }
    }
}

/// GET /api/v1/scrape — crawl the requested scope and return every product
/// gathered, with per-store outcomes.
pub(super) async fn run_scrape(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(params): Query<ScrapeParams>,
) -> Result<Json<ApiResponse<ScrapeData>>, ApiError> {
    let scope = params.store.unwrap_or_else(|| "all".to_owned());
    let category = params
        .category
        .unwrap_or_else(|| state.config.default_category.clone());

    let results = jobs::scrape_scope(&state, &scope, &category)
        .await
        .map_err(|e| ApiError::new(req_id.0.clone(), "unknown_store", e.to_string()))?;

    Ok(Json(ApiResponse {
        data: scrape_data(scope, category, &results),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// POST /api/v1/scrape — acknowledge immediately and crawl in background,
/// writing results to the sink.
pub(super) async fn schedule_scrape(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<ScheduleScrapeBody>,
) -> Result<Json<ApiResponse<ScheduleData>>, ApiError> {
    if body.store != "all" {
        state
            .registry
            .get(&body.store)
            .map_err(|e| ApiError::new(req_id.0.clone(), "unknown_store", e.to_string()))?;
    }
    let category = body
        .category
        .unwrap_or_else(|| state.config.default_category.clone());

    let message = format!("scraping started for {}", body.store);
    jobs::spawn_scrape_job(state, body.store.clone(), category.clone());

    Ok(Json(ApiResponse {
        data: ScheduleData {
            message,
            store: body.store,
            category,
            scheduled_at: Utc::now(),
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[derive(Debug, Serialize)]
pub(super) struct ScheduleData {
    pub message: String,
    pub store: String,
    pub category: String,
    pub scheduled_at: DateTime<Utc>,
}

fn scrape_data(scope: String, category: String, results: &[StoreScrapeResult]) -> ScrapeData {
    let products = collect_products(results);
    ScrapeData {
        store: scope,
        category,
        success: results.iter().all(StoreScrapeResult::is_clean),
        product_count: products.len(),
        products,
        stores: results.iter().map(StoreSummary::from_result).collect(),
        scraped_at: Utc::now(),
    }
}
