use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use pricewatch_compare::{filter_comparisons, generate_comparisons, PriceComparison};
use pricewatch_scraper::{collect_products, StoreScrapeResult};

use crate::jobs;
use crate::middleware::RequestId;

use super::{ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct ComparisonParams {
    /// Case-insensitive product-name substring filter.
    pub product: Option<String>,
    /// Case-insensitive brand substring filter.
    pub brand: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ScheduleComparisonBody {
    pub category: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct ComparisonData {
    /// `false` when any store's crawl faulted or was cancelled; comparisons
    /// are still computed over what was gathered.
    pub success: bool,
    pub total_comparisons: usize,
    pub comparisons: Vec<PriceComparison>,
    pub scraped_at: DateTime<Utc>,
}

/// GET /api/v1/price-comparison — scrape every store, compare across them,
/// and optionally filter by product name and brand.
pub(super) async fn run_comparison(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(params): Query<ComparisonParams>,
) -> Result<Json<ApiResponse<ComparisonData>>, ApiError> {
    let category = params
        .category
        .unwrap_or_else(|| state.config.default_category.clone());

    let results = jobs::scrape_scope(&state, "all", &category)
        .await
        .map_err(|e| ApiError::new(req_id.0.clone(), "internal_error", e.to_string()))?;

    Ok(Json(ApiResponse {
        data: comparison_data(
            &state,
            &results,
            params.product.as_deref(),
            params.brand.as_deref(),
        ),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// POST /api/v1/price-comparison — acknowledge immediately; the full cycle
/// runs in background and rewrites the comparison collection in the sink.
pub(super) async fn schedule_comparison(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    body: Option<Json<ScheduleComparisonBody>>,
) -> Json<ApiResponse<ScheduleComparisonData>> {
    let category = body
        .and_then(|Json(b)| b.category)
        .unwrap_or_else(|| state.config.default_category.clone());

    jobs::spawn_compare_job(state, category.clone());

    Json(ApiResponse {
        data: ScheduleComparisonData {
            message: "price comparison started".to_string(),
            category,
            scheduled_at: Utc::now(),
        },
        meta: ResponseMeta::new(req_id.0),
    })
}

#[derive(Debug, Serialize)]
pub(super) struct ScheduleComparisonData {
    pub message: String,
    pub category: String,
    pub scheduled_at: DateTime<Utc>,
}

fn comparison_data(
    state: &AppState,
    results: &[StoreScrapeResult],
    product: Option<&str>,
    brand: Option<&str>,
) -> ComparisonData {
    let products = collect_products(results);
    let comparisons = generate_comparisons(&products, state.registry.operator());
    let comparisons = filter_comparisons(comparisons, product, brand);

    ComparisonData {
        success: results.iter().all(StoreScrapeResult::is_clean),
        total_comparisons: comparisons.len(),
        comparisons,
        scraped_at: Utc::now(),
    }
}
