//! Background scrape and comparison jobs.
//!
//! Fire-and-forget submissions from the POST endpoints and the cron
//! scheduler land here. The completion contract is explicit: results are
//! written to the sink under well-known collection names, and any failure is
//! logged — callers needing status poll the sink output.

use pricewatch_compare::generate_comparisons;
use pricewatch_core::ConfigError;
use pricewatch_scraper::{
    collect_products, scrape_all_stores, scrape_store, ChromeSessionFactory, FetcherConfig,
    RunnerConfig, StoreScrapeResult,
};
use pricewatch_sink::{store_products_collection, JsonSink, SinkError, PRICE_COMPARISONS};

use crate::api::AppState;

/// Runs the scrape for `scope` (`"all"` or one store id) against a fresh
/// browser session per store.
///
/// # Errors
///
/// Returns [`ConfigError::UnknownStore`] for an unrecognized single-store
/// scope; per-store crawl faults are carried inside the results instead.
pub(crate) async fn scrape_scope(
    state: &AppState,
    scope: &str,
    category: &str,
) -> Result<Vec<StoreScrapeResult>, ConfigError> {
    let factory = ChromeSessionFactory::new(FetcherConfig::from_app_config(&state.config));
    let options = RunnerConfig::from_app_config(&state.config);

    if scope == "all" {
        Ok(scrape_all_stores(&factory, &state.registry, category, &options, &state.cancel).await)
    } else {
        let store = state.registry.get(scope)?;
        Ok(vec![
            scrape_store(&factory, store, category, &options, &state.cancel).await,
        ])
    }
}

/// Persists per-store product collections, plus the combined document when
/// the whole registry was scraped.
pub(crate) async fn persist_scrape(
    state: &AppState,
    scope: &str,
    category: &str,
    results: &[StoreScrapeResult],
) -> Result<(), SinkError> {
    let sink = JsonSink::new(state.config.data_dir.clone());
    for result in results {
        sink.write_collection(
            &store_products_collection(&result.store, category),
            &result.products,
        )
        .await?;
    }
    if scope == "all" {
        sink.write_combined_products(
            results
                .iter()
                .map(|r| (r.store.as_str(), r.products.as_slice())),
        )
        .await?;
    }
    Ok(())
}

/// Submits a background scrape; the acknowledgment to the caller has already
/// been sent by the time this work runs.
pub(crate) fn spawn_scrape_job(state: AppState, scope: String, category: String) {
    tokio::spawn(async move {
        tracing::info!(scope = %scope, category = %category, "background scrape started");
        let results = match scrape_scope(&state, &scope, &category).await {
            Ok(results) => results,
            Err(e) => {
                tracing::error!(scope = %scope, error = %e, "background scrape aborted");
                return;
            }
        };
        match persist_scrape(&state, &scope, &category, &results).await {
            Ok(()) => {
                let total: usize = results.iter().map(|r| r.products.len()).sum();
                tracing::info!(scope = %scope, products = total, "background scrape completed");
            }
            Err(e) => {
                tracing::error!(scope = %scope, error = %e, "background scrape failed to persist");
            }
        }
    });
}

/// Submits a background full scrape + comparison cycle.
pub(crate) fn spawn_compare_job(state: AppState, category: String) {
    tokio::spawn(async move {
        tracing::info!(category = %category, "background price comparison started");
        let results = match scrape_scope(&state, "all", &category).await {
            Ok(results) => results,
            Err(e) => {
                tracing::error!(error = %e, "background price comparison aborted");
                return;
            }
        };
        let products = collect_products(&results);
        let comparisons = generate_comparisons(&products, state.registry.operator());

        let sink = JsonSink::new(state.config.data_dir.clone());
        match sink.write_collection(PRICE_COMPARISONS, &comparisons).await {
            Ok(path) => {
                tracing::info!(
                    comparisons = comparisons.len(),
                    path = %path.display(),
                    "background price comparison completed"
                );
            }
            Err(e) => {
                tracing::error!(error = %e, "background price comparison failed to persist");
            }
        }
    });
}
