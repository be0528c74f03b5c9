//! Recurring full scrape + comparison runs.
//!
//! Enabled by setting `PRICEWATCH_SCRAPE_CRON`; each firing scrapes every
//! registered store, persists the per-store and combined collections, and
//! rewrites the comparison document.

use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use pricewatch_compare::generate_comparisons;
use pricewatch_scraper::collect_products;
use pricewatch_sink::{JsonSink, PRICE_COMPARISONS};

use crate::api::AppState;
use crate::jobs;

/// Builds and starts the background job scheduler, when a cron expression is
/// configured. Returns the running handle, which must be kept alive for the
/// lifetime of the process — dropping it shuts down all jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// the job cannot be registered, or the scheduler fails to start.
pub(crate) async fn build_scheduler(
    state: AppState,
) -> Result<Option<JobScheduler>, JobSchedulerError> {
    let Some(cron) = state.config.scrape_cron.clone() else {
        tracing::info!("PRICEWATCH_SCRAPE_CRON not set; recurring scrape disabled");
        return Ok(None);
    };

    let scheduler = JobScheduler::new().await?;

    let job = Job::new_async(cron.as_str(), move |_uuid, _lock| {
        let state = state.clone();
        Box::pin(async move {
            tracing::info!("scheduler: starting full scrape and comparison run");
            run_full_cycle(&state).await;
            tracing::info!("scheduler: full scrape and comparison run complete");
        })
    })?;

    scheduler.add(job).await?;
    scheduler.start().await?;
    tracing::info!(cron = %cron, "recurring scrape scheduled");
    Ok(Some(scheduler))
}

/// One scheduled cycle: scrape everything, persist products, rewrite
/// comparisons. Failures are logged and end the cycle; the next firing
/// starts fresh.
async fn run_full_cycle(state: &AppState) {
    let category = state.config.default_category.clone();

    let results = match jobs::scrape_scope(state, "all", &category).await {
        Ok(results) => results,
        Err(e) => {
            tracing::error!(error = %e, "scheduler: scrape failed");
            return;
        }
    };

    if let Err(e) = jobs::persist_scrape(state, "all", &category, &results).await {
        tracing::error!(error = %e, "scheduler: failed to persist products");
        return;
    }

    let products = collect_products(&results);
    let comparisons = generate_comparisons(&products, state.registry.operator());
    let sink = JsonSink::new(state.config.data_dir.clone());
    match sink.write_collection(PRICE_COMPARISONS, &comparisons).await {
        Ok(path) => {
            tracing::info!(
                comparisons = comparisons.len(),
                path = %path.display(),
                "scheduler: comparisons written"
            );
        }
        Err(e) => {
            tracing::error!(error = %e, "scheduler: failed to persist comparisons");
        }
    }
}
