//! The per-store crawl loop: fetch → extract → check-next-page, repeated
//! strictly in increasing page order until a termination condition.
//!
//! Termination is reached when the page cap is hit, the next-page control is
//! absent or disabled, a page yields zero products, the crawl is cancelled,
//! or a fetch fault survives its retries. A fault never discards what was
//! already gathered: the outcome carries the partial results alongside it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use pricewatch_core::{RawProduct, StoreConfig};

use crate::error::ScrapeError;
use crate::extract::{extract_products, has_next_page};
use crate::fetch::PageFetcher;
use crate::retry::retry_with_backoff;

/// Cooperative cancellation flag shared between a crawl and its caller.
///
/// Checked at the start of every fetch cycle and between stores — an
/// in-flight page fetch is allowed to finish.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct CrawlOptions {
    /// Pause inserted before every page after the first.
    pub inter_page_delay: Duration,
    /// Additional attempts for one failing page before the crawl terminates.
    pub page_max_retries: u32,
    /// Base delay in seconds for the retry backoff schedule.
    pub retry_backoff_base_secs: u64,
}

/// Result of one store crawl: products from every completed page, in crawl
/// order, plus how the crawl ended.
#[derive(Debug)]
pub struct CrawlOutcome {
    pub store: String,
    pub products: Vec<RawProduct>,
    pub pages_fetched: u32,
    /// The fetch fault that terminated the crawl, when one did.
    pub fault: Option<ScrapeError>,
    pub cancelled: bool,
}

impl CrawlOutcome {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.fault.is_none() && !self.cancelled
    }
}

/// Crawls one store's listing pages for `category`, accumulating raw
/// products until a termination condition is met.
pub async fn crawl_store(
    fetcher: &dyn PageFetcher,
    store: &StoreConfig,
    category: &str,
    options: &CrawlOptions,
    cancel: &CancelToken,
) -> CrawlOutcome {
    let mut products: Vec<RawProduct> = Vec::new();
    let mut pages_fetched = 0u32;
    let mut fault = None;
    let mut cancelled = false;
    let max_pages = store.pagination.max_pages.max(1);

    for page_number in 1..=max_pages {
        if cancel.is_cancelled() {
            tracing::info!(store = %store.id, page_number, "crawl cancelled");
            cancelled = true;
            break;
        }

        if page_number > 1 && !options.inter_page_delay.is_zero() {
            tokio::time::sleep(options.inter_page_delay).await;
        }

        let page = match retry_with_backoff(
            options.page_max_retries,
            options.retry_backoff_base_secs,
            || fetcher.fetch_page(store, category, page_number),
        )
        .await
        {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!(
                    store = %store.id,
                    page_number,
                    error = %e,
                    "store crawl terminated by fetch fault"
                );
                fault = Some(e);
                break;
            }
        };
        pages_fetched += 1;

        let page_products = extract_products(&page, store);
        tracing::info!(
            store = %store.id,
            page_number,
            count = page_products.len(),
            "extracted listing page"
        );

        if page_products.is_empty() {
            break;
        }
        products.extend(page_products);

        if page_number == max_pages || !has_next_page(&page, &store.pagination) {
            break;
        }
    }

    CrawlOutcome {
        store: store.id.clone(),
        products,
        pages_fetched,
        fault,
        cancelled,
    }
}
