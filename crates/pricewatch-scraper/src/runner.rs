//! Multi-store orchestration.
//!
//! One store is crawled fully before the next begins, with a pause between
//! stores — a deliberate policy to keep at most one browser session alive
//! and spread load, not a technical limitation. A fault in one store never
//! aborts the others; each store's result records its own outcome.

use std::time::Duration;

use pricewatch_core::{AppConfig, NormalizedProduct, StoreConfig, StoreRegistry};

use crate::crawl::{crawl_store, CancelToken, CrawlOptions};
use crate::error::ScrapeError;
use crate::fetch::FetchSessionFactory;
use crate::normalize::normalize_all;

#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub crawl: CrawlOptions,
    /// Pause between consecutive store crawls.
    pub inter_store_delay: Duration,
}

impl RunnerConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            crawl: CrawlOptions {
                inter_page_delay: Duration::from_millis(config.inter_page_delay_ms),
                page_max_retries: config.page_max_retries,
                retry_backoff_base_secs: config.retry_backoff_base_secs,
            },
            inter_store_delay: Duration::from_millis(config.inter_store_delay_ms),
        }
    }
}

/// Outcome of one store's scrape: normalized products plus crawl accounting.
#[derive(Debug)]
pub struct StoreScrapeResult {
    pub store: String,
    pub products: Vec<NormalizedProduct>,
    pub pages_fetched: u32,
    /// Raw records dropped by normalization.
    pub rejected: usize,
    pub fault: Option<ScrapeError>,
    pub cancelled: bool,
}

impl StoreScrapeResult {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.fault.is_none() && !self.cancelled
    }

    fn empty(store: &StoreConfig, fault: Option<ScrapeError>, cancelled: bool) -> Self {
        Self {
            store: store.id.clone(),
            products: Vec::new(),
            pages_fetched: 0,
            rejected: 0,
            fault,
            cancelled,
        }
    }
}

/// Scrapes one store end to end: open a browser session, crawl, normalize.
///
/// The session is dropped before this function returns, on every path — a
/// faulted crawl still releases its browser.
pub async fn scrape_store(
    factory: &dyn FetchSessionFactory,
    store: &StoreConfig,
    category: &str,
    options: &RunnerConfig,
    cancel: &CancelToken,
) -> StoreScrapeResult {
    if cancel.is_cancelled() {
        return StoreScrapeResult::empty(store, None, true);
    }

    tracing::info!(store = %store.id, category, "starting store crawl");

    let session = match factory.open_session(store).await {
        Ok(session) => session,
        Err(e) => {
            tracing::error!(store = %store.id, error = %e, "failed to open browser session");
            return StoreScrapeResult::empty(store, Some(e), false);
        }
    };

    let outcome = crawl_store(session.as_ref(), store, category, &options.crawl, cancel).await;
    drop(session);

    let clean = outcome.is_clean();
    let (products, rejected) = normalize_all(outcome.products, store);
    tracing::info!(
        store = %store.id,
        products = products.len(),
        rejected,
        pages = outcome.pages_fetched,
        clean = clean,
        "store crawl finished"
    );

    StoreScrapeResult {
        store: outcome.store,
        products,
        pages_fetched: outcome.pages_fetched,
        rejected,
        fault: outcome.fault,
        cancelled: outcome.cancelled,
    }
}

/// Scrapes every registered store sequentially, in registry order, with a
/// pause between stores. Always returns one result per store; cancelled or
/// faulted stores carry empty-or-partial product lists and their outcome
/// flags.
pub async fn scrape_all_stores(
    factory: &dyn FetchSessionFactory,
    registry: &StoreRegistry,
    category: &str,
    options: &RunnerConfig,
    cancel: &CancelToken,
) -> Vec<StoreScrapeResult> {
    let mut results = Vec::with_capacity(registry.len());
    for (index, store) in registry.stores().iter().enumerate() {
        if index > 0 && !options.inter_store_delay.is_zero() && !cancel.is_cancelled() {
            tokio::time::sleep(options.inter_store_delay).await;
        }
        results.push(scrape_store(factory, store, category, options, cancel).await);
    }
    results
}

/// Flattens per-store results into one product collection, preserving store
/// order — the order that makes comparison tie-breaks reproducible.
#[must_use]
pub fn collect_products(results: &[StoreScrapeResult]) -> Vec<NormalizedProduct> {
    results
        .iter()
        .flat_map(|r| r.products.iter().cloned())
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use pricewatch_core::{FieldSelectors, PaginationRules, SelectorList};

    use crate::fetch::{PageFetcher, RenderedPage};

    use super::*;

    fn test_store(id: &str) -> StoreConfig {
        StoreConfig {
            id: id.to_string(),
            base_url: format!("https://{id}.example"),
            selectors: FieldSelectors {
                product_container: SelectorList::new([".product-card"]),
                name: SelectorList::new([".product-name"]),
                price: SelectorList::new([".price"]),
                original_price: None,
                image: SelectorList::new(["img"]),
                link: SelectorList::new(["a"]),
                brand: None,
                category: None,
                in_stock: None,
                sizes: None,
                colors: None,
            },
            pagination: PaginationRules {
                next_page: SelectorList::new([".next"]),
                max_pages: 1,
            },
            out_of_stock_marker: None,
        }
    }

    fn test_registry(stores: Vec<StoreConfig>) -> StoreRegistry {
        StoreRegistry::from_parts("operator".to_string(), stores).unwrap()
    }

    fn fast_options() -> RunnerConfig {
        RunnerConfig {
            crawl: CrawlOptions {
                inter_page_delay: Duration::ZERO,
                page_max_retries: 0,
                retry_backoff_base_secs: 0,
            },
            inter_store_delay: Duration::ZERO,
        }
    }

    fn one_product_page(name: &str, price: &str) -> String {
        format!(
            r#"<div class="product-card"><span class="product-name">{name}</span><span class="price">{price}</span></div>"#
        )
    }

    struct StaticFetcher {
        html: String,
    }

    #[async_trait]
    impl PageFetcher for StaticFetcher {
        async fn fetch_page(
            &self,
            store: &StoreConfig,
            category: &str,
            page_number: u32,
        ) -> Result<RenderedPage, ScrapeError> {
            Ok(RenderedPage {
                url: crate::fetch::listing_url(&store.base_url, category, page_number),
                html: self.html.clone(),
            })
        }
    }

    /// Factory serving canned pages per store, optionally refusing to open a
    /// session for one store.
    struct FakeFactory {
        fail_store: Option<String>,
        opened: Arc<AtomicU32>,
    }

    impl FakeFactory {
        fn new() -> Self {
            Self {
                fail_store: None,
                opened: Arc::new(AtomicU32::new(0)),
            }
        }

        fn failing_for(store: &str) -> Self {
            Self {
                fail_store: Some(store.to_string()),
                opened: Arc::new(AtomicU32::new(0)),
            }
        }
    }

    #[async_trait]
    impl FetchSessionFactory for FakeFactory {
        async fn open_session(
            &self,
            store: &StoreConfig,
        ) -> Result<Box<dyn PageFetcher>, ScrapeError> {
            if self.fail_store.as_deref() == Some(store.id.as_str()) {
                return Err(ScrapeError::Browser {
                    store: store.id.clone(),
                    message: "launch refused".to_string(),
                });
            }
            self.opened.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(StaticFetcher {
                html: one_product_page(&format!("Jersey {}", store.id), "₹500"),
            }))
        }
    }

    #[tokio::test]
    async fn scrapes_every_store_in_registry_order() {
        let registry = test_registry(vec![test_store("storea"), test_store("storeb")]);
        let factory = FakeFactory::new();
        let results = scrape_all_stores(
            &factory,
            &registry,
            "all",
            &fast_options(),
            &CancelToken::new(),
        )
        .await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].store, "storea");
        assert_eq!(results[1].store, "storeb");
        assert!(results.iter().all(StoreScrapeResult::is_clean));
        assert_eq!(factory.opened.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn one_store_fault_leaves_other_stores_unaffected() {
        let registry = test_registry(vec![test_store("storea"), test_store("storeb")]);
        let factory = FakeFactory::failing_for("storea");
        let results = scrape_all_stores(
            &factory,
            &registry,
            "all",
            &fast_options(),
            &CancelToken::new(),
        )
        .await;

        assert_eq!(results.len(), 2);
        assert!(results[0].fault.is_some());
        assert!(results[0].products.is_empty());
        assert!(results[1].is_clean());
        assert_eq!(results[1].products.len(), 1);
    }

    #[tokio::test]
    async fn cancellation_skips_remaining_stores() {
        let registry = test_registry(vec![test_store("storea"), test_store("storeb")]);
        let factory = FakeFactory::new();
        let cancel = CancelToken::new();
        cancel.cancel();

        let results = scrape_all_stores(&factory, &registry, "all", &fast_options(), &cancel).await;

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.cancelled));
        assert_eq!(factory.opened.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn collect_products_preserves_store_order() {
        let registry = test_registry(vec![test_store("storea"), test_store("storeb")]);
        let factory = FakeFactory::new();
        let results = scrape_all_stores(
            &factory,
            &registry,
            "all",
            &fast_options(),
            &CancelToken::new(),
        )
        .await;

        let products = collect_products(&results);
        assert_eq!(products.len(), 2);
        assert_eq!(products[0].store, "storea");
        assert_eq!(products[1].store, "storeb");
    }

    #[tokio::test]
    async fn normalization_rejections_are_counted_per_store() {
        struct MixedFetcher;

        #[async_trait]
        impl PageFetcher for MixedFetcher {
            async fn fetch_page(
                &self,
                store: &StoreConfig,
                category: &str,
                page_number: u32,
            ) -> Result<RenderedPage, ScrapeError> {
                let html = format!(
                    "{}{}",
                    one_product_page("Good", "₹100"),
                    one_product_page("Bad", "price on request")
                );
                Ok(RenderedPage {
                    url: crate::fetch::listing_url(&store.base_url, category, page_number),
                    html,
                })
            }
        }

        struct MixedFactory;

        #[async_trait]
        impl FetchSessionFactory for MixedFactory {
            async fn open_session(
                &self,
                _store: &StoreConfig,
            ) -> Result<Box<dyn PageFetcher>, ScrapeError> {
                Ok(Box::new(MixedFetcher))
            }
        }

        let store = test_store("storea");
        let result = scrape_store(
            &MixedFactory,
            &store,
            "all",
            &fast_options(),
            &CancelToken::new(),
        )
        .await;

        assert_eq!(result.products.len(), 1);
        assert_eq!(result.rejected, 1);
        assert_eq!(result.products[0].name, "Good");
    }
}
