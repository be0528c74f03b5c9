pub mod crawl;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod normalize;
pub mod runner;

mod retry;

pub use crawl::{crawl_store, CancelToken, CrawlOptions, CrawlOutcome};
pub use error::ScrapeError;
pub use fetch::{
    listing_url, ChromeFetcher, ChromeSessionFactory, FetchSessionFactory, FetcherConfig,
    PageFetcher, RenderedPage,
};
pub use normalize::{normalize_all, normalize_product};
pub use runner::{
    collect_products, scrape_all_stores, scrape_store, RunnerConfig, StoreScrapeResult,
};
