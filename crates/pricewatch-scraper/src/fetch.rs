//! Rendered-page retrieval through a headless Chrome session.
//!
//! The listing pages are client-rendered storefronts, so a plain HTTP GET
//! returns an empty shell; the fetcher drives a real browser, waits for the
//! product container to appear, and hands the rendered DOM snapshot to
//! extraction as an HTML string.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};

use pricewatch_core::{AppConfig, StoreConfig};

use crate::error::ScrapeError;

/// A fully rendered DOM snapshot of one listing page.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub url: String,
    pub html: String,
}

/// Browser-session settings shared by every store crawl.
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    pub navigation_timeout: Duration,
    pub selector_timeout: Duration,
    pub user_agent: String,
}

impl FetcherConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            navigation_timeout: Duration::from_secs(config.navigation_timeout_secs),
            selector_timeout: Duration::from_secs(config.selector_timeout_secs),
            user_agent: config.user_agent.clone(),
        }
    }
}

/// Builds the listing URL for a store, category, and 1-based page number.
///
/// Page 1 carries no query parameter; later pages append `?page=N`.
#[must_use]
pub fn listing_url(base_url: &str, category: &str, page_number: u32) -> String {
    let base = base_url.trim_end_matches('/');
    let mut url = format!("{base}/collections/{category}");
    if page_number > 1 {
        url.push_str(&format!("?page={page_number}"));
    }
    url
}

/// Retrieves rendered listing pages for one store session.
///
/// Implementations own whatever session state they need; the crawl loop only
/// asks for pages and drops the fetcher when the store is done.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch one rendered listing page.
    ///
    /// # Errors
    ///
    /// - [`ScrapeError::NavigationTimeout`] — the page never finished loading.
    /// - [`ScrapeError::SelectorTimeout`] — the page loaded but the product
    ///   container never appeared within the bounded wait.
    /// - [`ScrapeError::Browser`] — the session itself failed.
    async fn fetch_page(
        &self,
        store: &StoreConfig,
        category: &str,
        page_number: u32,
    ) -> Result<RenderedPage, ScrapeError>;
}

/// Opens one fetch session per store crawl.
///
/// The session is the scoped browser resource: the runner acquires it at the
/// start of a store's crawl and drops it on every exit path, fault paths
/// included.
#[async_trait]
pub trait FetchSessionFactory: Send + Sync {
    /// # Errors
    ///
    /// Returns [`ScrapeError::Browser`] when the session cannot be opened.
    async fn open_session(
        &self,
        store: &StoreConfig,
    ) -> Result<Box<dyn PageFetcher>, ScrapeError>;
}

/// A dedicated headless Chrome session for one store crawl.
///
/// Each session gets its own browser process and tab with the configured
/// user agent and a fixed 1366×768 viewport, so every store is visited under
/// a consistent, distinct identity. Dropping the fetcher closes the browser.
pub struct ChromeFetcher {
    /// Keeps the Chrome process alive; closed when the session is dropped.
    _browser: Browser,
    tab: Arc<Tab>,
    config: FetcherConfig,
}

impl ChromeFetcher {
    /// Launches a headless Chrome session ready to fetch pages for `store_id`.
    ///
    /// This spawns a browser process and blocks until it is ready — call it
    /// from a blocking context (see [`ChromeSessionFactory`]).
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Browser`] if the browser cannot be launched or
    /// the tab cannot be prepared.
    pub fn launch(config: FetcherConfig, store_id: &str) -> Result<Self, ScrapeError> {
        let options = LaunchOptions::default_builder()
            .headless(true)
            .window_size(Some((1366, 768)))
            // Container-friendly: Chrome's sandbox needs privileges most
            // deployment targets don't grant.
            .sandbox(false)
            .build()
            .map_err(|e| browser_error(store_id, format!("invalid launch options: {e}")))?;

        let browser = Browser::new(options)
            .map_err(|e| browser_error(store_id, format!("failed to launch browser: {e}")))?;
        let tab = browser
            .new_tab()
            .map_err(|e| browser_error(store_id, format!("failed to open tab: {e}")))?;
        tab.set_user_agent(&config.user_agent, None, None)
            .map_err(|e| browser_error(store_id, format!("failed to set user agent: {e}")))?;

        Ok(Self {
            _browser: browser,
            tab,
            config,
        })
    }
}

#[async_trait]
impl PageFetcher for ChromeFetcher {
    async fn fetch_page(
        &self,
        store: &StoreConfig,
        category: &str,
        page_number: u32,
    ) -> Result<RenderedPage, ScrapeError> {
        let url = listing_url(&store.base_url, category, page_number);
        let tab = Arc::clone(&self.tab);
        // Wait for ANY container candidate to show up; extraction applies
        // the chain in priority order afterwards.
        let container = store.selectors.product_container.css_union();
        let navigation_timeout = self.config.navigation_timeout;
        let selector_timeout = self.config.selector_timeout;
        let store_id = store.id.clone();

        let task = tokio::task::spawn_blocking(move || -> Result<RenderedPage, ScrapeError> {
            tab.set_default_timeout(navigation_timeout);
            tab.navigate_to(&url).map_err(|e| {
                classify_navigation_error(&store_id, &url, navigation_timeout, &e.to_string())
            })?;
            tab.wait_until_navigated().map_err(|e| {
                classify_navigation_error(&store_id, &url, navigation_timeout, &e.to_string())
            })?;

            tab.wait_for_element_with_custom_timeout(&container, selector_timeout)
                .map_err(|_| ScrapeError::SelectorTimeout {
                    store: store_id.clone(),
                    url: url.clone(),
                    selector: container.clone(),
                    timeout_secs: selector_timeout.as_secs(),
                })?;

            let html = tab
                .get_content()
                .map_err(|e| browser_error(&store_id, format!("failed to read page content: {e}")))?;

            Ok(RenderedPage { url, html })
        });

        match task.await {
            Ok(result) => result,
            Err(join_err) => Err(browser_error(
                &store.id,
                format!("fetch task panicked: {join_err}"),
            )),
        }
    }
}

/// Opens a fresh [`ChromeFetcher`] per store.
pub struct ChromeSessionFactory {
    config: FetcherConfig,
}

impl ChromeSessionFactory {
    #[must_use]
    pub fn new(config: FetcherConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl FetchSessionFactory for ChromeSessionFactory {
    async fn open_session(
        &self,
        store: &StoreConfig,
    ) -> Result<Box<dyn PageFetcher>, ScrapeError> {
        let config = self.config.clone();
        let store_id = store.id.clone();
        let task = tokio::task::spawn_blocking(move || ChromeFetcher::launch(config, &store_id));
        match task.await {
            Ok(Ok(fetcher)) => Ok(Box::new(fetcher)),
            Ok(Err(e)) => Err(e),
            Err(join_err) => Err(browser_error(
                &store.id,
                format!("browser launch task panicked: {join_err}"),
            )),
        }
    }
}

fn browser_error(store: &str, message: impl Into<String>) -> ScrapeError {
    ScrapeError::Browser {
        store: store.to_owned(),
        message: message.into(),
    }
}

/// The browser library reports timeouts as opaque error strings ("timed out
/// waiting", "the event waited for never came"), so classification is by
/// message. Anything unrecognized is a session-level fault.
fn classify_navigation_error(
    store: &str,
    url: &str,
    timeout: Duration,
    message: &str,
) -> ScrapeError {
    let lower = message.to_lowercase();
    if lower.contains("timeout") || lower.contains("timed out") || lower.contains("never came") {
        ScrapeError::NavigationTimeout {
            store: store.to_owned(),
            url: url.to_owned(),
            timeout_secs: timeout.as_secs(),
        }
    } else {
        ScrapeError::Browser {
            store: store.to_owned(),
            message: message.to_owned(),
        }
    }
}
