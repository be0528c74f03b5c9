use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Process-wide settings loaded from environment variables.
///
/// Every field has a default; see [`crate::config::load_app_config`] for the
/// variable names and default values.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    /// Path to the store registry YAML document.
    pub stores_path: PathBuf,
    /// Directory the sink writes collection files into.
    pub data_dir: PathBuf,
    /// Category segment used when a caller does not name one.
    pub default_category: String,
    /// Upper bound on a single page navigation.
    pub navigation_timeout_secs: u64,
    /// Upper bound on waiting for the product container to render.
    pub selector_timeout_secs: u64,
    /// User agent applied to every browser session.
    pub user_agent: String,
    /// Pause between listing pages of one store.
    pub inter_page_delay_ms: u64,
    /// Pause between consecutive store crawls.
    pub inter_store_delay_ms: u64,
    /// Additional attempts for a failing page fetch before the store's
    /// crawl is terminated with partial results.
    pub page_max_retries: u32,
    /// Base delay in seconds for exponential retry backoff.
    pub retry_backoff_base_secs: u64,
    /// Cron expression for the recurring full scrape; `None` disables it.
    pub scrape_cron: Option<String>,
}
