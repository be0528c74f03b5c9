use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("navigation to {url} timed out after {timeout_secs}s (store {store})")]
    NavigationTimeout {
        store: String,
        url: String,
        timeout_secs: u64,
    },

    #[error(
        "product container {selector:?} never appeared on {url} within {timeout_secs}s (store {store})"
    )]
    SelectorTimeout {
        store: String,
        url: String,
        selector: String,
        timeout_secs: u64,
    },

    #[error("browser failure for store {store}: {message}")]
    Browser { store: String, message: String },

    #[error("normalization rejected {name:?} from {store}: {reason}")]
    Normalization {
        store: String,
        name: String,
        reason: String,
    },
}
