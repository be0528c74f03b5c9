use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One scraped listing exactly as it came off the page, before any typed
/// parsing. Produced per matched product node during one page extraction and
/// consumed by normalization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawProduct {
    /// Id of the store this listing was scraped from.
    pub store: String,
    pub name: String,
    /// Price exactly as displayed, e.g. `"₹2,599"` or `"$50.00"`.
    pub price_text: String,
    /// Pre-sale price text when the page shows one.
    pub original_price_text: Option<String>,
    pub image: Option<String>,
    pub url: Option<String>,
    pub brand: Option<String>,
    pub category: Option<String>,
    /// Text of the stock-indicator element; `None` when the page has none.
    pub stock_text: Option<String>,
    pub sizes: Vec<String>,
    pub colors: Vec<String>,
    pub scraped_at: DateTime<Utc>,
}

/// The typed form of one scraped listing, comparable across stores.
///
/// Prices are scrape-time `f64` convenience values parsed from display text;
/// the sink serializes them as JSON numbers, which is the contract consumers
/// see.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedProduct {
    pub name: String,
    /// Always non-negative; records with unparsable price text are dropped
    /// during normalization.
    pub price: f64,
    pub original_price: Option<f64>,
    /// Integer percentage, present only when `original_price > price`.
    pub discount: Option<i32>,
    pub image: Option<String>,
    pub url: Option<String>,
    /// `"Unknown"` when the page exposes no brand.
    pub brand: String,
    /// `"General"` when the page exposes no category.
    pub category: String,
    pub in_stock: bool,
    pub sizes: Vec<String>,
    pub colors: Vec<String>,
    pub store: String,
    pub scraped_at: DateTime<Utc>,
}

impl NormalizedProduct {
    /// Case-insensitive `name_brand` composite used to merge listings across
    /// stores into one comparable line. Two genuinely different products that
    /// share name and brand text collide; the source data carries no SKU or
    /// product id that could disambiguate them.
    #[must_use]
    pub fn comparison_key(&self) -> String {
        format!(
            "{}_{}",
            self.name.to_lowercase(),
            self.brand.to_lowercase()
        )
    }
}
