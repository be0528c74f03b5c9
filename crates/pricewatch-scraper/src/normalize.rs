//! Normalization from raw scraped text to typed product records.
//!
//! Only an unparsable price rejects a record; every other missing field is
//! soft — defaults or absent values. Rejected records are dropped from the
//! pipeline with a debug log, never surfaced as a fatal error.

use pricewatch_core::{NormalizedProduct, RawProduct, StoreConfig};

use crate::error::ScrapeError;

/// Literal phrase treated as the out-of-stock marker when a store configures
/// no override. The match is case-sensitive, as the storefronts render it.
pub const DEFAULT_OUT_OF_STOCK_MARKER: &str = "Out of stock";

/// Parses a displayed price into a non-negative number.
///
/// Strips every character that is not an ASCII digit or decimal point, then
/// parses the remainder: `"₹2,599"` → `2599.0`, `"$50.00"` → `50.0`.
/// Returns `None` for text with no usable number.
#[must_use]
pub fn parse_price(text: &str) -> Option<f64> {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|price| price.is_finite() && *price >= 0.0)
}

/// Normalizes one raw listing into its typed form.
///
/// `out_of_stock_marker` is the store's literal phrase; a listing is in
/// stock when it has no stock indicator at all, or when the indicator text
/// does not contain the marker.
///
/// # Errors
///
/// Returns [`ScrapeError::Normalization`] when the price text is unparsable.
/// An unparsable *original* price is treated as absent, not an error.
pub fn normalize_product(
    raw: RawProduct,
    out_of_stock_marker: &str,
) -> Result<NormalizedProduct, ScrapeError> {
    let Some(price) = parse_price(&raw.price_text) else {
        return Err(ScrapeError::Normalization {
            store: raw.store.clone(),
            name: raw.name.clone(),
            reason: format!("unparsable price text {:?}", raw.price_text),
        });
    };

    let original_price = raw.original_price_text.as_deref().and_then(parse_price);

    let discount = match original_price {
        Some(original) if price < original => {
            Some((100.0 * (original - price) / original).round() as i32)
        }
        _ => None,
    };

    let in_stock = raw
        .stock_text
        .as_deref()
        .map_or(true, |text| !text.contains(out_of_stock_marker));

    let sizes = trimmed_non_empty(raw.sizes);
    let colors = trimmed_non_empty(raw.colors);

    Ok(NormalizedProduct {
        name: raw.name,
        price,
        original_price,
        discount,
        image: raw.image,
        url: raw.url,
        brand: text_or_default(raw.brand, "Unknown"),
        category: text_or_default(raw.category, "General"),
        in_stock,
        sizes,
        colors,
        store: raw.store,
        scraped_at: raw.scraped_at,
    })
}

/// Normalizes a whole crawl's raw records for one store, dropping rejected
/// ones. Returns the surviving records plus the rejection count.
#[must_use]
pub fn normalize_all(
    raws: Vec<RawProduct>,
    store: &StoreConfig,
) -> (Vec<NormalizedProduct>, usize) {
    let marker = store
        .out_of_stock_marker
        .as_deref()
        .unwrap_or(DEFAULT_OUT_OF_STOCK_MARKER);

    let mut products = Vec::with_capacity(raws.len());
    let mut rejected = 0usize;
    for raw in raws {
        match normalize_product(raw, marker) {
            Ok(product) => products.push(product),
            Err(e) => {
                tracing::debug!(error = %e, "dropping record");
                rejected += 1;
            }
        }
    }
    (products, rejected)
}

fn trimmed_non_empty(entries: Vec<String>) -> Vec<String> {
    entries
        .into_iter()
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty())
        .collect()
}

fn text_or_default(value: Option<String>, default: &str) -> String {
    value
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| default.to_owned())
}
