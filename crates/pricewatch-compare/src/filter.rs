//! Post-comparison filtering by product name and brand substrings.

use crate::types::PriceComparison;

/// Keeps comparisons whose product name contains `product_name` and whose
/// brand contains `brand`, both case-insensitive. `None` filters nothing.
#[must_use]
pub fn filter_comparisons(
    comparisons: Vec<PriceComparison>,
    product_name: Option<&str>,
    brand: Option<&str>,
) -> Vec<PriceComparison> {
    let name_needle = product_name.map(str::to_lowercase);
    let brand_needle = brand.map(str::to_lowercase);

    comparisons
        .into_iter()
        .filter(|c| {
            name_needle
                .as_deref()
                .map_or(true, |needle| c.product_name.to_lowercase().contains(needle))
        })
        .filter(|c| {
            brand_needle
                .as_deref()
                .map_or(true, |needle| c.product_brand.to_lowercase().contains(needle))
        })
        .collect()
}
