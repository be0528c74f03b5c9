//! Cross-store comparison generation.
//!
//! A pure, deterministic transformation over one cycle's full product
//! collection: group by comparison key, then compare every key at least two
//! records deep. Callers are expected to pass products in a fixed store
//! order (the registry's), which makes tie-breaks reproducible.

use std::collections::HashMap;

use pricewatch_core::NormalizedProduct;

use crate::types::{CompetitorPrice, PriceComparison, PriceHistoryEntry};

/// Builds a comparison per product line sold by at least two contributing
/// records.
///
/// - `best_price` is the minimum-price entry; ties go to the earliest
///   contribution.
/// - `our_price` is the `operator` store's entry, or the first contribution
///   when the operator has no listing under the key.
/// - Keys backed by a single record produce no comparison.
///
/// Output order follows first appearance of each key in `products`.
#[must_use]
pub fn generate_comparisons(
    products: &[NormalizedProduct],
    operator: &str,
) -> Vec<PriceComparison> {
    let mut key_order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<&NormalizedProduct>> = HashMap::new();

    for product in products {
        let key = product.comparison_key();
        let entry = groups.entry(key.clone()).or_default();
        if entry.is_empty() {
            key_order.push(key);
        }
        entry.push(product);
    }

    let mut comparisons = Vec::new();
    for key in key_order {
        let group = &groups[&key];
        if group.len() < 2 {
            continue;
        }

        // Strict less-than keeps the earliest contribution on ties.
        let best = group[1..]
            .iter()
            .copied()
            .fold(group[0], |best, p| if p.price < best.price { p } else { best });
        let own = group
            .iter()
            .find(|p| p.store == operator)
            .copied()
            .unwrap_or(group[0]);

        let competitor_prices: Vec<CompetitorPrice> =
            group.iter().map(|p| competitor_price(p)).collect();
        let price_history: Vec<PriceHistoryEntry> = group
            .iter()
            .map(|p| PriceHistoryEntry {
                date: p.scraped_at,
                price: p.price,
                store: p.store.clone(),
            })
            .collect();

        comparisons.push(PriceComparison {
            product_id: key,
            product_name: group[0].name.clone(),
            product_brand: group[0].brand.clone(),
            our_price: own.price,
            competitor_prices,
            best_price: competitor_price(best),
            savings: own.price - best.price,
            price_history,
        });
    }

    comparisons
}

fn competitor_price(product: &NormalizedProduct) -> CompetitorPrice {
    CompetitorPrice {
        store: product.store.clone(),
        price: product.price,
        original_price: product.original_price,
        discount: product.discount,
        url: product.url.clone(),
        in_stock: product.in_stock,
        last_updated: product.scraped_at,
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn product(store: &str, name: &str, brand: &str, price: f64) -> NormalizedProduct {
        NormalizedProduct {
            name: name.to_string(),
            price,
            original_price: None,
            discount: None,
            image: None,
            url: Some(format!("https://{store}.example/p/{name}")),
            brand: brand.to_string(),
            category: "General".to_string(),
            in_stock: true,
            sizes: vec![],
            colors: vec![],
            store: store.to_string(),
            scraped_at: Utc::now(),
        }
    }

    #[test]
    fn single_store_key_produces_no_comparison() {
        let products = vec![product("storea", "Hoodie X", "Acme", 50.0)];
        let comparisons = generate_comparisons(&products, "storea");
        assert!(comparisons.is_empty());
    }

    #[test]
    fn best_price_and_savings_across_three_stores() {
        let products = vec![
            product("storea", "Hoodie X", "Acme", 2599.0),
            product("storeb", "Hoodie X", "Acme", 1899.0),
            product("storec", "Hoodie X", "Acme", 2199.0),
        ];
        let comparisons = generate_comparisons(&products, "storea");
        assert_eq!(comparisons.len(), 1);

        let comparison = &comparisons[0];
        assert_eq!(comparison.best_price.store, "storeb");
        assert!((comparison.best_price.price - 1899.0).abs() < f64::EPSILON);
        assert!((comparison.our_price - 2599.0).abs() < f64::EPSILON);
        assert!((comparison.savings - 700.0).abs() < f64::EPSILON);
        assert_eq!(comparison.competitor_prices.len(), 3);
        assert_eq!(comparison.price_history.len(), 3);
    }

    #[test]
    fn case_insensitive_grouping_across_stores() {
        let products = vec![
            product("storea", "Hoodie X", "Acme", 50.0),
            product("storeb", "hoodie x", "acme", 40.0),
        ];
        let comparisons = generate_comparisons(&products, "storea");
        assert_eq!(comparisons.len(), 1);

        let comparison = &comparisons[0];
        assert_eq!(comparison.product_id, "hoodie x_acme");
        assert_eq!(comparison.best_price.store, "storeb");
        assert!((comparison.our_price - 50.0).abs() < f64::EPSILON);
        assert!((comparison.savings - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn tie_on_best_price_goes_to_first_contribution() {
        let products = vec![
            product("storea", "Hoodie X", "Acme", 1000.0),
            product("storeb", "Hoodie X", "Acme", 1000.0),
        ];
        let comparisons = generate_comparisons(&products, "storea");
        let comparison = &comparisons[0];
        assert_eq!(comparison.best_price.store, "storea");
        assert!(comparison.savings.abs() < f64::EPSILON);
    }

    #[test]
    fn operator_absent_falls_back_to_first_contribution() {
        let products = vec![
            product("storea", "Hoodie X", "Acme", 60.0),
            product("storeb", "Hoodie X", "Acme", 40.0),
        ];
        let comparisons = generate_comparisons(&products, "nosuchstore");
        let comparison = &comparisons[0];
        assert!((comparison.our_price - 60.0).abs() < f64::EPSILON);
        assert!((comparison.savings - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn different_products_stay_separate() {
        let products = vec![
            product("storea", "Hoodie X", "Acme", 50.0),
            product("storeb", "Hoodie X", "Acme", 40.0),
            product("storea", "Cap Y", "Acme", 20.0),
            product("storeb", "Cap Y", "Acme", 15.0),
        ];
        let comparisons = generate_comparisons(&products, "storea");
        assert_eq!(comparisons.len(), 2);
        assert_eq!(comparisons[0].product_id, "hoodie x_acme");
        assert_eq!(comparisons[1].product_id, "cap y_acme");
    }

    #[test]
    fn output_order_follows_first_appearance() {
        let products = vec![
            product("storea", "Zeta", "Acme", 10.0),
            product("storea", "Alpha", "Acme", 10.0),
            product("storeb", "Zeta", "Acme", 9.0),
            product("storeb", "Alpha", "Acme", 8.0),
        ];
        let comparisons = generate_comparisons(&products, "storea");
        let ids: Vec<&str> = comparisons.iter().map(|c| c.product_id.as_str()).collect();
        assert_eq!(ids, ["zeta_acme", "alpha_acme"]);
    }

    #[test]
    fn competitor_prices_keep_contribution_order() {
        let products = vec![
            product("storea", "Hoodie X", "Acme", 50.0),
            product("storeb", "Hoodie X", "Acme", 40.0),
            product("storec", "Hoodie X", "Acme", 45.0),
        ];
        let comparisons = generate_comparisons(&products, "storea");
        let stores: Vec<&str> = comparisons[0]
            .competitor_prices
            .iter()
            .map(|c| c.store.as_str())
            .collect();
        assert_eq!(stores, ["storea", "storeb", "storec"]);
    }

    #[test]
    fn two_records_from_one_store_still_compare() {
        // Duplicate listings inside a single store group under one key and
        // are compared like any other pair of contributions.
        let products = vec![
            product("storea", "Hoodie X", "Acme", 50.0),
            product("storea", "Hoodie X", "Acme", 45.0),
        ];
        let comparisons = generate_comparisons(&products, "storea");
        assert_eq!(comparisons.len(), 1);
        assert!((comparisons[0].best_price.price - 45.0).abs() < f64::EPSILON);
    }
}
