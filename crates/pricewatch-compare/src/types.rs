use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One store's offer for a compared product line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompetitorPrice {
    pub store: String,
    pub price: f64,
    pub original_price: Option<f64>,
    pub discount: Option<i32>,
    pub url: Option<String>,
    pub in_stock: bool,
    pub last_updated: DateTime<Utc>,
}

/// One point of a compared product's price history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceHistoryEntry {
    pub date: DateTime<Utc>,
    pub price: f64,
    pub store: String,
}

/// Cross-store comparison of one product line, recomputed in full on every
/// scrape cycle — prior comparisons are replaced, not amended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceComparison {
    /// The grouping key: `lowercase(name)_lowercase(brand)`.
    pub product_id: String,
    pub product_name: String,
    pub product_brand: String,
    /// The operator's price, or the first contributing record's price when
    /// the operator has no listing of its own.
    pub our_price: f64,
    /// One entry per contributing record, in contribution order.
    pub competitor_prices: Vec<CompetitorPrice>,
    pub best_price: CompetitorPrice,
    /// `our_price - best_price.price`: positive means the operator is
    /// overpriced, zero or negative means cheapest or tied.
    pub savings: f64,
    pub price_history: Vec<PriceHistoryEntry>,
}

impl PriceComparison {
    /// Competitor offers sorted cheapest-first. The stored list keeps
    /// contribution order; sorting is done on demand.
    #[must_use]
    pub fn competitors_by_price(&self) -> Vec<&CompetitorPrice> {
        let mut sorted: Vec<&CompetitorPrice> = self.competitor_prices.iter().collect();
        sorted.sort_by(|a, b| a.price.total_cmp(&b.price));
        sorted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offer(store: &str, price: f64) -> CompetitorPrice {
        CompetitorPrice {
            store: store.to_string(),
            price,
            original_price: None,
            discount: None,
            url: None,
            in_stock: true,
            last_updated: Utc::now(),
        }
    }

    #[test]
    fn competitors_by_price_sorts_without_mutating() {
        let comparison = PriceComparison {
            product_id: "hoodie x_acme".to_string(),
            product_name: "Hoodie X".to_string(),
            product_brand: "Acme".to_string(),
            our_price: 50.0,
            competitor_prices: vec![offer("a", 50.0), offer("b", 40.0), offer("c", 45.0)],
            best_price: offer("b", 40.0),
            savings: 10.0,
            price_history: vec![],
        };

        let sorted = comparison.competitors_by_price();
        let stores: Vec<&str> = sorted.iter().map(|c| c.store.as_str()).collect();
        assert_eq!(stores, ["b", "c", "a"]);
        // stored order untouched
        assert_eq!(comparison.competitor_prices[0].store, "a");
    }

    #[test]
    fn serde_roundtrip_price_comparison() {
        let comparison = PriceComparison {
            product_id: "hoodie x_acme".to_string(),
            product_name: "Hoodie X".to_string(),
            product_brand: "Acme".to_string(),
            our_price: 50.0,
            competitor_prices: vec![offer("a", 50.0)],
            best_price: offer("a", 50.0),
            savings: 0.0,
            price_history: vec![],
        };
        let json = serde_json::to_string(&comparison).expect("serialize");
        let decoded: PriceComparison = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(decoded.product_id, "hoodie x_acme");
        assert!((decoded.savings).abs() < f64::EPSILON);
    }
}
