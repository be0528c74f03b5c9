pub mod compare;
pub mod filter;
pub mod types;

pub use compare::generate_comparisons;
pub use filter::filter_comparisons;
pub use types::{CompetitorPrice, PriceComparison, PriceHistoryEntry};
