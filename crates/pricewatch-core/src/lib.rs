pub mod app_config;
pub mod config;
pub mod products;
pub mod stores;

mod error;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use error::ConfigError;
pub use products::{NormalizedProduct, RawProduct};
pub use stores::{
    FieldSelectors, PaginationRules, SelectorList, StoreConfig, StoreRegistry,
};
