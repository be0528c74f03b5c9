use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};

use crate::ConfigError;

/// Ordered fallback chain of CSS selectors for one product field.
///
/// Extraction tries each candidate in order and uses the first one that
/// yields a match. In YAML the field accepts either an explicit list or a
/// single comma-separated string — the string form is split into the same
/// ordered chain, matching how store configs are usually written by hand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectorList(Vec<String>);

impl SelectorList {
    pub fn new<I, S>(candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(candidates.into_iter().map(Into::into).collect())
    }

    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// All candidates joined into one CSS selector union, for presence
    /// checks that only care whether *any* candidate matches.
    #[must_use]
    pub fn css_union(&self) -> String {
        self.0.join(", ")
    }
}

impl<'de> Deserialize<'de> for SelectorList {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            One(String),
            Many(Vec<String>),
        }

        let candidates = match Raw::deserialize(deserializer)? {
            Raw::One(s) => s
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(ToOwned::to_owned)
                .collect(),
            Raw::Many(v) => v
                .into_iter()
                .map(|s| s.trim().to_owned())
                .filter(|s| !s.is_empty())
                .collect(),
        };
        Ok(Self(candidates))
    }
}

/// Per-field selector chains for one store's listing pages.
///
/// `name` and `price` are the extraction-required fields; nodes missing
/// either are skipped. The optional fields simply yield absent values when
/// unconfigured or unmatched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSelectors {
    pub product_container: SelectorList,
    pub name: SelectorList,
    pub price: SelectorList,
    #[serde(default)]
    pub original_price: Option<SelectorList>,
    pub image: SelectorList,
    pub link: SelectorList,
    #[serde(default)]
    pub brand: Option<SelectorList>,
    #[serde(default)]
    pub category: Option<SelectorList>,
    #[serde(default)]
    pub in_stock: Option<SelectorList>,
    #[serde(default)]
    pub sizes: Option<SelectorList>,
    #[serde(default)]
    pub colors: Option<SelectorList>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationRules {
    /// Selector chain for the next-page control.
    pub next_page: SelectorList,
    /// Hard cap on listing pages crawled per store.
    pub max_pages: u32,
}

/// Static configuration for one scraped storefront. Loaded once at process
/// start and treated as immutable for the process lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub id: String,
    pub base_url: String,
    pub selectors: FieldSelectors,
    pub pagination: PaginationRules,
    /// Per-store override for the literal phrase marking a listing out of
    /// stock. Normalization falls back to its default marker when absent.
    #[serde(default)]
    pub out_of_stock_marker: Option<String>,
}

/// On-disk shape of the stores YAML document.
#[derive(Debug, Deserialize)]
struct StoresFile {
    operator: String,
    stores: Vec<StoreConfig>,
}

/// The store registry: every configured storefront plus the operator id
/// whose own prices are compared against competitors.
///
/// Stores keep their declaration order; that order drives crawl sequence and
/// makes comparison tie-breaks reproducible.
#[derive(Debug, Clone)]
pub struct StoreRegistry {
    operator: String,
    stores: Vec<StoreConfig>,
}

impl StoreRegistry {
    /// Load and validate the registry from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be read, parsed, or fails
    /// validation.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::StoresFileIo {
            path: path.display().to_string(),
            source: e,
        })?;
        let file: StoresFile = serde_yaml::from_str(&content)?;
        Self::from_parts(file.operator, file.stores)
    }

    /// Build a registry from in-memory parts, validating them.
    ///
    /// The operator id is not required to name a configured store: the
    /// comparison step falls back to the first contributing record when the
    /// operator has no listing of its own.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` when the configuration is unusable.
    pub fn from_parts(
        operator: String,
        stores: Vec<StoreConfig>,
    ) -> Result<Self, ConfigError> {
        validate(&operator, &stores)?;
        Ok(Self { operator, stores })
    }

    #[must_use]
    pub fn operator(&self) -> &str {
        &self.operator
    }

    /// Look up one store by id.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::UnknownStore` for ids not in the registry.
    pub fn get(&self, id: &str) -> Result<&StoreConfig, ConfigError> {
        self.stores
            .iter()
            .find(|s| s.id == id)
            .ok_or_else(|| ConfigError::UnknownStore(id.to_owned()))
    }

    #[must_use]
    pub fn stores(&self) -> &[StoreConfig] {
        &self.stores
    }

    /// Store ids in declaration order.
    pub fn store_ids(&self) -> impl Iterator<Item = &str> {
        self.stores.iter().map(|s| s.id.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.stores.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }
}

fn validate(operator: &str, stores: &[StoreConfig]) -> Result<(), ConfigError> {
    if operator.trim().is_empty() {
        return Err(ConfigError::Validation(
            "operator id must be non-empty".to_string(),
        ));
    }

    if stores.is_empty() {
        return Err(ConfigError::Validation(
            "at least one store must be configured".to_string(),
        ));
    }

    let mut seen_ids = HashSet::new();
    for store in stores {
        if store.id.trim().is_empty() {
            return Err(ConfigError::Validation(
                "store id must be non-empty".to_string(),
            ));
        }
        if !seen_ids.insert(store.id.to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate store id: '{}'",
                store.id
            )));
        }
        if !store.base_url.starts_with("http") {
            return Err(ConfigError::Validation(format!(
                "store '{}' has invalid base_url '{}'",
                store.id, store.base_url
            )));
        }
        if store.pagination.max_pages == 0 {
            return Err(ConfigError::Validation(format!(
                "store '{}' has max_pages 0; must be at least 1",
                store.id
            )));
        }
        for (field, list) in [
            ("product_container", &store.selectors.product_container),
            ("name", &store.selectors.name),
            ("price", &store.selectors.price),
            ("image", &store.selectors.image),
            ("link", &store.selectors.link),
        ] {
            if list.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "store '{}' has no selectors for required field '{field}'",
                    store.id
                )));
            }
        }
    }

    Ok(())
}
