//! Durable persistence of named record collections as JSON documents.
//!
//! Each collection is one pretty-printed JSON file under the data directory,
//! keyed by a logical name and overwritten whole on every write. Writes go
//! through a temp file and a rename, so a reader never observes a torn
//! document and a failed cycle leaves the previous document intact.

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use pricewatch_core::NormalizedProduct;

/// Collection holding every store's products for one cycle, keyed by store.
pub const ALL_PRODUCTS: &str = "all_products";

/// Collection holding the cycle's cross-store price comparisons.
pub const PRICE_COMPARISONS: &str = "price_comparisons";

/// Well-known per-store collection name: `{store}_{category}_products`.
#[must_use]
pub fn store_products_collection(store: &str, category: &str) -> String {
    format!("{store}_{category}_products")
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("invalid collection name {name:?}: {reason}")]
    InvalidName { name: String, reason: &'static str },

    #[error("failed to write collection {collection} to {path}: {source}")]
    Io {
        collection: String,
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize collection {collection}: {source}")]
    Serialize {
        collection: String,
        #[source]
        source: serde_json::Error,
    },
}

/// JSON-file sink rooted at one data directory.
#[derive(Debug, Clone)]
pub struct JsonSink {
    data_dir: PathBuf,
}

impl JsonSink {
    #[must_use]
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Path a collection is (or would be) stored at.
    #[must_use]
    pub fn collection_path(&self, name: &str) -> PathBuf {
        self.data_dir.join(format!("{name}.json"))
    }

    /// Writes one named collection, replacing any previous content.
    ///
    /// The write is all-or-nothing: the document is serialized up front and
    /// renamed into place only once fully written.
    ///
    /// # Errors
    ///
    /// - [`SinkError::InvalidName`] — the name would escape the data dir.
    /// - [`SinkError::Serialize`] — the records cannot be serialized.
    /// - [`SinkError::Io`] — the data dir or file cannot be written.
    pub async fn write_collection<T: Serialize + ?Sized>(
        &self,
        name: &str,
        records: &T,
    ) -> Result<PathBuf, SinkError> {
        validate_name(name)?;

        let body = serde_json::to_vec_pretty(records).map_err(|e| SinkError::Serialize {
            collection: name.to_owned(),
            source: e,
        })?;

        tokio::fs::create_dir_all(&self.data_dir)
            .await
            .map_err(|e| self.io_error(name, &self.data_dir, e))?;

        let path = self.collection_path(name);
        let tmp_path = self.data_dir.join(format!("{name}.json.tmp"));

        tokio::fs::write(&tmp_path, &body)
            .await
            .map_err(|e| self.io_error(name, &tmp_path, e))?;
        tokio::fs::rename(&tmp_path, &path)
            .await
            .map_err(|e| self.io_error(name, &path, e))?;

        tracing::info!(
            collection = name,
            path = %path.display(),
            bytes = body.len(),
            "collection written"
        );
        Ok(path)
    }

    /// Writes the combined `all_products` document: store id → product list.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`Self::write_collection`].
    pub async fn write_combined_products<'a, I>(&self, groups: I) -> Result<PathBuf, SinkError>
    where
        I: IntoIterator<Item = (&'a str, &'a [NormalizedProduct])>,
    {
        let mut combined = serde_json::Map::new();
        for (store, products) in groups {
            let value =
                serde_json::to_value(products).map_err(|e| SinkError::Serialize {
                    collection: ALL_PRODUCTS.to_owned(),
                    source: e,
                })?;
            combined.insert(store.to_owned(), value);
        }
        self.write_collection(ALL_PRODUCTS, &combined).await
    }

    fn io_error(&self, collection: &str, path: &Path, source: std::io::Error) -> SinkError {
        SinkError::Io {
            collection: collection.to_owned(),
            path: path.display().to_string(),
            source,
        }
    }
}

fn validate_name(name: &str) -> Result<(), SinkError> {
    if name.is_empty() {
        return Err(SinkError::InvalidName {
            name: name.to_owned(),
            reason: "must be non-empty",
        });
    }
    if name.chars().any(std::path::is_separator) || name.contains("..") {
        return Err(SinkError::InvalidName {
            name: name.to_owned(),
            reason: "must not contain path separators",
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;

    use super::*;

    /// Unique temp dir per test; process id keeps parallel test runs apart.
    fn temp_sink(tag: &str) -> JsonSink {
        let dir = std::env::temp_dir().join(format!(
            "pricewatch-sink-{}-{tag}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        JsonSink::new(dir)
    }

    fn make_product(store: &str, name: &str) -> NormalizedProduct {
        NormalizedProduct {
            name: name.to_string(),
            price: 100.0,
            original_price: None,
            discount: None,
            image: None,
            url: None,
            brand: "Acme".to_string(),
            category: "General".to_string(),
            in_stock: true,
            sizes: vec![],
            colors: vec![],
            store: store.to_string(),
            scraped_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn writes_collection_as_json_file() {
        let sink = temp_sink("write");
        let records = vec![json!({"name": "Hoodie X"}), json!({"name": "Cap Y"})];

        let path = sink.write_collection("storea_all_products", &records).await.unwrap();

        assert_eq!(path, sink.collection_path("storea_all_products"));
        let content = std::fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed.as_array().map(Vec::len), Some(2));

        let _ = std::fs::remove_dir_all(sink.data_dir());
    }

    #[tokio::test]
    async fn overwrites_previous_document() {
        let sink = temp_sink("overwrite");
        sink.write_collection("price_comparisons", &vec![json!({"v": 1})])
            .await
            .unwrap();
        sink.write_collection("price_comparisons", &vec![json!({"v": 2}), json!({"v": 3})])
            .await
            .unwrap();

        let content =
            std::fs::read_to_string(sink.collection_path("price_comparisons")).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed.as_array().map(Vec::len), Some(2));
        assert_eq!(parsed[0]["v"], 2);

        let _ = std::fs::remove_dir_all(sink.data_dir());
    }

    #[tokio::test]
    async fn no_temp_file_left_behind() {
        let sink = temp_sink("tmpfile");
        sink.write_collection("all_products", &vec![json!({})])
            .await
            .unwrap();

        let leftover = sink.data_dir().join("all_products.json.tmp");
        assert!(!leftover.exists());

        let _ = std::fs::remove_dir_all(sink.data_dir());
    }

    #[tokio::test]
    async fn rejects_collection_name_with_path_separator() {
        let sink = temp_sink("badname");
        let err = sink
            .write_collection("../escape", &vec![json!({})])
            .await
            .unwrap_err();
        assert!(matches!(err, SinkError::InvalidName { .. }));
    }

    #[tokio::test]
    async fn rejects_empty_collection_name() {
        let sink = temp_sink("emptyname");
        let err = sink.write_collection("", &vec![json!({})]).await.unwrap_err();
        assert!(matches!(err, SinkError::InvalidName { .. }));
    }

    #[tokio::test]
    async fn combined_products_keyed_by_store() {
        let sink = temp_sink("combined");
        let storea = vec![make_product("storea", "Hoodie X")];
        let storeb = vec![make_product("storeb", "Hoodie X")];

        let path = sink
            .write_combined_products([
                ("storea", storea.as_slice()),
                ("storeb", storeb.as_slice()),
            ])
            .await
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed["storea"].as_array().map(Vec::len), Some(1));
        assert_eq!(parsed["storeb"][0]["name"], "Hoodie X");

        let _ = std::fs::remove_dir_all(sink.data_dir());
    }

    #[test]
    fn store_products_collection_name_shape() {
        assert_eq!(
            store_products_collection("mizojerseyhome", "all"),
            "mizojerseyhome_all_products"
        );
    }
}
