use std::path::PathBuf;

use clap::{Parser, Subcommand};

use pricewatch_compare::{filter_comparisons, generate_comparisons};
use pricewatch_core::{AppConfig, StoreRegistry};
use pricewatch_scraper::{
    collect_products, scrape_all_stores, scrape_store, CancelToken, ChromeSessionFactory,
    FetcherConfig, RunnerConfig, StoreScrapeResult,
};
use pricewatch_sink::{store_products_collection, JsonSink, PRICE_COMPARISONS};

#[derive(Debug, Parser)]
#[command(name = "pricewatch-cli")]
#[command(about = "Multi-store product scraping and price comparison")]
struct Cli {
    /// Path to the store registry file (overrides PRICEWATCH_STORES_PATH).
    #[arg(long)]
    stores: Option<PathBuf>,

    /// Directory collection files are written to (overrides PRICEWATCH_DATA_DIR).
    #[arg(long)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Crawl one store (or all) and write its product collections.
    Scrape {
        /// Store id, or "all" for every registered store.
        #[arg(long, default_value = "all")]
        store: String,
        #[arg(long)]
        category: Option<String>,
    },
    /// Crawl all stores and write cross-store price comparisons.
    Compare {
        /// Case-insensitive product-name substring filter.
        #[arg(long)]
        product: Option<String>,
        /// Case-insensitive brand substring filter.
        #[arg(long)]
        brand: Option<String>,
        #[arg(long)]
        category: Option<String>,
    },
    /// List the configured stores.
    Stores,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let mut config = pricewatch_core::load_app_config()?;
    if let Some(path) = cli.stores {
        config.stores_path = path;
    }
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }

    let registry = StoreRegistry::load(&config.stores_path)?;

    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupt received; finishing the current page and stopping");
                cancel.cancel();
            }
        });
    }

    match cli.command {
        Commands::Stores => {
            for store in registry.stores() {
                println!(
                    "{}  {}  (max {} pages)",
                    store.id, store.base_url, store.pagination.max_pages
                );
            }
            println!("operator: {}", registry.operator());
        }
        Commands::Scrape { store, category } => {
            run_scrape(&config, &registry, &store, category, &cancel).await?;
        }
        Commands::Compare {
            product,
            brand,
            category,
        } => {
            run_compare(&config, &registry, product, brand, category, &cancel).await?;
        }
    }

    Ok(())
}

async fn run_scrape(
    config: &AppConfig,
    registry: &StoreRegistry,
    scope: &str,
    category: Option<String>,
    cancel: &CancelToken,
) -> anyhow::Result<()> {
    let category = category.unwrap_or_else(|| config.default_category.clone());
    let results = scrape_scope(config, registry, scope, &category, cancel).await?;

    let sink = JsonSink::new(config.data_dir.clone());
    for result in &results {
        let collection = store_products_collection(&result.store, &category);
        let path = sink.write_collection(&collection, &result.products).await?;
        print_store_line(result, &path.display().to_string());
    }

    if scope == "all" {
        let path = sink
            .write_combined_products(
                results
                    .iter()
                    .map(|r| (r.store.as_str(), r.products.as_slice())),
            )
            .await?;
        let total: usize = results.iter().map(|r| r.products.len()).sum();
        println!("combined: {total} products -> {}", path.display());
    }

    Ok(())
}

async fn run_compare(
    config: &AppConfig,
    registry: &StoreRegistry,
    product: Option<String>,
    brand: Option<String>,
    category: Option<String>,
    cancel: &CancelToken,
) -> anyhow::Result<()> {
    let category = category.unwrap_or_else(|| config.default_category.clone());
    let results = scrape_scope(config, registry, "all", &category, cancel).await?;

    let products = collect_products(&results);
    let comparisons = generate_comparisons(&products, registry.operator());
    let comparisons = filter_comparisons(comparisons, product.as_deref(), brand.as_deref());

    let sink = JsonSink::new(config.data_dir.clone());
    let path = sink.write_collection(PRICE_COMPARISONS, &comparisons).await?;

    println!(
        "{} comparisons across {} products -> {}",
        comparisons.len(),
        products.len(),
        path.display()
    );
    for comparison in &comparisons {
        println!(
            "  {} [{}]: ours {:.2}, best {:.2} at {}, savings {:.2}",
            comparison.product_name,
            comparison.product_brand,
            comparison.our_price,
            comparison.best_price.price,
            comparison.best_price.store,
            comparison.savings
        );
    }

    Ok(())
}

async fn scrape_scope(
    config: &AppConfig,
    registry: &StoreRegistry,
    scope: &str,
    category: &str,
    cancel: &CancelToken,
) -> anyhow::Result<Vec<StoreScrapeResult>> {
    let factory = ChromeSessionFactory::new(FetcherConfig::from_app_config(config));
    let options = RunnerConfig::from_app_config(config);

    if scope == "all" {
        Ok(scrape_all_stores(&factory, registry, category, &options, cancel).await)
    } else {
        let store = registry.get(scope)?;
        Ok(vec![
            scrape_store(&factory, store, category, &options, cancel).await,
        ])
    }
}

fn print_store_line(result: &StoreScrapeResult, path: &str) {
    let status = match (&result.fault, result.cancelled) {
        (Some(e), _) => format!(" (fault: {e})"),
        (None, true) => " (cancelled)".to_string(),
        (None, false) => String::new(),
    };
    println!(
        "{}: {} products over {} pages, {} rejected{} -> {}",
        result.store,
        result.products.len(),
        result.pages_fetched,
        result.rejected,
        status,
        path
    );
}
