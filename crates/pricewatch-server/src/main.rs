mod api;
mod jobs;
mod middleware;
mod scheduler;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use pricewatch_scraper::CancelToken;

use crate::api::{build_app, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(pricewatch_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let registry = Arc::new(pricewatch_core::StoreRegistry::load(&config.stores_path)?);
    tracing::info!(
        stores = registry.len(),
        operator = registry.operator(),
        "store registry loaded"
    );

    let cancel = CancelToken::new();
    let state = AppState {
        config: Arc::clone(&config),
        registry,
        cancel: cancel.clone(),
    };

    // Keep the handle alive — dropping it shuts down all scheduled jobs.
    let _scheduler = scheduler::build_scheduler(state.clone()).await?;

    let app = build_app(state);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel))
        .await?;
    Ok(())
}

async fn shutdown_signal(cancel: CancelToken) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    // In-flight crawls check the token at the start of each fetch cycle and
    // return their partial results.
    cancel.cancel();
    tracing::info!("received shutdown signal, starting graceful shutdown");
}
