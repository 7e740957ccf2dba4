mod config;
mod errors;
mod generation;
mod history;
mod integrity;
mod models;
mod routes;
mod state;
mod store;
mod surfaces;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::generation::client::HttpGenerator;
use crate::generation::coordinator::Coordinator;
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::Store;
use crate::surfaces::Notifier;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (panics on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            let crate_target = env!("CARGO_PKG_NAME").replace('-', "_");
            EnvFilter::new(format!("{}={}", crate_target, &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting tailor daemon v{}", env!("CARGO_PKG_VERSION"));

    // Open the persistent store (a corrupt file degrades to empty).
    let store = Arc::new(Store::open(config.data_dir.join("store.json"))?);

    // Startup order matters: restore missing keys from backup first, then
    // repair/migrate, then snapshot the (now healthy) store.
    let restored = integrity::backup::restore(&store)?;
    if restored > 0 {
        warn!("restored {restored} keys from the backup slot");
    }
    integrity::check_integrity(&store)?;
    integrity::backup::spawn_backup_task(store.clone(), config.backup_interval);

    let notifier = Notifier::new();
    let backend = Arc::new(HttpGenerator::new(config.generator_url.clone()));
    let coordinator = Arc::new(Coordinator::new(
        store.clone(),
        backend,
        notifier.clone(),
        config.download_dir.clone(),
    ));
    info!("generator client initialized ({})", config.generator_url);

    // Staleness reconciliation on its own schedule, independent of any
    // in-flight generation and of the read-path checks.
    {
        let coordinator = coordinator.clone();
        let period = config.reconcile_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(e) = coordinator.reconcile().await {
                    warn!("staleness reconciliation failed: {e}");
                }
            }
        });
    }

    // Build app state
    let state = AppState {
        store,
        coordinator,
        notifier,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // surfaces are extension pages on arbitrary origins

    let addr: SocketAddr = format!("127.0.0.1:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
