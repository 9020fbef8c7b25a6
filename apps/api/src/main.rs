mod analysis;
mod config;
mod errors;
mod models;
mod routes;
mod state;
mod store;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::analysis::content::FallbackContentGenerator;
use crate::analysis::history::load_history;
use crate::config::Config;
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::{AnalysisStore, JsonFileStore, PgAnalysisStore};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Readiness API v{}", env!("CARGO_PKG_VERSION"));

    let store: Arc<dyn AnalysisStore> = match &config.database_url {
        Some(url) => Arc::new(PgAnalysisStore::connect(url).await?),
        None => {
            info!("Using JSON history file {}", config.history_path.display());
            Arc::new(JsonFileStore::new(&config.history_path))
        }
    };

    let history = load_history(store.as_ref()).await?;
    info!(
        "History loaded: {} of {} entries usable",
        history.valid_count, history.raw_count
    );
    if let Some(notice) = history.notice() {
        warn!("{notice}");
    }

    let state = AppState {
        store,
        generator: Arc::new(FallbackContentGenerator::default()),
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
