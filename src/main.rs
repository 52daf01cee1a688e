use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use instasearch_backend::api;
use instasearch_backend::state::AppState;

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "instasearch_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_dir = env_or("INSTASEARCH_CONFIG_DIR", "config");
    let data_file = env_or("INSTASEARCH_DATA_FILE", "data/items.csv");
    let backup_dir = env_or("INSTASEARCH_BACKUP_DIR", "backups");
    let listen = env_or("INSTASEARCH_LISTEN", "0.0.0.0:8180");

    let state = Arc::new(AppState::new(config_dir, data_file, backup_dir));

    let validation = state.config().validate();
    if !validation.valid {
        for error in &validation.errors {
            tracing::warn!("configuration issue: {error}");
        }
    }

    // Initial load; a missing data file keeps the empty generation live and
    // the server serving (admin can upload data later).
    match state.reload() {
        Ok(report) => {
            tracing::info!(
                items = state.generation().item_count(),
                rejected = report.len(),
                "initial data load complete"
            );
        }
        Err(e) => tracing::warn!("initial data load failed: {e}"),
    }

    let app = api::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    tracing::info!("Server will listen on {listen}");
    let listener = tokio::net::TcpListener::bind(&listen).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
