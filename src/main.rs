//! News Signal Enricher — Binary Entrypoint
//! Boots the Axum HTTP server, wiring routes, shared state, and middleware.
//!
//! See `README.md` for quickstart.

use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use news_signal_enricher::api::{self, AppState};
use news_signal_enricher::catalog::FeedCatalog;
use news_signal_enricher::crawl;
use news_signal_enricher::metrics::Metrics;

/// Enable compact tracing logs in development only.
/// Activation requires BOTH:
///   - dev environment (debug build OR SHUTTLE_ENV in {local, development, dev})
///   - ENRICH_DEV_LOG=1
fn enable_dev_tracing() {
    let dev_flag = std::env::var("ENRICH_DEV_LOG")
        .ok()
        .is_some_and(|v| v == "1");

    let is_dev_env = cfg!(debug_assertions)
        || matches!(
            std::env::var("SHUTTLE_ENV")
                .unwrap_or_default()
                .to_ascii_lowercase()
                .as_str(),
            "local" | "development" | "dev"
        );

    if !(dev_flag && is_dev_env) {
        return;
    }

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("enrich=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    // This enables FEEDS_CONFIG_PATH / ENRICH_DEV_LOG from .env.
    let _ = dotenvy::dotenv();

    // Initialize dev tracing early (no-op in production).
    enable_dev_tracing();

    // Feed catalog: config file with an embedded-seed fallback.
    let catalog = FeedCatalog::load_default();
    let state = AppState::new(catalog);

    let metrics = Metrics::init(crawl::MAX_CONCURRENCY);
    let router = api::create_router(state).merge(metrics.router());

    Ok(router.into())
}
