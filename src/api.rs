use std::sync::{Arc, RwLock};

use serde_json::json;
use shuttle_axum::axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::catalog::FeedCatalog;
use crate::crawl::{ChromeLoader, PageLoader};
use crate::pipeline::fetch::{FeedTransport, HttpTransport};
use crate::pipeline::types::FeedSource;
use crate::pipeline::{self, PipelineOptions};
use crate::progress::ProgressSink;

pub const SERVICE_NAME: &str = "news-signal-enricher";

#[derive(Clone)]
pub struct AppState {
    catalog: Arc<RwLock<FeedCatalog>>,
    transport: Arc<dyn FeedTransport>,
}

impl AppState {
    pub fn new(catalog: FeedCatalog) -> Self {
        Self {
            catalog: Arc::new(RwLock::new(catalog)),
            transport: Arc::new(HttpTransport::new()),
        }
    }

    /// Swap the feed transport; used by tests to avoid sockets.
    pub fn with_transport(mut self, transport: Arc<dyn FeedTransport>) -> Self {
        self.transport = transport;
        self
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/enrich", post(enrich))
        .route("/feeds", get(list_feeds).post(add_feed))
        .route("/feeds/toggle", post(toggle_feed))
        .route("/feeds/remove", post(remove_feed))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "online", "service": SERVICE_NAME }))
}

/// POST /enrich — run the full pipeline for the supplied feed set.
///
/// The request body is validated by hand so a missing or non-array `feeds`
/// field is a plain 400; that is the only failure a caller can see. Everything
/// downstream degrades to a smaller (possibly empty) result array.
async fn enrich(State(state): State<AppState>, Json(body): Json<serde_json::Value>) -> Response {
    let Some(feeds_value) = body.get("feeds").filter(|v| v.is_array()) else {
        return bad_request("`feeds` must be an array of feed sources");
    };
    let feeds: Vec<FeedSource> = match serde_json::from_value(feeds_value.clone()) {
        Ok(f) => f,
        Err(e) => return bad_request(&format!("invalid feed source: {e}")),
    };
    let target_date = match body.get("targetDate").and_then(|v| v.as_str()) {
        Some(s) => match chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            Ok(d) => Some(d),
            Err(_) => return bad_request("`targetDate` must be YYYY-MM-DD"),
        },
        None => None,
    };

    // Bridge pipeline progress into the logs.
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let log_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            tracing::debug!(target: "enrich", ?event, "pipeline progress");
        }
    });
    let progress = ProgressSink::new(tx);

    // The crawl layer is best-effort: without a browser every item falls back
    // to its feed snippet. An empty feed set has nothing to crawl, so skip
    // the browser entirely.
    let loader = if feeds.is_empty() {
        None
    } else {
        match ChromeLoader::launch().await {
            Ok(l) => Some(l),
            Err(e) => {
                tracing::warn!(error = %e, "headless browser unavailable; skipping deep crawl");
                None
            }
        }
    };

    let (signals, report) = pipeline::run(
        state.transport.as_ref(),
        loader.as_ref().map(|l| l as &dyn PageLoader),
        &feeds,
        target_date,
        PipelineOptions::default(),
        &progress,
    )
    .await;

    if let Some(l) = loader {
        l.close().await;
    }
    drop(progress);
    let _ = log_task.await;

    tracing::info!(
        signals = signals.len(),
        sources_ok = report.sources_ok,
        sources_failed = report.sources_failed,
        crawled = report.crawled,
        "enrich request served"
    );
    Json(signals).into_response()
}

fn bad_request(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
}

async fn list_feeds(State(state): State<AppState>) -> Json<Vec<FeedSource>> {
    let entries = state.catalog.read().expect("rwlock poisoned").entries();
    Json(entries)
}

async fn add_feed(State(state): State<AppState>, Json(feed): Json<FeedSource>) -> Response {
    state.catalog.write().expect("rwlock poisoned").add(feed);
    (StatusCode::CREATED, Json(json!({ "ok": true }))).into_response()
}

#[derive(serde::Deserialize)]
struct ToggleReq {
    url: String,
    enabled: bool,
}

async fn toggle_feed(State(state): State<AppState>, Json(req): Json<ToggleReq>) -> Response {
    let changed = state
        .catalog
        .write()
        .expect("rwlock poisoned")
        .set_enabled(&req.url, req.enabled);
    if changed {
        Json(json!({ "ok": true })).into_response()
    } else {
        (StatusCode::NOT_FOUND, Json(json!({ "error": "unknown feed url" }))).into_response()
    }
}

#[derive(serde::Deserialize)]
struct RemoveReq {
    url: String,
}

async fn remove_feed(State(state): State<AppState>, Json(req): Json<RemoveReq>) -> Response {
    let removed = state
        .catalog
        .write()
        .expect("rwlock poisoned")
        .remove(&req.url);
    if removed {
        Json(json!({ "ok": true })).into_response()
    } else {
        (StatusCode::NOT_FOUND, Json(json!({ "error": "unknown feed url" }))).into_response()
    }
}
