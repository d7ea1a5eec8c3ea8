// src/pipeline/types.rs
use serde::{Deserialize, Serialize};

/// One configured RSS/Atom endpoint with its category and display label.
/// Catalog entries are immutable during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedSource {
    pub url: String,
    pub category: String,
    pub source_label: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// One syndication entry parsed from a feed response. Field values are kept
/// raw; tag stripping and truncation happen at finalization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawItem {
    pub title: String,
    pub link: String,
    pub description: String,
    pub published_at: String,
    pub guid: String,
    pub lead_image_url: String,
    pub source_label: String,
    pub category: String,
}

/// Final normalized record handed to the downstream summarizer.
/// Exactly one signal exists per unique `link` in a run's output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedSignal {
    pub id: String,
    pub source: String,
    pub category: String,
    pub timestamp: String,
    pub title: String,
    pub link: String,
    pub snippet: String,
    pub picture: String,
    pub content: String,
}

/// Per-run stage counters, logged and returned alongside the signals.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct PipelineReport {
    pub sources_ok: usize,
    pub sources_failed: usize,
    pub fetched: usize,
    pub noise_filtered: usize,
    pub date_filtered: usize,
    pub deduped: usize,
    pub capped: usize,
    pub crawled: usize,
    pub crawl_failed: usize,
}
