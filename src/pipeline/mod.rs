// src/pipeline/mod.rs
pub mod dedup;
pub mod fetch;
pub mod filter;
pub mod finalize;
pub mod types;

use std::collections::HashMap;

use chrono::NaiveDate;
use futures::future::join_all;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use once_cell::sync::OnceCell;

use crate::crawl::{self, PageLoader};
use crate::progress::{ProgressEvent, ProgressSink};
use types::{EnrichedSignal, FeedSource, PipelineReport, RawItem};

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("enrich_items_total", "Total items parsed from feed sources.");
        describe_counter!(
            "enrich_source_errors_total",
            "Feed sources skipped due to fetch/parse errors."
        );
        describe_counter!(
            "enrich_noise_filtered_total",
            "Items dropped by the denylist or date filter."
        );
        describe_counter!("enrich_dedup_total", "Items removed by link deduplication.");
        describe_counter!("enrich_crawled_total", "Pages with usable crawled text.");
        describe_counter!(
            "enrich_crawl_failed_total",
            "Pages dropped from enrichment (failure or thin content)."
        );
        describe_histogram!("enrich_parse_ms", "Feed parse time in milliseconds.");
        describe_histogram!("enrich_run_ms", "Full pipeline run time in milliseconds.");
        describe_gauge!(
            "enrich_last_run_ts",
            "Unix ts when the enrichment pipeline last ran."
        );
    });
}

/// Policy knobs with the stock defaults. Exposed so deployments can tune the
/// cap and crawl bounds without touching the pipeline.
#[derive(Debug, Clone, Copy)]
pub struct PipelineOptions {
    pub max_items: usize,
    pub min_crawl_concurrency: usize,
    pub max_crawl_concurrency: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            max_items: dedup::DEFAULT_MAX_ITEMS,
            min_crawl_concurrency: crawl::MIN_CONCURRENCY,
            max_crawl_concurrency: crawl::MAX_CONCURRENCY,
        }
    }
}

/// Run the full ingestion-and-enrichment pipeline:
/// fetch (parallel across sources) → noise/date filter → dedup/cap →
/// deep crawl (bounded, optional) → finalize.
///
/// Never fails: per-source and per-page errors are absorbed where they occur
/// and the result is a (possibly empty) signal array plus stage counters.
/// `loader: None` skips the crawl phase entirely; every item then uses its
/// feed-snippet fallback.
pub async fn run(
    transport: &dyn fetch::FeedTransport,
    loader: Option<&dyn PageLoader>,
    feeds: &[FeedSource],
    target_date: Option<NaiveDate>,
    opts: PipelineOptions,
    progress: &ProgressSink,
) -> (Vec<EnrichedSignal>, PipelineReport) {
    ensure_metrics_described();
    let t0 = std::time::Instant::now();
    let mut report = PipelineReport::default();

    // Fetch phase: fully parallel, isolate-per-source.
    progress.emit(ProgressEvent::FetchStarted {
        sources: feeds.len(),
    });
    let fetches = feeds
        .iter()
        .map(|src| async move { (src, fetch::fetch_feed(transport, src).await) });

    let mut raw: Vec<RawItem> = Vec::new();
    for (src, result) in join_all(fetches).await {
        match result {
            Ok(items) => {
                progress.emit(ProgressEvent::SourceFetched {
                    source: src.source_label.clone(),
                    items: items.len(),
                });
                report.sources_ok += 1;
                raw.extend(items);
            }
            Err(e) => {
                tracing::warn!(
                    source = %src.source_label,
                    url = %src.url,
                    error = %e,
                    "feed source skipped"
                );
                counter!("enrich_source_errors_total").increment(1);
                progress.emit(ProgressEvent::SourceFailed {
                    source: src.source_label.clone(),
                    error: e.to_string(),
                });
                report.sources_failed += 1;
            }
        }
    }
    report.fetched = raw.len();

    // Noise + date filter.
    let (kept, noise_dropped, date_dropped) = filter::apply(raw, target_date);
    report.noise_filtered = noise_dropped;
    report.date_filtered = date_dropped;
    counter!("enrich_noise_filtered_total").increment((noise_dropped + date_dropped) as u64);
    progress.emit(ProgressEvent::Filtered {
        kept: kept.len(),
        dropped: noise_dropped + date_dropped,
    });

    // Dedup by canonical link, then the hard cap.
    let (capped, duplicates) = dedup::dedupe_and_cap(kept, opts.max_items);
    report.deduped = duplicates;
    report.capped = capped.len();
    counter!("enrich_dedup_total").increment(duplicates as u64);
    progress.emit(ProgressEvent::Deduped {
        kept: capped.len(),
        duplicates,
    });

    // Deep crawl: best-effort enrichment, partial coverage is fine.
    let crawl_results: HashMap<String, String> = match loader {
        Some(loader) => {
            let urls: Vec<String> = capped
                .iter()
                .map(|i| i.link.trim().to_string())
                .filter(|l| !l.is_empty())
                .collect();
            let want = urls.len();
            let map = crawl::crawl_batch(
                loader,
                &urls,
                opts.min_crawl_concurrency,
                opts.max_crawl_concurrency,
                progress,
            )
            .await;
            report.crawled = map.len();
            report.crawl_failed = want - map.len();
            map
        }
        None => HashMap::new(),
    };

    // Finalize in dedup order, not crawl-completion order.
    let signals = finalize::finalize(&capped, &crawl_results);
    progress.emit(ProgressEvent::Finalized {
        signals: signals.len(),
    });

    histogram!("enrich_run_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
    gauge!("enrich_last_run_ts").set(chrono::Utc::now().timestamp().max(0) as f64);
    tracing::info!(
        target: "enrich",
        sources_ok = report.sources_ok,
        sources_failed = report.sources_failed,
        fetched = report.fetched,
        filtered = report.noise_filtered + report.date_filtered,
        deduped = report.deduped,
        crawled = report.crawled,
        signals = signals.len(),
        "pipeline run complete"
    );

    (signals, report)
}
