// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod api;
pub mod catalog;
pub mod crawl;
pub mod metrics;
pub mod pipeline;
pub mod progress;

// ---- Re-exports for stable public API ----
pub use crate::api::{create_router, AppState};
pub use crate::catalog::FeedCatalog;
pub use crate::pipeline::types::{EnrichedSignal, FeedSource, PipelineReport, RawItem};
pub use crate::pipeline::PipelineOptions;
pub use crate::progress::{ProgressEvent, ProgressSink};
