//! Typed pipeline progress events.
//!
//! The pipeline emits these over an optional channel instead of threading
//! status strings through callbacks; a consumer (CLI, UI, log bridge)
//! subscribes to the receiving end. A disabled sink makes every emit a no-op.

use tokio::sync::mpsc::UnboundedSender;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    FetchStarted { sources: usize },
    SourceFetched { source: String, items: usize },
    SourceFailed { source: String, error: String },
    Filtered { kept: usize, dropped: usize },
    Deduped { kept: usize, duplicates: usize },
    CrawlStarted { urls: usize },
    PageCrawled { url: String, chars: usize },
    PageFailed { url: String, error: String },
    Finalized { signals: usize },
}

#[derive(Debug, Clone, Default)]
pub struct ProgressSink {
    tx: Option<UnboundedSender<ProgressEvent>>,
}

impl ProgressSink {
    pub fn new(tx: UnboundedSender<ProgressEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    /// Send an event; a closed or absent receiver is not an error.
    pub fn emit(&self, event: ProgressEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }
}
