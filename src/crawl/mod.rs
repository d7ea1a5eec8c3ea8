// src/crawl/mod.rs
//
// Best-effort deep crawl: bounded-concurrency page rendering with a per-page
// timeout and a single retry. Per-URL failures reduce coverage but never
// surface to the batch caller.

pub mod extract;

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use futures::StreamExt;
use metrics::counter;
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::progress::{ProgressEvent, ProgressSink};

pub use extract::extract_article_text;

/// In-flight page-load bounds. The effective pool size scales with the
/// amount of work, clamped to this range.
pub const MIN_CONCURRENCY: usize = 5;
pub const MAX_CONCURRENCY: usize = 15;
/// Navigation + extraction budget per attempt.
pub const PAGE_TIMEOUT: Duration = Duration::from_secs(20);
/// One retry per URL, then give up silently.
pub const MAX_REQUEST_RETRIES: usize = 1;

#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("browser launch failed: {0}")]
    Launch(String),

    #[error("navigation failed for {url}: {message}")]
    Navigation { url: String, message: String },

    #[error("page load timed out after {0:?}")]
    Timeout(Duration),
}

/// Page-rendering seam so crawl policy (concurrency, timeout, retry) can be
/// exercised without a browser.
#[async_trait]
pub trait PageLoader: Send + Sync {
    /// Navigate to `url` and return the rendered HTML once the DOM is ready.
    async fn load(&self, url: &str) -> Result<String, CrawlError>;
}

/// Headless Chrome loader. Launched with sandboxing disabled — required for
/// containerized deployments where the kernel sandbox is unavailable.
pub struct ChromeLoader {
    browser: Browser,
    handler: JoinHandle<()>,
}

impl ChromeLoader {
    pub async fn launch() -> Result<Self, CrawlError> {
        let config = BrowserConfig::builder()
            .no_sandbox()
            .args(vec![
                "--disable-setuid-sandbox",
                "--disable-gpu",
                "--disable-dev-shm-usage",
            ])
            .build()
            .map_err(CrawlError::Launch)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| CrawlError::Launch(e.to_string()))?;

        // The CDP event loop must be driven for the lifetime of the browser.
        let handler = tokio::spawn(async move { while handler.next().await.is_some() {} });

        Ok(Self { browser, handler })
    }

    /// Cooperative shutdown: close the browser process, then stop the CDP loop.
    pub async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            tracing::warn!(error = %e, "browser close failed");
        }
        self.handler.abort();
    }
}

#[async_trait]
impl PageLoader for ChromeLoader {
    async fn load(&self, url: &str) -> Result<String, CrawlError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| CrawlError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        // goto resolves once the DOM is ready, before subresources finish —
        // speed over completeness.
        let outcome = tokio::time::timeout(PAGE_TIMEOUT, async {
            page.goto(url).await.map_err(|e| CrawlError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            })?;
            page.content().await.map_err(|e| CrawlError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            })
        })
        .await;

        if let Err(e) = page.close().await {
            tracing::debug!(url, error = %e, "page close failed");
        }

        match outcome {
            Ok(result) => result,
            Err(_) => Err(CrawlError::Timeout(PAGE_TIMEOUT)),
        }
    }
}

/// Crawl `urls` with bounded concurrency and return a partial map from url to
/// extracted text. URLs that fail both attempts or yield insufficient content
/// are simply absent. Resolves successfully even at 0% coverage.
pub async fn crawl_batch(
    loader: &dyn PageLoader,
    urls: &[String],
    min_concurrency: usize,
    max_concurrency: usize,
    progress: &ProgressSink,
) -> HashMap<String, String> {
    if urls.is_empty() {
        return HashMap::new();
    }
    // Misordered caller bounds degrade instead of panicking in clamp.
    let max = max_concurrency.max(1);
    let min = min_concurrency.clamp(1, max);
    let concurrency = urls.len().clamp(min, max);
    progress.emit(ProgressEvent::CrawlStarted { urls: urls.len() });
    tracing::info!(urls = urls.len(), concurrency, "deep crawl starting");

    let results: Vec<(String, Option<String>)> = futures::stream::iter(urls.iter().cloned())
        .map(|url| async move {
            let text = crawl_one(loader, &url, progress).await;
            (url, text)
        })
        .buffer_unordered(concurrency)
        .collect()
        .await;

    let mut map = HashMap::with_capacity(results.len());
    for (url, text) in results {
        if let Some(t) = text {
            map.insert(url, t);
        }
    }
    map
}

async fn crawl_one(
    loader: &dyn PageLoader,
    url: &str,
    progress: &ProgressSink,
) -> Option<String> {
    if url::Url::parse(url).is_err() {
        tracing::debug!(url, "skipping uncrawlable url");
        counter!("enrich_crawl_failed_total").increment(1);
        return None;
    }

    let mut attempt = 0usize;
    loop {
        match loader.load(url).await {
            Ok(html) => match extract::extract_article_text(&html) {
                Some(text) => {
                    counter!("enrich_crawled_total").increment(1);
                    progress.emit(ProgressEvent::PageCrawled {
                        url: url.to_string(),
                        chars: text.chars().count(),
                    });
                    return Some(text);
                }
                None => {
                    // Insufficient content is a soft outcome, not retried.
                    tracing::debug!(url, "insufficient article content");
                    counter!("enrich_crawl_failed_total").increment(1);
                    progress.emit(ProgressEvent::PageFailed {
                        url: url.to_string(),
                        error: "insufficient content".to_string(),
                    });
                    return None;
                }
            },
            Err(e) if attempt < MAX_REQUEST_RETRIES => {
                attempt += 1;
                tracing::debug!(url, error = %e, attempt, "page load failed; retrying");
            }
            Err(e) => {
                tracing::warn!(url, error = %e, "page load failed; giving up");
                counter!("enrich_crawl_failed_total").increment(1);
                progress.emit(ProgressEvent::PageFailed {
                    url: url.to_string(),
                    error: e.to_string(),
                });
                return None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn long_article() -> String {
        let body: String = (0..5)
            .map(|i| format!("<p>Paragraph {i}: {}</p>", "sentence content ".repeat(5)))
            .collect();
        format!("<html><body><article>{body}</article></body></html>")
    }

    struct FlakyLoader {
        calls: AtomicUsize,
        fail_first: usize,
    }

    #[async_trait]
    impl PageLoader for FlakyLoader {
        async fn load(&self, url: &str) -> Result<String, CrawlError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_first {
                Err(CrawlError::Navigation {
                    url: url.to_string(),
                    message: "connection reset".into(),
                })
            } else {
                Ok(long_article())
            }
        }
    }

    #[tokio::test]
    async fn one_retry_recovers_a_flaky_page() {
        let loader = FlakyLoader {
            calls: AtomicUsize::new(0),
            fail_first: 1,
        };
        let urls = vec!["https://example.com/a".to_string()];
        let map = crawl_batch(&loader, &urls, 5, 15, &ProgressSink::disabled()).await;
        assert_eq!(map.len(), 1);
        assert_eq!(loader.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn second_failure_drops_the_url_silently() {
        let loader = FlakyLoader {
            calls: AtomicUsize::new(0),
            fail_first: 2,
        };
        let urls = vec!["https://example.com/a".to_string()];
        let map = crawl_batch(&loader, &urls, 5, 15, &ProgressSink::disabled()).await;
        assert!(map.is_empty());
        // Exactly two attempts: the original and one retry.
        assert_eq!(loader.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn misordered_concurrency_bounds_do_not_panic() {
        let loader = FlakyLoader {
            calls: AtomicUsize::new(0),
            fail_first: 0,
        };
        let urls: Vec<String> = (0..12)
            .map(|i| format!("https://example.com/{i}"))
            .collect();
        let map = crawl_batch(&loader, &urls, 20, 10, &ProgressSink::disabled()).await;
        assert_eq!(map.len(), 12);
    }

    struct ThinLoader {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PageLoader for ThinLoader {
        async fn load(&self, _url: &str) -> Result<String, CrawlError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok("<html><body><article><p>Too short.</p></article></body></html>".into())
        }
    }

    #[tokio::test]
    async fn insufficient_content_is_not_retried() {
        let loader = ThinLoader {
            calls: AtomicUsize::new(0),
        };
        let urls = vec!["https://example.com/a".to_string()];
        let map = crawl_batch(&loader, &urls, 5, 15, &ProgressSink::disabled()).await;
        assert!(map.is_empty());
        assert_eq!(loader.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn invalid_urls_are_skipped_without_loading() {
        let loader = ThinLoader {
            calls: AtomicUsize::new(0),
        };
        let urls = vec!["not a url".to_string()];
        let map = crawl_batch(&loader, &urls, 5, 15, &ProgressSink::disabled()).await;
        assert!(map.is_empty());
        assert_eq!(loader.calls.load(Ordering::SeqCst), 0);
    }
}
