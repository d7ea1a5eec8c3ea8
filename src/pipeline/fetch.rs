// src/pipeline/fetch.rs
//
// Feed fetching and tolerant RSS parsing. Each source fetch is independent:
// the orchestrator runs them concurrently and a failure contributes zero
// items without aborting the batch.

use std::time::Duration;

use async_trait::async_trait;
use metrics::{counter, histogram};
use once_cell::sync::Lazy;
use quick_xml::de::from_str;
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

use crate::pipeline::types::{FeedSource, RawItem};

/// Per-source fetch budget.
pub const FEED_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),

    #[error("bad status {status} from {url}")]
    BadStatus { status: u16, url: String },

    #[error("unparseable feed document: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Network(err.to_string())
    }
}

/// Transport seam so the pipeline can be exercised without sockets.
#[async_trait]
pub trait FeedTransport: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// Production transport: plain HTTP(S) GET with the per-source timeout.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FeedTransport for HttpTransport {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let resp = self
            .client
            .get(url)
            .timeout(FEED_TIMEOUT)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::BadStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(resp.text().await?)
    }
}

// Serde mirror of the RSS document. Every item field is optional; missing
// fields default to empty strings in the RawItem mapping.
#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    description: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    guid: Option<Guid>,
    #[serde(default)]
    enclosure: Vec<Enclosure>,
    // quick-xml's serde deserializer strips namespace prefixes, so
    // <media:content> arrives under the local name "content".
    #[serde(rename = "content", default)]
    media_content: Vec<MediaContent>,
}

#[derive(Debug, Deserialize)]
struct Guid {
    #[serde(rename = "$text")]
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Enclosure {
    #[serde(rename = "@url")]
    url: Option<String>,
    #[serde(rename = "@type")]
    mime: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MediaContent {
    #[serde(rename = "@url")]
    url: Option<String>,
}

/// Fetch one source and parse its items. The caller owns concurrency and
/// partial-failure handling across sources.
pub async fn fetch_feed(
    transport: &dyn FeedTransport,
    source: &FeedSource,
) -> Result<Vec<RawItem>, FetchError> {
    let body = transport.fetch(&source.url).await?;
    parse_feed(source, &body)
}

/// Parse a feed document into raw items. Field-level problems degrade to
/// empty strings; only a fundamentally unparseable document is an error.
pub fn parse_feed(source: &FeedSource, body: &str) -> Result<Vec<RawItem>, FetchError> {
    let t0 = std::time::Instant::now();
    let xml = scrub_html_entities_for_xml(body);
    let rss: Rss = from_str(&xml).map_err(|e| FetchError::Parse(e.to_string()))?;

    let mut out = Vec::with_capacity(rss.channel.item.len());
    for it in rss.channel.item {
        let picture = lead_image(&it);
        let link = it.link.as_deref().unwrap_or_default().trim().to_string();
        let guid = it
            .guid
            .and_then(|g| g.value)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| link.clone());

        out.push(RawItem {
            title: it.title.unwrap_or_default().trim().to_string(),
            link,
            description: it.description.unwrap_or_default(),
            published_at: it.pub_date.unwrap_or_default().trim().to_string(),
            guid,
            lead_image_url: picture,
            source_label: source.source_label.clone(),
            category: source.category.clone(),
        });
    }

    let ms = t0.elapsed().as_secs_f64() * 1_000.0;
    histogram!("enrich_parse_ms").record(ms);
    counter!("enrich_items_total").increment(out.len() as u64);
    Ok(out)
}

/// Lead-image extraction order: explicit media:content URL, then an
/// enclosure that looks like an image, then the first <img> in the
/// description markup. Empty string when nothing matches.
fn lead_image(item: &Item) -> String {
    if let Some(url) = item
        .media_content
        .iter()
        .find_map(|m| m.url.as_deref().filter(|u| !u.trim().is_empty()))
    {
        return url.trim().to_string();
    }
    if let Some(url) = item
        .enclosure
        .iter()
        .find(|e| is_image_enclosure(e))
        .and_then(|e| e.url.as_deref())
    {
        return url.trim().to_string();
    }
    first_img_src(item.description.as_deref().unwrap_or_default())
}

fn is_image_enclosure(e: &Enclosure) -> bool {
    if e.mime.as_deref().is_some_and(|m| m.starts_with("image/")) {
        return true;
    }
    e.url.as_deref().is_some_and(|u| {
        let path = u.split(['?', '#']).next().unwrap_or(u).to_ascii_lowercase();
        [".jpg", ".jpeg", ".png", ".gif", ".webp"]
            .iter()
            .any(|ext| path.ends_with(ext))
    })
}

static RE_IMG_SRC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?is)<img[^>]+src\s*=\s*["']([^"']+)["']"#).unwrap());

fn first_img_src(description: &str) -> String {
    // Descriptions usually carry entity-escaped markup; decode before scanning.
    let decoded = html_escape::decode_html_entities(description);
    RE_IMG_SRC
        .captures(&decoded)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

/// Real-world feeds embed HTML entities the XML parser rejects.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
        .replace("&hellip;", "...")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn src() -> FeedSource {
        FeedSource {
            url: "https://example.com/rss".into(),
            category: "World".into(),
            source_label: "Example".into(),
            enabled: true,
        }
    }

    #[test]
    fn missing_optional_fields_default_to_empty() {
        let xml = r#"<rss><channel><item><title>Bare item</title></item></channel></rss>"#;
        let items = parse_feed(&src(), xml).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Bare item");
        assert_eq!(items[0].link, "");
        assert_eq!(items[0].description, "");
        assert_eq!(items[0].lead_image_url, "");
    }

    #[test]
    fn guid_falls_back_to_link() {
        let xml = r#"<rss><channel>
            <item><link>https://example.com/a</link></item>
            <item><guid isPermaLink="false">tag:1</guid><link>https://example.com/b</link></item>
        </channel></rss>"#;
        let items = parse_feed(&src(), xml).unwrap();
        assert_eq!(items[0].guid, "https://example.com/a");
        assert_eq!(items[1].guid, "tag:1");
    }

    #[test]
    fn enclosure_image_wins_over_description_img() {
        let xml = r#"<rss><channel><item>
            <enclosure url="https://img.example.com/lead.jpg" type="image/jpeg"/>
            <description>&lt;img src="https://img.example.com/inline.png"&gt;</description>
        </item></channel></rss>"#;
        let items = parse_feed(&src(), xml).unwrap();
        assert_eq!(items[0].lead_image_url, "https://img.example.com/lead.jpg");
    }

    #[test]
    fn media_content_wins_over_enclosure() {
        let xml = r#"<rss><channel><item>
            <media:content url="https://img.example.com/media.jpg"/>
            <enclosure url="https://img.example.com/lead.jpg" type="image/jpeg"/>
        </item></channel></rss>"#;
        let items = parse_feed(&src(), xml).unwrap();
        assert_eq!(items[0].lead_image_url, "https://img.example.com/media.jpg");
    }

    #[test]
    fn audio_enclosure_is_not_a_lead_image() {
        let xml = r#"<rss><channel><item>
            <enclosure url="https://example.com/pod.mp3" type="audio/mpeg"/>
        </item></channel></rss>"#;
        let items = parse_feed(&src(), xml).unwrap();
        assert_eq!(items[0].lead_image_url, "");
    }

    #[test]
    fn stray_entities_do_not_break_the_parser() {
        let xml = r#"<rss><channel><item>
            <title>Markets &ndash; a&nbsp;recap</title>
        </item></channel></rss>"#;
        let items = parse_feed(&src(), xml).unwrap();
        assert_eq!(items[0].title, "Markets - a recap");
    }

    #[test]
    fn garbage_document_is_a_parse_error() {
        let err = parse_feed(&src(), "this is not xml at all").unwrap_err();
        assert!(matches!(err, FetchError::Parse(_)));
    }
}
