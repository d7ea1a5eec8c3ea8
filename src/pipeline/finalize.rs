// src/pipeline/finalize.rs
//
// Merges crawled full text (or the feed-snippet fallback) into the bounded
// content window and maps items to their final signal shape. Iterates the
// capped item list, not the crawl map, so output order is the dedup order.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::pipeline::types::{EnrichedSignal, RawItem};

pub const SNIPPET_MAX_CHARS: usize = 800;
pub const CONTENT_MAX_CHARS: usize = 5000;

static RE_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)</?[^>]+>").unwrap());
static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Strip markup from a feed description: decode entities, drop tags,
/// collapse whitespace.
pub fn strip_tags(s: &str) -> String {
    let decoded = html_escape::decode_html_entities(s).to_string();
    let no_tags = RE_TAGS.replace_all(&decoded, " ");
    RE_WS.replace_all(no_tags.trim(), " ").trim().to_string()
}

fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}

/// Produce the final signal set. Crawl results are a partial map; items
/// without an entry fall back to their feed snippet, so content is always
/// non-empty even under total crawl failure.
pub fn finalize(
    items: &[RawItem],
    crawl_results: &HashMap<String, String>,
) -> Vec<EnrichedSignal> {
    items
        .iter()
        .map(|item| {
            let link = item.link.trim().to_string();
            let snippet = truncate_chars(&strip_tags(&item.description), SNIPPET_MAX_CHARS);
            let content = match crawl_results.get(&link) {
                Some(text) => format!("{}. {}", item.title, text),
                None => format!("{}. {}", item.title, snippet),
            };
            let id = if item.guid.trim().is_empty() {
                link.clone()
            } else {
                item.guid.trim().to_string()
            };

            EnrichedSignal {
                id,
                source: item.source_label.clone(),
                category: item.category.clone(),
                timestamp: item.published_at.clone(),
                title: item.title.clone(),
                link,
                snippet,
                picture: item.lead_image_url.clone(),
                content: truncate_chars(&content, CONTENT_MAX_CHARS),
            }
        })
        .collect()
}
