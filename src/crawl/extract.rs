// src/crawl/extract.rs
//
// Narrative-text extraction from rendered article HTML. Boilerplate regions
// (chrome, ads, comments, share widgets, signup prompts, cookie banners) are
// skipped by tag name and class/id markers; the primary container is located
// by a priority selector list with the document body as a fallback.

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

/// Paragraphs at or under this trimmed length are captions, bylines, or
/// boilerplate one-liners.
pub const MIN_PARAGRAPH_CHARS: usize = 60;
pub const MAX_PARAGRAPHS: usize = 25;
/// Joined text must exceed this to count as a usable article body.
pub const MIN_ARTICLE_CHARS: usize = 200;

const SKIP_TAGS: &[&str] = &[
    "script", "style", "noscript", "nav", "footer", "header", "aside", "form",
    "figure", "figcaption", "iframe", "button",
];

const SKIP_MARKERS: &[&str] = &[
    "ad", "ads", "advert", "comment", "comments", "sidebar", "menu", "share",
    "social", "related", "newsletter", "promo", "cookie", "subscribe", "breadcrumb",
];

static CONTAINER_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    [
        "article",
        r#"[itemprop="articleBody"]"#,
        ".article-content",
        ".post-content",
        "main",
    ]
    .iter()
    .map(|s| Selector::parse(s).unwrap())
    .collect()
});

static BODY_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("body").unwrap());
static P_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("p").unwrap());

/// Extract the main narrative paragraphs from a rendered page.
/// Returns `None` when the page yields too little content to be useful —
/// a soft outcome, treated the same as a crawl failure by the caller.
pub fn extract_article_text(html: &str) -> Option<String> {
    let doc = Html::parse_document(html);
    let container = CONTAINER_SELECTORS
        .iter()
        .find_map(|sel| doc.select(sel).next())
        .or_else(|| doc.select(&BODY_SELECTOR).next())?;

    let mut paragraphs: Vec<String> = Vec::new();
    for p in container.select(&P_SELECTOR) {
        if inside_boilerplate(p) {
            continue;
        }
        let text = paragraph_text(p);
        if text.chars().count() > MIN_PARAGRAPH_CHARS {
            paragraphs.push(text);
        }
        if paragraphs.len() == MAX_PARAGRAPHS {
            break;
        }
    }

    let joined = paragraphs.join("\n\n");
    (joined.chars().count() > MIN_ARTICLE_CHARS).then_some(joined)
}

fn paragraph_text(p: ElementRef) -> String {
    let raw = p.text().collect::<Vec<_>>().join(" ");
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn inside_boilerplate(p: ElementRef) -> bool {
    p.ancestors()
        .filter_map(ElementRef::wrap)
        .any(|el| is_boilerplate(&el))
}

fn is_boilerplate(el: &ElementRef) -> bool {
    if SKIP_TAGS.contains(&el.value().name()) {
        return true;
    }
    el.value()
        .attr("class")
        .into_iter()
        .chain(el.value().attr("id"))
        .flat_map(|v| v.split_whitespace())
        .any(|token| {
            let t = token.to_ascii_lowercase();
            SKIP_MARKERS.iter().any(|m| token_matches(&t, m))
        })
}

// Marker matching on class/id tokens: exact, hyphen/underscore-affixed, or
// substring for markers long enough to be unambiguous ("newsletter", not "ad").
fn token_matches(token: &str, marker: &str) -> bool {
    if token == marker {
        return true;
    }
    if let Some(rest) = token.strip_prefix(marker) {
        if rest.starts_with(['-', '_']) {
            return true;
        }
    }
    if let Some(rest) = token.strip_suffix(marker) {
        if rest.ends_with(['-', '_']) {
            return true;
        }
    }
    marker.len() >= 6 && token.contains(marker)
}
