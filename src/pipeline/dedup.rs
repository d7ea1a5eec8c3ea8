// src/pipeline/dedup.rs
//
// Cross-source merge keyed by canonical link, then a hard processing cap.

use std::collections::HashMap;

use crate::pipeline::types::RawItem;

/// Ceiling on items handed to the deep crawler. A cost bound, not a ranking.
pub const DEFAULT_MAX_ITEMS: usize = 100;

/// Merge items by trimmed `link`, last-seen wins, preserving the order in
/// which each link was first seen, then truncate to `max_items`.
/// Returns (surviving items, duplicate count).
///
/// Last-seen-wins is preserved for compatibility with the observed behavior
/// of existing consumers; see DESIGN.md for the open question around it.
pub fn dedupe_and_cap(items: Vec<RawItem>, max_items: usize) -> (Vec<RawItem>, usize) {
    let total = items.len();
    let mut order: Vec<String> = Vec::new();
    let mut by_link: HashMap<String, RawItem> = HashMap::with_capacity(total);

    for item in items {
        let key = item.link.trim().to_string();
        if by_link.insert(key.clone(), item).is_none() {
            order.push(key);
        }
    }

    let duplicates = total - by_link.len();
    let mut out: Vec<RawItem> = order
        .into_iter()
        .filter_map(|k| by_link.remove(&k))
        .collect();
    out.truncate(max_items);
    (out, duplicates)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(link: &str, source_label: &str) -> RawItem {
        RawItem {
            link: link.into(),
            source_label: source_label.into(),
            ..RawItem::default()
        }
    }

    #[test]
    fn last_seen_wins_for_duplicate_links() {
        let (out, dups) = dedupe_and_cap(
            vec![
                item("https://example.com/x", "first"),
                item("https://example.com/y", "other"),
                item("https://example.com/x", "second"),
            ],
            100,
        );
        assert_eq!(out.len(), 2);
        assert_eq!(dups, 1);
        // Position of the first sighting, payload of the last.
        assert_eq!(out[0].link, "https://example.com/x");
        assert_eq!(out[0].source_label, "second");
    }

    #[test]
    fn links_are_trimmed_before_keying() {
        let (out, dups) = dedupe_and_cap(
            vec![item("  https://example.com/x ", "a"), item("https://example.com/x", "b")],
            100,
        );
        assert_eq!(out.len(), 1);
        assert_eq!(dups, 1);
    }

    #[test]
    fn cap_truncates_after_dedup() {
        let items: Vec<RawItem> = (0..250)
            .map(|i| item(&format!("https://example.com/{i}"), "s"))
            .collect();
        let (out, dups) = dedupe_and_cap(items, DEFAULT_MAX_ITEMS);
        assert_eq!(out.len(), DEFAULT_MAX_ITEMS);
        assert_eq!(dups, 0);
        assert_eq!(out[0].link, "https://example.com/0");
        assert_eq!(out[99].link, "https://example.com/99");
    }
}
