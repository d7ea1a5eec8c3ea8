//! # Feed Catalog
//!
//! Owns the configured feed sources: a built-in set loaded from
//! `config/feeds.toml` (or `$FEEDS_CONFIG_PATH`), falling back to an embedded
//! seed, plus feeds registered at runtime by the caller. An explicit owned
//! object passed through app state — no global mutable configuration.
//!
//! Duplicate source URLs are tolerated here; they resolve at the item level
//! through link deduplication.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::pipeline::types::FeedSource;

const ENV_PATH: &str = "FEEDS_CONFIG_PATH";
const DEFAULT_PATH: &str = "config/feeds.toml";

#[derive(Debug, Clone, Default)]
pub struct FeedCatalog {
    builtin: Vec<FeedSource>,
    user: Vec<FeedSource>,
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    feeds: Vec<FeedSource>,
}

impl FeedCatalog {
    /// Load built-in entries using env var + fallbacks:
    /// 1) $FEEDS_CONFIG_PATH
    /// 2) config/feeds.toml
    /// 3) embedded seed
    pub fn load_default() -> Self {
        if let Ok(p) = std::env::var(ENV_PATH) {
            let pb = PathBuf::from(p);
            match Self::load_from(&pb) {
                Ok(c) => return c,
                Err(e) => {
                    tracing::warn!(path = %pb.display(), error = %e, "feed config unreadable; using seed");
                    return Self::default_seed();
                }
            }
        }
        let default = PathBuf::from(DEFAULT_PATH);
        if default.exists() {
            match Self::load_from(&default) {
                Ok(c) => return c,
                Err(e) => {
                    tracing::warn!(path = %default.display(), error = %e, "feed config unreadable; using seed");
                }
            }
        }
        Self::default_seed()
    }

    /// Load built-in entries from an explicit TOML file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading feed catalog from {}", path.display()))?;
        let file: CatalogFile =
            toml::from_str(&content).with_context(|| "parsing feed catalog toml")?;
        Ok(Self {
            builtin: file.feeds,
            user: Vec::new(),
        })
    }

    /// Built-in seed used when no configuration is present.
    pub(crate) fn default_seed() -> Self {
        let seed = [
            ("https://feeds.bbci.co.uk/news/world/rss.xml", "World", "BBC World"),
            ("https://www.theguardian.com/world/rss", "World", "Guardian World"),
            ("https://www.aljazeera.com/xml/rss/all.xml", "World", "Al Jazeera"),
            ("https://feeds.npr.org/1001/rss.xml", "US", "NPR News"),
            (
                "https://www.cnbc.com/id/100003114/device/rss/rss.html",
                "Business",
                "CNBC Top News",
            ),
            (
                "https://feeds.content.dowjones.io/public/rss/mw_topstories",
                "Markets",
                "MarketWatch",
            ),
            ("https://techcrunch.com/feed/", "Technology", "TechCrunch"),
        ];
        Self {
            builtin: seed
                .iter()
                .map(|(url, category, label)| FeedSource {
                    url: url.to_string(),
                    category: category.to_string(),
                    source_label: label.to_string(),
                    enabled: true,
                })
                .collect(),
            user: Vec::new(),
        }
    }

    /// The set a run operates on: enabled built-in entries in catalog order,
    /// then user-registered feeds in insertion order (always treated as
    /// enabled). No source-level dedup.
    pub fn active_feeds(&self) -> Vec<FeedSource> {
        let mut out: Vec<FeedSource> = self
            .builtin
            .iter()
            .filter(|f| f.enabled)
            .cloned()
            .collect();
        out.extend(self.user.iter().cloned().map(|mut f| {
            f.enabled = true;
            f
        }));
        out
    }

    /// Every entry with its current enabled flag, for catalog management UIs.
    pub fn entries(&self) -> Vec<FeedSource> {
        let mut out = self.builtin.clone();
        out.extend(self.user.iter().cloned());
        out
    }

    pub fn add(&mut self, feed: FeedSource) {
        self.user.push(feed);
    }

    /// Remove a user-registered feed by URL. Built-in entries are toggled,
    /// not removed.
    pub fn remove(&mut self, url: &str) -> bool {
        let before = self.user.len();
        self.user.retain(|f| f.url != url);
        self.user.len() != before
    }

    pub fn set_enabled(&mut self, url: &str, enabled: bool) -> bool {
        let mut changed = false;
        for f in self.builtin.iter_mut().chain(self.user.iter_mut()) {
            if f.url == url {
                f.enabled = enabled;
                changed = true;
            }
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn user_feed(url: &str) -> FeedSource {
        FeedSource {
            url: url.into(),
            category: "Custom".into(),
            source_label: "Custom".into(),
            enabled: false,
        }
    }

    #[test]
    fn seed_is_nonempty_and_all_enabled() {
        let c = FeedCatalog::default_seed();
        assert!(!c.active_feeds().is_empty());
        assert_eq!(c.active_feeds().len(), c.entries().len());
    }

    #[test]
    fn user_feeds_are_always_active_and_ordered_after_builtin() {
        let mut c = FeedCatalog::default_seed();
        let builtin_count = c.active_feeds().len();
        c.add(user_feed("https://example.com/rss"));

        let active = c.active_feeds();
        assert_eq!(active.len(), builtin_count + 1);
        let last = active.last().unwrap();
        assert_eq!(last.url, "https://example.com/rss");
        // Registered while disabled, still treated as enabled.
        assert!(last.enabled);
    }

    #[test]
    fn toggling_builtin_removes_it_from_the_active_set() {
        let mut c = FeedCatalog::default_seed();
        let url = c.entries()[0].url.clone();
        assert!(c.set_enabled(&url, false));
        assert!(c.active_feeds().iter().all(|f| f.url != url));
        assert!(c.set_enabled(&url, true));
        assert!(c.active_feeds().iter().any(|f| f.url == url));
    }

    #[test]
    fn remove_only_affects_user_feeds() {
        let mut c = FeedCatalog::default_seed();
        let builtin_url = c.entries()[0].url.clone();
        assert!(!c.remove(&builtin_url));

        c.add(user_feed("https://example.com/rss"));
        assert!(c.remove("https://example.com/rss"));
        assert!(!c.remove("https://example.com/rss"));
    }

    #[test]
    fn load_from_parses_camel_case_toml() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            f,
            r#"
[[feeds]]
url = "https://example.com/a.xml"
category = "World"
sourceLabel = "Example A"

[[feeds]]
url = "https://example.com/b.xml"
category = "Tech"
sourceLabel = "Example B"
enabled = false
"#
        )
        .unwrap();

        let c = FeedCatalog::load_from(f.path()).unwrap();
        assert_eq!(c.entries().len(), 2);
        let active = c.active_feeds();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].source_label, "Example A");
    }

    #[serial_test::serial]
    #[test]
    fn env_path_overrides_default_location() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            f,
            r#"
[[feeds]]
url = "https://env.example.com/rss"
category = "World"
sourceLabel = "From Env"
"#
        )
        .unwrap();

        std::env::set_var(ENV_PATH, f.path());
        let c = FeedCatalog::load_default();
        std::env::remove_var(ENV_PATH);

        assert_eq!(c.entries().len(), 1);
        assert_eq!(c.entries()[0].source_label, "From Env");
    }
}
