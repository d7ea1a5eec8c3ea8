// tests/feed_parse.rs
//
// Parser tolerance against a realistic fixture: CDATA fields, stray HTML
// entities, missing optional fields, and the lead-image priority order.

use news_signal_enricher::pipeline::fetch::parse_feed;
use news_signal_enricher::FeedSource;

const WORLD_RSS: &str = include_str!("fixtures/world_rss.xml");

fn source() -> FeedSource {
    FeedSource {
        url: "https://example.com/rss".into(),
        category: "World".into(),
        source_label: "Example World".into(),
        enabled: true,
    }
}

#[test]
fn all_items_survive_parsing() {
    let items = parse_feed(&source(), WORLD_RSS).unwrap();
    assert_eq!(items.len(), 4);
}

#[test]
fn cdata_title_and_description_are_unwrapped() {
    let items = parse_feed(&source(), WORLD_RSS).unwrap();
    assert_eq!(items[0].title, "Markets rally after rate decision");
    assert!(items[0].description.contains("Stocks rose sharply"));
}

#[test]
fn items_carry_their_source_label_and_category() {
    let items = parse_feed(&source(), WORLD_RSS).unwrap();
    assert!(items.iter().all(|i| i.source_label == "Example World"));
    assert!(items.iter().all(|i| i.category == "World"));
}

#[test]
fn media_content_is_the_preferred_lead_image() {
    let items = parse_feed(&source(), WORLD_RSS).unwrap();
    assert_eq!(items[0].lead_image_url, "https://img.example.com/markets.jpg");
}

#[test]
fn description_img_is_used_when_enclosure_is_not_an_image() {
    let items = parse_feed(&source(), WORLD_RSS).unwrap();
    assert_eq!(items[1].lead_image_url, "https://img.example.com/convoy.png");
}

#[test]
fn guid_defaults_to_link_when_absent() {
    let items = parse_feed(&source(), WORLD_RSS).unwrap();
    assert_eq!(items[1].guid, "https://example.com/b");
}

#[test]
fn empty_fields_default_to_empty_strings() {
    let items = parse_feed(&source(), WORLD_RSS).unwrap();
    let blank = &items[3];
    assert_eq!(blank.title, "");
    assert_eq!(blank.link, "");
    assert_eq!(blank.published_at, "");
    assert_eq!(blank.lead_image_url, "");
}
