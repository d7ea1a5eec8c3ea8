// src/pipeline/filter.rs
//
// Denylist-based noise rejection plus optional exact calendar-date filtering.
// One pattern hit on either the title or the description excludes the item.

use chrono::{DateTime, Local, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::pipeline::types::RawItem;

static RE_NOISE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?ix)\b(
            nba|nfl|mlb|nhl|ufc|fifa|premier\ league|champions\ league|world\ cup
            |super\ bowl|playoffs?|final\ score|touchdown|grand\ slam|box\ office
            |celebrity|celebrities|gossip|red\ carpet|paparazzi
            |oscars?|grammys?|emmys?|golden\ globes?|met\ gala
            |lifestyle|travel\ guide|fashion\ week|style\ tips|recipes?
            |lottery|powerball|mega\ millions|jackpot|horoscopes?|astrology|zodiac
        )\b",
    )
    .unwrap()
});

/// Case-insensitive, word-boundary denylist check.
pub fn is_noise(text: &str) -> bool {
    RE_NOISE.is_match(text)
}

/// Best-effort publish-date parsing (RFC 2822 is the common RSS format,
/// RFC 3339 the common Atom one), converted to the caller-local calendar date.
pub fn local_calendar_date(ts: &str) -> Option<NaiveDate> {
    let parsed = DateTime::parse_from_rfc2822(ts)
        .or_else(|_| DateTime::parse_from_rfc3339(ts))
        .ok()?;
    Some(parsed.with_timezone(&Local).date_naive())
}

fn keep(item: &RawItem, target_date: Option<NaiveDate>) -> Option<Verdict> {
    if is_noise(&item.title) || is_noise(&item.description) {
        return Some(Verdict::Noise);
    }
    if let Some(want) = target_date {
        // Unparseable dates fail closed.
        match local_calendar_date(&item.published_at) {
            Some(d) if d == want => {}
            _ => return Some(Verdict::WrongDate),
        }
    }
    None
}

enum Verdict {
    Noise,
    WrongDate,
}

/// Apply both filters. Returns (kept, noise_dropped, date_dropped).
pub fn apply(
    items: Vec<RawItem>,
    target_date: Option<NaiveDate>,
) -> (Vec<RawItem>, usize, usize) {
    let mut noise_dropped = 0usize;
    let mut date_dropped = 0usize;
    let mut kept = Vec::with_capacity(items.len());
    for item in items {
        match keep(&item, target_date) {
            None => kept.push(item),
            Some(Verdict::Noise) => noise_dropped += 1,
            Some(Verdict::WrongDate) => date_dropped += 1,
        }
    }
    (kept, noise_dropped, date_dropped)
}
