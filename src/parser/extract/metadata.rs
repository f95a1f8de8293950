use std::sync::LazyLock;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;

use crate::parser::anchors::Anchor;
use crate::parser::{first_in, text_of, Page};
use crate::record::OfferMetadata;

/// Genitive and nominative month names share these prefixes. `мар` must precede `ма`.
const MONTH_PREFIXES: &[(&str, u32)] = &[
    ("янв", 1),
    ("фев", 2),
    ("мар", 3),
    ("апр", 4),
    ("ма", 5),
    ("июн", 6),
    ("июл", 7),
    ("авг", 8),
    ("сен", 9),
    ("окт", 10),
    ("ноя", 11),
    ("дек", 12),
];

static TOTAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d[\d\s]*?)\s*просмотр").unwrap());
static TODAY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d[\d\s]*?)\s*за сегодня").unwrap());
static UNIQUE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d[\d\s]*?)\s*уникальн").unwrap());

/// "Updated" stamp and view counters. `now` anchors relative dates.
pub fn extract(page: &Page, now: NaiveDateTime) -> Option<OfferMetadata> {
    let scope = page.first(Anchor::OfferMeta);
    let find = |anchor: Anchor| match scope {
        Some(scope) => first_in(scope, anchor),
        None => page.first(anchor),
    };

    let updated_date = find(Anchor::MetaUpdated)
        .map(text_of)
        .map(|t| strip_updated_prefix(&t))
        .filter(|t| !t.is_empty());
    let views_stats = find(Anchor::MetaViews).map(text_of).filter(|t| !t.is_empty());
    if updated_date.is_none() && views_stats.is_none() {
        return None;
    }

    let updated_at = updated_date.as_deref().and_then(|d| parse_date(d, now));
    let (total_views, views_today, unique_views) = views_stats
        .as_deref()
        .map(parse_view_stats)
        .unwrap_or_default();

    Some(OfferMetadata {
        updated_date,
        updated_at,
        views_stats,
        total_views,
        views_today,
        unique_views,
    })
}

fn strip_updated_prefix(text: &str) -> String {
    let lower = text.to_lowercase();
    match lower.strip_prefix("обновлено") {
        Some(rest) => rest.trim_start_matches(':').trim().to_string(),
        None => text.to_string(),
    }
}

/// `сегодня, 09:30`, `вчера, 23:10` or `5 мая, 14:00` (current year unless given).
pub fn parse_date(raw: &str, now: NaiveDateTime) -> Option<NaiveDateTime> {
    let lower = raw.trim().to_lowercase();
    let (day, time) = lower.split_once(',')?;
    let time = NaiveTime::parse_from_str(time.trim(), "%H:%M").ok()?;

    let date = match day.trim() {
        "сегодня" => now.date(),
        "вчера" => now.date() - Duration::days(1),
        other => {
            let mut parts = other.split_whitespace();
            let day: u32 = parts.next()?.parse().ok()?;
            let month_name = parts.next()?;
            let month = MONTH_PREFIXES
                .iter()
                .find(|(prefix, _)| month_name.starts_with(prefix))
                .map(|(_, m)| *m)?;
            let year = match parts.next() {
                Some(y) => y.parse().ok()?,
                None => now.year(),
            };
            NaiveDate::from_ymd_opt(year, month, day)?
        }
    };
    Some(date.and_time(time))
}

/// (total, today, unique) from `2004 просмотра, 63 за сегодня, 1190 уникальных`.
/// Each counter is matched on its own.
pub fn parse_view_stats(raw: &str) -> (Option<u64>, Option<u64>, Option<u64>) {
    let count = |re: &Regex| {
        re.captures(raw).and_then(|c| {
            c[1].chars()
                .filter(char::is_ascii_digit)
                .collect::<String>()
                .parse()
                .ok()
        })
    };
    (count(&TOTAL_RE), count(&TODAY_RE), count(&UNIQUE_RE))
}
