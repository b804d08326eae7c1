// src/services/topics.rs

//! Listing page extraction.
//!
//! Turns one board listing page into topic rows in page order. Rows without
//! a detail link are skipped; they are headers, ads or separators.

use std::sync::LazyLock;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::models::CompiledSelectors;
use crate::utils::{normalize_whitespace, parse_digits};

static DETAIL_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/torrent/\S+").expect("valid detail link pattern"));
static CLOCK_ONLY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(\d{1,2})(?::(\d{2}))?\s*(am|pm)$").expect("valid clock pattern")
});
static DAY_MONTH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:(\d{1,2})(?::(\d{2}))?\s*(am|pm)\s+)?([a-z]{3})[a-z]*\.?\s+(\d{1,2})(?:st|nd|rd|th)?(?:\s+'(\d{2}))?$",
    )
    .expect("valid date pattern")
});

/// A topic row as it appears on the listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingRow {
    pub relative_url: String,
    /// `None` when the date column could not be parsed
    pub posted_at: Option<DateTime<Utc>>,
    pub seed: u32,
    pub leech: u32,
}

/// Everything the paginator needs from one listing page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingPage {
    pub rows: Vec<ListingRow>,
    /// Pagination control advertises pages after this one
    pub has_more_pages: bool,
}

/// Parse a listing page. `now` anchors relative dates such as `3:14pm`.
pub fn extract_topics(html: &str, selectors: &CompiledSelectors, now: DateTime<Utc>) -> ListingPage {
    let document = Html::parse_document(html);

    let rows = document
        .select(&selectors.listing_row)
        .filter_map(|row| parse_row(row, selectors, now))
        .collect();

    ListingPage {
        rows,
        has_more_pages: has_more_pages(&document, &selectors.pagination),
    }
}

fn parse_row(row: ElementRef<'_>, selectors: &CompiledSelectors, now: DateTime<Utc>) -> Option<ListingRow> {
    let relative_url = row
        .select(&selectors.anchor)
        .filter_map(|a| a.value().attr("href"))
        .find(|href| DETAIL_LINK.is_match(href))?
        .to_string();

    let posted_at = column_text(row, &selectors.row_date).and_then(|raw| parse_listing_date(&raw, now));
    if posted_at.is_none() {
        log::debug!("Unparseable date for {}, cutoff skipped", relative_url);
    }

    Some(ListingRow {
        relative_url,
        posted_at,
        seed: column_text(row, &selectors.row_seeds).map_or(0, |t| parse_digits(&t)),
        leech: column_text(row, &selectors.row_leeches).map_or(0, |t| parse_digits(&t)),
    })
}

fn column_text(row: ElementRef<'_>, selector: &Selector) -> Option<String> {
    row.select(selector)
        .next()
        .map(|el| normalize_whitespace(&el.text().collect::<String>()))
}

/// The pagination control has a "Last" link while further pages exist.
fn has_more_pages(document: &Html, pagination: &Selector) -> bool {
    document
        .select(pagination)
        .any(|el| el.text().any(|t| t.contains("Last")))
}

/// Parse the listing date column.
///
/// Recognized: `3:14pm` / `7am` (today), `7am Oct. 16th` / `Oct. 16th`
/// (this year), `Oct. 16th '24`, RFC 3339 and `YYYY-MM-DD[ HH:MM:SS]` (UTC).
pub fn parse_listing_date(raw: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(Utc.from_utc_datetime(&dt));
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)));
    }

    if let Some(caps) = CLOCK_ONLY.captures(raw) {
        let time = clock(&caps[1], caps.get(2).map(|m| m.as_str()), &caps[3])?;
        return Some(Utc.from_utc_datetime(&now.date_naive().and_time(time)));
    }

    let caps = DAY_MONTH.captures(raw)?;
    let time = match caps.get(1) {
        Some(hour) => clock(hour.as_str(), caps.get(2).map(|m| m.as_str()), &caps[3])?,
        None => NaiveTime::MIN,
    };
    let month = month_number(&caps[4])?;
    let day: u32 = caps[5].parse().ok()?;
    let year = match caps.get(6) {
        Some(short) => 2000 + short.as_str().parse::<i32>().ok()?,
        None => now.year(),
    };
    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    Some(Utc.from_utc_datetime(&date.and_time(time)))
}

fn clock(hour: &str, minute: Option<&str>, meridiem: &str) -> Option<NaiveTime> {
    let hour: u32 = hour.parse().ok()?;
    let minute: u32 = minute.map_or(Ok(0), |m| m.parse::<u32>()).ok()?;
    if !(1..=12).contains(&hour) {
        return None;
    }
    let hour = match (hour, meridiem.eq_ignore_ascii_case("pm")) {
        (12, false) => 0,
        (12, true) => 12,
        (h, false) => h,
        (h, true) => h + 12,
    };
    NaiveTime::from_hms_opt(hour, minute, 0)
}

fn month_number(abbrev: &str) -> Option<u32> {
    const MONTHS: [&str; 12] = [
        "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
    ];
    let abbrev = abbrev.to_lowercase();
    MONTHS
        .iter()
        .position(|m| *m == abbrev)
        .map(|i| i as u32 + 1)
}
