// src/models/selectors.rs

//! CSS selectors for scraping listing and topic pages.

use scraper::Selector;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// CSS selectors for one site layout.
///
/// Defaults match the 1337x markup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteSelectors {
    /// Each row of a listing table
    #[serde(default = "defaults::listing_row")]
    pub listing_row: String,

    /// Date column within a row
    #[serde(default = "defaults::row_date")]
    pub row_date: String,

    /// Seeders column within a row
    #[serde(default = "defaults::row_seeds")]
    pub row_seeds: String,

    /// Leechers column within a row
    #[serde(default = "defaults::row_leeches")]
    pub row_leeches: String,

    /// Pagination control of a listing page
    #[serde(default = "defaults::pagination")]
    pub pagination: String,

    /// Topic headline on the detail page
    #[serde(default = "defaults::headline")]
    pub headline: String,

    /// Free-form description block
    #[serde(default = "defaults::description")]
    pub description: String,

    /// Block holding the download links
    #[serde(default = "defaults::torrent_detail")]
    pub torrent_detail: String,

    /// File listing block
    #[serde(default = "defaults::files")]
    pub files: String,

    /// Labeled attribute entries ("Language", "Category", ...)
    #[serde(default = "defaults::attribute")]
    pub attribute: String,

    /// Value element inside an attribute entry
    #[serde(default = "defaults::attribute_value")]
    pub attribute_value: String,
}

impl Default for SiteSelectors {
    fn default() -> Self {
        Self {
            listing_row: defaults::listing_row(),
            row_date: defaults::row_date(),
            row_seeds: defaults::row_seeds(),
            row_leeches: defaults::row_leeches(),
            pagination: defaults::pagination(),
            headline: defaults::headline(),
            description: defaults::description(),
            torrent_detail: defaults::torrent_detail(),
            files: defaults::files(),
            attribute: defaults::attribute(),
            attribute_value: defaults::attribute_value(),
        }
    }
}

impl SiteSelectors {
    /// Parse every selector once.
    pub fn compile(&self) -> Result<CompiledSelectors> {
        Ok(CompiledSelectors {
            listing_row: parse_selector(&self.listing_row)?,
            row_date: parse_selector(&self.row_date)?,
            row_seeds: parse_selector(&self.row_seeds)?,
            row_leeches: parse_selector(&self.row_leeches)?,
            pagination: parse_selector(&self.pagination)?,
            headline: parse_selector(&self.headline)?,
            description: parse_selector(&self.description)?,
            torrent_detail: parse_selector(&self.torrent_detail)?,
            files: parse_selector(&self.files)?,
            attribute: parse_selector(&self.attribute)?,
            attribute_value: parse_selector(&self.attribute_value)?,
            anchor: parse_selector("a[href]")?,
        })
    }
}

/// Parsed counterpart of [`SiteSelectors`].
#[derive(Debug, Clone)]
pub struct CompiledSelectors {
    pub listing_row: Selector,
    pub row_date: Selector,
    pub row_seeds: Selector,
    pub row_leeches: Selector,
    pub pagination: Selector,
    pub headline: Selector,
    pub description: Selector,
    pub torrent_detail: Selector,
    pub files: Selector,
    pub attribute: Selector,
    pub attribute_value: Selector,
    pub anchor: Selector,
}

fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

mod defaults {
    pub fn listing_row() -> String {
        ".featured-list table tr".into()
    }
    pub fn row_date() -> String {
        "td.coll-date".into()
    }
    pub fn row_seeds() -> String {
        "td.seeds".into()
    }
    pub fn row_leeches() -> String {
        "td.leeches".into()
    }
    pub fn pagination() -> String {
        ".pagination".into()
    }
    pub fn headline() -> String {
        ".box-info-heading h1".into()
    }
    pub fn description() -> String {
        "#description".into()
    }
    pub fn torrent_detail() -> String {
        ".torrent-detail-page".into()
    }
    pub fn files() -> String {
        "#files".into()
    }
    pub fn attribute() -> String {
        "ul.list li".into()
    }
    pub fn attribute_value() -> String {
        "span".into()
    }
}
