//! Application configuration structures.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{BoardCursor, SiteSelectors};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// HTTP and crawling behavior settings
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Site being crawled and its boards
    #[serde(default)]
    pub site: SiteConfig,

    /// Markup selectors for the site layout
    #[serde(default)]
    pub selectors: SiteSelectors,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.crawler.user_agent.trim().is_empty() {
            return Err(AppError::validation("crawler.user_agent is empty"));
        }
        if self.crawler.timeout_secs == 0 {
            return Err(AppError::validation("crawler.timeout_secs must be > 0"));
        }
        if self.crawler.max_concurrent == 0 {
            return Err(AppError::validation("crawler.max_concurrent must be > 0"));
        }
        if self.site.name.trim().is_empty() {
            return Err(AppError::validation("site.name is empty"));
        }
        url::Url::parse(&self.site.base_url)
            .map_err(|e| AppError::validation(format!("site.base_url: {e}")))?;
        if self.site.boards.is_empty() {
            return Err(AppError::validation("No boards defined"));
        }
        if let Some(board) = self.site.boards.iter().find(|b| b.id.trim().is_empty()) {
            return Err(AppError::validation(format!(
                "Board with empty id (lookback {:?})",
                board.lookback_hours
            )));
        }
        self.selectors.compile()?;
        Ok(())
    }
}

/// HTTP client and crawling behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Maximum concurrent detail fetches
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,

    /// Wait for each topic's pacing offset before fetching it
    #[serde(default = "defaults::enabled")]
    pub honor_pacing: bool,

    /// Wait the continuation delay between listing pages
    #[serde(default = "defaults::enabled")]
    pub honor_page_delay: bool,

    /// Upper bound on listing pages per lineage in one run
    #[serde(default)]
    pub max_pages: Option<u32>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            max_concurrent: defaults::max_concurrent(),
            honor_pacing: defaults::enabled(),
            honor_page_delay: defaults::enabled(),
            max_pages: None,
        }
    }
}

/// The crawled site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Site name recorded with every torrent
    #[serde(default = "defaults::site_name")]
    pub name: String,

    /// Base URL that listing and topic paths are joined onto
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// Boards crawled by default
    #[serde(default = "defaults::boards")]
    pub boards: Vec<BoardConfig>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            name: defaults::site_name(),
            base_url: defaults::base_url(),
            boards: defaults::boards(),
        }
    }
}

/// A board to crawl and how far back to look.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardConfig {
    pub id: String,

    #[serde(default)]
    pub lookback_hours: Option<u32>,
}

impl BoardConfig {
    /// Cursor at the first page of this board.
    pub fn first_cursor(&self) -> BoardCursor {
        BoardCursor::first(&self.id, self.lookback_hours)
    }
}

mod defaults {
    use super::BoardConfig;

    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; torrent-spider/0.1)".into()
    }
    pub fn timeout() -> u64 {
        10
    }
    pub fn max_concurrent() -> usize {
        4
    }
    pub fn enabled() -> bool {
        true
    }
    pub fn site_name() -> String {
        "1337x".into()
    }
    pub fn base_url() -> String {
        "https://1337x.to/".into()
    }
    pub fn boards() -> Vec<BoardConfig> {
        vec![
            BoardConfig {
                id: "Movies".into(),
                lookback_hours: Some(48),
            },
            BoardConfig {
                id: "TV".into(),
                lookback_hours: Some(48),
            },
        ]
    }
}
