//! Pipeline entry points for spider operations.
//!
//! - `run_spider`: Crawl board lineages and store the resolved torrents

pub mod crawl;

pub use crawl::{BoardCrawler, CrawlOptions, LineageSummary, run_spider, select_boards};
