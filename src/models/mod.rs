// src/models/mod.rs

//! Domain models for the spider.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod cursor;
mod media;
mod selectors;
mod topic;
mod torrent;

// Re-export all public types
pub use config::{BoardConfig, Config, CrawlerConfig, SiteConfig};
pub use cursor::{BoardCursor, Continuation};
pub use media::{Episode, MediaReference, Movie, Show};
pub use selectors::{CompiledSelectors, SiteSelectors};
pub use topic::TopicRef;
pub use torrent::{FileEntry, Language, ParsedTorrent, Quality, TorrentHandle};
