//! Storage abstractions for torrent and crawl-state persistence.
//!
//! ## Directory Structure
//!
//! ```text
//! storage/
//! ├── config.toml           # Spider configuration
//! ├── catalog.json          # Known movies, shows and episodes
//! ├── torrents.json         # Stored torrents keyed by (site, topic)
//! └── cursors.json          # Continuation checkpoint per board
//! ```

pub mod catalog;
pub mod local;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{Continuation, Episode, Movie, ParsedTorrent, Show, TorrentHandle};

// Re-export for convenience
pub use catalog::LocalCatalog;
pub use local::LocalStorage;

/// Persistence collaborator for torrents.
///
/// Implementations must be idempotent on `(site, topic_id)` and create at
/// most one record per key under concurrent calls.
#[async_trait]
pub trait TorrentStorage: Send + Sync {
    /// Handle of the torrent for a movie topic, reserving one if new.
    async fn find_or_create_movie_torrent(
        &self,
        site: &str,
        topic_id: &str,
        movie: &Movie,
    ) -> Result<TorrentHandle>;

    /// Handle of the torrent for an episode topic, reserving one if new.
    async fn find_or_create_episode_torrent(
        &self,
        site: &str,
        topic_id: &str,
        show: &Show,
        episode: &Episode,
    ) -> Result<TorrentHandle>;

    /// Write the torrent fields for a handle.
    async fn upsert(&self, handle: &TorrentHandle, torrent: &ParsedTorrent) -> Result<()>;
}

/// A saved continuation and when it was saved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint {
    #[serde(flatten)]
    pub continuation: Continuation,
    pub saved_at: DateTime<Utc>,
}

impl Checkpoint {
    /// Seconds of the continuation delay still left at `now`.
    pub fn remaining_delay(&self, now: DateTime<Utc>) -> u64 {
        let elapsed = (now - self.saved_at).num_seconds().max(0) as u64;
        self.continuation.delay_seconds.saturating_sub(elapsed)
    }
}

/// Durable crawl position per board.
#[async_trait]
pub trait CursorStore: Send + Sync {
    async fn load_cursor(&self, board_id: &str) -> Result<Option<Checkpoint>>;

    /// Save the continuation of a board, or clear it when the lineage ended.
    async fn save_cursor(&self, board_id: &str, next: Option<&Continuation>) -> Result<()>;
}
