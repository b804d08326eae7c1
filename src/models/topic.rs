// src/models/topic.rs

use serde::{Deserialize, Serialize};

/// A topic row picked from a listing page, waiting for its detail fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicRef {
    /// Site-relative detail link, also the topic id (`/torrent/123/Name/`)
    pub relative_url: String,
    pub seed: u32,
    pub leech: u32,
    /// Seconds after the page was emitted before this topic may be fetched
    pub pacing_offset_seconds: u64,
}
