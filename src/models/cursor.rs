// src/models/cursor.rs

//! Board crawl position.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Position of one crawl lineage on a board.
///
/// Cursors are never mutated; advancing produces a new value with a higher
/// page number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardCursor {
    /// Board (site category) identifier, e.g. `Movies`
    pub board_id: String,

    /// 1-based listing page
    pub page: u32,

    /// Only topics newer than this many hours are emitted
    #[serde(default)]
    pub lookback_hours: Option<u32>,
}

impl BoardCursor {
    /// Cursor for the first page of a board.
    pub fn first(board_id: impl Into<String>, lookback_hours: Option<u32>) -> Self {
        Self {
            board_id: board_id.into(),
            page: 1,
            lookback_hours,
        }
    }

    /// Cursor for the page after this one, same board and window.
    pub fn next_page(&self) -> Self {
        Self {
            board_id: self.board_id.clone(),
            page: self.page.saturating_add(1),
            lookback_hours: self.lookback_hours,
        }
    }

    /// Oldest instant still eligible at `now`, if a lookback window is set.
    pub fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.lookback_hours
            .map(|hours| now - Duration::hours(i64::from(hours)))
    }
}

/// A cursor to continue with plus the delay to wait before fetching it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Continuation {
    #[serde(flatten)]
    pub cursor: BoardCursor,

    /// Seconds to wait before fetching the next listing page
    pub delay_seconds: u64,
}
