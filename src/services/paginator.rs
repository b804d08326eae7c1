// src/services/paginator.rs

//! Board pagination.
//!
//! A page is fetched for a cursor and consumed as a pull iterator: zero or
//! more [`PageEvent::Topic`] followed by exactly one [`PageEvent::End`]
//! carrying the continuation, if any.

use std::sync::Arc;
use std::time::Duration;
use std::vec;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use url::Url;

use crate::error::Result;
use crate::models::{BoardCursor, CompiledSelectors, Continuation, TopicRef};
use crate::services::topics::{ListingPage, ListingRow, extract_topics};
use crate::utils::http::Fetcher;
use crate::utils::resolve_url;

/// Seconds between consecutive topics of one page.
const TOPIC_SPACING_SECS: u64 = 10;
/// Extra per-topic delay, inclusive range in seconds.
const TOPIC_JITTER_SECS: (u64, u64) = (10, 20);
/// Delay before the next listing page, inclusive range in seconds.
const PAGE_DELAY_SECS: (u64, u64) = (1800, 3600);

/// Where a page stands in its lifecycle.
///
/// Fetching happens in [`ListingPaginator::fetch_page`]; a [`PageEmission`]
/// only exists once the page is in hand, so it starts in `EmittingRows`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaginatorState {
    EmittingRows,
    /// Ended with a continuation cursor
    Continuing,
    /// Ended without one; the lineage is done
    Exhausted,
}

/// One step of a page emission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageEvent {
    Topic(TopicRef),
    End(Option<Continuation>),
}

/// Fetches listing pages for board cursors.
pub struct ListingPaginator {
    fetcher: Arc<dyn Fetcher>,
    selectors: Arc<CompiledSelectors>,
    base_url: Url,
    timeout: Duration,
    rng: StdRng,
}

impl ListingPaginator {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        selectors: Arc<CompiledSelectors>,
        base_url: Url,
        timeout: Duration,
    ) -> Self {
        Self {
            fetcher,
            selectors,
            base_url,
            timeout,
            rng: StdRng::from_os_rng(),
        }
    }

    /// Replace the jitter source, for reproducible pacing.
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    /// Listing URL for a cursor.
    pub fn listing_url(&self, cursor: &BoardCursor) -> String {
        resolve_url(
            &self.base_url,
            &format!("/cat/{}/{}/", cursor.board_id, cursor.page),
        )
    }

    /// Fetch the page a cursor points at. Network failures propagate.
    pub async fn fetch_page(&mut self, cursor: &BoardCursor, now: DateTime<Utc>) -> Result<PageEmission> {
        let url = self.listing_url(cursor);
        log::info!("Fetching board {} page {}: {}", cursor.board_id, cursor.page, url);

        let html = self.fetcher.get(&url, self.timeout).await?;
        let listing = extract_topics(&html, &self.selectors, now);
        log::debug!(
            "Board {} page {}: {} rows, more pages: {}",
            cursor.board_id,
            cursor.page,
            listing.rows.len(),
            listing.has_more_pages
        );

        Ok(PageEmission::new(
            cursor.clone(),
            listing,
            cursor.cutoff(now),
            StdRng::from_rng(&mut self.rng),
        ))
    }
}

/// Emission of one listing page.
#[derive(Debug)]
pub struct PageEmission {
    cursor: BoardCursor,
    rows: vec::IntoIter<ListingRow>,
    cutoff: Option<DateTime<Utc>>,
    has_more_pages: bool,
    emitted: u64,
    rng: StdRng,
    state: PaginatorState,
}

impl PageEmission {
    pub fn new(
        cursor: BoardCursor,
        listing: ListingPage,
        cutoff: Option<DateTime<Utc>>,
        rng: StdRng,
    ) -> Self {
        Self {
            cursor,
            rows: listing.rows.into_iter(),
            cutoff,
            has_more_pages: listing.has_more_pages,
            emitted: 0,
            rng,
            state: PaginatorState::EmittingRows,
        }
    }

    pub fn state(&self) -> PaginatorState {
        self.state
    }

    /// Consume the emission into its topics and terminal continuation.
    pub fn drain(self) -> (Vec<TopicRef>, Option<Continuation>) {
        let mut topics = Vec::new();
        let mut next = None;
        for event in self {
            match event {
                PageEvent::Topic(topic) => topics.push(topic),
                PageEvent::End(continuation) => next = continuation,
            }
        }
        (topics, next)
    }

    fn finish(&mut self, continuation: Option<Continuation>) -> PageEvent {
        self.state = if continuation.is_some() {
            PaginatorState::Continuing
        } else {
            PaginatorState::Exhausted
        };
        PageEvent::End(continuation)
    }

    fn is_expired(&self, row: &ListingRow) -> bool {
        match (self.cutoff, row.posted_at) {
            (Some(cutoff), Some(posted_at)) => posted_at <= cutoff,
            // unparseable dates never stop the page
            _ => false,
        }
    }
}

impl Iterator for PageEmission {
    type Item = PageEvent;

    fn next(&mut self) -> Option<PageEvent> {
        if self.state != PaginatorState::EmittingRows {
            return None;
        }

        let Some(row) = self.rows.next() else {
            if self.emitted == 0 {
                log::info!(
                    "Board {} page {} has no topics, stopping",
                    self.cursor.board_id,
                    self.cursor.page
                );
                return Some(self.finish(None));
            }
            if !self.has_more_pages {
                return Some(self.finish(None));
            }
            let continuation = Continuation {
                cursor: self.cursor.next_page(),
                delay_seconds: self.rng.random_range(PAGE_DELAY_SECS.0..=PAGE_DELAY_SECS.1),
            };
            return Some(self.finish(Some(continuation)));
        };

        if self.is_expired(&row) {
            log::info!(
                "Board {} page {} reached the cutoff at {}",
                self.cursor.board_id,
                self.cursor.page,
                row.relative_url
            );
            return Some(self.finish(None));
        }

        let jitter = self.rng.random_range(TOPIC_JITTER_SECS.0..=TOPIC_JITTER_SECS.1);
        let topic = TopicRef {
            relative_url: row.relative_url,
            seed: row.seed,
            leech: row.leech,
            pacing_offset_seconds: self.emitted * TOPIC_SPACING_SECS + jitter,
        };
        self.emitted += 1;
        Some(PageEvent::Topic(topic))
    }
}
