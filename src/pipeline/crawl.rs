// src/pipeline/crawl.rs

//! Board crawling pipeline.
//!
//! Each configured board is crawled as one lineage: listing pages are
//! fetched in order, the topics of a page go through a bounded worker pool,
//! and the continuation is checkpointed once the page is done.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use futures::stream::{self, StreamExt};
use tokio::time::{Instant, sleep, sleep_until};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{BoardConfig, BoardCursor, Config, CrawlerConfig, TopicRef};
use crate::services::{DetailOutcome, DetailParser, ListingPaginator, MediaResolver};
use crate::storage::{CursorStore, LocalCatalog, LocalStorage, TorrentStorage};
use crate::utils::http::{Fetcher, HttpFetcher};

/// What one lineage did during a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineageSummary {
    pub board_id: String,
    /// Started from a saved checkpoint instead of page 1
    pub resumed: bool,
    pub pages: u32,
    pub topics: usize,
    pub persisted: usize,
    pub abandoned: usize,
    pub detail_failures: usize,
    /// Page the next run will start from, if the lineage is not done
    pub next_page: Option<u32>,
}

/// How `run_spider` picks boards and starting points.
#[derive(Debug, Clone, Default)]
pub struct CrawlOptions {
    /// Crawl only this board
    pub board: Option<String>,
    /// Replace the configured lookback window of every crawled board
    pub lookback_hours: Option<u32>,
    /// Ignore saved checkpoints and start from page 1
    pub fresh: bool,
}

/// Runs board lineages against one site.
pub struct BoardCrawler {
    paginator: ListingPaginator,
    detail: DetailParser,
    cursors: Arc<dyn CursorStore>,
    settings: CrawlerConfig,
}

impl BoardCrawler {
    pub fn new(
        paginator: ListingPaginator,
        detail: DetailParser,
        cursors: Arc<dyn CursorStore>,
        settings: CrawlerConfig,
    ) -> Self {
        Self {
            paginator,
            detail,
            cursors,
            settings,
        }
    }

    /// Wire the crawler from configuration and collaborators.
    pub fn from_config(
        config: &Config,
        fetcher: Arc<dyn Fetcher>,
        resolver: Arc<dyn MediaResolver>,
        storage: Arc<dyn TorrentStorage>,
        cursors: Arc<dyn CursorStore>,
    ) -> Result<Self> {
        let selectors = Arc::new(config.selectors.compile()?);
        let base_url = Url::parse(&config.site.base_url)?;
        let timeout = Duration::from_secs(config.crawler.timeout_secs);

        let paginator = ListingPaginator::new(
            Arc::clone(&fetcher),
            Arc::clone(&selectors),
            base_url.clone(),
            timeout,
        );
        let detail = DetailParser::new(
            fetcher,
            resolver,
            storage,
            selectors,
            base_url,
            &config.site.name,
            timeout,
        );
        Ok(Self::new(paginator, detail, cursors, config.crawler.clone()))
    }

    /// Crawl one board until its lineage ends or the page budget is spent.
    ///
    /// A listing fetch failure or a collaborator failure stops the lineage
    /// with an error; the checkpoint then still points at the failed page.
    pub async fn crawl_board(&mut self, board: &BoardConfig, fresh: bool) -> Result<LineageSummary> {
        let mut summary = LineageSummary {
            board_id: board.id.clone(),
            ..LineageSummary::default()
        };

        let (mut cursor, mut delay) = self.starting_point(board, fresh, &mut summary).await?;

        loop {
            if let Some(max_pages) = self.settings.max_pages {
                if summary.pages >= max_pages {
                    log::info!("Board {}: page budget of {} reached", board.id, max_pages);
                    summary.next_page = Some(cursor.page);
                    break;
                }
            }

            if self.settings.honor_page_delay && delay > 0 {
                log::info!("Board {}: waiting {}s before page {}", board.id, delay, cursor.page);
                sleep(Duration::from_secs(delay)).await;
            }

            let page_start = Instant::now();
            let emission = self.paginator.fetch_page(&cursor, Utc::now()).await?;
            let (topics, next) = emission.drain();
            summary.pages += 1;
            summary.topics += topics.len();

            self.process_topics(&board.id, topics, page_start, &mut summary).await?;
            self.cursors.save_cursor(&board.id, next.as_ref()).await?;

            match next {
                Some(continuation) => {
                    cursor = continuation.cursor;
                    delay = continuation.delay_seconds;
                }
                None => {
                    log::info!("Board {}: lineage finished at page {}", board.id, cursor.page);
                    break;
                }
            }
        }

        Ok(summary)
    }

    async fn starting_point(
        &self,
        board: &BoardConfig,
        fresh: bool,
        summary: &mut LineageSummary,
    ) -> Result<(BoardCursor, u64)> {
        if fresh {
            return Ok((board.first_cursor(), 0));
        }

        match self.cursors.load_cursor(&board.id).await? {
            Some(checkpoint) => {
                let remaining = checkpoint.remaining_delay(Utc::now());
                log::info!(
                    "Board {}: resuming at page {} ({}s of delay left)",
                    board.id,
                    checkpoint.continuation.cursor.page,
                    remaining
                );
                summary.resumed = true;
                Ok((checkpoint.continuation.cursor, remaining))
            }
            None => Ok((board.first_cursor(), 0)),
        }
    }

    /// Fetch the details of one page's topics through the worker pool.
    async fn process_topics(
        &self,
        board_id: &str,
        topics: Vec<TopicRef>,
        page_start: Instant,
        summary: &mut LineageSummary,
    ) -> Result<()> {
        let detail = &self.detail;
        let honor_pacing = self.settings.honor_pacing;
        let concurrency = self.settings.max_concurrent.max(1);

        let mut results = stream::iter(topics)
            .map(|topic| async move {
                if honor_pacing {
                    sleep_until(page_start + Duration::from_secs(topic.pacing_offset_seconds)).await;
                }
                let result = detail.process(&topic).await;
                (topic, result)
            })
            .buffer_unordered(concurrency);

        while let Some((topic, result)) = results.next().await {
            match result {
                Ok(DetailOutcome::Persisted(_)) => summary.persisted += 1,
                Ok(DetailOutcome::Abandoned(_)) => summary.abandoned += 1,
                Err(error) if error.is_collaborator_failure() => {
                    log::error!(
                        "Board {}: stopping at {}: {}",
                        board_id,
                        topic.relative_url,
                        error
                    );
                    return Err(error);
                }
                Err(error) => {
                    summary.detail_failures += 1;
                    log::warn!(
                        "Board {}: failed to fetch {}: {}",
                        board_id,
                        topic.relative_url,
                        error
                    );
                }
            }
        }
        Ok(())
    }
}

/// Boards selected by the options, with any lookback override applied.
pub fn select_boards(config: &Config, options: &CrawlOptions) -> Result<Vec<BoardConfig>> {
    let mut boards: Vec<BoardConfig> = match &options.board {
        Some(id) => {
            let board = config
                .site
                .boards
                .iter()
                .find(|b| &b.id == id)
                .cloned()
                .unwrap_or_else(|| {
                    log::warn!("Board {} is not configured, crawling it without a lookback", id);
                    BoardConfig {
                        id: id.clone(),
                        lookback_hours: None,
                    }
                });
            vec![board]
        }
        None => config.site.boards.clone(),
    };

    if boards.is_empty() {
        return Err(AppError::config("No boards to crawl"));
    }
    if let Some(hours) = options.lookback_hours {
        for board in &mut boards {
            board.lookback_hours = Some(hours);
        }
    }
    Ok(boards)
}

/// Run every selected board lineage against the storage directory.
pub async fn run_spider(
    config: &Config,
    storage_dir: &Path,
    options: &CrawlOptions,
) -> Result<Vec<LineageSummary>> {
    let boards = select_boards(config, options)?;
    log::info!(
        "Crawling {} board(s) on {} ({})",
        boards.len(),
        config.site.name,
        config.site.base_url
    );

    let fetcher: Arc<dyn Fetcher> = Arc::new(HttpFetcher::from_config(&config.crawler)?);
    let resolver: Arc<dyn MediaResolver> = Arc::new(LocalCatalog::load(storage_dir).await?);
    let storage = Arc::new(LocalStorage::open(storage_dir).await?);

    let mut crawlers = boards
        .iter()
        .map(|_| {
            BoardCrawler::from_config(
                config,
                Arc::clone(&fetcher),
                Arc::clone(&resolver),
                storage.clone(),
                storage.clone(),
            )
        })
        .collect::<Result<Vec<_>>>()?;

    let runs = crawlers
        .iter_mut()
        .zip(&boards)
        .map(|(crawler, board)| crawler.crawl_board(board, options.fresh));
    let results = join_all(runs).await;

    let mut summaries = Vec::with_capacity(results.len());
    let mut first_error = None;
    for (board, result) in boards.iter().zip(results) {
        match result {
            Ok(summary) => {
                log::info!(
                    "Board {}: {} pages, {} topics, {} stored, {} abandoned, {} failed",
                    summary.board_id,
                    summary.pages,
                    summary.topics,
                    summary.persisted,
                    summary.abandoned,
                    summary.detail_failures
                );
                summaries.push(summary);
            }
            Err(error) => {
                log::error!("Board {} stopped: {}", board.id, error);
                if first_error.is_none() {
                    first_error = Some(AppError::crawl(format!("board {}", board.id), error));
                }
            }
        }
    }

    match first_error {
        Some(error) => Err(error),
        None => Ok(summaries),
    }
}
