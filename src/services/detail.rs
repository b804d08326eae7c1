// src/services/detail.rs

//! Topic detail parsing.
//!
//! Fetches a topic page, extracts everything needed for a torrent record,
//! establishes the media identity and hands the finished record to storage.
//! A topic whose identity or magnet cannot be established is abandoned
//! without touching storage.

use std::fmt;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::Result;
use crate::models::{
    CompiledSelectors, FileEntry, Language, MediaReference, ParsedTorrent, Quality, TopicRef,
    TorrentHandle,
};
use crate::services::file_tree::build_file_list;
use crate::services::{MediaResolver, title};
use crate::storage::TorrentStorage;
use crate::utils::http::Fetcher;
use crate::utils::{normalize_whitespace, resolve_url};

static IMDB_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(tt\d{7,8})\b").expect("valid identifier pattern"));
static MAGNET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""(magnet[^"]+)""#).expect("valid magnet pattern"));
static EPISODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"S(\d\d)E(\d\d)").expect("valid episode pattern"));

const LANGUAGE_LABEL: &str = "Language";

/// Why a topic produced no torrent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbandonReason {
    MissingIdentifier,
    MissingMagnet,
    UnresolvableMedia,
}

impl fmt::Display for AbandonReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AbandonReason::MissingIdentifier => "no external identifier",
            AbandonReason::MissingMagnet => "no magnet link",
            AbandonReason::UnresolvableMedia => "media not resolvable",
        })
    }
}

/// Result of processing one topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailOutcome {
    Persisted(TorrentHandle),
    Abandoned(AbandonReason),
}

/// Everything extracted from a topic page before identity is resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetailPage {
    pub title: String,
    /// Identifier embedded in the description, if any
    pub external_id: Option<String>,
    pub quality: Quality,
    pub magnet_uri: Option<String>,
    pub files: Vec<FileEntry>,
    pub language: Option<Language>,
}

/// Parse a topic page. Missing blocks yield empty fields, never errors.
pub fn parse_detail_page(html: &str, selectors: &CompiledSelectors) -> DetailPage {
    let document = Html::parse_document(html);
    let first = |selector: &Selector| document.select(selector).next();

    let title = first(&selectors.headline)
        .map(|el| normalize_whitespace(&el.text().collect::<String>()))
        .unwrap_or_default();

    let description = first(&selectors.description);
    let external_id = description.and_then(|el| extract_identifier(&el.html()));
    let quality = description.map_or(Quality::Unknown, |el| {
        Quality::detect(&el.text().collect::<String>())
    });

    let magnet_uri = first(&selectors.torrent_detail).and_then(|el| extract_magnet(&el.html()));
    let files = first(&selectors.files)
        .map(build_file_list)
        .unwrap_or_default();
    let language = document
        .select(&selectors.attribute)
        .find(|el| el.text().any(|t| t.contains(LANGUAGE_LABEL)))
        .and_then(|el| attribute_value(el, selectors))
        .map(|label| Language::from_label(&label));

    DetailPage {
        title,
        external_id,
        quality,
        magnet_uri,
        files,
        language,
    }
}

fn attribute_value(entry: ElementRef<'_>, selectors: &CompiledSelectors) -> Option<String> {
    let value = entry.select(&selectors.attribute_value).next()?;
    let text = normalize_whitespace(&value.text().collect::<String>());
    (!text.is_empty()).then_some(text)
}

/// First IMDb-style identifier (`tt` + 7 or 8 digits) in the text.
pub fn extract_identifier(text: &str) -> Option<String> {
    IMDB_ID.captures(text).map(|caps| caps[1].to_string())
}

/// First double-quoted magnet literal in serialized markup.
pub fn extract_magnet(markup: &str) -> Option<String> {
    MAGNET
        .captures(markup)
        .map(|caps| caps[1].replace("&amp;", "&"))
}

/// Season and episode numbers from an `S##E##` marker.
pub fn episode_marker(title: &str) -> Option<(u32, u32)> {
    let caps = EPISODE.captures(title)?;
    Some((caps[1].parse().ok()?, caps[2].parse().ok()?))
}

/// Turns topics into persisted torrents.
pub struct DetailParser {
    fetcher: Arc<dyn Fetcher>,
    resolver: Arc<dyn MediaResolver>,
    storage: Arc<dyn TorrentStorage>,
    selectors: Arc<CompiledSelectors>,
    base_url: Url,
    site: String,
    timeout: Duration,
}

impl DetailParser {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        resolver: Arc<dyn MediaResolver>,
        storage: Arc<dyn TorrentStorage>,
        selectors: Arc<CompiledSelectors>,
        base_url: Url,
        site: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            fetcher,
            resolver,
            storage,
            selectors,
            base_url,
            site: site.into(),
            timeout,
        }
    }

    /// Fetch, parse, resolve and persist one topic.
    ///
    /// Network and collaborator failures are errors; markup irregularities
    /// end in [`DetailOutcome::Abandoned`].
    pub async fn process(&self, topic: &TopicRef) -> Result<DetailOutcome> {
        let topic_id = topic.relative_url.as_str();
        let url = resolve_url(&self.base_url, topic_id);
        let html = self.fetcher.get(&url, self.timeout).await?;
        let page = parse_detail_page(&html, &self.selectors);

        let external_id = match page.external_id.clone() {
            Some(id) => id,
            None => {
                log::info!("[{}] {}: no identifier in description", self.site, topic_id);
                match title::resolve_identifier(&page.title, self.resolver.as_ref()).await? {
                    Some(id) => id,
                    None => return Ok(self.abandon(topic_id, AbandonReason::MissingIdentifier)),
                }
            }
        };

        let Some(magnet_uri) = page.magnet_uri else {
            return Ok(self.abandon(topic_id, AbandonReason::MissingMagnet));
        };

        let Some(media) = self.resolve_media(&page.title, &external_id).await? else {
            return Ok(self.abandon(topic_id, AbandonReason::UnresolvableMedia));
        };

        let handle = match &media {
            MediaReference::Movie(movie) => {
                self.storage
                    .find_or_create_movie_torrent(&self.site, topic_id, movie)
                    .await?
            }
            MediaReference::Episode { show, episode } => {
                self.storage
                    .find_or_create_episode_torrent(&self.site, topic_id, show, episode)
                    .await?
            }
        };

        let torrent = ParsedTorrent::new(
            page.title,
            Some(external_id),
            page.quality,
            page.language,
            magnet_uri,
            topic.seed,
            topic.leech,
            page.files,
        );
        self.storage.upsert(&handle, &torrent).await?;

        log::info!(
            "[{}] {}: stored {} ({}, {} files, {} bytes)",
            self.site,
            topic_id,
            torrent.title,
            torrent.quality,
            torrent.files.len(),
            torrent.total_size()
        );
        Ok(DetailOutcome::Persisted(handle))
    }

    /// Episode when the title carries `S##E##`, movie otherwise.
    async fn resolve_media(&self, title: &str, external_id: &str) -> Result<Option<MediaReference>> {
        if let Some((season, number)) = episode_marker(title) {
            let Some(show) = self.resolver.resolve_show_by_id(external_id).await? else {
                return Ok(None);
            };
            let episode = self.resolver.resolve_episode(&show, season, number).await?;
            return Ok(episode.map(|episode| MediaReference::Episode { show, episode }));
        }

        let movie = self.resolver.resolve_movie_by_id(external_id).await?;
        Ok(movie.map(MediaReference::Movie))
    }

    fn abandon(&self, topic_id: &str, reason: AbandonReason) -> DetailOutcome {
        log::warn!("[{}] {}: abandoned, {}", self.site, topic_id, reason);
        DetailOutcome::Abandoned(reason)
    }
}
