// src/test_support.rs

//! In-memory collaborators and page fixtures shared by unit tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use crate::error::{AppError, Result};
use crate::models::{
    CompiledSelectors, Continuation, Episode, MediaReference, Movie, ParsedTorrent, Show,
    SiteSelectors, TorrentHandle,
};
use crate::services::MediaResolver;
use crate::storage::{Checkpoint, CursorStore, TorrentStorage};
use crate::utils::http::Fetcher;

/// Default 1337x selectors, compiled.
pub fn selectors() -> CompiledSelectors {
    SiteSelectors::default().compile().unwrap()
}

/// Listing page markup from `(url, date, seeds, leeches)` rows.
pub fn listing_html(rows: &[(&str, &str, &str, &str)], has_more: bool) -> String {
    let body: String = rows
        .iter()
        .map(|(url, date, seeds, leeches)| {
            format!(
                r#"<tr>
                    <td class="coll-1 name"><a href="/sub/1/0/" class="icon"></a><a href="{url}">{url}</a></td>
                    <td class="coll-2 seeds">{seeds}</td>
                    <td class="coll-3 leeches">{leeches}</td>
                    <td class="coll-date">{date}</td>
                </tr>"#
            )
        })
        .collect();
    let pagination = if has_more {
        r#"<div class="pagination"><ul><li class="active"><a href="/cat/x/1/">1</a></li><li class="last"><a href="/cat/x/99/">Last</a></li></ul></div>"#
    } else {
        r#"<div class="pagination"><ul><li class="active"><a href="/cat/x/1/">1</a></li></ul></div>"#
    };
    format!(
        r#"<html><body><div class="featured-list"><table>
            <thead><tr><th>name</th><th>se</th><th>le</th><th>time</th></tr></thead>
            <tbody>{body}</tbody>
        </table></div>{pagination}</body></html>"#
    )
}

/// Builder for topic detail pages.
#[derive(Debug, Clone)]
pub struct DetailFixture {
    title: String,
    description: String,
    magnet: Option<String>,
    language: Option<String>,
    files: String,
}

impl DetailFixture {
    /// A movie page with an identifier, a 1080p tag and a magnet link.
    pub fn movie() -> Self {
        Self {
            title: "Some.Movie.(2020).1080p.WEBRip".into(),
            description: r#"<p><a href="https://www.imdb.com/title/tt1234567/">IMDb</a> Video: 1080p x264</p>"#.into(),
            magnet: Some(
                "magnet:?xt=urn:btih:0123456789abcdef&amp;dn=Some+Movie&amp;tr=udp://tracker:80".into(),
            ),
            language: None,
            files: String::new(),
        }
    }

    pub fn title(mut self, title: &str) -> Self {
        self.title = title.into();
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = description.into();
        self
    }

    pub fn language(mut self, language: &str) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Inner markup of the file block.
    pub fn files(mut self, files: &str) -> Self {
        self.files = files.into();
        self
    }

    pub fn without_magnet(mut self) -> Self {
        self.magnet = None;
        self
    }

    pub fn html(&self) -> String {
        let links = match &self.magnet {
            Some(magnet) => format!(
                r#"<li><a class="btn" href="{magnet}">Magnet Download</a></li><li><a href="https://itorrents.example/x.torrent">Torrent Download</a></li>"#
            ),
            None => r#"<li><a href="https://itorrents.example/x.torrent">Torrent Download</a></li>"#.into(),
        };
        let language = self
            .language
            .as_deref()
            .map(|l| format!("<li><strong>Language</strong> <span>{l}</span></li>"))
            .unwrap_or_default();
        format!(
            r#"<html><body>
                <div class="box-info-heading"><h1>{title}</h1></div>
                <div class="torrent-detail-page">
                    <ul class="dropdown">{links}</ul>
                    <ul class="list"><li><strong>Category</strong> <span>Movies</span></li>{language}</ul>
                </div>
                <div id="description">{description}</div>
                <div id="files">{files}</div>
            </body></html>"#,
            title = self.title,
            description = self.description,
            files = self.files,
        )
    }
}

/// Serves canned pages; unknown URLs fail like an unreachable host.
#[derive(Debug, Default)]
pub struct StubFetcher {
    pages: HashMap<String, String>,
}

impl StubFetcher {
    pub fn with_page(mut self, url: &str, html: String) -> Self {
        self.pages.insert(url.to_string(), html);
        self
    }
}

#[async_trait]
impl Fetcher for StubFetcher {
    async fn get(&self, url: &str, _timeout: Duration) -> Result<String> {
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| AppError::crawl(url, "connection refused"))
    }
}

/// Resolver over a fixed set of media.
#[derive(Debug, Default)]
pub struct StubResolver {
    movies: Vec<Movie>,
    shows: Vec<Show>,
    episodes: Vec<(String, u32, u32)>,
    failing: bool,
}

impl StubResolver {
    pub fn with_movie(mut self, id: &str, title: &str, year: i32) -> Self {
        self.movies.push(Movie {
            id: id.into(),
            title: title.into(),
            year: Some(year),
        });
        self
    }

    pub fn with_show(mut self, id: &str, title: &str) -> Self {
        self.shows.push(Show {
            id: id.into(),
            title: title.into(),
        });
        self
    }

    pub fn with_episode(mut self, show_id: &str, season: u32, episode: u32) -> Self {
        self.episodes.push((show_id.into(), season, episode));
        self
    }

    /// Every call fails as if the resolver were down.
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    fn check(&self) -> Result<()> {
        if self.failing {
            return Err(AppError::resolver("resolver unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl MediaResolver for StubResolver {
    async fn resolve_movie_by_id(&self, id: &str) -> Result<Option<Movie>> {
        self.check()?;
        Ok(self.movies.iter().find(|m| m.id == id).cloned())
    }

    async fn resolve_show_by_id(&self, id: &str) -> Result<Option<Show>> {
        self.check()?;
        Ok(self.shows.iter().find(|s| s.id == id).cloned())
    }

    async fn resolve_episode(&self, show: &Show, season: u32, episode: u32) -> Result<Option<Episode>> {
        self.check()?;
        let known = self
            .episodes
            .iter()
            .any(|(id, s, e)| *id == show.id && *s == season && *e == episode);
        Ok(known.then(|| Episode {
            show_id: show.id.clone(),
            season,
            episode,
            title: None,
        }))
    }

    async fn search_movie_by_title_year(&self, name: &str, year: i32) -> Result<Option<String>> {
        self.check()?;
        Ok(self
            .movies
            .iter()
            .find(|m| m.title.eq_ignore_ascii_case(name) && m.year == Some(year))
            .map(|m| m.id.clone()))
    }

    async fn search_show_by_title(&self, name: &str) -> Result<Option<String>> {
        self.check()?;
        Ok(self
            .shows
            .iter()
            .find(|s| s.title.eq_ignore_ascii_case(name))
            .map(|s| s.id.clone()))
    }
}

/// A call made against [`RecordingStorage`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageCall {
    FindOrCreateMovie {
        site: String,
        topic_id: String,
        movie: Movie,
    },
    FindOrCreateEpisode {
        site: String,
        topic_id: String,
        show: Show,
        episode: Episode,
    },
    Upsert {
        handle: TorrentHandle,
        torrent: ParsedTorrent,
    },
}

/// Storage that records every call and hands out sequential handles.
#[derive(Debug, Default)]
pub struct RecordingStorage {
    calls: Mutex<Vec<StorageCall>>,
    next_id: AtomicU64,
    failing: bool,
}

impl RecordingStorage {
    /// Upserts fail as if the backing store were unwritable.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<StorageCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn upserted(&self) -> Vec<(TorrentHandle, ParsedTorrent)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                StorageCall::Upsert { handle, torrent } => Some((handle, torrent)),
                _ => None,
            })
            .collect()
    }

    fn handle(&self, site: &str, topic_id: &str, media: MediaReference) -> TorrentHandle {
        TorrentHandle {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            site: site.into(),
            topic_id: topic_id.into(),
            media,
        }
    }
}

#[async_trait]
impl TorrentStorage for RecordingStorage {
    async fn find_or_create_movie_torrent(
        &self,
        site: &str,
        topic_id: &str,
        movie: &Movie,
    ) -> Result<TorrentHandle> {
        self.calls.lock().unwrap().push(StorageCall::FindOrCreateMovie {
            site: site.into(),
            topic_id: topic_id.into(),
            movie: movie.clone(),
        });
        Ok(self.handle(site, topic_id, MediaReference::Movie(movie.clone())))
    }

    async fn find_or_create_episode_torrent(
        &self,
        site: &str,
        topic_id: &str,
        show: &Show,
        episode: &Episode,
    ) -> Result<TorrentHandle> {
        self.calls.lock().unwrap().push(StorageCall::FindOrCreateEpisode {
            site: site.into(),
            topic_id: topic_id.into(),
            show: show.clone(),
            episode: episode.clone(),
        });
        let media = MediaReference::Episode {
            show: show.clone(),
            episode: episode.clone(),
        };
        Ok(self.handle(site, topic_id, media))
    }

    async fn upsert(&self, handle: &TorrentHandle, torrent: &ParsedTorrent) -> Result<()> {
        if self.failing {
            return Err(AppError::storage("disk full"));
        }
        self.calls.lock().unwrap().push(StorageCall::Upsert {
            handle: handle.clone(),
            torrent: torrent.clone(),
        });
        Ok(())
    }
}

/// Cursor store kept in memory.
#[derive(Debug, Default)]
pub struct MemoryCursors {
    saved: Mutex<BTreeMap<String, Checkpoint>>,
}

impl MemoryCursors {
    pub fn with_checkpoint(self, board_id: &str, checkpoint: Checkpoint) -> Self {
        self.saved.lock().unwrap().insert(board_id.into(), checkpoint);
        self
    }

    pub fn get(&self, board_id: &str) -> Option<Checkpoint> {
        self.saved.lock().unwrap().get(board_id).cloned()
    }
}

#[async_trait]
impl CursorStore for MemoryCursors {
    async fn load_cursor(&self, board_id: &str) -> Result<Option<Checkpoint>> {
        Ok(self.get(board_id))
    }

    async fn save_cursor(&self, board_id: &str, next: Option<&Continuation>) -> Result<()> {
        let mut saved = self.saved.lock().unwrap();
        match next {
            Some(continuation) => {
                saved.insert(
                    board_id.into(),
                    Checkpoint {
                        continuation: continuation.clone(),
                        saved_at: Utc::now(),
                    },
                );
            }
            None => {
                saved.remove(board_id);
            }
        }
        Ok(())
    }
}
