// src/services/resolver.rs

//! Media identity collaborator.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Episode, Movie, Show};

/// Looks up canonical media by external id or by title.
///
/// Errors mean the resolver itself is unavailable; "not found" is `Ok(None)`.
#[async_trait]
pub trait MediaResolver: Send + Sync {
    async fn resolve_movie_by_id(&self, id: &str) -> Result<Option<Movie>>;

    async fn resolve_show_by_id(&self, id: &str) -> Result<Option<Show>>;

    async fn resolve_episode(&self, show: &Show, season: u32, episode: u32)
    -> Result<Option<Episode>>;

    /// External id of the movie with this title and release year.
    async fn search_movie_by_title_year(&self, name: &str, year: i32) -> Result<Option<String>>;

    /// External id of the show with this title.
    async fn search_show_by_title(&self, name: &str) -> Result<Option<String>>;
}
