// src/storage/catalog.rs

//! Media catalog backed by a local JSON document.
//!
//! `catalog.json` lists the movies and shows the spider may attach
//! torrents to. Title searches compare case-insensitively with dots,
//! underscores and repeated spaces folded away.

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{Episode, Movie, Show};
use crate::services::MediaResolver;

pub const CATALOG_FILE: &str = "catalog.json";

/// A show and the episodes it is known to have.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogShow {
    #[serde(flatten)]
    pub show: Show,
    #[serde(default)]
    pub episodes: Vec<CatalogEpisode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEpisode {
    pub season: u32,
    pub episode: u32,
    #[serde(default)]
    pub title: Option<String>,
}

/// On-disk catalog document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub movies: Vec<Movie>,
    #[serde(default)]
    pub shows: Vec<CatalogShow>,
}

/// [`MediaResolver`] over a loaded [`Catalog`].
#[derive(Debug, Clone, Default)]
pub struct LocalCatalog {
    catalog: Catalog,
}

impl LocalCatalog {
    pub fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }

    /// Load `catalog.json` from the storage directory.
    ///
    /// A missing file yields an empty catalog; every topic will then be
    /// abandoned as unresolvable.
    pub async fn load(root_dir: impl AsRef<Path>) -> Result<Self> {
        let path = root_dir.as_ref().join(CATALOG_FILE);
        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let catalog: Catalog = serde_json::from_slice(&bytes)?;
                log::debug!(
                    "Loaded catalog: {} movies, {} shows",
                    catalog.movies.len(),
                    catalog.shows.len()
                );
                Ok(Self::new(catalog))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::warn!("No catalog at {}, nothing will resolve", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(AppError::resolver(format!("reading {}: {e}", path.display()))),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    fn show(&self, id: &str) -> Option<&CatalogShow> {
        self.catalog.shows.iter().find(|s| s.show.id == id)
    }
}

/// Lowercase, with separators folded into single spaces.
fn normalize_title(title: &str) -> String {
    title
        .to_lowercase()
        .replace(['.', '_'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[async_trait]
impl MediaResolver for LocalCatalog {
    async fn resolve_movie_by_id(&self, id: &str) -> Result<Option<Movie>> {
        Ok(self.catalog.movies.iter().find(|m| m.id == id).cloned())
    }

    async fn resolve_show_by_id(&self, id: &str) -> Result<Option<Show>> {
        Ok(self.show(id).map(|s| s.show.clone()))
    }

    async fn resolve_episode(&self, show: &Show, season: u32, episode: u32) -> Result<Option<Episode>> {
        let found = self.show(&show.id).and_then(|s| {
            s.episodes
                .iter()
                .find(|e| e.season == season && e.episode == episode)
        });
        Ok(found.map(|e| Episode {
            show_id: show.id.clone(),
            season,
            episode,
            title: e.title.clone(),
        }))
    }

    async fn search_movie_by_title_year(&self, name: &str, year: i32) -> Result<Option<String>> {
        let wanted = normalize_title(name);
        Ok(self
            .catalog
            .movies
            .iter()
            .find(|m| m.year == Some(year) && normalize_title(&m.title) == wanted)
            .map(|m| m.id.clone()))
    }

    async fn search_show_by_title(&self, name: &str) -> Result<Option<String>> {
        let wanted = normalize_title(name);
        Ok(self
            .catalog
            .shows
            .iter()
            .find(|s| normalize_title(&s.show.title) == wanted)
            .map(|s| s.show.id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const CATALOG: &str = r#"{
        "movies": [
            { "id": "tt1234567", "title": "Some Movie", "year": 2020 },
            { "id": "tt7777777", "title": "Some Movie", "year": 1985 }
        ],
        "shows": [
            {
                "id": "tt7654321",
                "title": "The Thing",
                "episodes": [{ "season": 2, "episode": 5, "title": "Cold Open" }]
            }
        ]
    }"#;

    async fn catalog() -> LocalCatalog {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join(CATALOG_FILE), CATALOG).unwrap();
        LocalCatalog::load(tmp.path()).await.unwrap()
    }

    #[tokio::test]
    async fn test_missing_catalog_is_empty() {
        let tmp = TempDir::new().unwrap();
        let catalog = LocalCatalog::load(tmp.path()).await.unwrap();
        assert_eq!(catalog.catalog(), &Catalog::default());
        assert!(catalog.resolve_movie_by_id("tt1234567").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_malformed_catalog_fails() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join(CATALOG_FILE), "{ not json").unwrap();
        assert!(LocalCatalog::load(tmp.path()).await.is_err());
    }

    #[tokio::test]
    async fn test_resolve_by_id() {
        let catalog = catalog().await;
        let movie = catalog.resolve_movie_by_id("tt1234567").await.unwrap().unwrap();
        assert_eq!(movie.year, Some(2020));
        assert!(catalog.resolve_movie_by_id("tt7654321").await.unwrap().is_none());

        let show = catalog.resolve_show_by_id("tt7654321").await.unwrap().unwrap();
        let episode = catalog.resolve_episode(&show, 2, 5).await.unwrap().unwrap();
        assert_eq!(episode.title.as_deref(), Some("Cold Open"));
        assert!(catalog.resolve_episode(&show, 2, 6).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_title_search_folds_separators() {
        let catalog = catalog().await;
        assert_eq!(
            catalog.search_movie_by_title_year("some.movie", 1985).await.unwrap().as_deref(),
            Some("tt7777777")
        );
        assert_eq!(
            catalog.search_show_by_title("The_Thing").await.unwrap().as_deref(),
            Some("tt7654321")
        );
        assert!(catalog.search_movie_by_title_year("Some Movie", 1999).await.unwrap().is_none());
    }
}
