// src/models/media.rs

//! Canonical media identities.

use serde::{Deserialize, Serialize};

/// A movie known to the media resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movie {
    /// External identifier (IMDb id)
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub year: Option<i32>,
}

/// A show known to the media resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Show {
    /// External identifier (IMDb id)
    pub id: String,
    pub title: String,
}

/// A single episode of a show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Episode {
    pub show_id: String,
    pub season: u32,
    pub episode: u32,
    #[serde(default)]
    pub title: Option<String>,
}

/// What a torrent is a copy of.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MediaReference {
    Movie(Movie),
    Episode { show: Show, episode: Episode },
}

impl MediaReference {
    /// External identifier of the movie or the episode's show.
    pub fn external_id(&self) -> &str {
        match self {
            MediaReference::Movie(movie) => &movie.id,
            MediaReference::Episode { show, .. } => &show.id,
        }
    }
}
