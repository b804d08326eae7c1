// src/models/torrent.rs

//! Torrent record structures.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::MediaReference;

/// Coarse resolution class of a release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum Quality {
    #[default]
    #[serde(rename = "unknown")]
    Unknown,
    #[serde(rename = "480p")]
    Sd480,
    #[serde(rename = "720p")]
    Hd720,
    #[serde(rename = "1080p")]
    Hd1080,
    #[serde(rename = "2160p")]
    Uhd2160,
}

/// Quality tokens, highest tier first. Matching is case-insensitive.
const QUALITY_TOKENS: &[(&str, Quality)] = &[
    ("2160p", Quality::Uhd2160),
    ("4k", Quality::Uhd2160),
    ("uhd", Quality::Uhd2160),
    ("1080p", Quality::Hd1080),
    ("1080i", Quality::Hd1080),
    ("720p", Quality::Hd720),
    ("480p", Quality::Sd480),
    ("dvdrip", Quality::Sd480),
];

impl Quality {
    /// Scan free text for the best quality token it mentions.
    pub fn detect(text: &str) -> Self {
        let lower = text.to_lowercase();
        QUALITY_TOKENS
            .iter()
            .find(|(token, _)| contains_word(&lower, token))
            .map_or(Quality::Unknown, |(_, quality)| *quality)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Quality::Unknown => "unknown",
            Quality::Sd480 => "480p",
            Quality::Hd720 => "720p",
            Quality::Hd1080 => "1080p",
            Quality::Uhd2160 => "2160p",
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// True when `token` occurs in `haystack` not glued to other alphanumerics.
fn contains_word(haystack: &str, token: &str) -> bool {
    haystack.match_indices(token).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + token.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

/// Language names as shown on topic pages, mapped to ISO 639-1.
const LANGUAGE_TABLE: &[(&str, &str)] = &[
    ("arabic", "ar"),
    ("chinese", "zh"),
    ("czech", "cs"),
    ("danish", "da"),
    ("dutch", "nl"),
    ("english", "en"),
    ("finnish", "fi"),
    ("french", "fr"),
    ("german", "de"),
    ("greek", "el"),
    ("hindi", "hi"),
    ("hungarian", "hu"),
    ("italian", "it"),
    ("japanese", "ja"),
    ("korean", "ko"),
    ("norwegian", "no"),
    ("polish", "pl"),
    ("portuguese", "pt"),
    ("romanian", "ro"),
    ("russian", "ru"),
    ("spanish", "es"),
    ("swedish", "sv"),
    ("thai", "th"),
    ("turkish", "tr"),
    ("ukrainian", "uk"),
];

/// Torrent audio language.
///
/// Labels missing from the lookup table are kept verbatim as `Unmapped` so
/// they are never mistaken for a validated code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Language {
    Iso(String),
    Unmapped(String),
}

impl Language {
    /// Map a language label (e.g. "English") through the lookup table.
    pub fn from_label(label: &str) -> Self {
        let label = label.trim();
        let key = label.to_lowercase();
        LANGUAGE_TABLE
            .iter()
            .find(|(name, _)| *name == key)
            .map_or_else(
                || Language::Unmapped(label.to_string()),
                |(_, code)| Language::Iso((*code).to_string()),
            )
    }

    pub fn is_mapped(&self) -> bool {
        matches!(self, Language::Iso(_))
    }
}

/// One file inside a torrent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// `/`-separated path relative to the torrent root
    pub path: String,
    pub size_bytes: u64,
}

/// A fully extracted torrent, ready to hand to storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedTorrent {
    pub title: String,
    pub external_media_id: Option<String>,
    pub quality: Quality,
    pub language: Option<Language>,
    pub magnet_uri: String,
    pub seed: u32,
    /// Seeders plus leechers
    pub peer: u64,
    pub files: Vec<FileEntry>,
}

impl ParsedTorrent {
    /// Build a torrent record; `peer` is always `seed + leech`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        title: String,
        external_media_id: Option<String>,
        quality: Quality,
        language: Option<Language>,
        magnet_uri: String,
        seed: u32,
        leech: u32,
        files: Vec<FileEntry>,
    ) -> Self {
        Self {
            title,
            external_media_id,
            quality,
            language,
            magnet_uri,
            seed,
            peer: u64::from(seed) + u64::from(leech),
            files,
        }
    }

    /// Sum of all file sizes.
    pub fn total_size(&self) -> u64 {
        self.files.iter().map(|f| f.size_bytes).sum()
    }
}

/// Storage-side identity of a torrent, returned by find-or-create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TorrentHandle {
    pub id: u64,
    pub site: String,
    pub topic_id: String,
    pub media: MediaReference,
}
