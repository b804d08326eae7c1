// src/services/title.rs

//! Title-based media identification.
//!
//! Used when a topic page carries no external identifier: the headline is
//! classified as a movie or a serial and the extracted name is searched.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::Result;
use crate::services::MediaResolver;

static EPISODE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"S\d\dE\d\d").expect("valid episode marker"));
static PAREN_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\((\d{4})\)").expect("valid year pattern"));
static SHOW_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*?)(?:S\d\d|Season \d)").expect("valid show pattern"));
static MOVIE_PAREN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*)\((\d{4})").expect("valid movie pattern"));
static MOVIE_BARE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*?) (\d{4})").expect("valid movie pattern"));

/// What a topic title looks like.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TitleClass {
    Serial { show_name: String },
    Movie { name: String, year: i32 },
    /// Nothing usable could be extracted
    Unresolvable,
}

/// Classify a raw topic title.
///
/// Dots count as spaces. A title mentioning a season, an `S##E##` marker or
/// lacking a `(YYYY)` year is treated as a serial; if no season marker can be
/// located for the show name, the movie patterns are tried instead.
pub fn classify(raw_title: &str) -> TitleClass {
    let title = raw_title.replace('.', " ");

    let is_serial = title.to_lowercase().contains("season")
        || EPISODE_MARKER.is_match(&title)
        || !PAREN_YEAR.is_match(&title);

    if is_serial {
        if let Some(caps) = SHOW_NAME.captures(&title) {
            let show_name = caps[1].trim().to_string();
            if !show_name.is_empty() {
                return TitleClass::Serial { show_name };
            }
        }
    }

    let caps = MOVIE_PAREN
        .captures(&title)
        .or_else(|| MOVIE_BARE.captures(&title));
    match caps {
        Some(caps) => {
            let name = caps[1].trim().to_string();
            match caps[2].parse() {
                Ok(year) if !name.is_empty() => TitleClass::Movie { name, year },
                _ => TitleClass::Unresolvable,
            }
        }
        None => TitleClass::Unresolvable,
    }
}

/// Find an external identifier for a title through the resolver's searches.
pub async fn resolve_identifier(
    raw_title: &str,
    resolver: &dyn MediaResolver,
) -> Result<Option<String>> {
    match classify(raw_title) {
        TitleClass::Serial { show_name } => {
            log::debug!("Searching show '{}' for '{}'", show_name, raw_title);
            resolver.search_show_by_title(&show_name).await
        }
        TitleClass::Movie { name, year } => {
            log::debug!("Searching movie '{}' ({}) for '{}'", name, year, raw_title);
            resolver.search_movie_by_title_year(&name, year).await
        }
        TitleClass::Unresolvable => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::StubResolver;

    #[test]
    fn test_episode_title_is_serial() {
        assert_eq!(
            classify("The.Thing.S02E05.720p"),
            TitleClass::Serial {
                show_name: "The Thing".into()
            }
        );
    }

    #[test]
    fn test_season_pack_is_serial() {
        assert_eq!(
            classify("Dark Season 2 Complete 1080p"),
            TitleClass::Serial {
                show_name: "Dark".into()
            }
        );
    }

    #[test]
    fn test_parenthesized_year_is_movie() {
        assert_eq!(
            classify("Some.Movie.(2020).1080p"),
            TitleClass::Movie {
                name: "Some Movie".into(),
                year: 2020
            }
        );
    }

    #[test]
    fn test_bare_year_falls_back_to_movie() {
        assert_eq!(
            classify("Some.Movie.2020.1080p"),
            TitleClass::Movie {
                name: "Some Movie".into(),
                year: 2020
            }
        );
    }

    #[test]
    fn test_numeric_title_with_year() {
        assert_eq!(
            classify("1917 2019 BluRay"),
            TitleClass::Movie {
                name: "1917".into(),
                year: 2019
            }
        );
    }

    #[test]
    fn test_title_without_year_or_marker_is_unresolvable() {
        assert_eq!(classify("Some Collection WEBRip"), TitleClass::Unresolvable);
    }

    #[tokio::test]
    async fn test_resolve_identifier_uses_matching_search() {
        let resolver = StubResolver::default()
            .with_show("tt0000001", "The Thing")
            .with_movie("tt0000002", "Some Movie", 2020);

        let show = resolve_identifier("The.Thing.S02E05.720p", &resolver)
            .await
            .unwrap();
        assert_eq!(show.as_deref(), Some("tt0000001"));

        let movie = resolve_identifier("Some.Movie.2020.1080p", &resolver)
            .await
            .unwrap();
        assert_eq!(movie.as_deref(), Some("tt0000002"));

        let missing = resolve_identifier("Unknown Film (1999)", &resolver)
            .await
            .unwrap();
        assert_eq!(missing, None);
    }
}
