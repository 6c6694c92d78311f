//! Recommendations as produced by the scraper, and their enriched form.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::release::ReleaseType;

/// Kind of entity a recommendation points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecKind {
    Album,
    Track,
}

impl RecKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecKind::Album => "album",
            RecKind::Track => "track",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "album" => Some(RecKind::Album),
            "track" => Some(RecKind::Track),
            _ => None,
        }
    }
}

impl fmt::Display for RecKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why the history service recommended this entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecContext {
    /// The artist is already in the user's library.
    InLibrary,
    /// The artist is similar to artists the user listens to.
    SimilarArtist,
    #[default]
    NotSet,
}

/// A single scraped recommendation. Never mutated after scraping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub kind: RecKind,
    pub artist: String,
    /// Album title for album recommendations, track title for track recommendations.
    pub title: String,
    pub source_url: String,
    pub first_seen_at: DateTime<Utc>,
    #[serde(default)]
    pub context: RecContext,
}

impl Recommendation {
    pub fn new(kind: RecKind, artist: &str, title: &str) -> Self {
        Self {
            kind,
            artist: artist.to_string(),
            title: title.to_string(),
            source_url: String::new(),
            first_seen_at: Utc::now(),
            context: RecContext::NotSet,
        }
    }

    pub fn with_source_url(mut self, url: &str) -> Self {
        self.source_url = url.to_string();
        self
    }

    pub fn with_context(mut self, context: RecContext) -> Self {
        self.context = context;
        self
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}' by '{}'", self.kind, self.title, self.artist)
    }
}

/// Album a track recommendation was originally released on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginRelease {
    pub title: String,
    pub mbid: Option<String>,
}

/// A recommendation plus whatever the lookup services could tell us about it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedRecommendation {
    pub recommendation: Recommendation,
    pub release_mbid: Option<String>,
    pub release_year: Option<i32>,
    pub release_type: Option<ReleaseType>,
    pub record_label: Option<String>,
    pub catalog_number: Option<String>,
    pub origin_release: Option<OriginRelease>,
}

impl EnrichedRecommendation {
    pub fn new(recommendation: Recommendation) -> Self {
        Self {
            recommendation,
            release_mbid: None,
            release_year: None,
            release_type: None,
            record_label: None,
            catalog_number: None,
            origin_release: None,
        }
    }

    pub fn artist(&self) -> &str {
        &self.recommendation.artist
    }

    /// Title of the release to search the catalog for.
    ///
    /// For tracks this is the origin release; `None` means the track is unresolved
    /// and must not be searched.
    pub fn search_title(&self) -> Option<&str> {
        match self.recommendation.kind {
            RecKind::Album => Some(&self.recommendation.title),
            RecKind::Track => self.origin_release.as_ref().map(|o| o.title.as_str()),
        }
    }
}
