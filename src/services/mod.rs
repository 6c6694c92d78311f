//! Clients for the three upstream services, behind the traits the engine uses.
//!
//! - [`HistoryService`]: the listening-history service (Last.fm)
//! - [`RegistryService`]: the metadata registry (MusicBrainz)
//! - [`CatalogService`]: the release tracker (RED)

mod lastfm;
mod musicbrainz;
mod red;

use async_trait::async_trait;

use crate::api_client::ApiError;
use crate::models::{OriginRelease, ReleaseType, UserDetails};

pub use lastfm::{LastFmClient, LASTFM_API_BASE};
pub use musicbrainz::{MusicBrainzClient, MUSICBRAINZ_API_BASE};
pub use red::{RedClient, RED_API_BASE};

// =============================================================================
// History service
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlbumInfo {
    pub release_mbid: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackInfo {
    pub album_title: Option<String>,
    pub album_mbid: Option<String>,
    pub artist_mbid: Option<String>,
}

#[async_trait]
pub trait HistoryService: Send + Sync {
    /// `Ok(None)` when the service does not know the album.
    async fn album_info(&self, artist: &str, album: &str) -> Result<Option<AlbumInfo>, ApiError>;

    /// `Ok(None)` when the service does not know the track.
    async fn track_info(&self, artist: &str, track: &str) -> Result<Option<TrackInfo>, ApiError>;
}

// =============================================================================
// Metadata registry
// =============================================================================

/// Release facts from the registry. Every field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseDetails {
    pub mbid: String,
    pub title: Option<String>,
    pub first_release_year: Option<i32>,
    pub release_type: Option<ReleaseType>,
    pub record_label: Option<String>,
    pub catalog_number: Option<String>,
}

#[async_trait]
pub trait RegistryService: Send + Sync {
    async fn release(&self, mbid: &str) -> Result<Option<ReleaseDetails>, ApiError>;

    async fn search_release_mbid(&self, artist: &str, album: &str)
        -> Result<Option<String>, ApiError>;

    /// Find the release a track first appeared on.
    ///
    /// Searches by artist MBID when one is known, by artist name otherwise.
    async fn origin_release_for_track(
        &self,
        track: &str,
        artist: &str,
        artist_mbid: Option<&str>,
    ) -> Result<Option<OriginRelease>, ApiError>;
}

// =============================================================================
// Release catalog
// =============================================================================

/// Query parameters for the catalog's browse endpoint, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BrowseQuery {
    pub params: Vec<(String, String)>,
}

impl BrowseQuery {
    pub fn push(&mut self, key: &str, value: impl ToString) {
        self.params.push((key.to_string(), value.to_string()));
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// One release group returned by a browse query.
#[derive(Debug, Clone, PartialEq)]
pub struct BrowseGroup {
    pub group_id: u64,
    pub group_name: String,
    pub artist: String,
    pub release_type: Option<String>,
    pub torrents: Vec<BrowseTorrent>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BrowseTorrent {
    pub torrent_id: u64,
    pub media: String,
    pub format: String,
    pub encoding: String,
    pub size: u64,
    pub seeders: u32,
    pub has_log: bool,
    pub log_score: i32,
    pub has_cue: bool,
    pub can_use_token: bool,
}

/// A downloaded torrent file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TorrentFile {
    pub bytes: Vec<u8>,
    pub used_token: bool,
}

#[async_trait]
pub trait CatalogService: Send + Sync {
    async fn browse(&self, query: &BrowseQuery) -> Result<Vec<BrowseGroup>, ApiError>;

    async fn user_details(&self) -> Result<UserDetails, ApiError>;

    /// Download a torrent file, spending a token when `use_token` is set.
    ///
    /// A failed token download falls back to a plain one.
    async fn download(&self, release_id: u64, use_token: bool) -> Result<TorrentFile, ApiError>;
}

/// Extract a four digit year from the start of a registry date ("2002-02-18", "1998").
pub(crate) fn parse_year(date: &str) -> Option<i32> {
    let prefix = date.get(..4)?;
    if prefix.chars().all(|c| c.is_ascii_digit()) {
        prefix.parse().ok()
    } else {
        None
    }
}

/// Treat empty strings from upstream JSON as missing.
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}
