//! Lookup strategies tried in order by the resolver. The first hit wins.

use std::sync::Arc;

use async_trait::async_trait;

use crate::api_client::ApiError;
use crate::models::OriginRelease;
use crate::services::{HistoryService, RegistryService};

/// Facts one strategy learned that later strategies in the chain can use.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackHints {
    pub artist_mbid: Option<String>,
}

/// Finds the release a track recommendation first appeared on.
#[async_trait]
pub trait OriginStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn find_origin(
        &self,
        artist: &str,
        track: &str,
        hints: &mut TrackHints,
    ) -> Result<Option<OriginRelease>, ApiError>;
}

/// Finds the registry identifier of an album.
#[async_trait]
pub trait IdStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn find_release_mbid(&self, artist: &str, album: &str)
        -> Result<Option<String>, ApiError>;
}

// =============================================================================
// History service
// =============================================================================

pub struct HistoryTrackOrigin {
    history: Arc<dyn HistoryService>,
}

impl HistoryTrackOrigin {
    pub fn new(history: Arc<dyn HistoryService>) -> Self {
        Self { history }
    }
}

#[async_trait]
impl OriginStrategy for HistoryTrackOrigin {
    fn name(&self) -> &'static str {
        "lastfm track.getinfo"
    }

    async fn find_origin(
        &self,
        artist: &str,
        track: &str,
        hints: &mut TrackHints,
    ) -> Result<Option<OriginRelease>, ApiError> {
        let Some(info) = self.history.track_info(artist, track).await? else {
            return Ok(None);
        };
        if info.artist_mbid.is_some() {
            hints.artist_mbid = info.artist_mbid;
        }
        Ok(info.album_title.map(|title| OriginRelease {
            title,
            mbid: info.album_mbid,
        }))
    }
}

pub struct HistoryAlbumId {
    history: Arc<dyn HistoryService>,
}

impl HistoryAlbumId {
    pub fn new(history: Arc<dyn HistoryService>) -> Self {
        Self { history }
    }
}

#[async_trait]
impl IdStrategy for HistoryAlbumId {
    fn name(&self) -> &'static str {
        "lastfm album.getinfo"
    }

    async fn find_release_mbid(
        &self,
        artist: &str,
        album: &str,
    ) -> Result<Option<String>, ApiError> {
        let info = self.history.album_info(artist, album).await?;
        Ok(info.and_then(|i| i.release_mbid))
    }
}

// =============================================================================
// Metadata registry
// =============================================================================

pub struct RegistryRecordingOrigin {
    registry: Arc<dyn RegistryService>,
}

impl RegistryRecordingOrigin {
    pub fn new(registry: Arc<dyn RegistryService>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl OriginStrategy for RegistryRecordingOrigin {
    fn name(&self) -> &'static str {
        "musicbrainz recording search"
    }

    async fn find_origin(
        &self,
        artist: &str,
        track: &str,
        hints: &mut TrackHints,
    ) -> Result<Option<OriginRelease>, ApiError> {
        self.registry
            .origin_release_for_track(track, artist, hints.artist_mbid.as_deref())
            .await
    }
}

pub struct RegistryReleaseSearch {
    registry: Arc<dyn RegistryService>,
}

impl RegistryReleaseSearch {
    pub fn new(registry: Arc<dyn RegistryService>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl IdStrategy for RegistryReleaseSearch {
    fn name(&self) -> &'static str {
        "musicbrainz release search"
    }

    async fn find_release_mbid(
        &self,
        artist: &str,
        album: &str,
    ) -> Result<Option<String>, ApiError> {
        self.registry.search_release_mbid(artist, album).await
    }
}
