//! In-memory upstream services
//!
//! Each fake records the calls it receives so tests can assert on what was
//! (or was not) asked of the upstream service.

use async_trait::async_trait;
use recsnatch::api_client::ApiError;
use recsnatch::models::{OriginRelease, UserDetails};
use recsnatch::services::{
    AlbumInfo, BrowseGroup, BrowseQuery, BrowseTorrent, CatalogService, HistoryService,
    RegistryService, ReleaseDetails, TorrentFile, TrackInfo,
};
use std::collections::HashMap;
use std::sync::Mutex;

// =============================================================================
// History service
// =============================================================================

#[derive(Default)]
pub struct FakeHistory {
    albums: HashMap<String, AlbumInfo>,
    tracks: HashMap<String, TrackInfo>,
    error: Option<ApiError>,
    calls: Mutex<Vec<String>>,
}

impl FakeHistory {
    pub fn with_album(mut self, album: &str, mbid: &str) -> Self {
        self.albums.insert(
            album.to_string(),
            AlbumInfo {
                release_mbid: Some(mbid.to_string()),
            },
        );
        self
    }

    pub fn with_track(mut self, track: &str, info: TrackInfo) -> Self {
        self.tracks.insert(track.to_string(), info);
        self
    }

    pub fn failing_with(mut self, error: ApiError) -> Self {
        self.error = Some(error);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl HistoryService for FakeHistory {
    async fn album_info(&self, _artist: &str, album: &str) -> Result<Option<AlbumInfo>, ApiError> {
        self.calls.lock().unwrap().push(format!("album.getinfo {}", album));
        if let Some(e) = &self.error {
            return Err(e.clone());
        }
        Ok(self.albums.get(album).cloned())
    }

    async fn track_info(&self, _artist: &str, track: &str) -> Result<Option<TrackInfo>, ApiError> {
        self.calls.lock().unwrap().push(format!("track.getinfo {}", track));
        if let Some(e) = &self.error {
            return Err(e.clone());
        }
        Ok(self.tracks.get(track).cloned())
    }
}

// =============================================================================
// Metadata registry
// =============================================================================

#[derive(Default)]
pub struct FakeRegistry {
    releases: HashMap<String, ReleaseDetails>,
    origins: HashMap<String, OriginRelease>,
    calls: Mutex<Vec<String>>,
}

impl FakeRegistry {
    pub fn with_release(mut self, details: ReleaseDetails) -> Self {
        self.releases.insert(details.mbid.clone(), details);
        self
    }

    pub fn with_origin(mut self, track: &str, origin: OriginRelease) -> Self {
        self.origins.insert(track.to_string(), origin);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl RegistryService for FakeRegistry {
    async fn release(&self, mbid: &str) -> Result<Option<ReleaseDetails>, ApiError> {
        self.calls.lock().unwrap().push(format!("release {}", mbid));
        Ok(self.releases.get(mbid).cloned())
    }

    async fn search_release_mbid(
        &self,
        _artist: &str,
        album: &str,
    ) -> Result<Option<String>, ApiError> {
        self.calls.lock().unwrap().push(format!("release search {}", album));
        Ok(self
            .releases
            .values()
            .find(|r| r.title.as_deref() == Some(album))
            .map(|r| r.mbid.clone()))
    }

    async fn origin_release_for_track(
        &self,
        track: &str,
        _artist: &str,
        artist_mbid: Option<&str>,
    ) -> Result<Option<OriginRelease>, ApiError> {
        self.calls.lock().unwrap().push(format!(
            "recording search {} arid={}",
            track,
            artist_mbid.unwrap_or("-")
        ));
        Ok(self.origins.get(track).cloned())
    }
}

// =============================================================================
// Release catalog
// =============================================================================

/// Catalog that answers browse queries by group name, and by media when the
/// query names one.
#[derive(Default)]
pub struct FakeCatalog {
    groups: Vec<BrowseGroup>,
    user: UserDetails,
    user_error: Option<ApiError>,
    browse_error: Option<ApiError>,
    download_errors: HashMap<u64, ApiError>,
    queries: Mutex<Vec<BrowseQuery>>,
    downloads: Mutex<Vec<(u64, bool)>>,
}

impl FakeCatalog {
    pub fn with_group(mut self, group: BrowseGroup) -> Self {
        self.groups.push(group);
        self
    }

    pub fn with_user(mut self, user: UserDetails) -> Self {
        self.user = user;
        self
    }

    pub fn with_user_error(mut self, error: ApiError) -> Self {
        self.user_error = Some(error);
        self
    }

    pub fn with_browse_error(mut self, error: ApiError) -> Self {
        self.browse_error = Some(error);
        self
    }

    pub fn with_download_error(mut self, torrent_id: u64, error: ApiError) -> Self {
        self.download_errors.insert(torrent_id, error);
        self
    }

    pub fn queries(&self) -> Vec<BrowseQuery> {
        self.queries.lock().unwrap().clone()
    }

    /// `(torrent id, token requested)` for each download call, in order.
    pub fn downloads(&self) -> Vec<(u64, bool)> {
        self.downloads.lock().unwrap().clone()
    }
}

pub fn torrent_bytes(torrent_id: u64) -> Vec<u8> {
    format!("d8:announce{}e", torrent_id).into_bytes()
}

#[async_trait]
impl CatalogService for FakeCatalog {
    async fn browse(&self, query: &BrowseQuery) -> Result<Vec<BrowseGroup>, ApiError> {
        self.queries.lock().unwrap().push(query.clone());
        if let Some(e) = &self.browse_error {
            return Err(e.clone());
        }
        let group_name = query.get("groupname").unwrap_or_default();
        let media = query.get("media");
        Ok(self
            .groups
            .iter()
            .filter(|g| g.group_name.eq_ignore_ascii_case(group_name))
            .filter_map(|g| {
                let torrents: Vec<BrowseTorrent> = g
                    .torrents
                    .iter()
                    .filter(|t| media.map_or(true, |m| t.media == m))
                    .cloned()
                    .collect();
                (!torrents.is_empty()).then(|| BrowseGroup {
                    torrents,
                    ..g.clone()
                })
            })
            .collect())
    }

    async fn user_details(&self) -> Result<UserDetails, ApiError> {
        match &self.user_error {
            Some(e) => Err(e.clone()),
            None => Ok(self.user.clone()),
        }
    }

    async fn download(&self, release_id: u64, use_token: bool) -> Result<TorrentFile, ApiError> {
        self.downloads.lock().unwrap().push((release_id, use_token));
        if let Some(e) = self.download_errors.get(&release_id) {
            return Err(e.clone());
        }
        Ok(TorrentFile {
            bytes: torrent_bytes(release_id),
            used_token: use_token,
        })
    }
}
