//! Last.fm API client.
//!
//! Last.fm reports most errors in the response body with HTTP 200, so every
//! body is checked before it is cached.

use async_trait::async_trait;
use serde::Deserialize;

use super::{non_empty, AlbumInfo, HistoryService, TrackInfo};
use crate::api_client::{ApiError, ApiRequest, ServiceKind, ThrottledClient};

pub const LASTFM_API_BASE: &str = "https://ws.audioscrobbler.com/2.0";

/// "The item you supplied could not be found".
const ERROR_NOT_FOUND: i64 = 6;
/// "The service is temporarily offline".
const ERROR_OFFLINE: i64 = 11;
/// "There was a temporary error processing your request".
const ERROR_TEMPORARY: i64 = 16;

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<i64>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Deserialize)]
struct AlbumInfoResponse {
    album: LfmAlbum,
}

#[derive(Deserialize)]
struct LfmAlbum {
    #[serde(default)]
    mbid: Option<String>,
}

#[derive(Deserialize)]
struct TrackInfoResponse {
    track: LfmTrack,
}

#[derive(Deserialize)]
struct LfmTrack {
    #[serde(default)]
    album: Option<LfmTrackAlbum>,
    #[serde(default)]
    artist: Option<LfmTrackArtist>,
}

#[derive(Deserialize)]
struct LfmTrackAlbum {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    mbid: Option<String>,
}

#[derive(Deserialize)]
struct LfmTrackArtist {
    #[serde(default)]
    mbid: Option<String>,
}

pub struct LastFmClient {
    client: ThrottledClient,
}

impl LastFmClient {
    /// The API key must already be configured on the client's transport.
    pub fn new(client: ThrottledClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ThrottledClient {
        &self.client
    }

    async fn request(
        &self,
        method: &str,
        artist: &str,
        field: &str,
        value: &str,
    ) -> Result<Option<Vec<u8>>, ApiError> {
        let request = ApiRequest::get("")
            .param("method", method)
            .param("artist", artist)
            .param(field, value)
            .param("format", "json");

        match self.client.call_with(&request, check_body).await {
            Ok(body) => Ok(Some(body)),
            Err(ApiError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

fn check_body(body: &[u8]) -> Result<(), ApiError> {
    let parsed: ErrorBody = serde_json::from_slice(body).map_err(|e| ApiError::Parse {
        service: ServiceKind::LastFm,
        cause: e.to_string(),
    })?;
    let Some(code) = parsed.error else {
        return Ok(());
    };

    let message = parsed.message.unwrap_or_default();
    match code {
        ERROR_NOT_FOUND => Err(ApiError::NotFound {
            service: ServiceKind::LastFm,
            path: message,
        }),
        ERROR_OFFLINE | ERROR_TEMPORARY => Err(ApiError::Transient {
            service: ServiceKind::LastFm,
            cause: format!("error {}: {}", code, message),
        }),
        _ => Err(ApiError::Rejected {
            service: ServiceKind::LastFm,
            path: String::new(),
            reason: format!("error {}: {}", code, message),
        }),
    }
}

#[async_trait]
impl HistoryService for LastFmClient {
    async fn album_info(&self, artist: &str, album: &str) -> Result<Option<AlbumInfo>, ApiError> {
        let Some(body) = self.request("album.getinfo", artist, "album", album).await? else {
            return Ok(None);
        };
        let response: AlbumInfoResponse = self.client.decode(&body)?;
        Ok(Some(AlbumInfo {
            release_mbid: non_empty(response.album.mbid),
        }))
    }

    async fn track_info(&self, artist: &str, track: &str) -> Result<Option<TrackInfo>, ApiError> {
        let Some(body) = self.request("track.getinfo", artist, "track", track).await? else {
            return Ok(None);
        };
        let response: TrackInfoResponse = self.client.decode(&body)?;
        let (album_title, album_mbid) = match response.track.album {
            Some(album) => (non_empty(album.title), non_empty(album.mbid)),
            None => (None, None),
        };
        Ok(Some(TrackInfo {
            album_title,
            album_mbid,
            artist_mbid: response.track.artist.and_then(|a| non_empty(a.mbid)),
        }))
    }
}
