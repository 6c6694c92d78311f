//! RED tracker API client: browse, user details and torrent downloads.
//!
//! Every endpoint lives under `ajax.php?action=<name>` and wraps its payload in
//! a `{"status": ..., "response": ...}` envelope.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use tracing::{debug, info, warn};

use super::{BrowseGroup, BrowseQuery, BrowseTorrent, CatalogService, TorrentFile};
use crate::api_client::{ApiError, ApiRequest, ServiceKind, ThrottledClient};
use crate::models::{PriorSnatches, UserDetails};

pub const RED_API_BASE: &str = "https://redacted.sh";
const AJAX_PATH: &str = "ajax.php";

#[derive(Deserialize)]
struct Envelope<T> {
    status: String,
    response: Option<T>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct BrowseResponse {
    #[serde(default)]
    results: Vec<BrowseResult>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BrowseResult {
    group_id: u64,
    #[serde(default)]
    group_name: String,
    #[serde(default)]
    artist: String,
    #[serde(default)]
    release_type: Option<String>,
    #[serde(default)]
    torrents: Vec<BrowseResultTorrent>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BrowseResultTorrent {
    torrent_id: u64,
    #[serde(default)]
    media: String,
    #[serde(default)]
    format: String,
    #[serde(default)]
    encoding: String,
    #[serde(default)]
    size: u64,
    #[serde(default)]
    seeders: u32,
    #[serde(default)]
    has_log: bool,
    #[serde(default)]
    log_score: i32,
    #[serde(default)]
    has_cue: bool,
    #[serde(default)]
    can_use_token: bool,
}

#[derive(Deserialize)]
struct UserProfile {
    stats: UserStats,
    #[serde(default)]
    personal: UserPersonal,
}

#[derive(Deserialize)]
struct UserStats {
    #[serde(default, deserialize_with = "flexible_u64")]
    uploaded: u64,
    #[serde(default, deserialize_with = "flexible_u64")]
    downloaded: u64,
    #[serde(default, deserialize_with = "flexible_f64")]
    ratio: Option<f64>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct UserPersonal {
    #[serde(default, deserialize_with = "flexible_u64")]
    gift_tokens: u64,
    #[serde(default, deserialize_with = "flexible_u64")]
    merit_tokens: u64,
}

#[derive(Deserialize)]
struct CommunityStats {
    #[serde(default, deserialize_with = "flexible_u64")]
    snatched: u64,
    #[serde(default, deserialize_with = "flexible_u64")]
    seeding: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserTorrent {
    group_id: u64,
    torrent_id: u64,
    #[serde(default)]
    name: String,
    #[serde(default)]
    artist_name: String,
}

/// Counts come back as numbers or as strings with thousands separators ("1,234").
fn flexible_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().map(|f| f.max(0.0) as u64))
            .unwrap_or(0),
        serde_json::Value::String(s) => s.replace(',', "").trim().parse().unwrap_or(0),
        _ => 0,
    })
}

fn flexible_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.replace(',', "").trim().parse().ok(),
        _ => None,
    })
}

fn check_envelope(body: &[u8]) -> Result<(), ApiError> {
    let envelope: Envelope<serde::de::IgnoredAny> =
        serde_json::from_slice(body).map_err(|e| ApiError::Parse {
            service: ServiceKind::Red,
            cause: e.to_string(),
        })?;
    if envelope.status == "success" {
        Ok(())
    } else {
        Err(ApiError::Rejected {
            service: ServiceKind::Red,
            path: AJAX_PATH.to_string(),
            reason: envelope.error.unwrap_or(envelope.status),
        })
    }
}

/// A torrent download answers with a JSON failure envelope instead of a file
/// when something is wrong (for instance no tokens left).
fn check_torrent(body: &[u8]) -> Result<(), ApiError> {
    match serde_json::from_slice::<Envelope<serde::de::IgnoredAny>>(body) {
        Ok(envelope) if envelope.status != "success" => Err(ApiError::Rejected {
            service: ServiceKind::Red,
            path: AJAX_PATH.to_string(),
            reason: envelope.error.unwrap_or(envelope.status),
        }),
        _ if body.is_empty() => Err(ApiError::Parse {
            service: ServiceKind::Red,
            cause: "empty torrent file".to_string(),
        }),
        _ => Ok(()),
    }
}

pub struct RedClient {
    client: ThrottledClient,
    user_id: u64,
}

impl RedClient {
    /// The API key must already be configured as the transport's
    /// `Authorization` header.
    pub fn new(client: ThrottledClient, user_id: u64) -> Self {
        Self { client, user_id }
    }

    pub fn client(&self) -> &ThrottledClient {
        &self.client
    }

    fn action(action: &str) -> ApiRequest {
        ApiRequest::get(AJAX_PATH).param("action", action)
    }

    async fn get<T: DeserializeOwned>(&self, request: &ApiRequest) -> Result<T, ApiError> {
        let body = self.client.call_with(request, check_envelope).await?;
        let envelope: Envelope<T> = self.client.decode(&body)?;
        envelope.response.ok_or_else(|| ApiError::Parse {
            service: ServiceKind::Red,
            cause: format!("missing response for {}", request),
        })
    }

    async fn user_torrents(&self, kind: &str, count: u64) -> Result<Vec<UserTorrent>, ApiError> {
        if count == 0 {
            return Ok(Vec::new());
        }
        let request = Self::action("user_torrents")
            .param("id", self.user_id)
            .param("type", kind)
            .param("limit", count)
            .param("offset", 0)
            .uncached();
        let mut response: HashMap<String, Vec<UserTorrent>> = self.get(&request).await?;
        Ok(response.remove(kind).unwrap_or_default())
    }
}

#[async_trait]
impl CatalogService for RedClient {
    async fn browse(&self, query: &BrowseQuery) -> Result<Vec<BrowseGroup>, ApiError> {
        let mut request = Self::action("browse");
        for (key, value) in &query.params {
            request = request.param(key, value);
        }
        let response: BrowseResponse = self.get(&request).await?;
        debug!("RED browse returned {} group(s)", response.results.len());

        Ok(response
            .results
            .into_iter()
            .map(|group| BrowseGroup {
                group_id: group.group_id,
                group_name: group.group_name,
                artist: group.artist,
                release_type: group.release_type,
                torrents: group
                    .torrents
                    .into_iter()
                    .map(|t| BrowseTorrent {
                        torrent_id: t.torrent_id,
                        media: t.media,
                        format: t.format,
                        encoding: t.encoding,
                        size: t.size,
                        seeders: t.seeders,
                        has_log: t.has_log,
                        log_score: t.log_score,
                        has_cue: t.has_cue,
                        can_use_token: t.can_use_token,
                    })
                    .collect(),
            })
            .collect())
    }

    async fn user_details(&self) -> Result<UserDetails, ApiError> {
        let profile: UserProfile = self
            .get(&Self::action("user").param("id", self.user_id).uncached())
            .await?;
        let counts: CommunityStats = self
            .get(
                &Self::action("community_stats")
                    .param("userid", self.user_id)
                    .uncached(),
            )
            .await?;

        let mut prior_snatches = PriorSnatches::default();
        for (kind, count) in [("snatched", counts.snatched), ("seeding", counts.seeding)] {
            for entry in self.user_torrents(kind, count).await? {
                prior_snatches.insert(
                    entry.torrent_id,
                    entry.group_id,
                    &entry.artist_name,
                    &entry.name,
                );
            }
        }

        let stats = profile.stats;
        let ratio = stats.ratio.unwrap_or_else(|| {
            if stats.downloaded == 0 {
                0.0
            } else {
                stats.uploaded as f64 / stats.downloaded as f64
            }
        });
        let available_tokens =
            token_count(profile.personal.gift_tokens, profile.personal.merit_tokens);

        info!(
            "RED user {}: ratio {:.2}, {} token(s), {} prior snatch(es)",
            self.user_id,
            ratio,
            available_tokens,
            prior_snatches.len()
        );
        Ok(UserDetails {
            user_id: self.user_id,
            uploaded_bytes: stats.uploaded,
            downloaded_bytes: stats.downloaded,
            ratio,
            available_tokens,
            prior_snatches,
        })
    }

    async fn download(&self, release_id: u64, use_token: bool) -> Result<TorrentFile, ApiError> {
        let request = Self::action("download").param("id", release_id).uncached();

        if use_token {
            let token_request = request.clone().param("usetoken", 1);
            let attempt = self
                .client
                .call_once(&token_request)
                .await
                .and_then(|body| check_torrent(&body).map(|_| body));
            match attempt {
                Ok(bytes) => {
                    return Ok(TorrentFile {
                        bytes,
                        used_token: true,
                    })
                }
                Err(e) => {
                    warn!(
                        "Token download of {} failed, falling back to a plain download: {}",
                        release_id, e
                    );
                }
            }
        }

        let bytes = self.client.call_with(&request, check_torrent).await?;
        Ok(TorrentFile {
            bytes,
            used_token: false,
        })
    }
}

/// Gift plus merit tokens, saturating at `u32::MAX`.
fn token_count(gift_tokens: u64, merit_tokens: u64) -> u32 {
    u32::try_from(gift_tokens.saturating_add(merit_tokens)).unwrap_or(u32::MAX)
}
