//! MusicBrainz API client for release details and origin-release lookups.
//!
//! MusicBrainz asks for at most one request per second and a descriptive
//! user agent; both are set up by whoever builds the underlying client.

use async_trait::async_trait;
use serde::Deserialize;

use super::{non_empty, parse_year, RegistryService, ReleaseDetails};
use crate::api_client::{ApiError, ApiRequest, ThrottledClient};
use crate::models::{OriginRelease, ReleaseType};

pub const MUSICBRAINZ_API_BASE: &str = "https://musicbrainz.org/ws/2";

const RELEASE_INCLUDES: &str = "artist-credits+media+labels+release-groups";

/// Minimum search score for a release search hit to be trusted.
const MIN_SEARCH_SCORE: u32 = 90;

#[derive(Deserialize)]
struct MbRelease {
    id: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    date: Option<String>,
    #[serde(rename = "label-info", default)]
    label_info: Vec<MbLabelInfo>,
    #[serde(rename = "release-group", default)]
    release_group: Option<MbReleaseGroup>,
}

#[derive(Deserialize)]
struct MbLabelInfo {
    #[serde(rename = "catalog-number", default)]
    catalog_number: Option<String>,
    #[serde(default)]
    label: Option<MbLabel>,
}

#[derive(Deserialize)]
struct MbLabel {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Deserialize)]
struct MbReleaseGroup {
    #[serde(rename = "first-release-date", default)]
    first_release_date: Option<String>,
    #[serde(rename = "primary-type", default)]
    primary_type: Option<String>,
    #[serde(rename = "secondary-types", default)]
    secondary_types: Vec<String>,
}

#[derive(Deserialize)]
struct ReleaseSearchResponse {
    #[serde(default)]
    releases: Vec<ReleaseSearchHit>,
}

#[derive(Deserialize)]
struct ReleaseSearchHit {
    id: String,
    #[serde(default)]
    score: u32,
}

#[derive(Deserialize)]
struct RecordingSearchResponse {
    #[serde(default)]
    recordings: Vec<MbRecording>,
}

#[derive(Deserialize)]
struct MbRecording {
    #[serde(default)]
    releases: Vec<MbRecordingRelease>,
}

#[derive(Deserialize)]
struct MbRecordingRelease {
    id: String,
    #[serde(default)]
    title: Option<String>,
}

pub struct MusicBrainzClient {
    client: ThrottledClient,
}

impl MusicBrainzClient {
    pub fn new(client: ThrottledClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ThrottledClient {
        &self.client
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        request: ApiRequest,
    ) -> Result<Option<T>, ApiError> {
        match self.client.call_json(&request.param("fmt", "json")).await {
            Ok(value) => Ok(Some(value)),
            Err(ApiError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Quote a value for a Lucene search query.
fn quoted(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

fn release_type_of(group: &MbReleaseGroup) -> Option<ReleaseType> {
    // A live album or soundtrack is "Album" plus a secondary type.
    group
        .secondary_types
        .iter()
        .find_map(|t| ReleaseType::from_registry_type(t))
        .or_else(|| {
            group
                .primary_type
                .as_deref()
                .and_then(ReleaseType::from_registry_type)
        })
}

#[async_trait]
impl RegistryService for MusicBrainzClient {
    async fn release(&self, mbid: &str) -> Result<Option<ReleaseDetails>, ApiError> {
        let request = ApiRequest::get(&format!("release/{}", mbid)).param("inc", RELEASE_INCLUDES);
        let Some(release) = self.get_json::<MbRelease>(request).await? else {
            return Ok(None);
        };

        let first_label = release.label_info.into_iter().next();
        let (record_label, catalog_number) = match first_label {
            Some(info) => (
                non_empty(info.label.and_then(|l| l.name)),
                non_empty(info.catalog_number),
            ),
            None => (None, None),
        };
        let first_release_year = release
            .release_group
            .as_ref()
            .and_then(|g| g.first_release_date.as_deref())
            .and_then(parse_year)
            .or_else(|| release.date.as_deref().and_then(parse_year));

        Ok(Some(ReleaseDetails {
            mbid: release.id,
            title: non_empty(release.title),
            first_release_year,
            release_type: release.release_group.as_ref().and_then(release_type_of),
            record_label,
            catalog_number,
        }))
    }

    async fn search_release_mbid(
        &self,
        artist: &str,
        album: &str,
    ) -> Result<Option<String>, ApiError> {
        let query = format!("release:{} AND artist:{}", quoted(album), quoted(artist));
        let request = ApiRequest::get("release")
            .param("query", query)
            .param("limit", 1);
        let Some(response) = self.get_json::<ReleaseSearchResponse>(request).await? else {
            return Ok(None);
        };

        Ok(response
            .releases
            .into_iter()
            .find(|hit| hit.score >= MIN_SEARCH_SCORE)
            .map(|hit| hit.id))
    }

    async fn origin_release_for_track(
        &self,
        track: &str,
        artist: &str,
        artist_mbid: Option<&str>,
    ) -> Result<Option<OriginRelease>, ApiError> {
        let artist_clause = match artist_mbid {
            Some(mbid) => format!("arid:{}", mbid),
            None => format!("artist:{}", quoted(artist)),
        };
        let query = format!("recording:{} AND {}", quoted(track), artist_clause);
        let request = ApiRequest::get("recording")
            .param("query", query)
            .param("limit", 1);
        let Some(response) = self.get_json::<RecordingSearchResponse>(request).await? else {
            return Ok(None);
        };

        let release = response
            .recordings
            .into_iter()
            .next()
            .and_then(|r| r.releases.into_iter().next());
        Ok(release.and_then(|r| {
            non_empty(r.title).map(|title| OriginRelease {
                title,
                mbid: Some(r.id),
            })
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api_client::fake::FakeTransport;
    use crate::api_client::{RateLimitGate, RetryPolicy, ServiceKind};
    use std::sync::Arc;
    use std::time::Duration;

    const GEOGADDI: &str = r#"{
        "id": "f2ba5a4b-4d3a-4c43-ae4a-d3c6c1a8b56a",
        "title": "Geogaddi",
        "date": "2002-02-18",
        "label-info": [
            {"catalog-number": "WARPCD101", "label": {"name": "Warp Records"}},
            {"catalog-number": "MUSIC70", "label": {"name": "Music70"}}
        ],
        "release-group": {"first-release-date": "2002-02-18", "primary-type": "Album", "secondary-types": []}
    }"#;

    fn musicbrainz(transport: Arc<FakeTransport>) -> MusicBrainzClient {
        let gate = Arc::new(RateLimitGate::new(
            ServiceKind::MusicBrainz,
            Duration::from_secs(1),
        ));
        MusicBrainzClient::new(ThrottledClient::new(
            ServiceKind::MusicBrainz,
            transport,
            gate,
            RetryPolicy::new(2),
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn test_release_details() {
        let transport = Arc::new(FakeTransport::new());
        transport.push_ok(GEOGADDI);
        let client = musicbrainz(transport.clone());

        let details = client
            .release("f2ba5a4b-4d3a-4c43-ae4a-d3c6c1a8b56a")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(details.title.as_deref(), Some("Geogaddi"));
        assert_eq!(details.first_release_year, Some(2002));
        assert_eq!(details.release_type, Some(ReleaseType::Album));
        assert_eq!(details.record_label.as_deref(), Some("Warp Records"));
        assert_eq!(details.catalog_number.as_deref(), Some("WARPCD101"));

        let request = &transport.requests()[0];
        assert_eq!(request.path, "release/f2ba5a4b-4d3a-4c43-ae4a-d3c6c1a8b56a");
        assert_eq!(request.query_value("inc"), Some(RELEASE_INCLUDES));
        assert_eq!(request.query_value("fmt"), Some("json"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_release_secondary_type_wins() {
        let transport = Arc::new(FakeTransport::new());
        transport.push_ok(
            r#"{"id":"m","release-group":{"first-release-date":"1996","primary-type":"Album","secondary-types":["Live"]}}"#,
        );
        let client = musicbrainz(transport);

        let details = client.release("m").await.unwrap().unwrap();
        assert_eq!(details.release_type, Some(ReleaseType::LiveAlbum));
        assert_eq!(details.first_release_year, Some(1996));
        assert_eq!(details.record_label, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_release_is_a_miss() {
        let transport = Arc::new(FakeTransport::new());
        transport.push_status(404);
        let client = musicbrainz(transport);

        assert_eq!(client.release("nope").await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_release_requires_high_score() {
        let transport = Arc::new(FakeTransport::new());
        transport.push_ok(r#"{"releases":[{"id":"weak","score":55}]}"#);
        transport.push_ok(r#"{"releases":[{"id":"strong","score":100}]}"#);
        let client = musicbrainz(transport.clone());

        assert_eq!(client.search_release_mbid("a", "b").await.unwrap(), None);
        assert_eq!(
            client.search_release_mbid("a", "c").await.unwrap().as_deref(),
            Some("strong")
        );
        assert_eq!(
            transport.requests()[0].query_value("query"),
            Some(r#"release:"b" AND artist:"a""#)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_origin_release_by_artist_mbid() {
        let transport = Arc::new(FakeTransport::new());
        transport.push_ok(
            r#"{"recordings":[{"id":"r1","title":"Roygbiv","releases":[
                {"id":"rel-1","title":"Music Has the Right to Children"},
                {"id":"rel-2","title":"Warp 10+3"}]}]}"#,
        );
        let client = musicbrainz(transport.clone());

        let origin = client
            .origin_release_for_track("Roygbiv", "Boards of Canada", Some("arid-1"))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(origin.title, "Music Has the Right to Children");
        assert_eq!(origin.mbid.as_deref(), Some("rel-1"));
        assert_eq!(
            transport.requests()[0].query_value("query"),
            Some(r#"recording:"Roygbiv" AND arid:arid-1"#)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_origin_release_by_artist_name() {
        let transport = Arc::new(FakeTransport::new());
        transport.push_ok(r#"{"recordings":[]}"#);
        let client = musicbrainz(transport.clone());

        let origin = client
            .origin_release_for_track("Say \"Hi\"", "Someone", None)
            .await
            .unwrap();

        assert_eq!(origin, None);
        assert_eq!(
            transport.requests()[0].query_value("query"),
            Some(r#"recording:"Say \"Hi\"" AND artist:"Someone""#)
        );
    }
}
