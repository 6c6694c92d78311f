//! Test fixtures: recommendations, catalog data and a ready-to-run orchestrator

use super::constants::*;
use super::fakes::{FakeCatalog, FakeHistory, FakeRegistry};
use recsnatch::config::{RunSettings, SearchConfig, SnatchConfig};
use recsnatch::models::{
    Encoding, Format, FormatPreference, Media, RecKind, Recommendation, ReleaseType, UserDetails,
};
use recsnatch::services::{BrowseGroup, BrowseTorrent, ReleaseDetails};
use recsnatch::{OrchestratorConfig, RunOrchestrator};
use std::sync::Arc;
use tempfile::TempDir;

pub fn album(title: &str) -> Recommendation {
    Recommendation::new(RecKind::Album, BOC, title)
}

pub fn track(title: &str) -> Recommendation {
    Recommendation::new(RecKind::Track, BOC, title)
}

/// [FLAC Lossless WEB, FLAC Lossless CD]
pub fn web_then_cd() -> Vec<FormatPreference> {
    vec![
        FormatPreference::new(Format::Flac, Encoding::Lossless, Media::Web),
        FormatPreference::new(Format::Flac, Encoding::Lossless, Media::Cd),
    ]
}

pub fn flac_torrent(torrent_id: u64, media: &str, size: u64, seeders: u32) -> BrowseTorrent {
    BrowseTorrent {
        torrent_id,
        media: media.to_string(),
        format: "FLAC".to_string(),
        encoding: "Lossless".to_string(),
        size,
        seeders,
        has_log: media == "CD",
        log_score: if media == "CD" { 100 } else { 0 },
        has_cue: media == "CD",
        can_use_token: true,
    }
}

/// Music Has the Right to Children with one WEB and two CD editions.
pub fn mhtrtc_group() -> BrowseGroup {
    BrowseGroup {
        group_id: MHTRTC_GROUP_ID,
        group_name: MHTRTC.to_string(),
        artist: BOC.to_string(),
        release_type: Some("Album".to_string()),
        torrents: vec![
            flac_torrent(MHTRTC_CD_ID, "CD", 450_000_000, 80),
            flac_torrent(MHTRTC_WEB_ID, "WEB", 420_000_000, 12),
            flac_torrent(MHTRTC_CD_2_ID, "CD", 460_000_000, 30),
        ],
    }
}

/// Geogaddi with a single CD edition.
pub fn geogaddi_group(size: u64) -> BrowseGroup {
    BrowseGroup {
        group_id: GEOGADDI_GROUP_ID,
        group_name: GEOGADDI.to_string(),
        artist: BOC.to_string(),
        release_type: Some("Album".to_string()),
        torrents: vec![flac_torrent(GEOGADDI_CD_ID, "CD", size, 40)],
    }
}

pub fn mhtrtc_details() -> ReleaseDetails {
    ReleaseDetails {
        mbid: MHTRTC_MBID.to_string(),
        title: Some(MHTRTC.to_string()),
        first_release_year: Some(1998),
        release_type: Some(ReleaseType::Album),
        record_label: Some("Warp Records".to_string()),
        catalog_number: Some("WARPCD55".to_string()),
    }
}

pub fn geogaddi_details() -> ReleaseDetails {
    ReleaseDetails {
        mbid: GEOGADDI_MBID.to_string(),
        title: Some(GEOGADDI.to_string()),
        first_release_year: Some(2002),
        release_type: Some(ReleaseType::Album),
        record_label: Some("Warp Records".to_string()),
        catalog_number: Some("WARPCD101".to_string()),
    }
}

/// A user with a healthy ratio, no tokens and no prior snatches.
pub fn healthy_user() -> UserDetails {
    UserDetails {
        user_id: 7,
        uploaded_bytes: 50 * GB,
        downloaded_bytes: 10 * GB,
        ratio: 5.0,
        available_tokens: 0,
        prior_snatches: Default::default(),
    }
}

/// Everything a run needs, with the snatch directory in a temp dir.
pub struct TestRun {
    pub snatch_dir: TempDir,
    pub config: OrchestratorConfig,
    pub history: Arc<FakeHistory>,
    pub registry: Arc<FakeRegistry>,
    pub catalog: Arc<FakeCatalog>,
}

impl TestRun {
    /// Catalog with the Music Has the Right to Children editions, registry and
    /// history services that know it, and a 2 GB size cap.
    pub fn new() -> Self {
        let history = FakeHistory::default().with_album(MHTRTC, MHTRTC_MBID);
        let registry = FakeRegistry::default()
            .with_release(mhtrtc_details())
            .with_release(geogaddi_details());
        let catalog = FakeCatalog::default()
            .with_user(healthy_user())
            .with_group(mhtrtc_group());
        Self::with_services(history, registry, catalog)
    }

    pub fn with_services(history: FakeHistory, registry: FakeRegistry, catalog: FakeCatalog) -> Self {
        let snatch_dir = TempDir::new().unwrap();
        let config = OrchestratorConfig {
            snatch: SnatchConfig {
                snatch_dir: snatch_dir.path().to_path_buf(),
                max_size_bytes: 2 * GB,
                ..SnatchConfig::default()
            },
            search: SearchConfig::default(),
            format_preferences: web_then_cd(),
            run: RunSettings::default(),
        };
        Self {
            snatch_dir,
            config,
            history: Arc::new(history),
            registry: Arc::new(registry),
            catalog: Arc::new(catalog),
        }
    }

    pub fn orchestrator(&self) -> RunOrchestrator {
        RunOrchestrator::new(
            self.history.clone(),
            self.registry.clone(),
            self.catalog.clone(),
            self.config.clone(),
        )
    }

    pub fn snatched_files(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.snatch_dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}
