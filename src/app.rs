//! Glue for the binary: service clients built from a resolved [`AppConfig`],
//! recommendation input and run summary output.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use futures::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::api_client::{
    RateLimitGate, ReqwestTransport, RetryPolicy, ServiceKind, ThrottledClient, TransportOptions,
};
use crate::cache::{CacheClass, DiskCache};
use crate::config::{AppConfig, ServiceSettings};
use crate::models::{Recommendation, RunSummary};
use crate::services::{
    LastFmClient, MusicBrainzClient, RedClient, LASTFM_API_BASE, MUSICBRAINZ_API_BASE,
    RED_API_BASE,
};

pub struct ServiceClients {
    pub lastfm: Arc<LastFmClient>,
    pub musicbrainz: Arc<MusicBrainzClient>,
    pub red: Arc<RedClient>,
}

fn throttled_client(
    service: ServiceKind,
    base_url: &str,
    options: TransportOptions,
    settings: &ServiceSettings,
    cache: Option<&Arc<DiskCache>>,
) -> Result<ThrottledClient> {
    let transport = ReqwestTransport::new(base_url, options)
        .with_context(|| format!("Failed to set up the {} transport", service))?;
    let gate = Arc::new(RateLimitGate::new(service, settings.min_interval));
    let client = ThrottledClient::new(
        service,
        Arc::new(transport),
        gate,
        RetryPolicy::new(settings.max_attempts),
    );
    Ok(match cache {
        Some(cache) => client.with_cache(cache.clone()),
        None => client,
    })
}

impl ServiceClients {
    pub fn build(config: &AppConfig) -> Result<Self> {
        let cache = if config.cache.enable_api_cache {
            match DiskCache::open(&config.cache.dir, CacheClass::Api) {
                Ok(cache) => {
                    info!("Using api cache at {:?}", cache.path());
                    Some(Arc::new(cache))
                }
                Err(e) => {
                    error!(
                        "Failed to open the api cache in {:?}, running without it: {}",
                        config.cache.dir, e
                    );
                    None
                }
            }
        } else {
            None
        };

        let lastfm = throttled_client(
            ServiceKind::LastFm,
            LASTFM_API_BASE,
            TransportOptions {
                secret_query: vec![("api_key".to_string(), config.lastfm.api_key.clone())],
                ..TransportOptions::default()
            },
            &config.lastfm.service,
            cache.as_ref(),
        )?;

        let musicbrainz = throttled_client(
            ServiceKind::MusicBrainz,
            MUSICBRAINZ_API_BASE,
            TransportOptions {
                user_agent: config.musicbrainz.user_agent.clone(),
                ..TransportOptions::default()
            },
            &config.musicbrainz.service,
            cache.as_ref(),
        )?;

        let red = throttled_client(
            ServiceKind::Red,
            RED_API_BASE,
            TransportOptions {
                headers: vec![("Authorization".to_string(), config.red.api_key.clone())],
                ..TransportOptions::default()
            },
            &config.red.service,
            cache.as_ref(),
        )?;

        Ok(Self {
            lastfm: Arc::new(LastFmClient::new(lastfm)),
            musicbrainz: Arc::new(MusicBrainzClient::new(musicbrainz)),
            red: Arc::new(RedClient::new(red, config.red.user_id)),
        })
    }

    pub fn log_stats(&self) {
        for client in [
            self.lastfm.client(),
            self.musicbrainz.client(),
            self.red.client(),
        ] {
            let stats = client.stats();
            info!(
                "{}: {} call(s), {} retr(ies), {} cache hit(s), {} cache miss(es)",
                client.service(),
                stats.calls,
                stats.retries,
                stats.cache_hits,
                stats.cache_misses
            );
        }
    }
}

/// Cancel `shutdown` on the first interrupt. Returns `true` when a second one
/// arrives, meaning the caller should quit without waiting for in-flight work.
pub async fn watch_interrupts<S>(signals: S, shutdown: CancellationToken) -> bool
where
    S: Stream<Item = ()>,
{
    let mut signals = std::pin::pin!(signals);
    if signals.next().await.is_none() {
        return false;
    }
    warn!("Interrupted, finishing in-flight work (interrupt again to quit now)");
    shutdown.cancel();
    if signals.next().await.is_none() {
        return false;
    }
    warn!("Interrupted twice, exiting");
    true
}

/// Read the recommendations written by the scraper.
pub fn load_recommendations(path: &Path) -> Result<Vec<Recommendation>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read recommendations file: {:?}", path))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse recommendations file: {:?}", path))
}

pub fn write_summary(path: &Path, summary: &RunSummary) -> Result<()> {
    let json = serde_json::to_string_pretty(summary).context("Failed to serialize run summary")?;
    std::fs::write(path, json).with_context(|| format!("Failed to write run summary: {:?}", path))
}

pub fn log_summary_table(summary: &RunSummary) {
    info!("{:<9} {:<6} {:<40} {:<30} {}", "STATUS", "KIND", "TITLE", "ARTIST", "REASON");
    for outcome in summary.iter() {
        let rec = &outcome.recommendation;
        let reason = match (outcome.chosen_release_id, outcome.used_token) {
            (Some(id), true) => format!("{} (torrent {}, token)", outcome.reason, id),
            (Some(id), false) => format!("{} (torrent {})", outcome.reason, id),
            (None, _) => outcome.reason.clone(),
        };
        info!(
            "{:<9} {:<6} {:<40} {:<30} {}",
            outcome.status.as_str(),
            rec.kind,
            rec.title,
            rec.artist,
            reason
        );
    }
}
