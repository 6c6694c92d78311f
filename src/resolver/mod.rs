//! Fills in the metadata a recommendation needs before it can be searched for.
//!
//! Tracks need the release they first appeared on. Albums (and resolved tracks) get
//! whichever search fields are enabled, looked up in the registry by release MBID.
//! Missing upstream data is never an error: lookups that miss or fail with anything
//! other than an availability error leave fields empty.

mod strategies;

use std::sync::Arc;

use tracing::{debug, warn};

use crate::api_client::ApiError;
use crate::config::SearchConfig;
use crate::models::{EnrichedRecommendation, OriginRelease, RecKind, Recommendation};
use crate::services::{HistoryService, RegistryService, ReleaseDetails};

pub use strategies::{
    HistoryAlbumId, HistoryTrackOrigin, IdStrategy, OriginStrategy, RegistryRecordingOrigin,
    RegistryReleaseSearch, TrackHints,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Resolved(EnrichedRecommendation),
    /// A track whose origin release could not be found. It must not be searched.
    Unresolved(EnrichedRecommendation),
}

impl Resolution {
    pub fn enriched(&self) -> &EnrichedRecommendation {
        match self {
            Resolution::Resolved(e) | Resolution::Unresolved(e) => e,
        }
    }
}

pub struct MetadataResolver {
    registry: Arc<dyn RegistryService>,
    origin_strategies: Vec<Box<dyn OriginStrategy>>,
    id_strategies: Vec<Box<dyn IdStrategy>>,
    search: SearchConfig,
}

impl MetadataResolver {
    /// Resolver with the standard chains: history service first, registry search second.
    pub fn new(
        history: Arc<dyn HistoryService>,
        registry: Arc<dyn RegistryService>,
        search: SearchConfig,
    ) -> Self {
        let origin_strategies: Vec<Box<dyn OriginStrategy>> = vec![
            Box::new(HistoryTrackOrigin::new(history.clone())),
            Box::new(RegistryRecordingOrigin::new(registry.clone())),
        ];
        let id_strategies: Vec<Box<dyn IdStrategy>> = vec![
            Box::new(HistoryAlbumId::new(history)),
            Box::new(RegistryReleaseSearch::new(registry.clone())),
        ];
        Self::with_strategies(registry, origin_strategies, id_strategies, search)
    }

    pub fn with_strategies(
        registry: Arc<dyn RegistryService>,
        origin_strategies: Vec<Box<dyn OriginStrategy>>,
        id_strategies: Vec<Box<dyn IdStrategy>>,
        search: SearchConfig,
    ) -> Self {
        Self {
            registry,
            origin_strategies,
            id_strategies,
            search,
        }
    }

    /// Errors only with [`ApiError::ServiceUnavailable`] or [`ApiError::Unauthorized`].
    pub async fn resolve(&self, recommendation: &Recommendation) -> Result<Resolution, ApiError> {
        let mut enriched = EnrichedRecommendation::new(recommendation.clone());

        let artist = recommendation.artist.as_str();
        let (album, known_mbid) = match recommendation.kind {
            RecKind::Album => (recommendation.title.clone(), None),
            RecKind::Track => {
                let Some(origin) = self.find_origin(recommendation).await? else {
                    debug!("{}: no origin release found", recommendation);
                    return Ok(Resolution::Unresolved(enriched));
                };
                debug!("{}: origin release is '{}'", recommendation, origin.title);
                let title = origin.title.clone();
                let mbid = origin.mbid.clone();
                enriched.origin_release = Some(origin);
                (title, mbid)
            }
        };

        if !self.search.any_enabled() {
            return Ok(Resolution::Resolved(enriched));
        }

        let mbid = match known_mbid {
            Some(mbid) => Some(mbid),
            None => self.find_release_mbid(artist, &album).await?,
        };
        let Some(mbid) = mbid else {
            debug!("{}: no registry id for '{}'", recommendation, album);
            return Ok(Resolution::Resolved(enriched));
        };

        let details = miss_on_error(self.registry.release(&mbid).await, "registry release")?;
        enriched.release_mbid = Some(mbid);
        if let Some(details) = details {
            self.copy_enabled_fields(&mut enriched, details);
        }
        Ok(Resolution::Resolved(enriched))
    }

    async fn find_origin(
        &self,
        recommendation: &Recommendation,
    ) -> Result<Option<OriginRelease>, ApiError> {
        let mut hints = TrackHints::default();
        for strategy in &self.origin_strategies {
            let found = strategy
                .find_origin(&recommendation.artist, &recommendation.title, &mut hints)
                .await;
            if let Some(origin) = miss_on_error(found, strategy.name())? {
                return Ok(Some(origin));
            }
        }
        Ok(None)
    }

    async fn find_release_mbid(
        &self,
        artist: &str,
        album: &str,
    ) -> Result<Option<String>, ApiError> {
        for strategy in &self.id_strategies {
            let found = strategy.find_release_mbid(artist, album).await;
            if let Some(mbid) = miss_on_error(found, strategy.name())? {
                return Ok(Some(mbid));
            }
        }
        Ok(None)
    }

    fn copy_enabled_fields(&self, enriched: &mut EnrichedRecommendation, details: ReleaseDetails) {
        if self.search.use_release_type {
            enriched.release_type = details.release_type;
        }
        if self.search.use_first_release_year {
            enriched.release_year = details.first_release_year;
        }
        if self.search.use_record_label {
            enriched.record_label = details.record_label;
        }
        if self.search.use_catalog_number {
            enriched.catalog_number = details.catalog_number;
        }
    }
}

/// Turn a lookup error into a miss unless the service itself is unusable.
fn miss_on_error<T>(
    result: Result<Option<T>, ApiError>,
    lookup: &str,
) -> Result<Option<T>, ApiError> {
    match result {
        Ok(found) => Ok(found),
        Err(e) if e.is_availability_error() => Err(e),
        Err(e) => {
            warn!("{} lookup failed, treating as a miss: {}", lookup, e);
            Ok(None)
        }
    }
}
