//! Catalog search: one browse query per format preference, first rank with hits wins.

mod query;
mod ranking;

use std::sync::Arc;

use tracing::debug;

use crate::api_client::ApiError;
use crate::config::SearchConfig;
use crate::models::{CandidateRelease, EnrichedRecommendation, FormatPreference};
use crate::services::CatalogService;

pub use query::browse_query;
pub use ranking::{pick_best, satisfies};

pub struct CatalogMatcher {
    catalog: Arc<dyn CatalogService>,
}

impl CatalogMatcher {
    pub fn new(catalog: Arc<dyn CatalogService>) -> Self {
        Self { catalog }
    }

    /// Find the release to acquire for a recommendation.
    ///
    /// Preferences are tried in order and lower ranks are never queried once a rank
    /// has hits. `Ok(None)` means no rank had any.
    pub async fn find_match(
        &self,
        enriched: &EnrichedRecommendation,
        preferences: &[FormatPreference],
        search: &SearchConfig,
        tokens_enabled: bool,
    ) -> Result<Option<CandidateRelease>, ApiError> {
        for (rank, preference) in preferences.iter().enumerate() {
            let Some(query) = browse_query(enriched, preference, search) else {
                return Ok(None);
            };
            let groups = self.catalog.browse(&query).await?;

            let hits: Vec<CandidateRelease> = groups
                .iter()
                .flat_map(|group| group.torrents.iter().map(move |t| (group, t)))
                .filter(|(_, torrent)| satisfies(torrent, preference))
                .filter_map(|(group, torrent)| {
                    ranking::to_candidate(group, torrent, preference, rank)
                })
                .collect();

            debug!(
                "{}: {} hit(s) for preference #{} ({})",
                enriched.recommendation,
                hits.len(),
                rank + 1,
                preference
            );

            if let Some(best) = pick_best(hits, tokens_enabled) {
                return Ok(Some(best));
            }
        }
        Ok(None)
    }
}
