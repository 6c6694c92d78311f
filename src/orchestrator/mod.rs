//! Runs a batch of recommendations through resolution, matching and acquisition.
//!
//! Phase 1 resolves and matches every recommendation concurrently; the per-service
//! gates serialize the actual upstream calls. Phase 2 walks the matches one at a
//! time, largest first, so that the eligibility checks see an up to date ratio,
//! token count and duplicate set.

mod snatch;

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api_client::ApiError;
use crate::config::{AppConfig, RunSettings, SearchConfig, SnatchConfig};
use crate::eligibility::{is_eligible, Eligibility, RatioLedger};
use crate::matcher::CatalogMatcher;
use crate::models::{
    AcquisitionOutcome, CandidateRelease, FormatPreference, PriorSnatches, RecContext, RecKind,
    Recommendation, RunSummary, SkipReason,
};
use crate::resolver::{MetadataResolver, Resolution};
use crate::services::{CatalogService, HistoryService, RegistryService};

pub use snatch::{torrent_path, write_torrent_file, SnatchError};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("Failed to fetch user details: {0}")]
    UserDetails(#[source] ApiError),

    #[error("Credentials rejected, aborting run: {0}")]
    Unauthorized(#[source] ApiError),
}

/// The parts of [`AppConfig`] a run needs.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub snatch: SnatchConfig,
    pub search: SearchConfig,
    pub format_preferences: Vec<FormatPreference>,
    pub run: RunSettings,
}

impl From<&AppConfig> for OrchestratorConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            snatch: config.snatch.clone(),
            search: config.search,
            format_preferences: config.format_preferences.clone(),
            run: config.run.clone(),
        }
    }
}

/// Result of phase 1 for one recommendation.
enum Lookup {
    Matched(Recommendation, CandidateRelease),
    Done(AcquisitionOutcome),
    Fatal(ApiError),
}

pub struct RunOrchestrator {
    resolver: MetadataResolver,
    matcher: CatalogMatcher,
    catalog: Arc<dyn CatalogService>,
    config: OrchestratorConfig,
    cancel: CancellationToken,
}

impl RunOrchestrator {
    pub fn new(
        history: Arc<dyn HistoryService>,
        registry: Arc<dyn RegistryService>,
        catalog: Arc<dyn CatalogService>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            resolver: MetadataResolver::new(history, registry, config.search),
            matcher: CatalogMatcher::new(catalog.clone()),
            catalog,
            config,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub async fn run(&self, recommendations: Vec<Recommendation>) -> Result<RunSummary, RunError> {
        let user = self.catalog.user_details().await.map_err(|e| match e {
            ApiError::Unauthorized { .. } => RunError::Unauthorized(e),
            e => RunError::UserDetails(e),
        })?;
        info!(
            "User {}: ratio {:.2}, {} token(s), {} prior snatch(es)",
            user.user_id,
            user.ratio,
            user.available_tokens,
            user.prior_snatches.len()
        );
        let mut ledger = RatioLedger::from_user(&user);
        // Token-eligibility only matters for tie-breaking while a token can be spent.
        let tokens_enabled = self.config.snatch.use_tokens && user.available_tokens > 0;
        let prior = user.prior_snatches;
        let mut chosen = PriorSnatches::default();

        let mut summary = RunSummary::default();
        let mut pending = Vec::new();
        for recommendation in recommendations {
            if !self.config.run.rec_types.contains(&recommendation.kind) {
                debug!("Dropping {}: kind not requested", recommendation);
                continue;
            }
            match self.pre_search_skip(&recommendation, &prior) {
                Some(reason) => {
                    info!("Skipping {}: {}", recommendation, reason);
                    summary.push(AcquisitionOutcome::skipped(recommendation, reason));
                }
                None => pending.push(recommendation),
            }
        }

        info!("Resolving and matching {} recommendation(s)", pending.len());
        let mut lookups: Vec<(usize, Lookup)> = stream::iter(pending.into_iter().enumerate())
            .map(|(index, recommendation)| async move {
                (index, self.resolve_and_match(recommendation, tokens_enabled).await)
            })
            .buffer_unordered(self.config.run.max_concurrency.max(1))
            .collect()
            .await;
        lookups.sort_by_key(|(index, _)| *index);

        let mut matches = Vec::new();
        for (_, lookup) in lookups {
            match lookup {
                Lookup::Matched(recommendation, candidate) => {
                    matches.push((recommendation, candidate))
                }
                Lookup::Done(outcome) => summary.push(outcome),
                Lookup::Fatal(e) => return Err(RunError::Unauthorized(e)),
            }
        }

        // Largest first, so scarce tokens go to the biggest downloads.
        matches.sort_by(|(_, a), (_, b)| b.size_bytes.cmp(&a.size_bytes));
        for (recommendation, candidate) in matches {
            let outcome = self
                .acquire(recommendation, candidate, &prior, &mut ledger, &mut chosen)
                .await?;
            info!(
                "{}: {} ({})",
                outcome.recommendation,
                outcome.status.as_str(),
                outcome.reason
            );
            summary.push(outcome);
        }

        info!(
            "Run finished: {} snatched, {} skipped, {} failed",
            summary.snatched.len(),
            summary.skipped.len(),
            summary.failed.len()
        );
        Ok(summary)
    }

    fn pre_search_skip(
        &self,
        recommendation: &Recommendation,
        prior: &PriorSnatches,
    ) -> Option<SkipReason> {
        if self.cancel.is_cancelled() {
            return Some(SkipReason::Cancelled);
        }
        if !self.config.run.allow_library_items && recommendation.context == RecContext::InLibrary
        {
            return Some(SkipReason::LibraryItem);
        }
        if self.config.snatch.skip_prior_snatches
            && recommendation.kind == RecKind::Album
            && prior.contains_name(&recommendation.artist, &recommendation.title)
        {
            return Some(SkipReason::PriorSnatch);
        }
        None
    }

    async fn resolve_and_match(
        &self,
        recommendation: Recommendation,
        tokens_enabled: bool,
    ) -> Lookup {
        if self.cancel.is_cancelled() {
            return Lookup::Done(AcquisitionOutcome::skipped(
                recommendation,
                SkipReason::Cancelled,
            ));
        }

        let enriched = match self.resolver.resolve(&recommendation).await {
            Ok(Resolution::Resolved(enriched)) => enriched,
            Ok(Resolution::Unresolved(_)) => {
                return Lookup::Done(AcquisitionOutcome::skipped(
                    recommendation,
                    SkipReason::UnresolvedOrigin,
                ))
            }
            Err(e) => return lookup_failure(recommendation, e),
        };

        let found = self
            .matcher
            .find_match(
                &enriched,
                &self.config.format_preferences,
                &self.config.search,
                tokens_enabled,
            )
            .await;
        match found {
            Ok(Some(candidate)) => {
                debug!(
                    "{}: matched torrent {} ({}, {} seeders)",
                    recommendation,
                    candidate.release_id,
                    candidate.display_size(),
                    candidate.seeders
                );
                Lookup::Matched(recommendation, candidate)
            }
            Ok(None) => Lookup::Done(AcquisitionOutcome::skipped(
                recommendation,
                SkipReason::NoCatalogMatch,
            )),
            Err(e) => lookup_failure(recommendation, e),
        }
    }

    async fn acquire(
        &self,
        recommendation: Recommendation,
        candidate: CandidateRelease,
        prior: &PriorSnatches,
        ledger: &mut RatioLedger,
        chosen: &mut PriorSnatches,
    ) -> Result<AcquisitionOutcome, RunError> {
        let release_id = candidate.release_id;
        if self.cancel.is_cancelled() {
            return Ok(
                AcquisitionOutcome::skipped(recommendation, SkipReason::Cancelled)
                    .with_release_id(release_id),
            );
        }

        // Chosen earlier in this run: never acquired twice, whatever the config says.
        if chosen.contains_release(release_id, candidate.group_id) {
            return Ok(
                AcquisitionOutcome::skipped(recommendation, SkipReason::Duplicate)
                    .with_release_id(release_id),
            );
        }

        let use_token = match is_eligible(&candidate, &self.config.snatch, prior, ledger) {
            Eligibility::Eligible { use_token } => use_token,
            Eligibility::Rejected(reason) => {
                return Ok(
                    AcquisitionOutcome::skipped(recommendation, reason.skip_reason())
                        .with_release_id(release_id),
                )
            }
        };

        if self.config.run.no_snatch {
            self.record(&candidate, use_token, ledger, chosen);
            return Ok(
                AcquisitionOutcome::skipped(recommendation, SkipReason::DryRun)
                    .with_release_id(release_id),
            );
        }

        let torrent = match self.catalog.download(release_id, use_token).await {
            Ok(torrent) => torrent,
            Err(e @ ApiError::Unauthorized { .. }) => return Err(RunError::Unauthorized(e)),
            Err(e) => {
                warn!("Download of torrent {} failed: {}", release_id, e);
                return Ok(
                    AcquisitionOutcome::failed(recommendation, e.to_string())
                        .with_release_id(release_id),
                );
            }
        };

        match write_torrent_file(&self.config.snatch.snatch_dir, release_id, &torrent.bytes) {
            Ok(path) => {
                self.record(&candidate, torrent.used_token, ledger, chosen);
                Ok(AcquisitionOutcome::snatched(
                    recommendation,
                    release_id,
                    path,
                    torrent.used_token,
                ))
            }
            Err(e) => {
                warn!("{}", e);
                Ok(AcquisitionOutcome::failed(recommendation, e.to_string())
                    .with_release_id(release_id))
            }
        }
    }

    fn record(
        &self,
        candidate: &CandidateRelease,
        used_token: bool,
        ledger: &mut RatioLedger,
        chosen: &mut PriorSnatches,
    ) {
        ledger.record_snatch(candidate.size_bytes, used_token);
        chosen.insert(
            candidate.release_id,
            candidate.group_id,
            &candidate.artist_name,
            &candidate.group_name,
        );
    }
}

fn lookup_failure(recommendation: Recommendation, error: ApiError) -> Lookup {
    match error {
        ApiError::Unauthorized { .. } => Lookup::Fatal(error),
        e => {
            warn!("{}: {}", recommendation, e);
            Lookup::Done(AcquisitionOutcome::failed(recommendation, e.to_string()))
        }
    }
}
