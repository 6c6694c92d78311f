//! Per-recommendation results of a run.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

use super::recommendation::Recommendation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Snatched,
    Skipped,
    Failed,
}

impl OutcomeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeStatus::Snatched => "snatched",
            OutcomeStatus::Skipped => "skipped",
            OutcomeStatus::Failed => "failed",
        }
    }
}

/// Why a recommendation was not snatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SkipReason {
    UnresolvedOrigin,
    NoCatalogMatch,
    Duplicate,
    Oversize,
    RatioFloor,
    DryRun,
    LibraryItem,
    PriorSnatch,
    Cancelled,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::UnresolvedOrigin => "unresolved-origin",
            SkipReason::NoCatalogMatch => "no catalog match",
            SkipReason::Duplicate => "duplicate",
            SkipReason::Oversize => "oversize",
            SkipReason::RatioFloor => "ratio floor",
            SkipReason::DryRun => "dry-run",
            SkipReason::LibraryItem => "library-item",
            SkipReason::PriorSnatch => "prior snatch",
            SkipReason::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exactly one of these is produced for every processed recommendation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AcquisitionOutcome {
    pub recommendation: Recommendation,
    pub status: OutcomeStatus,
    pub reason: String,
    pub chosen_release_id: Option<u64>,
    pub snatch_path: Option<PathBuf>,
    pub used_token: bool,
}

impl AcquisitionOutcome {
    pub fn snatched(
        recommendation: Recommendation,
        release_id: u64,
        path: PathBuf,
        used_token: bool,
    ) -> Self {
        Self {
            recommendation,
            status: OutcomeStatus::Snatched,
            reason: "snatched".to_string(),
            chosen_release_id: Some(release_id),
            snatch_path: Some(path),
            used_token,
        }
    }

    pub fn skipped(recommendation: Recommendation, reason: SkipReason) -> Self {
        Self {
            recommendation,
            status: OutcomeStatus::Skipped,
            reason: reason.as_str().to_string(),
            chosen_release_id: None,
            snatch_path: None,
            used_token: false,
        }
    }

    pub fn failed(recommendation: Recommendation, reason: impl Into<String>) -> Self {
        Self {
            recommendation,
            status: OutcomeStatus::Failed,
            reason: reason.into(),
            chosen_release_id: None,
            snatch_path: None,
            used_token: false,
        }
    }

    pub fn with_release_id(mut self, release_id: u64) -> Self {
        self.chosen_release_id = Some(release_id);
        self
    }
}

/// Outcomes of a run split by status. The three lists are disjoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub snatched: Vec<AcquisitionOutcome>,
    pub skipped: Vec<AcquisitionOutcome>,
    pub failed: Vec<AcquisitionOutcome>,
}

impl RunSummary {
    pub fn push(&mut self, outcome: AcquisitionOutcome) {
        match outcome.status {
            OutcomeStatus::Snatched => self.snatched.push(outcome),
            OutcomeStatus::Skipped => self.skipped.push(outcome),
            OutcomeStatus::Failed => self.failed.push(outcome),
        }
    }

    pub fn total(&self) -> usize {
        self.snatched.len() + self.skipped.len() + self.failed.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AcquisitionOutcome> {
        self.snatched
            .iter()
            .chain(self.skipped.iter())
            .chain(self.failed.iter())
    }

    /// Find the outcome recorded for a given recommendation title.
    pub fn find(&self, title: &str) -> Option<&AcquisitionOutcome> {
        self.iter().find(|o| o.recommendation.title == title)
    }
}
