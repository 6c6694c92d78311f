//! Data types shared across the resolution and matching pipeline.

mod format;
mod outcome;
mod recommendation;
mod release;
mod user;

pub use format::{CdOnlyExtras, Encoding, Format, FormatPreference, Media, ALLOWED_LOG_VALUES};
pub use outcome::{AcquisitionOutcome, OutcomeStatus, RunSummary, SkipReason};
pub use recommendation::{
    EnrichedRecommendation, OriginRelease, RecContext, RecKind, Recommendation,
};
pub use release::{CandidateRelease, ReleaseType};
pub use user::{PriorSnatches, UserDetails};
