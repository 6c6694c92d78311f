//! Pre-acquisition checks for a matched candidate.
//!
//! Checks run in a fixed order and stop at the first failure:
//! duplicate, then oversize, then ratio floor. Nothing here does I/O.

use serde::Serialize;

use crate::config::SnatchConfig;
use crate::models::{CandidateRelease, PriorSnatches, SkipReason, UserDetails};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RejectReason {
    Duplicate,
    Oversize,
    RatioFloor,
}

impl RejectReason {
    pub fn skip_reason(&self) -> SkipReason {
        match self {
            RejectReason::Duplicate => SkipReason::Duplicate,
            RejectReason::Oversize => SkipReason::Oversize,
            RejectReason::RatioFloor => SkipReason::RatioFloor,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    Eligible { use_token: bool },
    Rejected(RejectReason),
}

/// Running account of the user's ratio over a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RatioLedger {
    pub uploaded_bytes: u64,
    pub downloaded_bytes: u64,
    /// Bytes snatched during this run without a token.
    pub pending_bytes: u64,
    pub available_tokens: u32,
}

impl RatioLedger {
    pub fn from_user(user: &UserDetails) -> Self {
        Self {
            uploaded_bytes: user.uploaded_bytes,
            downloaded_bytes: user.downloaded_bytes,
            pending_bytes: 0,
            available_tokens: user.available_tokens,
        }
    }

    /// Ratio the user would have after downloading `size_bytes` more.
    pub fn ratio_after(&self, size_bytes: u64) -> f64 {
        let downloaded = self.downloaded_bytes + self.pending_bytes + size_bytes;
        if downloaded == 0 {
            return f64::INFINITY;
        }
        self.uploaded_bytes as f64 / downloaded as f64
    }

    pub fn record_snatch(&mut self, size_bytes: u64, used_token: bool) {
        if used_token {
            self.available_tokens = self.available_tokens.saturating_sub(1);
        } else {
            self.pending_bytes += size_bytes;
        }
    }
}

pub fn is_eligible(
    candidate: &CandidateRelease,
    config: &SnatchConfig,
    prior: &PriorSnatches,
    ledger: &RatioLedger,
) -> Eligibility {
    if config.skip_prior_snatches && prior.contains_release(candidate.release_id, candidate.group_id)
    {
        return Eligibility::Rejected(RejectReason::Duplicate);
    }

    if candidate.size_bytes > config.max_size_bytes {
        return Eligibility::Rejected(RejectReason::Oversize);
    }

    let use_token =
        config.use_tokens && ledger.available_tokens > 0 && candidate.has_freeleech_token;

    if !use_token
        && config.min_allowed_ratio > 0.0
        && ledger.ratio_after(candidate.size_bytes) < config.min_allowed_ratio
    {
        return Eligibility::Rejected(RejectReason::RatioFloor);
    }

    Eligibility::Eligible { use_token }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Encoding, Format, Media};

    const GB: u64 = 1_000_000_000;

    fn candidate(release_id: u64, group_id: u64, size_bytes: u64) -> CandidateRelease {
        CandidateRelease {
            release_id,
            group_id,
            matched_preference_rank: 0,
            size_bytes,
            seeders: 10,
            has_freeleech_token: true,
            log_score: None,
            has_cue: None,
            media: Media::Web,
            format: Format::Flac,
            encoding: Encoding::Lossless,
            artist_name: "Artist".to_string(),
            group_name: "Release".to_string(),
        }
    }

    fn config() -> SnatchConfig {
        SnatchConfig {
            max_size_bytes: 2 * GB,
            ..SnatchConfig::default()
        }
    }

    fn ledger(uploaded: u64, downloaded: u64) -> RatioLedger {
        RatioLedger {
            uploaded_bytes: uploaded,
            downloaded_bytes: downloaded,
            pending_bytes: 0,
            available_tokens: 0,
        }
    }

    #[test]
    fn test_eligible_without_token() {
        let result = is_eligible(
            &candidate(1, 1, GB),
            &config(),
            &PriorSnatches::default(),
            &ledger(10 * GB, GB),
        );
        assert_eq!(result, Eligibility::Eligible { use_token: false });
    }

    #[test]
    fn test_duplicate_wins_over_oversize() {
        let mut prior = PriorSnatches::default();
        prior.insert(1, 1, "Artist", "Release");

        let result = is_eligible(&candidate(1, 1, 50 * GB), &config(), &prior, &ledger(0, 0));
        assert_eq!(result, Eligibility::Rejected(RejectReason::Duplicate));
    }

    #[test]
    fn test_duplicate_by_group() {
        let mut prior = PriorSnatches::default();
        prior.insert(99, 7, "Artist", "Release");

        let result = is_eligible(&candidate(1, 7, GB), &config(), &prior, &ledger(0, 0));
        assert_eq!(result, Eligibility::Rejected(RejectReason::Duplicate));
    }

    #[test]
    fn test_duplicates_allowed_when_not_skipping() {
        let mut prior = PriorSnatches::default();
        prior.insert(1, 1, "Artist", "Release");
        let config = SnatchConfig {
            skip_prior_snatches: false,
            ..config()
        };

        let result = is_eligible(&candidate(1, 1, GB), &config, &prior, &ledger(0, 0));
        assert_eq!(result, Eligibility::Eligible { use_token: false });
    }

    #[test]
    fn test_oversize() {
        let result = is_eligible(
            &candidate(1, 1, 2 * GB + 1),
            &config(),
            &PriorSnatches::default(),
            &ledger(0, 0),
        );
        assert_eq!(result, Eligibility::Rejected(RejectReason::Oversize));

        let at_limit = is_eligible(
            &candidate(1, 1, 2 * GB),
            &config(),
            &PriorSnatches::default(),
            &ledger(0, 0),
        );
        assert_eq!(at_limit, Eligibility::Eligible { use_token: false });
    }

    #[test]
    fn test_ratio_floor() {
        let config = SnatchConfig {
            min_allowed_ratio: 1.0,
            ..config()
        };
        // 3 / (2 + 1.5) < 1.0
        let result = is_eligible(
            &candidate(1, 1, 3 * GB / 2),
            &config,
            &PriorSnatches::default(),
            &ledger(3 * GB, 2 * GB),
        );
        assert_eq!(result, Eligibility::Rejected(RejectReason::RatioFloor));

        // 3 / (2 + 0.5) >= 1.0
        let result = is_eligible(
            &candidate(1, 1, GB / 2),
            &config,
            &PriorSnatches::default(),
            &ledger(3 * GB, 2 * GB),
        );
        assert_eq!(result, Eligibility::Eligible { use_token: false });
    }

    #[test]
    fn test_ratio_floor_counts_pending_downloads() {
        let config = SnatchConfig {
            min_allowed_ratio: 1.0,
            ..config()
        };
        let mut ledger = ledger(3 * GB, GB);
        ledger.record_snatch(GB, false);

        let result = is_eligible(
            &candidate(1, 1, GB + GB / 2),
            &config,
            &PriorSnatches::default(),
            &ledger,
        );
        assert_eq!(result, Eligibility::Rejected(RejectReason::RatioFloor));
    }

    #[test]
    fn test_ratio_floor_disabled_by_non_positive_minimum() {
        let result = is_eligible(
            &candidate(1, 1, GB),
            &config(),
            &PriorSnatches::default(),
            &ledger(0, 100 * GB),
        );
        assert_eq!(result, Eligibility::Eligible { use_token: false });
    }

    #[test]
    fn test_token_skips_ratio_check() {
        let config = SnatchConfig {
            min_allowed_ratio: 1.0,
            use_tokens: true,
            ..config()
        };
        let mut ledger = ledger(0, 10 * GB);
        ledger.available_tokens = 1;

        let result = is_eligible(&candidate(1, 1, GB), &config, &PriorSnatches::default(), &ledger);
        assert_eq!(result, Eligibility::Eligible { use_token: true });
    }

    #[test]
    fn test_no_token_without_availability_or_eligibility() {
        let config = SnatchConfig {
            use_tokens: true,
            ..config()
        };
        let no_tokens = ledger(GB, GB);
        let result = is_eligible(
            &candidate(1, 1, GB),
            &config,
            &PriorSnatches::default(),
            &no_tokens,
        );
        assert_eq!(result, Eligibility::Eligible { use_token: false });

        let mut with_tokens = no_tokens;
        with_tokens.available_tokens = 2;
        let mut not_token_eligible = candidate(1, 1, GB);
        not_token_eligible.has_freeleech_token = false;
        let result = is_eligible(
            &not_token_eligible,
            &config,
            &PriorSnatches::default(),
            &with_tokens,
        );
        assert_eq!(result, Eligibility::Eligible { use_token: false });
    }

    #[test]
    fn test_ledger_record_snatch() {
        let mut ledger = ledger(GB, GB);
        ledger.available_tokens = 1;

        ledger.record_snatch(GB, true);
        assert_eq!(ledger.available_tokens, 0);
        assert_eq!(ledger.pending_bytes, 0);

        ledger.record_snatch(GB, true);
        assert_eq!(ledger.available_tokens, 0);

        ledger.record_snatch(GB, false);
        assert_eq!(ledger.pending_bytes, GB);
        assert_eq!(ledger.ratio_after(0), 0.5);
    }
}
