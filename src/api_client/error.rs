use std::fmt;
use thiserror::Error;

/// Upstream services the client talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceKind {
    LastFm,
    MusicBrainz,
    Red,
}

impl ServiceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceKind::LastFm => "lastfm",
            ServiceKind::MusicBrainz => "musicbrainz",
            ServiceKind::Red => "red",
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// Network failure, HTTP 5xx or 429. Retried.
    #[error("{service}: transient failure: {cause}")]
    Transient { service: ServiceKind, cause: String },

    /// Retries exhausted.
    #[error("{service} unavailable after {attempts} attempt(s): {cause}")]
    ServiceUnavailable {
        service: ServiceKind,
        attempts: u32,
        cause: String,
    },

    /// HTTP 401/403. Fatal for the whole run.
    #[error("{service}: unauthorized (HTTP {status})")]
    Unauthorized { service: ServiceKind, status: u16 },

    #[error("{service}: request to '{path}' rejected: {reason}")]
    Rejected {
        service: ServiceKind,
        path: String,
        reason: String,
    },

    /// The service answered but has nothing for this request.
    #[error("{service}: nothing found for '{path}'")]
    NotFound { service: ServiceKind, path: String },

    #[error("{service}: unparseable response: {cause}")]
    Parse { service: ServiceKind, cause: String },
}

impl ApiError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ApiError::Transient { .. })
    }

    /// Errors that must stop the caller instead of being treated as a lookup miss.
    pub fn is_availability_error(&self) -> bool {
        matches!(
            self,
            ApiError::ServiceUnavailable { .. } | ApiError::Unauthorized { .. }
        )
    }

    pub fn service(&self) -> ServiceKind {
        match self {
            ApiError::Transient { service, .. }
            | ApiError::ServiceUnavailable { service, .. }
            | ApiError::Unauthorized { service, .. }
            | ApiError::Rejected { service, .. }
            | ApiError::NotFound { service, .. }
            | ApiError::Parse { service, .. } => *service,
        }
    }
}
