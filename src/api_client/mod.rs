//! Rate-limited API client shared by all upstream services.
//!
//! Each service gets one [`RateLimitGate`] and one [`ThrottledClient`]; the
//! client consults the disk cache, passes every outbound attempt through the
//! gate and retries transient failures according to its [`RetryPolicy`].

mod error;
mod gate;
mod retry_policy;
mod throttled;
mod transport;

#[cfg(test)]
pub(crate) mod fake;

pub use error::{ApiError, ServiceKind};
pub use gate::RateLimitGate;
pub use retry_policy::{RetryDecision, RetryPolicy};
pub use throttled::{ClientStats, ThrottledClient};
pub use transport::{
    ApiRequest, RawResponse, ReqwestTransport, Transport, TransportError, TransportOptions,
};
