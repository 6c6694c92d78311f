//! Rate-limited, retrying, caching client for one upstream service.

use serde::de::DeserializeOwned;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

use super::gate::RateLimitGate;
use super::retry_policy::{RetryDecision, RetryPolicy};
use super::transport::{ApiRequest, RawResponse, Transport};
use super::{ApiError, ServiceKind};
use crate::cache::{cache_key, DiskCache};

/// Diagnostic counters of a [`ThrottledClient`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClientStats {
    /// Outbound calls, retries included.
    pub calls: u64,
    pub retries: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
}

#[derive(Default)]
struct Counters {
    calls: AtomicU64,
    retries: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
}

pub struct ThrottledClient {
    service: ServiceKind,
    transport: Arc<dyn Transport>,
    gate: Arc<RateLimitGate>,
    retry_policy: RetryPolicy,
    cache: Option<Arc<DiskCache>>,
    counters: Counters,
}

impl ThrottledClient {
    pub fn new(
        service: ServiceKind,
        transport: Arc<dyn Transport>,
        gate: Arc<RateLimitGate>,
        retry_policy: RetryPolicy,
    ) -> Self {
        Self {
            service,
            transport,
            gate,
            retry_policy,
            cache: None,
            counters: Counters::default(),
        }
    }

    pub fn with_cache(mut self, cache: Arc<DiskCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn service(&self) -> ServiceKind {
        self.service
    }

    pub fn stats(&self) -> ClientStats {
        ClientStats {
            calls: self.counters.calls.load(Ordering::Relaxed),
            retries: self.counters.retries.load(Ordering::Relaxed),
            cache_hits: self.counters.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.counters.cache_misses.load(Ordering::Relaxed),
        }
    }

    pub async fn call(&self, request: &ApiRequest) -> Result<Vec<u8>, ApiError> {
        self.call_with(request, |_| Ok(())).await
    }

    /// Call and decode a JSON body. Only well-formed JSON is cached.
    pub async fn call_json<T: DeserializeOwned>(&self, request: &ApiRequest) -> Result<T, ApiError> {
        let service = self.service;
        let body = self
            .call_with(request, |body| {
                serde_json::from_slice::<serde::de::IgnoredAny>(body)
                    .map(|_| ())
                    .map_err(|e| ApiError::Parse {
                        service,
                        cause: e.to_string(),
                    })
            })
            .await?;
        self.decode(&body)
    }

    pub fn decode<T: DeserializeOwned>(&self, body: &[u8]) -> Result<T, ApiError> {
        serde_json::from_slice(body).map_err(|e| ApiError::Parse {
            service: self.service,
            cause: e.to_string(),
        })
    }

    /// Call with a body check run before caching.
    ///
    /// A body the check refuses is never cached. Transient check errors are
    /// retried like transport failures.
    pub async fn call_with<F>(&self, request: &ApiRequest, check: F) -> Result<Vec<u8>, ApiError>
    where
        F: Fn(&[u8]) -> Result<(), ApiError> + Send + Sync,
    {
        let key = match (&self.cache, request.cacheable) {
            (Some(_), true) => Some(cache_key(
                self.transport.base_url(),
                &request.path,
                &request.query,
            )),
            _ => None,
        };

        if let (Some(cache), Some(key)) = (&self.cache, &key) {
            match cache.get(key) {
                Ok(Some(body)) => {
                    self.counters.cache_hits.fetch_add(1, Ordering::Relaxed);
                    debug!(service = %self.service, request = %request, cache = "hit", "Cache hit");
                    return Ok(body);
                }
                Ok(None) => {
                    self.counters.cache_misses.fetch_add(1, Ordering::Relaxed);
                    debug!(service = %self.service, request = %request, cache = "miss", "Cache miss");
                }
                Err(e) => {
                    warn!("{}: cache read failed, bypassing cache: {}", self.service, e);
                }
            }
        }

        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let result = self.send_once(request, attempt).await.and_then(|body| {
                check(&body)?;
                Ok(body)
            });

            let err = match result {
                Ok(body) => {
                    if let (Some(cache), Some(key)) = (&self.cache, &key) {
                        if let Err(e) = cache.set(key, &body) {
                            warn!("{}: cache write failed, bypassing cache: {}", self.service, e);
                        }
                    }
                    return Ok(body);
                }
                Err(err) => err,
            };

            match self.retry_policy.decide(attempt, &err) {
                RetryDecision::RetryAfter(delay) => {
                    self.counters.retries.fetch_add(1, Ordering::Relaxed);
                    debug!(
                        service = %self.service,
                        request = %request,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Retrying after error: {}",
                        err
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
                RetryDecision::GiveUp if err.is_retryable() => {
                    warn!("{}: giving up on {} after {} attempt(s)", self.service, request, attempt);
                    return Err(ApiError::ServiceUnavailable {
                        service: self.service,
                        attempts: attempt,
                        cause: err.to_string(),
                    });
                }
                RetryDecision::GiveUp => return Err(err),
            }
        }
    }

    /// A single gated attempt: no cache, no retries.
    pub async fn call_once(&self, request: &ApiRequest) -> Result<Vec<u8>, ApiError> {
        self.send_once(request, 1).await
    }

    async fn send_once(&self, request: &ApiRequest, attempt: u32) -> Result<Vec<u8>, ApiError> {
        self.gate.admit().await;
        self.counters.calls.fetch_add(1, Ordering::Relaxed);
        debug!(
            service = %self.service,
            path = %request.path,
            request = %request,
            attempt,
            "Outbound call"
        );

        let response = self
            .transport
            .send(request)
            .await
            .map_err(|e| ApiError::Transient {
                service: self.service,
                cause: e.to_string(),
            })?;
        classify_response(self.service, request, response)
    }
}

fn classify_response(
    service: ServiceKind,
    request: &ApiRequest,
    response: RawResponse,
) -> Result<Vec<u8>, ApiError> {
    match response.status {
        200..=299 => Ok(response.body),
        401 | 403 => Err(ApiError::Unauthorized {
            service,
            status: response.status,
        }),
        404 => Err(ApiError::NotFound {
            service,
            path: request.path.clone(),
        }),
        429 | 500..=599 => Err(ApiError::Transient {
            service,
            cause: format!("HTTP {}", response.status),
        }),
        status => Err(ApiError::Rejected {
            service,
            path: request.path.clone(),
            reason: format!("HTTP {}", status),
        }),
    }
}
