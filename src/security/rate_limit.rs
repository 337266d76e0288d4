//! Per-identity fixed-window rate limiting for the upload endpoint.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderMap, HeaderValue, Method, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::config::RateLimitConfig;
use crate::error::RelayError;
use crate::http::response::ApiError;
use crate::observability::metrics;

pub const X_RATELIMIT_LIMIT: &str = "x-ratelimit-limit";
pub const X_RATELIMIT_REMAINING: &str = "x-ratelimit-remaining";

/// Key shared by every caller whose address cannot be determined.
pub const UNKNOWN_IDENTITY: &str = "unknown";

/// Request count for one identity in its current window.
#[derive(Debug, Clone, Copy)]
struct RateWindow {
    count: u32,
    window_start: Instant,
}

/// Outcome of one admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_in: Duration,
}

impl Admission {
    /// Whole minutes until the window resets, rounded up.
    pub fn reset_in_minutes(&self) -> u64 {
        self.reset_in.as_secs().div_ceil(60).max(1)
    }

    /// Whole seconds until the window resets, rounded up.
    pub fn reset_in_secs(&self) -> u64 {
        let secs = self.reset_in.as_secs();
        if self.reset_in.subsec_nanos() > 0 {
            secs + 1
        } else {
            secs
        }
    }
}

/// Fixed-window counter keyed by caller identity.
///
/// State lives only in this process and is lost on restart. Each identity's
/// window is updated under its `DashMap` shard lock, so concurrent requests
/// from one caller are never undercounted.
pub struct RateLimiter {
    windows: DashMap<String, RateWindow>,
    enabled: bool,
    capacity: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            windows: DashMap::new(),
            enabled: config.enabled,
            capacity: config.max_requests,
            window: Duration::from_secs(config.window_secs),
        }
    }

    /// Count one request from `identity`.
    pub fn admit(&self, identity: &str) -> Admission {
        self.admit_at(identity, Instant::now())
    }

    /// Count one request from `identity` as if it arrived at `now`.
    pub fn admit_at(&self, identity: &str, now: Instant) -> Admission {
        if !self.enabled {
            return Admission {
                allowed: true,
                limit: self.capacity,
                remaining: self.capacity,
                reset_in: self.window,
            };
        }

        let mut entry = self
            .windows
            .entry(identity.to_string())
            .or_insert(RateWindow {
                count: 0,
                window_start: now,
            });
        let window = entry.value_mut();

        if now.saturating_duration_since(window.window_start) >= self.window {
            window.count = 0;
            window.window_start = now;
        }
        window.count = window.count.saturating_add(1);

        let reset_in = (window.window_start + self.window).saturating_duration_since(now);
        if window.count > self.capacity {
            Admission {
                allowed: false,
                limit: self.capacity,
                remaining: 0,
                reset_in,
            }
        } else {
            Admission {
                allowed: true,
                limit: self.capacity,
                remaining: self.capacity - window.count,
                reset_in,
            }
        }
    }

    /// Drop every window that has fully elapsed. Returns how many were
    /// removed.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    pub fn sweep_at(&self, now: Instant) -> usize {
        let before = self.windows.len();
        self.windows
            .retain(|_, w| now.saturating_duration_since(w.window_start) < self.window);
        let after = self.windows.len();
        metrics::record_tracked_identities(after);
        before.saturating_sub(after)
    }

    /// Number of identities currently tracked.
    pub fn tracked(&self) -> usize {
        self.windows.len()
    }
}

/// Periodically sweep expired windows until shutdown.
pub async fn run_sweeper(
    limiter: Arc<RateLimiter>,
    every: Duration,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(every);
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let removed = limiter.sweep();
                if removed > 0 {
                    tracing::debug!(removed, remaining = limiter.tracked(), "Swept expired rate-limit windows");
                }
            }
            _ = shutdown.recv() => {
                tracing::debug!("Rate-limit sweeper stopping");
                return;
            }
        }
    }
}

/// Derive the caller identity: first non-empty of `X-Forwarded-For` (its
/// first hop), `X-Real-IP`, then the connection address.
pub fn client_identity(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<String> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    header("x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .or_else(|| header("x-real-ip"))
        .map(str::to_string)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
}

fn set_quota_headers(headers: &mut HeaderMap, admission: &Admission) {
    headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(admission.limit));
    headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(admission.remaining));
}

/// Middleware gating the upload route. Every response, admitted or not,
/// carries the quota headers.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    // Preflights and wrong-method requests do not spend quota.
    if request.method() != Method::POST {
        return next.run(request).await;
    }

    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let identity = client_identity(request.headers(), peer).unwrap_or_else(|| {
        tracing::warn!("Could not determine caller identity, using shared bucket");
        UNKNOWN_IDENTITY.to_string()
    });

    let admission = limiter.admit(&identity);

    let mut response = if admission.allowed {
        next.run(request).await
    } else {
        tracing::warn!(client = %identity, limit = admission.limit, "Rate limit exceeded");
        metrics::record_rate_limited();
        let mut response = ApiError(RelayError::RateLimited {
            reset_in_minutes: admission.reset_in_minutes(),
        })
        .into_response();
        response
            .headers_mut()
            .insert(axum::http::header::RETRY_AFTER, HeaderValue::from(admission.reset_in_secs()));
        response
    };

    set_quota_headers(response.headers_mut(), &admission);
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(capacity: u32, window_secs: u64) -> RateLimiter {
        RateLimiter::new(&RateLimitConfig {
            enabled: true,
            max_requests: capacity,
            window_secs,
            sweep_interval_secs: 300,
        })
    }

    #[test]
    fn test_capacity_plus_one_denied() {
        let limiter = limiter(3, 60);
        let t0 = Instant::now();

        for expected_remaining in [2, 1, 0] {
            let a = limiter.admit_at("1.2.3.4", t0);
            assert!(a.allowed);
            assert_eq!(a.remaining, expected_remaining);
        }

        let denied = limiter.admit_at("1.2.3.4", t0 + Duration::from_secs(10));
        assert!(!denied.allowed);
        assert_eq!(denied.remaining, 0);
        assert_eq!(denied.reset_in, Duration::from_secs(50));
        assert_eq!(denied.reset_in_minutes(), 1);
    }

    #[test]
    fn test_fresh_window_after_elapse() {
        let limiter = limiter(2, 60);
        let t0 = Instant::now();
        limiter.admit_at("a", t0);
        limiter.admit_at("a", t0);
        assert!(!limiter.admit_at("a", t0 + Duration::from_secs(59)).allowed);

        let a = limiter.admit_at("a", t0 + Duration::from_secs(60));
        assert!(a.allowed);
        assert_eq!(a.remaining, 1);
    }

    #[test]
    fn test_identities_are_independent() {
        let limiter = limiter(1, 60);
        let t0 = Instant::now();
        assert!(limiter.admit_at("a", t0).allowed);
        assert!(!limiter.admit_at("a", t0).allowed);
        assert!(limiter.admit_at("b", t0).allowed);
    }

    #[test]
    fn test_sweep_keeps_live_windows() {
        let limiter = limiter(5, 60);
        let t0 = Instant::now();
        limiter.admit_at("old", t0);
        limiter.admit_at("live", t0 + Duration::from_secs(30));

        let removed = limiter.sweep_at(t0 + Duration::from_secs(61));
        assert_eq!(removed, 1);
        assert_eq!(limiter.tracked(), 1);
        // The surviving window still holds its count.
        assert_eq!(limiter.admit_at("live", t0 + Duration::from_secs(62)).remaining, 3);
    }

    #[test]
    fn test_disabled_admits_everything() {
        let limiter = RateLimiter::new(&RateLimitConfig {
            enabled: false,
            max_requests: 1,
            ..RateLimitConfig::default()
        });
        for _ in 0..10 {
            let a = limiter.admit("x");
            assert!(a.allowed);
            assert_eq!(a.remaining, 1);
        }
        assert_eq!(limiter.tracked(), 0);
    }

    #[test]
    fn test_identity_precedence() {
        let peer: SocketAddr = "10.0.0.9:5555".parse().unwrap();
        let mut headers = HeaderMap::new();
        assert_eq!(client_identity(&headers, Some(peer)).as_deref(), Some("10.0.0.9"));
        assert_eq!(client_identity(&headers, None), None);

        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.2"));
        assert_eq!(client_identity(&headers, Some(peer)).as_deref(), Some("198.51.100.2"));

        headers.insert("x-forwarded-for", HeaderValue::from_static(" 203.0.113.7 , 10.0.0.1"));
        assert_eq!(client_identity(&headers, Some(peer)).as_deref(), Some("203.0.113.7"));

        headers.insert("x-forwarded-for", HeaderValue::from_static("  "));
        assert_eq!(client_identity(&headers, Some(peer)).as_deref(), Some("198.51.100.2"));
    }

    #[test]
    fn test_reset_rounding() {
        let a = Admission {
            allowed: false,
            limit: 1,
            remaining: 0,
            reset_in: Duration::from_millis(61_500),
        };
        assert_eq!(a.reset_in_secs(), 62);
        assert_eq!(a.reset_in_minutes(), 2);
    }
}
