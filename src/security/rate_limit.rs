//! Fixed-window rate limiting middleware.
//!
//! Each key owns a window that starts with the first request after the
//! previous window expired (not on a clock grid). Within a window the first
//! `max_requests` requests are admitted and the rest get 429.
//!
//! Expired entries are replaced on access. A sweep that deletes all expired
//! entries piggybacks on requests and runs at most once per window.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    extract::{Request, State},
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use dashmap::DashMap;

use crate::http::request::{
    header_str, X_RATELIMIT_LIMIT, X_RATELIMIT_REMAINING, X_RATELIMIT_RESET, X_USER_ID,
};
use crate::http::response::ApiError;
use crate::observability::metrics;
use crate::security::{client_ip, is_exempt, reject, validation::RequestContext};

/// Key used when neither a user id nor a client address is available.
pub const UNKNOWN_KEY: &str = "unknown";

/// Millisecond wall clock.
pub trait Clock: Send + Sync + fmt::Debug {
    fn now_ms(&self) -> u64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: AtomicU64,
}

impl ManualClock {
    pub fn new(now_ms: u64) -> Self {
        Self {
            now_ms: AtomicU64::new(now_ms),
        }
    }

    pub fn set(&self, now_ms: u64) {
        self.now_ms.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance(&self, by_ms: u64) {
        self.now_ms.fetch_add(by_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

/// Usage of one key within its current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitEntry {
    pub count: u32,
    pub reset_at_ms: u64,
}

/// Outcome of a rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Admitted {
        limit: u32,
        remaining: u32,
        /// Window end in epoch seconds, rounded up.
        reset_at_secs: u64,
    },
    Rejected {
        retry_after_seconds: u64,
    },
}

/// Per-key fixed-window counter table.
pub struct RateLimiter {
    entries: DashMap<String, RateLimitEntry>,
    last_cleanup_ms: AtomicU64,
    window_ms: u64,
    max_requests: u32,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(window_ms: u64, max_requests: u32) -> Self {
        Self::with_clock(window_ms, max_requests, Arc::new(SystemClock))
    }

    pub fn with_clock(window_ms: u64, max_requests: u32, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            last_cleanup_ms: AtomicU64::new(clock.now_ms()),
            window_ms,
            max_requests,
            clock,
        }
    }

    pub fn window_ms(&self) -> u64 {
        self.window_ms
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    /// Count a request against `key`.
    pub fn check(&self, key: &str) -> Decision {
        let now = self.clock.now_ms();
        self.cleanup_at(now);
        self.check_at(key, now)
    }

    fn check_at(&self, key: &str, now: u64) -> Decision {
        let fresh = RateLimitEntry {
            count: 0,
            reset_at_ms: now.saturating_add(self.window_ms),
        };

        // The shard lock is held until `entry` drops, so check-and-increment
        // is atomic per key.
        let mut entry = self.entries.entry(key.to_string()).or_insert(fresh);
        if entry.reset_at_ms <= now {
            *entry = fresh;
        }

        if entry.count >= self.max_requests {
            let retry_after_ms = entry.reset_at_ms.saturating_sub(now);
            return Decision::Rejected {
                retry_after_seconds: retry_after_ms.div_ceil(1000),
            };
        }

        entry.count += 1;
        Decision::Admitted {
            limit: self.max_requests,
            remaining: self.max_requests.saturating_sub(entry.count),
            reset_at_secs: entry.reset_at_ms.div_ceil(1000),
        }
    }

    /// Drop expired entries unless a sweep already ran within the last
    /// window. Returns the number removed, or `None` when skipped.
    pub fn cleanup(&self) -> Option<usize> {
        self.cleanup_at(self.clock.now_ms())
    }

    fn cleanup_at(&self, now: u64) -> Option<usize> {
        let last = self.last_cleanup_ms.load(Ordering::Acquire);
        if now.saturating_sub(last) < self.window_ms {
            return None;
        }
        // Only the request that advances the timestamp sweeps.
        self.last_cleanup_ms
            .compare_exchange(last, now, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;

        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.reset_at_ms > now);
        let removed = before.saturating_sub(self.entries.len());
        metrics::record_rate_limit_entries(self.entries.len());

        tracing::debug!(removed, remaining = self.entries.len(), "rate_limit_cleanup");
        Some(removed)
    }

    /// Current entry for `key`, if one exists.
    pub fn entry(&self, key: &str) -> Option<RateLimitEntry> {
        self.entries.get(key).map(|entry| *entry)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimiter")
            .field("entries", &self.entries.len())
            .field("window_ms", &self.window_ms)
            .field("max_requests", &self.max_requests)
            .finish()
    }
}

/// State for the rate limiting middleware.
#[derive(Debug)]
pub struct RateLimitState {
    pub limiter: RateLimiter,
    /// Key by `x-user-id` (API key auth on) instead of client address.
    pub keyed_by_user: bool,
    pub trust_proxy_hops: usize,
}

impl RateLimitState {
    pub fn new(limiter: RateLimiter, keyed_by_user: bool, trust_proxy_hops: usize) -> Self {
        Self {
            limiter,
            keyed_by_user,
            trust_proxy_hops,
        }
    }

    /// Rate limit key for `request`. Prefers the validated context and
    /// falls back to reading the request directly.
    pub fn key_for(&self, request: &Request) -> String {
        let context = request.extensions().get::<RequestContext>();

        if self.keyed_by_user {
            return context
                .and_then(|ctx| ctx.user_id.clone())
                .or_else(|| header_str(request.headers(), &X_USER_ID).map(str::to_string))
                .unwrap_or_else(|| UNKNOWN_KEY.to_string());
        }

        context
            .and_then(|ctx| ctx.client_ip)
            .or_else(|| client_ip::resolve(request, self.trust_proxy_hops))
            .map(|ip| ip.to_string())
            .unwrap_or_else(|| UNKNOWN_KEY.to_string())
    }
}

/// Second stage of the security pipeline.
pub async fn rate_limit_middleware(
    State(state): State<Arc<RateLimitState>>,
    request: Request,
    next: Next,
) -> Response {
    if is_exempt(request.method(), request.uri().path()) {
        return next.run(request).await;
    }

    let key = state.key_for(&request);
    match state.limiter.check(&key) {
        Decision::Admitted {
            limit,
            remaining,
            reset_at_secs,
        } => {
            let mut response = next.run(request).await;
            let headers = response.headers_mut();
            headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(limit));
            headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(remaining));
            headers.insert(X_RATELIMIT_RESET, HeaderValue::from(reset_at_secs));
            response
        }
        Decision::Rejected {
            retry_after_seconds,
        } => {
            let err = ApiError::RateLimited {
                window_ms: state.limiter.window_ms(),
                max_requests: state.limiter.max_requests(),
                retry_after_seconds,
            };
            reject(err, &request)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use axum::{
        body::Body,
        extract::ConnectInfo,
        http::{header, Method, Request, StatusCode},
        middleware::from_fn_with_state,
        routing::get,
        Router,
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::observability::logging::capture;

    fn limiter(window_ms: u64, max: u32, start_ms: u64) -> (RateLimiter, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(start_ms));
        (RateLimiter::with_clock(window_ms, max, clock.clone()), clock)
    }

    #[test]
    fn admits_exactly_max_requests_per_window() {
        let (limiter, _clock) = limiter(60_000, 3, 0);

        for expected_remaining in [2, 1, 0] {
            match limiter.check("k") {
                Decision::Admitted { remaining, limit, .. } => {
                    assert_eq!(limit, 3);
                    assert_eq!(remaining, expected_remaining);
                }
                other => panic!("expected admission, got {other:?}"),
            }
        }
        assert!(matches!(limiter.check("k"), Decision::Rejected { .. }));
        assert_eq!(limiter.entry("k").map(|e| e.count), Some(3));
    }

    #[test]
    fn lazily_rolling_window_scenario() {
        let start = 1_700_000_000_000;
        let (limiter, clock) = limiter(1000, 2, start);

        assert!(matches!(limiter.check("k1"), Decision::Admitted { .. }));
        clock.set(start + 100);
        assert!(matches!(limiter.check("k1"), Decision::Admitted { .. }));
        clock.set(start + 200);
        assert_eq!(
            limiter.check("k1"),
            Decision::Rejected {
                retry_after_seconds: 1
            }
        );

        clock.set(start + 1100);
        match limiter.check("k1") {
            Decision::Admitted {
                remaining,
                reset_at_secs,
                ..
            } => {
                assert_eq!(remaining, 1);
                assert_eq!(reset_at_secs, (start + 2100).div_ceil(1000));
            }
            other => panic!("expected a fresh window, got {other:?}"),
        }
        assert_eq!(
            limiter.entry("k1"),
            Some(RateLimitEntry {
                count: 1,
                reset_at_ms: start + 2100
            })
        );
    }

    #[test]
    fn window_expires_exactly_at_reset() {
        let (limiter, clock) = limiter(1000, 1, 0);
        assert!(matches!(limiter.check("k"), Decision::Admitted { .. }));
        clock.set(999);
        assert!(matches!(limiter.check("k"), Decision::Rejected { .. }));
        clock.set(1000);
        assert!(matches!(limiter.check("k"), Decision::Admitted { .. }));
    }

    #[test]
    fn retry_after_rounds_up() {
        let (limiter, clock) = limiter(5000, 1, 0);
        limiter.check("k");
        clock.set(1);
        assert_eq!(
            limiter.check("k"),
            Decision::Rejected {
                retry_after_seconds: 5
            }
        );
        clock.set(4001);
        assert_eq!(
            limiter.check("k"),
            Decision::Rejected {
                retry_after_seconds: 1
            }
        );
    }

    #[test]
    fn keys_are_independent() {
        let (limiter, _clock) = limiter(1000, 1, 0);
        assert!(matches!(limiter.check("a"), Decision::Admitted { .. }));
        assert!(matches!(limiter.check("b"), Decision::Admitted { .. }));
        assert!(matches!(limiter.check("a"), Decision::Rejected { .. }));
        assert!(matches!(limiter.check("b"), Decision::Rejected { .. }));
    }

    #[test]
    fn cleanup_runs_once_per_window() {
        let (limiter, clock) = limiter(1000, 5, 0);
        limiter.check("a");
        clock.set(500);
        limiter.check("b");

        // Too early: less than a window since construction.
        assert_eq!(limiter.cleanup(), None);

        clock.set(1200);
        assert_eq!(limiter.cleanup(), Some(1));
        assert!(limiter.entry("a").is_none());
        assert!(limiter.entry("b").is_some());

        // Second sweep in the same window is a no-op even though "b" expired.
        clock.set(1600);
        assert_eq!(limiter.cleanup(), None);
        assert!(limiter.entry("b").is_some());

        clock.set(2200);
        assert_eq!(limiter.cleanup(), Some(1));
        assert!(limiter.is_empty());
    }

    #[test]
    fn requests_trigger_cleanup() {
        let (limiter, clock) = limiter(1000, 5, 0);
        limiter.check("a");
        limiter.check("b");
        assert_eq!(limiter.len(), 2);

        clock.set(1000);
        limiter.check("c");
        assert_eq!(limiter.len(), 1);
        assert!(limiter.entry("c").is_some());
    }

    #[test]
    fn concurrent_checks_never_exceed_limit() {
        let limiter = Arc::new(RateLimiter::new(60_000, 50));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = limiter.clone();
                std::thread::spawn(move || {
                    (0..25)
                        .filter(|_| matches!(limiter.check("shared"), Decision::Admitted { .. }))
                        .count()
                })
            })
            .collect();

        let admitted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(admitted, 50);
        assert_eq!(limiter.entry("shared").map(|e| e.count), Some(50));
    }

    fn app(state: RateLimitState) -> Router {
        async fn ok() -> &'static str {
            "ok"
        }
        Router::new()
            .route("/", get(ok).options(ok))
            .route("/api/health", get(ok))
            .layer(from_fn_with_state(Arc::new(state), rate_limit_middleware))
    }

    fn from_peer(peer: &str) -> Request<Body> {
        let mut request = Request::builder().uri("/").body(Body::empty()).unwrap();
        let addr: SocketAddr = peer.parse().unwrap();
        request.extensions_mut().insert(ConnectInfo(addr));
        request
    }

    #[tokio::test]
    async fn admitted_responses_carry_quota_headers() {
        let (limiter, _clock) = limiter(60_000, 2, 10_000);
        let app = app(RateLimitState::new(limiter, false, 0));

        let response = app.oneshot(from_peer("10.0.0.1:1000")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[X_RATELIMIT_LIMIT], "2");
        assert_eq!(response.headers()[X_RATELIMIT_REMAINING], "1");
        assert_eq!(response.headers()[X_RATELIMIT_RESET], "70");
    }

    #[tokio::test]
    async fn rejection_has_retry_after_and_details() {
        let (limiter, _clock) = limiter(1000, 1, 0);
        let app = app(RateLimitState::new(limiter, false, 0));

        let first = app.clone().oneshot(from_peer("10.0.0.1:1000")).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        let second = app.oneshot(from_peer("10.0.0.1:1001")).await.unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(second.headers()[header::RETRY_AFTER], "1");
        assert!(second.headers().get(X_RATELIMIT_LIMIT).is_none());

        let bytes = axum::body::to_bytes(second.into_body(), 4096).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "RATE_LIMITED");
        assert_eq!(body["details"]["windowMs"], 1000);
        assert_eq!(body["details"]["maxRequests"], 1);
        assert_eq!(body["details"]["retryAfterSeconds"], 1);
    }

    #[tokio::test]
    async fn rejection_is_logged_as_request_rejected() {
        let (logs, _guard) = capture::install();
        let (limiter, _clock) = limiter(1000, 1, 0);
        let app = app(RateLimitState::new(limiter, false, 0));

        app.clone().oneshot(from_peer("10.0.0.1:1000")).await.unwrap();
        let response = app.oneshot(from_peer("10.0.0.1:1001")).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

        let line = logs.event("request_rejected").unwrap();
        assert_eq!(line["level"], "WARN");
        assert_eq!(line["fields"]["code"], "RATE_LIMITED");
        assert_eq!(line["fields"]["method"], "GET");
        assert_eq!(line["fields"]["path"], "/");
        assert!(line["fields"].get("client").is_none());
    }

    #[tokio::test]
    async fn distinct_ips_have_independent_quotas() {
        let (limiter, _clock) = limiter(1000, 1, 0);
        let app = app(RateLimitState::new(limiter, false, 0));

        for peer in ["10.0.0.1:1", "10.0.0.2:1"] {
            let response = app.clone().oneshot(from_peer(peer)).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK, "{peer}");
        }
        for peer in ["10.0.0.1:2", "10.0.0.2:2"] {
            let response = app.clone().oneshot(from_peer(peer)).await.unwrap();
            assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS, "{peer}");
        }
    }

    #[tokio::test]
    async fn keyed_by_user_ignores_address() {
        let (limiter, _clock) = limiter(1000, 1, 0);
        let app = app(RateLimitState::new(limiter, true, 0));

        let mut first = from_peer("10.0.0.1:1");
        first.headers_mut().insert(X_USER_ID, HeaderValue::from_static("alice"));
        let mut second = from_peer("10.0.0.2:1");
        second.headers_mut().insert(X_USER_ID, HeaderValue::from_static("alice"));
        let mut other = from_peer("10.0.0.2:1");
        other.headers_mut().insert(X_USER_ID, HeaderValue::from_static("bob"));

        assert_eq!(app.clone().oneshot(first).await.unwrap().status(), StatusCode::OK);
        assert_eq!(
            app.clone().oneshot(second).await.unwrap().status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(app.oneshot(other).await.unwrap().status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn exempt_requests_are_not_counted() {
        let (limiter, _clock) = limiter(1000, 1, 0);
        let state = RateLimitState::new(limiter, false, 0);
        let app = app(state);

        for _ in 0..5 {
            let health = Request::builder()
                .uri("/api/health")
                .body(Body::empty())
                .unwrap();
            assert_eq!(app.clone().oneshot(health).await.unwrap().status(), StatusCode::OK);

            let preflight = Request::builder()
                .method(Method::OPTIONS)
                .uri("/")
                .body(Body::empty())
                .unwrap();
            let response = app.clone().oneshot(preflight).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            assert!(response.headers().get(X_RATELIMIT_LIMIT).is_none());
        }

        let response = app.oneshot(from_peer("10.0.0.1:1")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn unknown_key_without_address_or_user() {
        let state = RateLimitState::new(RateLimiter::new(1000, 1), true, 0);
        let request = Request::builder().uri("/").body(Body::empty()).unwrap();
        assert_eq!(state.key_for(&request), UNKNOWN_KEY);

        let state = RateLimitState::new(RateLimiter::new(1000, 1), false, 0);
        assert_eq!(state.key_for(&request), UNKNOWN_KEY);
    }
}
