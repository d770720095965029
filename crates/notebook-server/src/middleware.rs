//! Request tracing, internal error detail, per-IP rate limiting and the admin
//! bearer gate.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::extract::{ConnectInfo, FromRequestParts, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use http::header::AUTHORIZATION;
use http::request::Parts;
use http::{HeaderValue, Request};
use notebook_auth::{extract_bearer, AdminProfile, AuthError};
use rand::Rng;
use tokio::sync::Mutex;
use tracing::{info, warn, Instrument};

use crate::config::RateLimitConfig;
use crate::error::{ApiError, InternalDetail};
use crate::state::AppState;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Wrap each request in a span and tag the response with a request id.
pub async fn request_tracing(request: Request<Body>, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty() && v.len() <= 128)
        .map(str::to_string)
        .unwrap_or_else(generate_request_id);

    let span = tracing::info_span!(
        "http.request",
        request_id = %request_id,
        method = %request.method(),
        route = %request.uri().path(),
    );

    let started = Instant::now();
    let mut response = next.run(request).instrument(span.clone()).await;
    span.in_scope(|| {
        info!(
            status = response.status().as_u16(),
            latency_ms = started.elapsed().as_millis() as u64,
            "Request finished"
        );
    });

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

/// Put the underlying error text back into 500 bodies. Mounted only
/// outside production.
pub async fn expose_internal_detail(request: Request<Body>, next: Next) -> Response {
    let response = next.run(request).await;
    let detail = response
        .extensions()
        .get::<InternalDetail>()
        .map(|InternalDetail(detail)| detail.clone());
    match detail {
        Some(detail) => ApiError::render(response.status(), &detail),
        None => response,
    }
}

fn generate_request_id() -> String {
    format!("{:016x}", rand::thread_rng().gen::<u64>())
}

#[derive(Debug, Clone)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// Token bucket per client key.
///
/// Each key holds up to `max_requests` tokens and regains them evenly over
/// the window, so a full burst is followed by a steady trickle.
#[derive(Debug)]
pub struct RateLimiter {
    capacity: f64,
    refill_per_sec: f64,
    enabled: bool,
    buckets: Mutex<HashMap<String, Bucket>>,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        let capacity = f64::from(config.max_requests.max(1));
        let window = Duration::from_secs(config.window_secs.max(1));
        Self {
            capacity,
            refill_per_sec: capacity / window.as_secs_f64(),
            enabled: config.enabled,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// Take one token for `key`. Returns false when the bucket is empty.
    pub async fn allow(&self, key: &str) -> bool {
        if !self.enabled {
            return true;
        }

        let now = Instant::now();
        let mut buckets = self.buckets.lock().await;
        let bucket = buckets.entry(key.to_string()).or_insert_with(|| Bucket {
            tokens: self.capacity,
            last_refill: now,
        });
        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.last_refill = now;
        bucket.tokens = (bucket.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Drop buckets that have refilled completely.
    pub async fn prune(&self) {
        let now = Instant::now();
        let (capacity, rate) = (self.capacity, self.refill_per_sec);
        self.buckets.lock().await.retain(|_, bucket| {
            let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
            bucket.tokens + elapsed * rate < capacity
        });
    }
}

/// Reject clients that exceeded their request budget with 429.
pub async fn rate_limit(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let client = client_key(&request);
    if !state.limiter.allow(&client).await {
        warn!(client = %client, "Rate limit exceeded");
        return ApiError::RateLimited.into_response();
    }
    next.run(request).await
}

fn client_key(request: &Request<Body>) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// An authenticated admin, resolved from `Authorization: Bearer <token>`.
#[derive(Debug, Clone)]
pub struct AdminSession {
    pub admin: AdminProfile,
    pub token: String,
}

impl FromRequestParts<AppState> for AdminSession {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(extract_bearer)
            .ok_or(AuthError::MissingToken)?
            .to_string();

        let admin = state.auth.authenticate(&token)?;
        Ok(Self { admin, token })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max_requests: u32) -> RateLimiter {
        RateLimiter::new(&RateLimitConfig {
            enabled: true,
            max_requests,
            window_secs: 900,
        })
    }

    #[tokio::test]
    async fn test_bucket_exhausts() {
        let limiter = limiter(3);
        for _ in 0..3 {
            assert!(limiter.allow("10.0.0.1").await);
        }
        assert!(!limiter.allow("10.0.0.1").await);
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let limiter = limiter(1);
        assert!(limiter.allow("10.0.0.1").await);
        assert!(!limiter.allow("10.0.0.1").await);
        assert!(limiter.allow("10.0.0.2").await);
    }

    #[tokio::test]
    async fn test_disabled_always_allows() {
        let limiter = RateLimiter::new(&RateLimitConfig {
            enabled: false,
            max_requests: 1,
            window_secs: 900,
        });
        for _ in 0..10 {
            assert!(limiter.allow("10.0.0.1").await);
        }
    }

    #[tokio::test]
    async fn test_prune_keeps_drained_buckets() {
        let limiter = limiter(2);
        limiter.allow("busy").await;
        limiter.allow("busy").await;
        limiter.prune().await;
        assert!(!limiter.allow("busy").await);
    }
}
