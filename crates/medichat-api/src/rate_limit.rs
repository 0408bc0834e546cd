//! Fixed-window rate limiter middleware.
//!
//! Counts requests per wall-clock second and rejects the excess with 429 until
//! the next second begins. The window and its count share one atomic word so a
//! window reset and the increments racing with it cannot interleave.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::extract::{Extension, Request};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::error::ErrorBody;

/// Low half of the state word: requests seen in the window.
const COUNT_MASK: u64 = u32::MAX as u64;

fn pack(window: u64, count: u64) -> u64 {
    (window << 32) | count.min(COUNT_MASK)
}

fn unpack(state: u64) -> (u64, u64) {
    (state >> 32, state & COUNT_MASK)
}

#[derive(Clone)]
pub struct RateLimiter {
    max_per_sec: u64,
    /// Epoch second of the current window (high 32 bits) and the requests
    /// admitted or rejected in it (low 32 bits).
    state: Arc<AtomicU64>,
}

impl RateLimiter {
    pub fn new(max_per_sec: u64) -> Self {
        Self {
            max_per_sec,
            state: Arc::new(AtomicU64::new(0)),
        }
    }

    fn try_acquire(&self) -> bool {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        self.try_acquire_at(now)
    }

    /// A `now` older than the current window counts against the current one.
    fn try_acquire_at(&self, now: u64) -> bool {
        let now = now & COUNT_MASK;
        let mut admitted = false;
        let _ = self
            .state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |state| {
                let (window, count) = unpack(state);
                if now > window {
                    admitted = self.max_per_sec > 0;
                    Some(pack(now, 1))
                } else {
                    admitted = count < self.max_per_sec;
                    Some(pack(window, count + 1))
                }
            });
        admitted
    }
}

pub async fn rate_limit_middleware(
    Extension(limiter): Extension<RateLimiter>,
    req: Request,
    next: Next,
) -> Response {
    if limiter.try_acquire() {
        return next.run(req).await;
    }

    tracing::debug!(path = %req.uri().path(), "Rate limit exceeded");
    (
        StatusCode::TOO_MANY_REQUESTS,
        Json(ErrorBody {
            error: "Rate limit exceeded".to_string(),
            code: "too_many_requests".to_string(),
        }),
    )
        .into_response()
}
