//! Rate-limit governor
//!
//! Combines a proactive token bucket (sustained rate + small burst) with
//! a reactive component fed from response headers (`remaining`, `limit`,
//! `reset_time`, `retry_at`). `Wait` blocks on whichever component is
//! currently the limiting factor; `UpdateFromResponse` folds the
//! provider's own view of its limits back in after every call.
//!
//! The token bucket follows the same mutex-guarded-state discipline as
//! a Graph-style rate limiter; the reactive half and header parsing are
//! specific to this workspace's providers.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Errors from the rate-limit governor.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitError {
    /// The caller's cancellation token fired while waiting for a token.
    #[error("cancelled while waiting for rate limit")]
    Cancelled,
}

struct TokenBucketInner {
    tokens: f64,
    last_refill: Instant,
}

/// Proactive token bucket: tokens are consumed on each call and refilled
/// at a constant rate, bounded by `capacity`.
struct TokenBucket {
    capacity: u32,
    refill_rate: f64,
    inner: Mutex<TokenBucketInner>,
}

impl TokenBucket {
    fn new(capacity: u32, refill_rate: f64) -> Self {
        Self {
            capacity,
            refill_rate,
            inner: Mutex::new(TokenBucketInner {
                tokens: capacity as f64,
                last_refill: Instant::now(),
            }),
        }
    }

    fn refill(inner: &mut TokenBucketInner, refill_rate: f64, capacity: u32) {
        let now = Instant::now();
        let elapsed = now.duration_since(inner.last_refill).as_secs_f64();
        if elapsed > 0.0 {
            inner.tokens = (inner.tokens + elapsed * refill_rate).min(capacity as f64);
            inner.last_refill = now;
        }
    }

    fn try_acquire(&self) -> bool {
        let mut inner = self.inner.lock().unwrap();
        Self::refill(&mut inner, self.refill_rate, self.capacity);
        if inner.tokens >= 1.0 {
            inner.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    fn time_until_available(&self) -> Duration {
        let mut inner = self.inner.lock().unwrap();
        Self::refill(&mut inner, self.refill_rate, self.capacity);
        if inner.tokens >= 1.0 {
            Duration::ZERO
        } else if self.refill_rate > 0.0 {
            Duration::from_secs_f64((1.0 - inner.tokens) / self.refill_rate)
        } else {
            Duration::from_secs(u64::MAX / 2)
        }
    }
}

/// State parsed out of the provider's most recent response headers.
#[derive(Debug, Clone, Default)]
struct ReactiveState {
    remaining: Option<u64>,
    limit: Option<u64>,
    reset_time: Option<DateTime<Utc>>,
    retry_at: Option<DateTime<Utc>>,
}

/// Default minimum headroom the reactive component preserves before the
/// provider's own `reset_time`.
pub const DEFAULT_MIN_BUFFER: u64 = 100;

/// Configuration for one [`RateLimiter`] instance.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    /// Token bucket capacity (burst size).
    pub capacity: u32,
    /// Sustained refill rate, tokens per second.
    pub refill_rate: f64,
    /// Reactive floor: once `remaining` drops below this and `reset_time`
    /// is still in the future, `Wait` sleeps until `reset_time`.
    pub min_buffer: u64,
}

impl RateLimitConfig {
    /// Conservative defaults for a code-hosting provider (≈1.2 req/s, burst 1).
    #[must_use]
    pub fn code_host() -> Self {
        Self {
            capacity: 1,
            refill_rate: 1.2,
            min_buffer: DEFAULT_MIN_BUFFER,
        }
    }

    /// Defaults for a mail provider (≈2 req/s, burst 5).
    #[must_use]
    pub fn mail() -> Self {
        Self {
            capacity: 5,
            refill_rate: 2.0,
            min_buffer: DEFAULT_MIN_BUFFER,
        }
    }

    /// Defaults for a drive/storage provider (≈8 req/s, burst 10).
    #[must_use]
    pub fn drive() -> Self {
        Self {
            capacity: 10,
            refill_rate: 8.0,
            min_buffer: DEFAULT_MIN_BUFFER,
        }
    }

    /// Defaults for a calendar provider (≈5 req/s, burst 10).
    #[must_use]
    pub fn calendar() -> Self {
        Self {
            capacity: 10,
            refill_rate: 5.0,
            min_buffer: DEFAULT_MIN_BUFFER,
        }
    }

    /// Looks up the default profile for one of the four provider
    /// families this workspace ships adapters for, falling back to the
    /// conservative code-host profile for anything else.
    #[must_use]
    pub fn for_provider(provider_type: &str) -> Self {
        match provider_type {
            "mail" | "gmail" => Self::mail(),
            "drive" | "gdrive" => Self::drive(),
            "calendar" | "gcal" => Self::calendar(),
            _ => Self::code_host(),
        }
    }
}

/// Rate-limit governor shared across every call for one (provider, account)
/// pair. Cheap to clone behind an `Arc`; all mutable state lives behind
/// internal mutexes.
pub struct RateLimiter {
    bucket: TokenBucket,
    reactive: Mutex<ReactiveState>,
    min_buffer: u64,
}

impl RateLimiter {
    /// Builds a limiter from an explicit configuration.
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            bucket: TokenBucket::new(config.capacity, config.refill_rate),
            reactive: Mutex::new(ReactiveState::default()),
            min_buffer: config.min_buffer,
        }
    }

    /// Blocks until a call is permitted: the proactive bucket has a token,
    /// any `retry_at` set by a prior 429 has passed, and the reactive
    /// `remaining`/`reset_time` floor is satisfied. Returns
    /// `RateLimitError::Cancelled` if `cancellation` fires first.
    pub async fn wait(&self, cancellation: &CancellationToken) -> Result<(), RateLimitError> {
        loop {
            if let Some(wait_for) = self.reactive_wait() {
                debug!(wait_ms = wait_for.as_millis(), "reactive component waiting");
                if !sleep_or_cancel(wait_for, cancellation).await {
                    return Err(RateLimitError::Cancelled);
                }
                continue;
            }

            if self.bucket.try_acquire() {
                return Ok(());
            }

            let wait_for = self.bucket.time_until_available();
            debug!(wait_ms = wait_for.as_millis(), "proactive bucket waiting");
            if !sleep_or_cancel(wait_for, cancellation).await {
                return Err(RateLimitError::Cancelled);
            }
        }
    }

    /// Returns how long to sleep before re-checking the reactive state, if
    /// it is currently the limiting factor.
    fn reactive_wait(&self) -> Option<Duration> {
        let state = self.reactive.lock().unwrap();
        let now = Utc::now();

        if let Some(retry_at) = state.retry_at {
            if retry_at > now {
                return Some(to_std_duration(retry_at - now));
            }
        }

        if let (Some(remaining), Some(reset_time)) = (state.remaining, state.reset_time) {
            if remaining < self.min_buffer && reset_time > now {
                return Some(to_std_duration(reset_time - now));
            }
        }

        None
    }

    /// Folds rate-limit information out of a provider response's headers.
    /// Recognises the conventional `x-ratelimit-remaining`,
    /// `x-ratelimit-limit`, `x-ratelimit-reset` (unix seconds), and
    /// `retry-after` headers; unrecognised or absent headers are no-ops.
    pub fn update_from_response(&self, status_is_rate_limited: bool, headers: &HeaderMap) {
        let mut state = self.reactive.lock().unwrap();

        if let Some(remaining) = header_u64(headers, "x-ratelimit-remaining") {
            state.remaining = Some(remaining);
        }
        if let Some(limit) = header_u64(headers, "x-ratelimit-limit") {
            state.limit = Some(limit);
        }
        if let Some(reset_secs) = header_u64(headers, "x-ratelimit-reset") {
            state.reset_time = DateTime::from_timestamp(reset_secs as i64, 0);
        }

        if status_is_rate_limited {
            let retry_after = headers
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .map(|v| parse_retry_after(v, Duration::from_secs(60)))
                .unwrap_or(Duration::from_secs(60));
            state.retry_at = Some(Utc::now() + chrono::Duration::from_std(retry_after).unwrap_or_default());
        }
    }

    /// Directly sets `retry_at` a fixed duration from now. Used by
    /// adapters that learn about a secondary rate limit through a
    /// provider-specific error body rather than a header.
    pub fn record_retry_after(&self, retry_after: Duration) {
        let mut state = self.reactive.lock().unwrap();
        state.retry_at = Some(Utc::now() + chrono::Duration::from_std(retry_after).unwrap_or_default());
    }
}

fn to_std_duration(d: chrono::Duration) -> Duration {
    d.to_std().unwrap_or(Duration::ZERO)
}

fn header_u64(headers: &HeaderMap, name: &str) -> Option<u64> {
    headers.get(name)?.to_str().ok()?.trim().parse().ok()
}

/// Sleeps for `duration`, or returns `false` early if `cancellation` fires.
async fn sleep_or_cancel(duration: Duration, cancellation: &CancellationToken) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(duration) => true,
        _ = cancellation.cancelled() => false,
    }
}

/// Parses a `Retry-After` header value: either an integer number of
/// seconds, or an HTTP-date. Falls back to `default` if neither parses.
#[must_use]
pub fn parse_retry_after(value: &str, default: Duration) -> Duration {
    if let Ok(seconds) = value.trim().parse::<u64>() {
        return Duration::from_secs(seconds);
    }

    if let Ok(date) = DateTime::parse_from_rfc2822(value.trim()) {
        let now = Utc::now();
        let target = date.with_timezone(&Utc);
        if target > now {
            if let Ok(secs) = u64::try_from(target.signed_duration_since(now).num_seconds()) {
                return Duration::from_secs(secs);
            }
        }
    }

    default
}
