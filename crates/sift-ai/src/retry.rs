//! Backoff policy for provider HTTP calls.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};

pub const BASE_BACKOFF_MS: u64 = 200;
pub const MAX_BACKOFF_SHIFT: usize = 6;

static JITTER_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Transient statuses worth a retry; everything else fails fast.
pub fn should_retry_status(status: u16) -> bool {
    matches!(status, 408 | 409 | 425 | 429) || status >= 500
}

pub fn is_retryable_http_error(error: &reqwest::Error) -> bool {
    error.is_timeout() || error.is_connect() || error.is_request() || error.is_body()
}

fn exponential_backoff_ms(attempt: usize) -> u64 {
    BASE_BACKOFF_MS.saturating_mul(1_u64 << attempt.min(MAX_BACKOFF_SHIFT))
}

/// Delay before the next attempt. Jitter keeps concurrent scans from
/// hammering the provider in lockstep; the retry-after header, when
/// present, acts as a floor.
pub fn retry_delay_ms(attempt: usize, jitter: bool, retry_after_ms: Option<u64>) -> u64 {
    let base = exponential_backoff_ms(attempt);
    let backoff = if jitter && base > 1 {
        // Bounded jitter in [50%, 100%] of the deterministic backoff.
        let low = base / 2;
        let seed = JITTER_COUNTER.fetch_add(1, Ordering::Relaxed);
        let mixed = seed.wrapping_mul(0x9E37_79B9_7F4A_7C15).rotate_left(17);
        low + mixed % (base - low + 1)
    } else {
        base
    };
    match retry_after_ms {
        Some(floor) => backoff.max(floor),
        None => backoff,
    }
}

/// Reads `retry-after` as either delta-seconds or an HTTP date.
pub fn parse_retry_after_ms(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    let raw = headers.get("retry-after")?.to_str().ok()?.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(seconds) = raw.parse::<u64>() {
        return Some(seconds.saturating_mul(1000));
    }

    let retry_at = DateTime::parse_from_rfc2822(raw).ok()?.with_timezone(&Utc);
    let delay_ms = retry_at.signed_duration_since(Utc::now()).num_milliseconds();
    u64::try_from(delay_ms.max(0)).ok()
}

/// A budget of zero means unbounded retries up to the attempt cap.
pub fn budget_allows_delay(elapsed_ms: u64, delay_ms: u64, budget_ms: u64) -> bool {
    budget_ms == 0 || elapsed_ms.saturating_add(delay_ms) <= budget_ms
}
