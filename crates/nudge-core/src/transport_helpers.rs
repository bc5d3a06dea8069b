use std::time::Duration;

use reqwest::header::{HeaderMap, RETRY_AFTER};

/// Return true for response statuses worth retrying: rate limiting and
/// server-side failures.
pub fn is_retryable_status(status: u16) -> bool {
    status == 429 || (500..=599).contains(&status)
}

/// Return true for transport-level failures worth retrying.
pub fn is_retryable_transport_error(error: &reqwest::Error) -> bool {
    error.is_timeout() || error.is_connect()
}

/// Backoff delay before retry `attempt` (1-based). A server-provided
/// `Retry-After` wins over the exponential schedule.
pub fn retry_delay(base_delay_ms: u64, attempt: usize, retry_after: Option<Duration>) -> Duration {
    if let Some(retry_after) = retry_after {
        return retry_after;
    }
    let exponent = attempt.saturating_sub(1).min(6) as u32;
    Duration::from_millis(base_delay_ms.saturating_mul(1_u64 << exponent))
}

/// Parse a `Retry-After` header carrying a delay in seconds.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

/// Truncate a response body for inclusion in error messages.
pub fn truncate_for_error(body: &str, max_chars: usize) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= max_chars {
        return trimmed.to_string();
    }
    let truncated = trimmed.chars().take(max_chars).collect::<String>();
    format!("{} [truncated]", truncated.trim_end())
}
