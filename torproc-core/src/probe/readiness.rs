//! Readiness page evaluation and wait-parameter normalization

use regex::{Regex, RegexBuilder};
use std::sync::OnceLock;
use std::time::Duration;

/// Pause between attempts used by the default wait
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(5);

/// Total budget used by the default wait
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(60);

/// Floor applied to a zero retry interval
pub const MIN_RETRY_INTERVAL: Duration = Duration::from_millis(100);

/// Budget applied when the requested one is zero or shorter than the interval
pub const FALLBACK_MAX_WAIT: Duration = Duration::from_secs(5);

fn success_marker() -> &'static Regex {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    MARKER.get_or_init(|| {
        match RegexBuilder::new(r"<h1[^>]*>\s*congratulations")
            .case_insensitive(true)
            .build()
        {
            Ok(regex) => regex,
            Err(e) => unreachable!("invalid success marker pattern: {}", e),
        }
    })
}

/// The check page says traffic arrived through Tor
pub fn is_ready_page(body: &str) -> bool {
    !body.trim().is_empty() && success_marker().is_match(body)
}

/// Clamp wait parameters to usable values
///
/// A zero interval becomes `MIN_RETRY_INTERVAL`; a zero budget, or one
/// shorter than the interval, becomes `FALLBACK_MAX_WAIT`.
pub fn normalize_wait(retry_interval: Duration, max_wait: Duration) -> (Duration, Duration) {
    let retry_interval = if retry_interval.is_zero() {
        MIN_RETRY_INTERVAL
    } else {
        retry_interval
    };

    let max_wait = if max_wait.is_zero() || max_wait < retry_interval {
        FALLBACK_MAX_WAIT
    } else {
        max_wait
    };

    (retry_interval, max_wait)
}

/// Convert signed seconds (as typed on a command line) to a duration,
/// mapping negatives to zero so `normalize_wait` clamps them
pub fn duration_from_signed_secs(secs: i64) -> Duration {
    Duration::from_secs(u64::try_from(secs).unwrap_or(0))
}
